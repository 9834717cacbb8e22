use serde::Serialize;

use crate::model::Element;

/// How a value was quoted in the source attribute list.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Quote {
    #[default]
    None,
    Single,
    Double,
}

/// The leading bareword of an attribute list: `style#id.role%option`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ShorthandAttribute {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct NamedAttribute {
    pub name: String,
    pub value: String,
    pub quote: Quote,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PositionalAttribute {
    /// 1-based position within the list.
    pub offset: usize,
    /// The name this position stands for on the block it is attached to (`alt` for
    /// the first positional of an image, `language` for the second of a `source`
    /// listing, ...).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub implied_name: Option<String>,
    pub value: String,
    pub quote: Quote,
}

/// A `.Title` line.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TitleAttribute {
    pub elements: Vec<Element>,
}

/// A `[[id]]` or `[[id,label]]` line.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AnchorAttribute {
    pub id: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub label: Vec<Element>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Attribute {
    Shorthand(ShorthandAttribute),
    Named(NamedAttribute),
    Positional(PositionalAttribute),
    Title(TitleAttribute),
    Anchor(AnchorAttribute),
}

/// The attributes attached to a block, in source order.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct AttributeList(Vec<Attribute>);

impl AttributeList {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, attribute: Attribute) {
        self.0.push(attribute);
    }

    pub fn append(&mut self, other: &mut AttributeList) {
        self.0.append(&mut other.0);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Attribute> {
        self.0.iter()
    }

    /// Block style: the shorthand style, or an explicit `style=` entry.
    #[must_use]
    pub fn style(&self) -> Option<&str> {
        self.0
            .iter()
            .rev()
            .find_map(|attribute| match attribute {
                Attribute::Shorthand(shorthand) => shorthand.style.as_deref(),
                Attribute::Named(named) if named.name == "style" => Some(named.value.as_str()),
                Attribute::Named(_)
                | Attribute::Positional(_)
                | Attribute::Title(_)
                | Attribute::Anchor(_) => None,
            })
            .filter(|style| !style.is_empty())
    }

    /// The explicit ID, from `#id`, `id=`, or a `[[id]]` anchor line. The first one
    /// written wins.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.ids().next()
    }

    /// Every explicit ID attached to the block, in source order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.0.iter().filter_map(|attribute| match attribute {
            Attribute::Shorthand(shorthand) => shorthand.id.as_deref(),
            Attribute::Named(named) if named.name == "id" => Some(named.value.as_str()),
            Attribute::Anchor(anchor) => Some(anchor.id.as_str()),
            Attribute::Named(_) | Attribute::Positional(_) | Attribute::Title(_) => None,
        })
    }

    #[must_use]
    pub fn anchor_label(&self) -> Option<&[Element]> {
        self.0.iter().find_map(|attribute| match attribute {
            Attribute::Anchor(anchor) if !anchor.label.is_empty() => Some(anchor.label.as_slice()),
            Attribute::Anchor(_)
            | Attribute::Shorthand(_)
            | Attribute::Named(_)
            | Attribute::Positional(_)
            | Attribute::Title(_) => None,
        })
    }

    #[must_use]
    pub fn title(&self) -> Option<&[Element]> {
        self.0.iter().rev().find_map(|attribute| match attribute {
            Attribute::Title(title) => Some(title.elements.as_slice()),
            Attribute::Shorthand(_)
            | Attribute::Named(_)
            | Attribute::Positional(_)
            | Attribute::Anchor(_) => None,
        })
    }

    pub fn roles(&self) -> impl Iterator<Item = &str> {
        self.0.iter().flat_map(|attribute| {
            let roles: Vec<&str> = match attribute {
                Attribute::Shorthand(shorthand) => {
                    shorthand.roles.iter().map(String::as_str).collect()
                }
                Attribute::Named(named) if named.name == "role" => {
                    named.value.split_whitespace().collect()
                }
                Attribute::Named(_)
                | Attribute::Positional(_)
                | Attribute::Title(_)
                | Attribute::Anchor(_) => Vec::new(),
            };
            roles
        })
    }

    #[must_use]
    pub fn has_option(&self, option: &str) -> bool {
        self.0.iter().any(|attribute| match attribute {
            Attribute::Shorthand(shorthand) => shorthand.options.iter().any(|o| o == option),
            Attribute::Named(named) if named.name == "opts" || named.name == "options" => named
                .value
                .split(',')
                .any(|o| o.trim() == option),
            Attribute::Named(named) => named.name == format!("{option}-option"),
            Attribute::Positional(_) | Attribute::Title(_) | Attribute::Anchor(_) => false,
        })
    }

    /// Value of a named attribute, including positionals that carry `name` as their
    /// implied name. The last one written wins.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.iter().rev().find_map(|attribute| match attribute {
            Attribute::Named(named) if named.name == name => Some(named.value.as_str()),
            Attribute::Positional(positional)
                if positional.implied_name.as_deref() == Some(name) =>
            {
                Some(positional.value.as_str())
            }
            Attribute::Named(_)
            | Attribute::Positional(_)
            | Attribute::Shorthand(_)
            | Attribute::Title(_)
            | Attribute::Anchor(_) => None,
        })
    }

    #[must_use]
    pub fn positional(&self, offset: usize) -> Option<&str> {
        self.0.iter().find_map(|attribute| match attribute {
            Attribute::Positional(positional) if positional.offset == offset => {
                Some(positional.value.as_str())
            }
            Attribute::Positional(_)
            | Attribute::Named(_)
            | Attribute::Shorthand(_)
            | Attribute::Title(_)
            | Attribute::Anchor(_) => None,
        })
    }

    /// Give positionals the names they stand for on a particular block kind.
    /// `names[0]` names offset `first_offset`, `names[1]` the next one, and so on.
    pub fn assign_implied_names(&mut self, first_offset: usize, names: &[&str]) {
        for attribute in &mut self.0 {
            if let Attribute::Positional(positional) = attribute
                && positional.implied_name.is_none()
                && let Some(name) = positional
                    .offset
                    .checked_sub(first_offset)
                    .and_then(|index| names.get(index))
            {
                positional.implied_name = Some((*name).to_string());
            }
        }
    }

    /// Inline content carried by the list (titles, anchor labels).
    pub fn element_lists(&self) -> impl Iterator<Item = &Vec<Element>> {
        self.0.iter().filter_map(|attribute| match attribute {
            Attribute::Title(title) => Some(&title.elements),
            Attribute::Anchor(anchor) => Some(&anchor.label),
            Attribute::Shorthand(_) | Attribute::Named(_) | Attribute::Positional(_) => None,
        })
    }

    pub fn element_lists_mut(&mut self) -> impl Iterator<Item = &mut Vec<Element>> {
        self.0.iter_mut().filter_map(|attribute| match attribute {
            Attribute::Title(title) => Some(&mut title.elements),
            Attribute::Anchor(anchor) => Some(&mut anchor.label),
            Attribute::Shorthand(_) | Attribute::Named(_) | Attribute::Positional(_) => None,
        })
    }
}

impl From<Vec<Attribute>> for AttributeList {
    fn from(attributes: Vec<Attribute>) -> Self {
        Self(attributes)
    }
}
