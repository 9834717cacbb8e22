use serde::Serialize;

use crate::model::{Element, SourceLocation};

/// Built-in references that stand for a single character or short string.
const CHARACTER_REPLACEMENTS: &[(&str, &str)] = &[
    ("amp", "&"),
    ("apos", "'"),
    ("asterisk", "*"),
    ("backslash", "\\"),
    ("backtick", "`"),
    ("blank", ""),
    ("brvbar", "\u{a6}"),
    ("caret", "^"),
    ("cpp", "C++"),
    ("cxx", "C++"),
    ("deg", "\u{b0}"),
    ("empty", ""),
    ("endsb", "]"),
    ("gt", ">"),
    ("ldquo", "\u{201c}"),
    ("lsquo", "\u{2018}"),
    ("lt", "<"),
    ("nbsp", "\u{a0}"),
    ("plus", "+"),
    ("pp", "++"),
    ("quot", "\""),
    ("rdquo", "\u{201d}"),
    ("rsquo", "\u{2019}"),
    ("sp", " "),
    ("startsb", "["),
    ("tilde", "~"),
    ("two-colons", "::"),
    ("two-semicolons", ";;"),
    ("vbar", "|"),
    ("wj", "\u{2060}"),
    ("zwsp", "\u{200b}"),
];

/// The text a character replacement reference such as `nbsp` stands for.
#[must_use]
pub fn character_replacement(name: &str) -> Option<&'static str> {
    CHARACTER_REPLACEMENTS
        .iter()
        .find(|(candidate, _)| candidate.eq_ignore_ascii_case(name))
        .map(|(_, value)| *value)
}

/// Whether a formatting mark was doubled (`**bold**`, usable mid-word) or single
/// (`*bold*`, bounded by word edges).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Form {
    Constrained,
    Unconstrained,
}

/// Content of a bold, italic, monospace or superscript span.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FormattedText {
    pub form: Form,
    pub elements: Vec<Element>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkForm {
    /// A bare URL in running text.
    Autolink,
    /// `https://example.org[text]` or `link:target[text]`.
    Macro,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Link {
    pub url: String,
    pub form: LinkForm,
    /// Link text; empty when the URL itself is the text.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub elements: Vec<Element>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Email {
    pub address: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub elements: Vec<Element>,
}

/// An inline `[[id]]`, `[[id,label]]` or `anchor:id[label]`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Anchor {
    pub id: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub label: Vec<Element>,
    pub location: SourceLocation,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum XrefFormat {
    /// `<<id>>` or `<<id,text>>`.
    Natural,
    /// `xref:id[text]`.
    Macro,
}

/// A link to a target elsewhere in this (or another) document.
///
/// The target is named, never owned: `id` is looked up in the catalog built by
/// [`crate::resolve`], which fills in `resolution`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CrossReference {
    /// The target as written: an ID, a section title, or `path#fragment`.
    pub id: String,
    /// Explicit link text; empty when none was given.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub elements: Vec<Element>,
    pub format: XrefFormat,
    pub location: SourceLocation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution: Option<Resolution>,
}

impl CrossReference {
    /// The reference as it appeared in the source.
    #[must_use]
    pub fn source_text(&self) -> String {
        let text = crate::model::converter::to_plain_text(&self.elements);
        match (self.format, text.is_empty()) {
            (XrefFormat::Natural, true) => format!("<<{}>>", self.id),
            (XrefFormat::Natural, false) => format!("<<{},{text}>>", self.id),
            (XrefFormat::Macro, _) => format!("xref:{}[{text}]", self.id),
        }
    }

    /// `path` and `fragment` for `path#fragment` targets.
    #[must_use]
    pub fn split_target(&self) -> Option<(&str, &str)> {
        self.id.split_once('#')
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Resolution {
    pub target: ReferenceTarget,
    /// The text a renderer should show for the link.
    pub text: Vec<Element>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ReferenceTarget {
    /// An ID in this document's catalog.
    Internal { id: String },
    /// The document itself.
    Document,
    /// A fragment of another document that was not included here.
    External {
        path: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        fragment: Option<String>,
    },
    Unresolved,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn character_replacements_are_case_insensitive() {
        assert_eq!(character_replacement("nbsp"), Some("\u{a0}"));
        assert_eq!(character_replacement("NBSP"), Some("\u{a0}"));
        assert_eq!(character_replacement("two-colons"), Some("::"));
        assert_eq!(character_replacement("product"), None);
    }

    #[test]
    fn source_text_reflects_format() {
        let mut xref = CrossReference {
            id: "tigers".into(),
            elements: Vec::new(),
            format: XrefFormat::Natural,
            location: SourceLocation::default(),
            resolution: None,
        };
        assert_eq!(xref.source_text(), "<<tigers>>");
        xref.elements = vec![Element::String("Big cats".into())];
        assert_eq!(xref.source_text(), "<<tigers,Big cats>>");
        xref.format = XrefFormat::Macro;
        assert_eq!(xref.source_text(), "xref:tigers[Big cats]");
    }
}
