use std::borrow::Cow;

use indexmap::IndexMap;
use serde::Serialize;

use crate::model::inlines::character_replacement;

/// The value held by an attribute that has been mentioned at least once.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum AttributeValue {
    String(String),
    /// Explicitly unset with `:name!:` or `:!name:`.
    Unset,
}

/// How an attribute currently stands in the store.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AttributeState<'a> {
    NeverSet,
    Set(&'a str),
    Unset,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StoredAttribute {
    /// The name as first written, before case folding.
    pub name: String,
    pub value: AttributeValue,
}

/// Per-document attribute state.
///
/// Names are case-insensitive and iteration follows the order in which names were
/// first set. The store is threaded explicitly through the reader and parser so that
/// every line observes the mutations made by the lines before it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct AttributeStore(IndexMap<String, StoredAttribute>);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Missing {
    /// Leave `{name}` as written.
    Keep,
    /// Replace `{name}` with nothing.
    Empty,
}

impl AttributeStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        let key = name.to_lowercase();
        let value = AttributeValue::String(value.into());
        match self.0.get_mut(&key) {
            Some(entry) => entry.value = value,
            None => {
                self.0.insert(
                    key,
                    StoredAttribute {
                        name: name.to_string(),
                        value,
                    },
                );
            }
        }
    }

    pub fn unset(&mut self, name: &str) {
        let key = name.to_lowercase();
        match self.0.get_mut(&key) {
            Some(entry) => entry.value = AttributeValue::Unset,
            None => {
                self.0.insert(
                    key,
                    StoredAttribute {
                        name: name.to_string(),
                        value: AttributeValue::Unset,
                    },
                );
            }
        }
    }

    /// The value of `name`, if it is currently set.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        match self.state(name) {
            AttributeState::Set(value) => Some(value),
            AttributeState::NeverSet | AttributeState::Unset => None,
        }
    }

    #[must_use]
    pub fn is_set(&self, name: &str) -> bool {
        matches!(self.state(name), AttributeState::Set(_))
    }

    #[must_use]
    pub fn state(&self, name: &str) -> AttributeState<'_> {
        match self.0.get(&name.to_lowercase()).map(|entry| &entry.value) {
            Some(AttributeValue::String(value)) => AttributeState::Set(value),
            Some(AttributeValue::Unset) => AttributeState::Unset,
            None => AttributeState::NeverSet,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &StoredAttribute> {
        self.0.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Copies every entry of `other` over this store, in `other`'s order.
    pub fn merge(&mut self, other: &AttributeStore) {
        for entry in other.iter() {
            match &entry.value {
                AttributeValue::String(value) => self.set(&entry.name, value.clone()),
                AttributeValue::Unset => self.unset(&entry.name),
            }
        }
    }

    /// Replace `{name}` references with attribute values.
    ///
    /// Built-in character replacements (`{nbsp}`, `{amp}`, ...) resolve unless the
    /// document overrides them. Unresolved references and escaped references
    /// (`\{name}`) are left as written.
    #[must_use]
    pub fn substitute<'a>(&self, text: &'a str) -> Cow<'a, str> {
        self.substitute_references(text, true, Missing::Keep)
    }

    pub(crate) fn substitute_references<'a>(
        &self,
        text: &'a str,
        intrinsics: bool,
        missing: Missing,
    ) -> Cow<'a, str> {
        if !text.contains('{') {
            return Cow::Borrowed(text);
        }
        let mut out = String::with_capacity(text.len());
        let mut rest = text;
        while let Some(open) = rest.find('{') {
            let (before, from_brace) = rest.split_at(open);
            out.push_str(before);
            let escaped = before.ends_with('\\');
            let Some((name, after)) = split_reference(from_brace) else {
                out.push('{');
                rest = from_brace.get(1..).unwrap_or_default();
                continue;
            };
            let replacement = if escaped {
                None
            } else {
                match self.state(name) {
                    AttributeState::Set(value) => Some(value),
                    AttributeState::NeverSet | AttributeState::Unset => {
                        if intrinsics {
                            character_replacement(name)
                        } else {
                            None
                        }
                    }
                }
            };
            match replacement {
                Some(value) => out.push_str(value),
                None if !escaped
                    && missing == Missing::Empty
                    && character_replacement(name).is_none() =>
                {}
                None => {
                    out.push('{');
                    out.push_str(name);
                    out.push('}');
                }
            }
            rest = after;
        }
        out.push_str(rest);
        Cow::Owned(out)
    }

    /// Like [`AttributeStore::substitute`], but a reference to an attribute that is not
    /// set resolves to the empty string.
    #[must_use]
    pub fn substitute_or_empty(&self, text: &str) -> String {
        self.substitute_references(text, true, Missing::Empty)
            .into_owned()
    }
}

/// Splits `{name}rest` into `name` and `rest` when the braces hold a valid attribute
/// name.
fn split_reference(text: &str) -> Option<(&str, &str)> {
    let inner = text.strip_prefix('{')?;
    let close = inner.find('}')?;
    let name = inner.get(..close)?;
    if is_attribute_name(name) {
        Some((name, inner.get(close + 1..).unwrap_or_default()))
    } else {
        None
    }
}

#[must_use]
pub(crate) fn is_attribute_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for AttributeStore {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut store = Self::new();
        for (name, value) in iter {
            store.set(name.as_ref(), value);
        }
        store
    }
}
