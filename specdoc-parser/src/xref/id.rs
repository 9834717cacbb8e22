use crate::model::{AttributeState, AttributeStore};

/// How section IDs are generated from titles, as configured by the `sectids`,
/// `idprefix` and `idseparator` attributes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct IdRules {
    pub(crate) enabled: bool,
    pub(crate) prefix: String,
    pub(crate) separator: String,
}

impl IdRules {
    pub(crate) fn new(attributes: &AttributeStore) -> Self {
        let prefix = match attributes.state("idprefix") {
            AttributeState::Set(prefix) => prefix.to_string(),
            AttributeState::NeverSet | AttributeState::Unset => String::new(),
        };
        let separator = match attributes.state("idseparator") {
            AttributeState::Set(separator) => separator.to_string(),
            AttributeState::NeverSet | AttributeState::Unset => "_".to_string(),
        };
        Self {
            enabled: !matches!(attributes.state("sectids"), AttributeState::Unset),
            prefix,
            separator,
        }
    }

    /// The ID for a section titled `title`, before collisions are resolved.
    pub(crate) fn generate(&self, title: &str) -> String {
        format!("{}{}", self.prefix, slug(title, &self.separator))
    }
}

/// Lowercases `title`, turns whitespace, `-` and `.` into `separator`, drops every
/// other non-alphanumeric character and collapses repeated separators.
pub(crate) fn slug(title: &str, separator: &str) -> String {
    let mut id = String::with_capacity(title.len());
    let mut pending_separator = false;
    for c in title.chars().flat_map(char::to_lowercase) {
        if c.is_alphanumeric() || c == '_' && separator != "_" {
            if pending_separator && !id.is_empty() {
                id.push_str(separator);
            }
            pending_separator = false;
            id.push(c);
        } else if c.is_whitespace() || matches!(c, '-' | '.' | '_') {
            pending_separator = true;
        }
    }
    id
}
