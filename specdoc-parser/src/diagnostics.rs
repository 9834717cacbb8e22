//! Recoverable problems found while reading, parsing and resolving a document.
//!
//! Every diagnostic is logged through `tracing` at the point it is raised and kept, in
//! order, on the finished [`crate::Document`].
use serde::Serialize;

use crate::model::SourceLocation;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Debug,
    Warning,
    Error,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<SourceLocation>,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.location {
            Some(location) => write!(f, "{location}: {}", self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

/// Collects diagnostics for one document.
#[derive(Clone, Debug, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warn(&mut self, location: Option<&SourceLocation>, message: impl Into<String>) {
        let message = message.into();
        match location {
            Some(location) => tracing::warn!(%location, "{message}"),
            None => tracing::warn!("{message}"),
        }
        self.push(Severity::Warning, location, message);
    }

    pub fn debug(&mut self, location: Option<&SourceLocation>, message: impl Into<String>) {
        let message = message.into();
        match location {
            Some(location) => tracing::debug!(%location, "{message}"),
            None => tracing::debug!("{message}"),
        }
        self.push(Severity::Debug, location, message);
    }

    pub fn error(&mut self, location: Option<&SourceLocation>, message: impl Into<String>) {
        let message = message.into();
        match location {
            Some(location) => tracing::error!(%location, "{message}"),
            None => tracing::error!("{message}"),
        }
        self.push(Severity::Error, location, message);
    }

    fn push(&mut self, severity: Severity, location: Option<&SourceLocation>, message: String) {
        self.entries.push(Diagnostic {
            severity,
            message,
            location: location.cloned(),
        });
    }

    #[must_use]
    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    /// Diagnostics at warning level or above.
    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.entries
            .iter()
            .filter(|d| d.severity >= Severity::Warning)
    }

    #[must_use]
    pub fn into_entries(self) -> Vec<Diagnostic> {
        self.entries
    }
}
