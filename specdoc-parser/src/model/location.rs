use std::{fmt, path::PathBuf};

use serde::Serialize;

/// Where a physical source line came from.
///
/// For included content `file` is the included file, not the document that pulled it
/// in, so diagnostics and catalog entries point at the text the author actually wrote.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize)]
pub struct SourceLocation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
    /// 1-based line number.
    pub line: usize,
}

impl SourceLocation {
    #[must_use]
    pub fn new(file: Option<PathBuf>, line: usize) -> Self {
        Self { file, line }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.file {
            Some(file) => write!(f, "{}:{}", file.display(), self.line),
            None => write!(f, "<input>:{}", self.line),
        }
    }
}
