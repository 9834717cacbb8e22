use std::path::PathBuf;

/// Failures that stop a parse before any document content is produced.
///
/// Problems inside the content (a missing include, a malformed `ifeval`, an unterminated
/// block) never surface here: they are reported as [`crate::Diagnostic`]s and the parse
/// carries on.
#[non_exhaustive]
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("unable to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unrecognized encoding in file: {0}")]
    UnrecognizedEncodingInFile(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// The file the error relates to, when there is one.
    #[must_use]
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            Self::Read { path, .. } | Self::UnrecognizedEncodingInFile(path) => Some(path),
            Self::Io(_) | Self::Json(_) => None,
        }
    }

    /// Get advice for this error if available.
    #[must_use]
    pub fn advice(&self) -> Option<&'static str> {
        match self {
            Self::UnrecognizedEncodingInFile(_) => Some(
                "Save the document as UTF-8, or as UTF-16 with a byte order mark, so it can be decoded",
            ),
            Self::Read { .. } => Some("Check that the path exists and is readable"),
            Self::Io(_) | Self::Json(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_error_reports_path_and_advice() {
        let error = Error::Read {
            path: PathBuf::from("missing.adoc"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
        };
        assert_eq!(error.path(), Some(&PathBuf::from("missing.adoc")));
        assert!(error.advice().is_some());
        assert_eq!(error.to_string(), "unable to read missing.adoc: no such file");
    }
}
