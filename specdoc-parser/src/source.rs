//! Where document bytes come from and how they become text.
use std::{
    fmt,
    io,
    path::{Path, PathBuf},
};

use encoding_rs::{Encoding, UTF_8, UTF_16BE, UTF_16LE};
use rustc_hash::FxHashMap;

use crate::Error;

/// BOM (Byte Order Mark) patterns for encoding detection
const BOM_PATTERNS: &[(&[u8], &Encoding, usize, &str)] = &[
    (&[0xEF, 0xBB, 0xBF], UTF_8, 3, "UTF-8"),
    (&[0xFF, 0xFE], UTF_16LE, 2, "UTF-16 LE"),
    (&[0xFE, 0xFF], UTF_16BE, 2, "UTF-16 BE"),
];

/// Resolves a path to the raw bytes of a document or include target.
pub trait ContentProvider: fmt::Debug + Send + Sync {
    /// # Errors
    ///
    /// Returns an error when the content does not exist or cannot be read.
    fn read(&self, path: &Path) -> io::Result<Vec<u8>>;
}

/// Reads from the local file system.
#[derive(Clone, Copy, Debug, Default)]
pub struct FileSystem;

impl ContentProvider for FileSystem {
    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        std::fs::read(path)
    }
}

/// Serves documents from memory, keyed by path. Handy for tests and for tools that
/// hold unsaved buffers.
#[derive(Clone, Debug, Default)]
pub struct InMemory {
    files: FxHashMap<PathBuf, Vec<u8>>,
}

impl InMemory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_file(mut self, path: impl Into<PathBuf>, content: impl Into<Vec<u8>>) -> Self {
        self.insert(path, content);
        self
    }

    pub fn insert(&mut self, path: impl Into<PathBuf>, content: impl Into<Vec<u8>>) {
        self.files.insert(normalize(&path.into()), content.into());
    }
}

impl ContentProvider for InMemory {
    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        self.files.get(&normalize(path)).cloned().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} not found", path.display()),
            )
        })
    }
}

/// Decodes document bytes.
///
/// An explicit encoding always wins. Otherwise a byte order mark selects UTF-8 or
/// UTF-16, and content without one must be valid UTF-8.
///
/// # Errors
///
/// Returns [`Error::UnrecognizedEncodingInFile`] if the bytes are not valid UTF-8
/// and carry no byte order mark.
pub(crate) fn decode(
    bytes: &[u8],
    encoding: Option<&'static Encoding>,
    path: &Path,
) -> Result<String, Error> {
    if let Some(encoding) = encoding {
        let (cow, _, had_errors) = encoding.decode(bytes);
        if had_errors {
            tracing::error!(
                path = ?path.display(),
                encoding = encoding.name(),
                "decoding encountered errors"
            );
        }
        return Ok(cow.into_owned());
    }

    for (bom, encoding, skip, name) in BOM_PATTERNS {
        if bytes.starts_with(bom)
            && let Some(content) = bytes.get(*skip..)
        {
            let (cow, had_errors) = encoding.decode_without_bom_handling(content);
            if had_errors {
                tracing::error!(
                    path = ?path.display(),
                    encoding = name,
                    "decoding encountered errors"
                );
            }
            return Ok(cow.into_owned());
        }
    }

    match std::str::from_utf8(bytes) {
        Ok(text) => Ok(text.to_string()),
        Err(_) => Err(Error::UnrecognizedEncodingInFile(path.to_path_buf())),
    }
}

/// Looks up an encoding by its WHATWG label (`iso-8859-1`, `utf-16le`, ...).
pub(crate) fn encoding_for_label(label: &str) -> Option<&'static Encoding> {
    Encoding::for_label(label.trim().as_bytes())
}

/// Lexically cleans a path: drops `.` segments and folds `dir/..` pairs. The file
/// system is never consulted, so symlinks are not followed.
#[must_use]
pub fn normalize(path: &Path) -> PathBuf {
    use std::path::Component;

    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let can_pop = matches!(
                    out.components().next_back(),
                    Some(Component::Normal(_))
                );
                if can_pop {
                    out.pop();
                } else {
                    out.push("..");
                }
            }
            Component::Prefix(_) | Component::RootDir | Component::Normal(_) => {
                out.push(component.as_os_str());
            }
        }
    }
    out
}

/// Splits text into lines, dropping line terminators and trailing whitespace.
pub(crate) fn split_lines(text: &str) -> Vec<String> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    text.lines().map(|line| line.trim_end().to_string()).collect()
}
