//! A parser for AsciiDoc-flavoured specification documents.
//!
//! Parsing runs in three stages over a single document:
//!
//! 1. the [`Reader`] turns raw text into logical lines, evaluating conditionals and
//!    expanding includes against the document's attributes;
//! 2. the block parser builds the tree from those lines, handing each block's text to
//!    the inline parser;
//! 3. [`resolve`] catalogs IDs and titles and resolves every cross-reference.
//!
//! ```
//! use specdoc_parser::{Element, Options, parse, to_plain_text};
//!
//! let document = parse("== Tigers\n\nSee <<tigers>>.\n", &Options::default())?;
//! let xref = &document.cross_references()[0];
//! let text = xref.resolution.as_ref().map(|r| to_plain_text(&r.text));
//! assert_eq!(text.as_deref(), Some("Tigers"));
//! # Ok::<(), specdoc_parser::Error>(())
//! ```
//!
//! Problems in the content never fail the parse: they are collected as
//! [`Diagnostic`]s on the returned [`Document`] and logged through `tracing`.
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tracing::instrument;

mod blocks;
mod diagnostics;
mod error;
mod inlines;
mod model;
mod options;
mod preprocessor;
mod source;
mod xref;

#[cfg(test)]
mod proptests;

pub use diagnostics::{Diagnostic, Diagnostics, Severity};
pub use error::Error;
pub use model::*;
pub use options::{DEFAULT_MAX_INCLUDE_DEPTH, Options, OptionsBuilder};
pub use preprocessor::{Line, Reader};
pub use source::{ContentProvider, FileSystem, InMemory, normalize};
pub use xref::{Catalog, CatalogEntry, TargetKind, resolve};

use blocks::BlockParser;

/// Parses `input` as a document with no file of its own. Relative includes resolve
/// against [`Options::base_dir`], else the working directory.
///
/// # Errors
///
/// Currently never fails for string input; the `Result` matches [`parse_file`].
#[instrument(skip(input, options), fields(len = input.len()))]
pub fn parse(input: &str, options: &Options) -> Result<Document, Error> {
    Ok(parse_document(input, None, options))
}

/// Reads `path` through the configured [`ContentProvider`] and parses it. Relative
/// includes resolve against the file's directory.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is neither UTF-8 nor UTF-16 with a
/// byte order mark.
#[instrument(skip(path, options), fields(path = %path.as_ref().display()))]
pub fn parse_file<P: AsRef<Path>>(path: P, options: &Options) -> Result<Document, Error> {
    let path = source::normalize(path.as_ref());
    let bytes = options.provider.read(&path).map_err(|source| Error::Read {
        path: path.clone(),
        source,
    })?;
    let input = source::decode(&bytes, None, &path)?;
    Ok(parse_document(&input, Some(path), options))
}

/// Parses independent documents in parallel. Results come back in the order of
/// `paths`.
#[instrument(skip_all, fields(count = paths.len()))]
pub fn parse_files<P: AsRef<Path> + Sync>(paths: &[P], options: &Options) -> Vec<Result<Document, Error>> {
    paths.par_iter().map(|path| parse_file(path, options)).collect()
}

fn parse_document(input: &str, path: Option<PathBuf>, options: &Options) -> Document {
    let reader = Reader::new(input, path.as_deref(), options);
    let (elements, attributes, diagnostics, includes) = BlockParser::new(reader, options).parse();
    let mut document = Document {
        path,
        attributes,
        elements,
        includes,
        catalog: Catalog::default(),
        diagnostics: diagnostics.into_entries(),
    };
    if options.resolve {
        resolve(&mut document, options);
    }
    tracing::debug!(
        elements = document.elements.len(),
        diagnostics = document.diagnostics.len(),
        "parsed document"
    );
    document
}
