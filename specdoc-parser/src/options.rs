use std::{path::PathBuf, sync::Arc};

use crate::{
    model::AttributeStore,
    source::{ContentProvider, FileSystem},
};

/// Include nesting allowed when the `max-include-depth` attribute is not set.
pub const DEFAULT_MAX_INCLUDE_DEPTH: usize = 64;

#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct Options {
    /// Attributes in effect before the first line is read.
    pub attributes: AttributeStore,
    /// Directory include targets resolve against when parsing a string.
    pub base_dir: Option<PathBuf>,
    pub max_include_depth: usize,
    /// Evaluate conditionals and expand includes. When off, directives are kept in
    /// the tree as `IfDef`, `FileInclude`, ... nodes.
    pub preprocess: bool,
    /// Run the cross-reference resolver after parsing.
    pub resolve: bool,
    /// Record unresolved cross-references as warnings.
    pub verbose: bool,
    /// Accept two-line section titles:
    /// ```text
    /// Document Title
    /// ==============
    /// ```
    pub setext: bool,
    pub provider: Arc<dyn ContentProvider>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            attributes: AttributeStore::default(),
            base_dir: None,
            max_include_depth: DEFAULT_MAX_INCLUDE_DEPTH,
            preprocess: true,
            resolve: true,
            verbose: false,
            setext: true,
            provider: Arc::new(FileSystem),
        }
    }
}

impl Options {
    /// Create a new `OptionsBuilder` for fluent configuration.
    ///
    /// # Example
    ///
    /// ```
    /// use specdoc_parser::Options;
    ///
    /// let options = Options::builder()
    ///     .with_attribute("toc", "left")
    ///     .with_max_include_depth(8)
    ///     .with_verbose()
    ///     .build();
    /// ```
    #[must_use]
    pub fn builder() -> OptionsBuilder {
        OptionsBuilder::default()
    }

    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

/// Builder for `Options`.
///
/// Create an `OptionsBuilder` using `Options::builder()`.
#[derive(Debug, Clone, Default)]
pub struct OptionsBuilder {
    options: Options,
}

impl OptionsBuilder {
    #[must_use]
    pub fn with_attribute(mut self, name: &str, value: impl Into<String>) -> Self {
        self.options.attributes.set(name, value);
        self
    }

    /// Start with `name` explicitly unset, so `ifndef::name[]` holds and the document
    /// sees it as switched off rather than never mentioned.
    #[must_use]
    pub fn with_unset_attribute(mut self, name: &str) -> Self {
        self.options.attributes.unset(name);
        self
    }

    /// Set all initial attributes at once, replacing any added so far.
    ///
    /// # Example
    ///
    /// ```
    /// use specdoc_parser::{AttributeStore, Options};
    ///
    /// let attributes: AttributeStore = [("product", "Widget")].into_iter().collect();
    /// let options = Options::builder().with_attributes(attributes).build();
    /// assert_eq!(options.attributes.get("product"), Some("Widget"));
    /// ```
    #[must_use]
    pub fn with_attributes(mut self, attributes: AttributeStore) -> Self {
        self.options.attributes = attributes;
        self
    }

    #[must_use]
    pub fn with_base_dir(mut self, base_dir: impl Into<PathBuf>) -> Self {
        self.options.base_dir = Some(base_dir.into());
        self
    }

    #[must_use]
    pub fn with_max_include_depth(mut self, depth: usize) -> Self {
        self.options.max_include_depth = depth;
        self
    }

    /// Read documents and include targets through `provider` instead of the file
    /// system.
    ///
    /// # Example
    ///
    /// ```
    /// use std::sync::Arc;
    /// use specdoc_parser::{InMemory, Options};
    ///
    /// let provider = InMemory::new().with_file("chapter.adoc", "== Chapter\n");
    /// let options = Options::builder().with_provider(Arc::new(provider)).build();
    /// ```
    #[must_use]
    pub fn with_provider(mut self, provider: Arc<dyn ContentProvider>) -> Self {
        self.options.provider = provider;
        self
    }

    #[must_use]
    pub fn without_preprocessor(mut self) -> Self {
        self.options.preprocess = false;
        self
    }

    #[must_use]
    pub fn without_resolver(mut self) -> Self {
        self.options.resolve = false;
        self
    }

    #[must_use]
    pub fn with_verbose(mut self) -> Self {
        self.options.verbose = true;
        self
    }

    #[must_use]
    pub fn without_setext(mut self) -> Self {
        self.options.setext = false;
        self
    }

    #[must_use]
    pub fn build(self) -> Options {
        self.options
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults_match_options_default() {
        let options = Options::builder().build();
        assert!(options.preprocess);
        assert!(options.resolve);
        assert!(options.setext);
        assert!(!options.verbose);
        assert_eq!(options.max_include_depth, DEFAULT_MAX_INCLUDE_DEPTH);
    }

    #[test]
    fn builder_sets_and_unsets_attributes() {
        let options = Options::builder()
            .with_attribute("toc", "left")
            .with_unset_attribute("sectids")
            .without_resolver()
            .build();
        assert_eq!(options.attributes.get("toc"), Some("left"));
        assert!(!options.attributes.is_set("sectids"));
        assert!(!options.resolve);
    }
}
