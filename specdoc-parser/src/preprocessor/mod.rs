//! The preprocessor turns raw source into the logical line stream the block parser
//! reads: conditionals are evaluated, includes are expanded in place and escaped
//! directives are unescaped.
use std::{
    collections::VecDeque,
    path::{Path, PathBuf},
    sync::Arc,
};

use crate::{
    Diagnostics, Options,
    model::{AttributeState, AttributeStore, IncludedFile, SourceLocation},
    source::{self, ContentProvider},
};

pub(crate) mod attribute;
pub(crate) mod conditional;
pub(crate) mod include;
pub(crate) mod tag;

use conditional::Directive;
use include::Include;

/// A logical line handed to the block parser.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Line {
    pub text: String,
    pub location: SourceLocation,
    /// Written by the reader itself rather than read from a file. These are
    /// `:leveloffset:` entries around included content.
    pub synthetic: bool,
}

impl Line {
    fn new(text: String, location: SourceLocation) -> Self {
        Self {
            text,
            location,
            synthetic: false,
        }
    }
}

#[derive(Debug)]
struct Source {
    file: Option<PathBuf>,
    /// Directory relative include targets resolve against.
    dir: Option<PathBuf>,
    lines: VecDeque<(usize, String)>,
    depth: usize,
    /// Where this source was included from.
    origin: SourceLocation,
    prelude: Option<String>,
    restore: Option<String>,
}

#[derive(Debug)]
struct Frame {
    active: bool,
    names: Vec<String>,
    directive: String,
    location: SourceLocation,
}

/// Yields preprocessed lines one at a time.
///
/// The attribute store is passed in on every call rather than owned: the block parser
/// applies attribute entries as it goes, and conditionals read later in the stream
/// must observe them.
#[derive(Debug)]
pub struct Reader {
    sources: Vec<Source>,
    frames: Vec<Frame>,
    lookahead: VecDeque<Line>,
    provider: Arc<dyn ContentProvider>,
    max_include_depth: usize,
    preprocess: bool,
    includes: Vec<IncludedFile>,
    finished: bool,
}

impl Reader {
    /// A reader over `input`. `path` names the file the input came from; relative
    /// includes resolve against its directory, else against `Options::base_dir`.
    #[must_use]
    pub fn new(input: &str, path: Option<&Path>, options: &Options) -> Self {
        let dir = path
            .and_then(Path::parent)
            .map(Path::to_path_buf)
            .or_else(|| options.base_dir.clone());
        let file = path.map(Path::to_path_buf);
        let lines = source::split_lines(input)
            .into_iter()
            .enumerate()
            .map(|(index, line)| (index + 1, line))
            .collect();
        Self {
            sources: vec![Source {
                origin: SourceLocation::new(file.clone(), 0),
                file,
                dir,
                lines,
                depth: 0,
                prelude: None,
                restore: None,
            }],
            frames: Vec::new(),
            lookahead: VecDeque::new(),
            provider: Arc::clone(&options.provider),
            max_include_depth: options.max_include_depth,
            preprocess: options.preprocess,
            includes: Vec::new(),
            finished: false,
        }
    }

    /// A reader replaying lines that were already preprocessed, such as the content
    /// of an AsciiDoc table cell.
    pub(crate) fn from_lines(lines: Vec<Line>, options: &Options) -> Self {
        Self {
            sources: Vec::new(),
            frames: Vec::new(),
            lookahead: lines.into(),
            provider: Arc::clone(&options.provider),
            max_include_depth: options.max_include_depth,
            preprocess: false,
            includes: Vec::new(),
            finished: true,
        }
    }

    pub fn next_line(
        &mut self,
        attributes: &mut AttributeStore,
        diagnostics: &mut Diagnostics,
    ) -> Option<Line> {
        if let Some(line) = self.lookahead.pop_front() {
            return Some(line);
        }
        self.read(attributes, diagnostics)
    }

    pub fn peek_line(
        &mut self,
        attributes: &mut AttributeStore,
        diagnostics: &mut Diagnostics,
    ) -> Option<&Line> {
        self.peek_nth(0, attributes, diagnostics)
    }

    /// Looks `n` lines ahead without consuming anything.
    pub fn peek_nth(
        &mut self,
        n: usize,
        attributes: &mut AttributeStore,
        diagnostics: &mut Diagnostics,
    ) -> Option<&Line> {
        while self.lookahead.len() <= n {
            let line = self.read(attributes, diagnostics)?;
            self.lookahead.push_back(line);
        }
        self.lookahead.get(n)
    }

    /// Files brought in so far, in the order their directives were read.
    #[must_use]
    pub fn includes(&self) -> &[IncludedFile] {
        &self.includes
    }

    pub(crate) fn take_includes(&mut self) -> Vec<IncludedFile> {
        std::mem::take(&mut self.includes)
    }

    fn skipping(&self) -> bool {
        self.frames.last().is_some_and(|frame| !frame.active)
    }

    fn read(
        &mut self,
        attributes: &mut AttributeStore,
        diagnostics: &mut Diagnostics,
    ) -> Option<Line> {
        loop {
            let Some(current) = self.sources.last_mut() else {
                self.finish(diagnostics);
                return None;
            };
            if let Some(prelude) = current.prelude.take() {
                return Some(Line {
                    text: prelude,
                    location: current.origin.clone(),
                    synthetic: true,
                });
            }
            let Some((number, text)) = current.lines.pop_front() else {
                let Some(done) = self.sources.pop() else {
                    continue;
                };
                tracing::trace!(file = ?done.file, depth = done.depth, "source exhausted");
                if let Some(restore) = done.restore {
                    return Some(Line {
                        text: restore,
                        location: done.origin,
                        synthetic: true,
                    });
                }
                continue;
            };
            let location = SourceLocation::new(current.file.clone(), number);

            if !self.preprocess {
                return Some(Line::new(text, location));
            }

            if let Some(escaped) = text.strip_prefix('\\') {
                if self.skipping() {
                    continue;
                }
                // Escaped conditionals lose their backslash, escaped includes keep it.
                if Directive::parse(escaped).is_some() {
                    return Some(Line::new(escaped.to_string(), location));
                }
                return Some(Line::new(text, location));
            }

            if let Some(directive) = Directive::parse(&text) {
                match self.conditional(directive, &text, location, attributes, diagnostics) {
                    Some(line) => return Some(line),
                    None => continue,
                }
            }

            if self.skipping() {
                continue;
            }

            if text.starts_with("include::") {
                match self.include(text, location, attributes, diagnostics) {
                    Some(line) => return Some(line),
                    None => continue,
                }
            }
            return Some(Line::new(text, location));
        }
    }

    /// Applies a conditional directive. Returns the line to emit for inline and inert
    /// forms, `None` when the directive only changes the frame stack.
    fn conditional(
        &mut self,
        directive: Directive,
        text: &str,
        location: SourceLocation,
        attributes: &AttributeStore,
        diagnostics: &mut Diagnostics,
    ) -> Option<Line> {
        let skipping = self.skipping();
        match directive {
            Directive::IfDef(condition) | Directive::IfNDef(condition) if skipping => {
                if !condition.is_inert() && condition.text.is_none() {
                    self.push_frame(false, condition.names, text, location);
                }
                None
            }
            Directive::IfEval { .. } if skipping => {
                self.push_frame(false, Vec::new(), text, location);
                None
            }
            Directive::IfDef(condition) | Directive::IfNDef(condition) if condition.is_inert() => {
                Some(Line::new(text.to_string(), location))
            }
            Directive::IfDef(condition) => {
                let defined = condition.is_defined(attributes);
                self.open(defined, condition, text, location)
            }
            Directive::IfNDef(condition) => {
                let defined = condition.is_defined(attributes);
                self.open(!defined, condition, text, location)
            }
            Directive::IfEval { target, expression } => {
                if !target.is_empty() {
                    diagnostics.warn(
                        Some(&location),
                        format!("malformed preprocessor directive - target not permitted: {text}"),
                    );
                    self.push_frame(false, Vec::new(), text, location);
                    return None;
                }
                let active = match conditional::evaluate(&expression, attributes) {
                    Ok(active) => active,
                    Err(message) => {
                        diagnostics.warn(Some(&location), message);
                        false
                    }
                };
                self.push_frame(active, Vec::new(), text, location);
                None
            }
            Directive::EndIf { names, text: body } => {
                let Some(frame) = self.frames.pop() else {
                    diagnostics.warn(
                        Some(&location),
                        format!("unmatched preprocessor directive: {text}"),
                    );
                    return None;
                };
                if self.skipping() {
                    return None;
                }
                if !names.is_empty() && names != frame.names {
                    diagnostics.warn(
                        Some(&location),
                        format!(
                            "mismatched preprocessor directive: expected endif::{}[] but found {text}",
                            frame.names.join(",")
                        ),
                    );
                } else if body.is_some() {
                    diagnostics.warn(
                        Some(&location),
                        format!("malformed preprocessor directive - text not permitted: {text}"),
                    );
                }
                None
            }
        }
    }

    fn open(
        &mut self,
        active: bool,
        condition: conditional::Condition,
        text: &str,
        location: SourceLocation,
    ) -> Option<Line> {
        tracing::trace!(directive = %text, active, "conditional");
        match condition.text {
            Some(inline) => active.then(|| Line::new(inline, location)),
            None => {
                self.push_frame(active, condition.names, text, location);
                None
            }
        }
    }

    fn push_frame(&mut self, active: bool, names: Vec<String>, text: &str, location: SourceLocation) {
        self.frames.push(Frame {
            active,
            names,
            directive: text.to_string(),
            location,
        });
    }

    fn max_depth(&self, attributes: &AttributeStore) -> usize {
        attributes
            .get("max-include-depth")
            .and_then(|value| value.trim().parse().ok())
            .unwrap_or(self.max_include_depth)
    }

    fn resolve_target(&self, target: &str) -> PathBuf {
        let target = Path::new(target);
        if target.is_absolute() {
            return source::normalize(target);
        }
        let dir = self.sources.last().and_then(|source| source.dir.as_deref());
        match dir {
            Some(dir) => source::normalize(&dir.join(target)),
            None => source::normalize(target),
        }
    }

    /// Expands an include directive. Returns a line to emit when the directive stays
    /// in the output, either as written or as an unresolved-directive message.
    #[tracing::instrument(level = "debug", skip(self, location, attributes, diagnostics))]
    fn include(
        &mut self,
        text: String,
        location: SourceLocation,
        attributes: &AttributeStore,
        diagnostics: &mut Diagnostics,
    ) -> Option<Line> {
        let depth = self.sources.last().map_or(0, |source| source.depth);
        let max_depth = self.max_depth(attributes);
        if depth + 1 > max_depth {
            tracing::debug!(depth, max_depth, "maximum include depth reached, not expanding");
            return Some(Line::new(text, location));
        }
        let Some(include) = Include::parse(&text, attributes, &location, diagnostics) else {
            return Some(Line::new(text, location));
        };

        let path = self.resolve_target(&include.target);
        let bytes = match self.provider.read(&path) {
            Ok(bytes) => bytes,
            Err(error) if include.optional => {
                diagnostics.debug(
                    Some(&location),
                    format!("optional include file '{}' not read: {error}", path.display()),
                );
                return None;
            }
            Err(error) => {
                diagnostics.error(
                    Some(&location),
                    format!("include file not readable: {} ({error})", path.display()),
                );
                return Some(Line::new(include.unresolved_line(&location), location));
            }
        };
        let content = match source::decode(&bytes, include.encoding, &path) {
            Ok(content) => content,
            Err(error) => {
                diagnostics.error(Some(&location), error.to_string());
                return Some(Line::new(include.unresolved_line(&location), location));
            }
        };

        let file = SourceLocation::new(Some(path.clone()), 0);
        let lines = include.select(&content, &file, diagnostics);
        self.includes.push(IncludedFile {
            path: path.clone(),
            selection: include.selection(),
            depth: depth + 1,
            location: location.clone(),
        });

        let (prelude, restore) = match include.level_offset {
            Some(offset) => {
                let (current, restore) = match attributes.state("leveloffset") {
                    AttributeState::Set(value) => (
                        value.trim().parse().unwrap_or(0),
                        format!(":leveloffset: {value}"),
                    ),
                    AttributeState::NeverSet | AttributeState::Unset => {
                        (0, ":leveloffset!:".to_string())
                    }
                };
                (
                    Some(format!(":leveloffset: {}", offset.apply(current))),
                    Some(restore),
                )
            }
            None => (None, None),
        };

        tracing::debug!(path = %path.display(), lines = lines.len(), depth = depth + 1, "including file");
        self.sources.push(Source {
            dir: path.parent().map(Path::to_path_buf),
            file: Some(path),
            lines: lines.into(),
            depth: depth + 1,
            origin: location,
            prelude,
            restore,
        });
        None
    }

    fn finish(&mut self, diagnostics: &mut Diagnostics) {
        if self.finished {
            return;
        }
        self.finished = true;
        for frame in self.frames.drain(..) {
            diagnostics.warn(
                Some(&frame.location),
                format!("unterminated preprocessor conditional directive: {}", frame.directive),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use tracing_test::traced_test;

    use super::*;
    use crate::{InMemory, model::IncludeSelection};

    fn options(provider: InMemory) -> Options {
        Options::builder()
            .with_provider(Arc::new(provider))
            .with_base_dir("/docs")
            .build()
    }

    fn read_all(input: &str, options: &Options) -> (Vec<Line>, Reader, AttributeStore, Diagnostics) {
        let mut attributes = options.attributes.clone();
        let mut diagnostics = Diagnostics::new();
        let mut reader = Reader::new(input, None, options);
        let mut lines = Vec::new();
        while let Some(line) = reader.next_line(&mut attributes, &mut diagnostics) {
            lines.push(line);
        }
        (lines, reader, attributes, diagnostics)
    }

    fn texts(input: &str, options: &Options) -> Vec<String> {
        read_all(input, options).0.into_iter().map(|line| line.text).collect()
    }

    #[test]
    fn ifdef_and_ifndef_blocks() {
        let options = Options::builder().with_attribute("flag", "").build();
        let input = "a\nifdef::flag[]\nb\nendif::flag[]\nifndef::flag[]\nc\nendif::[]\nd";
        assert_eq!(texts(input, &options), vec!["a", "b", "d"]);
    }

    #[test]
    fn inline_conditionals_emit_their_text() {
        let options = Options::builder().with_attribute("on", "").build();
        let input = "ifdef::on[shown]\nifdef::off[hidden]\nifndef::off[also shown]";
        assert_eq!(texts(input, &options), vec!["shown", "also shown"]);
    }

    #[test]
    fn nested_conditionals_are_only_counted_while_skipping() {
        let input = "ifdef::off[]\nifeval::[bogus]\nx\nendif::[]\ny\nendif::off[]\nz";
        let (lines, _, _, diagnostics) = read_all(input, &Options::default());
        let texts: Vec<_> = lines.iter().map(|line| line.text.as_str()).collect();
        assert_eq!(texts, vec!["z"]);
        assert!(diagnostics.entries().is_empty());
    }

    #[test]
    fn ifeval_compares_substituted_values() {
        let options = Options::builder().with_attribute("count", "10").build();
        let input = "ifeval::[{count} > 9]\nbig\nendif::[]\nifeval::['{leveloffset}' == '0']\nzero\nendif::[]";
        assert_eq!(texts(input, &options), vec!["big"]);
    }

    #[test]
    fn ifeval_nil_matches_unset() {
        let input = "ifeval::['{foo}' == nil]\nyes\nendif::[]";
        assert_eq!(texts(input, &Options::default()), vec!["yes"]);
    }

    #[test]
    fn escaped_directives() {
        let input = "\\ifdef::flag[]\n\\include::a.adoc[]\n\\endif::[]";
        assert_eq!(
            texts(input, &Options::default()),
            vec!["ifdef::flag[]", "\\include::a.adoc[]", "endif::[]"]
        );
    }

    #[test]
    fn inert_ifdef_is_literal() {
        assert_eq!(texts("ifdef::[]\nx", &Options::default()), vec!["ifdef::[]", "x"]);
    }

    #[traced_test]
    #[test]
    fn mismatched_and_unterminated_conditionals_warn() {
        let options = Options::builder().with_attribute("a", "").build();
        let input = "ifdef::a[]\nx\nendif::b[]\nifdef::a[]\ny\nendif::a[extra]\nifdef::a[]\nz\nendif::[]\nendif::[]\nifdef::a[]";
        let (lines, _, _, diagnostics) = read_all(input, &options);
        let texts: Vec<_> = lines.iter().map(|line| line.text.as_str()).collect();
        assert_eq!(texts, vec!["x", "y", "z"]);
        let messages: Vec<_> = diagnostics.warnings().map(|d| d.message.as_str()).collect();
        assert_eq!(
            messages,
            vec![
                "mismatched preprocessor directive: expected endif::a[] but found endif::b[]",
                "malformed preprocessor directive - text not permitted: endif::a[extra]",
                "unmatched preprocessor directive: endif::[]",
                "unterminated preprocessor conditional directive: ifdef::a[]",
            ]
        );
        assert!(logs_contain("unterminated preprocessor conditional directive"));
    }

    #[test]
    fn ifeval_with_target_is_malformed() {
        let (lines, _, _, diagnostics) =
            read_all("ifeval::x[1 == 1]\nhidden\nendif::[]", &Options::default());
        assert!(lines.is_empty());
        assert_eq!(diagnostics.warnings().count(), 1);
    }

    #[test]
    fn includes_expand_in_place_with_locations() {
        let provider = InMemory::new()
            .with_file("/docs/part.adoc", "one\ntwo")
            .with_file("/docs/sub/nested.adoc", "deep");
        let options = options(provider);
        let (lines, reader, _, diagnostics) = read_all(
            "before\ninclude::part.adoc[]\ninclude::sub/nested.adoc[]\nafter",
            &options,
        );
        let texts: Vec<_> = lines.iter().map(|line| line.text.as_str()).collect();
        assert_eq!(texts, vec!["before", "one", "two", "deep", "after"]);
        assert_eq!(
            lines.get(2).map(|line| line.location.clone()),
            Some(SourceLocation::new(Some("/docs/part.adoc".into()), 2))
        );
        assert_eq!(reader.includes().len(), 2);
        assert!(diagnostics.entries().is_empty());
    }

    #[test]
    fn nested_includes_resolve_against_their_own_directory() {
        let provider = InMemory::new()
            .with_file("/docs/chapters/one.adoc", "include::shared/snippet.adoc[]")
            .with_file("/docs/chapters/shared/snippet.adoc", "snippet");
        let options = options(provider);
        let (lines, reader, _, _) = read_all("include::chapters/one.adoc[]", &options);
        assert_eq!(lines.first().map(|line| line.text.as_str()), Some("snippet"));
        let depths: Vec<_> = reader.includes().iter().map(|file| file.depth).collect();
        assert_eq!(depths, vec![1, 2]);
    }

    #[test]
    fn missing_include_becomes_an_unresolved_line() {
        let (lines, _, _, diagnostics) =
            read_all("include::missing.adoc[]", &options(InMemory::new()));
        assert_eq!(
            lines.first().map(|line| line.text.as_str()),
            Some("Unresolved directive in <input> - include::missing.adoc[]")
        );
        let severities: Vec<_> = diagnostics.warnings().map(|d| d.severity).collect();
        assert_eq!(severities, vec![crate::Severity::Error]);
    }

    #[test]
    fn missing_optional_include_is_dropped() {
        let (lines, _, _, diagnostics) =
            read_all("a\ninclude::missing.adoc[opts=optional]\nb", &options(InMemory::new()));
        let texts: Vec<_> = lines.iter().map(|line| line.text.as_str()).collect();
        assert_eq!(texts, vec!["a", "b"]);
        assert_eq!(diagnostics.warnings().count(), 0);
    }

    #[test]
    fn non_utf8_include_without_encoding_fails_locally() {
        let provider = InMemory::new().with_file("/docs/latin1.txt", vec![b'c', b'a', b'f', 0xE9]);
        let (lines, _, _, diagnostics) =
            read_all("include::latin1.txt[]\nafter", &options(provider));
        let texts: Vec<_> = lines.iter().map(|line| line.text.as_str()).collect();
        assert_eq!(
            texts,
            vec!["Unresolved directive in <input> - include::latin1.txt[]", "after"]
        );
        assert_eq!(diagnostics.warnings().count(), 1);
    }

    #[test]
    fn explicit_encoding_decodes_include() {
        let provider = InMemory::new().with_file("/docs/latin1.txt", vec![b'c', b'a', b'f', 0xE9]);
        let lines = texts("include::latin1.txt[encoding=iso-8859-1]", &options(provider));
        assert_eq!(lines, vec!["café"]);
    }

    #[test]
    fn include_target_is_attribute_substituted() {
        let provider = InMemory::new().with_file("/docs/partials/a.adoc", "from partials");
        let mut options = options(provider);
        options.attributes.set("partials", "partials");
        assert_eq!(texts("include::{partials}/a.adoc[]", &options), vec!["from partials"]);
    }

    #[test]
    fn depth_limit_leaves_directive_literal() {
        let provider = InMemory::new().with_file("/docs/self.adoc", "x\ninclude::self.adoc[]");
        let mut options = options(provider);
        options.attributes.set("max-include-depth", "3");
        let (lines, reader, _, _) = read_all("include::self.adoc[]", &options);
        let texts: Vec<_> = lines.iter().map(|line| line.text.as_str()).collect();
        assert_eq!(texts, vec!["x", "x", "x", "include::self.adoc[]"]);
        assert_eq!(reader.includes().len(), 3);
    }

    #[test]
    fn default_depth_comes_from_options() {
        let provider = InMemory::new().with_file("/docs/self.adoc", "include::self.adoc[]");
        let options = Options::builder()
            .with_provider(Arc::new(provider))
            .with_base_dir("/docs")
            .with_max_include_depth(2)
            .build();
        let (lines, reader, _, _) = read_all("include::self.adoc[]", &options);
        assert_eq!(lines.len(), 1);
        assert_eq!(reader.includes().len(), 2);
    }

    #[test]
    fn leveloffset_is_set_and_restored() {
        let provider = InMemory::new().with_file("/docs/part.adoc", "== Part");
        let (lines, _, _, _) =
            read_all("include::part.adoc[leveloffset=+1]", &options(provider));
        let rendered: Vec<_> = lines
            .iter()
            .map(|line| (line.text.as_str(), line.synthetic))
            .collect();
        assert_eq!(
            rendered,
            vec![
                (":leveloffset: 1", true),
                ("== Part", false),
                (":leveloffset!:", true),
            ]
        );
    }

    #[test]
    fn tagged_include_records_selection() {
        let provider = InMemory::new().with_file(
            "/docs/dog.rb",
            "// tag::bark[]\nwoof\n// end::bark[]\n// tag::sit[]\nsit\n// end::sit[]",
        );
        let (lines, reader, _, _) = read_all("include::dog.rb[tag=bark]", &options(provider));
        let texts: Vec<_> = lines.iter().map(|line| line.text.as_str()).collect();
        assert_eq!(texts, vec!["woof"]);
        assert_eq!(
            reader.includes().first().map(|file| file.selection.clone()),
            Some(IncludeSelection::Tags("bark".into()))
        );
    }

    #[test]
    fn directives_pass_through_without_preprocessing() {
        let options = Options::builder().without_preprocessor().build();
        let input = "ifdef::x[]\ninclude::a.adoc[]\nendif::[]";
        assert_eq!(
            texts(input, &options),
            vec!["ifdef::x[]", "include::a.adoc[]", "endif::[]"]
        );
    }

    #[test]
    fn peeking_does_not_consume() {
        let options = Options::default();
        let mut attributes = AttributeStore::new();
        let mut diagnostics = Diagnostics::new();
        let mut reader = Reader::new("a\nb", None, &options);
        assert_eq!(
            reader
                .peek_nth(1, &mut attributes, &mut diagnostics)
                .map(|line| line.text.clone()),
            Some("b".to_string())
        );
        assert_eq!(
            reader
                .next_line(&mut attributes, &mut diagnostics)
                .map(|line| line.text),
            Some("a".to_string())
        );
    }
}
