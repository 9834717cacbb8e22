//! Block parsing: turns the preprocessed line stream into the tree.
//!
//! The parser pulls lines from the [`Reader`] one at a time and dispatches on the
//! shape of the line in front of it. Block attribute lines, anchors and titles are
//! collected until the next block claims them.
use crate::{
    Diagnostics, Options,
    model::{
        AnchorAttribute, Attribute, AttributeEntry, AttributeList, AttributeReset,
        AttributeStore, Delimiter, Element, IncludedFile, Section, SourceLocation, ThematicBreak,
        TitleAttribute, VerbatimBlock,
    },
    inlines,
    preprocessor::{
        Line, Reader,
        attribute::{self, AttributeLine},
        conditional, include,
    },
};

pub(crate) mod attribute_list;
mod delimited;
mod image;
mod list;
mod paragraph;
mod section;
mod table;

use section::SectionStack;

/// What a single dispatch produced.
enum Step {
    Block(Element),
    Section(Section),
    /// Attributes, an anchor or a title were stashed for the next block.
    Pending,
}

pub(crate) struct BlockParser<'o> {
    reader: Reader,
    attributes: AttributeStore,
    diagnostics: Diagnostics,
    options: &'o Options,
    /// Lists currently being read. Paragraphs inside a list stop at the next marker.
    list_depth: usize,
    /// Delimiters of the blocks open around the current line, innermost last.
    enclosing: Vec<Delimiter>,
}

impl<'o> BlockParser<'o> {
    pub(crate) fn new(reader: Reader, options: &'o Options) -> Self {
        Self {
            reader,
            attributes: options.attributes.clone(),
            diagnostics: Diagnostics::new(),
            options,
            list_depth: 0,
            enclosing: Vec::new(),
        }
    }

    /// Parses the whole stream.
    #[tracing::instrument(level = "debug", skip(self))]
    pub(crate) fn parse(mut self) -> (Vec<Element>, AttributeStore, Diagnostics, Vec<IncludedFile>) {
        let (elements, _) = self.parse_blocks(None);
        let includes = self.reader.take_includes();
        (elements, self.attributes, self.diagnostics, includes)
    }

    /// Drains the synthetic `:leveloffset:` lines the reader writes around included
    /// content. They take effect in the store and leave no node behind.
    fn apply_synthetic(&mut self) {
        while self
            .reader
            .peek_line(&mut self.attributes, &mut self.diagnostics)
            .is_some_and(|line| line.synthetic)
        {
            if let Some(line) = self.reader.next_line(&mut self.attributes, &mut self.diagnostics)
            {
                match attribute::parse(&line.text) {
                    Some(AttributeLine::Set { name, value }) => self.attributes.set(&name, value),
                    Some(AttributeLine::Unset { name }) => self.attributes.unset(&name),
                    None => {}
                }
            }
        }
    }

    fn peek(&mut self) -> Option<&Line> {
        self.apply_synthetic();
        self.reader
            .peek_line(&mut self.attributes, &mut self.diagnostics)
    }

    fn peek_text(&mut self) -> Option<String> {
        self.peek().map(|line| line.text.clone())
    }

    /// The line after the next one, skipping nothing: a synthetic line in between
    /// counts as a line.
    fn peek_second(&mut self) -> Option<&Line> {
        self.apply_synthetic();
        self.reader
            .peek_nth(1, &mut self.attributes, &mut self.diagnostics)
    }

    fn next(&mut self) -> Option<Line> {
        self.apply_synthetic();
        self.reader
            .next_line(&mut self.attributes, &mut self.diagnostics)
    }

    /// Parses blocks until the stream ends or `until` closes the enclosing block.
    /// Returns the blocks and whether the closing delimiter was found.
    fn parse_blocks(&mut self, until: Option<Delimiter>) -> (Vec<Element>, bool) {
        let mut sections = SectionStack::default();
        let mut pending = AttributeList::new();
        let mut terminated = false;
        if let Some(delimiter) = until {
            self.enclosing.push(delimiter);
        }
        loop {
            let Some(closes) = self
                .peek()
                .map(|line| until.is_some_and(|delimiter| delimiter.is_closed_by(&line.text)))
            else {
                break;
            };
            if closes {
                self.next();
                terminated = true;
                break;
            }
            match self.next_block(&mut pending) {
                Some(Step::Block(element)) => sections.push(element),
                Some(Step::Section(section)) => sections.open(section, &mut self.diagnostics),
                Some(Step::Pending) => {}
                None => break,
            }
        }
        if until.is_some() {
            self.enclosing.pop();
        }
        if !pending.is_empty() {
            tracing::debug!(?pending, "block attributes with no block to attach to");
        }
        (sections.finish(), terminated)
    }

    /// Parses a single block, for list continuations.
    fn parse_one_block(&mut self) -> Option<Element> {
        let mut pending = AttributeList::new();
        loop {
            match self.next_block(&mut pending)? {
                Step::Block(element) => return Some(element),
                Step::Section(section) => return Some(Element::Section(section)),
                Step::Pending => {}
            }
        }
    }

    /// Parses `lines` as a nested document, as in an AsciiDoc table cell. The
    /// attribute store is shared with the enclosing document.
    fn parse_nested(&mut self, lines: Vec<Line>) -> Vec<Element> {
        let reader = Reader::from_lines(lines, self.options);
        let outer = std::mem::replace(&mut self.reader, reader);
        let list_depth = std::mem::take(&mut self.list_depth);
        let enclosing = std::mem::take(&mut self.enclosing);
        let (elements, _) = self.parse_blocks(None);
        self.reader = outer;
        self.list_depth = list_depth;
        self.enclosing = enclosing;
        elements
    }

    fn next_block(&mut self, pending: &mut AttributeList) -> Option<Step> {
        let line = self.peek()?.clone();
        let text = line.text.as_str();

        if text.is_empty() {
            self.next();
            return Some(Step::Block(Element::EmptyLine));
        }

        if let Some(delimiter) = Delimiter::parse(text) {
            self.next();
            let attributes = std::mem::take(pending);
            return Some(Step::Block(self.delimited(delimiter, &line, attributes)));
        }

        if let Some(comment) = comment_line(text) {
            self.next();
            return Some(Step::Block(Element::Comment(VerbatimBlock {
                attributes: AttributeList::new(),
                delimiter: None,
                lines: vec![comment.to_string()],
                unterminated: false,
                location: line.location,
            })));
        }

        if let Some(entry) = attribute::parse(text) {
            self.next();
            return Some(Step::Block(self.attribute_entry(entry, text, line.location)));
        }

        if let Some((id, label)) = anchor_line(text) {
            self.next();
            let label = label
                .map(|label| inlines::parse_text(label, &line.location, &self.attributes))
                .unwrap_or_default();
            pending.push(Attribute::Anchor(AnchorAttribute {
                id: id.to_string(),
                label,
            }));
            return Some(Step::Pending);
        }

        if let Some(content) = attribute_line(text) {
            self.next();
            let content = self.attributes.substitute(content).into_owned();
            pending.append(&mut attribute_list::parse(&content, true));
            return Some(Step::Pending);
        }

        if let Some(title) = title_line(text) {
            self.next();
            let elements = inlines::parse_text(title, &line.location, &self.attributes);
            pending.push(Attribute::Title(TitleAttribute { elements }));
            return Some(Step::Pending);
        }

        if is_thematic_break(text) {
            self.next();
            return Some(Step::Block(Element::ThematicBreak(ThematicBreak {
                attributes: std::mem::take(pending),
                location: line.location,
            })));
        }

        if let Some(image) = self.block_image(text, &line.location, pending) {
            self.next();
            return Some(Step::Block(image));
        }

        if let Some((run, title)) = section::heading(text) {
            self.next();
            let section = self.section(run, title, &line.location, std::mem::take(pending));
            return Some(Step::Section(section));
        }

        if let Some((marker, rest)) = list::Marker::parse(text) {
            self.next();
            let attributes = std::mem::take(pending);
            return Some(Step::Block(self.list_item(marker, rest, &line, attributes)));
        }

        if let Some(run) = self.setext_heading(text) {
            self.next();
            self.next();
            let section = self.section(run, text, &line.location, std::mem::take(pending));
            return Some(Step::Section(section));
        }

        if !self.options.preprocess
            && let Some(directive) = raw_directive(text, &line.location)
        {
            self.next();
            return Some(Step::Block(directive));
        }

        self.next();
        let attributes = std::mem::take(pending);
        Some(Step::Block(self.paragraph(line, attributes)))
    }

    /// Applies an attribute entry to the store and records it in the tree.
    fn attribute_entry(
        &mut self,
        entry: AttributeLine,
        text: &str,
        location: SourceLocation,
    ) -> Element {
        match entry {
            AttributeLine::Set { name, mut value } => {
                while attribute::continues(&value) {
                    let Some(next) = self.next() else { break };
                    attribute::join_continuation(&mut value, &next.text);
                }
                let value = self.attributes.substitute(&value).into_owned();
                tracing::debug!(%name, %value, "attribute entry");
                self.attributes.set(&name, value.clone());
                Element::AttributeEntry(AttributeEntry {
                    name,
                    value,
                    location,
                })
            }
            AttributeLine::Unset { name } => {
                tracing::debug!(%name, line = %text, "attribute reset");
                self.attributes.unset(&name);
                Element::AttributeReset(AttributeReset { name, location })
            }
        }
    }
}

/// An `[attrs]` or `[[anchor]]` line. These end list item text.
fn is_block_metadata(text: &str) -> bool {
    anchor_line(text).is_some() || attribute_line(text).is_some()
}

/// `// text`, but not `///` or a `////` fence.
fn comment_line(text: &str) -> Option<&str> {
    let rest = text.strip_prefix("//")?;
    (!rest.starts_with('/')).then_some(rest)
}

/// `[[id]]` or `[[id,label]]` alone on a line.
fn anchor_line(text: &str) -> Option<(&str, Option<&str>)> {
    let inner = text.strip_prefix("[[")?.strip_suffix("]]")?;
    let (id, label) = match inner.split_once(',') {
        Some((id, label)) => (id, Some(label.trim())),
        None => (inner, None),
    };
    inlines::is_anchor_id(id).then_some((id, label.filter(|label| !label.is_empty())))
}

/// The content of a `[...]` block attribute line.
fn attribute_line(text: &str) -> Option<&str> {
    if text.starts_with("[[") {
        return None;
    }
    let content = text.strip_prefix('[')?.strip_suffix(']')?;
    match content.chars().next() {
        None => Some(content),
        Some(c) if inlines::is_word(c) || matches!(c, '.' | '#' | '%' | '{' | ',' | '"' | '\'') => {
            Some(content)
        }
        Some(_) => None,
    }
}

/// `.Title`; `..` and `. item` are something else.
fn title_line(text: &str) -> Option<&str> {
    let title = text.strip_prefix('.')?;
    let first = title.chars().next()?;
    (!first.is_whitespace() && first != '.').then_some(title)
}

fn is_thematic_break(text: &str) -> bool {
    matches!(
        text.trim_end(),
        "'''" | "---" | "- - -" | "***" | "* * *"
    )
}

/// A preprocessor directive kept as a node when preprocessing is off.
fn raw_directive(text: &str, location: &SourceLocation) -> Option<Element> {
    conditional::Directive::parse(text)
        .map(|directive| directive.into_element(location.clone()))
        .or_else(|| include::raw_element(text, location.clone()))
}

fn is_raw_directive(text: &str) -> bool {
    conditional::Directive::parse(text).is_some() || include::split_directive(text).is_some()
}
