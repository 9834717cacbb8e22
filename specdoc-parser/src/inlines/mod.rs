//! Inline parsing: text, formatting spans, references, anchors and links inside a
//! block's content.
//!
//! Attribute references to set attributes are replaced first, line by line. The
//! result is scanned once, left to right; spans are parsed recursively over their
//! content range.
use std::borrow::Cow;

use crate::{
    model::{
        Anchor, AttributeStore, CrossReference, Element, Form, FormattedText, Missing,
        SourceLocation, XrefFormat, character_replacement, is_attribute_name,
    },
    preprocessor::Line,
};

mod line_map;
mod macros;

use line_map::LineMap;

/// Parses the lines of a block as one run of inline content. Line breaks become
/// [`Element::NewLine`].
pub(crate) fn parse(lines: &[Line], attributes: &AttributeStore) -> Vec<Element> {
    parse_pieces(
        lines
            .iter()
            .map(|line| (Cow::Borrowed(line.text.as_str()), line.location.clone())),
        attributes,
    )
}

/// Parses a single piece of text, such as a title or a table cell. Embedded newlines
/// are taken to be consecutive source lines starting at `location`.
pub(crate) fn parse_text(
    text: &str,
    location: &SourceLocation,
    attributes: &AttributeStore,
) -> Vec<Element> {
    parse_pieces(
        text.split('\n').enumerate().map(|(index, piece)| {
            (
                Cow::Borrowed(piece),
                SourceLocation::new(location.file.clone(), location.line + index),
            )
        }),
        attributes,
    )
}

fn parse_pieces<'a>(
    pieces: impl Iterator<Item = (Cow<'a, str>, SourceLocation)>,
    attributes: &AttributeStore,
) -> Vec<Element> {
    let mut text = String::new();
    let mut map = LineMap::default();
    for (index, (piece, location)) in pieces.enumerate() {
        if index > 0 {
            text.push('\n');
        }
        map.push(text.len(), location);
        text.push_str(&attributes.substitute_references(&piece, false, Missing::Keep));
    }
    let scanner = Scanner {
        text: &text,
        map: &map,
    };
    scanner.scan(0, text.len())
}

/// Collects scanned elements, merging adjacent text.
#[derive(Default)]
pub(crate) struct Output {
    elements: Vec<Element>,
    buffer: String,
}

impl Output {
    pub(crate) fn push(&mut self, element: Element) {
        if let Element::String(text) = element {
            self.buffer.push_str(&text);
        } else {
            self.flush();
            self.elements.push(element);
        }
    }

    fn push_char(&mut self, c: char) {
        self.buffer.push(c);
    }

    fn flush(&mut self) {
        if !self.buffer.is_empty() {
            self.elements
                .push(Element::String(std::mem::take(&mut self.buffer)));
        }
    }

    pub(crate) fn finish(mut self) -> Vec<Element> {
        self.flush();
        self.elements
    }
}

pub(crate) fn is_word(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Characters a backslash makes literal.
const ESCAPABLE: [char; 9] = ['*', '_', '`', '^', '{', '[', ']', '\\', '#'];

struct Scanner<'a> {
    text: &'a str,
    map: &'a LineMap,
}

impl<'a> Scanner<'a> {
    fn rest(&self, start: usize, end: usize) -> &'a str {
        self.text.get(start..end).unwrap_or_default()
    }

    fn char_at(&self, offset: usize) -> Option<char> {
        self.text.get(offset..)?.chars().next()
    }

    fn prev_char(&self, offset: usize) -> Option<char> {
        self.text.get(..offset)?.chars().next_back()
    }

    fn at_word_start(&self, offset: usize) -> bool {
        self.prev_char(offset).is_none_or(|c| !is_word(c))
    }

    fn location(&self, offset: usize) -> SourceLocation {
        self.map.location(offset)
    }

    /// Scans `text[start..end]`.
    fn scan(&self, start: usize, end: usize) -> Vec<Element> {
        let mut out = Output::default();
        let mut offset = start;
        while offset < end {
            let Some(c) = self.char_at(offset) else {
                break;
            };
            if let Some((element, next)) = self.construct(c, offset, end) {
                out.push(element);
                offset = next;
            } else {
                out.push_char(c);
                offset += c.len_utf8();
            }
        }
        out.finish()
    }

    /// Tries every construct that can start with `c` at `offset`. Returns the element
    /// and the offset just past it.
    fn construct(&self, c: char, offset: usize, end: usize) -> Option<(Element, usize)> {
        match c {
            '\\' => self.escape(offset, end),
            '{' => self.attribute_reference(offset, end),
            '*' => self.formatted(c, Element::Bold, offset, end),
            '_' => self.formatted(c, Element::Italic, offset, end),
            '`' => self.formatted(c, Element::Monospace, offset, end),
            '^' => self.superscript(offset, end),
            '[' => self.anchor(offset, end),
            '<' => self
                .natural_xref(offset, end)
                .or_else(|| self.bracketed_autolink(offset, end))
                .or(Some((Element::SpecialCharacter('<'), offset + 1))),
            '>' | '&' => Some((Element::SpecialCharacter(c), offset + 1)),
            '\n' => Some((Element::NewLine, offset + 1)),
            c if c.is_alphanumeric() && self.at_word_start(offset) => self
                .inline_macro(offset, end)
                .or_else(|| self.autolink(offset, end))
                .or_else(|| self.email_autolink(offset, end)),
            _ => None,
        }
    }

    fn escape(&self, offset: usize, end: usize) -> Option<(Element, usize)> {
        let rest = self.rest(offset + 1, end);
        for double in ["**", "__", "``", "[["] {
            if rest.starts_with(double) {
                return Some((Element::String(double.to_string()), offset + 1 + double.len()));
            }
        }
        if rest.starts_with("<<") {
            return Some((Element::SpecialCharacter('<'), offset + 2));
        }
        if let Some(prefix) = macros::PREFIXES
            .iter()
            .chain(macros::SCHEMES.iter())
            .find(|prefix| rest.starts_with(**prefix))
        {
            return Some((Element::String((*prefix).to_string()), offset + 1 + prefix.len()));
        }
        let next = rest.chars().next().filter(|c| ESCAPABLE.contains(c))?;
        Some((Element::String(next.to_string()), offset + 1 + next.len_utf8()))
    }

    fn attribute_reference(&self, offset: usize, end: usize) -> Option<(Element, usize)> {
        let rest = self.rest(offset + 1, end);
        let close = rest.find('}')?;
        let name = rest.get(..close)?;
        if !is_attribute_name(name) {
            return None;
        }
        let element = if character_replacement(name).is_some() {
            Element::CharacterReplacementReference(name.to_string())
        } else {
            Element::UserAttributeReference(name.to_string())
        };
        Some((element, offset + 1 + close + 1))
    }

    fn formatted(
        &self,
        mark: char,
        wrap: fn(FormattedText) -> Element,
        offset: usize,
        end: usize,
    ) -> Option<(Element, usize)> {
        self.unconstrained(mark, wrap, offset, end)
            .or_else(|| self.constrained(mark, wrap, offset, end))
    }

    /// `**text**`: may appear anywhere, even inside a word.
    fn unconstrained(
        &self,
        mark: char,
        wrap: fn(FormattedText) -> Element,
        offset: usize,
        end: usize,
    ) -> Option<(Element, usize)> {
        let double: String = [mark, mark].iter().collect();
        if !self.rest(offset, end).starts_with(&double) {
            return None;
        }
        let content_start = offset + double.len();
        let close = content_start + self.rest(content_start, end).find(&double)?;
        if close == content_start {
            return None;
        }
        let elements = self.scan(content_start, close);
        Some((
            wrap(FormattedText {
                form: Form::Unconstrained,
                elements,
            }),
            close + double.len(),
        ))
    }

    /// `*text*`: must start and end at a word boundary, and the text may not begin or
    /// end with whitespace.
    fn constrained(
        &self,
        mark: char,
        wrap: fn(FormattedText) -> Element,
        offset: usize,
        end: usize,
    ) -> Option<(Element, usize)> {
        if self
            .prev_char(offset)
            .is_some_and(|c| is_word(c) || matches!(c, ';' | ':' | '}') || c == mark)
        {
            return None;
        }
        let content_start = offset + mark.len_utf8();
        let first = self.char_at(content_start).filter(|_| content_start < end)?;
        if first.is_whitespace() || first == mark {
            return None;
        }
        let close = self
            .rest(content_start, end)
            .char_indices()
            .skip(1)
            .map(|(index, c)| (content_start + index, c))
            .find(|&(index, c)| {
                c == mark
                    && self.prev_char(index).is_some_and(|before| !before.is_whitespace())
                    && self.char_at(index + c.len_utf8()).is_none_or(|after| !is_word(after))
            })
            .map(|(index, _)| index)?;
        let elements = self.scan(content_start, close);
        Some((
            wrap(FormattedText {
                form: Form::Constrained,
                elements,
            }),
            close + mark.len_utf8(),
        ))
    }

    /// `^text^` with no whitespace inside.
    fn superscript(&self, offset: usize, end: usize) -> Option<(Element, usize)> {
        let content_start = offset + 1;
        let close = content_start + self.rest(content_start, end).find('^')?;
        let content = self.rest(content_start, close);
        if content.is_empty() || content.contains(char::is_whitespace) {
            return None;
        }
        let elements = self.scan(content_start, close);
        Some((
            Element::Superscript(FormattedText {
                form: Form::Unconstrained,
                elements,
            }),
            close + 1,
        ))
    }

    /// `[[id]]` or `[[id,label]]`.
    fn anchor(&self, offset: usize, end: usize) -> Option<(Element, usize)> {
        if !self.rest(offset, end).starts_with("[[") {
            return None;
        }
        let inner_start = offset + 2;
        let inner_end = inner_start + self.rest(inner_start, end).find("]]")?;
        let inner = self.rest(inner_start, inner_end);
        let (id, label) = match inner.find(',') {
            Some(comma) => (
                inner.get(..comma)?.trim(),
                self.trimmed_scan(inner_start + comma + 1, inner_end),
            ),
            None => (inner.trim(), Vec::new()),
        };
        if !is_anchor_id(id) {
            return None;
        }
        Some((
            Element::Anchor(Anchor {
                id: id.to_string(),
                label,
                location: self.location(offset),
            }),
            inner_end + 2,
        ))
    }

    /// `<<target>>` or `<<target,text>>`, on one line.
    fn natural_xref(&self, offset: usize, end: usize) -> Option<(Element, usize)> {
        if !self.rest(offset, end).starts_with("<<") {
            return None;
        }
        let inner_start = offset + 2;
        let inner_end = inner_start + self.rest(inner_start, end).find(">>")?;
        let inner = self.rest(inner_start, inner_end);
        if inner.contains('\n') || inner.contains('<') {
            return None;
        }
        let (target, elements) = match inner.find(',') {
            Some(comma) => (
                inner.get(..comma)?.trim(),
                self.trimmed_scan(inner_start + comma + 1, inner_end),
            ),
            None => (inner.trim(), Vec::new()),
        };
        if target.is_empty() {
            return None;
        }
        Some((
            Element::CrossReference(CrossReference {
                id: target.to_string(),
                elements,
                format: XrefFormat::Natural,
                location: self.location(offset),
                resolution: None,
            }),
            inner_end + 2,
        ))
    }

    /// Scans a range after stripping surrounding whitespace.
    fn trimmed_scan(&self, start: usize, end: usize) -> Vec<Element> {
        let content = self.rest(start, end);
        let leading = content.len() - content.trim_start().len();
        let trailing = content.len() - content.trim_end().len();
        if leading + trailing >= content.len() {
            return Vec::new();
        }
        self.scan(start + leading, end - trailing)
    }
}

/// Anchor IDs start with a letter, `_` or `:` and continue with word characters,
/// `:`, `.` or `-`.
pub(crate) fn is_anchor_id(id: &str) -> bool {
    let mut chars = id.chars();
    chars
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_' || c == ':')
        && chars.all(|c| is_word(c) || matches!(c, ':' | '.' | '-'))
}
