use serde::Serialize;

use crate::model::{AttributeList, Element, SourceLocation};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DelimiterType {
    /// `////`
    Comment,
    /// `====`
    Example,
    /// Three or more backticks.
    Fenced,
    /// `----`
    Listing,
    /// `....`
    Literal,
    /// `--`
    Open,
    /// `++++`
    Passthrough,
    /// `____`
    Quote,
    /// `****`
    Sidebar,
    /// `|===`
    Table,
    /// `!===`, only meaningful inside an AsciiDoc table cell.
    NestedTable,
}

/// The fence that opens and closes a delimited block.
///
/// A block only closes on a line with the same type and the same length, so fences
/// of different lengths nest.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct Delimiter {
    #[serde(rename = "type")]
    pub kind: DelimiterType,
    pub length: usize,
}

impl Delimiter {
    /// Recognizes a delimiter line. Fenced code openers may carry a language after the
    /// backticks.
    #[must_use]
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim_end();
        let first = line.chars().next()?;

        if let Some(rest) = line.strip_prefix(['|', '!'])
            && rest.len() >= 3
            && rest.chars().all(|c| c == '=')
        {
            let kind = if first == '|' {
                DelimiterType::Table
            } else {
                DelimiterType::NestedTable
            };
            return Some(Self {
                kind,
                length: line.len(),
            });
        }

        if first == '`' {
            let length = line.chars().take_while(|c| *c == '`').count();
            let language = line.get(length..).unwrap_or_default();
            return (length >= 3 && !language.contains('`')).then_some(Self {
                kind: DelimiterType::Fenced,
                length,
            });
        }

        let length = line.chars().count();
        if !line.chars().all(|c| c == first) {
            return None;
        }
        let kind = match (first, length) {
            ('-', 2) => DelimiterType::Open,
            ('-', 4..) => DelimiterType::Listing,
            ('/', 4..) => DelimiterType::Comment,
            ('=', 4..) => DelimiterType::Example,
            ('.', 4..) => DelimiterType::Literal,
            ('+', 4..) => DelimiterType::Passthrough,
            ('_', 4..) => DelimiterType::Quote,
            ('*', 4..) => DelimiterType::Sidebar,
            _ => return None,
        };
        Some(Self { kind, length })
    }

    /// Whether `line` closes a block opened by this delimiter.
    #[must_use]
    pub fn is_closed_by(&self, line: &str) -> bool {
        let line = line.trim_end();
        match self.kind {
            DelimiterType::Fenced => {
                line.len() == self.length && line.chars().all(|c| c == '`')
            }
            DelimiterType::Comment
            | DelimiterType::Example
            | DelimiterType::Listing
            | DelimiterType::Literal
            | DelimiterType::Open
            | DelimiterType::Passthrough
            | DelimiterType::Quote
            | DelimiterType::Sidebar
            | DelimiterType::Table
            | DelimiterType::NestedTable => Self::parse(line).as_ref() == Some(self),
        }
    }

    /// Verbatim blocks keep their lines as written instead of parsing them as blocks.
    #[must_use]
    pub fn is_verbatim(&self) -> bool {
        matches!(
            self.kind,
            DelimiterType::Comment
                | DelimiterType::Fenced
                | DelimiterType::Listing
                | DelimiterType::Literal
                | DelimiterType::Passthrough
        )
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Paragraph {
    #[serde(skip_serializing_if = "AttributeList::is_empty")]
    pub attributes: AttributeList,
    pub elements: Vec<Element>,
    pub location: SourceLocation,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Section {
    #[serde(skip_serializing_if = "AttributeList::is_empty")]
    pub attributes: AttributeList,
    pub title: Vec<Element>,
    pub level: u8,
    /// Filled in by the resolver: the explicit ID, or one generated from the title.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// The ID generated from the title under the `idprefix`, `idseparator` and
    /// `sectids` values in effect where the section was parsed, before the resolver
    /// makes it unique. `None` when `sectids` was unset there.
    #[serde(skip)]
    pub generated_id: Option<String>,
    pub elements: Vec<Element>,
    pub location: SourceLocation,
}

/// A block whose content is parsed as further blocks: open, example, sidebar and
/// quote blocks, and paragraphs promoted to one of those by their style.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DelimitedBlock {
    #[serde(skip_serializing_if = "AttributeList::is_empty")]
    pub attributes: AttributeList,
    /// `None` when the block came from a styled paragraph.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delimiter: Option<Delimiter>,
    pub elements: Vec<Element>,
    /// The input ended before the closing delimiter.
    pub unterminated: bool,
    pub location: SourceLocation,
}

/// A block whose lines are kept as written: listings, literals, passthroughs, stem
/// blocks and comments.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct VerbatimBlock {
    #[serde(skip_serializing_if = "AttributeList::is_empty")]
    pub attributes: AttributeList,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delimiter: Option<Delimiter>,
    pub lines: Vec<String>,
    pub unterminated: bool,
    pub location: SourceLocation,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BlockImage {
    #[serde(skip_serializing_if = "AttributeList::is_empty")]
    pub attributes: AttributeList,
    pub target: String,
    pub location: SourceLocation,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ThematicBreak {
    #[serde(skip_serializing_if = "AttributeList::is_empty")]
    pub attributes: AttributeList,
    pub location: SourceLocation,
}

/// An ordered or unordered list item. Items are siblings; `level` carries nesting.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ListItem {
    #[serde(skip_serializing_if = "AttributeList::is_empty")]
    pub attributes: AttributeList,
    pub marker: String,
    pub level: usize,
    pub elements: Vec<Element>,
    pub location: SourceLocation,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DescriptionListItem {
    #[serde(skip_serializing_if = "AttributeList::is_empty")]
    pub attributes: AttributeList,
    pub term: Vec<Element>,
    /// `::`, `:::`, `::::` or `;;`.
    pub marker: String,
    pub elements: Vec<Element>,
    pub location: SourceLocation,
}

/// A block attached to the preceding list item with a `+` line.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ListContinuation {
    pub elements: Vec<Element>,
    pub location: SourceLocation,
}
