use std::{fmt, str::FromStr};

use serde::{Serialize, Serializer};

use crate::model::{AttributeList, Delimiter, Element, SourceLocation};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HorizontalAlign {
    Left,
    Center,
    Right,
}

impl HorizontalAlign {
    pub(crate) fn from_mark(mark: char) -> Option<Self> {
        match mark {
            '<' => Some(Self::Left),
            '^' => Some(Self::Center),
            '>' => Some(Self::Right),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VerticalAlign {
    Top,
    Middle,
    Bottom,
}

impl VerticalAlign {
    pub(crate) fn from_mark(mark: char) -> Option<Self> {
        match mark {
            '<' => Some(Self::Top),
            '^' => Some(Self::Middle),
            '>' => Some(Self::Bottom),
            _ => None,
        }
    }
}

/// How a cell's content is interpreted. Renderers rely on the single-letter form, so
/// it serializes and parses as that letter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CellStyle {
    /// `a`: the content is parsed as blocks.
    AsciiDoc,
    /// `d`
    Default,
    /// `e`
    Emphasis,
    /// `h`
    Header,
    /// `l`: the content is kept as written.
    Literal,
    /// `m`
    Monospace,
    /// `s`
    Strong,
    /// `v`
    Verse,
}

impl CellStyle {
    #[must_use]
    pub fn letter(self) -> char {
        match self {
            Self::AsciiDoc => 'a',
            Self::Default => 'd',
            Self::Emphasis => 'e',
            Self::Header => 'h',
            Self::Literal => 'l',
            Self::Monospace => 'm',
            Self::Strong => 's',
            Self::Verse => 'v',
        }
    }

    #[must_use]
    pub fn from_letter(letter: char) -> Option<Self> {
        match letter {
            'a' => Some(Self::AsciiDoc),
            'd' => Some(Self::Default),
            'e' => Some(Self::Emphasis),
            'h' => Some(Self::Header),
            'l' => Some(Self::Literal),
            'm' => Some(Self::Monospace),
            's' => Some(Self::Strong),
            'v' => Some(Self::Verse),
            _ => None,
        }
    }
}

impl fmt::Display for CellStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

impl FromStr for CellStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        match (chars.next(), chars.next()) {
            (Some(letter), None) => {
                Self::from_letter(letter).ok_or_else(|| format!("unknown cell style: {s}"))
            }
            _ => Err(format!("unknown cell style: {s}")),
        }
    }
}

impl Serialize for CellStyle {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_char(self.letter())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CellSpan {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row: Option<usize>,
}

/// The `N*`, `C.R+`, alignment and style prefix of a cell, or one entry of a table's
/// `cols` attribute.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct TableCellFormat {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub multiplier: Option<usize>,
    pub span: CellSpan,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub horizontal_align: Option<HorizontalAlign>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vertical_align: Option<VerticalAlign>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<CellStyle>,
}

impl TableCellFormat {
    /// `own` laid over these column defaults. Multipliers and spans are never
    /// inherited from a column.
    #[must_use]
    pub fn overlay(&self, own: &TableCellFormat) -> TableCellFormat {
        TableCellFormat {
            multiplier: own.multiplier,
            span: own.span,
            horizontal_align: own.horizontal_align.or(self.horizontal_align),
            vertical_align: own.vertical_align.or(self.vertical_align),
            style: own.style.or(self.style),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == TableCellFormat::default()
    }

    #[must_use]
    pub fn column_span(&self) -> usize {
        self.span.column.unwrap_or(1).max(1)
    }

    #[must_use]
    pub fn row_span(&self) -> usize {
        self.span.row.unwrap_or(1).max(1)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum ColumnWidth {
    Proportional(u32),
    Percentage(u32),
    Auto,
}

/// One column after `cols` multipliers have been expanded.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ColumnSpec {
    pub format: TableCellFormat,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<ColumnWidth>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Table {
    #[serde(skip_serializing_if = "AttributeList::is_empty")]
    pub attributes: AttributeList,
    pub delimiter: Delimiter,
    pub column_count: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub columns: Vec<ColumnSpec>,
    /// Rows, interleaved with `EmptyLine` where the source had blank lines between
    /// rows.
    pub elements: Vec<Element>,
    pub unterminated: bool,
    pub location: SourceLocation,
}

impl Table {
    pub fn rows(&self) -> impl Iterator<Item = &TableRow> {
        self.elements.iter().filter_map(|element| {
            if let Element::TableRow(row) = element {
                Some(row)
            } else {
                None
            }
        })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TableRow {
    /// The row's `TableCell`s.
    pub elements: Vec<Element>,
    pub location: SourceLocation,
}

impl TableRow {
    pub fn cells(&self) -> impl Iterator<Item = &TableCell> {
        self.elements.iter().filter_map(|element| {
            if let Element::TableCell(cell) = element {
                Some(cell)
            } else {
                None
            }
        })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TableCell {
    /// The cell's effective format: its own prefix over its column's defaults.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<TableCellFormat>,
    pub elements: Vec<Element>,
    /// The cell has no content.
    pub blank: bool,
    pub location: SourceLocation,
}
