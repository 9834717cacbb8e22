//! Tables: `cols` column specs, cell splitting and row assembly.
//!
//! Cells are split out of the table's lines first, with no regard for rows. Rows
//! are then formed by counting column slots: a row ends once its cells, with their
//! column spans and any row spans carried down from earlier rows, fill every column.
use crate::{
    model::{
        AttributeList, CellSpan, CellStyle, ColumnSpec, ColumnWidth, Delimiter, DelimiterType,
        Element, HorizontalAlign, SourceLocation, Table, TableCell, TableCellFormat, TableRow,
        VerticalAlign,
    },
    inlines,
    preprocessor::Line,
};

use super::BlockParser;

peg::parser! {
    grammar table_spec() for str {
        /// The prefix written right before a cell separator.
        pub(crate) rule cell() -> TableCellFormat
            = factor:factor()? operator:['*' | '+']? horizontal:horizontal()?
              vertical:("." v:vertical() { v })? style:style()? ![_] {?
                cell_format(factor, operator, horizontal, vertical, style)
            }

        /// One entry of the `cols` attribute.
        pub(crate) rule column() -> (usize, ColumnSpec)
            = multiplier:(n:number() "*" { n })? horizontal:horizontal()?
              vertical:("." v:vertical() { v })? width:width()? style:style()? ![_] {
                let format = TableCellFormat {
                    horizontal_align: horizontal,
                    vertical_align: vertical,
                    style,
                    ..TableCellFormat::default()
                };
                (multiplier.unwrap_or(1), ColumnSpec { format, width })
            }

        rule factor() -> (Option<usize>, Option<usize>)
            = column:number() "." row:number() { (Some(column), Some(row)) }
            / column:number() { (Some(column), None) }
            / "." row:number() { (None, Some(row)) }

        rule horizontal() -> HorizontalAlign
            = mark:['<' | '^' | '>'] {? HorizontalAlign::from_mark(mark).ok_or("alignment") }

        rule vertical() -> VerticalAlign
            = mark:['<' | '^' | '>'] {? VerticalAlign::from_mark(mark).ok_or("alignment") }

        rule style() -> CellStyle
            = letter:['a'..='z'] {? CellStyle::from_letter(letter).ok_or("cell style") }

        rule width() -> ColumnWidth
            = "~" { ColumnWidth::Auto }
            / n:$(['0'..='9']+) "%" {? n.parse().map(ColumnWidth::Percentage).or(Err("width")) }
            / n:$(['0'..='9']+) {? n.parse().map(ColumnWidth::Proportional).or(Err("width")) }

        rule number() -> usize
            = n:$(['0'..='9']+) {? n.parse().or(Err("number")) }
    }
}

fn cell_format(
    factor: Option<(Option<usize>, Option<usize>)>,
    operator: Option<char>,
    horizontal_align: Option<HorizontalAlign>,
    vertical_align: Option<VerticalAlign>,
    style: Option<CellStyle>,
) -> Result<TableCellFormat, &'static str> {
    let mut format = TableCellFormat {
        horizontal_align,
        vertical_align,
        style,
        ..TableCellFormat::default()
    };
    match (factor, operator) {
        (None, None) => {}
        (Some((Some(count), None)), Some('*')) => format.multiplier = Some(count),
        (Some((column, row)), Some('+')) => format.span = CellSpan { column, row },
        (Some(_) | None, Some(_) | None) => return Err("cell spec"),
    }
    if format.is_empty() {
        return Err("empty cell spec");
    }
    Ok(format)
}

/// Splits a trailing cell spec off `segment`. The spec must start the line or follow
/// whitespace.
fn split_spec(segment: &str, at_line_start: bool) -> (&str, TableCellFormat) {
    let token_start = segment
        .char_indices()
        .rev()
        .find(|(_, c)| c.is_whitespace())
        .map_or(0, |(index, c)| index + c.len_utf8());
    if token_start == 0 && !at_line_start {
        return (segment, TableCellFormat::default());
    }
    let Some(token) = segment.get(token_start..).filter(|token| !token.is_empty()) else {
        return (segment, TableCellFormat::default());
    };
    match table_spec::cell(token) {
        Ok(format) => (segment.get(..token_start).unwrap_or_default(), format),
        Err(_) => (segment, TableCellFormat::default()),
    }
}

/// A cell as split out of the source, before it is placed in a row.
#[derive(Debug)]
struct RawCell {
    format: TableCellFormat,
    /// One entry per source line holding content of this cell.
    fragments: Vec<Line>,
    /// Blank lines seen since the last fragment.
    blank_lines: Vec<SourceLocation>,
    location: SourceLocation,
    /// Index of the line the cell's separator is on.
    line: usize,
}

impl RawCell {
    fn append(&mut self, text: &str, location: &SourceLocation) {
        if text.trim().is_empty() {
            return;
        }
        if !self.fragments.is_empty() {
            for blank in self.blank_lines.drain(..) {
                self.fragments.push(Line {
                    text: String::new(),
                    location: blank,
                    synthetic: false,
                });
            }
        }
        self.blank_lines.clear();
        self.fragments.push(Line {
            text: text.trim_end().to_string(),
            location: location.clone(),
            synthetic: false,
        });
    }

    fn text(&self) -> String {
        self.fragments
            .iter()
            .map(|line| line.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
            .trim()
            .to_string()
    }

    /// The content as block source: only the first line loses its indentation.
    fn block_lines(&self) -> Vec<Line> {
        let mut lines = self.fragments.clone();
        if let Some(first) = lines.first_mut() {
            first.text = first.text.trim_start().to_string();
        }
        lines
    }

    fn inline_lines(&self) -> Vec<Line> {
        self.fragments
            .iter()
            .map(|line| Line {
                text: line.text.trim().to_string(),
                location: line.location.clone(),
                synthetic: false,
            })
            .collect()
    }

    /// Column slots this cell takes in its row, counting duplicates.
    fn width(&self) -> usize {
        self.format.multiplier.unwrap_or(1).max(1) * self.format.column_span()
    }
}

#[derive(Debug, Default)]
struct Split {
    /// Blank lines before the first cell.
    leading: Vec<SourceLocation>,
    cells: Vec<RawCell>,
    first_line: Option<usize>,
}

fn split_cells(lines: &[Line], separator: char) -> Split {
    let mut split = Split::default();
    for (index, line) in lines.iter().enumerate() {
        if line.text.trim().is_empty() {
            match split.cells.last_mut() {
                Some(cell) => cell.blank_lines.push(line.location.clone()),
                None => split.leading.push(line.location.clone()),
            }
            continue;
        }
        split.first_line.get_or_insert(index);

        let mut segment = String::new();
        let mut at_line_start = true;
        let mut chars = line.text.chars().peekable();
        while let Some(c) = chars.next() {
            if c == '\\' && chars.peek() == Some(&separator) {
                segment.push(separator);
                chars.next();
                continue;
            }
            if c != separator {
                segment.push(c);
                continue;
            }
            let (content, format) = split_spec(&segment, at_line_start);
            match split.cells.last_mut() {
                Some(cell) => cell.append(content, &line.location),
                None if !content.trim().is_empty() => {
                    tracing::debug!(%content, "text before the first table cell");
                }
                None => {}
            }
            split.cells.push(RawCell {
                format,
                fragments: Vec::new(),
                blank_lines: Vec::new(),
                location: line.location.clone(),
                line: index,
            });
            segment.clear();
            at_line_start = false;
        }
        if let Some(cell) = split.cells.last_mut() {
            cell.append(&segment, &line.location);
        }
    }
    split
}

/// Places cells into rows, tracking the columns held by row spans from above.
#[derive(Debug)]
struct RowBuilder {
    columns: usize,
    /// Rows, counting the one being built, in which a column is still held by a
    /// cell from an earlier row.
    carried: Vec<usize>,
    /// Rows after this one that cells placed in this row hold their columns for.
    spanned: Vec<usize>,
    position: usize,
    cells: Vec<Element>,
    location: Option<SourceLocation>,
}

impl RowBuilder {
    fn new(columns: usize) -> Self {
        Self {
            columns,
            carried: vec![0; columns],
            spanned: vec![0; columns],
            position: 0,
            cells: Vec::new(),
            location: None,
        }
    }

    fn skip_carried(&mut self) {
        while self.carried.get(self.position).is_some_and(|rows| *rows > 0) {
            self.position += 1;
        }
    }

    /// The column the next cell lands in, closing full rows first.
    fn next_column(&mut self, out: &mut Vec<Element>) -> usize {
        self.skip_carried();
        while self.position >= self.columns {
            self.close(out);
            self.skip_carried();
        }
        self.position
    }

    /// Places `cell`; returns whether it completed the row.
    fn place(&mut self, cell: TableCell, format: &TableCellFormat, out: &mut Vec<Element>) -> bool {
        let width = format.column_span();
        let rows = format.row_span();
        for held in self.spanned.iter_mut().skip(self.position).take(width) {
            *held = rows - 1;
        }
        self.location.get_or_insert_with(|| cell.location.clone());
        self.cells.push(Element::TableCell(cell));
        self.position += width;
        self.skip_carried();
        if self.position >= self.columns {
            self.close(out);
            true
        } else {
            false
        }
    }

    fn close(&mut self, out: &mut Vec<Element>) {
        if !self.cells.is_empty() {
            out.push(Element::TableRow(TableRow {
                elements: std::mem::take(&mut self.cells),
                location: self.location.take().unwrap_or_default(),
            }));
        }
        for (carried, spanned) in self.carried.iter_mut().zip(self.spanned.iter_mut()) {
            *carried = if *spanned > 0 {
                *spanned
            } else {
                carried.saturating_sub(1)
            };
            *spanned = 0;
        }
        self.position = 0;
    }

    fn is_partial(&self) -> bool {
        !self.cells.is_empty()
    }
}

impl BlockParser<'_> {
    pub(super) fn table(
        &mut self,
        delimiter: Delimiter,
        opening: &Line,
        attributes: AttributeList,
    ) -> Element {
        let mut lines = Vec::new();
        let mut terminated = false;
        while let Some(line) = self.next() {
            if delimiter.is_closed_by(&line.text) {
                terminated = true;
                break;
            }
            lines.push(line);
        }
        if !terminated {
            self.warn_unterminated(delimiter, &opening.location);
        }

        let separator = if delimiter.kind == DelimiterType::NestedTable {
            '!'
        } else {
            attributes
                .get("separator")
                .and_then(|separator| separator.chars().next())
                .unwrap_or('|')
        };
        let columns = attributes
            .get("cols")
            .map(|cols| self.column_specs(cols, &opening.location))
            .unwrap_or_default();

        let split = split_cells(&lines, separator);
        let column_count = if columns.is_empty() {
            split
                .cells
                .iter()
                .filter(|cell| Some(cell.line) == split.first_line)
                .map(RawCell::width)
                .sum()
        } else {
            columns.len()
        };
        tracing::debug!(column_count, cells = split.cells.len(), "table");

        let elements = self.rows(split, &columns, column_count, &opening.location);
        Element::Table(Table {
            attributes,
            delimiter,
            column_count,
            columns,
            elements,
            unterminated: !terminated,
            location: opening.location.clone(),
        })
    }

    /// Expands the `cols` attribute: `3`, `1,2,1`, `2*,3`, `<.^1,2a`...
    fn column_specs(&mut self, cols: &str, location: &SourceLocation) -> Vec<ColumnSpec> {
        let cols = cols.trim();
        if cols.is_empty() {
            return Vec::new();
        }
        if let Ok(count) = cols.parse::<usize>() {
            return vec![ColumnSpec::default(); count];
        }
        let mut columns = Vec::new();
        for entry in cols.split([',', ';']).map(str::trim) {
            match table_spec::column(entry) {
                Ok((count, spec)) => columns.extend(std::iter::repeat_n(spec, count)),
                Err(_) => {
                    self.diagnostics.warn(
                        Some(location),
                        format!("invalid column spec '{entry}' in cols attribute"),
                    );
                    columns.push(ColumnSpec::default());
                }
            }
        }
        columns
    }

    fn rows(
        &mut self,
        split: Split,
        columns: &[ColumnSpec],
        column_count: usize,
        location: &SourceLocation,
    ) -> Vec<Element> {
        let mut out: Vec<Element> = split.leading.iter().map(|_| Element::EmptyLine).collect();
        if column_count == 0 {
            return out;
        }
        let mut builder = RowBuilder::new(column_count);
        for raw in &split.cells {
            let copies = raw.format.multiplier.unwrap_or(1).max(1);
            let mut closed = false;
            for _ in 0..copies {
                let column = builder.next_column(&mut out);
                let format = columns
                    .get(column)
                    .map_or(raw.format, |spec| spec.format.overlay(&raw.format));
                let cell = self.cell(raw, &format);
                closed = builder.place(cell, &format, &mut out);
            }
            if closed {
                out.extend(raw.blank_lines.iter().map(|_| Element::EmptyLine));
            }
        }
        if builder.is_partial() {
            self.diagnostics.warn(
                Some(location),
                format!("table has an incomplete last row: expected {column_count} columns"),
            );
            builder.close(&mut out);
        }
        out
    }

    fn cell(&mut self, raw: &RawCell, format: &TableCellFormat) -> TableCell {
        let blank = raw.fragments.is_empty();
        let elements = if blank {
            Vec::new()
        } else if format.style == Some(CellStyle::AsciiDoc) {
            self.parse_nested(raw.block_lines())
        } else if format.style == Some(CellStyle::Literal) {
            vec![Element::String(raw.text())]
        } else {
            inlines::parse(&raw.inline_lines(), &self.attributes)
        };
        TableCell {
            format: (!format.is_empty()).then_some(*format),
            elements,
            blank,
            location: raw.location.clone(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;
    use crate::{Diagnostics, Options, preprocessor::Reader};

    fn parse(input: &str) -> (Vec<Element>, Diagnostics) {
        let options = Options::default();
        let reader = Reader::new(input, None, &options);
        let (elements, _, diagnostics, _) = BlockParser::new(reader, &options).parse();
        (elements, diagnostics)
    }

    fn table(input: &str) -> (Table, Diagnostics) {
        let (elements, diagnostics) = parse(input);
        match elements.into_iter().find_map(|element| {
            if let Element::Table(table) = element {
                Some(table)
            } else {
                None
            }
        }) {
            Some(table) => (table, diagnostics),
            None => panic!("expected a table"),
        }
    }

    fn cell_texts(table: &Table) -> Vec<Vec<String>> {
        table
            .rows()
            .map(|row| {
                row.cells()
                    .map(|cell| crate::to_plain_text(&cell.elements))
                    .collect()
            })
            .collect()
    }

    #[rstest]
    #[case("2+", CellSpan { column: Some(2), row: None }, None)]
    #[case(".3+", CellSpan { column: None, row: Some(3) }, None)]
    #[case("2.3+", CellSpan { column: Some(2), row: Some(3) }, None)]
    #[case("3*", CellSpan::default(), Some(3))]
    fn test_cell_spec_factors(
        #[case] input: &str,
        #[case] span: CellSpan,
        #[case] multiplier: Option<usize>,
    ) {
        let format = table_spec::cell(input).unwrap_or_default();
        assert_eq!(format.span, span);
        assert_eq!(format.multiplier, multiplier);
    }

    #[test]
    fn test_cell_spec_alignment_and_style() {
        let format = table_spec::cell("^.>s").unwrap_or_default();
        assert_eq!(format.horizontal_align, Some(HorizontalAlign::Center));
        assert_eq!(format.vertical_align, Some(VerticalAlign::Bottom));
        assert_eq!(format.style, Some(CellStyle::Strong));
        assert!(table_spec::cell("2").is_err());
        assert!(table_spec::cell("").is_err());
        assert!(table_spec::cell("x").is_err());
    }

    #[rstest]
    #[case("a b", true, "a b", None)]
    #[case("2+", true, "", Some(2))]
    #[case("text 2+", false, "text ", Some(2))]
    #[case("2+", false, "2+", None)]
    fn test_split_spec(
        #[case] segment: &str,
        #[case] at_line_start: bool,
        #[case] content: &str,
        #[case] column_span: Option<usize>,
    ) {
        let (rest, format) = split_spec(segment, at_line_start);
        assert_eq!(rest, content);
        assert_eq!(format.span.column, column_span);
    }

    #[test]
    fn test_columns_from_first_line() {
        let (table, diagnostics) = table("|===\n|A |B\n\n|1 |2\n|3 |4\n|===\n");
        assert!(diagnostics.entries().is_empty());
        assert_eq!(table.column_count, 2);
        assert_eq!(
            cell_texts(&table),
            vec![vec!["A", "B"], vec!["1", "2"], vec!["3", "4"]]
        );
        assert!(matches!(table.elements.get(1), Some(Element::EmptyLine)));
    }

    #[test]
    fn test_cols_attribute_and_multiline_rows() {
        let (table, _) = table("[cols=\"1,2*\"]\n|===\n|a\n|b\n|c\n|d\n|e\n|f\n|===\n");
        assert_eq!(table.column_count, 3);
        assert_eq!(table.columns.len(), 3);
        assert_eq!(cell_texts(&table), vec![vec!["a", "b", "c"], vec!["d", "e", "f"]]);
    }

    #[test]
    fn test_cols_widths_and_styles() {
        let (table, _) = table("[cols=\"1,~,25%h\"]\n|===\n|a |b |c\n|===\n");
        assert_eq!(table.columns.first().and_then(|column| column.width), Some(ColumnWidth::Proportional(1)));
        assert_eq!(table.columns.get(1).and_then(|column| column.width), Some(ColumnWidth::Auto));
        let last = table.columns.get(2).copied().unwrap_or_default();
        assert_eq!(last.width, Some(ColumnWidth::Percentage(25)));
        assert_eq!(last.format.style, Some(CellStyle::Header));
        let header_cell = table.rows().next().and_then(|row| row.cells().nth(2));
        assert_eq!(
            header_cell.and_then(|cell| cell.format).and_then(|format| format.style),
            Some(CellStyle::Header)
        );
    }

    #[test]
    fn test_spans_fill_rows() {
        let (table, diagnostics) =
            table("[cols=3]\n|===\n2+|wide |c\n.2+|tall |b |c\n|b |c\n|===\n");
        assert!(diagnostics.entries().is_empty());
        assert_eq!(
            cell_texts(&table),
            vec![vec!["wide", "c"], vec!["tall", "b", "c"], vec!["b", "c"]]
        );
    }

    #[test]
    fn test_duplicated_cell() {
        let (table, _) = table("[cols=3]\n|===\n3*|same\n|===\n");
        assert_eq!(cell_texts(&table), vec![vec!["same", "same", "same"]]);
    }

    #[test]
    fn test_escaped_separator_and_custom_separator() {
        let (escaped, _) = table("|===\n|a \\| b |c\n|===\n");
        assert_eq!(cell_texts(&escaped), vec![vec!["a | b", "c"]]);
        let (custom, _) = table("[separator=;]\n|===\n;x ;y\n|===\n");
        assert_eq!(cell_texts(&custom), vec![vec!["x", "y"]]);
    }

    #[test]
    fn test_blank_and_literal_cells() {
        let (table, _) = table("|===\n| l|  *kept*\n|===\n");
        let cells: Vec<&TableCell> = table.rows().flat_map(TableRow::cells).collect();
        assert!(cells.first().is_some_and(|cell| cell.blank));
        assert_eq!(
            cells.get(1).map(|cell| cell.elements.clone()),
            Some(vec![Element::String("*kept*".into())])
        );
    }

    #[test]
    fn test_asciidoc_cell_with_nested_table() {
        let (table, _) = table("|===\na|\n* item\n\n!===\n!x !y\n!===\n|===\n");
        let cell = table.rows().flat_map(TableRow::cells).next();
        let Some(cell) = cell else {
            panic!("expected a cell");
        };
        assert!(matches!(cell.elements.first(), Some(Element::UnorderedListItem(_))));
        let nested = cell.elements.iter().find_map(|element| {
            if let Element::Table(nested) = element {
                Some(nested)
            } else {
                None
            }
        });
        assert!(nested.is_some_and(|nested| nested.delimiter.kind == DelimiterType::NestedTable
            && nested.column_count == 2));
    }

    #[test]
    fn test_incomplete_row_warns() {
        let (table, diagnostics) = table("[cols=2]\n|===\n|a |b\n|c\n|===\n");
        assert_eq!(table.rows().count(), 2);
        assert_eq!(diagnostics.warnings().count(), 1);
    }
}
