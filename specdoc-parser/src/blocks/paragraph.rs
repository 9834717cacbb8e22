use crate::{
    model::{
        AttributeList, DelimitedBlock, Delimiter, Element, Paragraph, SourceLocation,
        VerbatimBlock,
    },
    inlines,
    preprocessor::Line,
};

use super::{BlockParser, comment_line, is_raw_directive};

/// Admonition styles, which leave the paragraph as it is.
const ADMONITIONS: [&str; 5] = ["NOTE", "TIP", "IMPORTANT", "WARNING", "CAUTION"];

impl BlockParser<'_> {
    /// Reads a paragraph starting at `first`, which has already been consumed, and
    /// shapes it according to its block style.
    pub(super) fn paragraph(&mut self, first: Line, mut attributes: AttributeList) -> Element {
        let location = first.location.clone();
        let mut lines = vec![first];
        while let Some(text) = self.peek_text() {
            if text.is_empty()
                || Delimiter::parse(&text).is_some()
                || self.ends_list_paragraph(&text)
                || (!self.options.preprocess && is_raw_directive(&text))
            {
                break;
            }
            if let Some(line) = self.next()
                && comment_line(&line.text).is_none()
            {
                lines.push(line);
            }
        }

        let style = attributes.style().map(str::to_string);
        match style.as_deref() {
            Some("literal") => Element::LiteralBlock(verbatim(attributes, &lines, location)),
            Some("listing" | "source") => {
                attributes.assign_implied_names(2, &["language", "linenums"]);
                Element::Listing(verbatim(attributes, &lines, location))
            }
            Some("stem" | "latexmath" | "asciimath") => {
                Element::StemBlock(verbatim(attributes, &lines, location))
            }
            Some("pass") => Element::PassthroughBlock(verbatim(attributes, &lines, location)),
            Some("comment") => Element::Comment(verbatim(attributes, &lines, location)),
            Some("quote" | "verse") => {
                attributes.assign_implied_names(2, &["attribution", "citetitle"]);
                Element::QuoteBlock(self.wrapped(attributes, &lines, location))
            }
            Some("abstract" | "partintro" | "open") => {
                Element::OpenBlock(self.wrapped(attributes, &lines, location))
            }
            Some("example") => Element::ExampleBlock(self.wrapped(attributes, &lines, location)),
            Some("sidebar") => Element::SidebarBlock(self.wrapped(attributes, &lines, location)),
            Some("normal") => {
                for line in &mut lines {
                    line.text = line.text.trim_start().to_string();
                }
                self.plain(attributes, &lines, location)
            }
            Some(style) => {
                if !ADMONITIONS.contains(&style) {
                    self.diagnostics.debug(
                        Some(&location),
                        format!("unknown paragraph style '{style}', keeping a plain paragraph"),
                    );
                }
                self.plain(attributes, &lines, location)
            }
            None if lines
                .first()
                .is_some_and(|line| line.text.starts_with([' ', '\t'])) =>
            {
                Element::LiteralBlock(verbatim(attributes, &outdent(&lines), location))
            }
            None => self.plain(attributes, &lines, location),
        }
    }

    fn plain(
        &self,
        attributes: AttributeList,
        lines: &[Line],
        location: SourceLocation,
    ) -> Element {
        Element::Paragraph(Paragraph {
            attributes,
            elements: inlines::parse(lines, &self.attributes),
            location,
        })
    }

    /// A block with no delimiter holding the lines as its only paragraph.
    fn wrapped(
        &self,
        attributes: AttributeList,
        lines: &[Line],
        location: SourceLocation,
    ) -> DelimitedBlock {
        let paragraph = self.plain(AttributeList::new(), lines, location.clone());
        DelimitedBlock {
            attributes,
            delimiter: None,
            elements: vec![paragraph],
            unterminated: false,
            location,
        }
    }
}

fn verbatim(
    attributes: AttributeList,
    lines: &[Line],
    location: SourceLocation,
) -> VerbatimBlock {
    VerbatimBlock {
        attributes,
        delimiter: None,
        lines: lines.iter().map(|line| line.text.clone()).collect(),
        unterminated: false,
        location,
    }
}

/// Removes the indentation common to every non-blank line.
pub(super) fn outdent(lines: &[Line]) -> Vec<Line> {
    let indent = lines
        .iter()
        .filter(|line| !line.text.trim().is_empty())
        .map(|line| line.text.len() - line.text.trim_start().len())
        .min()
        .unwrap_or(0);
    lines
        .iter()
        .map(|line| Line {
            text: line.text.get(indent..).unwrap_or_default().to_string(),
            location: line.location.clone(),
            synthetic: line.synthetic,
        })
        .collect()
}
