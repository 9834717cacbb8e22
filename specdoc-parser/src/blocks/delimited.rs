use crate::{
    model::{
        Attribute, AttributeList, DelimitedBlock, Delimiter, DelimiterType, Element,
        NamedAttribute, Quote, ShorthandAttribute, SourceLocation, VerbatimBlock,
    },
    preprocessor::Line,
};

use super::BlockParser;

fn kind_name(kind: DelimiterType) -> &'static str {
    match kind {
        DelimiterType::Comment => "comment",
        DelimiterType::Example => "example",
        DelimiterType::Fenced => "fenced code",
        DelimiterType::Listing => "listing",
        DelimiterType::Literal => "literal",
        DelimiterType::Open => "open",
        DelimiterType::Passthrough => "passthrough",
        DelimiterType::Quote => "quote",
        DelimiterType::Sidebar => "sidebar",
        DelimiterType::Table | DelimiterType::NestedTable => "table",
    }
}

impl BlockParser<'_> {
    /// Reads a delimited block whose opening fence, `opening`, has been consumed.
    pub(super) fn delimited(
        &mut self,
        delimiter: Delimiter,
        opening: &Line,
        attributes: AttributeList,
    ) -> Element {
        match delimiter.kind {
            DelimiterType::Table | DelimiterType::NestedTable => {
                self.table(delimiter, opening, attributes)
            }
            DelimiterType::Comment
            | DelimiterType::Fenced
            | DelimiterType::Listing
            | DelimiterType::Literal
            | DelimiterType::Passthrough => self.verbatim(delimiter, opening, attributes),
            DelimiterType::Example
            | DelimiterType::Open
            | DelimiterType::Quote
            | DelimiterType::Sidebar => self.compound(delimiter, opening, attributes),
        }
    }

    fn compound(
        &mut self,
        delimiter: Delimiter,
        opening: &Line,
        mut attributes: AttributeList,
    ) -> Element {
        let (elements, terminated) = self.parse_blocks(Some(delimiter));
        if !terminated {
            self.warn_unterminated(delimiter, &opening.location);
        }
        if delimiter.kind == DelimiterType::Quote {
            attributes.assign_implied_names(2, &["attribution", "citetitle"]);
        }
        let block = DelimitedBlock {
            attributes,
            delimiter: Some(delimiter),
            elements,
            unterminated: !terminated,
            location: opening.location.clone(),
        };
        match delimiter.kind {
            DelimiterType::Example => Element::ExampleBlock(block),
            DelimiterType::Quote => Element::QuoteBlock(block),
            DelimiterType::Sidebar => Element::SidebarBlock(block),
            DelimiterType::Open
            | DelimiterType::Comment
            | DelimiterType::Fenced
            | DelimiterType::Listing
            | DelimiterType::Literal
            | DelimiterType::Passthrough
            | DelimiterType::Table
            | DelimiterType::NestedTable => Element::OpenBlock(block),
        }
    }

    fn verbatim(
        &mut self,
        delimiter: Delimiter,
        opening: &Line,
        mut attributes: AttributeList,
    ) -> Element {
        let mut lines = Vec::new();
        let mut terminated = false;
        while let Some(line) = self.next() {
            if delimiter.is_closed_by(&line.text) {
                terminated = true;
                break;
            }
            lines.push(line.text);
        }
        if !terminated {
            self.warn_unterminated(delimiter, &opening.location);
        }

        let style = attributes.style().map(str::to_string);
        if delimiter.kind == DelimiterType::Fenced {
            fenced_attributes(&mut attributes, &opening.text, delimiter.length);
        } else if matches!(style.as_deref(), Some("source" | "listing")) {
            attributes.assign_implied_names(2, &["language", "linenums"]);
        }

        let block = VerbatimBlock {
            attributes,
            delimiter: Some(delimiter),
            lines,
            unterminated: !terminated,
            location: opening.location.clone(),
        };
        match delimiter.kind {
            DelimiterType::Comment => Element::Comment(block),
            DelimiterType::Literal => Element::LiteralBlock(block),
            DelimiterType::Passthrough
                if matches!(style.as_deref(), Some("stem" | "latexmath" | "asciimath")) =>
            {
                Element::StemBlock(block)
            }
            DelimiterType::Passthrough => Element::PassthroughBlock(block),
            DelimiterType::Fenced
            | DelimiterType::Listing
            | DelimiterType::Example
            | DelimiterType::Open
            | DelimiterType::Quote
            | DelimiterType::Sidebar
            | DelimiterType::Table
            | DelimiterType::NestedTable => Element::Listing(block),
        }
    }

    pub(super) fn warn_unterminated(&mut self, delimiter: Delimiter, location: &SourceLocation) {
        self.diagnostics.warn(
            Some(location),
            format!("unterminated {} block", kind_name(delimiter.kind)),
        );
    }
}

/// A fenced block is a source listing; the info string after the backticks names
/// its language.
fn fenced_attributes(attributes: &mut AttributeList, opening: &str, length: usize) {
    if attributes.style().is_none() {
        attributes.push(Attribute::Shorthand(ShorthandAttribute {
            style: Some("source".to_string()),
            ..ShorthandAttribute::default()
        }));
    }
    let language = opening.get(length..).map(str::trim).unwrap_or_default();
    if !language.is_empty() {
        attributes.push(Attribute::Named(NamedAttribute {
            name: "language".to_string(),
            value: language.to_string(),
            quote: Quote::None,
        }));
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{Diagnostics, Options, preprocessor::Reader};

    fn parse(input: &str) -> (Vec<Element>, Diagnostics) {
        let options = Options::default();
        let reader = Reader::new(input, None, &options);
        let (elements, _, diagnostics, _) = BlockParser::new(reader, &options).parse();
        (elements, diagnostics)
    }

    #[test]
    fn test_listing_keeps_lines_verbatim() {
        let (elements, _) = parse("[source,ruby]\n----\nputs *1*\n\n  indented\n----\n");
        let Some(Element::Listing(block)) = elements.first() else {
            panic!("expected a listing, got {elements:?}");
        };
        assert_eq!(block.lines, vec!["puts *1*", "", "  indented"]);
        assert_eq!(block.attributes.get("language"), Some("ruby"));
        assert!(!block.unterminated);
    }

    #[test]
    fn test_fenced_block_language() {
        let (elements, _) = parse("```rust\nlet x = 1;\n```\n");
        let Some(Element::Listing(block)) = elements.first() else {
            panic!("expected a listing, got {elements:?}");
        };
        assert_eq!(block.attributes.style(), Some("source"));
        assert_eq!(block.attributes.get("language"), Some("rust"));
    }

    #[test]
    fn test_nested_compound_blocks_close_by_length() {
        let (elements, diagnostics) = parse("====\nouter\n\n======\ninner\n======\n====\n");
        assert!(diagnostics.entries().is_empty());
        let Some(Element::ExampleBlock(outer)) = elements.first() else {
            panic!("expected an example block, got {elements:?}");
        };
        assert!(
            outer
                .elements
                .iter()
                .any(|element| matches!(element, Element::ExampleBlock(_)))
        );
    }

    #[test]
    fn test_closing_delimiter_is_not_a_title_underline() {
        let (elements, diagnostics) = parse("--\nab\n--\n\nafter\n");
        assert!(diagnostics.entries().is_empty());
        let Some(Element::OpenBlock(block)) = elements.first() else {
            panic!("expected an open block, got {elements:?}");
        };
        assert!(!block.unterminated);
        assert!(matches!(block.elements.as_slice(), [Element::Paragraph(_)]));
        assert!(
            elements
                .iter()
                .any(|element| matches!(element, Element::Paragraph(_)))
        );
        assert!(
            !elements
                .iter()
                .any(|element| matches!(element, Element::Section(_)))
        );
    }

    #[test]
    fn test_underline_inside_block_still_titles() {
        let (elements, _) = parse("====\nTitle\n-----\n\ntext\n====\n");
        let Some(Element::ExampleBlock(block)) = elements.first() else {
            panic!("expected an example block, got {elements:?}");
        };
        assert!(!block.unterminated);
        assert!(matches!(block.elements.first(), Some(Element::Section(section)) if section.level == 1));
    }

    #[test]
    fn test_unterminated_block_warns() {
        let (elements, diagnostics) = parse("****\nsidebar text\n");
        assert!(matches!(
            elements.first(),
            Some(Element::SidebarBlock(block)) if block.unterminated
        ));
        assert_eq!(
            diagnostics
                .warnings()
                .map(|warning| warning.message.as_str())
                .collect::<Vec<_>>(),
            vec!["unterminated sidebar block"]
        );
    }

    #[test]
    fn test_stem_passthrough() {
        let (elements, _) = parse("[stem]\n++++\nsqrt(4) = 2\n++++\n");
        assert!(matches!(elements.first(), Some(Element::StemBlock(_))));
    }

    #[test]
    fn test_quote_block_attribution() {
        let (elements, _) = parse("[quote,Someone]\n____\nWords.\n____\n");
        let Some(Element::QuoteBlock(block)) = elements.first() else {
            panic!("expected a quote, got {elements:?}");
        };
        assert_eq!(block.attributes.get("attribution"), Some("Someone"));
    }
}
