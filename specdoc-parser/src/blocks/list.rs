use crate::{
    model::{
        AttributeList, Delimiter, DescriptionListItem, Element, ListContinuation, ListItem,
    },
    inlines,
    preprocessor::Line,
};

use super::{BlockParser, comment_line, is_block_metadata, is_raw_directive, section};

/// Deepest nesting expressible with repeated `*` or `.` markers.
const MAX_MARKER_RUN: usize = 5;

#[derive(Clone, Debug, PartialEq, Eq)]
pub(super) enum Marker {
    /// `*`, `**`, ... or `-`.
    Unordered { marker: String, level: usize },
    /// `.`, `..`, ... or `1.`.
    Ordered { marker: String, level: usize },
    /// `term::`, `term:::`, `term::::` or `term;;`.
    Description { term: String, marker: String },
}

impl Marker {
    /// Recognizes a list item line, returning the marker and the item's text.
    pub(super) fn parse(text: &str) -> Option<(Self, &str)> {
        let trimmed = text.trim_start();
        Self::unordered(trimmed)
            .or_else(|| Self::ordered(trimmed))
            .or_else(|| Self::description(text))
    }

    fn unordered(text: &str) -> Option<(Self, &str)> {
        let (run, rest) = if let Some(rest) = text.strip_prefix('-') {
            (1, rest)
        } else {
            let run = text.chars().take_while(|c| *c == '*').count();
            (run, text.get(run..)?)
        };
        let rest = item_text(run, rest)?;
        let marker = if text.starts_with('-') {
            "-".to_string()
        } else {
            "*".repeat(run)
        };
        Some((Self::Unordered { marker, level: run }, rest))
    }

    fn ordered(text: &str) -> Option<(Self, &str)> {
        let digits = text.chars().take_while(char::is_ascii_digit).count();
        if digits > 0 {
            let rest = text.get(digits..)?.strip_prefix('.')?;
            let rest = item_text(1, rest)?;
            let marker = text.get(..=digits)?.to_string();
            return Some((Self::Ordered { marker, level: 1 }, rest));
        }
        let run = text.chars().take_while(|c| *c == '.').count();
        let rest = item_text(run, text.get(run..)?)?;
        Some((
            Self::Ordered {
                marker: ".".repeat(run),
                level: run,
            },
            rest,
        ))
    }

    /// The first `::`-style marker followed by whitespace or the end of the line.
    fn description(text: &str) -> Option<(Self, &str)> {
        let mut offset = 0;
        while let Some(rest) = text.get(offset..) {
            let found = rest.find([':', ';'])?;
            let start = offset + found;
            let tail = text.get(start..)?;
            let (marker, length) = if tail.starts_with(";;") {
                (";;", 2)
            } else {
                let run = tail.chars().take_while(|c| *c == ':').count();
                match run {
                    2 => ("::", 2),
                    3 => (":::", 3),
                    4 => ("::::", 4),
                    _ => {
                        offset = start + run.max(1);
                        continue;
                    }
                }
            };
            let after = text.get(start + length..)?;
            let term = text.get(..start)?.trim();
            if !term.is_empty() && (after.is_empty() || after.starts_with([' ', '\t'])) {
                return Some((
                    Self::Description {
                        term: term.to_string(),
                        marker: marker.to_string(),
                    },
                    after.trim(),
                ));
            }
            offset = start + length;
        }
        None
    }
}

/// The text after a run of `run` marker characters: it must be separated by
/// whitespace and must not be empty.
fn item_text(run: usize, rest: &str) -> Option<&str> {
    if !(1..=MAX_MARKER_RUN).contains(&run) || !rest.starts_with([' ', '\t']) {
        return None;
    }
    let rest = rest.trim();
    (!rest.is_empty()).then_some(rest)
}

impl BlockParser<'_> {
    pub(super) fn list_item(
        &mut self,
        marker: Marker,
        text: &str,
        line: &Line,
        attributes: AttributeList,
    ) -> Element {
        let mut lines = Vec::new();
        if !text.is_empty() {
            lines.push(Line {
                text: text.to_string(),
                location: line.location.clone(),
                synthetic: false,
            });
        }
        while let Some(next) = self.peek_text() {
            if self.ends_item_text(&next) {
                break;
            }
            if let Some(mut next) = self.next()
                && comment_line(&next.text).is_none()
            {
                next.text = next.text.trim_start().to_string();
                lines.push(next);
            }
        }

        let mut elements = inlines::parse(&lines, &self.attributes);
        self.list_depth += 1;
        self.list_continuations(&mut elements);
        self.list_depth -= 1;

        let location = line.location.clone();
        match marker {
            Marker::Unordered { marker, level } => Element::UnorderedListItem(ListItem {
                attributes,
                marker,
                level,
                elements,
                location,
            }),
            Marker::Ordered { marker, level } => Element::OrderedListItem(ListItem {
                attributes,
                marker,
                level,
                elements,
                location,
            }),
            Marker::Description { term, marker } => {
                Element::DescriptionListItem(DescriptionListItem {
                    attributes,
                    term: inlines::parse_text(&term, &location, &self.attributes),
                    marker,
                    elements,
                    location,
                })
            }
        }
    }

    /// Attaches every `+`-joined block following the item's text.
    fn list_continuations(&mut self, elements: &mut Vec<Element>) {
        while self.peek().is_some_and(|line| line.text.trim_end() == "+") {
            let Some(plus) = self.next() else { break };
            if self.peek().is_none_or(|line| line.text.is_empty()) {
                self.diagnostics.warn(
                    Some(&plus.location),
                    "list continuation not followed by a block",
                );
                break;
            }
            if let Some(block) = self.parse_one_block() {
                elements.push(Element::ListContinuation(ListContinuation {
                    elements: vec![block],
                    location: plus.location,
                }));
            }
        }
    }

    /// Lines that end the text of a list item rather than continue it.
    fn ends_item_text(&self, text: &str) -> bool {
        text.is_empty()
            || text.trim_end() == "+"
            || Marker::parse(text).is_some()
            || is_block_metadata(text)
            || Delimiter::parse(text).is_some()
            || section::heading(text).is_some()
            || (!self.options.preprocess && is_raw_directive(text))
    }

    /// Whether a paragraph being read inside a list stops at `text`.
    pub(super) fn ends_list_paragraph(&self, text: &str) -> bool {
        self.list_depth > 0 && (text.trim_end() == "+" || Marker::parse(text).is_some())
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;
    use crate::{Options, preprocessor::Reader};

    fn unordered(marker: &str, level: usize) -> Marker {
        Marker::Unordered {
            marker: marker.to_string(),
            level,
        }
    }

    fn ordered(marker: &str, level: usize) -> Marker {
        Marker::Ordered {
            marker: marker.to_string(),
            level,
        }
    }

    fn description(term: &str, marker: &str) -> Marker {
        Marker::Description {
            term: term.to_string(),
            marker: marker.to_string(),
        }
    }

    #[rstest]
    #[case("* item", Some((unordered("*", 1), "item")))]
    #[case("*** deep", Some((unordered("***", 3), "deep")))]
    #[case("- dash", Some((unordered("-", 1), "dash")))]
    #[case("  * indented", Some((unordered("*", 1), "indented")))]
    #[case(". first", Some((ordered(".", 1), "first")))]
    #[case(".. nested", Some((ordered("..", 2), "nested")))]
    #[case("10. tenth", Some((ordered("10.", 1), "tenth")))]
    #[case("CPU:: The brain", Some((description("CPU", "::"), "The brain")))]
    #[case("Term:::", Some((description("Term", ":::"), "")))]
    #[case("Q;; A", Some((description("Q", ";;"), "A")))]
    #[case("see https://example.org:: here", Some((description("see https://example.org", "::"), "here")))]
    #[case("*bold* text", None)]
    #[case("*", None)]
    #[case("****** too deep", None)]
    #[case("image::cat.png[]", None)]
    #[case("a::b", None)]
    #[case("3.14 is pi", None)]
    fn test_marker(#[case] input: &str, #[case] expected: Option<(Marker, &str)>) {
        assert_eq!(Marker::parse(input), expected);
    }

    fn parse(input: &str) -> (Vec<Element>, crate::Diagnostics) {
        let options = Options::default();
        let reader = Reader::new(input, None, &options);
        let (elements, _, diagnostics, _) = BlockParser::new(reader, &options).parse();
        (elements, diagnostics)
    }

    #[test]
    fn test_item_text_spans_lines_until_next_marker() {
        let (elements, _) = parse("* one\n  still one\n** two\n* three\n");
        assert_eq!(elements.len(), 3);
        let Some(Element::UnorderedListItem(first)) = elements.first() else {
            panic!("expected a list item, got {elements:?}");
        };
        assert_eq!(
            first.elements,
            vec![
                Element::String("one".into()),
                Element::NewLine,
                Element::String("still one".into()),
            ]
        );
        assert!(matches!(elements.get(1), Some(Element::UnorderedListItem(item)) if item.level == 2));
    }

    #[test]
    fn test_continuation_attaches_block() {
        let (elements, diagnostics) = parse("* item\n+\n----\ncode\n----\n* next\n");
        assert!(diagnostics.entries().is_empty());
        let Some(Element::UnorderedListItem(item)) = elements.first() else {
            panic!("expected a list item, got {elements:?}");
        };
        let Some(Element::ListContinuation(continuation)) = item.elements.last() else {
            panic!("expected a continuation, got {:?}", item.elements);
        };
        assert!(matches!(continuation.elements.first(), Some(Element::Listing(_))));
        assert!(matches!(elements.get(1), Some(Element::UnorderedListItem(_))));
    }

    #[test]
    fn test_continued_paragraph_stops_at_next_marker() {
        let (elements, _) = parse(". step\n+\nDetails here.\n. next step\n");
        assert_eq!(elements.len(), 2);
        assert!(matches!(elements.get(1), Some(Element::OrderedListItem(_))));
    }

    #[test]
    fn test_dangling_continuation_warns() {
        let (_, diagnostics) = parse("* item\n+\n\nafter\n");
        assert_eq!(
            diagnostics
                .warnings()
                .map(|warning| warning.message.as_str())
                .collect::<Vec<_>>(),
            vec!["list continuation not followed by a block"]
        );
    }

    #[test]
    fn test_description_item_term_is_inline() {
        let (elements, _) = parse("*CPU*:: The brain\n");
        let Some(Element::DescriptionListItem(item)) = elements.first() else {
            panic!("expected a description item, got {elements:?}");
        };
        assert!(matches!(item.term.first(), Some(Element::Bold(_))));
        assert_eq!(item.elements, vec![Element::String("The brain".into())]);
    }
}
