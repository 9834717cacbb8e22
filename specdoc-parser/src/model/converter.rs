use crate::model::{Element, character_replacement};

/// Flattens inline content to the text a reader would see.
///
/// Cross-references render as their resolved text when resolved and as written
/// otherwise; anchors render as nothing.
#[must_use]
pub fn to_plain_text(elements: &[Element]) -> String {
    let mut out = String::new();
    push_plain_text(&mut out, elements);
    out
}

fn push_plain_text(out: &mut String, elements: &[Element]) {
    for element in elements {
        match element {
            Element::String(text) => out.push_str(text),
            Element::NewLine => out.push(' '),
            Element::SpecialCharacter(c) => out.push(*c),
            Element::CharacterReplacementReference(name) => {
                out.push_str(character_replacement(name).unwrap_or_default());
            }
            Element::UserAttributeReference(name) => {
                out.push('{');
                out.push_str(name);
                out.push('}');
            }
            Element::Bold(text)
            | Element::Italic(text)
            | Element::Monospace(text)
            | Element::Superscript(text) => push_plain_text(out, &text.elements),
            Element::Link(link) => {
                if link.elements.is_empty() {
                    out.push_str(&link.url);
                } else {
                    push_plain_text(out, &link.elements);
                }
            }
            Element::Email(email) => {
                if email.elements.is_empty() {
                    out.push_str(&email.address);
                } else {
                    push_plain_text(out, &email.elements);
                }
            }
            Element::CrossReference(xref) => match &xref.resolution {
                Some(resolution) => push_plain_text(out, &resolution.text),
                None => out.push_str(&xref.source_text()),
            },
            Element::Paragraph(paragraph) => push_plain_text(out, &paragraph.elements),
            Element::Anchor(_)
            | Element::EmptyLine
            | Element::Section(_)
            | Element::Table(_)
            | Element::TableRow(_)
            | Element::TableCell(_)
            | Element::OrderedListItem(_)
            | Element::UnorderedListItem(_)
            | Element::DescriptionListItem(_)
            | Element::ListContinuation(_)
            | Element::OpenBlock(_)
            | Element::ExampleBlock(_)
            | Element::SidebarBlock(_)
            | Element::QuoteBlock(_)
            | Element::Listing(_)
            | Element::LiteralBlock(_)
            | Element::StemBlock(_)
            | Element::PassthroughBlock(_)
            | Element::Comment(_)
            | Element::BlockImage(_)
            | Element::ThematicBreak(_)
            | Element::AttributeEntry(_)
            | Element::AttributeReset(_)
            | Element::FileInclude(_)
            | Element::IfDef(_)
            | Element::IfNDef(_)
            | Element::IfEval(_)
            | Element::EndIf(_) => {}
        }
    }
}
