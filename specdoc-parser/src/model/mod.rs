//! The document tree.
use std::path::PathBuf;

use serde::Serialize;

mod attribute_store;
mod attributes;
mod blocks;
pub(crate) mod converter;
mod directives;
mod inlines;
mod location;
mod tables;

pub use attribute_store::{AttributeState, AttributeStore, AttributeValue, StoredAttribute};
pub(crate) use attribute_store::{Missing, is_attribute_name};
pub use attributes::{
    AnchorAttribute, Attribute, AttributeList, NamedAttribute, PositionalAttribute, Quote,
    ShorthandAttribute, TitleAttribute,
};
pub use blocks::{
    BlockImage, DelimitedBlock, Delimiter, DelimiterType, DescriptionListItem, ListContinuation,
    ListItem, Paragraph, Section, ThematicBreak, VerbatimBlock,
};
pub use converter::to_plain_text;
pub use directives::{
    AttributeEntry, AttributeReset, Conditional, EndIf, FileInclude, IfEval,
    IncludeSelection, IncludedFile, Union,
};
pub use inlines::{
    Anchor, CrossReference, Email, Form, FormattedText, Link, LinkForm, ReferenceTarget,
    Resolution, XrefFormat, character_replacement,
};
pub use location::SourceLocation;
pub use tables::{
    CellSpan, CellStyle, ColumnSpec, ColumnWidth, HorizontalAlign, Table, TableCell,
    TableCellFormat, TableRow, VerticalAlign,
};

use crate::{Diagnostic, Error, xref::Catalog};

/// Every kind of node in the tree. The set is closed: consumers match on it
/// exhaustively.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Element {
    String(String),
    NewLine,
    EmptyLine,
    /// `<`, `>` or `&`, which renderers usually need to escape.
    SpecialCharacter(char),
    /// `{nbsp}`, `{amp}` and the other built-in replacements, by name.
    CharacterReplacementReference(String),
    /// `{name}` naming an attribute that was not set where the reference appeared.
    UserAttributeReference(String),

    Bold(FormattedText),
    Italic(FormattedText),
    Monospace(FormattedText),
    Superscript(FormattedText),
    Link(Link),
    Email(Email),
    CrossReference(CrossReference),
    Anchor(Anchor),

    Paragraph(Paragraph),
    Section(Section),
    Table(Table),
    TableRow(TableRow),
    TableCell(TableCell),
    OrderedListItem(ListItem),
    UnorderedListItem(ListItem),
    DescriptionListItem(DescriptionListItem),
    ListContinuation(ListContinuation),
    OpenBlock(DelimitedBlock),
    ExampleBlock(DelimitedBlock),
    SidebarBlock(DelimitedBlock),
    QuoteBlock(DelimitedBlock),
    Listing(VerbatimBlock),
    LiteralBlock(VerbatimBlock),
    StemBlock(VerbatimBlock),
    PassthroughBlock(VerbatimBlock),
    Comment(VerbatimBlock),
    BlockImage(BlockImage),
    ThematicBreak(ThematicBreak),

    AttributeEntry(AttributeEntry),
    AttributeReset(AttributeReset),
    FileInclude(FileInclude),
    IfDef(Conditional),
    IfNDef(Conditional),
    IfEval(IfEval),
    EndIf(EndIf),
}

impl Element {
    #[must_use]
    pub fn attributes(&self) -> Option<&AttributeList> {
        match self {
            Element::Paragraph(Paragraph { attributes, .. })
            | Element::Section(Section { attributes, .. })
            | Element::Table(Table { attributes, .. })
            | Element::OrderedListItem(ListItem { attributes, .. })
            | Element::UnorderedListItem(ListItem { attributes, .. })
            | Element::DescriptionListItem(DescriptionListItem { attributes, .. })
            | Element::OpenBlock(DelimitedBlock { attributes, .. })
            | Element::ExampleBlock(DelimitedBlock { attributes, .. })
            | Element::SidebarBlock(DelimitedBlock { attributes, .. })
            | Element::QuoteBlock(DelimitedBlock { attributes, .. })
            | Element::Listing(VerbatimBlock { attributes, .. })
            | Element::LiteralBlock(VerbatimBlock { attributes, .. })
            | Element::StemBlock(VerbatimBlock { attributes, .. })
            | Element::PassthroughBlock(VerbatimBlock { attributes, .. })
            | Element::Comment(VerbatimBlock { attributes, .. })
            | Element::BlockImage(BlockImage { attributes, .. })
            | Element::ThematicBreak(ThematicBreak { attributes, .. })
            | Element::FileInclude(FileInclude { attributes, .. }) => Some(attributes),
            Element::String(_)
            | Element::NewLine
            | Element::EmptyLine
            | Element::SpecialCharacter(_)
            | Element::CharacterReplacementReference(_)
            | Element::UserAttributeReference(_)
            | Element::Bold(_)
            | Element::Italic(_)
            | Element::Monospace(_)
            | Element::Superscript(_)
            | Element::Link(_)
            | Element::Email(_)
            | Element::CrossReference(_)
            | Element::Anchor(_)
            | Element::TableRow(_)
            | Element::TableCell(_)
            | Element::ListContinuation(_)
            | Element::AttributeEntry(_)
            | Element::AttributeReset(_)
            | Element::IfDef(_)
            | Element::IfNDef(_)
            | Element::IfEval(_)
            | Element::EndIf(_) => None,
        }
    }

    #[must_use]
    pub fn location(&self) -> Option<&SourceLocation> {
        match self {
            Element::Paragraph(Paragraph { location, .. })
            | Element::Section(Section { location, .. })
            | Element::Table(Table { location, .. })
            | Element::TableRow(TableRow { location, .. })
            | Element::TableCell(TableCell { location, .. })
            | Element::OrderedListItem(ListItem { location, .. })
            | Element::UnorderedListItem(ListItem { location, .. })
            | Element::DescriptionListItem(DescriptionListItem { location, .. })
            | Element::ListContinuation(ListContinuation { location, .. })
            | Element::OpenBlock(DelimitedBlock { location, .. })
            | Element::ExampleBlock(DelimitedBlock { location, .. })
            | Element::SidebarBlock(DelimitedBlock { location, .. })
            | Element::QuoteBlock(DelimitedBlock { location, .. })
            | Element::Listing(VerbatimBlock { location, .. })
            | Element::LiteralBlock(VerbatimBlock { location, .. })
            | Element::StemBlock(VerbatimBlock { location, .. })
            | Element::PassthroughBlock(VerbatimBlock { location, .. })
            | Element::Comment(VerbatimBlock { location, .. })
            | Element::BlockImage(BlockImage { location, .. })
            | Element::ThematicBreak(ThematicBreak { location, .. })
            | Element::CrossReference(CrossReference { location, .. })
            | Element::Anchor(Anchor { location, .. })
            | Element::AttributeEntry(AttributeEntry { location, .. })
            | Element::AttributeReset(AttributeReset { location, .. })
            | Element::FileInclude(FileInclude { location, .. })
            | Element::IfDef(Conditional { location, .. })
            | Element::IfNDef(Conditional { location, .. })
            | Element::IfEval(IfEval { location, .. })
            | Element::EndIf(EndIf { location, .. }) => Some(location),
            Element::String(_)
            | Element::NewLine
            | Element::EmptyLine
            | Element::SpecialCharacter(_)
            | Element::CharacterReplacementReference(_)
            | Element::UserAttributeReference(_)
            | Element::Bold(_)
            | Element::Italic(_)
            | Element::Monospace(_)
            | Element::Superscript(_)
            | Element::Link(_)
            | Element::Email(_) => None,
        }
    }

    /// Child element sequences, including inline content held by attribute lists
    /// (block titles, anchor labels).
    #[must_use]
    pub fn children(&self) -> Vec<&Vec<Element>> {
        let (own, attributes): (Vec<&Vec<Element>>, Option<&AttributeList>) = match self {
            Element::Bold(text)
            | Element::Italic(text)
            | Element::Monospace(text)
            | Element::Superscript(text) => (vec![&text.elements], None),
            Element::Link(link) => (vec![&link.elements], None),
            Element::Email(email) => (vec![&email.elements], None),
            Element::CrossReference(xref) => (vec![&xref.elements], None),
            Element::Anchor(anchor) => (vec![&anchor.label], None),
            Element::Paragraph(paragraph) => {
                (vec![&paragraph.elements], Some(&paragraph.attributes))
            }
            Element::Section(section) => (
                vec![&section.title, &section.elements],
                Some(&section.attributes),
            ),
            Element::Table(table) => (vec![&table.elements], Some(&table.attributes)),
            Element::TableRow(row) => (vec![&row.elements], None),
            Element::TableCell(cell) => (vec![&cell.elements], None),
            Element::OrderedListItem(item) | Element::UnorderedListItem(item) => {
                (vec![&item.elements], Some(&item.attributes))
            }
            Element::DescriptionListItem(item) => {
                (vec![&item.term, &item.elements], Some(&item.attributes))
            }
            Element::ListContinuation(continuation) => (vec![&continuation.elements], None),
            Element::OpenBlock(block)
            | Element::ExampleBlock(block)
            | Element::SidebarBlock(block)
            | Element::QuoteBlock(block) => (vec![&block.elements], Some(&block.attributes)),
            Element::Listing(block)
            | Element::LiteralBlock(block)
            | Element::StemBlock(block)
            | Element::PassthroughBlock(block)
            | Element::Comment(block) => (Vec::new(), Some(&block.attributes)),
            Element::BlockImage(image) => (Vec::new(), Some(&image.attributes)),
            Element::ThematicBreak(thematic) => (Vec::new(), Some(&thematic.attributes)),
            Element::FileInclude(include) => (Vec::new(), Some(&include.attributes)),
            Element::String(_)
            | Element::NewLine
            | Element::EmptyLine
            | Element::SpecialCharacter(_)
            | Element::CharacterReplacementReference(_)
            | Element::UserAttributeReference(_)
            | Element::AttributeEntry(_)
            | Element::AttributeReset(_)
            | Element::IfDef(_)
            | Element::IfNDef(_)
            | Element::IfEval(_)
            | Element::EndIf(_) => (Vec::new(), None),
        };
        let mut children: Vec<&Vec<Element>> = attributes
            .map(|list| list.element_lists().collect())
            .unwrap_or_default();
        children.extend(own);
        children
    }

    /// Mutable counterpart of [`Element::children`], in the same order.
    pub fn children_mut(&mut self) -> Vec<&mut Vec<Element>> {
        let (own, attributes): (Vec<&mut Vec<Element>>, Option<&mut AttributeList>) = match self {
            Element::Bold(text)
            | Element::Italic(text)
            | Element::Monospace(text)
            | Element::Superscript(text) => (vec![&mut text.elements], None),
            Element::Link(link) => (vec![&mut link.elements], None),
            Element::Email(email) => (vec![&mut email.elements], None),
            Element::CrossReference(xref) => (vec![&mut xref.elements], None),
            Element::Anchor(anchor) => (vec![&mut anchor.label], None),
            Element::Paragraph(paragraph) => (
                vec![&mut paragraph.elements],
                Some(&mut paragraph.attributes),
            ),
            Element::Section(section) => (
                vec![&mut section.title, &mut section.elements],
                Some(&mut section.attributes),
            ),
            Element::Table(table) => (vec![&mut table.elements], Some(&mut table.attributes)),
            Element::TableRow(row) => (vec![&mut row.elements], None),
            Element::TableCell(cell) => (vec![&mut cell.elements], None),
            Element::OrderedListItem(item) | Element::UnorderedListItem(item) => {
                (vec![&mut item.elements], Some(&mut item.attributes))
            }
            Element::DescriptionListItem(item) => (
                vec![&mut item.term, &mut item.elements],
                Some(&mut item.attributes),
            ),
            Element::ListContinuation(continuation) => (vec![&mut continuation.elements], None),
            Element::OpenBlock(block)
            | Element::ExampleBlock(block)
            | Element::SidebarBlock(block)
            | Element::QuoteBlock(block) => {
                (vec![&mut block.elements], Some(&mut block.attributes))
            }
            Element::Listing(block)
            | Element::LiteralBlock(block)
            | Element::StemBlock(block)
            | Element::PassthroughBlock(block)
            | Element::Comment(block) => (Vec::new(), Some(&mut block.attributes)),
            Element::BlockImage(image) => (Vec::new(), Some(&mut image.attributes)),
            Element::ThematicBreak(thematic) => (Vec::new(), Some(&mut thematic.attributes)),
            Element::FileInclude(include) => (Vec::new(), Some(&mut include.attributes)),
            Element::String(_)
            | Element::NewLine
            | Element::EmptyLine
            | Element::SpecialCharacter(_)
            | Element::CharacterReplacementReference(_)
            | Element::UserAttributeReference(_)
            | Element::AttributeEntry(_)
            | Element::AttributeReset(_)
            | Element::IfDef(_)
            | Element::IfNDef(_)
            | Element::IfEval(_)
            | Element::EndIf(_) => (Vec::new(), None),
        };
        let mut children: Vec<&mut Vec<Element>> = attributes
            .map(|list| list.element_lists_mut().collect())
            .unwrap_or_default();
        children.extend(own);
        children
    }
}

/// Visits `elements` and all their descendants depth-first, parents before children.
pub fn walk<'a>(elements: &'a [Element], visit: &mut impl FnMut(&'a Element)) {
    for element in elements {
        visit(element);
        for children in element.children() {
            walk(children, visit);
        }
    }
}

/// Like [`walk`], with mutable access.
pub fn walk_mut(elements: &mut [Element], visit: &mut impl FnMut(&mut Element)) {
    for element in elements.iter_mut() {
        visit(element);
        for children in element.children_mut() {
            walk_mut(children, visit);
        }
    }
}

/// A parsed document.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Document {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    /// Attribute state at the end of the document.
    pub attributes: AttributeStore,
    pub elements: Vec<Element>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub includes: Vec<IncludedFile>,
    /// IDs and titles indexed by the resolver; empty until it has run.
    pub catalog: Catalog,
    #[serde(skip)]
    pub diagnostics: Vec<Diagnostic>,
}

impl Document {
    /// The title of the level-0 section the document opens with, if any.
    #[must_use]
    pub fn title(&self) -> Option<&[Element]> {
        self.elements.iter().find_map(|element| {
            if let Element::Section(section) = element
                && section.level == 0
            {
                Some(section.title.as_slice())
            } else {
                None
            }
        })
    }

    /// Every section, depth-first.
    #[must_use]
    pub fn sections(&self) -> Vec<&Section> {
        let mut sections = Vec::new();
        walk(&self.elements, &mut |element| {
            if let Element::Section(section) = element {
                sections.push(section);
            }
        });
        sections
    }

    /// Every cross-reference, in document order.
    #[must_use]
    pub fn cross_references(&self) -> Vec<&CrossReference> {
        let mut xrefs = Vec::new();
        walk(&self.elements, &mut |element| {
            if let Element::CrossReference(xref) = element {
                xrefs.push(xref);
            }
        });
        xrefs
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity >= crate::Severity::Warning)
    }

    /// The tree as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, Error> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
