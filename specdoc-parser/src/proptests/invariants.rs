//! Parser and resolver invariants.
//!
//! - P0: the parser never panics, whatever the input
//! - P1: structure (section nesting, every reference resolved, serialization)
//! - P2: the resolver is idempotent
use std::sync::Arc;

use proptest::prelude::*;

use crate::{Document, Element, InMemory, Options, Section, parse, resolve};

use super::generators::*;

/// Options whose includes read from an empty in-memory provider, so generated
/// `include::` lines never touch the file system.
fn options() -> Options {
    Options::builder()
        .with_provider(Arc::new(InMemory::new()))
        .build()
}

fn parse_ok(input: &str, options: &Options) -> Result<Document, TestCaseError> {
    parse(input, options).map_err(|error| TestCaseError::fail(error.to_string()))
}

fn child_sections(section: &Section) -> impl Iterator<Item = &Section> {
    section.elements.iter().filter_map(|element| {
        if let Element::Section(child) = element {
            Some(child)
        } else {
            None
        }
    })
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 512,
        max_shrink_iters: 10000,
        .. ProptestConfig::default()
    })]

    // P0

    #[test]
    fn parser_never_panics(input in any_document_string()) {
        let _ = parse(&input, &options());
    }

    #[test]
    fn parser_never_panics_on_ascii(input in ascii_document()) {
        let _ = parse(&input, &options());
    }

    #[test]
    fn parser_never_panics_on_structure(input in structured_document()) {
        let _ = parse(&input, &options());
        let raw = Options::builder()
            .with_provider(Arc::new(InMemory::new()))
            .without_preprocessor()
            .build();
        let _ = parse(&input, &raw);
    }

    // P1

    #[test]
    fn sections_never_skip_a_level(input in section_outline()) {
        let document = parse_ok(&input, &options())?;
        for section in document.sections() {
            for child in child_sections(section) {
                prop_assert_eq!(child.level, section.level + 1);
            }
        }
    }

    #[test]
    fn structured_sections_never_skip_a_level(input in structured_document()) {
        let document = parse_ok(&input, &options())?;
        for section in document.sections() {
            for child in child_sections(section) {
                prop_assert_eq!(child.level, section.level + 1);
            }
        }
    }

    #[test]
    fn every_reference_is_resolved(input in structured_document()) {
        let document = parse_ok(&input, &options())?;
        for xref in document.cross_references() {
            let resolution = xref.resolution.as_ref();
            prop_assert!(resolution.is_some_and(|resolution| !resolution.text.is_empty()));
        }
    }

    #[test]
    fn document_always_serializes(input in structured_document()) {
        let document = parse_ok(&input, &options())?;
        prop_assert!(document.to_json().is_ok());
    }

    // P2

    #[test]
    fn resolution_is_idempotent(input in structured_document()) {
        let options = options();
        let mut document = parse_ok(&input, &options)?;
        let catalog = document.catalog.clone();
        let elements = document.elements.clone();
        resolve(&mut document, &options);
        prop_assert_eq!(&catalog, &document.catalog);
        prop_assert_eq!(&elements, &document.elements);
    }

    #[test]
    fn cyclic_titles_resolve_idempotently(input in cross_referencing_titles()) {
        let options = options();
        let mut document = parse_ok(&input, &options)?;
        let elements = document.elements.clone();
        resolve(&mut document, &options);
        prop_assert_eq!(&elements, &document.elements);
    }
}
