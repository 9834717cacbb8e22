//! Include expansion against the fixtures on disk and in memory.
#![allow(clippy::panic)]
use std::{path::PathBuf, sync::Arc};

use pretty_assertions::assert_eq;
use specdoc_parser::{
    Document, Element, Error, InMemory, Options, ReferenceTarget, Section, parse, parse_file,
    to_plain_text,
};

fn outline(document: &Document) -> Vec<(u8, String, Option<String>)> {
    document
        .sections()
        .into_iter()
        .map(|section: &Section| {
            (
                section.level,
                to_plain_text(&section.title),
                section.id.clone(),
            )
        })
        .collect()
}

fn paragraph_texts(elements: &[Element]) -> Vec<String> {
    let mut texts = Vec::new();
    specdoc_parser::walk(elements, &mut |element| {
        if let Element::Paragraph(paragraph) = element {
            texts.push(to_plain_text(&paragraph.elements));
        }
    });
    texts
}

#[test]
fn test_book_outline_applies_leveloffset() -> Result<(), Error> {
    let document = parse_file("tests/fixtures/book.adoc", &Options::default())?;
    assert_eq!(
        outline(&document),
        vec![
            (0, "The Field Guide".into(), Some("the_field_guide".into())),
            (1, "Introduction".into(), Some("introduction".into())),
            (2, "Goals".into(), Some("intro-goals".into())),
            (1, "Installing".into(), Some("installing".into())),
            (1, "Feeding".into(), Some("feeding".into())),
        ]
    );
    assert_eq!(document.attributes.get("leveloffset"), None);
    assert_eq!(document.attributes.get("doctitle"), Some("The Field Guide"));
    Ok(())
}

#[test]
fn test_book_records_includes_and_locations() -> Result<(), Error> {
    let document = parse_file("tests/fixtures/book.adoc", &Options::default())?;
    let included: Vec<PathBuf> = document
        .includes
        .iter()
        .map(|included| included.path.clone())
        .collect();
    assert_eq!(
        included,
        vec![
            PathBuf::from("tests/fixtures/chapters/intro.adoc"),
            PathBuf::from("tests/fixtures/chapters/setup.adoc"),
        ]
    );
    let goals = document
        .sections()
        .into_iter()
        .find(|section| section.id.as_deref() == Some("intro-goals"));
    let Some(goals) = goals else {
        panic!("the Goals section is missing");
    };
    assert_eq!(
        goals.location.file,
        Some(PathBuf::from("tests/fixtures/chapters/intro.adoc"))
    );
    assert_eq!(goals.location.line, 6);
    assert!(
        !paragraph_texts(&document.elements)
            .iter()
            .any(|text| text.contains("Delete everything")),
        "content outside the selected tag was included"
    );
    assert_eq!(document.warnings().count(), 0);
    Ok(())
}

#[test]
fn test_book_cross_references() -> Result<(), Error> {
    let document = parse_file("tests/fixtures/book.adoc", &Options::default())?;
    let resolved: Vec<(ReferenceTarget, String)> = document
        .cross_references()
        .into_iter()
        .filter_map(|xref| xref.resolution.as_ref())
        .map(|resolution| (resolution.target.clone(), to_plain_text(&resolution.text)))
        .collect();
    assert_eq!(
        resolved,
        vec![
            (ReferenceTarget::Internal { id: "intro-goals".into() }, "Goals".into()),
            (ReferenceTarget::Internal { id: "feeding".into() }, "Feeding".into()),
            (
                ReferenceTarget::Internal { id: "installing".into() },
                "the installer notes".into()
            ),
            (
                ReferenceTarget::Internal { id: "feeding-table".into() },
                "Daily rations".into()
            ),
            (
                ReferenceTarget::External {
                    path: "chapters/setup.adoc".into(),
                    fragment: Some("removing".into())
                },
                "chapters/setup.adoc#removing".into()
            ),
            (ReferenceTarget::Document, "Field Guide".into()),
        ]
    );
    Ok(())
}

#[test]
fn test_missing_include_is_replaced() -> Result<(), Error> {
    let options = Options::builder().with_provider(Arc::new(InMemory::new())).build();
    let document = parse("before\n\ninclude::missing.adoc[]\n\nafter\n", &options)?;
    assert_eq!(
        paragraph_texts(&document.elements),
        vec![
            "before",
            "Unresolved directive in <input> - include::missing.adoc[]",
            "after"
        ]
    );
    assert_eq!(document.warnings().count(), 1);

    let optional = parse("include::missing.adoc[opts=optional]\n", &options)?;
    assert!(optional.elements.is_empty());
    assert_eq!(optional.warnings().count(), 0);
    Ok(())
}

#[test]
fn test_include_encodings() -> Result<(), Error> {
    let options = Options::builder().with_base_dir("tests/fixtures/chapters").build();

    let document = parse("include::utf16.adoc[]\n", &options)?;
    assert_eq!(paragraph_texts(&document.elements), vec!["Übung macht den Meister."]);

    let document = parse("include::latin1.txt[encoding=iso-8859-1]\n", &options)?;
    assert_eq!(paragraph_texts(&document.elements), vec!["café crème"]);

    let document = parse("include::latin1.txt[]\n", &options)?;
    let texts = paragraph_texts(&document.elements);
    assert_eq!(texts.len(), 1);
    assert!(texts.iter().all(|text| text.starts_with("Unresolved directive")));
    assert_eq!(document.warnings().count(), 1);
    Ok(())
}

#[test]
fn test_relative_includes_resolve_against_the_including_file() -> Result<(), Error> {
    let provider = InMemory::new()
        .with_file("root.adoc", "include::parts/a.adoc[]\n")
        .with_file("parts/a.adoc", "From a.\n\ninclude::b.adoc[]\n")
        .with_file("parts/b.adoc", "From b.\n");
    let options = Options::builder().with_provider(Arc::new(provider)).build();
    let document = parse_file("root.adoc", &options)?;
    assert_eq!(paragraph_texts(&document.elements), vec!["From a.", "From b."]);
    let depths: Vec<usize> = document.includes.iter().map(|included| included.depth).collect();
    assert_eq!(depths, vec![1, 2]);
    Ok(())
}

#[test]
fn test_include_depth_is_bounded() -> Result<(), Error> {
    let provider = InMemory::new().with_file("loop.adoc", "Again.\n\ninclude::loop.adoc[]\n");
    let options = Options::builder()
        .with_provider(Arc::new(provider))
        .with_max_include_depth(3)
        .build();
    let document = parse_file("loop.adoc", &options)?;
    assert_eq!(document.includes.len(), 3);
    let texts = paragraph_texts(&document.elements);
    assert_eq!(texts.iter().filter(|text| *text == "Again.").count(), 4);
    assert_eq!(texts.last().map(String::as_str), Some("include::loop.adoc[]"));

    let attribute = Options::builder()
        .with_provider(Arc::new(InMemory::new().with_file("loop.adoc", "Again.\n\ninclude::loop.adoc[]\n")))
        .with_attribute("max-include-depth", "1")
        .build();
    let document = parse_file("loop.adoc", &attribute)?;
    assert_eq!(document.includes.len(), 1);
    Ok(())
}

#[test]
fn test_absolute_and_relative_leveloffset() -> Result<(), Error> {
    let provider = InMemory::new()
        .with_file("main.adoc", "= Main\n\ninclude::part.adoc[leveloffset=2]\n\ninclude::part.adoc[leveloffset=+1]\n\n== After\n")
        .with_file("part.adoc", "= Part\n");
    let options = Options::builder().with_provider(Arc::new(provider)).build();
    let document = parse_file("main.adoc", &options)?;
    let levels: Vec<u8> = document.sections().iter().map(|section| section.level).collect();
    assert_eq!(levels, vec![0, 2, 1, 1]);
    Ok(())
}
