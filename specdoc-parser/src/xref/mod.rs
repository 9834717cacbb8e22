//! Cross-reference resolution.
//!
//! Runs after parsing, over the finished tree. The first walk collects every ID and
//! title into a [`Catalog`] (assigning section IDs on the way); the second fills in
//! [`CrossReference::resolution`] for every reference. Nothing else in the tree is
//! touched, and running the pass again gives the same result.
use std::path::{Path, PathBuf};

use crate::{
    Diagnostics, Options,
    inlines::Output,
    model::{
        CrossReference, Document, Element, IncludedFile, ReferenceTarget, Resolution,
        SourceLocation, to_plain_text, walk_mut,
    },
};

mod catalog;
mod id;

pub use catalog::{Catalog, CatalogEntry, TargetKind};
pub(crate) use id::IdRules;

/// Builds `document`'s catalog and resolves every cross-reference in it.
#[tracing::instrument(level = "debug", skip_all, fields(path = ?document.path))]
pub fn resolve(document: &mut Document, options: &Options) {
    let mut diagnostics = Diagnostics::new();
    let catalog = build_catalog(&mut document.elements, &mut diagnostics);
    tracing::debug!(entries = catalog.len(), "catalog built");

    let resolver = Resolver {
        catalog: &catalog,
        document: DocumentInfo::new(document),
        includes: &document.includes,
    };
    walk_mut(&mut document.elements, &mut |element| {
        if let Element::CrossReference(xref) = element {
            let resolution = resolver.resolve(xref);
            if options.verbose && resolution.target == ReferenceTarget::Unresolved {
                diagnostics.warn(
                    Some(&xref.location),
                    format!("possible invalid reference: {}", xref.id),
                );
            }
            xref.resolution = Some(resolution);
        }
    });

    document.catalog = catalog;
    document.diagnostics.extend(diagnostics.into_entries());
}

/// Plain text of `elements` with every cross-reference shown as written. Titles are
/// keyed by this so a second pass over a resolved tree sees the same keys.
fn key_text(elements: &[Element]) -> String {
    let mut elements = elements.to_vec();
    strip_resolutions(&mut elements);
    to_plain_text(&elements).trim().to_string()
}

fn strip_resolutions(elements: &mut [Element]) {
    walk_mut(elements, &mut |element| {
        if let Element::CrossReference(xref) = element {
            xref.resolution = None;
        }
    });
}

fn without_resolutions(elements: &[Element]) -> Vec<Element> {
    let mut elements = elements.to_vec();
    strip_resolutions(&mut elements);
    elements
}

#[tracing::instrument(level = "trace", skip_all)]
fn build_catalog(elements: &mut [Element], diagnostics: &mut Diagnostics) -> Catalog {
    let mut catalog = Catalog::default();
    walk_mut(elements, &mut |element| {
        let reftext = reftext_of(element);
        let reftext_key = key_text(&reftext);
        if let Element::Section(section) = element {
            let title_key = key_text(&section.title);
            let mut ids: Vec<String> = section.attributes.ids().map(str::to_string).collect();
            if ids.is_empty()
                && let Some(generated) = &section.generated_id
            {
                ids.push(unique_id(&catalog, generated, &section.location, diagnostics));
            }
            section.id = ids.first().cloned();
            let title = without_resolutions(&section.title);
            for id in ids {
                catalog.insert(
                    CatalogEntry {
                        id,
                        kind: TargetKind::Section,
                        title: title.clone(),
                        reftext: reftext.clone(),
                        location: section.location.clone(),
                    },
                    &title_key,
                    &reftext_key,
                    diagnostics,
                );
            }
        } else if let Element::Anchor(anchor) = element {
            catalog.insert(
                CatalogEntry {
                    id: anchor.id.clone(),
                    kind: TargetKind::Anchor,
                    title: Vec::new(),
                    reftext: without_resolutions(&anchor.label),
                    location: anchor.location.clone(),
                },
                "",
                &key_text(&anchor.label),
                diagnostics,
            );
        } else if let Some(attributes) = element.attributes() {
            let title = attributes.title().map(without_resolutions).unwrap_or_default();
            let title_key = key_text(&title);
            let location = element.location().cloned().unwrap_or_default();
            for id in attributes.ids() {
                catalog.insert(
                    CatalogEntry {
                        id: id.to_string(),
                        kind: TargetKind::Block,
                        title: title.clone(),
                        reftext: reftext.clone(),
                        location: location.clone(),
                    },
                    &title_key,
                    &reftext_key,
                    diagnostics,
                );
            }
        }
    });
    catalog
}

/// `base`, or `base_2`, `base_3`, ... when `base` is already taken.
fn unique_id(
    catalog: &Catalog,
    base: &str,
    location: &SourceLocation,
    diagnostics: &mut Diagnostics,
) -> String {
    if !catalog.contains(base) {
        return base.to_string();
    }
    let id = (2..)
        .map(|n| format!("{base}_{n}"))
        .find(|candidate| !catalog.contains(candidate))
        .unwrap_or_default();
    diagnostics.debug(
        Some(location),
        format!("generated id '{base}' is already in use, using '{id}'"),
    );
    id
}

/// A `reftext` attribute, else the label of a `[[id,label]]` anchor line.
fn reftext_of(element: &Element) -> Vec<Element> {
    let Some(attributes) = element.attributes() else {
        return Vec::new();
    };
    if let Some(reftext) = attributes.get("reftext") {
        return vec![Element::String(reftext.to_string())];
    }
    attributes
        .anchor_label()
        .map(without_resolutions)
        .unwrap_or_default()
}

/// What a reference to the document itself needs.
struct DocumentInfo {
    path: Option<PathBuf>,
    reftext: Option<String>,
    title: Vec<Element>,
}

impl DocumentInfo {
    fn new(document: &Document) -> Self {
        let title = match document.attributes.get("doctitle") {
            Some(doctitle) => vec![Element::String(doctitle.to_string())],
            None => document.title().map(without_resolutions).unwrap_or_default(),
        };
        Self {
            path: document.path.clone(),
            reftext: document.attributes.get("reftext").map(str::to_string),
            title,
        }
    }
}

struct Resolver<'a> {
    catalog: &'a Catalog,
    document: DocumentInfo,
    includes: &'a [IncludedFile],
}

/// Where a `path#fragment` reference points.
enum Destination<'a> {
    ThisDocument,
    Included(&'a IncludedFile),
    Elsewhere,
}

impl Resolver<'_> {
    fn resolve(&self, xref: &CrossReference) -> Resolution {
        let explicit = without_resolutions(&xref.elements);
        let mut visited = Vec::new();
        let Some((path, fragment)) = split_document_target(&xref.id) else {
            return self.internal(&xref.id, explicit, &mut visited);
        };

        match self.destination(path) {
            Destination::ThisDocument if fragment.is_empty() => Resolution {
                target: ReferenceTarget::Document,
                text: self.document_text(explicit, &xref.id),
            },
            Destination::ThisDocument => self.internal(fragment, explicit, &mut visited),
            Destination::Included(included) if !fragment.is_empty() => {
                match self.catalog.get(fragment) {
                    Some(entry) if entry.location.file.as_deref() == Some(included.path.as_path()) => {
                        self.internal(fragment, explicit, &mut visited)
                    }
                    Some(_) | None => external(&xref.id, path, fragment, explicit),
                }
            }
            Destination::Included(_) | Destination::Elsewhere => {
                external(&xref.id, path, fragment, explicit)
            }
        }
    }

    fn destination(&self, path: &str) -> Destination<'_> {
        if path.is_empty() {
            return Destination::ThisDocument;
        }
        let candidate = Path::new(path);
        let candidate = if candidate.extension().is_some() {
            candidate.to_path_buf()
        } else {
            candidate.with_extension("adoc")
        };
        let candidate = crate::source::normalize(&candidate);
        if self
            .document
            .path
            .as_ref()
            .is_some_and(|own| own.ends_with(&candidate))
        {
            return Destination::ThisDocument;
        }
        self.includes
            .iter()
            .find(|included| included.path.ends_with(&candidate))
            .map_or(Destination::Elsewhere, Destination::Included)
    }

    fn internal(&self, reference: &str, explicit: Vec<Element>, visited: &mut Vec<String>) -> Resolution {
        let Some(entry) = self.catalog.find(reference) else {
            let text = if explicit.is_empty() {
                placeholder(reference)
            } else {
                explicit
            };
            return Resolution {
                target: ReferenceTarget::Unresolved,
                text,
            };
        };
        let text = if explicit.is_empty() {
            visited.push(entry.id.clone());
            self.entry_text(entry, visited)
        } else {
            explicit
        };
        Resolution {
            target: ReferenceTarget::Internal {
                id: entry.id.clone(),
            },
            text,
        }
    }

    /// Link text for `entry`: its reference text, else its title, else its ID in
    /// brackets.
    fn entry_text(&self, entry: &CatalogEntry, visited: &mut Vec<String>) -> Vec<Element> {
        let source = if entry.reftext.is_empty() {
            &entry.title
        } else {
            &entry.reftext
        };
        let text = self.render(source, visited);
        if text.is_empty() {
            return placeholder(&entry.id);
        }
        text
    }

    /// Copies title content into link text. Nested references become their own link
    /// text; one naming a target already on the current path stays as written.
    fn render(&self, elements: &[Element], visited: &mut Vec<String>) -> Vec<Element> {
        let mut out = Output::default();
        for element in elements {
            if let Element::CrossReference(nested) = element {
                for text in self.nested_text(nested, visited) {
                    out.push(text);
                }
            } else if !matches!(element, Element::Anchor(_)) {
                let mut copy = element.clone();
                for children in copy.children_mut() {
                    *children = self.render(children, visited);
                }
                out.push(copy);
            }
        }
        out.finish()
    }

    fn nested_text(&self, nested: &CrossReference, visited: &mut Vec<String>) -> Vec<Element> {
        if !nested.elements.is_empty() {
            return self.render(&nested.elements, visited);
        }
        let target = split_document_target(&nested.id).map_or(nested.id.as_str(), |(_, fragment)| fragment);
        match self.catalog.find(target) {
            Some(entry) if visited.contains(&entry.id) => {
                tracing::trace!(id = %entry.id, "circular reference, keeping source text");
                vec![Element::String(nested.source_text())]
            }
            Some(entry) => {
                visited.push(entry.id.clone());
                let text = self.entry_text(entry, visited);
                visited.pop();
                text
            }
            None => placeholder(&nested.id),
        }
    }

    fn document_text(&self, explicit: Vec<Element>, id: &str) -> Vec<Element> {
        if !explicit.is_empty() {
            return explicit;
        }
        if let Some(reftext) = &self.document.reftext {
            return vec![Element::String(reftext.clone())];
        }
        let title = self.render(&self.document.title, &mut Vec::new());
        if title.is_empty() {
            return placeholder(id);
        }
        title
    }
}

/// Splits `path#fragment`, and a bare `other.adoc` as a reference to a whole
/// document. Plain IDs give `None`.
fn split_document_target(id: &str) -> Option<(&str, &str)> {
    match id.split_once('#') {
        Some(split) => Some(split),
        None => Path::new(id)
            .extension()
            .is_some_and(|extension| extension == "adoc")
            .then_some((id, "")),
    }
}

fn external(id: &str, path: &str, fragment: &str, explicit: Vec<Element>) -> Resolution {
    let text = if explicit.is_empty() {
        vec![Element::String(id.to_string())]
    } else {
        explicit
    };
    Resolution {
        target: ReferenceTarget::External {
            path: path.to_string(),
            fragment: (!fragment.is_empty()).then(|| fragment.to_string()),
        },
        text,
    }
}

fn placeholder(id: &str) -> Vec<Element> {
    vec![Element::String(format!("[{id}]"))]
}
