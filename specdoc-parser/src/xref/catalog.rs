use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::{
    Diagnostics,
    model::{Element, SourceLocation},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    Section,
    /// A block carrying an explicit ID.
    Block,
    /// An inline `[[id]]` or `anchor:id[]`.
    Anchor,
}

/// Something a cross-reference can point at.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CatalogEntry {
    pub id: String,
    pub kind: TargetKind,
    /// The section or block title, with any cross-references in it unresolved.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub title: Vec<Element>,
    /// Preferred link text, from a `reftext` attribute or an anchor label.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub reftext: Vec<Element>,
    pub location: SourceLocation,
}

/// Every ID in a document, in document order, indexed by ID, by title and by
/// reference text.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
    #[serde(skip)]
    by_id: FxHashMap<String, usize>,
    #[serde(skip)]
    by_title: FxHashMap<String, usize>,
    #[serde(skip)]
    by_reftext: FxHashMap<String, usize>,
}

impl Catalog {
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&CatalogEntry> {
        self.by_id.get(id).and_then(|index| self.entries.get(*index))
    }

    /// Looks `reference` up as an ID, then as a title, then as reference text. The
    /// first entry in document order wins when titles repeat.
    #[must_use]
    pub fn find(&self, reference: &str) -> Option<&CatalogEntry> {
        self.by_id
            .get(reference)
            .or_else(|| self.by_title.get(reference))
            .or_else(|| self.by_reftext.get(reference))
            .and_then(|index| self.entries.get(*index))
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.by_id.contains_key(id)
    }

    pub fn entries(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.entries.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Adds `entry` under its ID and the given title and reference text keys. A
    /// repeated ID is reported and the entry dropped; the first definition stays.
    pub(crate) fn insert(
        &mut self,
        entry: CatalogEntry,
        title_key: &str,
        reftext_key: &str,
        diagnostics: &mut Diagnostics,
    ) -> bool {
        if self.by_id.contains_key(&entry.id) {
            diagnostics.warn(
                Some(&entry.location),
                format!("duplicate id '{}', keeping the first definition", entry.id),
            );
            return false;
        }
        let index = self.entries.len();
        self.by_id.insert(entry.id.clone(), index);
        if !title_key.is_empty() {
            self.by_title.entry(title_key.to_string()).or_insert(index);
        }
        if !reftext_key.is_empty() {
            self.by_reftext.entry(reftext_key.to_string()).or_insert(index);
        }
        self.entries.push(entry);
        true
    }
}
