//! Typed, dirty-tracking sub-collections of the versioned cache.

use std::collections::BTreeMap;

use crate::documents::Document;
use crate::store::WriteOp;

/// In-memory copy of one collection's documents for the duration of a job.
///
/// Keeps the documents as loaded next to the working set, so the flush
/// writes exactly what changed.
#[derive(Debug, Clone)]
pub struct CacheCollection<T: Document> {
    documents: BTreeMap<T::Id, T>,
    original: BTreeMap<T::Id, T>,
}

impl<T: Document> Default for CacheCollection<T> {
    fn default() -> Self {
        Self {
            documents: BTreeMap::new(),
            original: BTreeMap::new(),
        }
    }
}

impl<T: Document> CacheCollection<T> {
    pub fn from_documents(documents: impl IntoIterator<Item = T>) -> Self {
        let documents: BTreeMap<T::Id, T> = documents
            .into_iter()
            .map(|doc| (doc.id().clone(), doc))
            .collect();
        Self {
            original: documents.clone(),
            documents,
        }
    }

    pub fn find_one(&self, id: &T::Id) -> Option<&T> {
        self.documents.get(id)
    }

    /// Copies of every document matching `selector`, in id order.
    pub fn find_fetch(&self, selector: impl Fn(&T) -> bool) -> Vec<T> {
        self.documents
            .values()
            .filter(|doc| selector(doc))
            .cloned()
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.documents.values()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Insert or replace a document. Returns its id.
    pub fn insert(&mut self, doc: T) -> T::Id {
        let id = doc.id().clone();
        self.documents.insert(id.clone(), doc);
        id
    }

    /// Apply `modifier` to the document with `id`. Returns `false` when
    /// there is no such document. The modifier must not change the id.
    pub fn update(&mut self, id: &T::Id, modifier: impl FnOnce(&mut T)) -> bool {
        match self.documents.get_mut(id) {
            Some(doc) => {
                modifier(doc);
                debug_assert!(doc.id() == id, "cache modifier changed a document id");
                true
            }
            None => false,
        }
    }

    /// Apply `modifier` to every document matching `selector`. Returns how
    /// many were visited.
    pub fn update_where(
        &mut self,
        selector: impl Fn(&T) -> bool,
        mut modifier: impl FnMut(&mut T),
    ) -> usize {
        let mut count = 0;
        for doc in self.documents.values_mut().filter(|doc| selector(doc)) {
            modifier(doc);
            count += 1;
        }
        count
    }

    /// Remove every document matching `selector`. Returns the removed ids.
    pub fn remove(&mut self, selector: impl Fn(&T) -> bool) -> Vec<T::Id> {
        let ids: Vec<T::Id> = self
            .documents
            .iter()
            .filter(|(_, doc)| selector(doc))
            .map(|(id, _)| id.clone())
            .collect();
        for id in &ids {
            self.documents.remove(id);
        }
        ids
    }

    pub fn remove_by_id(&mut self, id: &T::Id) -> Option<T> {
        self.documents.remove(id)
    }

    pub fn is_dirty(&self) -> bool {
        self.documents != self.original
    }

    /// The minimal set of writes turning the loaded state into the
    /// current one.
    pub fn pending_writes(&self) -> Result<Vec<WriteOp>, serde_json::Error> {
        let mut ops = Vec::new();
        for (id, doc) in &self.documents {
            if self.original.get(id) != Some(doc) {
                ops.push(WriteOp::Upsert {
                    collection: T::COLLECTION,
                    document: doc.to_stored()?,
                });
            }
        }
        for id in self.original.keys() {
            if !self.documents.contains_key(id) {
                ops.push(WriteOp::Delete {
                    collection: T::COLLECTION,
                    id: id.to_string(),
                });
            }
        }
        Ok(ops)
    }

    /// Treat the current state as persisted.
    pub fn mark_saved(&mut self) {
        self.original = self.documents.clone();
    }
}

// ---------------------------------------------------------------------------
// Single document
// ---------------------------------------------------------------------------

/// A single tracked document that must exist for the whole job.
#[derive(Debug, Clone)]
pub struct CacheObject<T: Document> {
    current: T,
    original: T,
}

impl<T: Document> CacheObject<T> {
    pub fn new(doc: T) -> Self {
        Self {
            original: doc.clone(),
            current: doc,
        }
    }

    pub fn get(&self) -> &T {
        &self.current
    }

    pub fn update(&mut self, modifier: impl FnOnce(&mut T)) {
        modifier(&mut self.current);
    }

    pub fn is_dirty(&self) -> bool {
        self.current != self.original
    }

    pub fn pending_writes(&self) -> Result<Vec<WriteOp>, serde_json::Error> {
        if !self.is_dirty() {
            return Ok(Vec::new());
        }
        Ok(vec![WriteOp::Upsert {
            collection: T::COLLECTION,
            document: self.current.to_stored()?,
        }])
    }

    pub fn mark_saved(&mut self) {
        self.original = self.current.clone();
    }
}

#[cfg(test)]
mod tests {
    use onair_core::ids::{PartId, RundownId, SegmentId};
    use onair_core::rundown::Part;

    use super::*;

    fn part(id: &str, rank: f64) -> Part {
        Part {
            id: PartId::new(id),
            rundown_id: RundownId::new("r1"),
            segment_id: SegmentId::new("s1"),
            external_id: id.into(),
            title: id.into(),
            rank,
            expected_duration: None,
            auto_next: false,
            auto_next_overlap: 0,
            invalid: false,
            floated: false,
        }
    }

    #[test]
    fn untouched_collection_has_no_writes() {
        let cache = CacheCollection::from_documents(vec![part("a", 0.0), part("b", 1.0)]);
        assert!(!cache.is_dirty());
        assert!(cache.pending_writes().unwrap().is_empty());
    }

    #[test]
    fn diff_contains_only_changes() {
        let mut cache = CacheCollection::from_documents(vec![part("a", 0.0), part("b", 1.0)]);
        cache.update(&PartId::new("a"), |p| p.rank = 5.0);
        cache.insert(part("c", 2.0));
        cache.remove(|p| p.id.as_str() == "b");

        let ops = cache.pending_writes().unwrap();
        assert_eq!(ops.len(), 3);
        let upserts: Vec<&str> = ops
            .iter()
            .filter_map(|op| match op {
                WriteOp::Upsert { document, .. } => Some(document.id.as_str()),
                WriteOp::Delete { .. } => None,
            })
            .collect();
        assert_eq!(upserts, ["a", "c"]);
        assert!(ops
            .iter()
            .any(|op| matches!(op, WriteOp::Delete { id, .. } if id == "b")));
    }

    #[test]
    fn update_to_identical_value_is_not_a_write() {
        let mut cache = CacheCollection::from_documents(vec![part("a", 0.0)]);
        cache.update(&PartId::new("a"), |p| p.rank = 0.0);
        assert!(!cache.is_dirty());
    }

    #[test]
    fn mark_saved_clears_dirty_state() {
        let mut cache = CacheCollection::from_documents(vec![part("a", 0.0)]);
        cache.update(&PartId::new("a"), |p| p.title = "changed".into());
        assert!(cache.is_dirty());
        cache.mark_saved();
        assert!(!cache.is_dirty());
    }

    #[test]
    fn find_fetch_and_update_where() {
        let mut cache = CacheCollection::from_documents(vec![part("a", 0.0), part("b", 1.0)]);
        assert_eq!(cache.find_fetch(|p| p.rank > 0.5).len(), 1);
        assert_eq!(cache.update_where(|_| true, |p| p.invalid = true), 2);
        assert!(cache.iter().all(|p| p.invalid));
        assert!(!cache.update(&PartId::new("missing"), |_| {}));
    }
}
