//! In-memory [`DocumentStore`] used by tests and local tooling.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::store::{Collection, DocumentQuery, DocumentStore, StoreError, StoredDocument, WriteOp};

type Key = (Collection, String);

/// Map-backed store. A commit is applied under one write lock, so readers
/// see all of it or none of it.
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    documents: RwLock<BTreeMap<Key, StoredDocument>>,
    fail_next_commit: AtomicBool,
    commits: AtomicUsize,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `commit` fail without applying anything.
    pub fn fail_next_commit(&self) {
        self.fail_next_commit.store(true, Ordering::SeqCst);
    }

    /// Number of successful commits so far.
    pub fn commit_count(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }

    /// Every document of a collection, archived included.
    pub async fn documents(&self, collection: Collection) -> Vec<StoredDocument> {
        self.documents
            .read()
            .await
            .iter()
            .filter(|((c, _), _)| *c == collection)
            .map(|(_, doc)| doc.clone())
            .collect()
    }

    /// Insert documents directly, bypassing commit accounting.
    pub async fn seed(&self, collection: Collection, documents: Vec<StoredDocument>) {
        let mut map = self.documents.write().await;
        for doc in documents {
            map.insert((collection, doc.id.clone()), doc);
        }
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn find(&self, query: &DocumentQuery) -> Result<Vec<StoredDocument>, StoreError> {
        let map = self.documents.read().await;
        Ok(map
            .iter()
            .filter(|((collection, _), doc)| {
                *collection == query.collection
                    && query.archived.matches(doc.archived)
                    && query
                        .partitions
                        .as_ref()
                        .map_or(true, |keys| keys.contains(&doc.partition_key))
            })
            .map(|(_, doc)| doc.clone())
            .collect())
    }

    async fn get(
        &self,
        collection: Collection,
        id: &str,
    ) -> Result<Option<StoredDocument>, StoreError> {
        Ok(self
            .documents
            .read()
            .await
            .get(&(collection, id.to_string()))
            .cloned())
    }

    async fn commit(&self, ops: Vec<WriteOp>) -> Result<(), StoreError> {
        if self.fail_next_commit.swap(false, Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected commit failure".into()));
        }

        let mut map = self.documents.write().await;
        for op in ops {
            match op {
                WriteOp::Upsert {
                    collection,
                    document,
                } => {
                    map.insert((collection, document.id.clone()), document);
                }
                WriteOp::Delete { collection, id } => {
                    map.remove(&(collection, id));
                }
            }
        }
        self.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
