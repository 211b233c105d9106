//! Versioned cache: a private, per-job copy of everything one job touches.
//!
//! A job loads a cache under its lock, mutates the in-memory copies only,
//! and ends with [`PlayoutCache::save`] (or [`StudioCache::save`]). The
//! save diffs every sub-collection against what was loaded and commits all
//! writes in one atomic store call. A failed save leaves the store as it
//! was before the job.

mod collection;
mod playout;
mod studio;

pub use collection::{CacheCollection, CacheObject};
pub use playout::PlayoutCache;
pub use studio::StudioCache;

use onair_core::ids::{PlaylistId, StudioId};

use crate::documents::Document;
use crate::store::{Collection, DocumentQuery, DocumentStore, StoreError, WriteOp};

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Playlist not found: {0}")]
    PlaylistNotFound(PlaylistId),

    #[error("Failed to decode {collection} document {id}: {source}")]
    Decode {
        collection: Collection,
        id: String,
        source: serde_json::Error,
    },

    #[error("Failed to encode document: {0}")]
    Encode(#[from] serde_json::Error),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// What a save wrote.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SaveSummary {
    pub writes: usize,
    pub collections: Vec<Collection>,
}

impl SaveSummary {
    pub fn is_empty(&self) -> bool {
        self.writes == 0
    }

    pub fn touched(&self, collection: Collection) -> bool {
        self.collections.contains(&collection)
    }
}

/// Load and decode documents matching `query`.
pub async fn fetch<T: Document>(
    store: &dyn DocumentStore,
    query: DocumentQuery,
) -> Result<Vec<T>, CacheError> {
    store
        .find(&query)
        .await?
        .into_iter()
        .map(decode::<T>)
        .collect()
}

/// Decode one document by id.
pub async fn fetch_one<T: Document>(
    store: &dyn DocumentStore,
    id: &str,
) -> Result<Option<T>, CacheError> {
    store
        .get(T::COLLECTION, id)
        .await?
        .map(decode::<T>)
        .transpose()
}

fn decode<T: Document>(document: crate::store::StoredDocument) -> Result<T, CacheError> {
    let id = document.id.clone();
    T::from_stored(document).map_err(|source| CacheError::Decode {
        collection: T::COLLECTION,
        id,
        source,
    })
}

/// Commit `ops` and summarise them. Nothing is written when `ops` is empty.
pub(crate) async fn commit(
    store: &dyn DocumentStore,
    ops: Vec<WriteOp>,
) -> Result<SaveSummary, CacheError> {
    if ops.is_empty() {
        return Ok(SaveSummary::default());
    }
    let mut collections: Vec<Collection> = ops.iter().map(WriteOp::collection).collect();
    collections.sort_unstable();
    collections.dedup();
    let writes = ops.len();

    store.commit(ops).await?;
    Ok(SaveSummary {
        writes,
        collections,
    })
}

/// Partition keys of a studio's playlists.
pub(crate) fn studio_partition(studio_id: &StudioId) -> Vec<String> {
    vec![studio_id.to_string()]
}
