//! The document store seam.
//!
//! Documents are JSON bodies grouped into collections. Each carries a
//! partition key (the playlist, rundown or studio that scopes it) and an
//! `archived` flag mirroring soft-deletion, so loads can skip history.

use async_trait::async_trait;

// ---------------------------------------------------------------------------
// Collections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Collection {
    Playlists,
    Rundowns,
    Segments,
    Parts,
    Pieces,
    AdLibPieces,
    PartInstances,
    PieceInstances,
    Timelines,
}

impl Collection {
    pub const ALL: [Collection; 9] = [
        Self::Playlists,
        Self::Rundowns,
        Self::Segments,
        Self::Parts,
        Self::Pieces,
        Self::AdLibPieces,
        Self::PartInstances,
        Self::PieceInstances,
        Self::Timelines,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Playlists => "playlists",
            Self::Rundowns => "rundowns",
            Self::Segments => "segments",
            Self::Parts => "parts",
            Self::Pieces => "pieces",
            Self::AdLibPieces => "adlib_pieces",
            Self::PartInstances => "part_instances",
            Self::PieceInstances => "piece_instances",
            Self::Timelines => "timelines",
        }
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Documents and writes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub id: String,
    pub partition_key: String,
    pub archived: bool,
    pub body: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    Upsert {
        collection: Collection,
        document: StoredDocument,
    },
    Delete {
        collection: Collection,
        id: String,
    },
}

impl WriteOp {
    pub fn collection(&self) -> Collection {
        match self {
            Self::Upsert { collection, .. } | Self::Delete { collection, .. } => *collection,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchivedFilter {
    Exclude,
    Include,
    Only,
}

impl ArchivedFilter {
    pub fn matches(self, archived: bool) -> bool {
        match self {
            Self::Exclude => !archived,
            Self::Include => true,
            Self::Only => archived,
        }
    }
}

/// Selects documents of one collection.
#[derive(Debug, Clone)]
pub struct DocumentQuery {
    pub collection: Collection,
    /// `None` selects every partition.
    pub partitions: Option<Vec<String>>,
    pub archived: ArchivedFilter,
}

impl DocumentQuery {
    /// Live documents in the given partitions.
    pub fn live(collection: Collection, partitions: Vec<String>) -> Self {
        Self {
            collection,
            partitions: Some(partitions),
            archived: ArchivedFilter::Exclude,
        }
    }

    pub fn all(collection: Collection) -> Self {
        Self {
            collection,
            partitions: None,
            archived: ArchivedFilter::Include,
        }
    }

    pub fn archived(mut self, filter: ArchivedFilter) -> Self {
        self.archived = filter;
        self
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Persistence engine seam.
///
/// `commit` applies every operation or none of them.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn find(&self, query: &DocumentQuery) -> Result<Vec<StoredDocument>, StoreError>;

    async fn get(
        &self,
        collection: Collection,
        id: &str,
    ) -> Result<Option<StoredDocument>, StoreError>;

    async fn commit(&self, ops: Vec<WriteOp>) -> Result<(), StoreError>;
}
