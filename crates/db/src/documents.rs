//! Mapping between domain types and stored documents.

use std::fmt::{Debug, Display};
use std::hash::Hash;

use onair_core::ids::{
    AdLibPieceId, PartId, PartInstanceId, PieceId, PieceInstanceId, PlaylistId, RundownId,
    SegmentId, StudioId,
};
use onair_core::instance::{PartInstance, PieceInstance};
use onair_core::playlist::RundownPlaylist;
use onair_core::rundown::{AdLibPiece, Part, Piece, Rundown, Segment};
use onair_core::timeline::TimelineComplete;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::store::{Collection, StoredDocument};

/// A domain type persisted as one document.
pub trait Document:
    Debug + Clone + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static
{
    type Id: Debug + Clone + Ord + Hash + Display + Send + Sync;

    const COLLECTION: Collection;

    fn id(&self) -> &Self::Id;

    /// Key that scopes loads: studio, playlist or rundown.
    fn partition_key(&self) -> String;

    /// Soft-deleted documents are skipped by default loads.
    fn is_archived(&self) -> bool {
        false
    }

    fn to_stored(&self) -> Result<StoredDocument, serde_json::Error> {
        Ok(StoredDocument {
            id: self.id().to_string(),
            partition_key: self.partition_key(),
            archived: self.is_archived(),
            body: serde_json::to_value(self)?,
        })
    }

    fn from_stored(document: StoredDocument) -> Result<Self, serde_json::Error> {
        serde_json::from_value(document.body)
    }
}

macro_rules! impl_document {
    ($ty:ty, $id:ty, $collection:expr, |$doc:ident| $partition:expr) => {
        impl Document for $ty {
            type Id = $id;

            const COLLECTION: Collection = $collection;

            fn id(&self) -> &Self::Id {
                &self.id
            }

            fn partition_key(&self) -> String {
                let $doc = self;
                $partition.to_string()
            }
        }
    };
}

impl_document!(RundownPlaylist, PlaylistId, Collection::Playlists, |d| d.studio_id);
impl_document!(Rundown, RundownId, Collection::Rundowns, |d| d.playlist_id);
impl_document!(Segment, SegmentId, Collection::Segments, |d| d.rundown_id);
impl_document!(Part, PartId, Collection::Parts, |d| d.rundown_id);
impl_document!(Piece, PieceId, Collection::Pieces, |d| d.rundown_id);
impl_document!(AdLibPiece, AdLibPieceId, Collection::AdLibPieces, |d| d.rundown_id);
impl_document!(TimelineComplete, StudioId, Collection::Timelines, |d| d.id);

impl Document for PartInstance {
    type Id = PartInstanceId;

    const COLLECTION: Collection = Collection::PartInstances;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn partition_key(&self) -> String {
        self.rundown_id.to_string()
    }

    fn is_archived(&self) -> bool {
        self.is_reset()
    }
}

impl Document for PieceInstance {
    type Id = PieceInstanceId;

    const COLLECTION: Collection = Collection::PieceInstances;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn partition_key(&self) -> String {
        self.rundown_id.to_string()
    }

    fn is_archived(&self) -> bool {
        self.reset
    }
}
