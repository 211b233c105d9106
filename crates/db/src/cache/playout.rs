//! Cache of one playlist's playout state.

use onair_core::ids::{PartInstanceId, PlaylistId, RundownId, StudioId};
use onair_core::instance::{PartInstance, PieceInstance};
use onair_core::ordering::RunningOrder;
use onair_core::playlist::RundownPlaylist;
use onair_core::rundown::{AdLibPiece, Part, Piece, Rundown, Segment};
use onair_core::timeline::TimelineComplete;

use super::{commit, fetch, fetch_one, studio_partition, CacheCollection, CacheError, CacheObject, SaveSummary};
use crate::store::{Collection, DocumentQuery, DocumentStore, WriteOp};

/// Everything a playout job on one playlist reads or writes.
///
/// Reset instances are not loaded: they are history and no selector may
/// see them.
#[derive(Debug, Clone)]
pub struct PlayoutCache {
    pub playlist_id: PlaylistId,
    pub studio_id: StudioId,
    pub playlist: CacheObject<RundownPlaylist>,
    pub rundowns: CacheCollection<Rundown>,
    pub segments: CacheCollection<Segment>,
    pub parts: CacheCollection<Part>,
    pub pieces: CacheCollection<Piece>,
    pub adlib_pieces: CacheCollection<AdLibPiece>,
    pub part_instances: CacheCollection<PartInstance>,
    pub piece_instances: CacheCollection<PieceInstance>,
    /// The studio timeline. Holds at most one document.
    pub timeline: CacheCollection<TimelineComplete>,
    /// The studio's other playlists, as loaded. Read-only.
    pub studio_playlists: Vec<RundownPlaylist>,
}

impl PlayoutCache {
    pub async fn load(
        store: &dyn DocumentStore,
        playlist_id: &PlaylistId,
    ) -> Result<Self, CacheError> {
        let playlist: RundownPlaylist = fetch_one(store, playlist_id.as_str())
            .await?
            .ok_or_else(|| CacheError::PlaylistNotFound(playlist_id.clone()))?;
        let studio_id = playlist.studio_id.clone();

        let studio_playlists: Vec<RundownPlaylist> = fetch::<RundownPlaylist>(
            store,
            DocumentQuery::live(Collection::Playlists, studio_partition(&studio_id)),
        )
        .await?
        .into_iter()
        .filter(|p| p.id != *playlist_id)
        .collect();

        let rundowns: Vec<Rundown> = fetch(
            store,
            DocumentQuery::live(Collection::Rundowns, vec![playlist_id.to_string()]),
        )
        .await?;
        let rundown_keys: Vec<String> = rundowns.iter().map(|r| r.id.to_string()).collect();
        let scoped = |collection| DocumentQuery::live(collection, rundown_keys.clone());

        let segments: Vec<Segment> = fetch(store, scoped(Collection::Segments)).await?;
        let parts: Vec<Part> = fetch(store, scoped(Collection::Parts)).await?;
        let pieces: Vec<Piece> = fetch(store, scoped(Collection::Pieces)).await?;
        let adlib_pieces: Vec<AdLibPiece> = fetch(store, scoped(Collection::AdLibPieces)).await?;
        let part_instances: Vec<PartInstance> = fetch(store, scoped(Collection::PartInstances)).await?;
        let piece_instances: Vec<PieceInstance> = fetch(store, scoped(Collection::PieceInstances)).await?;
        let timeline: Option<TimelineComplete> = fetch_one(store, studio_id.as_str()).await?;

        tracing::debug!(
            playlist_id = %playlist_id,
            rundowns = rundowns.len(),
            part_instances = part_instances.len(),
            "Loaded playout cache"
        );

        Ok(Self {
            playlist_id: playlist_id.clone(),
            studio_id,
            playlist: CacheObject::new(playlist),
            rundowns: CacheCollection::from_documents(rundowns),
            segments: CacheCollection::from_documents(segments),
            parts: CacheCollection::from_documents(parts),
            pieces: CacheCollection::from_documents(pieces),
            adlib_pieces: CacheCollection::from_documents(adlib_pieces),
            part_instances: CacheCollection::from_documents(part_instances),
            piece_instances: CacheCollection::from_documents(piece_instances),
            timeline: CacheCollection::from_documents(timeline),
            studio_playlists,
        })
    }

    pub fn playlist(&self) -> &RundownPlaylist {
        self.playlist.get()
    }

    pub fn update_playlist(&mut self, modifier: impl FnOnce(&mut RundownPlaylist)) {
        self.playlist.update(modifier);
    }

    pub fn rundown_ids(&self) -> &[RundownId] {
        &self.playlist().rundown_ids
    }

    pub fn running_order(&self) -> RunningOrder {
        RunningOrder::new(self.rundown_ids(), self.segments.iter())
    }

    /// Every part of the playlist in running order.
    pub fn ordered_parts(&self) -> Vec<&Part> {
        self.running_order().sort_parts(self.parts.iter())
    }

    pub fn part_instance(&self, id: Option<&PartInstanceId>) -> Option<&PartInstance> {
        id.and_then(|id| self.part_instances.find_one(id))
    }

    pub fn current_part_instance(&self) -> Option<&PartInstance> {
        self.part_instance(self.playlist().current_part_instance_id.as_ref())
    }

    pub fn next_part_instance(&self) -> Option<&PartInstance> {
        self.part_instance(self.playlist().next_part_instance_id.as_ref())
    }

    pub fn previous_part_instance(&self) -> Option<&PartInstance> {
        self.part_instance(self.playlist().previous_part_instance_id.as_ref())
    }

    /// Live piece instances of one part instance.
    pub fn piece_instances_of(&self, part_instance_id: &PartInstanceId) -> Vec<&PieceInstance> {
        self.piece_instances
            .iter()
            .filter(|p| !p.reset && p.part_instance_id == *part_instance_id)
            .collect()
    }

    pub fn is_dirty(&self) -> bool {
        self.playlist.is_dirty()
            || self.rundowns.is_dirty()
            || self.segments.is_dirty()
            || self.parts.is_dirty()
            || self.pieces.is_dirty()
            || self.adlib_pieces.is_dirty()
            || self.part_instances.is_dirty()
            || self.piece_instances.is_dirty()
            || self.timeline.is_dirty()
    }

    /// Every pending write across all sub-collections.
    pub fn pending_writes(&self) -> Result<Vec<WriteOp>, CacheError> {
        let mut ops = self.playlist.pending_writes()?;
        ops.extend(self.rundowns.pending_writes()?);
        ops.extend(self.segments.pending_writes()?);
        ops.extend(self.parts.pending_writes()?);
        ops.extend(self.pieces.pending_writes()?);
        ops.extend(self.adlib_pieces.pending_writes()?);
        ops.extend(self.part_instances.pending_writes()?);
        ops.extend(self.piece_instances.pending_writes()?);
        ops.extend(self.timeline.pending_writes()?);
        Ok(ops)
    }

    /// Flush all changes in one atomic commit.
    pub async fn save(&mut self, store: &dyn DocumentStore) -> Result<SaveSummary, CacheError> {
        let summary = commit(store, self.pending_writes()?).await?;
        self.playlist.mark_saved();
        self.rundowns.mark_saved();
        self.segments.mark_saved();
        self.parts.mark_saved();
        self.pieces.mark_saved();
        self.adlib_pieces.mark_saved();
        self.part_instances.mark_saved();
        self.piece_instances.mark_saved();
        self.timeline.mark_saved();
        Ok(summary)
    }
}
