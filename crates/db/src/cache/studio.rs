//! Cache of a studio's playlists and rundowns, for cross-playlist jobs.

use onair_core::ids::StudioId;
use onair_core::playlist::RundownPlaylist;
use onair_core::rundown::Rundown;

use super::{commit, fetch, studio_partition, CacheCollection, CacheError, SaveSummary};
use crate::store::{Collection, DocumentQuery, DocumentStore};

/// Used under the studio lock when rundowns move between playlists or a
/// playlist is created or removed.
#[derive(Debug, Clone)]
pub struct StudioCache {
    pub studio_id: StudioId,
    pub playlists: CacheCollection<RundownPlaylist>,
    pub rundowns: CacheCollection<Rundown>,
}

impl StudioCache {
    pub async fn load(store: &dyn DocumentStore, studio_id: &StudioId) -> Result<Self, CacheError> {
        let playlists: Vec<RundownPlaylist> = fetch(
            store,
            DocumentQuery::live(Collection::Playlists, studio_partition(studio_id)),
        )
        .await?;
        let playlist_keys: Vec<String> = playlists.iter().map(|p| p.id.to_string()).collect();
        let rundowns: Vec<Rundown> = fetch(
            store,
            DocumentQuery::live(Collection::Rundowns, playlist_keys),
        )
        .await?;

        Ok(Self {
            studio_id: studio_id.clone(),
            playlists: CacheCollection::from_documents(playlists),
            rundowns: CacheCollection::from_documents(rundowns),
        })
    }

    pub async fn save(&mut self, store: &dyn DocumentStore) -> Result<SaveSummary, CacheError> {
        let mut ops = self.playlists.pending_writes()?;
        ops.extend(self.rundowns.pending_writes()?);
        let summary = commit(store, ops).await?;
        self.playlists.mark_saved();
        self.rundowns.mark_saved();
        Ok(summary)
    }
}
