#![allow(dead_code)]

use std::sync::Arc;

use onair_core::clock::{Clock, ManualClock};
use onair_core::ids::{PartId, PlaylistId, RundownId, StudioId};
use onair_core::ingest::{IngestRundown, IngestSegment};
use onair_core::types::Timestamp;
use onair_db::MemoryDocumentStore;
use onair_events::EventBus;
use onair_playout::{Blueprint, DefaultBlueprint, PlayoutEngine, PlayoutSettings, PlaylistView};
use serde_json::{json, Value};

pub const STUDIO: &str = "studio-1";
pub const PLAYLIST_EXTERNAL_ID: &str = "evening-show";

pub fn start_time() -> Timestamp {
    chrono::DateTime::from_timestamp_millis(1_767_268_800_000).unwrap()
}

pub struct Harness {
    pub engine: PlayoutEngine,
    pub store: Arc<MemoryDocumentStore>,
    pub clock: Arc<ManualClock>,
    pub bus: Arc<EventBus>,
    pub studio: StudioId,
}

impl Harness {
    pub fn new() -> Self {
        Self::build(PlayoutSettings::default(), Arc::new(DefaultBlueprint))
    }

    pub fn with_settings(settings: PlayoutSettings) -> Self {
        Self::build(settings, Arc::new(DefaultBlueprint))
    }

    pub fn build(settings: PlayoutSettings, blueprint: Arc<dyn Blueprint>) -> Self {
        let store = Arc::new(MemoryDocumentStore::new());
        let clock = Arc::new(ManualClock::new(start_time()));
        let bus = Arc::new(EventBus::new(256));
        let engine = PlayoutEngine::new(
            store.clone(),
            clock.clone() as Arc<dyn Clock>,
            bus.clone(),
            settings,
            blueprint,
        );
        Self {
            engine,
            store,
            clock,
            bus,
            studio: StudioId::new(STUDIO),
        }
    }

    pub fn advance_ms(&self, ms: i64) -> Timestamp {
        self.clock.advance(chrono::Duration::milliseconds(ms))
    }

    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    pub fn playlist_id(&self) -> PlaylistId {
        PlaylistId::derived(&[STUDIO, PLAYLIST_EXTERNAL_ID])
    }

    /// Ingest the standard show as `rundown_external_id` into its own
    /// playlist of the same studio.
    pub async fn ingest_show_into(&self, rundown_external_id: &str, playlist_external_id: &str) -> PlaylistId {
        self.engine
            .upsert_rundown(
                &self.studio,
                show_in_playlist(rundown_external_id, playlist_external_id, false),
            )
            .await
            .unwrap();
        PlaylistId::derived(&[STUDIO, playlist_external_id])
    }

    pub fn rundown_id(&self, external_id: &str) -> RundownId {
        RundownId::derived(&[STUDIO, external_id])
    }

    pub fn part_id(&self, rundown_external_id: &str, part_external_id: &str) -> PartId {
        PartId::derived(&[self.rundown_id(rundown_external_id).as_str(), part_external_id])
    }

    /// Ingest the standard show: segment 1 with parts A and B, segment 2
    /// with part C. A auto-nexts after 30s when `autonext` is set.
    pub async fn ingest_show(&self, autonext: bool) -> RundownId {
        self.engine
            .upsert_rundown(&self.studio, show("show", autonext))
            .await
            .unwrap()
    }

    pub async fn view(&self) -> PlaylistView {
        self.engine.playlist_view(&self.playlist_id()).await.unwrap()
    }

    pub async fn current_part(&self) -> Option<PartId> {
        self.view().await.current.map(|v| v.instance.part.id)
    }

    pub async fn next_part(&self) -> Option<PartId> {
        self.view().await.next.map(|v| v.instance.part.id)
    }
}

pub fn part_json(external_id: &str, rank: f64, auto_next: bool) -> Value {
    json!({
        "external_id": external_id,
        "title": external_id.to_uppercase(),
        "rank": rank,
        "expected_duration": 30_000,
        "auto_next": auto_next,
        "pieces": [{
            "external_id": format!("{external_id}-cam"),
            "name": "Camera",
            "source_layer_id": "camera",
            "output_layer_id": "pgm",
            "lifespan": "within_part",
            "content": {"input": 1}
        }],
        "adlibs": [{
            "external_id": format!("{external_id}-gfx"),
            "name": "Lower third",
            "source_layer_id": "graphics",
            "output_layer_id": "pgm",
            "expected_duration": 5_000,
            "lifespan": "within_part"
        }]
    })
}

pub fn segment_json(external_id: &str, rank: f64, parts: Vec<Value>) -> Value {
    json!({
        "external_id": external_id,
        "name": external_id,
        "rank": rank,
        "parts": parts
    })
}

pub fn segment(external_id: &str, rank: f64, parts: Vec<Value>) -> IngestSegment {
    serde_json::from_value(segment_json(external_id, rank, parts)).unwrap()
}

pub fn show(external_id: &str, autonext: bool) -> IngestRundown {
    show_in_playlist(external_id, PLAYLIST_EXTERNAL_ID, autonext)
}

pub fn show_in_playlist(external_id: &str, playlist_external_id: &str, autonext: bool) -> IngestRundown {
    serde_json::from_value(json!({
        "external_id": external_id,
        "name": "Evening News",
        "playlist_external_id": playlist_external_id,
        "segments": [
            segment_json("seg-1", 0.0, vec![part_json("a", 0.0, autonext), part_json("b", 1.0, false)]),
            segment_json("seg-2", 1.0, vec![part_json("c", 0.0, false)]),
        ]
    }))
    .unwrap()
}
