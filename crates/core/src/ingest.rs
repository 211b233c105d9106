//! Change-sets produced by the newsroom ingest layer.
//!
//! These are validated at the API boundary and converted into design-time
//! documents with content-addressed ids, so re-ingesting the same external
//! ids updates documents in place.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::ids::{AdLibPieceId, PartId, PieceId, RundownId, SegmentId, StudioId};
use crate::rundown::{AdLibPiece, Part, Piece, PieceEnable, PieceLifespan, Segment};
use crate::types::{Millis, Rank, Timestamp};

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct IngestRundown {
    #[validate(length(min = 1, max = 256))]
    pub external_id: String,
    #[validate(length(min = 1, max = 512))]
    pub name: String,
    /// Playlist to join. A new playlist is created when absent.
    pub playlist_external_id: Option<String>,
    pub expected_start: Option<Timestamp>,
    #[validate(nested)]
    #[serde(default)]
    pub segments: Vec<IngestSegment>,
    /// Newsroom payload handed to the blueprint untouched.
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl IngestRundown {
    pub fn rundown_id(&self, studio_id: &StudioId) -> RundownId {
        RundownId::derived(&[studio_id.as_str(), &self.external_id])
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct IngestSegment {
    #[validate(length(min = 1, max = 256))]
    pub external_id: String,
    pub name: String,
    pub rank: Rank,
    #[serde(default)]
    pub hidden: bool,
    #[validate(nested)]
    #[serde(default)]
    pub parts: Vec<IngestPart>,
}

impl IngestSegment {
    pub fn segment_id(&self, rundown_id: &RundownId) -> SegmentId {
        SegmentId::derived(&[rundown_id.as_str(), &self.external_id])
    }

    pub fn to_segment(&self, rundown_id: &RundownId) -> Segment {
        Segment {
            id: self.segment_id(rundown_id),
            rundown_id: rundown_id.clone(),
            external_id: self.external_id.clone(),
            name: self.name.clone(),
            rank: self.rank,
            hidden: self.hidden,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct IngestPart {
    #[validate(length(min = 1, max = 256))]
    pub external_id: String,
    pub title: String,
    pub rank: Rank,
    #[validate(range(min = 0))]
    pub expected_duration: Option<Millis>,
    #[serde(default)]
    pub auto_next: bool,
    #[serde(default)]
    #[validate(range(min = 0))]
    pub auto_next_overlap: Millis,
    #[serde(default)]
    pub invalid: bool,
    #[serde(default)]
    pub floated: bool,
    #[validate(nested)]
    #[serde(default)]
    pub pieces: Vec<IngestPiece>,
    #[validate(nested)]
    #[serde(default)]
    pub adlibs: Vec<IngestAdLib>,
}

impl IngestPart {
    pub fn part_id(&self, rundown_id: &RundownId) -> PartId {
        PartId::derived(&[rundown_id.as_str(), &self.external_id])
    }

    pub fn to_part(&self, rundown_id: &RundownId, segment_id: &SegmentId) -> Part {
        Part {
            id: self.part_id(rundown_id),
            rundown_id: rundown_id.clone(),
            segment_id: segment_id.clone(),
            external_id: self.external_id.clone(),
            title: self.title.clone(),
            rank: self.rank,
            expected_duration: self.expected_duration,
            auto_next: self.auto_next,
            auto_next_overlap: self.auto_next_overlap,
            invalid: self.invalid,
            floated: self.floated,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct IngestPiece {
    #[validate(length(min = 1, max = 256))]
    pub external_id: String,
    pub name: String,
    #[validate(length(min = 1))]
    pub source_layer_id: String,
    #[validate(length(min = 1))]
    pub output_layer_id: String,
    #[serde(default)]
    #[validate(range(min = 0))]
    pub start: Millis,
    pub duration: Option<Millis>,
    pub lifespan: PieceLifespan,
    #[serde(default)]
    pub content: serde_json::Value,
}

impl IngestPiece {
    pub fn to_piece(&self, rundown_id: &RundownId, part_id: &PartId) -> Piece {
        Piece {
            id: PieceId::derived(&[part_id.as_str(), &self.external_id]),
            rundown_id: rundown_id.clone(),
            part_id: part_id.clone(),
            external_id: self.external_id.clone(),
            name: self.name.clone(),
            source_layer_id: self.source_layer_id.clone(),
            output_layer_id: self.output_layer_id.clone(),
            enable: PieceEnable {
                start: self.start,
                duration: self.duration,
            },
            lifespan: self.lifespan,
            content: self.content.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct IngestAdLib {
    #[validate(length(min = 1, max = 256))]
    pub external_id: String,
    pub name: String,
    #[serde(default)]
    pub rank: Rank,
    #[validate(length(min = 1))]
    pub source_layer_id: String,
    #[validate(length(min = 1))]
    pub output_layer_id: String,
    pub expected_duration: Option<Millis>,
    pub lifespan: PieceLifespan,
    #[serde(default)]
    pub content: serde_json::Value,
}

impl IngestAdLib {
    pub fn to_adlib(&self, rundown_id: &RundownId, part_id: &PartId) -> AdLibPiece {
        AdLibPiece {
            id: AdLibPieceId::derived(&[part_id.as_str(), &self.external_id]),
            rundown_id: rundown_id.clone(),
            part_id: Some(part_id.clone()),
            external_id: self.external_id.clone(),
            name: self.name.clone(),
            rank: self.rank,
            source_layer_id: self.source_layer_id.clone(),
            output_layer_id: self.output_layer_id.clone(),
            expected_duration: self.expected_duration,
            lifespan: self.lifespan,
            content: self.content.clone(),
        }
    }
}
