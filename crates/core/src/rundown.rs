//! Design-time show structure: rundowns, segments, parts, pieces.
//!
//! These documents are owned by ingest. The engine reads them and copies
//! parts and pieces into instances, but never edits them during playout.

use serde::{Deserialize, Serialize};

use crate::ids::{
    AdLibPieceId, PartId, PieceId, PlaylistId, RundownId, SegmentId, ShowStyleVariantId, StudioId,
};
use crate::types::{Millis, Rank, Timestamp};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rundown {
    pub id: RundownId,
    pub external_id: String,
    pub studio_id: StudioId,
    pub playlist_id: PlaylistId,
    pub name: String,
    pub show_style_variant_id: Option<ShowStyleVariantId>,
    pub expected_start: Option<Timestamp>,
    pub created_at: Timestamp,
    pub modified_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub id: SegmentId,
    pub rundown_id: RundownId,
    pub external_id: String,
    pub name: String,
    pub rank: Rank,
    #[serde(default)]
    pub hidden: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Part {
    pub id: PartId,
    pub rundown_id: RundownId,
    pub segment_id: SegmentId,
    pub external_id: String,
    pub title: String,
    pub rank: Rank,
    pub expected_duration: Option<Millis>,
    #[serde(default)]
    pub auto_next: bool,
    /// How far the next part overlaps this one when auto-nexting.
    #[serde(default)]
    pub auto_next_overlap: Millis,
    #[serde(default)]
    pub invalid: bool,
    #[serde(default)]
    pub floated: bool,
}

impl Part {
    /// Invalid and floated parts are skipped when selecting a next part.
    pub fn is_playable(&self) -> bool {
        !self.invalid && !self.floated
    }
}

/// How long a piece stays on air once its part has been taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PieceLifespan {
    WithinPart,
    OutOnSegmentEnd,
    OutOnRundownEnd,
    /// Survives every boundary until replaced on its source layer.
    Indefinite,
}

impl PieceLifespan {
    /// An infinite piece continues into following parts.
    pub fn is_infinite(self) -> bool {
        !matches!(self, Self::WithinPart)
    }

    pub fn survives_segment_change(self) -> bool {
        matches!(self, Self::OutOnRundownEnd | Self::Indefinite)
    }

    pub fn survives_rundown_change(self) -> bool {
        matches!(self, Self::Indefinite)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PieceEnable {
    /// Offset from the start of the part.
    pub start: Millis,
    pub duration: Option<Millis>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Piece {
    pub id: PieceId,
    pub rundown_id: RundownId,
    pub part_id: PartId,
    pub external_id: String,
    pub name: String,
    pub source_layer_id: String,
    pub output_layer_id: String,
    pub enable: PieceEnable,
    pub lifespan: PieceLifespan,
    /// Opaque to the engine; forwarded into timeline objects.
    #[serde(default)]
    pub content: serde_json::Value,
}

/// Content an operator can insert on demand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdLibPiece {
    pub id: AdLibPieceId,
    pub rundown_id: RundownId,
    /// Part the ad-lib was offered alongside, if any.
    pub part_id: Option<PartId>,
    pub external_id: String,
    pub name: String,
    pub rank: Rank,
    pub source_layer_id: String,
    pub output_layer_id: String,
    pub expected_duration: Option<Millis>,
    pub lifespan: PieceLifespan,
    #[serde(default)]
    pub content: serde_json::Value,
}

impl AdLibPiece {
    /// Materialise the ad-lib as a piece of `part_id` starting at `start`.
    pub fn to_piece(&self, part_id: &PartId, start: Millis) -> Piece {
        Piece {
            id: PieceId::derived(&[self.id.as_str(), part_id.as_str()]),
            rundown_id: self.rundown_id.clone(),
            part_id: part_id.clone(),
            external_id: self.external_id.clone(),
            name: self.name.clone(),
            source_layer_id: self.source_layer_id.clone(),
            output_layer_id: self.output_layer_id.clone(),
            enable: PieceEnable {
                start,
                duration: self.expected_duration,
            },
            lifespan: self.lifespan,
            content: self.content.clone(),
        }
    }
}
