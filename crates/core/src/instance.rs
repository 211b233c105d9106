//! Playback-time materialisations of parts and pieces.

use serde::{Deserialize, Serialize};

use crate::ids::{
    ActivationId, AdLibPieceId, PartInstanceId, PieceId, PieceInstanceId, RundownId, SegmentId,
};
use crate::rundown::{Part, Piece};
use crate::types::{Rank, Timestamp};

/// Why a part instance lost its backing design-time part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrphanReason {
    /// Ingest removed the part while the instance was still relevant.
    Deleted,
    /// The instance was created for a queued ad-lib and never had a part.
    AdlibPart,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum InstanceLifecycle {
    Live,
    Orphaned { reason: OrphanReason },
    /// Soft-deleted. Kept for history, excluded from every selector.
    Reset { at: Timestamp },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PartInstanceTimings {
    pub take: Option<Timestamp>,
    pub take_out: Option<Timestamp>,
    pub started_playback: Option<Timestamp>,
    pub stopped_playback: Option<Timestamp>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartInstance {
    pub id: PartInstanceId,
    pub activation_id: ActivationId,
    pub rundown_id: RundownId,
    pub segment_id: SegmentId,
    /// Copy of the part when the instance was created. Only `rank` is
    /// updated afterwards.
    pub part: Part,
    pub is_taken: bool,
    pub lifecycle: InstanceLifecycle,
    #[serde(default)]
    pub timings: PartInstanceTimings,
}

impl PartInstance {
    pub fn new(activation_id: ActivationId, part: &Part) -> Self {
        Self {
            id: PartInstanceId::generate(),
            activation_id,
            rundown_id: part.rundown_id.clone(),
            segment_id: part.segment_id.clone(),
            part: part.clone(),
            is_taken: false,
            lifecycle: InstanceLifecycle::Live,
            timings: PartInstanceTimings::default(),
        }
    }

    pub fn rank(&self) -> Rank {
        self.part.rank
    }

    pub fn is_reset(&self) -> bool {
        matches!(self.lifecycle, InstanceLifecycle::Reset { .. })
    }

    pub fn orphan_reason(&self) -> Option<OrphanReason> {
        match self.lifecycle {
            InstanceLifecycle::Orphaned { reason } => Some(reason),
            _ => None,
        }
    }

    pub fn mark_reset(&mut self, at: Timestamp) {
        self.lifecycle = InstanceLifecycle::Reset { at };
    }

    /// When the instance was reset, if it was.
    pub fn reset_at(&self) -> Option<Timestamp> {
        match self.lifecycle {
            InstanceLifecycle::Reset { at } => Some(at),
            _ => None,
        }
    }
}

/// Links the instances of one infinite piece across part instances.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InfiniteContinuation {
    /// Shared by every instance of the same continuing piece.
    pub infinite_instance_id: String,
    pub infinite_piece_id: PieceId,
    /// Inherited rather than starting in this part.
    pub from_previous_part: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PieceInstance {
    pub id: PieceInstanceId,
    pub activation_id: ActivationId,
    pub rundown_id: RundownId,
    pub part_instance_id: PartInstanceId,
    pub piece: Piece,
    /// Set when the piece came from an ad-lib rather than the rundown.
    pub adlib_source_id: Option<AdLibPieceId>,
    pub adlibbed_at: Option<Timestamp>,
    pub infinite: Option<InfiniteContinuation>,
    #[serde(default)]
    pub reset: bool,
    pub started_playback: Option<Timestamp>,
    pub stopped_playback: Option<Timestamp>,
}

impl PieceInstance {
    /// Derive the instance of `piece` inside `part_instance`. The id is
    /// content-addressed so re-deriving yields the same id.
    pub fn for_piece(part_instance: &PartInstance, piece: &Piece) -> Self {
        Self {
            id: PieceInstanceId::derived(&[part_instance.id.as_str(), piece.id.as_str()]),
            activation_id: part_instance.activation_id.clone(),
            rundown_id: piece.rundown_id.clone(),
            part_instance_id: part_instance.id.clone(),
            piece: piece.clone(),
            adlib_source_id: None,
            adlibbed_at: None,
            infinite: None,
            reset: false,
            started_playback: None,
            stopped_playback: None,
        }
    }

    pub fn is_adlibbed(&self) -> bool {
        self.adlibbed_at.is_some()
    }
}
