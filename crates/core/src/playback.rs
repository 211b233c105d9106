//! Events reported back by device gateways.

use serde::{Deserialize, Serialize};

use crate::ids::{PartInstanceId, PieceInstanceId};
use crate::types::Timestamp;

/// A playback state change observed by a device gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlayoutChange {
    PartPlaybackStarted {
        part_instance_id: PartInstanceId,
        time: Timestamp,
    },
    PartPlaybackStopped {
        part_instance_id: PartInstanceId,
        time: Timestamp,
    },
    PiecePlaybackStarted {
        part_instance_id: PartInstanceId,
        piece_instance_id: PieceInstanceId,
        time: Timestamp,
    },
    PiecePlaybackStopped {
        part_instance_id: PartInstanceId,
        piece_instance_id: PieceInstanceId,
        time: Timestamp,
    },
}

impl PlayoutChange {
    pub fn time(&self) -> Timestamp {
        match self {
            Self::PartPlaybackStarted { time, .. }
            | Self::PartPlaybackStopped { time, .. }
            | Self::PiecePlaybackStarted { time, .. }
            | Self::PiecePlaybackStopped { time, .. } => *time,
        }
    }
}

/// Resolved trigger time for a timeline object whose start was `now`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerTimeResult {
    pub object_id: String,
    pub time: Timestamp,
}

/// Keep the later of an existing and a reported time.
///
/// Gateways may deliver reports out of order; the timestamp carried by the
/// report decides, never the arrival order.
pub fn latest(existing: Option<Timestamp>, reported: Timestamp) -> Timestamp {
    match existing {
        Some(current) if current > reported => current,
        _ => reported,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn changes_deserialize_from_gateway_shape() {
        let change: PlayoutChange = serde_json::from_value(serde_json::json!({
            "type": "PART_PLAYBACK_STARTED",
            "part_instance_id": "pi1",
            "time": "2026-01-01T12:00:00Z",
        }))
        .unwrap();
        assert!(matches!(change, PlayoutChange::PartPlaybackStarted { .. }));
    }

    #[test]
    fn latest_wins_regardless_of_arrival() {
        let early = chrono::DateTime::from_timestamp_millis(1_000).unwrap();
        let late = chrono::DateTime::from_timestamp_millis(2_000).unwrap();
        assert_eq!(latest(Some(late), early), late);
        assert_eq!(latest(Some(early), late), late);
        assert_eq!(latest(None, early), early);
    }
}
