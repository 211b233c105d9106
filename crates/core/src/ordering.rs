//! Running order of parts across the rundowns of a playlist.

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::ids::{RundownId, SegmentId};
use crate::rundown::{Part, Segment};
use crate::types::Rank;

/// Position of a part in the playlist running order.
#[derive(Debug, Clone, PartialEq)]
pub struct PartSortKey {
    pub rundown: usize,
    pub segment: Rank,
    pub segment_id: SegmentId,
    pub part: Rank,
}

impl Eq for PartSortKey {}

impl Ord for PartSortKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rundown
            .cmp(&other.rundown)
            .then(self.segment.total_cmp(&other.segment))
            .then_with(|| self.segment_id.cmp(&other.segment_id))
            .then(self.part.total_cmp(&other.part))
    }
}

impl PartialOrd for PartSortKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Lookup tables for sorting parts and instances into running order.
///
/// Parts of unknown rundowns or segments sort last.
#[derive(Debug, Default)]
pub struct RunningOrder {
    rundowns: HashMap<RundownId, usize>,
    segments: HashMap<SegmentId, (RundownId, Rank)>,
}

impl RunningOrder {
    pub fn new<'a>(
        rundown_ids: &[RundownId],
        segments: impl IntoIterator<Item = &'a Segment>,
    ) -> Self {
        Self {
            rundowns: rundown_ids
                .iter()
                .enumerate()
                .map(|(i, id)| (id.clone(), i))
                .collect(),
            segments: segments
                .into_iter()
                .map(|s| (s.id.clone(), (s.rundown_id.clone(), s.rank)))
                .collect(),
        }
    }

    pub fn key(&self, rundown_id: &RundownId, segment_id: &SegmentId, rank: Rank) -> PartSortKey {
        PartSortKey {
            rundown: self.rundowns.get(rundown_id).copied().unwrap_or(usize::MAX),
            segment: self
                .segments
                .get(segment_id)
                .map_or(Rank::MAX, |(_, rank)| *rank),
            segment_id: segment_id.clone(),
            part: rank,
        }
    }

    pub fn part_key(&self, part: &Part) -> PartSortKey {
        self.key(&part.rundown_id, &part.segment_id, part.rank)
    }

    /// Sort parts into running order.
    pub fn sort_parts<'p>(&self, parts: impl IntoIterator<Item = &'p Part>) -> Vec<&'p Part> {
        let mut keyed: Vec<(PartSortKey, &Part)> =
            parts.into_iter().map(|p| (self.part_key(p), p)).collect();
        keyed.sort_by(|a, b| a.0.cmp(&b.0));
        keyed.into_iter().map(|(_, p)| p).collect()
    }

    /// Segments in running order.
    pub fn sort_segments<'s>(&self, segments: impl IntoIterator<Item = &'s Segment>) -> Vec<&'s Segment> {
        let mut sorted: Vec<&Segment> = segments.into_iter().collect();
        sorted.sort_by(|a, b| {
            let ra = self.rundowns.get(&a.rundown_id).copied().unwrap_or(usize::MAX);
            let rb = self.rundowns.get(&b.rundown_id).copied().unwrap_or(usize::MAX);
            ra.cmp(&rb)
                .then(a.rank.total_cmp(&b.rank))
                .then_with(|| a.id.cmp(&b.id))
        });
        sorted
    }
}
