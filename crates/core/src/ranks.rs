//! Rank interpolation for orphaned part instances.
//!
//! When ingest edits a segment, instances whose part was removed stay in
//! the running order. This module decides where they go. It is a pure
//! function of the surviving parts' new ranks, the prior order of the
//! segment, and the orphans themselves.
//!
//! Fixed points are always surviving parts whose ranks ingest assigns.
//! Orphan ranks are recomputed from those on every edit and never feed
//! back into the next computation, so precision loss cannot accumulate
//! across repeated edits.

use std::collections::HashMap;

use crate::ids::{PartId, PartInstanceId};
use crate::types::Rank;

/// A part and its rank.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedPart {
    pub id: PartId,
    pub rank: Rank,
}

impl RankedPart {
    pub fn new(id: PartId, rank: Rank) -> Self {
        Self { id, rank }
    }
}

/// A live instance whose part no longer exists.
#[derive(Debug, Clone, PartialEq)]
pub struct OrphanSlot {
    pub instance_id: PartInstanceId,
    pub part_id: PartId,
    /// The rank the instance currently displays with.
    pub rank: Rank,
}

struct Entry<'a> {
    part_id: &'a PartId,
    rank: Rank,
    orphan: Option<&'a PartInstanceId>,
}

/// Compute new ranks for `orphans` within one segment.
///
/// * `new_parts`: the segment's parts after the edit.
/// * `old_parts`: the segment's `(part, rank)` pairs before the edit, or
///   `None` to treat the current parts as the prior order.
///
/// Returns only the instances whose rank changes.
pub fn position_orphans(
    orphans: &[OrphanSlot],
    new_parts: &[RankedPart],
    old_parts: Option<&[RankedPart]>,
) -> Vec<(PartInstanceId, Rank)> {
    if orphans.is_empty() {
        return Vec::new();
    }

    let mut sorted_orphans: Vec<&OrphanSlot> = orphans.iter().collect();
    sorted_orphans.sort_by(|a, b| a.rank.total_cmp(&b.rank));

    // Nothing left in the segment: lay orphans out from zero.
    if new_parts.is_empty() {
        return sorted_orphans
            .into_iter()
            .enumerate()
            .map(|(i, o)| (o, i as Rank))
            .filter(|(o, rank)| o.rank != *rank)
            .map(|(o, rank)| (o.instance_id.clone(), rank))
            .collect();
    }

    let new_ranks: HashMap<&PartId, Rank> = new_parts.iter().map(|p| (&p.id, p.rank)).collect();
    let old_parts = old_parts.unwrap_or(new_parts);

    // No prior neighbour survived: place immediately before the first part.
    let any_preserved = old_parts.iter().any(|p| new_ranks.contains_key(&p.id));
    if !any_preserved {
        let first = new_parts
            .iter()
            .map(|p| p.rank)
            .fold(Rank::INFINITY, Rank::min);
        let start = first - sorted_orphans.len() as Rank;
        return sorted_orphans
            .into_iter()
            .enumerate()
            .map(|(i, o)| (o, start + i as Rank))
            .filter(|(o, rank)| o.rank != *rank)
            .map(|(o, rank)| (o.instance_id.clone(), rank))
            .collect();
    }

    // Merge prior order with the orphans. An orphan replaces the prior
    // entry of its own part.
    let mut merged: Vec<Entry<'_>> = Vec::with_capacity(old_parts.len() + orphans.len());
    let mut by_part: HashMap<&PartId, usize> = HashMap::new();
    for part in old_parts {
        by_part.insert(&part.id, merged.len());
        merged.push(Entry {
            part_id: &part.id,
            rank: part.rank,
            orphan: None,
        });
    }
    for &orphan in &sorted_orphans {
        let entry = Entry {
            part_id: &orphan.part_id,
            rank: orphan.rank,
            orphan: Some(&orphan.instance_id),
        };
        match by_part.get(&orphan.part_id) {
            Some(&index) => merged[index] = entry,
            None => {
                by_part.insert(&orphan.part_id, merged.len());
                merged.push(entry);
            }
        }
    }
    merged.sort_by(|a, b| a.rank.total_cmp(&b.rank));
    merged.retain(|e| e.orphan.is_some() || new_ranks.contains_key(e.part_id));

    let mut updates = Vec::new();
    let mut index = 0;
    while index < merged.len() {
        if merged[index].orphan.is_none() {
            index += 1;
            continue;
        }

        // A run of orphans [index, end) bounded by fixed parts.
        let end = merged[index..]
            .iter()
            .position(|e| e.orphan.is_none())
            .map_or(merged.len(), |offset| index + offset);

        let before = match index.checked_sub(1) {
            Some(prev) => new_ranks.get(merged[prev].part_id).copied().unwrap_or(-1.0),
            None => -1.0,
        };
        let after = match merged.get(end) {
            Some(next) => new_ranks.get(next.part_id).copied().unwrap_or(before + 1.0),
            None => before + 1.0,
        };

        let count = (end - index) as Rank;
        let delta = (after - before) / (count + 1.0);
        let mut rank = before;
        for entry in &merged[index..end] {
            rank += delta;
            if let Some(instance_id) = entry.orphan {
                if entry.rank != rank {
                    updates.push((instance_id.clone(), rank));
                }
            }
        }
        index = end;
    }
    updates
}

#[cfg(test)]
mod tests {
    use super::*;

    fn part(id: &str, rank: Rank) -> RankedPart {
        RankedPart::new(PartId::new(id), rank)
    }

    fn orphan(instance: &str, part: &str, rank: Rank) -> OrphanSlot {
        OrphanSlot {
            instance_id: PartInstanceId::new(instance),
            part_id: PartId::new(part),
            rank,
        }
    }

    fn rank_of(updates: &[(PartInstanceId, Rank)], instance: &str) -> Option<Rank> {
        updates
            .iter()
            .find(|(id, _)| id.as_str() == instance)
            .map(|(_, rank)| *rank)
    }

    #[test]
    fn no_orphans_no_updates() {
        assert!(position_orphans(&[], &[part("a", 0.0)], None).is_empty());
    }

    #[test]
    fn removed_middle_part_stays_between_neighbours() {
        // [A, B, C] with B removed while on air.
        let old = [part("a", 0.0), part("b", 1.0), part("c", 2.0)];
        let new = [part("a", 0.0), part("c", 2.0)];
        let orphans = [orphan("ib", "b", 1.0)];

        // Already evenly spaced between a and c: nothing to change.
        assert!(position_orphans(&orphans, &new, Some(&old)).is_empty());

        // After C is re-ranked, B follows its neighbours.
        let new = [part("a", 0.0), part("c", 10.0)];
        let updates = position_orphans(&orphans, &new, Some(&old));
        assert_eq!(rank_of(&updates, "ib"), Some(5.0));
    }

    #[test]
    fn runs_of_orphans_are_spaced_evenly_in_order() {
        let old = [part("a", 0.0), part("b", 1.0), part("c", 2.0), part("d", 3.0)];
        let new = [part("a", 0.0), part("d", 3.0)];
        let orphans = [orphan("ic", "c", 2.0), orphan("ib", "b", 1.0)];

        let updates = position_orphans(&orphans, &new, Some(&old));
        // (3 - 0) / 3 = 1 apart: b stays at 1, c stays at 2.
        assert!(updates.is_empty());

        let new = [part("a", 0.0), part("d", 6.0)];
        let updates = position_orphans(&orphans, &new, Some(&old));
        assert_eq!(rank_of(&updates, "ib"), Some(2.0));
        assert_eq!(rank_of(&updates, "ic"), Some(4.0));
    }

    #[test]
    fn orphans_after_last_part_step_by_fraction() {
        let old = [part("a", 0.0), part("b", 1.0)];
        let new = [part("a", 0.0)];
        let orphans = [orphan("ib", "b", 1.0)];

        let updates = position_orphans(&orphans, &new, Some(&old));
        assert_eq!(rank_of(&updates, "ib"), Some(0.5));
    }

    #[test]
    fn orphans_before_first_part_use_minus_one_floor() {
        let old = [part("a", 0.0), part("b", 1.0)];
        let new = [part("b", 1.0)];
        let orphans = [orphan("ia", "a", 0.0)];

        let updates = position_orphans(&orphans, &new, Some(&old));
        assert!(updates.is_empty(), "midpoint of -1 and 1 is the current rank");

        let new = [part("b", 5.0)];
        let updates = position_orphans(&orphans, &new, Some(&old));
        assert_eq!(rank_of(&updates, "ia"), Some(2.0));
    }

    #[test]
    fn empty_segment_lays_out_from_zero() {
        let orphans = [orphan("i2", "p2", 7.0), orphan("i1", "p1", 3.0)];
        let updates = position_orphans(&orphans, &[], None);
        assert_eq!(rank_of(&updates, "i1"), Some(0.0));
        assert_eq!(rank_of(&updates, "i2"), Some(1.0));
    }

    #[test]
    fn no_surviving_neighbour_goes_to_head() {
        let old = [part("x", 0.0)];
        let new = [part("n1", 10.0), part("n2", 11.0)];
        let orphans = [orphan("ix", "x", 0.0), orphan("iy", "y", 0.5)];

        let updates = position_orphans(&orphans, &new, Some(&old));
        assert_eq!(rank_of(&updates, "ix"), Some(8.0));
        assert_eq!(rank_of(&updates, "iy"), Some(9.0));
    }

    #[test]
    fn reordering_unrelated_parts_keeps_orphan_between_same_neighbours() {
        // [A, B(on air), C, D]; B removed and D moved to the front.
        let old = [part("a", 0.0), part("b", 1.0), part("c", 2.0), part("d", 3.0)];
        let new = [part("d", -1.0), part("a", 0.0), part("c", 2.0)];
        let orphans = [orphan("ib", "b", 1.0)];

        let updates = position_orphans(&orphans, &new, Some(&old));
        let rank = rank_of(&updates, "ib").unwrap_or(1.0);
        assert!(rank > 0.0 && rank < 2.0);
    }
}
