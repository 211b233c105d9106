//! Keeping instance ranks in step with ingest edits.

use std::collections::BTreeMap;

use onair_core::ids::{PartInstanceId, SegmentId};
use onair_core::instance::{InstanceLifecycle, OrphanReason};
use onair_core::ranks::{position_orphans, OrphanSlot, RankedPart};
use onair_db::cache::PlayoutCache;

use super::segment_parts;

/// Segments touched by an edit, with their parts before it.
///
/// `None` means the prior order is unknown and the current parts stand in.
pub type ChangedSegments = BTreeMap<SegmentId, Option<Vec<RankedPart>>>;

/// Update live instances in the changed segments.
///
/// Instances whose part survives follow its rank. An untaken one also
/// takes a fresh copy of the part. Instances whose part is gone become
/// orphans and are placed between their former neighbours.
pub(crate) fn update_part_instance_ranks(cache: &mut PlayoutCache, changed: &ChangedSegments) {
    for (segment_id, old_parts) in changed {
        let instance_ids: Vec<PartInstanceId> = cache
            .part_instances
            .iter()
            .filter(|pi| !pi.is_reset() && pi.segment_id == *segment_id)
            .map(|pi| pi.id.clone())
            .collect();

        let mut orphans = Vec::new();
        for id in &instance_ids {
            let Some(instance) = cache.part_instances.find_one(id).cloned() else {
                continue;
            };
            match cache.parts.find_one(&instance.part.id).cloned() {
                Some(part) => {
                    cache.part_instances.update(id, |pi| {
                        if pi.is_taken {
                            pi.part.rank = part.rank;
                        } else {
                            pi.segment_id = part.segment_id.clone();
                            pi.part = part;
                        }
                        pi.lifecycle = InstanceLifecycle::Live;
                    });
                }
                None => {
                    if instance.orphan_reason().is_none() {
                        tracing::info!(
                            part_instance_id = %id,
                            part_id = %instance.part.id,
                            "Part removed, instance orphaned"
                        );
                        cache.part_instances.update(id, |pi| {
                            pi.lifecycle = InstanceLifecycle::Orphaned {
                                reason: OrphanReason::Deleted,
                            };
                        });
                    }
                    orphans.push(OrphanSlot {
                        instance_id: id.clone(),
                        part_id: instance.part.id.clone(),
                        rank: instance.rank(),
                    });
                }
            }
        }

        let new_parts = segment_parts(cache, segment_id);
        for (instance_id, rank) in position_orphans(&orphans, &new_parts, old_parts.as_deref()) {
            cache.part_instances.update(&instance_id, |pi| pi.part.rank = rank);
        }
    }
}

#[cfg(test)]
mod tests {
    use onair_core::ids::{ActivationId, PartId, PlaylistId, RundownId, StudioId};
    use onair_core::instance::PartInstance;
    use onair_core::playlist::RundownPlaylist;
    use onair_core::rundown::{Part, Segment};
    use onair_db::cache::{CacheCollection, CacheObject};

    use super::*;

    fn part(id: &str, rank: f64) -> Part {
        Part {
            id: PartId::new(id),
            rundown_id: RundownId::new("ro"),
            segment_id: SegmentId::new("seg"),
            external_id: id.into(),
            title: id.to_uppercase(),
            rank,
            expected_duration: Some(10_000),
            auto_next: false,
            auto_next_overlap: 0,
            invalid: false,
            floated: false,
        }
    }

    fn cache(parts: Vec<Part>, instances: Vec<PartInstance>) -> PlayoutCache {
        let now = chrono::DateTime::from_timestamp_millis(1_700_000_000_000).unwrap();
        let mut playlist = RundownPlaylist::new(
            PlaylistId::new("pl"),
            "pl",
            StudioId::new("st"),
            "Show",
            now,
        );
        playlist.rundown_ids = vec![RundownId::new("ro")];
        PlayoutCache {
            playlist_id: PlaylistId::new("pl"),
            studio_id: StudioId::new("st"),
            playlist: CacheObject::new(playlist),
            rundowns: CacheCollection::from_documents(Vec::new()),
            segments: CacheCollection::from_documents(vec![Segment {
                id: SegmentId::new("seg"),
                rundown_id: RundownId::new("ro"),
                external_id: "seg".into(),
                name: "Segment".into(),
                rank: 0.0,
                hidden: false,
            }]),
            parts: CacheCollection::from_documents(parts),
            pieces: CacheCollection::from_documents(Vec::new()),
            adlib_pieces: CacheCollection::from_documents(Vec::new()),
            part_instances: CacheCollection::from_documents(instances),
            piece_instances: CacheCollection::from_documents(Vec::new()),
            timeline: CacheCollection::from_documents(Vec::new()),
            studio_playlists: Vec::new(),
        }
    }

    fn taken(part: &Part) -> PartInstance {
        let mut pi = PartInstance::new(ActivationId::new("act"), part);
        pi.is_taken = true;
        pi
    }

    #[test]
    fn removed_part_orphans_instance_between_neighbours() {
        let (a, b, c) = (part("a", 0.0), part("b", 1.0), part("c", 2.0));
        let instance = taken(&b);
        let id = instance.id.clone();
        let before = vec![
            RankedPart::new(a.id.clone(), 0.0),
            RankedPart::new(b.id.clone(), 1.0),
            RankedPart::new(c.id.clone(), 2.0),
        ];

        // Ingest dropped B and re-ranked C.
        let mut c = c;
        c.rank = 4.0;
        let mut cache = cache(vec![a, c], vec![instance]);
        let changed = ChangedSegments::from([(SegmentId::new("seg"), Some(before))]);
        update_part_instance_ranks(&mut cache, &changed);

        let pi = cache.part_instances.find_one(&id).unwrap();
        assert_eq!(pi.orphan_reason(), Some(OrphanReason::Deleted));
        assert_eq!(pi.rank(), 2.0);
    }

    #[test]
    fn surviving_part_updates_rank_only_when_taken() {
        let b = part("b", 1.0);
        let instance = taken(&b);
        let id = instance.id.clone();

        let mut edited = b.clone();
        edited.rank = 5.0;
        edited.title = "Renamed".into();
        let mut cache = cache(vec![edited], vec![instance]);
        update_part_instance_ranks(&mut cache, &ChangedSegments::from([(SegmentId::new("seg"), None)]));

        let pi = cache.part_instances.find_one(&id).unwrap();
        assert_eq!(pi.rank(), 5.0);
        assert_eq!(pi.part.title, "B");
    }

    #[test]
    fn reinserted_part_revives_orphan() {
        let b = part("b", 1.0);
        let mut instance = taken(&b);
        instance.lifecycle = InstanceLifecycle::Orphaned {
            reason: OrphanReason::Deleted,
        };
        let id = instance.id.clone();

        let mut cache = cache(vec![b], vec![instance]);
        update_part_instance_ranks(&mut cache, &ChangedSegments::from([(SegmentId::new("seg"), None)]));
        assert_eq!(cache.part_instances.find_one(&id).unwrap().orphan_reason(), None);
    }
}
