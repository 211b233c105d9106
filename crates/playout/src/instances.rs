//! Deriving part and piece instances from design-time content.

use std::collections::{BTreeMap, HashSet};

use onair_core::ids::{ActivationId, PartInstanceId, PieceId, PieceInstanceId, RundownId, SegmentId};
use onair_core::instance::{InfiniteContinuation, OrphanReason, PartInstance, PieceInstance};
use onair_core::rundown::{Part, Piece};
use onair_core::types::{Millis, Timestamp};
use onair_db::cache::PlayoutCache;

/// Live part instances of the cache, in no particular order.
pub fn live_part_instances(cache: &PlayoutCache) -> impl Iterator<Item = &PartInstance> {
    cache.part_instances.iter().filter(|pi| !pi.is_reset())
}

/// Reuse the untaken instance of `part` for this activation, or create one.
///
/// Instances that were taken are history and never reused; neither are
/// instances whose part was deleted. A reused instance gets a fresh copy
/// of the part since it has not played yet.
pub fn ensure_part_instance(
    cache: &mut PlayoutCache,
    activation_id: &ActivationId,
    part: &Part,
) -> PartInstanceId {
    let existing = live_part_instances(cache)
        .find(|pi| {
            pi.activation_id == *activation_id
                && pi.part.id == part.id
                && !pi.is_taken
                && pi.orphan_reason() != Some(OrphanReason::Deleted)
        })
        .map(|pi| pi.id.clone());

    if let Some(id) = existing {
        cache.part_instances.update(&id, |pi| {
            pi.part = part.clone();
            pi.rundown_id = part.rundown_id.clone();
            pi.segment_id = part.segment_id.clone();
        });
        return id;
    }

    let instance = PartInstance::new(activation_id.clone(), part);
    tracing::debug!(
        part_id = %part.id,
        part_instance_id = %instance.id,
        "Created part instance"
    );
    cache.part_instances.insert(instance)
}

/// Soft-reset a part instance and its pieces.
pub fn reset_part_instance(cache: &mut PlayoutCache, id: &PartInstanceId, now: Timestamp) {
    cache.part_instances.update(id, |pi| pi.mark_reset(now));
    cache
        .piece_instances
        .update_where(|p| p.part_instance_id == *id, |p| p.reset = true);
}

// ---------------------------------------------------------------------------
// Piece derivation
// ---------------------------------------------------------------------------

fn pieces_of<'a>(cache: &'a PlayoutCache, part: &Part) -> Vec<&'a Piece> {
    let mut pieces: Vec<&Piece> = cache
        .pieces
        .iter()
        .filter(|p| p.part_id == part.id)
        .collect();
    pieces.sort_by(|a, b| a.enable.start.cmp(&b.enable.start).then_with(|| a.id.cmp(&b.id)));
    pieces
}

/// Drop infinites that end at a boundary between two positions.
fn cross_boundary(
    active: &mut BTreeMap<String, Piece>,
    from: Option<(&RundownId, &SegmentId)>,
    to: (&RundownId, &SegmentId),
) {
    let Some((from_rundown, from_segment)) = from else {
        return;
    };
    if from_rundown != to.0 {
        active.retain(|_, p| p.lifespan.survives_rundown_change());
    } else if from_segment != to.1 {
        active.retain(|_, p| p.lifespan.survives_segment_change());
    }
}

/// Pieces that should play in `instance`.
///
/// Own pieces of the part, plus infinite pieces carried over from earlier
/// parts in running order that no later piece on the same source layer
/// has closed. An inherited piece yields to an own piece on its layer:
/// it is dropped when the own piece starts with the part and cut short
/// otherwise. Within the part, pieces on one layer with the same start
/// keep only the last. Adlibbed infinite pieces of `previous` continue
/// into `instance` in place of design-time ones on their layer.
pub fn derive_piece_instances(
    cache: &PlayoutCache,
    instance: &PartInstance,
    previous: Option<&PartInstance>,
) -> Vec<PieceInstance> {
    let order = cache.running_order();
    let target = (&instance.rundown_id, &instance.segment_id);
    let target_key = order.key(&instance.rundown_id, &instance.segment_id, instance.rank());

    let mut active: BTreeMap<String, Piece> = BTreeMap::new();
    let mut position: Option<(&RundownId, &SegmentId)> = None;
    for part in order.sort_parts(cache.parts.iter()) {
        if order.part_key(part) >= target_key {
            break;
        }
        if part.id == instance.part.id {
            continue;
        }
        cross_boundary(&mut active, position, (&part.rundown_id, &part.segment_id));
        position = Some((&part.rundown_id, &part.segment_id));
        for piece in pieces_of(cache, part) {
            active.remove(&piece.source_layer_id);
            if piece.lifespan.is_infinite() {
                active.insert(piece.source_layer_id.clone(), piece.clone());
            }
        }
    }
    cross_boundary(&mut active, position, target);

    // Own pieces, last one wins per (layer, start).
    let mut own: BTreeMap<(String, Millis), &Piece> = BTreeMap::new();
    for piece in pieces_of(cache, &instance.part) {
        own.insert((piece.source_layer_id.clone(), piece.enable.start), piece);
    }
    let first_own_start = |layer: &str| {
        own.keys()
            .filter(|(l, _)| l == layer)
            .map(|(_, start)| *start)
            .min()
    };

    let previous_pieces: Vec<&PieceInstance> = previous
        .map(|prev| cache.piece_instances_of(&prev.id))
        .unwrap_or_default();

    // Adlibbed infinites continuing from the previous instance.
    let mut continued_adlibs: BTreeMap<String, &PieceInstance> = BTreeMap::new();
    if let Some(prev) = previous {
        for piece in previous_pieces.iter().filter(|p| p.is_adlibbed()) {
            let lifespan = piece.piece.lifespan;
            let survives = if prev.rundown_id != instance.rundown_id {
                lifespan.survives_rundown_change()
            } else if prev.segment_id != instance.segment_id {
                lifespan.survives_segment_change()
            } else {
                lifespan.is_infinite()
            };
            if survives {
                continued_adlibs.insert(piece.piece.source_layer_id.clone(), *piece);
            }
        }
    }

    let mut result = Vec::new();

    for (layer, piece) in &active {
        if continued_adlibs.contains_key(layer) {
            continue;
        }
        let cut = match first_own_start(layer) {
            Some(0) => continue,
            other => other,
        };
        let mut carried = piece.clone();
        carried.enable.start = 0;
        carried.enable.duration = cut;

        let mut pi = PieceInstance::for_piece(instance, &carried);
        pi.infinite = Some(continuation(&previous_pieces, &pi.id, &piece.id));
        result.push(pi);
    }

    for (layer, prev_piece) in &continued_adlibs {
        let cut = match first_own_start(layer) {
            Some(0) => continue,
            other => other,
        };
        let mut carried = prev_piece.piece.clone();
        carried.enable.start = 0;
        carried.enable.duration = cut;

        let mut pi = PieceInstance::for_piece(instance, &carried);
        pi.adlib_source_id = prev_piece.adlib_source_id.clone();
        pi.adlibbed_at = prev_piece.adlibbed_at;
        pi.infinite = Some(continuation(&previous_pieces, &pi.id, &prev_piece.piece.id));
        result.push(pi);
    }

    for piece in own.values() {
        let mut pi = PieceInstance::for_piece(instance, piece);
        if piece.lifespan.is_infinite() {
            pi.infinite = Some(InfiniteContinuation {
                infinite_instance_id: pi.id.to_string(),
                infinite_piece_id: piece.id.clone(),
                from_previous_part: false,
            });
        }
        result.push(pi);
    }

    result
}

fn continuation(
    previous_pieces: &[&PieceInstance],
    own_id: &PieceInstanceId,
    piece_id: &PieceId,
) -> InfiniteContinuation {
    let carried = previous_pieces.iter().copied().find_map(|p| {
        p.infinite
            .as_ref()
            .filter(|inf| inf.infinite_piece_id == *piece_id)
    });
    match carried {
        Some(inf) => InfiniteContinuation {
            infinite_instance_id: inf.infinite_instance_id.clone(),
            infinite_piece_id: piece_id.clone(),
            from_previous_part: true,
        },
        None => InfiniteContinuation {
            infinite_instance_id: own_id.to_string(),
            infinite_piece_id: piece_id.clone(),
            from_previous_part: false,
        },
    }
}

/// Re-derive the pieces of an untaken instance.
///
/// Adlibbed pieces that are not continuations stay. Recorded playback
/// times of pieces that survive are kept.
pub fn sync_piece_instances(
    cache: &mut PlayoutCache,
    part_instance_id: &PartInstanceId,
    previous_id: Option<&PartInstanceId>,
) {
    let Some(instance) = cache.part_instances.find_one(part_instance_id).cloned() else {
        return;
    };
    let previous = cache.part_instance(previous_id).cloned();
    let derived = derive_piece_instances(cache, &instance, previous.as_ref());
    let derived_ids: HashSet<PieceInstanceId> = derived.iter().map(|p| p.id.clone()).collect();

    let stale: Vec<PieceInstanceId> = cache
        .piece_instances_of(part_instance_id)
        .into_iter()
        .filter(|p| {
            let continued = p.infinite.as_ref().is_some_and(|i| i.from_previous_part);
            !derived_ids.contains(&p.id) && (!p.is_adlibbed() || continued)
        })
        .map(|p| p.id.clone())
        .collect();
    for id in &stale {
        cache.piece_instances.remove_by_id(id);
    }

    for mut piece in derived {
        if let Some(existing) = cache.piece_instances.find_one(&piece.id) {
            piece.started_playback = existing.started_playback;
            piece.stopped_playback = existing.stopped_playback;
        }
        cache.piece_instances.insert(piece);
    }
}
