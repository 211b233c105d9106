//! Building the studio timeline from playout state.
//!
//! Each selected part instance becomes a group `part_group_{id}` whose
//! start is absolute. Pieces sit inside their part's group with offsets
//! relative to it. An autonext is not a timer in the engine: the next
//! part's group is emitted with an absolute start at the current part's
//! planned end, and the gateway reports it back when it starts.

use onair_core::instance::{PartInstance, PieceInstance};
use onair_core::timeline::{
    transform_timeline, TimelineComplete, TimelineEnable, TimelineObject, TimelineTime,
};
use onair_core::types::Timestamp;
use onair_db::cache::PlayoutCache;
use serde_json::{Map, Value};

pub const CLASS_CURRENT_PART: &str = "current_part";
pub const CLASS_NEXT_PART: &str = "next_part";

const PIECE_PRIORITY: i32 = 1;
const ADLIB_PRIORITY: i32 = 2;

pub fn part_group_id(instance: &PartInstance) -> String {
    format!("part_group_{}", instance.id)
}

fn piece_object_id(piece: &PieceInstance) -> String {
    format!("piece_{}", piece.id)
}

/// When the instance started or was taken.
pub fn instance_start(instance: &PartInstance) -> Option<Timestamp> {
    instance
        .timings
        .started_playback
        .or(instance.timings.take)
}

/// The absolute time the current part hands over to an autonext part.
pub fn autonext_time(current: &PartInstance, now: Timestamp) -> Option<Timestamp> {
    let part = &current.part;
    if !part.auto_next {
        return None;
    }
    let duration = part.expected_duration?;
    let start = instance_start(current).unwrap_or(now);
    Some(start + chrono::Duration::milliseconds(duration - part.auto_next_overlap))
}

/// Flat timeline objects for the cache's playlist. Empty when inactive.
pub fn build_timeline_objects(cache: &PlayoutCache, now: Timestamp) -> Vec<TimelineObject> {
    if !cache.playlist().is_active() {
        return Vec::new();
    }
    let Some(current) = cache.current_part_instance() else {
        return Vec::new();
    };

    let mut objects = Vec::new();
    let current_start = instance_start(current).unwrap_or(now);
    push_part(
        &mut objects,
        cache,
        current,
        TimelineTime::at(current_start),
        CLASS_CURRENT_PART,
    );

    if let (Some(next), Some(at)) = (cache.next_part_instance(), autonext_time(current, now)) {
        push_part(&mut objects, cache, next, TimelineTime::at(at), CLASS_NEXT_PART);
    }
    objects
}

fn push_part(
    objects: &mut Vec<TimelineObject>,
    cache: &PlayoutCache,
    instance: &PartInstance,
    start: TimelineTime,
    class: &str,
) {
    let group_id = part_group_id(instance);
    let mut group = TimelineObject::group(
        group_id.clone(),
        TimelineEnable {
            start,
            duration: None,
        },
    );
    group.classes.push(class.to_string());
    group.rundown_id = Some(instance.rundown_id.clone());
    group.part_instance_id = Some(instance.id.clone());
    objects.push(group);

    let mut pieces = cache.piece_instances_of(&instance.id);
    pieces.sort_by(|a, b| {
        a.piece
            .enable
            .start
            .cmp(&b.piece.enable.start)
            .then_with(|| a.id.cmp(&b.id))
    });
    for piece in pieces {
        let mut object = TimelineObject::new(
            piece_object_id(piece),
            piece.piece.source_layer_id.clone(),
            TimelineEnable {
                start: TimelineTime::Absolute(piece.piece.enable.start),
                duration: piece.piece.enable.duration,
            },
        )
        .in_group(group_id.clone())
        .with_content(content_map(&piece.piece.content));
        object.priority = if piece.is_adlibbed() {
            ADLIB_PRIORITY
        } else {
            PIECE_PRIORITY
        };
        object.rundown_id = Some(piece.rundown_id.clone());
        object.part_instance_id = Some(instance.id.clone());
        object.piece_instance_id = Some(piece.id.clone());
        objects.push(object);
    }
}

fn content_map(content: &Value) -> Map<String, Value> {
    match content {
        Value::Object(map) => map.clone(),
        Value::Null => Map::new(),
        other => {
            let mut map = Map::new();
            map.insert("value".into(), other.clone());
            map
        }
    }
}

/// Regenerate the studio timeline held in `cache`.
///
/// An active playlist takes the studio timeline over. An inactive one
/// replaces it with an empty "stop" timeline only if it owned it and no
/// other playlist of the studio is still active; otherwise the timeline
/// is left for the active playlist's next job to supersede. The stored
/// document is replaced only when its content hash changes.
/// Returns whether it was replaced.
pub fn update_studio_timeline(cache: &mut PlayoutCache, now: Timestamp) -> bool {
    let existing = cache.timeline.iter().next().cloned();
    let active = cache.playlist().is_active();
    let owns = existing
        .as_ref()
        .is_some_and(|t| t.playlist_id.as_ref() == Some(&cache.playlist_id));
    if !active && !owns {
        return false;
    }
    if !active && cache.studio_playlists.iter().any(|p| p.is_active()) {
        tracing::debug!(
            studio_id = %cache.studio_id,
            playlist_id = %cache.playlist_id,
            "Another playlist is on air, keeping studio timeline"
        );
        return false;
    }

    let objects = transform_timeline(&build_timeline_objects(cache, now));
    let playlist_id = active.then(|| cache.playlist_id.clone());
    let timeline = TimelineComplete::new(cache.studio_id.clone(), playlist_id, objects, now);

    if let Some(existing) = existing {
        if existing.timeline_hash == timeline.timeline_hash
            && existing.playlist_id == timeline.playlist_id
        {
            return false;
        }
    }

    tracing::debug!(
        studio_id = %cache.studio_id,
        playlist_id = %cache.playlist_id,
        hash = %timeline.timeline_hash,
        "Studio timeline regenerated"
    );
    cache.timeline.insert(timeline);
    true
}
