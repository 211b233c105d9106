//! Device timeline objects and the flat-to-nested transformation.
//!
//! The engine builds a flat list of [`TimelineObject`]s where children
//! point at their parent with `in_group`. [`transform_timeline`] nests
//! them into the shape device gateways consume and injects the callback
//! descriptors gateways echo back on playback start/stop.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::hashing::sha256_hex;
use crate::ids::{PartInstanceId, PieceInstanceId, PlaylistId, RundownId, StudioId};
use crate::types::{Millis, Timestamp};

pub const CALLBACK_PART_STARTED: &str = "partPlaybackStarted";
pub const CALLBACK_PART_STOPPED: &str = "partPlaybackStopped";
pub const CALLBACK_PIECE_STARTED: &str = "piecePlaybackStarted";
pub const CALLBACK_PIECE_STOPPED: &str = "piecePlaybackStopped";

/// Start of an object: absolute epoch millis or an expression such as
/// `"now"` or `"#part_group_x.end - 500"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TimelineTime {
    Absolute(i64),
    Expression(String),
}

impl TimelineTime {
    pub fn now() -> Self {
        Self::Expression("now".to_string())
    }

    pub fn at(time: Timestamp) -> Self {
        Self::Absolute(time.timestamp_millis())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEnable {
    pub start: TimelineTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<Millis>,
}

/// A flat timeline object as produced by the builder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineObject {
    pub id: String,
    pub layer: String,
    pub enable: TimelineEnable,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub in_group: Option<String>,
    #[serde(default)]
    pub is_group: bool,
    #[serde(default)]
    pub classes: Vec<String>,
    #[serde(default)]
    pub content: Map<String, Value>,
    #[serde(default)]
    pub rundown_id: Option<RundownId>,
    #[serde(default)]
    pub part_instance_id: Option<PartInstanceId>,
    #[serde(default)]
    pub piece_instance_id: Option<PieceInstanceId>,
}

impl TimelineObject {
    pub fn new(id: impl Into<String>, layer: impl Into<String>, enable: TimelineEnable) -> Self {
        Self {
            id: id.into(),
            layer: layer.into(),
            enable,
            priority: 0,
            in_group: None,
            is_group: false,
            classes: Vec::new(),
            content: Map::new(),
            rundown_id: None,
            part_instance_id: None,
            piece_instance_id: None,
        }
    }

    pub fn group(id: impl Into<String>, enable: TimelineEnable) -> Self {
        Self {
            is_group: true,
            ..Self::new(id, "", enable)
        }
    }

    pub fn in_group(mut self, group_id: impl Into<String>) -> Self {
        self.in_group = Some(group_id.into());
        self
    }

    pub fn with_content(mut self, content: Map<String, Value>) -> Self {
        self.content = content;
        self
    }
}

/// Correlates a playback report with the instance that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CallbackData {
    Piece {
        rundown_id: RundownId,
        piece_instance_id: PieceInstanceId,
    },
    Part {
        rundown_id: RundownId,
        part_instance_id: PartInstanceId,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedContent {
    #[serde(flatten)]
    pub payload: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub objects: Vec<ResolvedObject>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback_stopped: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback_data: Option<CallbackData>,
}

/// A timeline object with its children nested inside `content.objects`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedObject {
    pub id: String,
    pub layer: String,
    pub enable: TimelineEnable,
    pub priority: i32,
    pub is_group: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub classes: Vec<String>,
    pub content: ResolvedContent,
}

/// The single timeline document of a studio. Each generation replaces the
/// previous one wholesale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineComplete {
    /// One timeline per studio, keyed by the studio id.
    pub id: StudioId,
    /// Playlist that produced this generation; `None` for a stop timeline.
    pub playlist_id: Option<PlaylistId>,
    pub generated: Timestamp,
    pub timeline_hash: String,
    pub objects: Vec<ResolvedObject>,
}

impl TimelineComplete {
    pub fn new(
        studio_id: StudioId,
        playlist_id: Option<PlaylistId>,
        objects: Vec<ResolvedObject>,
        generated: Timestamp,
    ) -> Self {
        Self {
            id: studio_id,
            playlist_id,
            generated,
            timeline_hash: timeline_hash(&objects),
            objects,
        }
    }
}

/// Content hash of a resolved timeline. Equal timelines hash equally.
pub fn timeline_hash(objects: &[ResolvedObject]) -> String {
    sha256_hex(&serde_json::to_vec(objects).unwrap_or_default())
}

/// Nest flat objects into their groups.
///
/// Children may reference a group declared later in the input. Placement
/// repeats over the unplaced set until a pass places nothing. An object is
/// placed only once its parent group is itself placed, so objects in a
/// group cycle or pointing at a missing group are never placed and are
/// dropped. Input order is kept among siblings.
pub fn transform_timeline(objects: &[TimelineObject]) -> Vec<ResolvedObject> {
    let mut groups: HashMap<&str, usize> = HashMap::new();
    for (index, obj) in objects.iter().enumerate() {
        if obj.is_group {
            groups.entry(obj.id.as_str()).or_insert(index);
        }
    }

    let mut placed: HashSet<usize> = HashSet::new();
    let mut roots = Vec::new();
    let mut pending = Vec::new();
    for (index, obj) in objects.iter().enumerate() {
        match obj.in_group {
            None => {
                placed.insert(index);
                roots.push(index);
            }
            Some(_) => pending.push(index),
        }
    }

    let mut children: HashMap<usize, Vec<usize>> = HashMap::new();
    loop {
        let mut progressed = false;
        pending.retain(|&index| {
            let parent = objects[index]
                .in_group
                .as_deref()
                .and_then(|group_id| groups.get(group_id).copied())
                .filter(|parent| placed.contains(parent));
            match parent {
                Some(parent) => {
                    placed.insert(index);
                    children.entry(parent).or_default().push(index);
                    progressed = true;
                    false
                }
                None => true,
            }
        });
        if !progressed {
            break;
        }
    }

    children.values_mut().for_each(|siblings| siblings.sort_unstable());
    roots
        .into_iter()
        .map(|index| resolve(objects, index, &children))
        .collect()
}

fn resolve(
    objects: &[TimelineObject],
    index: usize,
    children: &HashMap<usize, Vec<usize>>,
) -> ResolvedObject {
    let obj = &objects[index];
    let nested = children
        .get(&index)
        .map(|kids| {
            kids.iter()
                .map(|&child| resolve(objects, child, children))
                .collect()
        })
        .unwrap_or_default();

    let (callback, callback_stopped, callback_data) =
        match (&obj.rundown_id, &obj.piece_instance_id, &obj.part_instance_id) {
            (Some(rundown_id), Some(piece_instance_id), _) => (
                Some(CALLBACK_PIECE_STARTED.to_string()),
                Some(CALLBACK_PIECE_STOPPED.to_string()),
                Some(CallbackData::Piece {
                    rundown_id: rundown_id.clone(),
                    piece_instance_id: piece_instance_id.clone(),
                }),
            ),
            (Some(rundown_id), None, Some(part_instance_id)) => (
                Some(CALLBACK_PART_STARTED.to_string()),
                Some(CALLBACK_PART_STOPPED.to_string()),
                Some(CallbackData::Part {
                    rundown_id: rundown_id.clone(),
                    part_instance_id: part_instance_id.clone(),
                }),
            ),
            _ => (None, None, None),
        };

    ResolvedObject {
        id: obj.id.clone(),
        layer: obj.layer.clone(),
        enable: obj.enable.clone(),
        priority: obj.priority,
        is_group: obj.is_group,
        classes: obj.classes.clone(),
        content: ResolvedContent {
            payload: obj.content.clone(),
            objects: nested,
            callback,
            callback_stopped,
            callback_data,
        },
    }
}
