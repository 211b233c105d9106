//! The on-air unit: an ordered group of rundowns with one current/next
//! position.

use serde::{Deserialize, Serialize};

use crate::ids::{ActivationId, PartInstanceId, PlaylistId, RundownId, StudioId};
use crate::types::Timestamp;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RundownPlaylist {
    pub id: PlaylistId,
    pub external_id: String,
    pub studio_id: StudioId,
    pub name: String,
    /// Rundowns in running order.
    pub rundown_ids: Vec<RundownId>,
    /// Unset while inactive. A fresh id is minted on every activation.
    pub activation_id: Option<ActivationId>,
    #[serde(default)]
    pub rehearsal: bool,
    pub current_part_instance_id: Option<PartInstanceId>,
    pub next_part_instance_id: Option<PartInstanceId>,
    pub previous_part_instance_id: Option<PartInstanceId>,
    /// The operator chose the next part explicitly.
    #[serde(default)]
    pub next_part_manual: bool,
    pub started_playback: Option<Timestamp>,
    pub last_take_time: Option<Timestamp>,
    pub created_at: Timestamp,
    pub modified_at: Timestamp,
}

/// Top-level state machine state of a playlist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaylistState {
    Inactive,
    Active { rehearsal: bool },
}

impl RundownPlaylist {
    pub fn new(
        id: PlaylistId,
        external_id: impl Into<String>,
        studio_id: StudioId,
        name: impl Into<String>,
        now: Timestamp,
    ) -> Self {
        Self {
            id,
            external_id: external_id.into(),
            studio_id,
            name: name.into(),
            rundown_ids: Vec::new(),
            activation_id: None,
            rehearsal: false,
            current_part_instance_id: None,
            next_part_instance_id: None,
            previous_part_instance_id: None,
            next_part_manual: false,
            started_playback: None,
            last_take_time: None,
            created_at: now,
            modified_at: now,
        }
    }

    pub fn state(&self) -> PlaylistState {
        match self.activation_id {
            Some(_) => PlaylistState::Active {
                rehearsal: self.rehearsal,
            },
            None => PlaylistState::Inactive,
        }
    }

    pub fn is_active(&self) -> bool {
        self.activation_id.is_some()
    }

    /// Active and not in rehearsal.
    pub fn is_on_air(&self) -> bool {
        self.state() == PlaylistState::Active { rehearsal: false }
    }

    pub fn clear_pointers(&mut self) {
        self.current_part_instance_id = None;
        self.next_part_instance_id = None;
        self.previous_part_instance_id = None;
        self.next_part_manual = false;
    }

    /// Whether `id` is the current or next instance.
    pub fn is_selected(&self, id: &PartInstanceId) -> bool {
        self.current_part_instance_id.as_ref() == Some(id)
            || self.next_part_instance_id.as_ref() == Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn playlist() -> RundownPlaylist {
        RundownPlaylist::new(
            PlaylistId::new("pl"),
            "ext",
            StudioId::new("studio"),
            "Evening news",
            chrono::Utc::now(),
        )
    }

    #[test]
    fn state_follows_activation_id() {
        let mut pl = playlist();
        assert_eq!(pl.state(), PlaylistState::Inactive);

        pl.activation_id = Some(ActivationId::new("a1"));
        pl.rehearsal = true;
        assert_eq!(pl.state(), PlaylistState::Active { rehearsal: true });
        assert!(!pl.is_on_air());

        pl.rehearsal = false;
        assert!(pl.is_on_air());
    }

    #[test]
    fn clear_pointers_resets_selection() {
        let mut pl = playlist();
        pl.current_part_instance_id = Some(PartInstanceId::new("c"));
        pl.next_part_instance_id = Some(PartInstanceId::new("n"));
        pl.next_part_manual = true;

        assert!(pl.is_selected(&PartInstanceId::new("n")));
        pl.clear_pointers();
        assert!(pl.current_part_instance_id.is_none());
        assert!(pl.next_part_instance_id.is_none());
        assert!(!pl.next_part_manual);
    }
}
