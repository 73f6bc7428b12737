//! Per-player progress records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::milestone::MilestoneId;

/// Stable player identity
pub type PlayerId = Uuid;

/// Longest player name the storage layer keeps
pub const MAX_PLAYER_NAME_LEN: usize = 16;

/// Name used when a record is created before the player's name is known
pub const UNKNOWN_PLAYER_NAME: &str = "Unknown";

/// One player's progress on one milestone
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    pub player_id: PlayerId,
    pub player_name: String,
    pub milestone_id: MilestoneId,
    pub current_count: u32,
    pub completed: bool,
    pub completed_time: Option<DateTime<Utc>>,
}

impl Progress {
    /// Create an empty record
    pub fn new(player_id: PlayerId, player_name: &str, milestone_id: MilestoneId) -> Self {
        Self {
            player_id,
            player_name: truncate_name(player_name),
            milestone_id,
            current_count: 0,
            completed: false,
            completed_time: None,
        }
    }

    /// Mark completed at `at`, setting the counter to `max`
    pub fn complete(&mut self, max: u32, at: DateTime<Utc>) {
        self.current_count = max;
        self.completed = true;
        self.completed_time = Some(at);
    }

    /// Back to the empty state
    pub fn reset(&mut self) {
        self.current_count = 0;
        self.completed = false;
        self.completed_time = None;
    }

    /// Whole-number percentage of `max`, capped at 100
    pub fn percent(&self, max: u32) -> u32 {
        if self.completed {
            return 100;
        }
        if max == 0 {
            return 0;
        }
        ((u64::from(self.current_count) * 100 / u64::from(max)).min(100)) as u32
    }
}

/// Clip a name to the storage width without splitting a character
pub fn truncate_name(name: &str) -> String {
    name.chars().take(MAX_PLAYER_NAME_LEN).collect()
}
