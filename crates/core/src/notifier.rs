//! Player notifier - presence and completion announcements
//!
//! Message wording and localization belong to the implementation.

use std::collections::HashSet;
use std::sync::{Mutex, PoisonError, RwLock};

use shared::{Milestone, MilestoneId, PlayerId};

pub trait PlayerNotifier: Send + Sync {
    /// Whether `player` is connected right now
    fn is_online(&self, player: PlayerId) -> bool;

    /// Tell every connected player that `player_name` completed `milestone`
    fn announce_completion(&self, player_name: &str, milestone: &Milestone);
}

/// Nobody is ever online; used by offline tooling
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineNotifier;

impl PlayerNotifier for OfflineNotifier {
    fn is_online(&self, _player: PlayerId) -> bool {
        false
    }

    fn announce_completion(&self, _player_name: &str, _milestone: &Milestone) {}
}

/// Tracks presence explicitly and records announcements
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    online: RwLock<HashSet<PlayerId>>,
    announcements: Mutex<Vec<(String, MilestoneId)>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_online(&self, player: PlayerId, online: bool) {
        let mut players = self.online.write().unwrap_or_else(PoisonError::into_inner);
        if online {
            players.insert(player);
        } else {
            players.remove(&player);
        }
    }

    /// (player name, milestone) pairs in announcement order
    pub fn announcements(&self) -> Vec<(String, MilestoneId)> {
        self.announcements
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl PlayerNotifier for RecordingNotifier {
    fn is_online(&self, player: PlayerId) -> bool {
        self.online
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&player)
    }

    fn announce_completion(&self, player_name: &str, milestone: &Milestone) {
        self.announcements
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((player_name.to_string(), milestone.id.clone()));
    }
}
