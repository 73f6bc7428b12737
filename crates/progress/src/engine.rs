//! Progress Engine - per-player progress state machine
//!
//! Owns the in-memory progress map for connected players. Every mutating
//! call returns the event it caused (or `None` for a no-op) and never does
//! I/O itself.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;

use shared::{
    Milestone, MilestoneId, MilestoneKind, MilestoneRegistry, PlayerId, Progress,
    UNKNOWN_PLAYER_NAME,
};

use crate::event::ProgressEvent;

/// One connected player's records
#[derive(Debug)]
pub struct PlayerSession {
    name: String,
    records: DashMap<MilestoneId, Progress>,
}

impl PlayerSession {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            records: DashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Progress Engine
///
/// Reads milestone definitions from the shared registry; writes only its
/// own session map.
#[derive(Debug)]
pub struct ProgressEngine {
    milestones: Arc<MilestoneRegistry>,
    sessions: DashMap<PlayerId, PlayerSession>,
}

impl ProgressEngine {
    /// Create a new engine over `milestones`
    pub fn new(milestones: Arc<MilestoneRegistry>) -> Self {
        Self {
            milestones,
            sessions: DashMap::new(),
        }
    }

    pub fn milestones(&self) -> &Arc<MilestoneRegistry> {
        &self.milestones
    }

    /// Mark completed. No-op for unknown or already completed milestones.
    pub fn grant(&self, player: PlayerId, milestone_id: &str) -> Option<ProgressEvent> {
        self.grant_at(player, milestone_id, Utc::now())
    }

    /// [`grant`](Self::grant) with an explicit completion time
    pub fn grant_at(
        &self,
        player: PlayerId,
        milestone_id: &str,
        now: DateTime<Utc>,
    ) -> Option<ProgressEvent> {
        let milestone = self.milestones.get(milestone_id)?;
        self.with_record(player, &milestone.id, |record| {
            if record.completed {
                return None;
            }
            record.complete(milestone.max_value(), now);
            Some(ProgressEvent::Granted {
                progress: record.clone(),
            })
        })
    }

    /// Reset to empty. Always reports a change, even for unknown ids.
    pub fn revoke(&self, player: PlayerId, milestone_id: &str) -> ProgressEvent {
        let id = self
            .milestones
            .get(milestone_id)
            .map(|m| m.id.clone())
            .unwrap_or_else(|| MilestoneId::new(milestone_id));
        self.with_record(player, &id, |record| {
            record.reset();
            ProgressEvent::Revoked {
                progress: record.clone(),
            }
        })
    }

    /// Move a counter by `amount`, clamped to `[0, max]`
    ///
    /// A positive amount on a one-time milestone is a grant. Multi-condition
    /// and hidden milestones only complete through a grant.
    pub fn add_progress(&self, player: PlayerId, milestone_id: &str, amount: i64) -> Option<ProgressEvent> {
        self.add_progress_at(player, milestone_id, amount, Utc::now())
    }

    /// [`add_progress`](Self::add_progress) with an explicit clock
    pub fn add_progress_at(
        &self,
        player: PlayerId,
        milestone_id: &str,
        amount: i64,
        now: DateTime<Utc>,
    ) -> Option<ProgressEvent> {
        let milestone = self.milestones.get(milestone_id)?;
        match milestone.kind {
            MilestoneKind::Counter { max } => self.advance_counter(player, &milestone, max, amount, now),
            MilestoneKind::OneTime if amount > 0 => self.grant_at(player, milestone_id, now),
            MilestoneKind::OneTime | MilestoneKind::MultiCondition | MilestoneKind::Hidden => None,
        }
    }

    fn advance_counter(
        &self,
        player: PlayerId,
        milestone: &Milestone,
        max: u32,
        amount: i64,
        now: DateTime<Utc>,
    ) -> Option<ProgressEvent> {
        self.with_record(player, &milestone.id, |record| {
            if record.completed {
                return None;
            }
            let next = (i64::from(record.current_count).saturating_add(amount)).clamp(0, i64::from(max)) as u32;
            if next == record.current_count {
                return None;
            }
            record.current_count = next;
            let completed = next >= max;
            if completed {
                record.complete(max, now);
            }
            Some(ProgressEvent::Advanced {
                progress: record.clone(),
                completed,
            })
        })
    }

    /// Current snapshot, or `None` if never created
    pub fn get_progress(&self, player: PlayerId, milestone_id: &str) -> Option<Progress> {
        let session = self.sessions.get(&player)?;
        let record = session.records.get(milestone_id)?;
        Some(record.clone())
    }

    /// Install a loaded session
    ///
    /// Records created while the load was in flight are newer than what
    /// storage returned and are kept.
    pub fn attach_session(
        &self,
        player: PlayerId,
        name: &str,
        loaded: HashMap<MilestoneId, Progress>,
    ) -> Vec<Progress> {
        let mut session = self
            .sessions
            .entry(player)
            .or_insert_with(|| PlayerSession::new(name));
        session.name = shared::truncate_name(name);
        let session = session.downgrade();
        for (id, progress) in loaded {
            session.records.entry(id).or_insert(progress);
        }
        session.records.iter().map(|r| r.value().clone()).collect()
    }

    /// Remove a session, returning its records
    pub fn detach_session(&self, player: PlayerId) -> Option<Vec<Progress>> {
        let (_, session) = self.sessions.remove(&player)?;
        Some(session.records.into_iter().map(|(_, p)| p).collect())
    }

    /// Copy of every record in a session
    pub fn session_snapshot(&self, player: PlayerId) -> Option<Vec<Progress>> {
        let session = self.sessions.get(&player)?;
        Some(session.records.iter().map(|r| r.value().clone()).collect())
    }

    pub fn player_name(&self, player: PlayerId) -> Option<String> {
        self.sessions.get(&player).map(|s| s.name.clone())
    }

    pub fn is_loaded(&self, player: PlayerId) -> bool {
        self.sessions.contains_key(&player)
    }

    pub fn loaded_players(&self) -> Vec<PlayerId> {
        self.sessions.iter().map(|s| *s.key()).collect()
    }

    /// Run `f` on the (player, milestone) record, creating both lazily
    fn with_record<T>(&self, player: PlayerId, id: &MilestoneId, f: impl FnOnce(&mut Progress) -> T) -> T {
        let session = self
            .sessions
            .entry(player)
            .or_insert_with(|| PlayerSession::new(UNKNOWN_PLAYER_NAME))
            .downgrade();
        let mut record = session
            .records
            .entry(id.clone())
            .or_insert_with(|| Progress::new(player, &session.name, id.clone()));
        f(record.value_mut())
    }
}
