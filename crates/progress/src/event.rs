//! Events emitted by the progress engine
//!
//! The engine only reports what changed. Persisting, syncing and
//! announcing are the caller's job.

use shared::{PlayerId, Progress, TriggerEvent};

/// A state change on one (player, milestone) record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    /// Milestone went from not-completed to completed by a grant
    Granted { progress: Progress },

    /// Counter moved; `completed` is set when it just reached its maximum
    Advanced { progress: Progress, completed: bool },

    /// Record was reset to the empty state
    Revoked { progress: Progress },
}

impl ProgressEvent {
    /// Record after the change
    pub fn progress(&self) -> &Progress {
        match self {
            ProgressEvent::Granted { progress }
            | ProgressEvent::Advanced { progress, .. }
            | ProgressEvent::Revoked { progress } => progress,
        }
    }

    pub fn into_progress(self) -> Progress {
        match self {
            ProgressEvent::Granted { progress }
            | ProgressEvent::Advanced { progress, .. }
            | ProgressEvent::Revoked { progress } => progress,
        }
    }

    pub fn player(&self) -> PlayerId {
        self.progress().player_id
    }

    /// Whether this change is the moment of completion
    pub fn newly_completed(&self) -> bool {
        match self {
            ProgressEvent::Granted { .. } => true,
            ProgressEvent::Advanced { completed, .. } => *completed,
            ProgressEvent::Revoked { .. } => false,
        }
    }
}

/// A game event as seen by the trigger matcher
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameEvent {
    pub kind: TriggerEvent,

    /// Material or entity involved, if any
    pub value: Option<String>,

    /// How much happened (stack size, etc.); at least 1
    pub amount: u32,
}

impl GameEvent {
    pub fn new(kind: TriggerEvent) -> Self {
        Self {
            kind,
            value: None,
            amount: 1,
        }
    }

    /// Builder: set value
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Builder: set amount, floored at 1
    pub fn with_amount(mut self, amount: u32) -> Self {
        self.amount = amount.max(1);
        self
    }
}
