//! Trigger catalogue
//!
//! Game events a milestone can listen for, and the declarative binding
//! between a milestone and one of them.

use serde::{Deserialize, Serialize};

/// Wildcard that matches any event value
pub const ANY_VALUE: &str = "*";

/// Game event kinds milestones can be bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TriggerEvent {
    Join,
    BlockBreak,
    BlockPlace,
    KillEntity,
    ConsumeItem,
    CraftItem,
    #[serde(other)]
    Unknown,
}

impl TriggerEvent {
    /// Parse a configured trigger type. Unrecognised names become `Unknown`.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "JOIN" => TriggerEvent::Join,
            "BLOCK_BREAK" => TriggerEvent::BlockBreak,
            "BLOCK_PLACE" => TriggerEvent::BlockPlace,
            "KILL_ENTITY" => TriggerEvent::KillEntity,
            "CONSUME_ITEM" => TriggerEvent::ConsumeItem,
            "CRAFT_ITEM" => TriggerEvent::CraftItem,
            _ => TriggerEvent::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerEvent::Join => "JOIN",
            TriggerEvent::BlockBreak => "BLOCK_BREAK",
            TriggerEvent::BlockPlace => "BLOCK_PLACE",
            TriggerEvent::KillEntity => "KILL_ENTITY",
            TriggerEvent::ConsumeItem => "CONSUME_ITEM",
            TriggerEvent::CraftItem => "CRAFT_ITEM",
            TriggerEvent::Unknown => "UNKNOWN",
        }
    }
}

impl std::fmt::Display for TriggerEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Binding of a milestone to a game event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trigger {
    pub event: TriggerEvent,

    /// Material or entity filter; `None` and `"*"` match anything
    #[serde(default)]
    pub value: Option<String>,

    /// Fixed delta per match. Zero means "use the event's own amount".
    #[serde(default)]
    pub progress: u32,
}

impl Trigger {
    pub fn new(event: TriggerEvent) -> Self {
        Self {
            event,
            value: None,
            progress: 0,
        }
    }

    /// Builder: set value filter
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Builder: set fixed progress per match
    pub fn with_progress(mut self, progress: u32) -> Self {
        self.progress = progress;
        self
    }

    /// Whether an event of `event` kind carrying `value` satisfies this trigger
    pub fn matches(&self, event: TriggerEvent, value: Option<&str>) -> bool {
        if self.event != event || event == TriggerEvent::Unknown {
            return false;
        }
        match (self.value.as_deref(), value) {
            (None, _) | (Some(ANY_VALUE), _) => true,
            (Some(expected), Some(actual)) => expected.eq_ignore_ascii_case(actual),
            (Some(_), None) => true,
        }
    }

    /// Delta to apply for a matching event with its own `natural` amount
    pub fn delta(&self, natural: u32) -> u32 {
        if self.progress > 0 {
            self.progress
        } else {
            natural
        }
    }
}
