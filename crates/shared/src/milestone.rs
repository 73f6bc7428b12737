//! Milestone definitions
//!
//! A milestone is immutable once loaded. Reloading replaces the whole set.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;

use crate::trigger::Trigger;

/// Namespace this system registers its own entries under
pub const DEFAULT_NAMESPACE: &str = "milestone";

/// Namespace assumed for bare keys coming from the host game
pub const VANILLA_NAMESPACE: &str = "minecraft";

/// Unique identifier for a milestone, optionally `namespace:key` qualified
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MilestoneId(String);

impl MilestoneId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Key the host sees for this milestone. Unqualified ids land in
    /// [`DEFAULT_NAMESPACE`].
    pub fn external_key(&self) -> NamespacedKey {
        NamespacedKey::parse_or(&self.0, DEFAULT_NAMESPACE)
    }
}

impl std::fmt::Display for MilestoneId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Borrow<str> for MilestoneId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for MilestoneId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// A `namespace:key` pair as understood by the host
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NamespacedKey {
    pub namespace: String,
    pub key: String,
}

impl NamespacedKey {
    pub fn new(namespace: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            key: key.into(),
        }
    }

    /// Split on the first `:`; a bare key gets `default_namespace`
    pub fn parse_or(raw: &str, default_namespace: &str) -> Self {
        match raw.split_once(':') {
            Some((namespace, key)) => Self::new(namespace, key),
            None => Self::new(default_namespace, raw),
        }
    }

    pub fn is_own(&self) -> bool {
        self.namespace == DEFAULT_NAMESPACE
    }
}

impl std::fmt::Display for NamespacedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.namespace, self.key)
    }
}

/// Presentation frame of an entry in the client's advancement screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frame {
    Task,
    Goal,
    Challenge,
}

impl Frame {
    pub fn as_str(&self) -> &'static str {
        match self {
            Frame::Task => "task",
            Frame::Goal => "goal",
            Frame::Challenge => "challenge",
        }
    }
}

/// What kind of progression a milestone tracks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MilestoneKind {
    OneTime,
    Counter { max: u32 },
    MultiCondition,
    Hidden,
}

impl MilestoneKind {
    /// Completion threshold. Only counters have one above 1.
    pub fn max_value(&self) -> u32 {
        match self {
            MilestoneKind::Counter { max } => *max,
            _ => 1,
        }
    }

    pub fn is_counter(&self) -> bool {
        matches!(self, MilestoneKind::Counter { .. })
    }

    pub fn frame(&self) -> Frame {
        match self {
            MilestoneKind::OneTime | MilestoneKind::Hidden => Frame::Task,
            MilestoneKind::Counter { .. } => Frame::Goal,
            MilestoneKind::MultiCondition => Frame::Challenge,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            MilestoneKind::OneTime => "ONE_TIME",
            MilestoneKind::Counter { .. } => "COUNTER",
            MilestoneKind::MultiCondition => "MULTI_CONDITION",
            MilestoneKind::Hidden => "HIDDEN",
        }
    }
}

/// How a milestone is shown to players
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MilestoneDisplay {
    pub icon: String,
    pub title: String,
    #[serde(default)]
    pub description: Vec<String>,
}

impl MilestoneDisplay {
    pub fn new(icon: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            icon: icon.into(),
            title: title.into(),
            description: Vec::new(),
        }
    }
}

/// A single loaded milestone definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Milestone {
    pub id: MilestoneId,

    /// Declared parent; may name a milestone that is not loaded
    #[serde(default)]
    pub parent: Option<MilestoneId>,

    pub kind: MilestoneKind,

    pub display: MilestoneDisplay,

    #[serde(default)]
    pub category: Option<String>,

    pub visible: bool,
    pub show_toast: bool,
    pub announce_to_chat: bool,

    #[serde(default)]
    pub trigger: Option<Trigger>,
}

impl Milestone {
    /// Create a new milestone with default presentation flags
    pub fn new(id: impl Into<String>, kind: MilestoneKind, title: impl Into<String>) -> Self {
        Self {
            id: MilestoneId::new(id),
            parent: None,
            kind,
            display: MilestoneDisplay::new("stone", title),
            category: None,
            visible: true,
            show_toast: true,
            announce_to_chat: false,
            trigger: None,
        }
    }

    /// Builder: set parent
    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(MilestoneId::new(parent));
        self
    }

    /// Builder: set icon
    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.display.icon = icon.into();
        self
    }

    /// Builder: set description lines
    pub fn with_description(mut self, lines: Vec<String>) -> Self {
        self.display.description = lines;
        self
    }

    /// Builder: set trigger
    pub fn with_trigger(mut self, trigger: Trigger) -> Self {
        self.trigger = Some(trigger);
        self
    }

    /// Builder: announce completion to chat
    pub fn with_announcement(mut self, announce: bool) -> Self {
        self.announce_to_chat = announce;
        self
    }

    /// Builder: set visibility
    pub fn with_visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    /// Builder: set category
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn max_value(&self) -> u32 {
        self.kind.max_value()
    }
}
