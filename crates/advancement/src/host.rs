//! Advancement Host - the external UI subsystem
//!
//! The game server owns the real advancement tree. This trait is the
//! narrow surface the sync service needs from it.

use serde_json::Value;
use thiserror::Error;

use shared::{NamespacedKey, PlayerId};

/// Criterion every milestone entry is completed through
pub const COMPLETION_CRITERION: &str = "completed";

/// Errors reported by the host
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    #[error("Host rejected entry {key}: {reason}")]
    Rejected { key: String, reason: String },

    #[error("Entry {key} references missing parent {parent}")]
    MissingParent { key: String, parent: String },

    #[error("Unknown criterion '{criterion}' on {key}")]
    UnknownCriterion { key: String, criterion: String },
}

/// Handle to an entry that exists in the host's tree
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntryHandle {
    key: NamespacedKey,
}

impl EntryHandle {
    pub fn new(key: NamespacedKey) -> Self {
        Self { key }
    }

    pub fn key(&self) -> &NamespacedKey {
        &self.key
    }
}

/// A player's state on one entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EntryState {
    pub done: bool,
}

/// Host-side advancement operations
///
/// Registration calls happen on a single writer context; per-player calls
/// on that player's owner context.
pub trait AdvancementHost: Send + Sync {
    /// Add an entry built from `definition`
    fn register_entry(&self, key: &NamespacedKey, definition: &Value) -> Result<(), HostError>;

    /// Remove an entry; removing an absent entry is not an error
    fn unregister_entry(&self, key: &NamespacedKey) -> Result<(), HostError>;

    fn lookup_entry(&self, key: &NamespacedKey) -> Option<EntryHandle>;

    fn entry_state(&self, player: PlayerId, entry: &EntryHandle) -> EntryState;

    fn grant_criterion(&self, player: PlayerId, entry: &EntryHandle, criterion: &str) -> Result<(), HostError>;

    fn revoke_criterion(&self, player: PlayerId, entry: &EntryHandle, criterion: &str) -> Result<(), HostError>;
}
