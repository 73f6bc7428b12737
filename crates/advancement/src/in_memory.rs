//! In-memory advancement host
//!
//! Keeps the entry tree and per-player completion in a map and records
//! every call. Backs the CLI and the tests.

use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, PoisonError};

use shared::{NamespacedKey, PlayerId};

use crate::host::{AdvancementHost, EntryHandle, EntryState, HostError, COMPLETION_CRITERION};

/// A call made against the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostCall {
    Register(NamespacedKey),
    Unregister(NamespacedKey),
    Grant(PlayerId, NamespacedKey),
    Revoke(PlayerId, NamespacedKey),
}

#[derive(Debug, Default)]
struct HostState {
    entries: HashMap<NamespacedKey, Value>,
    done: HashSet<(PlayerId, NamespacedKey)>,
    rejected: HashSet<NamespacedKey>,
    calls: Vec<HostCall>,
}

/// In-memory [`AdvancementHost`]
///
/// Rejects a definition whose `parent` is not registered yet, the way a
/// real advancement tree does.
#[derive(Debug, Default)]
pub struct InMemoryHost {
    state: Mutex<HostState>,
}

impl InMemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make registration of `key` fail
    pub fn reject(&self, key: NamespacedKey) {
        self.lock().rejected.insert(key);
    }

    /// Mark `key` done for `player` without recording a call
    pub fn set_done(&self, player: PlayerId, key: NamespacedKey) {
        self.lock().done.insert((player, key));
    }

    pub fn is_done(&self, player: PlayerId, key: &NamespacedKey) -> bool {
        self.lock().done.contains(&(player, key.clone()))
    }

    pub fn definition(&self, key: &NamespacedKey) -> Option<Value> {
        self.lock().entries.get(key).cloned()
    }

    pub fn entry_count(&self) -> usize {
        self.lock().entries.len()
    }

    /// Calls made so far, oldest first
    pub fn calls(&self) -> Vec<HostCall> {
        self.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    pub fn grant_count(&self) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| matches!(c, HostCall::Grant(..)))
            .count()
    }

    pub fn revoke_count(&self) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| matches!(c, HostCall::Revoke(..)))
            .count()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HostState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl AdvancementHost for InMemoryHost {
    fn register_entry(&self, key: &NamespacedKey, definition: &Value) -> Result<(), HostError> {
        let mut state = self.lock();
        if state.rejected.contains(key) {
            return Err(HostError::Rejected {
                key: key.to_string(),
                reason: "rejected by host".to_string(),
            });
        }
        if let Some(parent) = definition.get("parent").and_then(Value::as_str) {
            let parent_key = NamespacedKey::parse_or(parent, shared::VANILLA_NAMESPACE);
            if !state.entries.contains_key(&parent_key) {
                return Err(HostError::MissingParent {
                    key: key.to_string(),
                    parent: parent.to_string(),
                });
            }
        }
        state.entries.insert(key.clone(), definition.clone());
        state.calls.push(HostCall::Register(key.clone()));
        Ok(())
    }

    fn unregister_entry(&self, key: &NamespacedKey) -> Result<(), HostError> {
        let mut state = self.lock();
        state.entries.remove(key);
        state.calls.push(HostCall::Unregister(key.clone()));
        Ok(())
    }

    fn lookup_entry(&self, key: &NamespacedKey) -> Option<EntryHandle> {
        self.lock()
            .entries
            .contains_key(key)
            .then(|| EntryHandle::new(key.clone()))
    }

    fn entry_state(&self, player: PlayerId, entry: &EntryHandle) -> EntryState {
        EntryState {
            done: self.is_done(player, entry.key()),
        }
    }

    fn grant_criterion(&self, player: PlayerId, entry: &EntryHandle, criterion: &str) -> Result<(), HostError> {
        if criterion != COMPLETION_CRITERION {
            return Err(HostError::UnknownCriterion {
                key: entry.key().to_string(),
                criterion: criterion.to_string(),
            });
        }
        let mut state = self.lock();
        state.done.insert((player, entry.key().clone()));
        state.calls.push(HostCall::Grant(player, entry.key().clone()));
        Ok(())
    }

    fn revoke_criterion(&self, player: PlayerId, entry: &EntryHandle, criterion: &str) -> Result<(), HostError> {
        if criterion != COMPLETION_CRITERION {
            return Err(HostError::UnknownCriterion {
                key: entry.key().to_string(),
                criterion: criterion.to_string(),
            });
        }
        let mut state = self.lock();
        state.done.remove(&(player, entry.key().clone()));
        state.calls.push(HostCall::Revoke(player, entry.key().clone()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use uuid::Uuid;

    #[test]
    fn test_parent_must_exist() {
        let host = InMemoryHost::new();
        let child = NamespacedKey::new("milestone", "child");
        let err = host
            .register_entry(&child, &json!({"parent": "milestone:root"}))
            .unwrap_err();
        assert!(matches!(err, HostError::MissingParent { .. }));

        host.register_entry(&NamespacedKey::new("milestone", "root"), &json!({})).unwrap();
        host.register_entry(&child, &json!({"parent": "milestone:root"})).unwrap();
        assert_eq!(host.entry_count(), 2);
    }

    #[test]
    fn test_grant_and_revoke_track_state() {
        let host = InMemoryHost::new();
        let key = NamespacedKey::new("milestone", "root");
        let player = Uuid::new_v4();
        host.register_entry(&key, &json!({})).unwrap();

        let entry = host.lookup_entry(&key).unwrap();
        host.grant_criterion(player, &entry, COMPLETION_CRITERION).unwrap();
        assert!(host.entry_state(player, &entry).done);
        host.revoke_criterion(player, &entry, COMPLETION_CRITERION).unwrap();
        assert!(!host.entry_state(player, &entry).done);
        assert_eq!((host.grant_count(), host.revoke_count()), (1, 1));
    }

    #[test]
    fn test_rejected_and_unknown_criterion() {
        let host = InMemoryHost::new();
        let key = NamespacedKey::new("milestone", "bad");
        host.reject(key.clone());
        assert!(host.register_entry(&key, &json!({})).is_err());
        assert!(host.lookup_entry(&key).is_none());

        let ok = NamespacedKey::new("milestone", "ok");
        host.register_entry(&ok, &json!({})).unwrap();
        let entry = host.lookup_entry(&ok).unwrap();
        assert!(host.grant_criterion(Uuid::new_v4(), &entry, "other").is_err());
    }
}
