//! Sync Service - reconciles progress with the host's advancement tree
//!
//! Owns no progress. It registers milestone entries with the host and
//! pushes each player's completion state onto them.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

use shared::{Milestone, NamespacedKey, PlayerId, Progress};

use crate::host::{AdvancementHost, COMPLETION_CRITERION};
use crate::mapper::definition_for;
use crate::registration::RegistrationMap;
use crate::resolver::sort_topologically;

/// Result of a registration pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistrationReport {
    pub registered: usize,
    pub failed: Vec<String>,
}

/// Counts from a reconciliation pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub granted: usize,
    pub revoked: usize,
    pub unchanged: usize,
    pub missing: usize,
}

/// What happened to one entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    Granted,
    Revoked,
    Unchanged,
    /// Host has no such entry; skipped
    Missing,
    Failed,
}

impl SyncReport {
    fn record(&mut self, outcome: SyncOutcome) {
        match outcome {
            SyncOutcome::Granted => self.granted += 1,
            SyncOutcome::Revoked => self.revoked += 1,
            SyncOutcome::Unchanged | SyncOutcome::Failed => self.unchanged += 1,
            SyncOutcome::Missing => self.missing += 1,
        }
    }
}

/// Sync Service
pub struct SyncService {
    host: Arc<dyn AdvancementHost>,
    registrations: Arc<RegistrationMap>,
}

impl SyncService {
    pub fn new(host: Arc<dyn AdvancementHost>) -> Self {
        Self {
            host,
            registrations: Arc::new(RegistrationMap::new()),
        }
    }

    /// Read-only view of what is currently registered
    pub fn registrations(&self) -> Arc<RegistrationMap> {
        Arc::clone(&self.registrations)
    }

    /// Replace every registered entry with `milestones`, parents first
    ///
    /// Must not run concurrently with itself. A failing entry is logged
    /// and skipped; its descendants will usually fail after it.
    pub fn register_all<M: std::borrow::Borrow<Milestone>>(&self, milestones: &[M]) -> RegistrationReport {
        for key in self.registrations.keys() {
            if let Err(e) = self.host.unregister_entry(&key) {
                debug!(key = %key, error = %e, "Failed to unregister stale entry");
            }
        }

        let present: HashSet<&str> = milestones.iter().map(|m| m.borrow().id.as_str()).collect();
        let mut fresh = HashMap::with_capacity(milestones.len());
        let mut report = RegistrationReport::default();

        for milestone in sort_topologically(milestones) {
            let milestone = milestone.borrow();
            let key = milestone.id.external_key();
            let parent = match &milestone.parent {
                Some(parent) if present.contains(parent.as_str()) => Some(parent.external_key()),
                Some(parent) => {
                    warn!(id = %milestone.id, parent = %parent, "Parent not loaded, registering as root");
                    None
                }
                None => None,
            };
            let definition = definition_for(milestone, parent.as_ref());

            if let Err(e) = self.host.unregister_entry(&key) {
                debug!(key = %key, error = %e, "Pre-registration cleanup failed");
            }
            match self.host.register_entry(&key, &definition) {
                Ok(()) => {
                    fresh.insert(milestone.id.clone(), key);
                    report.registered += 1;
                }
                Err(e) => {
                    warn!(id = %milestone.id, error = %e, "Failed to register milestone advancement");
                    report.failed.push(milestone.id.to_string());
                }
            }
        }

        self.registrations.replace(fresh);
        info!(
            registered = report.registered,
            failed = report.failed.len(),
            "Registered milestone advancements"
        );
        report
    }

    /// Reconcile every registered entry for `player`
    ///
    /// Entries with no completed record in `progress` are revoked, so a
    /// partial load cannot leave stale completions on the client.
    pub fn sync_all<'a>(&self, player: PlayerId, progress: impl IntoIterator<Item = &'a Progress>) -> SyncReport {
        let completed: HashSet<&str> = progress
            .into_iter()
            .filter(|p| p.completed)
            .map(|p| p.milestone_id.as_str())
            .collect();

        let mut report = SyncReport::default();
        for (id, key) in self.registrations.entries() {
            let outcome = if completed.contains(id.as_str()) {
                self.grant(player, &key)
            } else {
                self.revoke(player, &key)
            };
            report.record(outcome);
        }
        debug!(player = %player, ?report, "Synced advancements");
        report
    }

    /// Push one record's state to its entry
    pub fn sync_one(&self, player: PlayerId, progress: &Progress) -> SyncOutcome {
        let key = self
            .registrations
            .get(progress.milestone_id.as_str())
            .unwrap_or_else(|| progress.milestone_id.external_key());
        if progress.completed {
            self.grant(player, &key)
        } else {
            self.revoke(player, &key)
        }
    }

    fn grant(&self, player: PlayerId, key: &NamespacedKey) -> SyncOutcome {
        let Some(entry) = self.host.lookup_entry(key) else {
            return SyncOutcome::Missing;
        };
        if self.host.entry_state(player, &entry).done {
            return SyncOutcome::Unchanged;
        }
        match self.host.grant_criterion(player, &entry, COMPLETION_CRITERION) {
            Ok(()) => SyncOutcome::Granted,
            Err(e) => {
                warn!(player = %player, key = %key, error = %e, "Failed to grant advancement");
                SyncOutcome::Failed
            }
        }
    }

    fn revoke(&self, player: PlayerId, key: &NamespacedKey) -> SyncOutcome {
        let Some(entry) = self.host.lookup_entry(key) else {
            return SyncOutcome::Missing;
        };
        if !self.host.entry_state(player, &entry).done {
            return SyncOutcome::Unchanged;
        }
        match self.host.revoke_criterion(player, &entry, COMPLETION_CRITERION) {
            Ok(()) => SyncOutcome::Revoked,
            Err(e) => {
                warn!(player = %player, key = %key, error = %e, "Failed to revoke advancement");
                SyncOutcome::Failed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::in_memory::{HostCall, InMemoryHost};
    use shared::{MilestoneId, MilestoneKind};
    use uuid::Uuid;

    fn milestones() -> Vec<Milestone> {
        vec![
            Milestone::new("story:miner", MilestoneKind::Counter { max: 3 }, "Miner").with_parent("story:root"),
            Milestone::new("story:root", MilestoneKind::OneTime, "Root"),
            Milestone::new("first_login", MilestoneKind::OneTime, "Welcome"),
        ]
    }

    fn setup() -> (Arc<InMemoryHost>, SyncService) {
        let host = Arc::new(InMemoryHost::new());
        let service = SyncService::new(host.clone());
        service.register_all(&milestones());
        host.clear_calls();
        (host, service)
    }

    fn done(player: PlayerId, id: &str) -> Progress {
        let mut p = Progress::new(player, "Steve", MilestoneId::new(id));
        p.complete(1, chrono_now());
        p
    }

    fn chrono_now() -> chrono::DateTime<chrono::Utc> {
        chrono::DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    // ============== Registration Tests ==============

    #[test]
    fn test_register_all_parents_first() {
        let host = Arc::new(InMemoryHost::new());
        let service = SyncService::new(host.clone());
        let report = service.register_all(&milestones());

        assert_eq!(report.registered, 3);
        assert!(report.failed.is_empty());
        let registered: Vec<_> = host
            .calls()
            .into_iter()
            .filter_map(|c| match c {
                HostCall::Register(k) => Some(k.to_string()),
                _ => None,
            })
            .collect();
        assert_eq!(registered, vec!["story:root", "story:miner", "milestone:first_login"]);
        assert_eq!(service.registrations().get("first_login"), Some(NamespacedKey::new("milestone", "first_login")));
    }

    #[test]
    fn test_reregistration_replaces_stale_entries() {
        let (host, service) = setup();
        service.register_all(&[Milestone::new("first_login", MilestoneKind::OneTime, "Welcome")]);

        assert_eq!(host.entry_count(), 1);
        assert_eq!(service.registrations().len(), 1);
        assert!(service.registrations().get("story:root").is_none());
    }

    #[test]
    fn test_failed_entry_skipped_not_fatal() {
        let host = Arc::new(InMemoryHost::new());
        host.reject(NamespacedKey::new("story", "root"));
        let service = SyncService::new(host.clone());
        let report = service.register_all(&milestones());

        assert_eq!(report.registered, 1);
        assert_eq!(report.failed, vec!["story:root".to_string(), "story:miner".to_string()]);
        assert!(service.registrations().get("first_login").is_some());
    }

    #[test]
    fn test_orphan_registered_as_root() {
        let host = Arc::new(InMemoryHost::new());
        let service = SyncService::new(host.clone());
        let orphan = Milestone::new("lonely", MilestoneKind::OneTime, "Lonely").with_parent("gone");
        let report = service.register_all(&[orphan]);

        assert_eq!(report.registered, 1);
        let def = host.definition(&NamespacedKey::new("milestone", "lonely")).unwrap();
        assert!(def.get("parent").is_none());
    }

    /// Records what the registration map reports while the host is
    /// mid-registration
    struct ObservingHost {
        inner: InMemoryHost,
        registrations: std::sync::OnceLock<Arc<RegistrationMap>>,
        seen: std::sync::Mutex<Vec<(String, Option<NamespacedKey>)>>,
    }

    impl AdvancementHost for ObservingHost {
        fn register_entry(&self, key: &NamespacedKey, definition: &serde_json::Value) -> Result<(), crate::HostError> {
            if let Some(registrations) = self.registrations.get() {
                self.seen
                    .lock()
                    .unwrap()
                    .push((key.to_string(), registrations.get("quests:dragon")));
            }
            self.inner.register_entry(key, definition)
        }

        fn unregister_entry(&self, key: &NamespacedKey) -> Result<(), crate::HostError> {
            self.inner.unregister_entry(key)
        }

        fn lookup_entry(&self, key: &NamespacedKey) -> Option<crate::EntryHandle> {
            self.inner.lookup_entry(key)
        }

        fn entry_state(&self, player: PlayerId, entry: &crate::EntryHandle) -> crate::EntryState {
            self.inner.entry_state(player, entry)
        }

        fn grant_criterion(&self, player: PlayerId, entry: &crate::EntryHandle, criterion: &str) -> Result<(), crate::HostError> {
            self.inner.grant_criterion(player, entry, criterion)
        }

        fn revoke_criterion(&self, player: PlayerId, entry: &crate::EntryHandle, criterion: &str) -> Result<(), crate::HostError> {
            self.inner.revoke_criterion(player, entry, criterion)
        }
    }

    #[test]
    fn test_reregistration_keeps_previous_map_visible() {
        let host = Arc::new(ObservingHost {
            inner: InMemoryHost::new(),
            registrations: std::sync::OnceLock::new(),
            seen: std::sync::Mutex::new(Vec::new()),
        });
        let service = SyncService::new(host.clone());
        let definitions = vec![
            Milestone::new("first_login", MilestoneKind::OneTime, "Welcome"),
            Milestone::new("quests:dragon", MilestoneKind::OneTime, "Dragon Slayer"),
        ];
        service.register_all(&definitions);
        host.registrations.set(service.registrations()).unwrap();

        service.register_all(&definitions);

        let seen = host.seen.lock().unwrap().clone();
        assert_eq!(seen.len(), 2);
        for (key, dragon) in seen {
            assert_eq!(dragon, Some(NamespacedKey::new("quests", "dragon")), "lost ownership while registering {key}");
        }
        assert_eq!(service.registrations().len(), 2);
    }

    // ============== Reconciliation Tests ==============

    #[test]
    fn test_sync_all_empty_revokes_everything_done() {
        let (host, service) = setup();
        let player = Uuid::new_v4();
        for key in service.registrations().keys() {
            host.set_done(player, key);
        }

        let report = service.sync_all(player, &[]);
        assert_eq!(report.revoked, 3);
        assert_eq!(report.granted, 0);
        assert_eq!(host.revoke_count(), 3);
        assert_eq!(host.grant_count(), 0);
    }

    #[test]
    fn test_sync_all_grants_completed_only() {
        let (host, service) = setup();
        let player = Uuid::new_v4();
        let mut partial = Progress::new(player, "Steve", MilestoneId::new("story:miner"));
        partial.current_count = 2;
        let records = vec![done(player, "story:root"), partial];

        let report = service.sync_all(player, &records);
        assert_eq!(report.granted, 1);
        assert_eq!(report.unchanged, 2);
        assert!(host.is_done(player, &NamespacedKey::new("story", "root")));

        let again = service.sync_all(player, &records);
        assert_eq!(again.granted, 0);
        assert_eq!(again.unchanged, 3);
    }

    #[test]
    fn test_sync_one_and_missing_entry() {
        let (host, service) = setup();
        let player = Uuid::new_v4();

        assert_eq!(service.sync_one(player, &done(player, "first_login")), SyncOutcome::Granted);
        assert!(host.is_done(player, &NamespacedKey::new("milestone", "first_login")));

        let unregistered = done(player, "never_registered");
        assert_eq!(service.sync_one(player, &unregistered), SyncOutcome::Missing);

        let revoked = Progress::new(player, "Steve", MilestoneId::new("first_login"));
        assert_eq!(service.sync_one(player, &revoked), SyncOutcome::Revoked);
    }

    #[test]
    fn test_sync_one_falls_back_to_derived_key() {
        let host = Arc::new(InMemoryHost::new());
        let service = SyncService::new(host.clone());
        host.register_entry(&NamespacedKey::new("milestone", "manual"), &serde_json::json!({}))
            .unwrap();

        let player = Uuid::new_v4();
        assert_eq!(service.sync_one(player, &done(player, "manual")), SyncOutcome::Granted);
    }
}
