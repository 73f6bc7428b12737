//! Milestone Service - the facade the game server and admin tools talk to
//!
//! Progress changes flow engine → persistence queue → sync service →
//! notifier. Mutations are expected on the player's owner context; the
//! service itself only hops contexts when resuming after storage I/O and
//! when scheduling registration on the global context.

use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use advancement::{AdvancementHost, SyncOutcome, SyncService};
use filter::{FilterPolicy, OutboundFilter};
use progress::{GameEvent, ProgressEngine, ProgressEvent, TriggerAction, TriggerMatcher};
use shared::{Milestone, MilestoneRegistry, PlayerId, Progress, UnknownMilestoneError};
use storage::ProgressRepository;

use crate::error::Result;
use crate::notifier::PlayerNotifier;
use crate::persistence::PersistenceQueue;
use crate::scheduler::{resume_on_player, Scheduler};

/// Milestone Service
pub struct MilestoneService {
    milestones: Arc<MilestoneRegistry>,
    engine: ProgressEngine,
    matcher: TriggerMatcher,
    sync: SyncService,
    filter: Arc<OutboundFilter>,
    repository: Arc<dyn ProgressRepository>,
    persistence: PersistenceQueue,
    scheduler: Arc<dyn Scheduler>,
    notifier: Arc<dyn PlayerNotifier>,
}

impl MilestoneService {
    /// Wire a service over an initialized repository
    ///
    /// Starts the persistence worker, so a tokio runtime must be running.
    pub fn new(
        repository: Arc<dyn ProgressRepository>,
        host: Arc<dyn AdvancementHost>,
        scheduler: Arc<dyn Scheduler>,
        notifier: Arc<dyn PlayerNotifier>,
    ) -> Self {
        let milestones = Arc::new(MilestoneRegistry::new());
        let sync = SyncService::new(host);
        let filter = Arc::new(OutboundFilter::with_policy(FilterPolicy::default()));

        Self {
            engine: ProgressEngine::new(Arc::clone(&milestones)),
            milestones,
            matcher: TriggerMatcher::new(),
            sync,
            filter,
            persistence: PersistenceQueue::start(Arc::clone(&repository)),
            repository,
            scheduler,
            notifier,
        }
    }

    // ========================================
    // Milestone definitions
    // ========================================

    /// Replace the loaded milestones and filter policy
    ///
    /// Host registration, followed by a full sync of every loaded online
    /// player, is scheduled on the global context.
    pub fn reload(self: &Arc<Self>, milestones: Vec<Milestone>, policy: FilterPolicy, debug: bool) -> Result<()> {
        let count = milestones.len();
        self.milestones.replace_all(milestones);
        self.filter.update_policy(policy, debug);

        let service = Arc::clone(self);
        self.scheduler.run_global(Box::new(move || service.register_and_resync()))?;
        info!(milestones = count, "Milestones reloaded");
        Ok(())
    }

    fn register_and_resync(&self) {
        let report = self.sync.register_all(&self.milestones.all());
        if !report.failed.is_empty() {
            warn!(failed = ?report.failed, "Some milestones were not registered with the host");
        }
        self.filter
            .update_owned(self.sync.registrations().keys(), self.milestones.titles());
        for player in self.engine.loaded_players() {
            if !self.notifier.is_online(player) {
                continue;
            }
            if let Some(records) = self.engine.session_snapshot(player) {
                self.sync.sync_all(player, &records);
            }
        }
    }

    /// Add or replace one definition; the host sees it at the next reload
    pub fn register_milestone(&self, milestone: Milestone) {
        debug!(id = %milestone.id, "Registered milestone");
        self.milestones.register(milestone);
    }

    pub fn get_milestone(&self, id: &str) -> Option<Arc<Milestone>> {
        self.milestones.get(id)
    }

    /// Like [`get_milestone`](Self::get_milestone), failing for unknown ids
    pub fn require_milestone(&self, id: &str) -> Result<Arc<Milestone>> {
        self.milestones.get(id).ok_or_else(|| {
            UnknownMilestoneError {
                milestone_id: id.to_string(),
                loaded: self.milestones.len(),
            }
            .into()
        })
    }

    /// Every loaded milestone in load order
    pub fn all_milestones(&self) -> Vec<Arc<Milestone>> {
        self.milestones.all()
    }

    pub fn clear_milestones(&self) {
        self.milestones.clear();
    }

    // ========================================
    // Progress
    // ========================================

    /// Complete a milestone; `false` when nothing changed
    pub fn grant(&self, player: PlayerId, milestone_id: &str) -> bool {
        self.apply(self.engine.grant(player, milestone_id))
    }

    /// Reset a milestone; always reported as a change
    pub fn revoke(&self, player: PlayerId, milestone_id: &str) {
        self.on_progress_updated(&self.engine.revoke(player, milestone_id));
    }

    /// Move a counter; `false` when nothing changed
    pub fn add_progress(&self, player: PlayerId, milestone_id: &str, amount: i64) -> bool {
        self.apply(self.engine.add_progress(player, milestone_id, amount))
    }

    pub fn get_progress(&self, player: PlayerId, milestone_id: &str) -> Option<Progress> {
        self.engine.get_progress(player, milestone_id)
    }

    /// Route a game event through the trigger bindings; returns the
    /// number of records that changed
    pub fn handle_event(&self, player: PlayerId, event: &GameEvent) -> usize {
        let mut changed = 0;
        for action in self.matcher.match_event(&self.milestones.all(), event) {
            let applied = match action {
                TriggerAction::AddProgress { milestone_id, amount } => {
                    self.add_progress(player, milestone_id.as_str(), i64::from(amount))
                }
                TriggerAction::Grant { milestone_id } => self.grant(player, milestone_id.as_str()),
            };
            if applied {
                changed += 1;
            }
        }
        changed
    }

    fn apply(&self, event: Option<ProgressEvent>) -> bool {
        match event {
            Some(event) => {
                self.on_progress_updated(&event);
                true
            }
            None => false,
        }
    }

    /// Persist, sync and announce one change
    fn on_progress_updated(&self, event: &ProgressEvent) {
        let progress = event.progress();
        self.persistence.enqueue(progress.clone());

        let player = progress.player_id;
        if !self.notifier.is_online(player) {
            return;
        }
        if self.sync.sync_one(player, progress) == SyncOutcome::Missing {
            debug!(player = %player, milestone = %progress.milestone_id, "No host entry to sync");
        }
        if event.newly_completed() {
            if let Some(milestone) = self.milestones.get(progress.milestone_id.as_str()) {
                if milestone.announce_to_chat {
                    self.notifier.announce_completion(&progress.player_name, &milestone);
                }
            }
        }
    }

    // ========================================
    // Player sessions
    // ========================================

    /// Load a player's records, install them on the owner context and,
    /// if the player is online, sync their advancements
    ///
    /// Returns the number of records in the session.
    pub async fn load_player_data(self: &Arc<Self>, player: PlayerId, name: &str) -> Result<usize> {
        // a save queued by an earlier unload must land before the read
        self.persistence.flush().await;
        let loaded = self.repository.load_player_progress(player).await?;
        let service = Arc::clone(self);
        let name = name.to_string();
        resume_on_player(self.scheduler.as_ref(), player, move || {
            let records = service.engine.attach_session(player, &name, loaded);
            if service.notifier.is_online(player) {
                service.sync.sync_all(player, &records);
            }
            records.len()
        })
        .await
    }

    /// Fire-and-forget [`load_player_data`](Self::load_player_data)
    pub fn spawn_load(self: &Arc<Self>, player: PlayerId, name: &str) -> JoinHandle<()> {
        let service = Arc::clone(self);
        let name = name.to_string();
        tokio::spawn(async move {
            match service.load_player_data(player, &name).await {
                Ok(records) => debug!(player = %player, records, "Player data loaded"),
                Err(e) => warn!(player = %player, error = %e, "Failed to load player data"),
            }
        })
    }

    /// Queue one batched save of the session and drop it from memory
    pub fn unload_player_data(&self, player: PlayerId) {
        if let Some(records) = self.engine.detach_session(player) {
            debug!(player = %player, records = records.len(), "Unloading player data");
            self.persistence.enqueue_all(records);
        }
    }

    /// Queue one batched save of the session, keeping it loaded
    pub fn save_player_data(&self, player: PlayerId) {
        if let Some(records) = self.engine.session_snapshot(player) {
            self.persistence.enqueue_all(records);
        }
    }

    pub fn is_loaded(&self, player: PlayerId) -> bool {
        self.engine.is_loaded(player)
    }

    // ========================================
    // Lifecycle
    // ========================================

    /// Wait for every queued write
    pub async fn flush(&self) {
        self.persistence.flush().await;
    }

    /// Save and unload every session, drain writes, close the repository
    pub async fn shutdown(&self) {
        for player in self.engine.loaded_players() {
            self.unload_player_data(player);
        }
        self.persistence.shutdown().await;
        self.repository.shutdown().await;
        info!(
            written = self.persistence.written(),
            failed = self.persistence.failed_writes(),
            "Milestone service stopped"
        );
    }

    // ========================================
    // Accessors
    // ========================================

    /// Outbound filter for the network layer
    pub fn filter(&self) -> Arc<OutboundFilter> {
        Arc::clone(&self.filter)
    }

    pub fn sync(&self) -> &SyncService {
        &self.sync
    }

    pub fn repository(&self) -> Arc<dyn ProgressRepository> {
        Arc::clone(&self.repository)
    }

    pub fn persistence(&self) -> &PersistenceQueue {
        &self.persistence
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServiceError;
    use crate::notifier::RecordingNotifier;
    use crate::scheduler::{InlineScheduler, MainThreadScheduler};
    use advancement::InMemoryHost;
    use filter::{AddedEntries, AddedEntry, AdvancementsMessage, FilterVerdict, OutboundMessage};
    use shared::{FilterMode, MilestoneId, MilestoneKind, NamespacedKey, Trigger, TriggerEvent};
    use storage::InMemoryRepository;
    use uuid::Uuid;

    struct Fixture {
        repo: InMemoryRepository,
        host: Arc<InMemoryHost>,
        notifier: Arc<RecordingNotifier>,
        service: Arc<MilestoneService>,
    }

    fn milestones() -> Vec<Milestone> {
        vec![
            Milestone::new("first_login", MilestoneKind::OneTime, "Welcome")
                .with_announcement(true)
                .with_trigger(Trigger::new(TriggerEvent::Join)),
            Milestone::new("miner", MilestoneKind::Counter { max: 3 }, "Miner")
                .with_parent("first_login")
                .with_trigger(Trigger::new(TriggerEvent::BlockBreak).with_value("stone")),
            Milestone::new("quests:dragon", MilestoneKind::OneTime, "Dragon Slayer"),
        ]
    }

    fn key(id: &str) -> NamespacedKey {
        MilestoneId::new(id).external_key()
    }

    fn fixture_with(scheduler: Arc<dyn Scheduler>) -> Fixture {
        let repo = InMemoryRepository::new();
        let host = Arc::new(InMemoryHost::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let service = Arc::new(MilestoneService::new(
            Arc::new(repo.clone()),
            host.clone(),
            scheduler,
            notifier.clone(),
        ));
        service
            .reload(milestones(), FilterPolicy::new(FilterMode::Hybrid), false)
            .unwrap();
        host.clear_calls();
        Fixture {
            repo,
            host,
            notifier,
            service,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(Arc::new(InlineScheduler))
    }

    async fn online(fx: &Fixture, name: &str) -> PlayerId {
        let player = Uuid::new_v4();
        fx.notifier.set_online(player, true);
        fx.service.load_player_data(player, name).await.unwrap();
        player
    }

    // ============== Progress Tests ==============

    #[tokio::test]
    async fn test_grant_online_syncs_persists_and_announces() {
        let fx = fixture();
        let player = online(&fx, "Steve").await;

        assert!(fx.service.grant(player, "first_login"));
        assert!(fx.host.is_done(player, &key("first_login")));

        fx.service.flush().await;
        assert!(fx.repo.get(player, "first_login").unwrap().completed);
        assert_eq!(
            fx.notifier.announcements(),
            vec![("Steve".to_string(), MilestoneId::new("first_login"))]
        );

        assert!(!fx.service.grant(player, "first_login"));
        assert_eq!(fx.notifier.announcements().len(), 1);
        assert_eq!(fx.host.grant_count(), 1);
    }

    #[tokio::test]
    async fn test_offline_player_persisted_not_synced() {
        let fx = fixture();
        let player = Uuid::new_v4();

        assert!(fx.service.grant(player, "first_login"));
        fx.service.flush().await;

        assert_eq!(fx.host.grant_count(), 0);
        assert!(fx.notifier.announcements().is_empty());
        let stored = fx.repo.get(player, "first_login").unwrap();
        assert_eq!(stored.player_name, "Unknown");
    }

    #[tokio::test]
    async fn test_counter_completes_through_events() {
        let fx = fixture();
        let player = online(&fx, "Alex").await;
        let event = GameEvent::new(TriggerEvent::BlockBreak).with_value("STONE");

        assert_eq!(fx.service.handle_event(player, &event), 1);
        assert_eq!(fx.service.handle_event(player, &event), 1);
        assert!(!fx.host.is_done(player, &key("miner")));
        assert_eq!(fx.service.handle_event(player, &event), 1);

        let progress = fx.service.get_progress(player, "miner").unwrap();
        assert!(progress.completed);
        assert_eq!(progress.current_count, 3);
        assert!(fx.host.is_done(player, &key("miner")));
        // miner does not announce
        assert!(fx.notifier.announcements().is_empty());

        assert_eq!(fx.service.handle_event(player, &event), 0);
    }

    #[tokio::test]
    async fn test_join_event_grants_one_time() {
        let fx = fixture();
        let player = online(&fx, "Alex").await;

        assert_eq!(fx.service.handle_event(player, &GameEvent::new(TriggerEvent::Join)), 1);
        assert!(fx.service.get_progress(player, "first_login").unwrap().completed);
    }

    #[tokio::test]
    async fn test_revoke_resets_and_syncs() {
        let fx = fixture();
        let player = online(&fx, "Steve").await;
        fx.service.add_progress(player, "miner", 3);
        fx.service.revoke(player, "miner");
        fx.service.flush().await;

        assert!(!fx.host.is_done(player, &key("miner")));
        assert_eq!(fx.host.revoke_count(), 1);
        let stored = fx.repo.get(player, "miner").unwrap();
        assert_eq!(stored.current_count, 0);
        assert!(!stored.completed);
    }

    #[tokio::test]
    async fn test_require_milestone_unknown() {
        let fx = fixture();
        assert!(fx.service.require_milestone("miner").is_ok());
        assert!(matches!(
            fx.service.require_milestone("nope"),
            Err(ServiceError::UnknownMilestone(_))
        ));
    }

    #[tokio::test]
    async fn test_register_and_clear_definitions() {
        let fx = fixture();
        fx.service
            .register_milestone(Milestone::new("extra", MilestoneKind::OneTime, "Extra"));
        assert_eq!(fx.service.all_milestones().len(), 4);
        assert!(fx.service.get_milestone("extra").is_some());

        fx.service.clear_milestones();
        assert!(fx.service.all_milestones().is_empty());
        assert!(!fx.service.grant(Uuid::new_v4(), "miner"));
    }

    // ============== Session Tests ==============

    #[tokio::test]
    async fn test_load_syncs_stored_state() {
        let fx = fixture();
        let player = Uuid::new_v4();
        let mut stored = Progress::new(player, "Steve", MilestoneId::new("first_login"));
        stored.complete(1, chrono::Utc::now());
        fx.repo.save_player_progress(&stored).await.unwrap();

        fx.notifier.set_online(player, true);
        assert_eq!(fx.service.load_player_data(player, "Steve").await.unwrap(), 1);

        assert!(fx.service.is_loaded(player));
        assert!(fx.host.is_done(player, &key("first_login")));
        assert_eq!(fx.host.grant_count(), 1);
    }

    #[tokio::test]
    async fn test_load_offline_leaves_host_alone() {
        let fx = fixture();
        let player = Uuid::new_v4();
        fx.service.load_player_data(player, "Steve").await.unwrap();

        assert!(fx.service.is_loaded(player));
        assert!(fx.host.calls().is_empty());
    }

    #[tokio::test]
    async fn test_unload_saves_batch_and_forgets() {
        let fx = fixture();
        let player = online(&fx, "Steve").await;
        fx.service.add_progress(player, "miner", 2);
        fx.service.flush().await;
        let writes_before = fx.repo.write_count();

        fx.service.unload_player_data(player);
        fx.service.flush().await;

        assert_eq!(fx.repo.write_count(), writes_before + 1);
        assert_eq!(fx.repo.get(player, "miner").unwrap().current_count, 2);
        assert!(!fx.service.is_loaded(player));
        assert!(fx.service.get_progress(player, "miner").is_none());
    }

    #[tokio::test]
    async fn test_reconnect_sees_queued_unload_save() {
        let fx = fixture();
        let player = online(&fx, "Steve").await;
        fx.service.add_progress(player, "miner", 2);

        fx.service.unload_player_data(player);
        fx.service.load_player_data(player, "Steve").await.unwrap();

        assert_eq!(fx.service.get_progress(player, "miner").unwrap().current_count, 2);
        fx.service.add_progress(player, "miner", 1);
        fx.service.flush().await;
        let stored = fx.repo.get(player, "miner").unwrap();
        assert_eq!(stored.current_count, 3);
        assert!(stored.completed);
    }

    #[tokio::test]
    async fn test_reload_resyncs_online_players() {
        let fx = fixture();
        let player = Uuid::new_v4();
        fx.service.load_player_data(player, "Steve").await.unwrap();
        fx.service.grant(player, "first_login");
        assert!(!fx.host.is_done(player, &key("first_login")));

        fx.notifier.set_online(player, true);
        fx.service
            .reload(milestones(), FilterPolicy::new(FilterMode::Hybrid), false)
            .unwrap();
        assert!(fx.host.is_done(player, &key("first_login")));
    }

    #[tokio::test]
    async fn test_shutdown_persists_loaded_sessions() {
        let fx = fixture();
        let player = online(&fx, "Steve").await;
        fx.service.add_progress(player, "miner", 1);
        fx.service.shutdown().await;

        assert_eq!(fx.repo.get(player, "miner").unwrap().current_count, 1);
        assert!(!fx.service.is_loaded(player));
    }

    #[tokio::test]
    async fn test_load_through_main_context() {
        let scheduler = Arc::new(MainThreadScheduler::start());
        let fx = fixture_with(scheduler.clone());
        let player = online(&fx, "Steve").await;

        assert!(fx.service.is_loaded(player));
        assert!(fx.service.grant(player, "first_login"));
        scheduler.stop().await;
    }

    // ============== Filter Wiring Tests ==============

    #[tokio::test]
    async fn test_filter_keeps_registered_entries() {
        let fx = fixture();
        fx.service
            .reload(milestones(), FilterPolicy::new(FilterMode::DisableVanilla), false)
            .unwrap();

        let mut message = OutboundMessage::Advancements(AdvancementsMessage {
            added: Some(AddedEntries::Sequence(vec![
                AddedEntry::Opaque("milestone:first_login".to_string()),
                AddedEntry::Opaque("quests:dragon".to_string()),
                AddedEntry::Opaque("minecraft:story/root".to_string()),
            ])),
            ..AdvancementsMessage::default()
        });

        let filter = fx.service.filter();
        assert_eq!(filter.on_outbound(&mut message), FilterVerdict::Rewritten { removed: 1 });
        assert!(filter.should_block("quests:other"));
    }

    #[tokio::test]
    async fn test_filter_ownership_follows_registration() {
        let fx = fixture();
        let policy = FilterPolicy::new(FilterMode::DisableVanilla);
        fx.service.reload(milestones(), policy.clone(), false).unwrap();
        let filter = fx.service.filter();
        assert!(!filter.should_block("quests:dragon"));

        let without_dragon: Vec<Milestone> = milestones()
            .into_iter()
            .filter(|m| m.id.as_str() != "quests:dragon")
            .collect();
        fx.service.reload(without_dragon, policy, false).unwrap();
        assert!(filter.should_block("quests:dragon"));
        assert!(!filter.should_block("milestone:miner"));
    }

    #[tokio::test]
    async fn test_own_announcement_not_cancelled() {
        let fx = fixture();
        fx.service
            .reload(milestones(), FilterPolicy::new(FilterMode::DisableVanilla), false)
            .unwrap();
        let mut chat = OutboundMessage::SystemChat(filter::SystemChatMessage::new(
            r#"{"translate":"chat.type.advancement.challenge","with":[{"text":"Steve"},{"text":"Dragon Slayer"}]}"#,
        ));
        assert_eq!(fx.service.filter().on_outbound(&mut chat), FilterVerdict::Pass);
    }

    mod red_team {
        use super::*;

        #[tokio::test]
        async fn test_failed_load_installs_nothing() {
            let fx = fixture();
            fx.repo.set_fail_reads(true);
            let player = Uuid::new_v4();

            let result = fx.service.load_player_data(player, "Steve").await;
            assert!(matches!(result, Err(ServiceError::Storage(_))));
            assert!(!fx.service.is_loaded(player));
        }

        #[tokio::test]
        async fn test_write_failure_does_not_block_progress() {
            let fx = fixture();
            fx.repo.set_fail_writes(true);
            let player = online(&fx, "Steve").await;

            assert!(fx.service.grant(player, "first_login"));
            fx.service.flush().await;
            assert_eq!(fx.service.persistence().failed_writes(), 1);
            assert!(fx.service.get_progress(player, "first_login").unwrap().completed);
        }
    }
}
