//! Runtime bootstrap
//!
//! Startup order: settings → repository (`init` failure aborts) →
//! service → definitions and host registration → leaderboard.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tracing::{error, info};

use advancement::{AdvancementHost, InMemoryHost};
use filter::FilterPolicy;
use leaderboard::{LeaderboardCache, RefreshHandle};
use shared::{Milestone, MilestoneLoader, PlayerId, Progress, Settings};
use storage::ProgressRepository;

use crate::admin::MilestoneAdmin;
use crate::error::Result;
use crate::notifier::{OfflineNotifier, PlayerNotifier};
use crate::placeholders::Placeholders;
use crate::scheduler::{InlineScheduler, Scheduler};
use crate::service::MilestoneService;

/// Settings file name inside the data directory
pub const CONFIG_FILE: &str = "config.yml";

/// Builder for [`MilestoneRuntime`]
///
/// Unset collaborators default to the offline ones: an in-memory host,
/// an inline scheduler and nobody online.
pub struct RuntimeBuilder {
    data_dir: PathBuf,
    config_path: PathBuf,
    repository: Option<Arc<dyn ProgressRepository>>,
    host: Option<Arc<dyn AdvancementHost>>,
    scheduler: Option<Arc<dyn Scheduler>>,
    notifier: Option<Arc<dyn PlayerNotifier>>,
}

impl RuntimeBuilder {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        Self {
            config_path: data_dir.join(CONFIG_FILE),
            data_dir,
            repository: None,
            host: None,
            scheduler: None,
            notifier: None,
        }
    }

    pub fn with_config(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = path.into();
        self
    }

    /// Use this repository instead of the one named in settings
    pub fn with_repository(mut self, repository: Arc<dyn ProgressRepository>) -> Self {
        self.repository = Some(repository);
        self
    }

    pub fn with_host(mut self, host: Arc<dyn AdvancementHost>) -> Self {
        self.host = Some(host);
        self
    }

    pub fn with_scheduler(mut self, scheduler: Arc<dyn Scheduler>) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn PlayerNotifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Open storage, load definitions and register them with the host
    pub async fn build(self) -> Result<MilestoneRuntime> {
        let settings = Settings::from_file(&self.config_path)?;
        let repository = self
            .repository
            .unwrap_or_else(|| storage::build_repository(&settings, &self.data_dir));

        if let Err(e) = repository.init().await {
            error!(backend = repository.backend_name(), error = %e, "Failed to initialize storage");
            return Err(e.into());
        }
        info!(backend = repository.backend_name(), "Storage initialized");

        let service = Arc::new(MilestoneService::new(
            Arc::clone(&repository),
            self.host.unwrap_or_else(|| Arc::new(InMemoryHost::new())),
            self.scheduler.unwrap_or_else(|| Arc::new(InlineScheduler)),
            self.notifier.unwrap_or_else(|| Arc::new(OfflineNotifier)),
        ));
        let leaderboard = Arc::new(LeaderboardCache::from_settings(repository, &settings.leaderboard));

        let runtime = MilestoneRuntime {
            data_dir: self.data_dir,
            config_path: self.config_path,
            settings: RwLock::new(settings),
            service,
            leaderboard,
            refresh: Mutex::new(None),
        };
        runtime.reload()?;
        Ok(runtime)
    }
}

/// A running system: service, leaderboard and the settings they came from
pub struct MilestoneRuntime {
    data_dir: PathBuf,
    config_path: PathBuf,
    settings: RwLock<Settings>,
    service: Arc<MilestoneService>,
    leaderboard: Arc<LeaderboardCache>,
    refresh: Mutex<Option<RefreshHandle>>,
}

impl MilestoneRuntime {
    pub fn builder(data_dir: impl Into<PathBuf>) -> RuntimeBuilder {
        RuntimeBuilder::new(data_dir)
    }

    pub fn service(&self) -> &Arc<MilestoneService> {
        &self.service
    }

    pub fn leaderboard(&self) -> &Arc<LeaderboardCache> {
        &self.leaderboard
    }

    pub fn placeholders(&self) -> Placeholders {
        Placeholders::new(Arc::clone(&self.service), Arc::clone(&self.leaderboard))
    }

    /// Settings as of the last reload
    pub fn settings(&self) -> Settings {
        self.settings.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Start the periodic leaderboard refresh; a no-op if already running
    pub fn start_leaderboard(&self) {
        let mut refresh = self.refresh.lock().unwrap_or_else(PoisonError::into_inner);
        if refresh.is_none() {
            let settings = self.settings();
            *refresh = Some(self.leaderboard.start_with(&settings.leaderboard));
        }
    }

    /// Stop the leaderboard, persist every session and close storage
    pub async fn shutdown(&self) {
        let refresh = self.refresh.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(refresh) = refresh {
            refresh.stop().await;
        }
        self.service.shutdown().await;
    }

    fn load_definitions(&self, settings: &Settings) -> Result<Vec<Milestone>> {
        Ok(MilestoneLoader::new(settings.milestones_path(&self.data_dir)).load_all()?)
    }
}

impl MilestoneAdmin for MilestoneRuntime {
    /// Database settings are only read at startup
    fn reload(&self) -> Result<usize> {
        let settings = Settings::from_file(&self.config_path)?;
        let milestones = self.load_definitions(&settings)?;
        let count = milestones.len();

        self.service.reload(
            milestones,
            FilterPolicy::from_settings(&settings.advancement),
            settings.debug,
        )?;
        *self.settings.write().unwrap_or_else(PoisonError::into_inner) = settings;
        Ok(count)
    }

    fn grant(&self, player: PlayerId, milestone_id: &str) -> bool {
        self.service.grant(player, milestone_id)
    }

    fn revoke(&self, player: PlayerId, milestone_id: &str) {
        self.service.revoke(player, milestone_id)
    }

    fn get_progress(&self, player: PlayerId, milestone_id: &str) -> Option<Progress> {
        self.service.get_progress(player, milestone_id)
    }

    fn register_milestone(&self, milestone: Milestone) {
        self.service.register_milestone(milestone)
    }

    fn get_milestone(&self, milestone_id: &str) -> Option<Arc<Milestone>> {
        self.service.get_milestone(milestone_id)
    }

    fn list_milestones(&self) -> Vec<Arc<Milestone>> {
        self.service.all_milestones()
    }

    fn clear_milestones(&self) {
        self.service.clear_milestones()
    }
}
