//! CLI Commands

pub mod check;
pub mod grant;
pub mod init;
pub mod progress;
pub mod top;

pub use check::CheckCommand;
pub use grant::{GrantCommand, RevokeCommand};
pub use init::InitCommand;
pub use progress::ProgressCommand;
pub use top::TopCommand;

use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

use milestone_core::{MilestoneRuntime, CONFIG_FILE};
use shared::{Milestone, MilestoneLoader, Settings};
use storage::ProgressRepository;

/// Where a command finds its settings and data
#[derive(Debug, Clone)]
pub struct Context {
    pub data_dir: PathBuf,
    pub config: Option<PathBuf>,
}

impl Context {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            config: None,
        }
    }

    pub fn with_config(mut self, config: Option<PathBuf>) -> Self {
        self.config = config;
        self
    }

    /// `--config`, or `config.yml` inside the data directory
    pub fn config_path(&self) -> PathBuf {
        self.config
            .clone()
            .unwrap_or_else(|| self.data_dir.join(CONFIG_FILE))
    }

    pub fn settings(&self) -> anyhow::Result<Settings> {
        let path = self.config_path();
        debug!(path = %path.display(), "Reading settings");
        Ok(Settings::from_file(&path)?)
    }

    pub fn definitions(&self, settings: &Settings) -> anyhow::Result<Vec<Milestone>> {
        Ok(MilestoneLoader::new(settings.milestones_path(&self.data_dir)).load_all()?)
    }

    /// Open and initialize the configured repository
    ///
    /// The caller owns the `shutdown()`.
    pub async fn repository(&self, settings: &Settings) -> anyhow::Result<Arc<dyn ProgressRepository>> {
        let repository = storage::build_repository(settings, &self.data_dir);
        repository.init().await?;
        Ok(repository)
    }

    /// Full runtime with offline collaborators
    pub async fn runtime(&self) -> anyhow::Result<MilestoneRuntime> {
        Ok(MilestoneRuntime::builder(&self.data_dir)
            .with_config(self.config_path())
            .build()
            .await?)
    }
}
