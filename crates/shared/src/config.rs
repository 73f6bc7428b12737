//! Configuration types for Milestone
//!
//! Loaded from `config.yml` in the data directory. Every field has a
//! default, so a missing file or a partial one is fine.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Which storage backend to use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseBackend {
    #[default]
    #[serde(alias = "SQLITE", alias = "Sqlite")]
    Sqlite,
    #[serde(alias = "MYSQL", alias = "MySQL", alias = "MySql")]
    Mysql,
}

/// Storage connection settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct DatabaseSettings {
    #[serde(rename = "type")]
    pub backend: DatabaseBackend,

    /// SQLite file, relative to the data directory
    pub file: String,

    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: String,
    pub password: String,
    pub ssl: bool,
    pub pool_size: u32,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            backend: DatabaseBackend::Sqlite,
            file: "milestone.db".to_string(),
            host: "localhost".to_string(),
            port: 3306,
            database: "minecraft".to_string(),
            username: "root".to_string(),
            password: String::new(),
            ssl: false,
            pool_size: 10,
        }
    }
}

/// How the outbound filter treats host-native advancements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FilterMode {
    /// Filter disabled; everything passes
    VanillaOnly,
    /// Everything outside this system's namespace is removed
    DisableVanilla,
    /// Only configured namespaces and ids are removed
    #[default]
    Hybrid,
}

impl FilterMode {
    /// Parse a mode name, falling back to `Hybrid` for anything unrecognised
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "VANILLA_ONLY" => FilterMode::VanillaOnly,
            "DISABLE_VANILLA" => FilterMode::DisableVanilla,
            _ => FilterMode::Hybrid,
        }
    }
}

/// Outbound filter settings
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct AdvancementSettings {
    pub mode: FilterMode,
    pub block_namespaces: Vec<String>,
    pub block_ids: Vec<String>,
}

/// Leaderboard refresh settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct LeaderboardSettings {
    pub refresh_interval_secs: u64,
    pub initial_delay_secs: u64,
    pub cache_size: u32,
}

impl Default for LeaderboardSettings {
    fn default() -> Self {
        Self {
            refresh_interval_secs: 300,
            initial_delay_secs: 1,
            cache_size: 100,
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Settings {
    pub debug: bool,
    pub database: DatabaseSettings,
    pub advancement: AdvancementSettings,
    pub leaderboard: LeaderboardSettings,

    /// Definition directory, relative to the data directory
    pub milestones_dir: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            debug: false,
            database: DatabaseSettings::default(),
            advancement: AdvancementSettings::default(),
            leaderboard: LeaderboardSettings::default(),
            milestones_dir: PathBuf::from("milestones"),
        }
    }
}

impl Settings {
    /// Load settings from a YAML file; a missing file yields the defaults
    pub fn from_file(path: &Path) -> crate::Result<Self> {
        if !path.exists() {
            tracing::info!(path = %path.display(), "No config file found, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> crate::Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let settings: Self = serde_yaml::from_str(content)?;
        Ok(settings)
    }

    /// Definition directory resolved against `data_dir`
    pub fn milestones_path(&self, data_dir: &Path) -> PathBuf {
        data_dir.join(&self.milestones_dir)
    }

    /// SQLite file resolved against `data_dir`
    pub fn sqlite_path(&self, data_dir: &Path) -> PathBuf {
        data_dir.join(&self.database.file)
    }
}
