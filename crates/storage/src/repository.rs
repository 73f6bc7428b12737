//! Progress Repository - abstract persistence for progress records
//!
//! Backends are interchangeable behind this trait. Records are keyed by
//! (player, milestone) and every save is an upsert.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

use shared::{MilestoneId, PlayerId, Progress};

use crate::error::StorageError;

/// One row of a leaderboard query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaderboardEntry {
    pub player_name: String,
    pub completions: u64,
}

impl LeaderboardEntry {
    pub fn new(player_name: impl Into<String>, completions: u64) -> Self {
        Self {
            player_name: player_name.into(),
            completions,
        }
    }
}

/// Progress Repository Trait
///
/// Implementations are shared behind `Arc` and must tolerate concurrent
/// callers. Nothing may be called after `shutdown()`.
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// Open connections and create the schema if missing
    async fn init(&self) -> Result<(), StorageError>;

    /// Release connections
    async fn shutdown(&self);

    /// Every record stored for `player`, keyed by milestone
    async fn load_player_progress(
        &self,
        player: PlayerId,
    ) -> Result<HashMap<MilestoneId, Progress>, StorageError>;

    /// Upsert one record
    async fn save_player_progress(&self, progress: &Progress) -> Result<(), StorageError>;

    /// Upsert a batch atomically: all rows or none
    async fn save_all(&self, progress: &[Progress]) -> Result<(), StorageError>;

    /// Players ranked by completions at or after `after`, descending
    async fn get_top_players(
        &self,
        after: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<LeaderboardEntry>, StorageError>;

    /// Distinct players with at least one completion at or after `after`
    async fn get_player_count_with_completions(
        &self,
        after: DateTime<Utc>,
    ) -> Result<u64, StorageError>;

    /// Short backend name for logs
    fn backend_name(&self) -> &'static str;
}
