//! In-Memory Repository Implementation
//!
//! Thread-safe map keyed by (player, milestone). Used by tests and by the
//! CLI when it runs without a database. Writes can be made to fail so
//! callers' error paths can be exercised.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use shared::{MilestoneId, PlayerId, Progress};

use crate::error::StorageError;
use crate::repository::{LeaderboardEntry, ProgressRepository};

type Records = HashMap<(PlayerId, MilestoneId), Progress>;

/// In-memory progress repository
#[derive(Debug, Clone, Default)]
pub struct InMemoryRepository {
    records: Arc<RwLock<Records>>,
    fail_writes: Arc<AtomicBool>,
    fail_reads: Arc<AtomicBool>,
    writes: Arc<AtomicUsize>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent query fail
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Number of successful write calls
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Stored record for (player, milestone), bypassing the trait
    pub fn get(&self, player: PlayerId, milestone: &str) -> Option<Progress> {
        let records = self.records.read().ok()?;
        records
            .get(&(player, MilestoneId::new(milestone)))
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_writes(&self) -> Result<(), StorageError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::persistence("Simulated write failure"));
        }
        Ok(())
    }

    fn check_reads(&self) -> Result<(), StorageError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StorageError::persistence("Simulated read failure"));
        }
        Ok(())
    }

    fn completions_since(&self, after: DateTime<Utc>) -> Result<Vec<(PlayerId, String, u64)>, StorageError> {
        let records = self
            .records
            .read()
            .map_err(|_| StorageError::persistence("Failed to acquire read lock"))?;

        let mut per_player: BTreeMap<PlayerId, (String, u64)> = BTreeMap::new();
        for progress in records.values() {
            let in_window = progress.completed && progress.completed_time.is_some_and(|t| t >= after);
            if !in_window {
                continue;
            }
            let entry = per_player
                .entry(progress.player_id)
                .or_insert_with(|| (progress.player_name.clone(), 0));
            if progress.player_name > entry.0 {
                entry.0 = progress.player_name.clone();
            }
            entry.1 += 1;
        }
        Ok(per_player
            .into_iter()
            .map(|(id, (name, count))| (id, name, count))
            .collect())
    }
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn init(&self) -> Result<(), StorageError> {
        Ok(())
    }

    async fn shutdown(&self) {}

    async fn load_player_progress(
        &self,
        player: PlayerId,
    ) -> Result<HashMap<MilestoneId, Progress>, StorageError> {
        self.check_reads()?;
        let records = self
            .records
            .read()
            .map_err(|_| StorageError::persistence("Failed to acquire read lock"))?;
        Ok(records
            .iter()
            .filter(|((owner, _), _)| *owner == player)
            .map(|((_, id), progress)| (id.clone(), progress.clone()))
            .collect())
    }

    async fn save_player_progress(&self, progress: &Progress) -> Result<(), StorageError> {
        self.check_writes()?;
        let mut records = self
            .records
            .write()
            .map_err(|_| StorageError::persistence("Failed to acquire write lock"))?;
        records.insert(
            (progress.player_id, progress.milestone_id.clone()),
            progress.clone(),
        );
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn save_all(&self, progress: &[Progress]) -> Result<(), StorageError> {
        self.check_writes()?;
        let mut records = self
            .records
            .write()
            .map_err(|_| StorageError::persistence("Failed to acquire write lock"))?;
        for record in progress {
            records.insert((record.player_id, record.milestone_id.clone()), record.clone());
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn get_top_players(
        &self,
        after: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<LeaderboardEntry>, StorageError> {
        self.check_reads()?;
        let mut ranked: Vec<LeaderboardEntry> = self
            .completions_since(after)?
            .into_iter()
            .map(|(_, name, count)| LeaderboardEntry::new(name, count))
            .collect();
        ranked.sort_by(|a, b| {
            b.completions
                .cmp(&a.completions)
                .then_with(|| a.player_name.cmp(&b.player_name))
        });
        ranked.truncate(limit as usize);
        Ok(ranked)
    }

    async fn get_player_count_with_completions(
        &self,
        after: DateTime<Utc>,
    ) -> Result<u64, StorageError> {
        self.check_reads()?;
        Ok(self.completions_since(after)?.len() as u64)
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
