//! Leaderboard Cache - rankings refreshed on a timer, read without waiting
//!
//! Each refresh runs every query first and publishes only a complete
//! result. Readers keep the previous snapshot until then, and keep it for
//! good if the refresh fails.

use chrono::{DateTime, Local, TimeZone, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use shared::LeaderboardSettings;
use storage::{ProgressRepository, StorageError};

use crate::snapshot::LeaderboardSnapshot;
use crate::window::{LeaderboardWindow, WindowBounds};

/// Leaderboard Cache
pub struct LeaderboardCache {
    repository: Arc<dyn ProgressRepository>,
    /// Rows fetched per ranking
    limit: u32,
    published: watch::Sender<Arc<LeaderboardSnapshot>>,
}

impl LeaderboardCache {
    pub fn new(repository: Arc<dyn ProgressRepository>, limit: u32) -> Self {
        let (published, _) = watch::channel(Arc::new(LeaderboardSnapshot::default()));
        Self {
            repository,
            limit: limit.max(1),
            published,
        }
    }

    pub fn from_settings(repository: Arc<dyn ProgressRepository>, settings: &LeaderboardSettings) -> Self {
        Self::new(repository, settings.cache_size)
    }

    /// Latest complete snapshot
    pub fn snapshot(&self) -> Arc<LeaderboardSnapshot> {
        Arc::clone(&self.published.borrow())
    }

    /// Receiver notified on every publication
    pub fn subscribe(&self) -> watch::Receiver<Arc<LeaderboardSnapshot>> {
        self.published.subscribe()
    }

    /// Refresh against the local clock
    pub async fn refresh(&self) -> Result<(), StorageError> {
        self.refresh_at(&Local::now()).await
    }

    /// Refresh with windows anchored at `now`
    pub async fn refresh_at<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> Result<(), StorageError> {
        self.refresh_bounds(WindowBounds::at(now)).await
    }

    async fn refresh_bounds(&self, bounds: WindowBounds) -> Result<(), StorageError> {
        let repo = &self.repository;
        let weekly = repo.get_top_players(bounds.start_of(LeaderboardWindow::Weekly), self.limit).await?;
        let monthly = repo.get_top_players(bounds.start_of(LeaderboardWindow::Monthly), self.limit).await?;
        let total = repo.get_top_players(bounds.start_of(LeaderboardWindow::Total), self.limit).await?;
        let weekly_players = repo.get_player_count_with_completions(bounds.week).await?;
        let monthly_players = repo.get_player_count_with_completions(bounds.month).await?;

        let snapshot = LeaderboardSnapshot {
            weekly,
            monthly,
            total,
            weekly_players,
            monthly_players,
            refreshed_at: Some(Utc::now()),
        };
        debug!(
            weekly = snapshot.weekly.len(),
            monthly = snapshot.monthly.len(),
            total = snapshot.total.len(),
            "Leaderboard refreshed"
        );
        self.published.send_replace(Arc::new(snapshot));
        Ok(())
    }

    /// Refresh after `initial_delay`, then every `every`, until stopped
    pub fn start(self: &Arc<Self>, initial_delay: Duration, every: Duration) -> RefreshHandle {
        let cache = Arc::clone(self);
        let (stop, mut stopped) = watch::channel(false);
        let every = every.max(Duration::from_millis(1));

        let task = tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(initial_delay) => {}
                _ = stopped.changed() => return,
            }

            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(e) = cache.refresh().await {
                            warn!(error = %e, "Failed to refresh leaderboard cache, keeping previous snapshot");
                        }
                    }
                    _ = stopped.changed() => break,
                }
            }
            debug!("Leaderboard refresh loop stopped");
        });

        info!(
            backend = self.repository.backend_name(),
            interval_secs = every.as_secs(),
            "Leaderboard refresh started"
        );
        RefreshHandle { stop, task }
    }

    pub fn start_with(self: &Arc<Self>, settings: &LeaderboardSettings) -> RefreshHandle {
        self.start(
            Duration::from_secs(settings.initial_delay_secs),
            Duration::from_secs(settings.refresh_interval_secs),
        )
    }
}

/// Running refresh loop; dropping it also ends the loop
pub struct RefreshHandle {
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl RefreshHandle {
    /// Signal the loop and wait for it; an in-flight refresh completes first
    pub async fn stop(self) {
        let _ = self.stop.send(true);
        if let Err(e) = self.task.await {
            if !e.is_cancelled() {
                warn!(error = %e, "Leaderboard refresh loop ended abnormally");
            }
        }
    }

    /// Cancel immediately
    pub fn abort(&self) {
        self.task.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}
