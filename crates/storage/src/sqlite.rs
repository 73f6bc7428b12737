//! Embedded SQLite backend
//!
//! One connection behind a mutex; every call runs on the blocking pool.
//! Completion times are stored as epoch milliseconds.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

use shared::{MilestoneId, PlayerId, Progress};

use crate::error::StorageError;
use crate::repository::{LeaderboardEntry, ProgressRepository};

const CREATE_TABLE: &str = "
CREATE TABLE IF NOT EXISTS milestone_progress (
    player_id VARCHAR(36) NOT NULL,
    player_name VARCHAR(16) NOT NULL,
    milestone_id VARCHAR(255) NOT NULL,
    current_count INTEGER DEFAULT 0,
    is_completed BOOLEAN DEFAULT 0,
    completed_time INTEGER,
    PRIMARY KEY (player_id, milestone_id)
)";

const UPSERT: &str = "
INSERT INTO milestone_progress
    (player_id, player_name, milestone_id, current_count, is_completed, completed_time)
VALUES (?1, ?2, ?3, ?4, ?5, ?6)
ON CONFLICT(player_id, milestone_id) DO UPDATE SET
    player_name = excluded.player_name,
    current_count = excluded.current_count,
    is_completed = excluded.is_completed,
    completed_time = excluded.completed_time";

const SELECT_PLAYER: &str = "
SELECT milestone_id, player_name, current_count, is_completed, completed_time
FROM milestone_progress WHERE player_id = ?1";

/// Names come from each player's most recently completed record
const TOP_PLAYERS: &str = "
SELECT
    (SELECT p.player_name FROM milestone_progress p
     WHERE p.player_id = t.player_id
     ORDER BY p.completed_time DESC
     LIMIT 1) AS name,
    t.c
FROM (
    SELECT player_id, COUNT(*) AS c
    FROM milestone_progress
    WHERE is_completed = 1 AND completed_time >= ?1
    GROUP BY player_id
) t
ORDER BY t.c DESC, name ASC
LIMIT ?2";

const PLAYER_COUNT: &str = "
SELECT COUNT(DISTINCT player_id)
FROM milestone_progress
WHERE is_completed = 1 AND completed_time >= ?1";

#[derive(Debug, Clone)]
enum Location {
    File(PathBuf),
    Memory,
}

/// SQLite-backed progress repository
#[derive(Debug, Clone)]
pub struct SqliteRepository {
    location: Location,
    conn: Arc<Mutex<Option<Connection>>>,
}

impl SqliteRepository {
    /// Repository stored at `path`; the parent directory is created on init
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            location: Location::File(path.into()),
            conn: Arc::new(Mutex::new(None)),
        }
    }

    /// Repository that lives only as long as the process (for testing)
    pub fn in_memory() -> Self {
        Self {
            location: Location::Memory,
            conn: Arc::new(Mutex::new(None)),
        }
    }

    /// Execute `f` with exclusive access on the blocking pool
    async fn with_conn<F, T>(&self, f: F) -> Result<T, StorageError>
    where
        F: FnOnce(&mut Connection) -> Result<T, StorageError> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn
                .lock()
                .map_err(|e| StorageError::persistence(format!("Lock poisoned: {}", e)))?;
            let conn = guard.as_mut().ok_or(StorageError::NotInitialized)?;
            f(conn)
        })
        .await?
    }
}

fn open(location: &Location) -> Result<Connection, StorageError> {
    let conn = match location {
        Location::File(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            info!("Opening SQLite database at {:?}", path);
            let conn = Connection::open(path)?;
            conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
            conn
        }
        Location::Memory => {
            debug!("Opening in-memory SQLite database");
            Connection::open_in_memory()?
        }
    };
    conn.execute(CREATE_TABLE, [])?;
    Ok(conn)
}

fn upsert(conn: &Connection, progress: &Progress) -> Result<(), StorageError> {
    conn.execute(
        UPSERT,
        params![
            progress.player_id.to_string(),
            progress.player_name,
            progress.milestone_id.as_str(),
            progress.current_count,
            progress.completed,
            progress.completed_time.map(|t| t.timestamp_millis()),
        ],
    )?;
    Ok(())
}

fn millis_to_time(player: PlayerId, millis: Option<i64>) -> Result<Option<DateTime<Utc>>, StorageError> {
    match millis {
        None => Ok(None),
        Some(ms) => DateTime::from_timestamp_millis(ms)
            .map(Some)
            .ok_or_else(|| StorageError::InvalidRecord {
                player_id: player.to_string(),
                reason: format!("completion time {} out of range", ms),
            }),
    }
}

#[async_trait]
impl ProgressRepository for SqliteRepository {
    async fn init(&self) -> Result<(), StorageError> {
        let location = self.location.clone();
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let opened = open(&location)?;
            let mut guard = conn
                .lock()
                .map_err(|e| StorageError::persistence(format!("Lock poisoned: {}", e)))?;
            *guard = Some(opened);
            Ok::<_, StorageError>(())
        })
        .await?
    }

    async fn shutdown(&self) {
        let conn = Arc::clone(&self.conn);
        let closed = tokio::task::spawn_blocking(move || {
            if let Ok(mut guard) = conn.lock() {
                if let Some(conn) = guard.take() {
                    if let Err((_, e)) = conn.close() {
                        tracing::warn!(error = %e, "Failed to close SQLite connection");
                    }
                }
            }
        })
        .await;
        if let Err(e) = closed {
            tracing::warn!(error = %e, "SQLite shutdown task failed");
        }
    }

    async fn load_player_progress(
        &self,
        player: PlayerId,
    ) -> Result<HashMap<MilestoneId, Progress>, StorageError> {
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(SELECT_PLAYER)?;
            let rows = stmt.query_map(params![player.to_string()], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, u32>(2)?,
                    row.get::<_, bool>(3)?,
                    row.get::<_, Option<i64>>(4)?,
                ))
            })?;

            let mut results = HashMap::new();
            for row in rows {
                let (milestone_id, player_name, current_count, completed, completed_time) = row?;
                let milestone_id = MilestoneId::new(milestone_id);
                results.insert(
                    milestone_id.clone(),
                    Progress {
                        player_id: player,
                        player_name,
                        milestone_id,
                        current_count,
                        completed,
                        completed_time: millis_to_time(player, completed_time)?,
                    },
                );
            }
            Ok(results)
        })
        .await
    }

    async fn save_player_progress(&self, progress: &Progress) -> Result<(), StorageError> {
        let progress = progress.clone();
        self.with_conn(move |conn| upsert(conn, &progress)).await
    }

    async fn save_all(&self, progress: &[Progress]) -> Result<(), StorageError> {
        if progress.is_empty() {
            return Ok(());
        }
        let batch = progress.to_vec();
        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            for record in &batch {
                upsert(&tx, record)?;
            }
            tx.commit()?;
            Ok(())
        })
        .await
    }

    async fn get_top_players(
        &self,
        after: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<LeaderboardEntry>, StorageError> {
        let after = after.timestamp_millis();
        self.with_conn(move |conn| {
            let mut stmt = conn.prepare(TOP_PLAYERS)?;
            let rows = stmt.query_map(params![after, limit], |row| {
                Ok(LeaderboardEntry {
                    player_name: row.get::<_, String>(0)?,
                    completions: row.get::<_, i64>(1)?.max(0) as u64,
                })
            })?;
            Ok(rows.collect::<Result<Vec<_>, _>>()?)
        })
        .await
    }

    async fn get_player_count_with_completions(
        &self,
        after: DateTime<Utc>,
    ) -> Result<u64, StorageError> {
        let after = after.timestamp_millis();
        self.with_conn(move |conn| {
            let count: Option<i64> = conn
                .query_row(PLAYER_COUNT, params![after], |row| row.get(0))
                .optional()?;
            Ok(count.unwrap_or(0).max(0) as u64)
        })
        .await
    }

    fn backend_name(&self) -> &'static str {
        "sqlite"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use uuid::Uuid;

    async fn repo() -> SqliteRepository {
        let repo = SqliteRepository::in_memory();
        repo.init().await.unwrap();
        repo
    }

    fn completed(player: PlayerId, name: &str, id: &str, at: DateTime<Utc>) -> Progress {
        let mut progress = Progress::new(player, name, MilestoneId::new(id));
        progress.complete(1, at);
        progress
    }

    // ============== Round Trip Tests ==============

    #[tokio::test]
    async fn test_save_then_load() {
        let repo = repo().await;
        let player = Uuid::new_v4();
        let mut progress = Progress::new(player, "Steve", MilestoneId::new("miner"));
        progress.current_count = 7;
        repo.save_player_progress(&progress).await.unwrap();

        let loaded = repo.load_player_progress(player).await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.get("miner"), Some(&progress));
    }

    #[tokio::test]
    async fn test_upsert_overwrites() {
        let repo = repo().await;
        let player = Uuid::new_v4();
        let mut progress = Progress::new(player, "Steve", MilestoneId::new("miner"));
        repo.save_player_progress(&progress).await.unwrap();

        let at = DateTime::from_timestamp_millis(Utc::now().timestamp_millis()).unwrap();
        progress.complete(10, at);
        repo.save_player_progress(&progress).await.unwrap();

        let loaded = repo.load_player_progress(player).await.unwrap();
        let stored = loaded.get("miner").unwrap();
        assert!(stored.completed);
        assert_eq!(stored.current_count, 10);
        assert_eq!(stored.completed_time, Some(at));
    }

    #[tokio::test]
    async fn test_save_all_and_isolation() {
        let repo = repo().await;
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        let batch = vec![
            Progress::new(alice, "Alice", MilestoneId::new("a")),
            Progress::new(alice, "Alice", MilestoneId::new("b")),
            Progress::new(bob, "Bob", MilestoneId::new("a")),
        ];
        repo.save_all(&batch).await.unwrap();

        assert_eq!(repo.load_player_progress(alice).await.unwrap().len(), 2);
        assert_eq!(repo.load_player_progress(bob).await.unwrap().len(), 1);
        assert!(repo.load_player_progress(Uuid::new_v4()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_save_all_rolls_back_whole_batch() {
        let repo = repo().await;
        repo.with_conn(|conn| {
            conn.execute_batch(
                "CREATE TRIGGER reject_bad BEFORE INSERT ON milestone_progress
                 WHEN NEW.milestone_id = 'bad'
                 BEGIN SELECT RAISE(ABORT, 'rejected'); END;",
            )?;
            Ok(())
        })
        .await
        .unwrap();

        let player = Uuid::new_v4();
        let mut good = Progress::new(player, "Steve", MilestoneId::new("good"));
        good.current_count = 1;
        repo.save_player_progress(&good).await.unwrap();

        good.current_count = 5;
        let fresh = Progress::new(player, "Steve", MilestoneId::new("fresh"));
        let bad = Progress::new(player, "Steve", MilestoneId::new("bad"));
        assert!(repo.save_all(&[good, fresh, bad]).await.is_err());

        let loaded = repo.load_player_progress(player).await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.get("good").unwrap().current_count, 1);
    }

    // ============== Leaderboard Query Tests ==============

    #[tokio::test]
    async fn test_top_players_ranked_and_windowed() {
        let repo = repo().await;
        let now = Utc::now();
        let old = now - Duration::days(40);
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();

        repo.save_all(&[
            completed(alice, "Alice", "a", now),
            completed(alice, "Alice", "b", now),
            completed(alice, "Alice", "c", old),
            completed(bob, "Bob", "a", now),
            Progress::new(bob, "Bob", MilestoneId::new("b")),
        ])
        .await
        .unwrap();

        let recent = repo.get_top_players(now - Duration::days(7), 10).await.unwrap();
        assert_eq!(
            recent,
            vec![LeaderboardEntry::new("Alice", 2), LeaderboardEntry::new("Bob", 1)]
        );

        let all = repo.get_top_players(DateTime::UNIX_EPOCH, 1).await.unwrap();
        assert_eq!(all, vec![LeaderboardEntry::new("Alice", 3)]);

        assert_eq!(repo.get_player_count_with_completions(now - Duration::days(7)).await.unwrap(), 2);
        assert_eq!(repo.get_player_count_with_completions(now + Duration::days(1)).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_top_players_use_latest_name() {
        let repo = repo().await;
        let now = Utc::now();
        let player = Uuid::new_v4();

        repo.save_all(&[
            completed(player, "Zed", "a", now - Duration::days(3)),
            completed(player, "Alice", "b", now),
            Progress::new(player, "Zzz", MilestoneId::new("c")),
        ])
        .await
        .unwrap();

        let all = repo.get_top_players(DateTime::UNIX_EPOCH, 10).await.unwrap();
        assert_eq!(all, vec![LeaderboardEntry::new("Alice", 2)]);
    }

    mod edge_cases {
        use super::*;

        #[tokio::test]
        async fn test_not_initialized() {
            let repo = SqliteRepository::in_memory();
            let err = repo.load_player_progress(Uuid::new_v4()).await.unwrap_err();
            assert!(matches!(err, StorageError::NotInitialized));
        }

        #[tokio::test]
        async fn test_empty_batch_is_noop() {
            let repo = repo().await;
            repo.save_all(&[]).await.unwrap();
        }

        #[tokio::test]
        async fn test_file_backed_persists_across_reopen() {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("nested/milestone.db");
            let player = Uuid::new_v4();

            let repo = SqliteRepository::new(&path);
            repo.init().await.unwrap();
            repo.save_player_progress(&Progress::new(player, "Steve", MilestoneId::new("x")))
                .await
                .unwrap();
            repo.shutdown().await;

            let reopened = SqliteRepository::new(&path);
            reopened.init().await.unwrap();
            assert_eq!(reopened.load_player_progress(player).await.unwrap().len(), 1);
            reopened.shutdown().await;
        }
    }
}
