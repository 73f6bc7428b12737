//! Networked MySQL backend
//!
//! Pooled connections via sqlx. Completion times are `TIMESTAMP` columns
//! read and written in UTC.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions, MySqlRow, MySqlSslMode};
use sqlx::Row;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use std::time::Duration;
use tracing::info;

use shared::{DatabaseSettings, MilestoneId, PlayerId, Progress};

use crate::error::StorageError;
use crate::repository::{LeaderboardEntry, ProgressRepository};

const CREATE_TABLE: &str = "
CREATE TABLE IF NOT EXISTS milestone_progress (
    player_id VARCHAR(36) NOT NULL,
    player_name VARCHAR(16) NOT NULL,
    milestone_id VARCHAR(255) NOT NULL,
    current_count INT DEFAULT 0,
    is_completed BOOLEAN DEFAULT 0,
    completed_time TIMESTAMP NULL,
    PRIMARY KEY (player_id, milestone_id)
)";

const UPSERT: &str = "
INSERT INTO milestone_progress
    (player_id, player_name, milestone_id, current_count, is_completed, completed_time)
VALUES (?, ?, ?, ?, ?, ?)
ON DUPLICATE KEY UPDATE
    player_name = VALUES(player_name),
    current_count = VALUES(current_count),
    is_completed = VALUES(is_completed),
    completed_time = VALUES(completed_time)";

const SELECT_PLAYER: &str = "
SELECT milestone_id, player_name, current_count, is_completed, completed_time
FROM milestone_progress WHERE player_id = ?";

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
    WHERE is_completed = 1 AND completed_time >= ?
    GROUP BY player_id
) t
ORDER BY t.c DESC, name ASC
LIMIT ?";

const PLAYER_COUNT: &str = "
SELECT COUNT(DISTINCT player_id)
FROM milestone_progress
WHERE is_completed = 1 AND completed_time >= ?";

/// MySQL-backed progress repository
#[derive(Debug)]
pub struct MySqlRepository {
    options: MySqlConnectOptions,
    pool_size: u32,
    pool: RwLock<Option<MySqlPool>>,
}

impl MySqlRepository {
    pub fn new(settings: &DatabaseSettings) -> Self {
        let ssl_mode = if settings.ssl {
            MySqlSslMode::Required
        } else {
            MySqlSslMode::Disabled
        };
        let options = MySqlConnectOptions::new()
            .host(&settings.host)
            .port(settings.port)
            .database(&settings.database)
            .username(&settings.username)
            .password(&settings.password)
            .ssl_mode(ssl_mode);
        Self {
            options,
            pool_size: settings.pool_size.max(1),
            pool: RwLock::new(None),
        }
    }

    /// Connect using a `mysql://` URL
    pub fn from_url(url: &str, pool_size: u32) -> Result<Self, StorageError> {
        let options: MySqlConnectOptions = url.parse()?;
        Ok(Self {
            options,
            pool_size: pool_size.max(1),
            pool: RwLock::new(None),
        })
    }

    fn pool(&self) -> Result<MySqlPool, StorageError> {
        self.pool
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(StorageError::NotInitialized)
    }
}

fn to_progress(player: PlayerId, row: &MySqlRow) -> Result<Progress, StorageError> {
    let count: i32 = row.try_get("current_count")?;
    Ok(Progress {
        player_id: player,
        player_name: row.try_get("player_name")?,
        milestone_id: MilestoneId::new(row.try_get::<String, _>("milestone_id")?),
        current_count: u32::try_from(count).unwrap_or(0),
        completed: row.try_get("is_completed")?,
        completed_time: row.try_get::<Option<DateTime<Utc>>, _>("completed_time")?,
    })
}

fn upsert_query(progress: &Progress) -> sqlx::query::Query<'_, sqlx::MySql, sqlx::mysql::MySqlArguments> {
    sqlx::query(UPSERT)
        .bind(progress.player_id.to_string())
        .bind(&progress.player_name)
        .bind(progress.milestone_id.as_str())
        .bind(i32::try_from(progress.current_count).unwrap_or(i32::MAX))
        .bind(progress.completed)
        .bind(progress.completed_time)
}

#[async_trait]
impl ProgressRepository for MySqlRepository {
    async fn init(&self) -> Result<(), StorageError> {
        info!(pool_size = self.pool_size, "Connecting to MySQL");
        let pool = MySqlPoolOptions::new()
            .max_connections(self.pool_size)
            .acquire_timeout(Duration::from_secs(10))
            .connect_with(self.options.clone())
            .await?;
        sqlx::query(CREATE_TABLE).execute(&pool).await?;
        *self.pool.write().unwrap_or_else(PoisonError::into_inner) = Some(pool);
        Ok(())
    }

    async fn shutdown(&self) {
        let pool = self.pool.write().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(pool) = pool {
            pool.close().await;
        }
    }

    async fn load_player_progress(
        &self,
        player: PlayerId,
    ) -> Result<HashMap<MilestoneId, Progress>, StorageError> {
        let pool = self.pool()?;
        let rows = sqlx::query(SELECT_PLAYER)
            .bind(player.to_string())
            .fetch_all(&pool)
            .await?;

        let mut results = HashMap::with_capacity(rows.len());
        for row in &rows {
            let progress = to_progress(player, row)?;
            results.insert(progress.milestone_id.clone(), progress);
        }
        Ok(results)
    }

    async fn save_player_progress(&self, progress: &Progress) -> Result<(), StorageError> {
        let pool = self.pool()?;
        upsert_query(progress).execute(&pool).await?;
        Ok(())
    }

    async fn save_all(&self, progress: &[Progress]) -> Result<(), StorageError> {
        if progress.is_empty() {
            return Ok(());
        }
        let pool = self.pool()?;
        let mut tx = pool.begin().await?;
        for record in progress {
            upsert_query(record).execute(&mut *tx).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn get_top_players(
        &self,
        after: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<LeaderboardEntry>, StorageError> {
        let pool = self.pool()?;
        let rows = sqlx::query(TOP_PLAYERS)
            .bind(after)
            .bind(limit)
            .fetch_all(&pool)
            .await?;

        rows.iter()
            .map(|row| -> Result<LeaderboardEntry, StorageError> {
                let completions: i64 = row.try_get("c")?;
                Ok(LeaderboardEntry {
                    player_name: row.try_get("name")?,
                    completions: completions.max(0) as u64,
                })
            })
            .collect()
    }

    async fn get_player_count_with_completions(
        &self,
        after: DateTime<Utc>,
    ) -> Result<u64, StorageError> {
        let pool = self.pool()?;
        let count: i64 = sqlx::query_scalar(PLAYER_COUNT)
            .bind(after)
            .fetch_one(&pool)
            .await?;
        Ok(count.max(0) as u64)
    }

    fn backend_name(&self) -> &'static str {
        "mysql"
    }
}
