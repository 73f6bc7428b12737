//! Storage errors

use thiserror::Error;

/// Errors that can occur during repository operations
#[derive(Debug, Error)]
pub enum StorageError {
    /// `init()` has not run, or `shutdown()` already did
    #[error("Repository is not initialized")]
    NotInitialized,

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("MySQL error: {0}")]
    MySql(#[from] sqlx::Error),

    /// A stored row could not be turned back into a record
    #[error("Invalid record for player {player_id}: {reason}")]
    InvalidRecord { player_id: String, reason: String },

    #[error("Storage task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Persistence error: {message}")]
    Persistence { message: String },
}

impl StorageError {
    pub fn persistence(message: impl Into<String>) -> Self {
        StorageError::Persistence {
            message: message.into(),
        }
    }
}
