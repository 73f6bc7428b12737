//! # Milestone Storage
//!
//! Durable per-player progress behind [`ProgressRepository`].
//!
//! ```text
//! ProgressRepository
//!   ├── SqliteRepository   embedded file, single serialized connection
//!   ├── MySqlRepository    pooled network connections
//!   └── InMemoryRepository tests and dry runs
//! ```

pub mod error;
pub mod in_memory;
pub mod mysql;
pub mod repository;
pub mod sqlite;

use std::path::Path;
use std::sync::Arc;

pub use error::StorageError;
pub use in_memory::InMemoryRepository;
pub use mysql::MySqlRepository;
pub use repository::{LeaderboardEntry, ProgressRepository};
pub use sqlite::SqliteRepository;

use shared::{DatabaseBackend, Settings};

/// Pick the backend named in `settings`. The result still needs `init()`.
pub fn build_repository(settings: &Settings, data_dir: &Path) -> Arc<dyn ProgressRepository> {
    match settings.database.backend {
        DatabaseBackend::Sqlite => Arc::new(SqliteRepository::new(settings.sqlite_path(data_dir))),
        DatabaseBackend::Mysql => Arc::new(MySqlRepository::new(&settings.database)),
    }
}
