//! # Milestone Core
//!
//! Wires the progress engine, advancement sync, outbound filter, storage
//! and leaderboard into one service.
//!
//! ```text
//! game event ─▶ TriggerMatcher ─▶ ProgressEngine ─┬─▶ PersistenceQueue ─▶ ProgressRepository
//!                                                 ├─▶ SyncService ─▶ AdvancementHost
//!                                                 └─▶ PlayerNotifier
//! outbound message ─▶ OutboundFilter
//! ProgressRepository ─▶ LeaderboardCache ─▶ Placeholders
//! ```

pub mod admin;
pub mod error;
pub mod notifier;
pub mod persistence;
pub mod placeholders;
pub mod runtime;
pub mod scheduler;
pub mod service;

pub use admin::MilestoneAdmin;
pub use error::{Result, ServiceError};
pub use notifier::{OfflineNotifier, PlayerNotifier, RecordingNotifier};
pub use persistence::PersistenceQueue;
pub use placeholders::Placeholders;
pub use runtime::{MilestoneRuntime, RuntimeBuilder, CONFIG_FILE};
pub use scheduler::{resume_on_player, InlineScheduler, MainThreadScheduler, Scheduler, Task};
pub use service::MilestoneService;
