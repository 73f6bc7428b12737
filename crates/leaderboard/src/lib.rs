//! # Milestone Leaderboard
//!
//! Completion rankings read from the progress repository on a timer and
//! served from an in-memory snapshot.

pub mod cache;
pub mod snapshot;
pub mod window;

pub use cache::{LeaderboardCache, RefreshHandle};
pub use snapshot::{LeaderboardSnapshot, NO_NAME};
pub use window::{month_start, week_start, LeaderboardWindow, WindowBounds};
