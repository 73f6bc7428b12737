//! # Milestone Shared
//!
//! Vocabulary used across all Milestone crates: milestone definitions,
//! progress records, settings and the error types.

pub mod config;
pub mod error;
pub mod loader;
pub mod milestone;
pub mod progress;
pub mod registry;
pub mod trigger;

// Re-exports
pub use config::*;
pub use error::*;
pub use loader::*;
pub use milestone::*;
pub use progress::*;
pub use registry::*;
pub use trigger::*;
