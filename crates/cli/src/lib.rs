//! # Milestone CLI
//!
//! Offline administration of a milestone data directory: scaffolding,
//! definition checks, progress inspection and leaderboard output.

pub mod commands;
