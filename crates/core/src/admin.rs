//! Administrative surface
//!
//! Everything an admin layer (commands, a console, the CLI) may do to a
//! running system.

use std::sync::Arc;

use shared::{Milestone, PlayerId, Progress};

use crate::error::Result;

pub trait MilestoneAdmin: Send + Sync {
    /// Re-read settings and definitions; returns the number of milestones loaded
    fn reload(&self) -> Result<usize>;

    /// `false` when the milestone is unknown or already completed
    fn grant(&self, player: PlayerId, milestone_id: &str) -> bool;

    fn revoke(&self, player: PlayerId, milestone_id: &str);

    fn get_progress(&self, player: PlayerId, milestone_id: &str) -> Option<Progress>;

    fn register_milestone(&self, milestone: Milestone);

    fn get_milestone(&self, milestone_id: &str) -> Option<Arc<Milestone>>;

    fn list_milestones(&self) -> Vec<Arc<Milestone>>;

    fn clear_milestones(&self);
}
