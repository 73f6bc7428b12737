//! Trigger Matcher - maps game events to progress operations
//!
//! Stateless. The caller applies the returned actions to the engine.

use std::sync::Arc;

use shared::{Milestone, MilestoneId};

use crate::event::GameEvent;

/// What to do to one milestone in response to a game event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerAction {
    /// Counter milestones move by `amount`
    AddProgress { milestone_id: MilestoneId, amount: u32 },
    /// Everything else completes outright
    Grant { milestone_id: MilestoneId },
}

impl TriggerAction {
    pub fn milestone_id(&self) -> &MilestoneId {
        match self {
            TriggerAction::AddProgress { milestone_id, .. } | TriggerAction::Grant { milestone_id } => milestone_id,
        }
    }
}

/// Stateless event-to-action mapping
#[derive(Debug, Clone, Copy, Default)]
pub struct TriggerMatcher;

impl TriggerMatcher {
    pub fn new() -> Self {
        Self
    }

    /// Actions for every milestone whose trigger matches `event`, in load order
    pub fn match_event(&self, milestones: &[Arc<Milestone>], event: &GameEvent) -> Vec<TriggerAction> {
        milestones
            .iter()
            .filter_map(|milestone| {
                let trigger = milestone.trigger.as_ref()?;
                if !trigger.matches(event.kind, event.value.as_deref()) {
                    return None;
                }
                let milestone_id = milestone.id.clone();
                Some(if milestone.kind.is_counter() {
                    TriggerAction::AddProgress {
                        milestone_id,
                        amount: trigger.delta(event.amount.max(1)),
                    }
                } else {
                    TriggerAction::Grant { milestone_id }
                })
            })
            .collect()
    }
}
