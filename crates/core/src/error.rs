//! Service errors

use thiserror::Error;

use shared::{MilestoneError, UnknownMilestoneError};
use storage::StorageError;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Configuration error: {0}")]
    Config(#[from] MilestoneError),

    #[error(transparent)]
    UnknownMilestone(#[from] UnknownMilestoneError),

    #[error("Scheduler is closed")]
    SchedulerClosed,
}

pub type Result<T> = std::result::Result<T, ServiceError>;
