//! Error types for Milestone

use thiserror::Error;

/// Error thrown when an operation names a milestone that is not loaded
#[derive(Debug, Error)]
#[error("Milestone '{milestone_id}' not found ({loaded} milestones loaded)")]
pub struct UnknownMilestoneError {
    pub milestone_id: String,
    pub loaded: usize,
}

/// Error thrown when a definition file cannot be turned into milestones
#[derive(Debug, Error)]
#[error("Invalid milestone '{id}' in {source_file}: {reason}")]
pub struct InvalidDefinitionError {
    pub id: String,
    pub source_file: String,
    pub reason: String,
}

/// General Milestone error type
#[derive(Debug, Error)]
pub enum MilestoneError {
    #[error(transparent)]
    UnknownMilestone(#[from] UnknownMilestoneError),

    #[error(transparent)]
    InvalidDefinition(#[from] InvalidDefinitionError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, MilestoneError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_milestone_message() {
        let err = UnknownMilestoneError {
            milestone_id: "story:root".to_string(),
            loaded: 3,
        };
        assert_eq!(
            err.to_string(),
            "Milestone 'story:root' not found (3 milestones loaded)"
        );
    }

    #[test]
    fn test_transparent_wrapping() {
        let err: MilestoneError = InvalidDefinitionError {
            id: "broken".to_string(),
            source_file: "milestones/a.yml".to_string(),
            reason: "unknown type".to_string(),
        }
        .into();
        assert!(err.to_string().contains("milestones/a.yml"));
    }
}
