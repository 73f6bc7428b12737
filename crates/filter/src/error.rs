//! Filter errors
//!
//! Never surfaced to the connection: a message that cannot be inspected
//! is passed through unchanged.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    #[error("Cannot read entry id from '{0}'")]
    UnreadableEntry(String),
}
