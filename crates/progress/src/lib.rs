//! # Milestone Progress
//!
//! Pure progress logic: no I/O, no async.
//!
//! - [`ProgressEngine`]: grant / revoke / add_progress over per-player sessions
//! - [`TriggerMatcher`]: game events to engine operations

pub mod engine;
pub mod event;
pub mod matcher;

pub use engine::{PlayerSession, ProgressEngine};
pub use event::{GameEvent, ProgressEvent};
pub use matcher::{TriggerAction, TriggerMatcher};
