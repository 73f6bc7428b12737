//! # Milestone Filter
//!
//! Hides host-native advancements from clients according to the
//! configured [`FilterMode`], while leaving this system's own entries
//! visible.

pub mod error;
pub mod message;
pub mod outbound;
pub mod policy;

pub use error::FilterError;
pub use message::{AddedEntries, AddedEntry, AdvancementsMessage, OutboundMessage, ProgressMap, SystemChatMessage};
pub use outbound::{FilterStats, FilterVerdict, FilterView, OutboundFilter, ADVANCEMENT_CHAT_MARKER};
pub use policy::FilterPolicy;
pub use shared::FilterMode;
