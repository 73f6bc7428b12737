//! # Milestone Advancement
//!
//! Mirrors milestones into the game's advancement tree.
//!
//! - [`resolver`]: parent-first ordering
//! - [`mapper`]: milestone to host definition
//! - [`SyncService`]: registration and per-player reconciliation
//! - [`AdvancementHost`]: the port onto the game server

pub mod host;
pub mod in_memory;
pub mod mapper;
pub mod registration;
pub mod resolver;
pub mod sync;

pub use host::{AdvancementHost, EntryHandle, EntryState, HostError, COMPLETION_CRITERION};
pub use in_memory::{HostCall, InMemoryHost};
pub use mapper::definition_for;
pub use registration::RegistrationMap;
pub use resolver::sort_topologically;
pub use sync::{RegistrationReport, SyncOutcome, SyncReport, SyncService};
