//! Artifact registry and the named-slot persistence behind it.
//!
//! A registry holds the complete set of artifacts produced by the last split
//! or protection run. Writes replace the whole set and are persisted before
//! they become visible; readers always observe a complete snapshot.

mod artifacts;
mod memory;
mod sqlite;
mod store;

pub use artifacts::ArtifactRegistry;
pub use memory::MemorySlotStore;
pub use sqlite::SqliteSlotStore;
pub use store::{RegistryError, SlotStore};

/// Slot holding the output of the splitting service.
pub const SPLIT_SLOT: &str = "split_artifacts";

/// Slot holding the output of the protection step.
pub const PROTECTED_SLOT: &str = "protected_artifacts";

/// Slot holding the pending scheduled job, if any.
pub const SCHEDULE_SLOT: &str = "scheduled_job";
