//! Center-aware, priority-tiered round-robin allocation of contacts to agents.
//!
//! A run validates the center-consistency rule, deduplicates contacts by phone,
//! ranks them by source priority and distributes each tier across the eligible
//! pool with a rotation cursor that persists across tiers and across runs.
//! Incremental runs skip phones already held by a prior snapshot and fold the
//! new assignments into the existing agent lists.

mod allocator;
pub mod domain;
mod engine;
mod merge;
mod preprocess;
pub mod report;
mod snapshot;
mod validator;

#[cfg(test)]
mod tests;

pub use allocator::{
    AllocationOutcome, Allocator, CursorEntry, PoolKey, RoundRobinCursors, TierTally,
};
pub use domain::{
    Agent, AssignedContact, AssignmentOrigin, Center, Contact, InputTables, PriorityMap,
    UnallocatedContact, UnallocatedReason, DEFAULT_PRIORITY,
};
pub use engine::{AllocationEngine, AllocationSettings};
pub use merge::{AgentAllocation, ModeKind, PriorSnapshot, RunMode};
pub use preprocess::{prepare_contacts, DuplicateContact, PreparedContact, PreparedContacts};
pub use report::{SummaryRow, SummarySheet};
pub use snapshot::{AgentTally, AllocationSnapshot, AllocationStats};
pub use validator::{validate_centers, CenterLayout, RecordCollection, ValidationError};
