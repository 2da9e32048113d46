//! Leader assignment: allocation, single-slot changes, backup detection,
//! statistics and permission checks.

pub mod authority;
pub mod backup;
pub mod engine;
pub mod permission;
pub mod stats;

pub use authority::Reassignment;
pub use backup::{BackupCandidate, BackupPriority};
pub use engine::{
    allocate, AllocationOptions, AssignmentResult, RejectedVolunteer, SlotAssignment,
    SlotOutcome, VolunteerRejection,
};
pub use permission::{can_author, AuthoringWindow, Capabilities};
pub use stats::{AssignmentStatistics, LeaderWorkload};
