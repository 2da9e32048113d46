//! Data models for reading events and their leader ledger.
//!
//! - `Event`, `EventSettings`, `EventStatus`, `AssignmentPolicy`: the event
//!   being scheduled and its assignment configuration
//! - `Schedule`, `Ledger`, `SlotSignals`, `ScheduleView`: day slots and the
//!   per-slot content/engagement signals
//! - `Participant`, `Roster`, `EnrollmentStatus`: who may lead

pub mod event;
pub mod participant;
pub mod schedule;

pub use event::{AssignmentPolicy, Event, EventSettings, EventStatus};
pub use participant::{EnrollmentStatus, Participant, Roster};
pub use schedule::{materialize_schedules, Ledger, Schedule, ScheduleView, SlotSignals};

/// Identifier of a user (participant or owner).
pub type UserId = i64;

/// Identifier of a reading event.
pub type EventId = i64;
