//! Collaborator interfaces for events, rosters, schedules and content signals.
//!
//! The assignment core never owns persistence. It reaches the outside world
//! through these traits:
//!
//! - `EventDirectory`: event lookup
//! - `RosterProvider`: enrolled participants of an event
//! - `ScheduleStore`: slot rows plus a compare-and-set leader write
//! - `ContentSignals`: has content been published / engagement recorded
//!
//! Two implementations ship with the crate: `MemoryLedger` for in-process
//! use and tests, and `FileLedger`, a JSON document per event on disk.

pub mod error;
pub mod file;
pub mod memory;

pub use error::StoreError;
pub use file::{EventSeed, FileLedger};
pub use memory::MemoryLedger;

use crate::models::{Event, EventId, Participant, Schedule, SlotSignals, UserId};

pub trait EventDirectory {
    /// Fails with `StoreError::NotFound` for unknown events.
    fn event(&self, event_id: EventId) -> Result<Event, StoreError>;
}

pub trait RosterProvider {
    /// Everyone enrolled in the event, observers included, in enrollment order.
    fn participants(&self, event_id: EventId) -> Result<Vec<Participant>, StoreError>;
}

pub trait ScheduleStore {
    /// Slots of an event ordered by day number. Empty before materialization.
    fn schedules(&self, event_id: EventId) -> Result<Vec<Schedule>, StoreError>;

    /// Store freshly materialized slots. Fails with `AlreadyMaterialized` if
    /// the event already has slots; day numbering never changes afterwards.
    fn insert_schedules(&self, event_id: EventId, schedules: Vec<Schedule>)
        -> Result<(), StoreError>;

    /// Set a slot's leader only if its current leader equals `expected`.
    ///
    /// Returns the updated slot, or `StoreError::Conflict` carrying the
    /// leader actually found. Of several writers racing with the same
    /// `expected` value at most one succeeds.
    fn compare_and_set_leader(
        &self,
        event_id: EventId,
        day_number: u32,
        expected: Option<UserId>,
        leader: Option<UserId>,
    ) -> Result<Schedule, StoreError>;
}

pub trait ContentSignals {
    fn has_content(&self, event_id: EventId, day_number: u32) -> Result<bool, StoreError>;

    fn has_engagement(&self, event_id: EventId, day_number: u32) -> Result<bool, StoreError>;

    fn signals(&self, event_id: EventId, day_number: u32) -> Result<SlotSignals, StoreError> {
        Ok(SlotSignals {
            content: self.has_content(event_id, day_number)?,
            engagement: self.has_engagement(event_id, day_number)?,
        })
    }
}

/// Everything `LeaderService` needs from its backend.
pub trait LeaderStore:
    EventDirectory + RosterProvider + ScheduleStore + ContentSignals + Send + Sync
{
}

impl<T> LeaderStore for T where
    T: EventDirectory + RosterProvider + ScheduleStore + ContentSignals + Send + Sync
{
}
