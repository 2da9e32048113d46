use thiserror::Error;

use crate::models::{EventId, UserId};

#[derive(Error, Debug)]
pub enum StoreError {
    /// The slot's leader no longer matches the value the writer observed.
    #[error("Slot changed concurrently (current leader: {current:?})")]
    Conflict { current: Option<UserId> },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Schedules already materialized for event {0}")]
    AlreadyMaterialized(EventId),

    #[error("Ledger lock poisoned")]
    Poisoned,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    pub fn event_not_found(event_id: EventId) -> Self {
        StoreError::NotFound(format!("event {}", event_id))
    }

    pub fn slot_not_found(event_id: EventId, day_number: u32) -> Self {
        StoreError::NotFound(format!("event {} day {}", event_id, day_number))
    }
}
