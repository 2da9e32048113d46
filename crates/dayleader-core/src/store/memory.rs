use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::debug;

use crate::models::{Event, EventId, Participant, Schedule, SlotSignals, UserId};
use crate::store::{ContentSignals, EventDirectory, RosterProvider, ScheduleStore, StoreError};

#[derive(Debug, Default)]
struct State {
    events: HashMap<EventId, Event>,
    participants: HashMap<EventId, Vec<Participant>>,
    schedules: HashMap<EventId, Vec<Schedule>>,
    signals: HashMap<(EventId, u32), SlotSignals>,
}

/// In-process ledger. Readers share the lock; every leader write takes the
/// write lock, so the compare-and-set check and the update are one step.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    state: RwLock<State>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, State>, StoreError> {
        self.state.read().map_err(|_| StoreError::Poisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, State>, StoreError> {
        self.state.write().map_err(|_| StoreError::Poisoned)
    }

    pub fn insert_event(&self, event: Event) -> Result<(), StoreError> {
        self.write()?.events.insert(event.id, event);
        Ok(())
    }

    pub fn set_participants(
        &self,
        event_id: EventId,
        participants: Vec<Participant>,
    ) -> Result<(), StoreError> {
        self.write()?.participants.insert(event_id, participants);
        Ok(())
    }

    pub fn record_content(&self, event_id: EventId, day_number: u32) -> Result<(), StoreError> {
        let mut state = self.write()?;
        state.signals.entry((event_id, day_number)).or_default().content = true;
        Ok(())
    }

    pub fn record_engagement(&self, event_id: EventId, day_number: u32) -> Result<(), StoreError> {
        let mut state = self.write()?;
        state.signals.entry((event_id, day_number)).or_default().engagement = true;
        Ok(())
    }
}

impl EventDirectory for MemoryLedger {
    fn event(&self, event_id: EventId) -> Result<Event, StoreError> {
        self.read()?
            .events
            .get(&event_id)
            .cloned()
            .ok_or_else(|| StoreError::event_not_found(event_id))
    }
}

impl RosterProvider for MemoryLedger {
    fn participants(&self, event_id: EventId) -> Result<Vec<Participant>, StoreError> {
        Ok(self
            .read()?
            .participants
            .get(&event_id)
            .cloned()
            .unwrap_or_default())
    }
}

impl ScheduleStore for MemoryLedger {
    fn schedules(&self, event_id: EventId) -> Result<Vec<Schedule>, StoreError> {
        let mut schedules = self
            .read()?
            .schedules
            .get(&event_id)
            .cloned()
            .unwrap_or_default();
        schedules.sort_by_key(|s| s.day_number);
        Ok(schedules)
    }

    fn insert_schedules(
        &self,
        event_id: EventId,
        schedules: Vec<Schedule>,
    ) -> Result<(), StoreError> {
        let mut state = self.write()?;
        if state.schedules.get(&event_id).is_some_and(|s| !s.is_empty()) {
            return Err(StoreError::AlreadyMaterialized(event_id));
        }
        debug!(event_id, count = schedules.len(), "Materialized schedules");
        state.schedules.insert(event_id, schedules);
        Ok(())
    }

    fn compare_and_set_leader(
        &self,
        event_id: EventId,
        day_number: u32,
        expected: Option<UserId>,
        leader: Option<UserId>,
    ) -> Result<Schedule, StoreError> {
        let mut state = self.write()?;
        let slot = state
            .schedules
            .get_mut(&event_id)
            .and_then(|slots| slots.iter_mut().find(|s| s.day_number == day_number))
            .ok_or_else(|| StoreError::slot_not_found(event_id, day_number))?;

        if slot.leader_id != expected {
            return Err(StoreError::Conflict {
                current: slot.leader_id,
            });
        }
        slot.leader_id = leader;
        Ok(slot.clone())
    }
}

impl ContentSignals for MemoryLedger {
    fn has_content(&self, event_id: EventId, day_number: u32) -> Result<bool, StoreError> {
        Ok(self
            .read()?
            .signals
            .get(&(event_id, day_number))
            .map(|s| s.content)
            .unwrap_or(false))
    }

    fn has_engagement(&self, event_id: EventId, day_number: u32) -> Result<bool, StoreError> {
        Ok(self
            .read()?
            .signals
            .get(&(event_id, day_number))
            .map(|s| s.engagement)
            .unwrap_or(false))
    }

    fn signals(&self, event_id: EventId, day_number: u32) -> Result<SlotSignals, StoreError> {
        Ok(self
            .read()?
            .signals
            .get(&(event_id, day_number))
            .copied()
            .unwrap_or_default())
    }
}
