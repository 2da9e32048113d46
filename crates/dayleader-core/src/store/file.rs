use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::models::{
    Event, EventId, EventSettings, Participant, Schedule, SlotSignals, UserId,
};
use crate::store::{ContentSignals, EventDirectory, RosterProvider, ScheduleStore, StoreError};

/// Prefix for per-event ledger documents: `event_<id>.json`
const EVENT_FILE_PREFIX: &str = "event_";

/// Input document for `FileLedger::import`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventSeed {
    pub event: Event,
    /// Overrides the configured defaults when present.
    #[serde(default)]
    pub settings: Option<EventSettings>,
    #[serde(default)]
    pub participants: Vec<Participant>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct EventDocument {
    event: Event,
    #[serde(default)]
    participants: Vec<Participant>,
    #[serde(default)]
    schedules: Vec<Schedule>,
    #[serde(default)]
    signals: BTreeMap<u32, SlotSignals>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Stored<T> {
    data: T,
    saved_at: DateTime<Utc>,
}

impl<T> Stored<T> {
    fn new(data: T) -> Self {
        Self {
            data,
            saved_at: Utc::now(),
        }
    }
}

/// One JSON document per event under a data directory.
///
/// Writes go through a load, check, write cycle serialized by `write_lock`,
/// which makes compare-and-set exclusive within this process. Separate
/// processes sharing a directory are not coordinated.
pub struct FileLedger {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl FileLedger {
    pub fn new(dir: PathBuf) -> anyhow::Result<Self> {
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create data directory: {}", dir.display()))?;
        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    fn event_path(&self, event_id: EventId) -> PathBuf {
        self.dir.join(format!("{}{}.json", EVENT_FILE_PREFIX, event_id))
    }

    fn load(&self, event_id: EventId) -> Result<Stored<EventDocument>, StoreError> {
        let path = self.event_path(event_id);
        if !path.exists() {
            return Err(StoreError::event_not_found(event_id));
        }
        let contents = std::fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    fn save(&self, document: EventDocument) -> Result<(), StoreError> {
        let path = self.event_path(document.event.id);
        let contents = serde_json::to_string_pretty(&Stored::new(document))?;
        // Write-then-rename so readers never see a half-written document
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, contents)?;
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn update<T>(
        &self,
        event_id: EventId,
        apply: impl FnOnce(&mut EventDocument) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let _guard = self.write_lock.lock().map_err(|_| StoreError::Poisoned)?;
        let mut document = self.load(event_id)?.data;
        let result = apply(&mut document)?;
        self.save(document)?;
        Ok(result)
    }

    /// Create or replace an event and its roster. Existing slots and signals
    /// are kept so re-importing a roster never renumbers days.
    pub fn import(&self, seed: EventSeed, defaults: EventSettings) -> Result<Event, StoreError> {
        let _guard = self.write_lock.lock().map_err(|_| StoreError::Poisoned)?;
        let mut event = seed.event;
        event.settings = seed.settings.unwrap_or(defaults);

        let (schedules, signals) = match self.load(event.id) {
            Ok(existing) => (existing.data.schedules, existing.data.signals),
            Err(StoreError::NotFound(_)) => (Vec::new(), BTreeMap::new()),
            Err(e) => return Err(e),
        };

        info!(
            event_id = event.id,
            participants = seed.participants.len(),
            kept_schedules = schedules.len(),
            "Imported event"
        );
        self.save(EventDocument {
            event: event.clone(),
            participants: seed.participants,
            schedules,
            signals,
        })?;
        Ok(event)
    }

    pub fn record_content(&self, event_id: EventId, day_number: u32) -> Result<(), StoreError> {
        self.update(event_id, |doc| {
            doc.signals.entry(day_number).or_default().content = true;
            Ok(())
        })
    }

    pub fn record_engagement(&self, event_id: EventId, day_number: u32) -> Result<(), StoreError> {
        self.update(event_id, |doc| {
            doc.signals.entry(day_number).or_default().engagement = true;
            Ok(())
        })
    }

    /// When the event's document was last written.
    pub fn saved_at(&self, event_id: EventId) -> Result<DateTime<Utc>, StoreError> {
        Ok(self.load(event_id)?.saved_at)
    }
}

impl EventDirectory for FileLedger {
    fn event(&self, event_id: EventId) -> Result<Event, StoreError> {
        Ok(self.load(event_id)?.data.event)
    }
}

impl RosterProvider for FileLedger {
    fn participants(&self, event_id: EventId) -> Result<Vec<Participant>, StoreError> {
        Ok(self.load(event_id)?.data.participants)
    }
}

impl ScheduleStore for FileLedger {
    fn schedules(&self, event_id: EventId) -> Result<Vec<Schedule>, StoreError> {
        let mut schedules = self.load(event_id)?.data.schedules;
        schedules.sort_by_key(|s| s.day_number);
        Ok(schedules)
    }

    fn insert_schedules(
        &self,
        event_id: EventId,
        schedules: Vec<Schedule>,
    ) -> Result<(), StoreError> {
        self.update(event_id, |doc| {
            if !doc.schedules.is_empty() {
                return Err(StoreError::AlreadyMaterialized(event_id));
            }
            debug!(event_id, count = schedules.len(), "Materialized schedules");
            doc.schedules = schedules;
            Ok(())
        })
    }

    fn compare_and_set_leader(
        &self,
        event_id: EventId,
        day_number: u32,
        expected: Option<UserId>,
        leader: Option<UserId>,
    ) -> Result<Schedule, StoreError> {
        self.update(event_id, |doc| {
            let slot = doc
                .schedules
                .iter_mut()
                .find(|s| s.day_number == day_number)
                .ok_or_else(|| StoreError::slot_not_found(event_id, day_number))?;
            if slot.leader_id != expected {
                return Err(StoreError::Conflict {
                    current: slot.leader_id,
                });
            }
            slot.leader_id = leader;
            Ok(slot.clone())
        })
    }
}

impl ContentSignals for FileLedger {
    fn has_content(&self, event_id: EventId, day_number: u32) -> Result<bool, StoreError> {
        Ok(self.signals(event_id, day_number)?.content)
    }

    fn has_engagement(&self, event_id: EventId, day_number: u32) -> Result<bool, StoreError> {
        Ok(self.signals(event_id, day_number)?.engagement)
    }

    fn signals(&self, event_id: EventId, day_number: u32) -> Result<SlotSignals, StoreError> {
        Ok(self
            .load(event_id)?
            .data
            .signals
            .get(&day_number)
            .copied()
            .unwrap_or_default())
    }
}
