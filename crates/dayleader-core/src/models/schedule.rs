use std::collections::HashMap;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AssignmentError;
use crate::models::{Event, EventId, Roster, UserId};

/// One reading day of an event. The leader is a plain user id; the
/// participant record lives with the enrollment provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    pub event_id: EventId,
    pub day_number: u32,
    pub date: NaiveDate,
    #[serde(default)]
    pub leader_id: Option<UserId>,
}

impl Schedule {
    pub fn new(event_id: EventId, day_number: u32, date: NaiveDate) -> Self {
        Self {
            event_id,
            day_number,
            date,
            leader_id: None,
        }
    }

    pub fn has_leader(&self) -> bool {
        self.leader_id.is_some()
    }

    pub fn is_led_by(&self, user_id: UserId) -> bool {
        self.leader_id == Some(user_id)
    }

    /// Midnight UTC at the start of the slot's date.
    pub fn day_start(&self) -> DateTime<Utc> {
        Utc.from_utc_datetime(&self.date.and_time(NaiveTime::default()))
    }

    /// `day_start` shifted by a (possibly negative) number of hours.
    pub fn at_offset_hours(&self, hours: i64) -> DateTime<Utc> {
        self.day_start() + Duration::hours(hours)
    }
}

/// Content and engagement recorded against a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SlotSignals {
    /// The leader's material has been published.
    pub content: bool,
    /// At least one reaction or comment has been recorded.
    pub engagement: bool,
}

/// Point-in-time snapshot of an event's slots and their signals, ordered by day.
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    schedules: Vec<Schedule>,
    signals: HashMap<u32, SlotSignals>,
}

impl Ledger {
    pub fn new(mut schedules: Vec<Schedule>, signals: HashMap<u32, SlotSignals>) -> Self {
        schedules.sort_by_key(|s| s.day_number);
        Self { schedules, signals }
    }

    pub fn schedules(&self) -> &[Schedule] {
        &self.schedules
    }

    pub fn get(&self, day_number: u32) -> Option<&Schedule> {
        self.schedules
            .binary_search_by_key(&day_number, |s| s.day_number)
            .ok()
            .map(|i| &self.schedules[i])
    }

    pub fn signals(&self, day_number: u32) -> SlotSignals {
        self.signals.get(&day_number).copied().unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.schedules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schedules.is_empty()
    }

    pub fn leadership_count(&self, user_id: UserId) -> u32 {
        self.schedules.iter().filter(|s| s.is_led_by(user_id)).count() as u32
    }

    pub fn days_led_by(&self, user_id: UserId) -> Vec<u32> {
        self.schedules
            .iter()
            .filter(|s| s.is_led_by(user_id))
            .map(|s| s.day_number)
            .collect()
    }
}

/// A slot as returned to callers after a claim or backup fill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct ScheduleView {
    pub event_id: EventId,
    pub day_number: u32,
    pub date: NaiveDate,
    pub leader_id: Option<UserId>,
    pub leader_nickname: Option<String>,
    pub has_content: bool,
}

impl ScheduleView {
    pub fn new(schedule: &Schedule, roster: &Roster, signals: SlotSignals) -> Self {
        Self {
            event_id: schedule.event_id,
            day_number: schedule.day_number,
            date: schedule.date,
            leader_id: schedule.leader_id,
            leader_nickname: schedule.leader_id.and_then(|id| roster.nickname(id)),
            has_content: signals.content,
        }
    }
}

/// Lay out an event's reading days as slots numbered 1..N, skipping rest days.
pub fn materialize_schedules(event: &Event) -> Result<Vec<Schedule>, AssignmentError> {
    if event.end_date < event.start_date {
        return Err(AssignmentError::Precondition(format!(
            "event {} ends ({}) before it starts ({})",
            event.id, event.end_date, event.start_date
        )));
    }

    let mut schedules = Vec::new();
    let mut date = event.start_date;
    loop {
        if !event.is_rest_day(date) {
            let day_number = schedules.len() as u32 + 1;
            schedules.push(Schedule::new(event.id, day_number, date));
        }
        if date >= event.end_date {
            break;
        }
        match date.succ_opt() {
            Some(next) => date = next,
            None => break,
        }
    }

    if schedules.is_empty() {
        return Err(AssignmentError::Precondition(format!(
            "event {} has no reading days between {} and {}",
            event.id, event.start_date, event.end_date
        )));
    }
    Ok(schedules)
}
