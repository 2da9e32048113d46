use std::str::FromStr;

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::error::AssignmentError;
use crate::models::{EventId, UserId};
use crate::utils::format_date;

/// Hours after a slot's midnight (UTC) by which the leader's material is due.
/// 9 hours gives readers the material by the start of their morning.
const DEFAULT_CONTENT_DEADLINE_HOURS: i64 = 9;

/// Hours after a slot's midnight by which at least one reaction is expected.
/// The end of the slot's own day.
const DEFAULT_ENGAGEMENT_DEADLINE_HOURS: i64 = 24;

/// Leaders may start preparing material the day before their slot.
const DEFAULT_WINDOW_OPENS_HOURS: i64 = -24;

/// Leaders may still edit material until the end of the following day.
const DEFAULT_WINDOW_CLOSES_HOURS: i64 = 48;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    #[default]
    Draft,
    Pending,
    Approved,
    Ongoing,
    Completed,
    Cancelled,
}

impl std::fmt::Display for EventStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventStatus::Draft => write!(f, "Draft"),
            EventStatus::Pending => write!(f, "Pending"),
            EventStatus::Approved => write!(f, "Approved"),
            EventStatus::Ongoing => write!(f, "Ongoing"),
            EventStatus::Completed => write!(f, "Completed"),
            EventStatus::Cancelled => write!(f, "Cancelled"),
        }
    }
}

/// How leaders are distributed across an event's day slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
#[serde(rename_all = "lowercase")]
pub enum AssignmentPolicy {
    /// Uniform draw per slot among participants under their cap.
    Random,
    /// Least-loaded participant first, ties by roster order.
    #[default]
    Balanced,
    /// Balanced, but never the previous day's leader when avoidable.
    Rotation,
    /// Only owner-curated volunteer pairs; everything else stays open for claims.
    Voluntary,
}

impl AssignmentPolicy {
    pub const ALL: [AssignmentPolicy; 4] = [
        AssignmentPolicy::Random,
        AssignmentPolicy::Balanced,
        AssignmentPolicy::Rotation,
        AssignmentPolicy::Voluntary,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AssignmentPolicy::Random => "random",
            AssignmentPolicy::Balanced => "balanced",
            AssignmentPolicy::Rotation => "rotation",
            AssignmentPolicy::Voluntary => "voluntary",
        }
    }
}

impl std::fmt::Display for AssignmentPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssignmentPolicy {
    type Err = AssignmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        AssignmentPolicy::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| AssignmentError::UnsupportedPolicy(s.to_string()))
    }
}

/// Per-event assignment configuration. Offsets are hours relative to the
/// slot date's midnight UTC and may be negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventSettings {
    /// Maximum number of slots one participant may lead. `None` is unbounded.
    pub max_leadership_count: Option<u32>,
    pub content_deadline_hours: i64,
    pub engagement_deadline_hours: i64,
    pub window_opens_hours: i64,
    pub window_closes_hours: i64,
}

impl Default for EventSettings {
    fn default() -> Self {
        Self {
            max_leadership_count: None,
            content_deadline_hours: DEFAULT_CONTENT_DEADLINE_HOURS,
            engagement_deadline_hours: DEFAULT_ENGAGEMENT_DEADLINE_HOURS,
            window_opens_hours: DEFAULT_WINDOW_OPENS_HOURS,
            window_closes_hours: DEFAULT_WINDOW_CLOSES_HOURS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub name: String,
    pub owner_id: UserId,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub status: EventStatus,
    #[serde(default)]
    pub assignment_policy: AssignmentPolicy,
    /// Weekdays on which no reading slot is created (e.g. Sundays off).
    #[serde(default)]
    pub rest_weekdays: Vec<Weekday>,
    #[serde(default)]
    pub rest_dates: Vec<NaiveDate>,
    #[serde(default)]
    pub settings: EventSettings,
}

impl Event {
    /// Approved and running events accept assignments.
    pub fn is_approved(&self) -> bool {
        matches!(self.status, EventStatus::Approved | EventStatus::Ongoing)
    }

    pub fn is_owner(&self, user_id: UserId) -> bool {
        self.owner_id == user_id
    }

    pub fn is_rest_day(&self, date: NaiveDate) -> bool {
        self.rest_weekdays.contains(&date.weekday()) || self.rest_dates.contains(&date)
    }

    /// Number of non-rest days in the date range.
    pub fn reading_day_count(&self) -> usize {
        let mut count = 0;
        let mut date = self.start_date;
        while date <= self.end_date {
            if !self.is_rest_day(date) {
                count += 1;
            }
            match date.succ_opt() {
                Some(next) => date = next,
                None => break,
            }
        }
        count
    }

    /// "Mar 02, 2026 - Mar 29, 2026"
    pub fn date_range_display(&self) -> String {
        format!(
            "{} - {}",
            format_date(self.start_date),
            format_date(self.end_date)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(start: NaiveDate, end: NaiveDate) -> Event {
        Event {
            id: 1,
            name: "Spring Reading".to_string(),
            owner_id: 100,
            start_date: start,
            end_date: end,
            status: EventStatus::Approved,
            assignment_policy: AssignmentPolicy::Balanced,
            rest_weekdays: Vec::new(),
            rest_dates: Vec::new(),
            settings: EventSettings::default(),
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_policy_from_str() {
        assert_eq!("random".parse::<AssignmentPolicy>().unwrap(), AssignmentPolicy::Random);
        assert_eq!(" Rotation ".parse::<AssignmentPolicy>().unwrap(), AssignmentPolicy::Rotation);
        assert_eq!("VOLUNTARY".parse::<AssignmentPolicy>().unwrap(), AssignmentPolicy::Voluntary);
    }

    #[test]
    fn test_policy_from_str_unsupported() {
        let err = "lottery".parse::<AssignmentPolicy>().unwrap_err();
        assert!(matches!(err, AssignmentError::UnsupportedPolicy(ref s) if s == "lottery"));
    }

    #[test]
    fn test_policy_serde_lowercase() {
        let json = serde_json::to_string(&AssignmentPolicy::Rotation).unwrap();
        assert_eq!(json, "\"rotation\"");
    }

    #[test]
    fn test_is_approved() {
        let mut e = event(date(2026, 3, 2), date(2026, 3, 8));
        assert!(e.is_approved());
        e.status = EventStatus::Ongoing;
        assert!(e.is_approved());
        e.status = EventStatus::Pending;
        assert!(!e.is_approved());
        e.status = EventStatus::Completed;
        assert!(!e.is_approved());
    }

    #[test]
    fn test_reading_day_count_skips_rest_days() {
        // Mon Mar 2 .. Sun Mar 8, 2026
        let mut e = event(date(2026, 3, 2), date(2026, 3, 8));
        assert_eq!(e.reading_day_count(), 7);

        e.rest_weekdays = vec![Weekday::Sun];
        assert_eq!(e.reading_day_count(), 6);

        e.rest_dates = vec![date(2026, 3, 4)];
        assert_eq!(e.reading_day_count(), 5);
    }

    #[test]
    fn test_reading_day_count_inverted_range() {
        let e = event(date(2026, 3, 8), date(2026, 3, 2));
        assert_eq!(e.reading_day_count(), 0);
    }

    #[test]
    fn test_settings_default_when_missing() {
        let json = r#"{
            "id": 7, "name": "Book Club", "owner_id": 1,
            "start_date": "2026-03-02", "end_date": "2026-03-04"
        }"#;
        let e: Event = serde_json::from_str(json).unwrap();
        assert_eq!(e.status, EventStatus::Draft);
        assert_eq!(e.assignment_policy, AssignmentPolicy::Balanced);
        assert_eq!(e.settings, EventSettings::default());
    }
}
