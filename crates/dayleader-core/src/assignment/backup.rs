//! Detection of slots that need a substitute leader.
//!
//! A slot needs backup when nobody leads it, or when its leader has not
//! published any material yet. Flagged slots are ranked by how close the
//! nearest outstanding deadline is; at an equal deadline, slots with no
//! leader at all come before dormant ones.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{EventSettings, Ledger, Schedule, SlotSignals, UserId};
use crate::utils::format_hours;

/// A deadline closer than this is `High` priority.
const URGENT_WINDOW_HOURS: i64 = 24;

/// A deadline closer than this is `Medium` priority.
const SOON_WINDOW_HOURS: i64 = 72;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
#[serde(rename_all = "lowercase")]
pub enum BackupPriority {
    Low,
    Medium,
    High,
    /// The deadline has already passed.
    Critical,
}

impl BackupPriority {
    fn from_hours_remaining(hours: i64) -> Self {
        if hours <= 0 {
            BackupPriority::Critical
        } else if hours < URGENT_WINDOW_HOURS {
            BackupPriority::High
        } else if hours < SOON_WINDOW_HOURS {
            BackupPriority::Medium
        } else {
            BackupPriority::Low
        }
    }
}

impl std::fmt::Display for BackupPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackupPriority::Low => write!(f, "Low"),
            BackupPriority::Medium => write!(f, "Medium"),
            BackupPriority::High => write!(f, "High"),
            BackupPriority::Critical => write!(f, "Critical"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct BackupCandidate {
    pub day_number: u32,
    pub date: NaiveDate,
    pub leader_id: Option<UserId>,
    pub needs_backup: bool,
    pub missing_content: bool,
    pub missing_engagement: bool,
    pub content_deadline: DateTime<Utc>,
    pub engagement_deadline: DateTime<Utc>,
    pub priority: BackupPriority,
    /// Hours until the nearest outstanding deadline; negative once overdue.
    pub hours_remaining: i64,
    /// `hours_remaining` for display, e.g. "in 2d 3h" or "5h overdue".
    pub due: String,
}

impl BackupCandidate {
    pub fn is_unassigned(&self) -> bool {
        self.leader_id.is_none()
    }
}

pub fn needs_backup(schedule: &Schedule, signals: SlotSignals) -> bool {
    !schedule.has_leader() || !signals.content
}

/// Evaluate one slot, flagged or not.
pub fn evaluate(
    schedule: &Schedule,
    signals: SlotSignals,
    settings: &EventSettings,
    now: DateTime<Utc>,
) -> BackupCandidate {
    let content_deadline = schedule.at_offset_hours(settings.content_deadline_hours);
    let engagement_deadline = schedule.at_offset_hours(settings.engagement_deadline_hours);
    let missing_content = !signals.content;
    let missing_engagement = !signals.engagement;

    let outstanding = [
        missing_content.then_some(content_deadline),
        missing_engagement.then_some(engagement_deadline),
    ];
    let nearest = outstanding
        .into_iter()
        .flatten()
        .min()
        .unwrap_or(content_deadline);
    let hours_remaining = (nearest - now).num_hours();

    BackupCandidate {
        day_number: schedule.day_number,
        date: schedule.date,
        leader_id: schedule.leader_id,
        needs_backup: needs_backup(schedule, signals),
        missing_content,
        missing_engagement,
        content_deadline,
        engagement_deadline,
        priority: BackupPriority::from_hours_remaining(hours_remaining),
        hours_remaining,
        due: format_hours(hours_remaining),
    }
}

/// Every slot that needs backup, most urgent first.
pub fn detect(ledger: &Ledger, settings: &EventSettings, now: DateTime<Utc>) -> Vec<BackupCandidate> {
    let mut candidates: Vec<BackupCandidate> = ledger
        .schedules()
        .iter()
        .map(|s| evaluate(s, ledger.signals(s.day_number), settings, now))
        .filter(|c| c.needs_backup)
        .collect();

    candidates.sort_by(|a, b| {
        a.hours_remaining
            .cmp(&b.hours_remaining)
            .then_with(|| b.is_unassigned().cmp(&a.is_unassigned()))
            .then_with(|| a.day_number.cmp(&b.day_number))
    });
    candidates
}
