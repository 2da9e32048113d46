//! Who may act on a slot, and when.
//!
//! The event owner may always act. A leader may author material for their
//! own slot only inside the slot's authoring window, which opens and closes
//! at fixed offsets from the slot date (see `EventSettings`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::assignment::backup::needs_backup;
use crate::models::{AssignmentPolicy, Event, EventSettings, Ledger, Roster, Schedule, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct AuthoringWindow {
    pub opens_at: DateTime<Utc>,
    pub closes_at: DateTime<Utc>,
}

impl AuthoringWindow {
    pub fn for_schedule(schedule: &Schedule, settings: &EventSettings) -> Self {
        Self {
            opens_at: schedule.at_offset_hours(settings.window_opens_hours),
            closes_at: schedule.at_offset_hours(settings.window_closes_hours),
        }
    }

    /// Inclusive at both ends.
    pub fn contains(&self, now: DateTime<Utc>) -> bool {
        self.opens_at <= now && now <= self.closes_at
    }

    pub fn has_closed(&self, now: DateTime<Utc>) -> bool {
        now > self.closes_at
    }
}

/// Owner always; the slot's leader only while the window is open.
pub fn can_author(event: &Event, schedule: &Schedule, actor: UserId, now: DateTime<Utc>) -> bool {
    if event.is_owner(actor) {
        return true;
    }
    schedule.is_led_by(actor) && AuthoringWindow::for_schedule(schedule, &event.settings).contains(now)
}

/// Capability flags for one actor, optionally scoped to one slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct Capabilities {
    pub is_owner: bool,
    pub is_participant: bool,
    pub is_leader: bool,
    pub can_view: bool,
    pub can_claim: bool,
    pub can_author: bool,
    pub can_backup: bool,
    pub can_reassign: bool,
    pub window: Option<AuthoringWindow>,
}

pub fn check_permissions(
    event: &Event,
    roster: &Roster,
    ledger: &Ledger,
    actor: UserId,
    day_number: Option<u32>,
    now: DateTime<Utc>,
) -> Capabilities {
    let is_owner = event.is_owner(actor);
    let participant = roster.find(actor);
    let is_participant = participant.is_some_and(|p| p.can_view());
    let mut caps = Capabilities {
        is_owner,
        is_participant,
        is_leader: false,
        can_view: is_owner || is_participant,
        can_claim: false,
        can_author: false,
        can_backup: false,
        can_reassign: is_owner && event.is_approved(),
        window: None,
    };

    let Some(schedule) = day_number.and_then(|d| ledger.get(d)) else {
        return caps;
    };
    let window = AuthoringWindow::for_schedule(schedule, &event.settings);
    let cap = event.settings.max_leadership_count;
    let under_cap = cap.map_or(true, |c| ledger.leadership_count(actor) < c);

    caps.is_leader = schedule.is_led_by(actor);
    caps.can_author = can_author(event, schedule, actor, now);
    caps.can_claim = event.is_approved()
        && event.assignment_policy == AssignmentPolicy::Voluntary
        && roster.is_eligible(actor)
        && !schedule.has_leader()
        && under_cap
        && !window.has_closed(now);
    caps.can_backup = is_owner
        && event.is_approved()
        && needs_backup(schedule, ledger.signals(schedule.day_number));
    caps.window = Some(window);
    caps
}
