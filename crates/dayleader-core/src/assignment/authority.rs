//! Single-slot leader changes outside bulk allocation.
//!
//! - `claim`: a participant takes an open slot (voluntary events only)
//! - `reassign`: the owner puts anyone on the roster in charge of a slot
//! - `backup_assign`: the owner fills a slot the backup detector flagged
//! - `unassign`: the owner clears a slot
//!
//! Every write is a compare-and-set against the leader observed when the
//! ledger was read, so two writers racing for one slot cannot both win.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::assignment::backup::needs_backup;
use crate::assignment::permission::AuthoringWindow;
use crate::error::AssignmentError;
use crate::models::{AssignmentPolicy, Event, Ledger, Roster, Schedule, UserId};
use crate::store::{ScheduleStore, StoreError};

/// Old and new leader of a reassigned slot, kept for the audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct Reassignment {
    pub day_number: u32,
    pub old_leader: Option<UserId>,
    pub new_leader: Option<UserId>,
}

fn require_assignable(event: &Event) -> Result<(), AssignmentError> {
    if event.is_approved() {
        Ok(())
    } else {
        Err(AssignmentError::Precondition(format!(
            "event {} is {}",
            event.id, event.status
        )))
    }
}

fn require_owner(event: &Event, actor: UserId) -> Result<(), AssignmentError> {
    if event.is_owner(actor) {
        Ok(())
    } else {
        Err(AssignmentError::NotEligible(format!(
            "user {} is not the owner of event {}",
            actor, event.id
        )))
    }
}

fn require_slot(ledger: &Ledger, event: &Event, day_number: u32) -> Result<Schedule, AssignmentError> {
    ledger.get(day_number).cloned().ok_or_else(|| {
        AssignmentError::Precondition(format!(
            "event {} has no schedule for day {}",
            event.id, day_number
        ))
    })
}

fn require_member(roster: &Roster, event: &Event, user_id: UserId) -> Result<(), AssignmentError> {
    if roster.is_eligible(user_id) {
        Ok(())
    } else {
        Err(AssignmentError::NotEligible(format!(
            "user {} is not an active participant of event {}",
            user_id, event.id
        )))
    }
}

/// Write a leader change, turning a lost race into `AlreadyAssigned`.
fn write_leader<S: ScheduleStore + ?Sized>(
    store: &S,
    slot: &Schedule,
    leader: Option<UserId>,
) -> Result<Schedule, AssignmentError> {
    match store.compare_and_set_leader(slot.event_id, slot.day_number, slot.leader_id, leader) {
        Ok(updated) => Ok(updated),
        Err(StoreError::Conflict { current }) => {
            warn!(
                event_id = slot.event_id,
                day = slot.day_number,
                expected = ?slot.leader_id,
                current = ?current,
                "Lost leader write race"
            );
            Err(AssignmentError::AlreadyAssigned(format!(
                "day {} changed while updating (now led by {})",
                slot.day_number,
                current.map_or_else(|| "nobody".to_string(), |id| format!("user {}", id))
            )))
        }
        Err(e) => Err(e.into()),
    }
}

pub fn claim<S: ScheduleStore + ?Sized>(
    store: &S,
    event: &Event,
    roster: &Roster,
    ledger: &Ledger,
    user_id: UserId,
    day_number: u32,
    now: DateTime<Utc>,
) -> Result<Schedule, AssignmentError> {
    require_assignable(event)?;
    if event.assignment_policy != AssignmentPolicy::Voluntary {
        return Err(AssignmentError::NotEligible(format!(
            "event {} uses {} assignment; slots cannot be self-claimed",
            event.id, event.assignment_policy
        )));
    }
    require_member(roster, event, user_id)?;
    let slot = require_slot(ledger, event, day_number)?;

    if let Some(leader) = slot.leader_id {
        return Err(AssignmentError::AlreadyAssigned(format!(
            "day {} is already led by user {}",
            day_number, leader
        )));
    }
    if AuthoringWindow::for_schedule(&slot, &event.settings).has_closed(now) {
        return Err(AssignmentError::NotEligible(format!(
            "day {} can no longer be claimed",
            day_number
        )));
    }
    if let Some(cap) = event.settings.max_leadership_count {
        let held = ledger.leadership_count(user_id);
        if held >= cap {
            return Err(AssignmentError::CapReached(format!(
                "user {} already leads {} of {} allowed days",
                user_id, held, cap
            )));
        }
    }

    let updated = write_leader(store, &slot, Some(user_id))?;
    info!(event_id = event.id, day = day_number, user_id, "Slot claimed");
    Ok(updated)
}

pub fn reassign<S: ScheduleStore + ?Sized>(
    store: &S,
    event: &Event,
    roster: &Roster,
    ledger: &Ledger,
    actor: UserId,
    day_number: u32,
    new_leader: UserId,
) -> Result<Reassignment, AssignmentError> {
    require_owner(event, actor)?;
    require_assignable(event)?;
    require_member(roster, event, new_leader)?;
    let slot = require_slot(ledger, event, day_number)?;

    let updated = write_leader(store, &slot, Some(new_leader))?;
    info!(
        event_id = event.id,
        day = day_number,
        old_leader = ?slot.leader_id,
        new_leader,
        "Slot reassigned"
    );
    Ok(Reassignment {
        day_number,
        old_leader: slot.leader_id,
        new_leader: updated.leader_id,
    })
}

pub fn backup_assign<S: ScheduleStore + ?Sized>(
    store: &S,
    event: &Event,
    roster: &Roster,
    ledger: &Ledger,
    actor: UserId,
    day_number: u32,
    backup_leader: UserId,
) -> Result<Schedule, AssignmentError> {
    require_owner(event, actor)?;
    require_assignable(event)?;
    let slot = require_slot(ledger, event, day_number)?;

    if !needs_backup(&slot, ledger.signals(day_number)) {
        return Err(AssignmentError::BackupNotNeeded(format!(
            "day {} has a leader with published content",
            day_number
        )));
    }
    require_member(roster, event, backup_leader)?;

    let updated = write_leader(store, &slot, Some(backup_leader))?;
    info!(
        event_id = event.id,
        day = day_number,
        replaced = ?slot.leader_id,
        backup_leader,
        "Backup leader assigned"
    );
    Ok(updated)
}

/// Clear a slot's leader. Returns whoever was removed.
pub fn unassign<S: ScheduleStore + ?Sized>(
    store: &S,
    event: &Event,
    ledger: &Ledger,
    actor: UserId,
    day_number: u32,
) -> Result<Option<UserId>, AssignmentError> {
    require_owner(event, actor)?;
    let slot = require_slot(ledger, event, day_number)?;
    if slot.leader_id.is_none() {
        return Ok(None);
    }
    write_leader(store, &slot, None)?;
    info!(event_id = event.id, day = day_number, removed = ?slot.leader_id, "Slot unassigned");
    Ok(slot.leader_id)
}
