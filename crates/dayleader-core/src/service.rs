//! Request-facing operation surface.
//!
//! `LeaderService` loads the event, roster and ledger from its store for
//! each call, runs the relevant assignment component, and writes leader
//! changes back through compare-and-set. It holds no state of its own
//! beyond the store and the clock, so it can be shared across threads.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::Rng;
use tracing::{debug, info, warn};

use crate::assignment::{
    authority, backup, engine, permission, stats, AllocationOptions, AssignmentResult,
    AssignmentStatistics, BackupCandidate, Capabilities, Reassignment, SlotOutcome,
};
use crate::clock::{Clock, SystemClock};
use crate::error::AssignmentError;
use crate::models::{
    materialize_schedules, AssignmentPolicy, Event, EventId, Ledger, Roster, Schedule,
    ScheduleView, UserId,
};
use crate::store::{LeaderStore, StoreError};

pub struct LeaderService<S> {
    store: S,
    clock: Arc<dyn Clock>,
}

impl<S: LeaderStore> LeaderService<S> {
    pub fn new(store: S) -> Self {
        Self::with_clock(store, Arc::new(SystemClock))
    }

    pub fn with_clock(store: S, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    // ===== Loading =====

    fn load_event(&self, event_id: EventId) -> Result<Event, AssignmentError> {
        match self.store.event(event_id) {
            Ok(event) => Ok(event),
            Err(StoreError::NotFound(what)) => Err(AssignmentError::Precondition(format!(
                "{} does not exist",
                what
            ))),
            Err(e) => Err(e.into()),
        }
    }

    fn load_roster(&self, event_id: EventId) -> Result<Roster, AssignmentError> {
        Ok(Roster::new(self.store.participants(event_id)?))
    }

    fn load_ledger(&self, event_id: EventId) -> Result<Ledger, AssignmentError> {
        let schedules = self.store.schedules(event_id)?;
        let mut signals = HashMap::with_capacity(schedules.len());
        for schedule in &schedules {
            signals.insert(
                schedule.day_number,
                self.store.signals(event_id, schedule.day_number)?,
            );
        }
        Ok(Ledger::new(schedules, signals))
    }

    fn view(&self, schedule: &Schedule, roster: &Roster) -> Result<ScheduleView, AssignmentError> {
        let signals = self.store.signals(schedule.event_id, schedule.day_number)?;
        Ok(ScheduleView::new(schedule, roster, signals))
    }

    // ===== Schedules =====

    /// Create the event's day slots. Only approved events are materialized,
    /// and only once.
    pub fn materialize(&self, event_id: EventId) -> Result<Vec<Schedule>, AssignmentError> {
        let event = self.load_event(event_id)?;
        if !event.is_approved() {
            return Err(AssignmentError::Precondition(format!(
                "event {} is {}; schedules are created on approval",
                event.id, event.status
            )));
        }
        let schedules = materialize_schedules(&event)?;
        match self.store.insert_schedules(event_id, schedules.clone()) {
            Ok(()) => {}
            Err(StoreError::AlreadyMaterialized(_)) => {
                return Err(AssignmentError::Precondition(format!(
                    "event {} already has schedules",
                    event_id
                )));
            }
            Err(e) => return Err(e.into()),
        }
        info!(event_id, days = schedules.len(), range = %event.date_range_display(), "Schedules materialized");
        Ok(schedules)
    }

    // ===== AutoAssign =====

    pub fn auto_assign(
        &self,
        event_id: EventId,
        policy: AssignmentPolicy,
        options: &AllocationOptions,
    ) -> Result<AssignmentResult, AssignmentError> {
        self.auto_assign_with_rng(event_id, policy, options, &mut rand::thread_rng())
    }

    /// Plan, then write each changed slot with compare-and-set. A slot that
    /// changed since it was read is left alone and reported as a conflict.
    /// Interrupted runs leave a partially filled ledger; re-running fills
    /// the rest without touching what is already assigned.
    pub fn auto_assign_with_rng<R: Rng + ?Sized>(
        &self,
        event_id: EventId,
        policy: AssignmentPolicy,
        options: &AllocationOptions,
        rng: &mut R,
    ) -> Result<AssignmentResult, AssignmentError> {
        let event = self.load_event(event_id)?;
        let roster = self.load_roster(event_id)?;
        let ledger = self.load_ledger(event_id)?;

        if roster.is_empty() {
            warn!(event_id, "Roster has no eligible participants; nothing to assign");
        }

        let plan = engine::allocate(&event, &roster, ledger.schedules(), policy, options, rng)?;
        let mut assignments = plan.assignments;
        for slot in assignments.iter_mut().filter(|a| a.is_write()) {
            match self.store.compare_and_set_leader(
                event_id,
                slot.day_number,
                slot.previous,
                slot.leader,
            ) {
                Ok(_) => {
                    debug!(event_id, day = slot.day_number, leader = ?slot.leader, "Leader written");
                }
                Err(StoreError::Conflict { current }) => {
                    warn!(
                        event_id,
                        day = slot.day_number,
                        current = ?current,
                        "Slot changed during allocation, skipping"
                    );
                    slot.leader = current;
                    slot.outcome = SlotOutcome::Conflict;
                }
                Err(e) => return Err(e.into()),
            }
        }

        let result =
            AssignmentResult::from_assignments(policy, assignments, plan.rejected_volunteers);
        info!(
            event_id,
            policy = %policy,
            assigned = result.assigned_count,
            preserved = result.preserved_count,
            unfilled = result.unfilled_count,
            conflicts = result.skipped_conflicts,
            reset = options.reset,
            "Auto-assignment complete"
        );
        Ok(result)
    }

    // ===== Single-slot changes =====

    pub fn claim(
        &self,
        event_id: EventId,
        user_id: UserId,
        day_number: u32,
    ) -> Result<ScheduleView, AssignmentError> {
        let event = self.load_event(event_id)?;
        let roster = self.load_roster(event_id)?;
        let ledger = self.load_ledger(event_id)?;
        let updated = authority::claim(
            &self.store,
            &event,
            &roster,
            &ledger,
            user_id,
            day_number,
            self.now(),
        )?;
        self.view(&updated, &roster)
    }

    pub fn reassign(
        &self,
        event_id: EventId,
        actor: UserId,
        day_number: u32,
        new_leader: UserId,
    ) -> Result<Reassignment, AssignmentError> {
        let event = self.load_event(event_id)?;
        let roster = self.load_roster(event_id)?;
        let ledger = self.load_ledger(event_id)?;
        authority::reassign(&self.store, &event, &roster, &ledger, actor, day_number, new_leader)
    }

    pub fn backup_assign(
        &self,
        event_id: EventId,
        actor: UserId,
        day_number: u32,
        backup_leader: UserId,
    ) -> Result<ScheduleView, AssignmentError> {
        let event = self.load_event(event_id)?;
        let roster = self.load_roster(event_id)?;
        let ledger = self.load_ledger(event_id)?;
        let updated = authority::backup_assign(
            &self.store,
            &event,
            &roster,
            &ledger,
            actor,
            day_number,
            backup_leader,
        )?;
        self.view(&updated, &roster)
    }

    pub fn unassign(
        &self,
        event_id: EventId,
        actor: UserId,
        day_number: u32,
    ) -> Result<Reassignment, AssignmentError> {
        let event = self.load_event(event_id)?;
        let ledger = self.load_ledger(event_id)?;
        let removed = authority::unassign(&self.store, &event, &ledger, actor, day_number)?;
        Ok(Reassignment {
            day_number,
            old_leader: removed,
            new_leader: None,
        })
    }

    // ===== Read views =====

    pub fn statistics(&self, event_id: EventId) -> Result<AssignmentStatistics, AssignmentError> {
        let roster = self.load_roster(event_id)?;
        let ledger = self.load_ledger(event_id)?;
        Ok(stats::compute(&ledger, &roster))
    }

    pub fn backup_needed(&self, event_id: EventId) -> Result<Vec<BackupCandidate>, AssignmentError> {
        let event = self.load_event(event_id)?;
        let ledger = self.load_ledger(event_id)?;
        Ok(backup::detect(&ledger, &event.settings, self.now()))
    }

    pub fn check_permissions(
        &self,
        event_id: EventId,
        actor: UserId,
        day_number: Option<u32>,
    ) -> Result<Capabilities, AssignmentError> {
        let event = self.load_event(event_id)?;
        let roster = self.load_roster(event_id)?;
        let ledger = self.load_ledger(event_id)?;
        if let Some(day) = day_number {
            if ledger.get(day).is_none() {
                return Err(AssignmentError::Precondition(format!(
                    "event {} has no schedule for day {}",
                    event_id, day
                )));
            }
        }
        Ok(permission::check_permissions(
            &event,
            &roster,
            &ledger,
            actor,
            day_number,
            self.now(),
        ))
    }

    /// Day numbers `user_id` currently leads, in order.
    pub fn leader_history(&self, event_id: EventId, user_id: UserId) -> Result<Vec<u32>, AssignmentError> {
        Ok(self.load_ledger(event_id)?.days_led_by(user_id))
    }
}
