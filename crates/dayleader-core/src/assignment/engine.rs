//! Bulk leader allocation.
//!
//! `allocate` is pure: it reads an event, its roster and the current slots
//! and returns a per-slot plan. Writing the plan back goes through
//! `ScheduleStore::compare_and_set_leader` in the service layer, where a
//! slot that changed underneath us is skipped rather than overwritten.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::AssignmentError;
use crate::models::{AssignmentPolicy, Event, Participant, Roster, Schedule, UserId};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AllocationOptions {
    /// Overrides the event's own cap when set.
    #[serde(default)]
    pub max_leadership_count: Option<u32>,
    /// Owner-curated day → volunteer pairs, used by the voluntary policy.
    #[serde(default)]
    pub volunteer_assignments: BTreeMap<u32, UserId>,
    /// Re-decide every slot instead of keeping existing leaders.
    #[serde(default)]
    pub reset: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
#[serde(rename_all = "snake_case")]
pub enum SlotOutcome {
    /// A leader was chosen by this run.
    Assigned,
    /// The slot already had a leader and was left alone.
    Preserved,
    /// Nobody eligible (or, under voluntary, nobody volunteered).
    Unfilled,
    /// The slot changed between planning and writing; left as found.
    Conflict,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct SlotAssignment {
    pub day_number: u32,
    pub date: NaiveDate,
    /// Leader observed when the plan was made.
    pub previous: Option<UserId>,
    pub leader: Option<UserId>,
    pub outcome: SlotOutcome,
}

impl SlotAssignment {
    /// Whether the plan changes what is stored for this slot.
    pub fn is_write(&self) -> bool {
        self.previous != self.leader
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
#[serde(rename_all = "snake_case")]
pub enum VolunteerRejection {
    UnknownDay,
    NotInRoster,
    CapReached,
    SlotTaken,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct RejectedVolunteer {
    pub day_number: u32,
    pub user_id: UserId,
    pub reason: VolunteerRejection,
}

/// Outcome of an `AutoAssign` run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct AssignmentResult {
    pub policy: AssignmentPolicy,
    pub assigned_count: usize,
    pub preserved_count: usize,
    pub unfilled_count: usize,
    pub skipped_conflicts: usize,
    pub rejected_volunteers: Vec<RejectedVolunteer>,
    pub assignments: Vec<SlotAssignment>,
}

impl AssignmentResult {
    pub fn from_assignments(
        policy: AssignmentPolicy,
        assignments: Vec<SlotAssignment>,
        rejected_volunteers: Vec<RejectedVolunteer>,
    ) -> Self {
        let count = |outcome: SlotOutcome| {
            assignments.iter().filter(|a| a.outcome == outcome).count()
        };
        let assigned_count = count(SlotOutcome::Assigned);
        let preserved_count = count(SlotOutcome::Preserved);
        let unfilled_count = count(SlotOutcome::Unfilled);
        let skipped_conflicts = count(SlotOutcome::Conflict);
        Self {
            policy,
            assigned_count,
            preserved_count,
            unfilled_count,
            skipped_conflicts,
            rejected_volunteers,
            assignments,
        }
    }
}

/// Cap-aware per-participant load, seeded from slots the run keeps.
struct Load {
    counts: HashMap<UserId, u32>,
    cap: Option<u32>,
}

impl Load {
    fn new(cap: Option<u32>) -> Self {
        Self {
            counts: HashMap::new(),
            cap,
        }
    }

    fn count(&self, user_id: UserId) -> u32 {
        self.counts.get(&user_id).copied().unwrap_or(0)
    }

    fn under_cap(&self, user_id: UserId) -> bool {
        self.cap.map_or(true, |cap| self.count(user_id) < cap)
    }

    fn add(&mut self, user_id: UserId) {
        *self.counts.entry(user_id).or_insert(0) += 1;
    }
}

/// Plan leaders for every slot of `event`.
///
/// Fails only when the event cannot take assignments (not approved, or no
/// materialized slots). An empty roster is not an error: every open slot
/// comes back `Unfilled`.
pub fn allocate<R: Rng + ?Sized>(
    event: &Event,
    roster: &Roster,
    schedules: &[Schedule],
    policy: AssignmentPolicy,
    options: &AllocationOptions,
    rng: &mut R,
) -> Result<AssignmentResult, AssignmentError> {
    if !event.is_approved() {
        return Err(AssignmentError::Precondition(format!(
            "event {} is {} and cannot take assignments",
            event.id, event.status
        )));
    }
    if schedules.is_empty() {
        return Err(AssignmentError::Precondition(format!(
            "event {} has no materialized schedules",
            event.id
        )));
    }

    let mut ordered: Vec<&Schedule> = schedules.iter().collect();
    ordered.sort_by_key(|s| s.day_number);

    let cap = options
        .max_leadership_count
        .or(event.settings.max_leadership_count);
    let mut load = Load::new(cap);
    if !options.reset {
        for leader in ordered.iter().filter_map(|s| s.leader_id) {
            load.add(leader);
        }
    }

    let eligible: Vec<&Participant> = roster.eligible().collect();
    let mut rejected = Vec::new();
    let mut assignments = Vec::with_capacity(ordered.len());
    let mut previous_leader: Option<UserId> = None;

    let is_kept = |s: &Schedule| !options.reset && s.has_leader();

    for (index, &schedule) in ordered.iter().enumerate() {
        if is_kept(schedule) {
            assignments.push(SlotAssignment {
                day_number: schedule.day_number,
                date: schedule.date,
                previous: schedule.leader_id,
                leader: schedule.leader_id,
                outcome: SlotOutcome::Preserved,
            });
            previous_leader = schedule.leader_id;
            continue;
        }

        let choice = match policy {
            AssignmentPolicy::Random => pick_random(&eligible, &load, rng),
            AssignmentPolicy::Balanced => pick_least_loaded(&eligible, &load),
            AssignmentPolicy::Rotation => {
                // Open slots after this one, up to the next kept slot
                let later = &ordered[index + 1..];
                let run_left = later.iter().take_while(|&&s| !is_kept(s)).count();
                let next_kept = later.get(run_left).and_then(|s| s.leader_id);
                pick_rotation(&eligible, &load, previous_leader, run_left, next_kept)
            }
            AssignmentPolicy::Voluntary => {
                pick_volunteer(schedule, roster, &load, options, &mut rejected)
            }
        };

        if let Some(user_id) = choice {
            load.add(user_id);
        }
        assignments.push(SlotAssignment {
            day_number: schedule.day_number,
            date: schedule.date,
            previous: schedule.leader_id,
            leader: choice,
            outcome: if choice.is_some() {
                SlotOutcome::Assigned
            } else {
                SlotOutcome::Unfilled
            },
        });
        previous_leader = choice;
    }

    // Volunteers for slots that were kept, or for days that don't exist
    if policy == AssignmentPolicy::Voluntary {
        for (&day_number, &user_id) in &options.volunteer_assignments {
            let reason = match assignments.iter().find(|a| a.day_number == day_number) {
                None => VolunteerRejection::UnknownDay,
                Some(a) if a.outcome == SlotOutcome::Preserved => VolunteerRejection::SlotTaken,
                Some(_) => continue,
            };
            rejected.push(RejectedVolunteer {
                day_number,
                user_id,
                reason,
            });
        }
    }
    rejected.sort_by_key(|r| r.day_number);

    debug!(
        event_id = event.id,
        policy = %policy,
        slots = assignments.len(),
        eligible = eligible.len(),
        "Planned allocation"
    );
    Ok(AssignmentResult::from_assignments(policy, assignments, rejected))
}

fn pick_random<R: Rng + ?Sized>(
    eligible: &[&Participant],
    load: &Load,
    rng: &mut R,
) -> Option<UserId> {
    let pool: Vec<UserId> = eligible
        .iter()
        .map(|p| p.user_id)
        .filter(|&id| load.under_cap(id))
        .collect();
    pool.choose(rng).copied()
}

/// Under-cap users, fewest assignments first, ties broken by roster order.
fn ranked_candidates(eligible: &[&Participant], load: &Load) -> Vec<UserId> {
    let mut candidates: Vec<(u32, usize, UserId)> = eligible
        .iter()
        .enumerate()
        .filter(|(_, p)| load.under_cap(p.user_id))
        .map(|(index, p)| (load.count(p.user_id), index, p.user_id))
        .collect();
    candidates.sort_unstable();
    candidates.into_iter().map(|(_, _, id)| id).collect()
}

fn pick_least_loaded(eligible: &[&Participant], load: &Load) -> Option<UserId> {
    ranked_candidates(eligible, load).first().copied()
}

/// Least loaded user other than `previous`, chosen so the `run_left` open
/// slots that follow can still alternate into `next_kept`. Repeats a
/// neighbour only when nobody else is under the cap.
fn pick_rotation(
    eligible: &[&Participant],
    load: &Load,
    previous: Option<UserId>,
    run_left: usize,
    next_kept: Option<UserId>,
) -> Option<UserId> {
    let ranked = ranked_candidates(eligible, load);
    let differs = |id: UserId| Some(id) != previous;

    ranked
        .iter()
        .copied()
        .find(|&id| differs(id) && completes_run(id, &ranked, run_left, next_kept))
        .or_else(|| ranked.iter().copied().find(|&id| differs(id)))
        .or_else(|| ranked.first().copied())
}

/// Whether `remaining` open slots after `pick` can avoid adjacent repeats
/// and still differ from the kept leader `next`.
fn completes_run(pick: UserId, pool: &[UserId], remaining: usize, next: Option<UserId>) -> bool {
    let Some(next) = next else {
        return true;
    };
    if remaining == 0 {
        return pick != next;
    }
    match pool {
        [] | [_] => false,
        // Two users must alternate, so parity decides the last open slot
        [a, b] => {
            let other = if pick == *a { *b } else { *a };
            let last = if remaining % 2 == 1 { other } else { pick };
            last != next
        }
        _ => true,
    }
}

fn pick_volunteer(
    schedule: &Schedule,
    roster: &Roster,
    load: &Load,
    options: &AllocationOptions,
    rejected: &mut Vec<RejectedVolunteer>,
) -> Option<UserId> {
    let user_id = *options.volunteer_assignments.get(&schedule.day_number)?;
    let reason = if !roster.is_eligible(user_id) {
        VolunteerRejection::NotInRoster
    } else if !load.under_cap(user_id) {
        VolunteerRejection::CapReached
    } else {
        return Some(user_id);
    };
    rejected.push(RejectedVolunteer {
        day_number: schedule.day_number,
        user_id,
        reason,
    });
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EventSettings, EventStatus};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn event(policy: AssignmentPolicy) -> Event {
        Event {
            id: 1,
            name: "Reading Circle".to_string(),
            owner_id: 999,
            start_date: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2026, 3, 31).unwrap(),
            status: EventStatus::Approved,
            assignment_policy: policy,
            rest_weekdays: Vec::new(),
            rest_dates: Vec::new(),
            settings: EventSettings::default(),
        }
    }

    fn slots(n: u32) -> Vec<Schedule> {
        let start = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        (1..=n)
            .map(|day| Schedule::new(1, day, start + chrono::Duration::days(day as i64 - 1)))
            .collect()
    }

    fn roster(ids: &[UserId]) -> Roster {
        Roster::new(
            ids.iter()
                .map(|&id| Participant::new(id, format!("member-{}", id)))
                .collect(),
        )
    }

    fn run(
        policy: AssignmentPolicy,
        roster: &Roster,
        schedules: &[Schedule],
        options: &AllocationOptions,
    ) -> AssignmentResult {
        let mut rng = StdRng::seed_from_u64(7);
        allocate(&event(policy), roster, schedules, policy, options, &mut rng).unwrap()
    }

    fn leaders(result: &AssignmentResult) -> Vec<Option<UserId>> {
        result.assignments.iter().map(|a| a.leader).collect()
    }

    fn workload(result: &AssignmentResult) -> HashMap<UserId, u32> {
        let mut counts = HashMap::new();
        for id in result.assignments.iter().filter_map(|a| a.leader) {
            *counts.entry(id).or_insert(0) += 1;
        }
        counts
    }

    // -------------------------------------------------------------------------
    // Preconditions
    // -------------------------------------------------------------------------

    #[test]
    fn test_allocate_requires_approved_event() {
        let mut e = event(AssignmentPolicy::Balanced);
        e.status = EventStatus::Pending;
        let mut rng = StdRng::seed_from_u64(1);
        let err = allocate(
            &e,
            &roster(&[1]),
            &slots(3),
            AssignmentPolicy::Balanced,
            &AllocationOptions::default(),
            &mut rng,
        )
        .unwrap_err();
        assert!(matches!(err, AssignmentError::Precondition(_)));
    }

    #[test]
    fn test_allocate_requires_schedules() {
        let mut rng = StdRng::seed_from_u64(1);
        let err = allocate(
            &event(AssignmentPolicy::Balanced),
            &roster(&[1]),
            &[],
            AssignmentPolicy::Balanced,
            &AllocationOptions::default(),
            &mut rng,
        )
        .unwrap_err();
        assert!(matches!(err, AssignmentError::Precondition(_)));
    }

    #[test]
    fn test_empty_roster_leaves_slots_unfilled() {
        for policy in AssignmentPolicy::ALL {
            let result = run(policy, &roster(&[]), &slots(1), &AllocationOptions::default());
            assert_eq!(result.assigned_count, 0);
            assert_eq!(result.unfilled_count, 1);
        }
    }

    // -------------------------------------------------------------------------
    // Balanced
    // -------------------------------------------------------------------------

    #[test]
    fn test_balanced_round_robin_in_roster_order() {
        let result = run(
            AssignmentPolicy::Balanced,
            &roster(&[1, 2, 3]),
            &slots(5),
            &AllocationOptions::default(),
        );
        assert_eq!(
            leaders(&result),
            vec![Some(1), Some(2), Some(3), Some(1), Some(2)]
        );
    }

    #[test]
    fn test_balanced_fairness_spread_at_most_one() {
        for (n, m) in [(10u32, 3usize), (7, 7), (31, 4), (2, 5)] {
            let ids: Vec<UserId> = (1..=m as i64).collect();
            let result = run(
                AssignmentPolicy::Balanced,
                &roster(&ids),
                &slots(n),
                &AllocationOptions::default(),
            );
            let counts = workload(&result);
            let loads: Vec<u32> = ids.iter().map(|id| counts.get(id).copied().unwrap_or(0)).collect();
            let max = loads.iter().max().unwrap();
            let min = loads.iter().min().unwrap();
            assert!(max - min <= 1, "n={} m={} loads={:?}", n, m, loads);
        }
    }

    #[test]
    fn test_balanced_skips_non_eligible_members() {
        use crate::models::EnrollmentStatus;
        let roster = Roster::new(vec![
            Participant::new(1, "Ada"),
            Participant::new(2, "Bo").with_status(EnrollmentStatus::Observer),
        ]);
        let result = run(AssignmentPolicy::Balanced, &roster, &slots(2), &AllocationOptions::default());
        assert_eq!(leaders(&result), vec![Some(1), Some(1)]);
    }

    // -------------------------------------------------------------------------
    // Caps
    // -------------------------------------------------------------------------

    #[test]
    fn test_cap_respected_by_every_automatic_policy() {
        let options = AllocationOptions {
            max_leadership_count: Some(2),
            ..AllocationOptions::default()
        };
        for policy in [
            AssignmentPolicy::Random,
            AssignmentPolicy::Balanced,
            AssignmentPolicy::Rotation,
        ] {
            let result = run(policy, &roster(&[1, 2]), &slots(6), &options);
            assert!(workload(&result).values().all(|&c| c <= 2), "{:?}", policy);
            assert_eq!(result.assigned_count, 4);
            assert_eq!(result.unfilled_count, 2);
        }
    }

    #[test]
    fn test_event_cap_used_when_option_absent() {
        let mut e = event(AssignmentPolicy::Balanced);
        e.settings.max_leadership_count = Some(1);
        let mut rng = StdRng::seed_from_u64(3);
        let result = allocate(
            &e,
            &roster(&[1, 2]),
            &slots(4),
            AssignmentPolicy::Balanced,
            &AllocationOptions::default(),
            &mut rng,
        )
        .unwrap();
        assert_eq!(result.assigned_count, 2);
        assert_eq!(result.unfilled_count, 2);
    }

    #[test]
    fn test_existing_leaders_count_toward_cap() {
        let mut schedules = slots(3);
        schedules[0].leader_id = Some(1);
        let options = AllocationOptions {
            max_leadership_count: Some(1),
            ..AllocationOptions::default()
        };
        let result = run(AssignmentPolicy::Balanced, &roster(&[1, 2]), &schedules, &options);
        assert_eq!(leaders(&result), vec![Some(1), Some(2), None]);
    }

    // -------------------------------------------------------------------------
    // Random
    // -------------------------------------------------------------------------

    #[test]
    fn test_random_only_draws_from_roster() {
        let result = run(
            AssignmentPolicy::Random,
            &roster(&[4, 5, 6]),
            &slots(20),
            &AllocationOptions::default(),
        );
        assert_eq!(result.assigned_count, 20);
        assert!(result
            .assignments
            .iter()
            .all(|a| matches!(a.leader, Some(4..=6))));
    }

    #[test]
    fn test_random_is_deterministic_for_a_seed() {
        let r = roster(&[1, 2, 3, 4]);
        let a = run(AssignmentPolicy::Random, &r, &slots(10), &AllocationOptions::default());
        let b = run(AssignmentPolicy::Random, &r, &slots(10), &AllocationOptions::default());
        assert_eq!(leaders(&a), leaders(&b));
    }

    // -------------------------------------------------------------------------
    // Rotation
    // -------------------------------------------------------------------------

    #[test]
    fn test_rotation_two_members_three_days_alternates() {
        let result = run(
            AssignmentPolicy::Rotation,
            &roster(&[1, 2]),
            &slots(3),
            &AllocationOptions::default(),
        );
        assert_eq!(leaders(&result), vec![Some(1), Some(2), Some(1)]);
    }

    #[test]
    fn test_rotation_never_repeats_adjacent_days() {
        for m in 2..=5 {
            let ids: Vec<UserId> = (1..=m).collect();
            let result = run(
                AssignmentPolicy::Rotation,
                &roster(&ids),
                &slots(23),
                &AllocationOptions::default(),
            );
            for pair in result.assignments.windows(2) {
                assert_ne!(pair[0].leader, pair[1].leader, "m={}", m);
            }
        }
    }

    #[test]
    fn test_rotation_avoids_preserved_predecessor() {
        let mut schedules = slots(2);
        schedules[0].leader_id = Some(2);
        let result = run(
            AssignmentPolicy::Rotation,
            &roster(&[1, 2]),
            &schedules,
            &AllocationOptions::default(),
        );
        assert_eq!(leaders(&result), vec![Some(2), Some(1)]);
    }

    #[test]
    fn test_rotation_skips_least_loaded_predecessor() {
        // Day 3's leader (2) is the least loaded, but led the day before
        let mut schedules = slots(4);
        schedules[0].leader_id = Some(1);
        schedules[1].leader_id = Some(1);
        schedules[2].leader_id = Some(2);
        let result = run(
            AssignmentPolicy::Rotation,
            &roster(&[1, 2]),
            &schedules,
            &AllocationOptions::default(),
        );
        assert_eq!(result.assignments[3].leader, Some(1));
    }

    #[test]
    fn test_rotation_alternates_into_kept_following_slot() {
        // Day 3 is kept with 1, so days 1 and 2 must be 1, 2
        let mut schedules = slots(3);
        schedules[2].leader_id = Some(1);
        let result = run(
            AssignmentPolicy::Rotation,
            &roster(&[1, 2]),
            &schedules,
            &AllocationOptions::default(),
        );
        assert_eq!(leaders(&result), vec![Some(1), Some(2), Some(1)]);
    }

    #[test]
    fn test_rotation_no_adjacent_repeats_around_kept_slots() {
        for m in 2..=4 {
            let ids: Vec<UserId> = (1..=m).collect();
            let mut schedules = slots(12);
            schedules[3].leader_id = Some(1);
            schedules[6].leader_id = Some(2);
            schedules[7].leader_id = Some(1);
            schedules[11].leader_id = Some(1);
            let result = run(
                AssignmentPolicy::Rotation,
                &roster(&ids),
                &schedules,
                &AllocationOptions::default(),
            );
            for pair in result.assignments.windows(2) {
                assert_ne!(
                    pair[0].leader, pair[1].leader,
                    "m={} day={}", m, pair[1].day_number
                );
            }
        }
    }

    #[test]
    fn test_rotation_single_member_repeats() {
        let result = run(
            AssignmentPolicy::Rotation,
            &roster(&[1]),
            &slots(3),
            &AllocationOptions::default(),
        );
        assert_eq!(leaders(&result), vec![Some(1), Some(1), Some(1)]);
    }

    #[test]
    fn test_rotation_repeats_when_only_predecessor_under_cap() {
        // 2 already holds both allowed slots, so only 1 remains eligible
        let mut schedules = slots(4);
        schedules[0].leader_id = Some(2);
        schedules[1].leader_id = Some(2);
        let options = AllocationOptions {
            max_leadership_count: Some(2),
            ..AllocationOptions::default()
        };
        let result = run(AssignmentPolicy::Rotation, &roster(&[1, 2]), &schedules, &options);
        assert_eq!(
            leaders(&result),
            vec![Some(2), Some(2), Some(1), Some(1)]
        );
    }

    #[test]
    fn test_rotation_stops_when_everyone_capped() {
        let options = AllocationOptions {
            max_leadership_count: Some(2),
            ..AllocationOptions::default()
        };
        let result = run(AssignmentPolicy::Rotation, &roster(&[1, 2]), &slots(5), &options);
        assert_eq!(
            leaders(&result),
            vec![Some(1), Some(2), Some(1), Some(2), None]
        );
    }

    // -------------------------------------------------------------------------
    // Voluntary
    // -------------------------------------------------------------------------

    #[test]
    fn test_voluntary_writes_only_explicit_pairs() {
        let options = AllocationOptions {
            volunteer_assignments: BTreeMap::from([(1, 2), (3, 1)]),
            ..AllocationOptions::default()
        };
        let result = run(AssignmentPolicy::Voluntary, &roster(&[1, 2]), &slots(4), &options);
        assert_eq!(leaders(&result), vec![Some(2), None, Some(1), None]);
        assert_eq!(result.assigned_count, 2);
        assert_eq!(result.unfilled_count, 2);
        assert!(result.rejected_volunteers.is_empty());
    }

    #[test]
    fn test_voluntary_rejections() {
        let mut schedules = slots(4);
        schedules[3].leader_id = Some(1);
        let options = AllocationOptions {
            max_leadership_count: Some(1),
            volunteer_assignments: BTreeMap::from([(1, 77), (2, 1), (4, 2), (9, 2)]),
            ..AllocationOptions::default()
        };
        let result = run(AssignmentPolicy::Voluntary, &roster(&[1, 2]), &schedules, &options);

        let reasons: Vec<(u32, VolunteerRejection)> = result
            .rejected_volunteers
            .iter()
            .map(|r| (r.day_number, r.reason))
            .collect();
        assert_eq!(
            reasons,
            vec![
                (1, VolunteerRejection::NotInRoster),
                (2, VolunteerRejection::CapReached),
                (4, VolunteerRejection::SlotTaken),
                (9, VolunteerRejection::UnknownDay),
            ]
        );
        assert_eq!(result.assigned_count, 0);
        assert_eq!(result.preserved_count, 1);
    }

    // -------------------------------------------------------------------------
    // Re-runs
    // -------------------------------------------------------------------------

    #[test]
    fn test_rerun_preserves_existing_leaders() {
        let mut schedules = slots(4);
        schedules[1].leader_id = Some(3);
        let result = run(
            AssignmentPolicy::Balanced,
            &roster(&[1, 2]),
            &schedules,
            &AllocationOptions::default(),
        );
        assert_eq!(result.assignments[1].leader, Some(3));
        assert_eq!(result.assignments[1].outcome, SlotOutcome::Preserved);
        assert!(!result.assignments[1].is_write());
        assert_eq!(result.preserved_count, 1);
        assert_eq!(result.assigned_count, 3);
    }

    #[test]
    fn test_reset_redecides_every_slot() {
        let mut schedules = slots(2);
        schedules[0].leader_id = Some(3);
        schedules[1].leader_id = Some(3);
        let options = AllocationOptions {
            reset: true,
            ..AllocationOptions::default()
        };
        let result = run(AssignmentPolicy::Balanced, &roster(&[1, 2]), &schedules, &options);
        assert_eq!(leaders(&result), vec![Some(1), Some(2)]);
        assert_eq!(result.assignments[0].previous, Some(3));
        assert!(result.assignments.iter().all(|a| a.is_write()));
    }

    #[test]
    fn test_unsorted_input_is_planned_in_day_order() {
        let mut schedules = slots(3);
        schedules.reverse();
        let result = run(
            AssignmentPolicy::Balanced,
            &roster(&[1, 2, 3]),
            &schedules,
            &AllocationOptions::default(),
        );
        let days: Vec<u32> = result.assignments.iter().map(|a| a.day_number).collect();
        assert_eq!(days, vec![1, 2, 3]);
        assert_eq!(leaders(&result), vec![Some(1), Some(2), Some(3)]);
    }
}
