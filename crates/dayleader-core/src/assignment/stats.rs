use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::models::{Ledger, Roster, UserId};
use crate::utils::percentage;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct LeaderWorkload {
    pub user_id: UserId,
    /// `None` when the leader has since left the roster.
    pub nickname: Option<String>,
    pub assigned_count: usize,
    pub content_completed: usize,
    pub day_numbers: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct AssignmentStatistics {
    pub total_schedules: usize,
    pub assigned_schedules: usize,
    pub unassigned_schedules: usize,
    pub unique_leader_count: usize,
    /// Percent of slots with a leader, 2 decimals.
    pub assignment_rate: f64,
    /// Assigned slots whose leader has published material.
    pub schedules_with_content: usize,
    /// Percent of assigned slots with content, 2 decimals.
    pub content_completion_rate: f64,
    /// Heaviest load first, then by user id.
    pub workloads: Vec<LeaderWorkload>,
}

impl AssignmentStatistics {
    /// Difference between the busiest and least busy leader.
    pub fn workload_spread(&self) -> usize {
        let max = self.workloads.iter().map(|w| w.assigned_count).max();
        let min = self.workloads.iter().map(|w| w.assigned_count).min();
        match (max, min) {
            (Some(max), Some(min)) => max - min,
            _ => 0,
        }
    }
}

pub fn compute(ledger: &Ledger, roster: &Roster) -> AssignmentStatistics {
    let total_schedules = ledger.len();
    let mut assigned_schedules = 0;
    let mut schedules_with_content = 0;
    let mut workloads: HashMap<UserId, LeaderWorkload> = HashMap::new();

    for schedule in ledger.schedules() {
        let Some(leader) = schedule.leader_id else {
            continue;
        };
        assigned_schedules += 1;
        let has_content = ledger.signals(schedule.day_number).content;
        if has_content {
            schedules_with_content += 1;
        }

        let workload = workloads.entry(leader).or_insert_with(|| LeaderWorkload {
            user_id: leader,
            nickname: roster.nickname(leader),
            assigned_count: 0,
            content_completed: 0,
            day_numbers: Vec::new(),
        });
        workload.assigned_count += 1;
        workload.day_numbers.push(schedule.day_number);
        if has_content {
            workload.content_completed += 1;
        }
    }

    let mut workloads: Vec<LeaderWorkload> = workloads.into_values().collect();
    workloads.sort_by(|a, b| {
        b.assigned_count
            .cmp(&a.assigned_count)
            .then_with(|| a.user_id.cmp(&b.user_id))
    });

    AssignmentStatistics {
        total_schedules,
        assigned_schedules,
        unassigned_schedules: total_schedules - assigned_schedules,
        unique_leader_count: workloads.len(),
        assignment_rate: percentage(assigned_schedules, total_schedules),
        schedules_with_content,
        content_completion_rate: percentage(schedules_with_content, assigned_schedules),
        workloads,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Participant, Schedule, SlotSignals};
    use chrono::NaiveDate;

    fn ledger(leaders: &[Option<UserId>], content_days: &[u32]) -> Ledger {
        let start = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let schedules = leaders
            .iter()
            .enumerate()
            .map(|(i, leader)| {
                let mut s = Schedule::new(1, i as u32 + 1, start + chrono::Duration::days(i as i64));
                s.leader_id = *leader;
                s
            })
            .collect();
        let signals = content_days
            .iter()
            .map(|&d| (d, SlotSignals { content: true, engagement: false }))
            .collect();
        Ledger::new(schedules, signals)
    }

    #[test]
    fn test_empty_ledger_is_zero_safe() {
        let stats = compute(&Ledger::default(), &Roster::default());
        assert_eq!(stats.total_schedules, 0);
        assert_eq!(stats.assignment_rate, 0.0);
        assert_eq!(stats.content_completion_rate, 0.0);
        assert_eq!(stats.workload_spread(), 0);
    }

    #[test]
    fn test_no_assignments_is_zero_safe() {
        let stats = compute(&ledger(&[None, None], &[]), &Roster::default());
        assert_eq!(stats.unassigned_schedules, 2);
        assert_eq!(stats.assignment_rate, 0.0);
        assert_eq!(stats.content_completion_rate, 0.0);
        assert!(!stats.content_completion_rate.is_nan());
    }

    #[test]
    fn test_rates_and_workloads() {
        let roster = Roster::new(vec![Participant::new(1, "Ada"), Participant::new(2, "Bo")]);
        let stats = compute(
            &ledger(&[Some(1), Some(2), Some(1), None], &[1, 3]),
            &roster,
        );
        assert_eq!(stats.total_schedules, 4);
        assert_eq!(stats.assigned_schedules, 3);
        assert_eq!(stats.unassigned_schedules, 1);
        assert_eq!(stats.unique_leader_count, 2);
        assert_eq!(stats.assignment_rate, 75.0);
        assert_eq!(stats.schedules_with_content, 2);
        assert_eq!(stats.content_completion_rate, 66.67);

        assert_eq!(stats.workloads[0].user_id, 1);
        assert_eq!(stats.workloads[0].nickname.as_deref(), Some("Ada"));
        assert_eq!(stats.workloads[0].assigned_count, 2);
        assert_eq!(stats.workloads[0].content_completed, 2);
        assert_eq!(stats.workloads[0].day_numbers, vec![1, 3]);
        assert_eq!(stats.workloads[1].content_completed, 0);
        assert_eq!(stats.workload_spread(), 1);
    }

    #[test]
    fn test_content_on_unassigned_slot_not_counted() {
        let stats = compute(&ledger(&[None, Some(1)], &[1]), &Roster::default());
        assert_eq!(stats.schedules_with_content, 0);
        assert_eq!(stats.content_completion_rate, 0.0);
        assert_eq!(stats.workloads[0].nickname, None);
    }
}
