use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::models::UserId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnrollmentStatus {
    #[default]
    Active,
    /// Follows along without taking a leader slot.
    Observer,
    Withdrawn,
    Pending,
}

impl std::fmt::Display for EnrollmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EnrollmentStatus::Active => write!(f, "Active"),
            EnrollmentStatus::Observer => write!(f, "Observer"),
            EnrollmentStatus::Withdrawn => write!(f, "Withdrawn"),
            EnrollmentStatus::Pending => write!(f, "Pending"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub user_id: UserId,
    pub nickname: String,
    #[serde(default)]
    pub status: EnrollmentStatus,
}

impl Participant {
    pub fn new(user_id: UserId, nickname: impl Into<String>) -> Self {
        Self {
            user_id,
            nickname: nickname.into(),
            status: EnrollmentStatus::Active,
        }
    }

    pub fn with_status(mut self, status: EnrollmentStatus) -> Self {
        self.status = status;
        self
    }

    /// Only active enrollees are considered for leadership.
    pub fn is_eligible(&self) -> bool {
        self.status == EnrollmentStatus::Active
    }

    /// Enrolled in any capacity that still lets them read along.
    pub fn can_view(&self) -> bool {
        matches!(self.status, EnrollmentStatus::Active | EnrollmentStatus::Observer)
    }

    pub fn display_name(&self) -> String {
        if self.nickname.trim().is_empty() {
            format!("User {}", self.user_id)
        } else {
            self.nickname.clone()
        }
    }
}

/// Everyone enrolled in an event, in the order the enrollment provider
/// returned them. That order is the tie-breaker for balanced allocation.
#[derive(Debug, Clone, Default)]
pub struct Roster {
    participants: Vec<Participant>,
}

impl Roster {
    /// Build a roster, keeping the first entry when a user appears twice.
    pub fn new(participants: Vec<Participant>) -> Self {
        let mut seen = HashSet::new();
        let participants = participants
            .into_iter()
            .filter(|p| seen.insert(p.user_id))
            .collect();
        Self { participants }
    }

    pub fn all(&self) -> &[Participant] {
        &self.participants
    }

    /// Participants eligible for leadership, in roster order.
    pub fn eligible(&self) -> impl Iterator<Item = &Participant> {
        self.participants.iter().filter(|p| p.is_eligible())
    }

    pub fn eligible_count(&self) -> usize {
        self.eligible().count()
    }

    pub fn find(&self, user_id: UserId) -> Option<&Participant> {
        self.participants.iter().find(|p| p.user_id == user_id)
    }

    pub fn is_eligible(&self, user_id: UserId) -> bool {
        self.find(user_id).map(|p| p.is_eligible()).unwrap_or(false)
    }

    pub fn nickname(&self, user_id: UserId) -> Option<String> {
        self.find(user_id).map(|p| p.display_name())
    }

    pub fn is_empty(&self) -> bool {
        self.eligible_count() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roster_excludes_observers_and_withdrawn() {
        let roster = Roster::new(vec![
            Participant::new(1, "Ada"),
            Participant::new(2, "Bo").with_status(EnrollmentStatus::Observer),
            Participant::new(3, "Cy").with_status(EnrollmentStatus::Withdrawn),
            Participant::new(4, "Di"),
        ]);
        let ids: Vec<UserId> = roster.eligible().map(|p| p.user_id).collect();
        assert_eq!(ids, vec![1, 4]);
        assert!(roster.is_eligible(1));
        assert!(!roster.is_eligible(2));
        assert!(!roster.is_eligible(99));
    }

    #[test]
    fn test_roster_dedupes_keeping_first() {
        let roster = Roster::new(vec![
            Participant::new(1, "Ada"),
            Participant::new(1, "Ada again").with_status(EnrollmentStatus::Withdrawn),
        ]);
        assert_eq!(roster.all().len(), 1);
        assert_eq!(roster.nickname(1).as_deref(), Some("Ada"));
    }

    #[test]
    fn test_roster_empty_when_no_active_members() {
        let roster = Roster::new(vec![
            Participant::new(2, "Bo").with_status(EnrollmentStatus::Observer),
        ]);
        assert!(roster.is_empty());
        assert_eq!(roster.all().len(), 1);
    }

    #[test]
    fn test_display_name_fallback() {
        assert_eq!(Participant::new(5, "  ").display_name(), "User 5");
        assert_eq!(Participant::new(5, "Eve").display_name(), "Eve");
    }

    #[test]
    fn test_observer_can_view_but_not_lead() {
        let p = Participant::new(2, "Bo").with_status(EnrollmentStatus::Observer);
        assert!(p.can_view());
        assert!(!p.is_eligible());
    }
}
