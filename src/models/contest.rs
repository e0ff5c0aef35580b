//! Contest model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::constants::MAX_CONTEST_TITLE_LENGTH;
use crate::error::{AppError, AppResult};

/// Contest database model
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Contest {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// Duration in minutes
    pub duration_minutes: i32,
    pub is_public: bool,
    pub created_by: Uuid,
    pub max_participants: Option<i32>,
    #[sqlx(try_from = "String")]
    pub status: ContestStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Contest {
    pub fn new(input: NewContest, created_by: Uuid, now: DateTime<Utc>) -> Self {
        let mut contest = Self {
            id: Uuid::new_v4(),
            title: input.title,
            description: input.description,
            start_time: input.start_time,
            end_time: input.end_time,
            duration_minutes: input.duration_minutes,
            is_public: input.is_public.unwrap_or(true),
            created_by,
            max_participants: input.max_participants,
            status: ContestStatus::Upcoming,
            created_at: now,
            updated_at: now,
        };
        contest.status = contest.status_at(now);
        contest
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }

    /// Status implied by the clock. Cancellation is sticky.
    pub fn status_at(&self, now: DateTime<Utc>) -> ContestStatus {
        if self.status == ContestStatus::Cancelled {
            ContestStatus::Cancelled
        } else if now < self.start_time {
            ContestStatus::Upcoming
        } else if now <= self.end_time {
            ContestStatus::Running
        } else {
            ContestStatus::Completed
        }
    }

    /// Align the stored status with the clock; returns whether it changed
    pub fn sync_status(&mut self, now: DateTime<Utc>) -> bool {
        let status = self.status_at(now);
        if status == self.status {
            return false;
        }
        self.status = status;
        true
    }

    pub fn is_running_at(&self, now: DateTime<Utc>) -> bool {
        self.status_at(now) == ContestStatus::Running
    }

    /// Users may join while the contest is upcoming or running
    pub fn accepts_participants_at(&self, now: DateTime<Utc>) -> bool {
        matches!(
            self.status_at(now),
            ContestStatus::Upcoming | ContestStatus::Running
        )
    }

    /// Whether one more participant fits under the cap
    pub fn has_room_for(&self, current_participants: i64) -> bool {
        self.max_participants
            .is_none_or(|cap| current_participants < i64::from(cap))
    }

    pub fn cancel(&mut self, now: DateTime<Utc>) -> AppResult<()> {
        match self.status_at(now) {
            ContestStatus::Completed => Err(AppError::invalid_transition(
                ContestStatus::Completed,
                ContestStatus::Cancelled,
            )),
            _ => {
                self.status = ContestStatus::Cancelled;
                Ok(())
            }
        }
    }
}

/// Contest status enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContestStatus {
    Upcoming,
    Running,
    Completed,
    Cancelled,
}

impl ContestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Upcoming => "UPCOMING",
            Self::Running => "RUNNING",
            Self::Completed => "COMPLETED",
            Self::Cancelled => "CANCELLED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "UPCOMING" => Some(Self::Upcoming),
            "RUNNING" => Some(Self::Running),
            "COMPLETED" => Some(Self::Completed),
            "CANCELLED" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

impl std::fmt::Display for ContestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Create contest input
#[derive(Debug, Clone, Deserialize, Validate)]
#[validate(schema(function = "validate_contest_window"))]
pub struct NewContest {
    #[validate(length(min = 1, max = MAX_CONTEST_TITLE_LENGTH))]
    pub title: String,

    pub description: Option<String>,

    pub start_time: DateTime<Utc>,

    pub end_time: DateTime<Utc>,

    #[validate(range(min = 1))]
    pub duration_minutes: i32,

    pub is_public: Option<bool>,

    #[validate(range(min = 1))]
    pub max_participants: Option<i32>,
}

fn validate_contest_window(input: &NewContest) -> Result<(), ValidationError> {
    if input.end_time <= input.start_time {
        return Err(ValidationError::new("end_time_before_start_time")
            .with_message("Contest must end after it starts".into()));
    }
    Ok(())
}

/// Listing filter; unset fields do not restrict the result
#[derive(Debug, Clone, Default)]
pub struct ContestFilter {
    pub status: Option<ContestStatus>,
    pub public_only: bool,
    pub created_by: Option<Uuid>,
}

impl ContestFilter {
    pub fn matches(&self, contest: &Contest) -> bool {
        self.status.is_none_or(|s| s == contest.status)
            && (!self.public_only || contest.is_public)
            && self.created_by.is_none_or(|id| id == contest.created_by)
    }
}

/// Contest problem association
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct ContestProblem {
    pub id: Uuid,
    pub contest_id: Uuid,
    pub problem_id: Uuid,
    pub points: i32,
}

impl ContestProblem {
    pub fn new(contest_id: Uuid, problem_id: Uuid, points: i32) -> Self {
        Self {
            id: Uuid::new_v4(),
            contest_id,
            problem_id,
            points,
        }
    }
}

/// Contest participant model
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct ContestParticipant {
    pub id: Uuid,
    pub contest_id: Uuid,
    pub user_id: Uuid,
    pub joined_at: DateTime<Utc>,
    pub score: i32,
    pub rank: Option<i32>,
}

impl ContestParticipant {
    pub fn new(contest_id: Uuid, user_id: Uuid, joined_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            contest_id,
            user_id,
            joined_at,
            score: 0,
            rank: None,
        }
    }
}

/// First acceptance of a contest problem by a participant
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct ContestSolve {
    pub id: Uuid,
    pub participant_id: Uuid,
    pub contest_problem_id: Uuid,
    pub points_awarded: i32,
    pub solved_at: DateTime<Utc>,
}

impl ContestSolve {
    pub fn new(
        participant_id: Uuid,
        contest_problem_id: Uuid,
        points_awarded: i32,
        solved_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            participant_id,
            contest_problem_id,
            points_awarded,
            solved_at,
        }
    }
}

/// Sort by score descending, then earliest join, then id, and number from 1.
///
/// Returns copies of the participants whose rank changed.
pub fn assign_ranks(participants: &mut [ContestParticipant]) -> Vec<ContestParticipant> {
    participants.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then(a.joined_at.cmp(&b.joined_at))
            .then(a.id.cmp(&b.id))
    });

    let mut changed = Vec::new();
    for (position, participant) in participants.iter_mut().enumerate() {
        let rank = position as i32 + 1;
        if participant.rank != Some(rank) {
            participant.rank = Some(rank);
            changed.push(participant.clone());
        }
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn contest(now: DateTime<Utc>) -> Contest {
        Contest::new(
            NewContest {
                title: "Weekly 1".to_string(),
                description: None,
                start_time: now + Duration::hours(1),
                end_time: now + Duration::hours(3),
                duration_minutes: 120,
                is_public: None,
                max_participants: Some(2),
            },
            Uuid::new_v4(),
            now,
        )
    }

    #[test]
    fn test_status_follows_clock() {
        let now = Utc::now();
        let mut c = contest(now);
        assert_eq!(c.status, ContestStatus::Upcoming);

        assert!(c.sync_status(now + Duration::hours(1)));
        assert_eq!(c.status, ContestStatus::Running);
        assert!(c.is_running_at(now + Duration::hours(3)));

        assert!(c.sync_status(now + Duration::hours(4)));
        assert_eq!(c.status, ContestStatus::Completed);
        assert!(!c.sync_status(now + Duration::hours(5)));
        assert!(!c.accepts_participants_at(now + Duration::hours(5)));
    }

    #[test]
    fn test_cancel_is_sticky() {
        let now = Utc::now();
        let mut c = contest(now);
        c.cancel(now).unwrap();
        assert_eq!(c.status_at(now + Duration::hours(2)), ContestStatus::Cancelled);
        assert!(!c.sync_status(now + Duration::hours(2)));

        let mut finished = contest(now);
        let later = now + Duration::days(1);
        assert!(matches!(
            finished.cancel(later),
            Err(AppError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_window_validation() {
        let now = Utc::now();
        let input = NewContest {
            title: "Backwards".to_string(),
            description: None,
            start_time: now,
            end_time: now - Duration::minutes(1),
            duration_minutes: 10,
            is_public: None,
            max_participants: None,
        };
        assert!(input.validate().is_err());
    }

    #[test]
    fn test_capacity() {
        let c = contest(Utc::now());
        assert!(c.has_room_for(1));
        assert!(!c.has_room_for(2));
    }

    #[test]
    fn test_assign_ranks_breaks_ties_by_join_time() {
        let t1 = Utc::now();
        let t2 = t1 + Duration::seconds(10);
        let contest_id = Uuid::new_v4();

        let mut late = ContestParticipant::new(contest_id, Uuid::new_v4(), t2);
        late.score = 100;
        let mut early = ContestParticipant::new(contest_id, Uuid::new_v4(), t1);
        early.score = 100;
        let mut low = ContestParticipant::new(contest_id, Uuid::new_v4(), t1);
        low.score = 20;

        let mut all = vec![low, late, early];
        let changed = assign_ranks(&mut all).len();
        assert_eq!(changed, 3);

        assert_eq!(all[0].joined_at, t1);
        assert_eq!(all[0].rank, Some(1));
        assert_eq!(all[1].joined_at, t2);
        assert_eq!(all[1].rank, Some(2));
        assert_eq!(all[2].score, 20);
        assert_eq!(all[2].rank, Some(3));

        // Ranking again is stable
        assert!(assign_ranks(&mut all).is_empty());
    }
}
