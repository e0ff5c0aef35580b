//! Per-user, per-problem progress

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::SubmissionStatus;
use crate::error::{AppError, AppResult};

/// Progress of one user on one problem
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct UserProgress {
    pub id: Uuid,
    pub user_id: Uuid,
    pub problem_id: Uuid,
    #[sqlx(try_from = "String")]
    pub status: ProgressStatus,
    pub attempts: i32,
    pub best_score: Option<i32>,
    pub last_submitted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserProgress {
    pub fn new(user_id: Uuid, problem_id: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            problem_id,
            status: ProgressStatus::NotStarted,
            attempts: 0,
            best_score: None,
            last_submitted_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }

    /// Fold one resolved submission into this record.
    ///
    /// Status only moves forward: ACCEPTED completes, any other verdict turns
    /// NOT_STARTED into IN_PROGRESS, and COMPLETED never changes.
    pub fn apply(
        &mut self,
        outcome: SubmissionStatus,
        submitted_at: DateTime<Utc>,
        score: Option<i32>,
        order: ScoreOrder,
    ) -> AppResult<()> {
        if !outcome.is_terminal() {
            return Err(AppError::invalid_transition(self.status, outcome));
        }

        self.attempts += 1;
        self.status = self.status.max(if outcome.is_accepted() {
            ProgressStatus::Completed
        } else {
            ProgressStatus::InProgress
        });
        self.last_submitted_at = Some(match self.last_submitted_at {
            Some(previous) if previous > submitted_at => previous,
            _ => submitted_at,
        });

        if let Some(candidate) = score {
            if self.best_score.is_none_or(|current| order.improves(candidate, current)) {
                self.best_score = Some(candidate);
            }
        }
        Ok(())
    }

    pub fn is_completed(&self) -> bool {
        self.status == ProgressStatus::Completed
    }
}

/// Progress status; the derived order is the only allowed direction of travel
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProgressStatus {
    NotStarted,
    InProgress,
    Completed,
}

impl ProgressStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotStarted => "NOT_STARTED",
            Self::InProgress => "IN_PROGRESS",
            Self::Completed => "COMPLETED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "NOT_STARTED" => Some(Self::NotStarted),
            "IN_PROGRESS" => Some(Self::InProgress),
            "COMPLETED" => Some(Self::Completed),
            _ => None,
        }
    }
}

impl std::fmt::Display for ProgressStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How two caller-supplied scores compare
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreOrder {
    /// Time or memory style scores
    LowerIsBetter,
    /// Point style scores
    #[default]
    HigherIsBetter,
}

impl ScoreOrder {
    /// Whether `candidate` beats `current`
    pub fn improves(&self, candidate: i32, current: i32) -> bool {
        match self {
            Self::LowerIsBetter => candidate < current,
            Self::HigherIsBetter => candidate > current,
        }
    }
}

impl FromStr for ScoreOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "lower" | "lower_is_better" => Ok(Self::LowerIsBetter),
            "higher" | "higher_is_better" => Ok(Self::HigherIsBetter),
            other => Err(format!("unknown score order: {}", other)),
        }
    }
}
