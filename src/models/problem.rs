//! Problem model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::constants::{MAX_PROBLEM_DESCRIPTION_LENGTH, MAX_PROBLEM_TITLE_LENGTH, MAX_SLUG_LENGTH};
use crate::error::{AppError, AppResult};

/// Problem record.
///
/// The acceptance rate is not stored; it is derived from the two counters by
/// [`Problem::acceptance_rate`].
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Problem {
    pub id: Uuid,
    pub slug: String,
    pub title: String,
    pub description: String,
    pub constraints: Option<String>,
    #[sqlx(try_from = "String")]
    pub difficulty: Difficulty,
    #[sqlx(try_from = "String")]
    pub status: ProblemStatus,
    pub created_by: Uuid,
    pub submission_count: i32,
    pub accepted_count: i32,
    pub likes: i32,
    pub dislikes: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Problem {
    /// Build a draft problem from validated input
    pub fn new(input: NewProblem, created_by: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            slug: input.slug,
            title: input.title,
            description: input.description,
            constraints: input.constraints,
            difficulty: input.difficulty,
            status: ProblemStatus::Draft,
            created_by,
            submission_count: 0,
            accepted_count: 0,
            likes: 0,
            dislikes: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }

    /// Percentage of resolved submissions that were accepted
    pub fn acceptance_rate(&self) -> f64 {
        acceptance_rate(self.accepted_count, self.submission_count)
    }

    /// Count one resolved submission
    pub fn record_resolution(&mut self, accepted: bool) {
        self.submission_count += 1;
        if accepted {
            self.accepted_count += 1;
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == ProblemStatus::Active
    }

    /// DRAFT -> ACTIVE
    pub fn publish(&mut self) -> AppResult<()> {
        match self.status {
            ProblemStatus::Draft => {
                self.status = ProblemStatus::Active;
                Ok(())
            }
            ProblemStatus::Active => Ok(()),
            ProblemStatus::Archived => Err(AppError::invalid_transition(
                self.status,
                ProblemStatus::Active,
            )),
        }
    }

    /// Any status -> ARCHIVED
    pub fn archive(&mut self) {
        self.status = ProblemStatus::Archived;
    }

    pub fn apply_update(&mut self, update: ProblemUpdate) {
        if let Some(title) = update.title {
            self.title = title;
        }
        if let Some(description) = update.description {
            self.description = description;
        }
        if let Some(constraints) = update.constraints {
            self.constraints = Some(constraints);
        }
        if let Some(difficulty) = update.difficulty {
            self.difficulty = difficulty;
        }
    }
}

/// `accepted * 100 / submitted`, or 0 when nothing was submitted
pub fn acceptance_rate(accepted: i32, submitted: i32) -> f64 {
    if submitted > 0 {
        accepted as f64 * 100.0 / submitted as f64
    } else {
        0.0
    }
}

/// Problem difficulty levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Easy => "EASY",
            Self::Medium => "MEDIUM",
            Self::Hard => "HARD",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "EASY" => Some(Self::Easy),
            "MEDIUM" => Some(Self::Medium),
            "HARD" => Some(Self::Hard),
            _ => None,
        }
    }
}

impl std::fmt::Display for Difficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Publication status of a problem
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProblemStatus {
    Draft,
    Active,
    Archived,
}

impl ProblemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::Active => "ACTIVE",
            Self::Archived => "ARCHIVED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "DRAFT" => Some(Self::Draft),
            "ACTIVE" => Some(Self::Active),
            "ARCHIVED" => Some(Self::Archived),
            _ => None,
        }
    }
}

impl std::fmt::Display for ProblemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Create problem input
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewProblem {
    #[validate(length(min = 1, max = MAX_PROBLEM_TITLE_LENGTH))]
    pub title: String,

    #[validate(length(min = 1, max = MAX_SLUG_LENGTH))]
    pub slug: String,

    #[validate(length(min = 1, max = MAX_PROBLEM_DESCRIPTION_LENGTH))]
    pub description: String,

    pub constraints: Option<String>,

    pub difficulty: Difficulty,
}

/// Update problem input
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct ProblemUpdate {
    #[validate(length(min = 1, max = MAX_PROBLEM_TITLE_LENGTH))]
    pub title: Option<String>,

    #[validate(length(min = 1, max = MAX_PROBLEM_DESCRIPTION_LENGTH))]
    pub description: Option<String>,

    pub constraints: Option<String>,

    pub difficulty: Option<Difficulty>,
}

/// Listing filter; unset fields do not restrict the result
#[derive(Debug, Clone, Default)]
pub struct ProblemFilter {
    pub difficulty: Option<Difficulty>,
    pub status: Option<ProblemStatus>,
    pub created_by: Option<Uuid>,
    /// Case-insensitive match against title or description
    pub search: Option<String>,
    pub min_acceptance_rate: Option<f64>,
    pub category_id: Option<Uuid>,
    pub limit: Option<i64>,
}

impl ProblemFilter {
    /// Whether `problem` passes every field except `category_id` and `limit`
    pub fn matches(&self, problem: &Problem) -> bool {
        if self.difficulty.is_some_and(|d| d != problem.difficulty) {
            return false;
        }
        if self.status.is_some_and(|s| s != problem.status) {
            return false;
        }
        if self.created_by.is_some_and(|id| id != problem.created_by) {
            return false;
        }
        if let Some(min) = self.min_acceptance_rate {
            if problem.acceptance_rate() < min {
                return false;
            }
        }
        if let Some(search) = &self.search {
            let needle = search.to_lowercase();
            if !problem.title.to_lowercase().contains(&needle)
                && !problem.description.to_lowercase().contains(&needle)
            {
                return false;
            }
        }
        true
    }
}

/// Listing order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProblemOrder {
    /// Most recently created first
    #[default]
    Newest,
    /// Highest acceptance rate first
    AcceptanceRate,
    /// Most submissions first
    SubmissionCount,
    /// Most likes first
    Likes,
    /// EASY, MEDIUM, HARD, then newest
    Difficulty,
}
