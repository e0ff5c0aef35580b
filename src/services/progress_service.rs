//! Progress service
//!
//! One [`UserProgress`] row per (user, problem) pair, created the first time a
//! submission for the pair resolves. Status only moves forward.

use chrono::{DateTime, Utc};
use tracing::debug;
use uuid::Uuid;

use crate::{
    db::{ProblemRepository, ProgressRepository, UnitOfWork, UserRepository},
    error::{AppError, AppResult},
    models::{ProgressStatus, ScoreOrder, SubmissionStatus, UserProgress},
    state::AppState,
};

/// Progress service for business logic
pub struct ProgressService;

impl ProgressService {
    /// Fold one resolved submission into the pair's record inside `uow`.
    ///
    /// The record is created on first use and locked before it is changed.
    #[allow(clippy::too_many_arguments)]
    pub async fn apply_in(
        uow: &mut dyn UnitOfWork,
        user_id: Uuid,
        problem_id: Uuid,
        outcome: SubmissionStatus,
        submitted_at: DateTime<Utc>,
        score: Option<i32>,
        order: ScoreOrder,
        now: DateTime<Utc>,
    ) -> AppResult<UserProgress> {
        let mut progress = match uow.lock_progress(user_id, problem_id).await? {
            Some(progress) => progress,
            None => {
                let fresh = UserProgress::new(user_id, problem_id, now);
                if uow.insert_progress(&fresh).await? {
                    fresh
                } else {
                    // Another verdict created the record first; wait for its row
                    uow.lock_progress(user_id, problem_id).await?.ok_or_else(|| {
                        AppError::Internal(anyhow::anyhow!("progress row vanished after insert"))
                    })?
                }
            }
        };

        progress.apply(outcome, submitted_at, score, order)?;
        progress.touch(now);
        uow.update_progress(&progress).await?;

        debug!(
            user_id = %user_id,
            problem_id = %problem_id,
            status = %progress.status,
            attempts = progress.attempts,
            "Progress updated"
        );
        Ok(progress)
    }

    /// Apply a resolved outcome in its own unit of work
    pub async fn apply_submission(
        state: &AppState,
        user_id: Uuid,
        problem_id: Uuid,
        outcome: SubmissionStatus,
        submitted_at: DateTime<Utc>,
        score: Option<i32>,
    ) -> AppResult<UserProgress> {
        let mut uow = state.begin().await?;
        if uow.find_user(user_id).await?.is_none() {
            return Err(AppError::NotFound(format!("User {} not found", user_id)));
        }
        if uow.find_problem(problem_id).await?.is_none() {
            return Err(AppError::NotFound(format!("Problem {} not found", problem_id)));
        }

        let progress = Self::apply_in(
            uow.as_mut(),
            user_id,
            problem_id,
            outcome,
            submitted_at,
            score,
            state.config().scoring.score_order,
            state.now(),
        )
        .await?;
        uow.commit().await?;

        Ok(progress)
    }

    pub async fn get(
        state: &AppState,
        user_id: Uuid,
        problem_id: Uuid,
    ) -> AppResult<Option<UserProgress>> {
        let mut uow = state.begin().await?;
        uow.find_progress(user_id, problem_id).await
    }

    pub async fn list_for_user(
        state: &AppState,
        user_id: Uuid,
        status: Option<ProgressStatus>,
    ) -> AppResult<Vec<UserProgress>> {
        let mut uow = state.begin().await?;
        uow.progress_for_user(user_id, status).await
    }

    /// Number of problems the user has completed
    pub async fn solved_count(state: &AppState, user_id: Uuid) -> AppResult<i64> {
        let mut uow = state.begin().await?;
        uow.count_progress(user_id, ProgressStatus::Completed).await
    }

    pub async fn has_solved(state: &AppState, user_id: Uuid, problem_id: Uuid) -> AppResult<bool> {
        Ok(Self::get(state, user_id, problem_id)
            .await?
            .is_some_and(|p| p.is_completed()))
    }
}
