//! Problem service

use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::{
    db::{ProblemRepository, UserRepository},
    error::{AppError, AppResult},
    models::{NewProblem, Problem, ProblemFilter, ProblemOrder, ProblemUpdate},
    state::AppState,
    utils::validation::{check, require_non_blank, validate_slug},
};

/// Problem service for business logic
pub struct ProblemService;

impl ProblemService {
    /// Create a new DRAFT problem
    pub async fn create(state: &AppState, author_id: Uuid, input: NewProblem) -> AppResult<Problem> {
        input.validate()?;
        check(validate_slug(&input.slug))?;
        require_non_blank("title", &input.title)?;
        require_non_blank("description", &input.description)?;

        let mut uow = state.begin().await?;
        if uow.find_user(author_id).await?.is_none() {
            return Err(AppError::NotFound(format!("User {} not found", author_id)));
        }
        if uow.find_problem_by_slug(&input.slug).await?.is_some() {
            return Err(AppError::Validation(format!(
                "Slug '{}' is already in use",
                input.slug
            )));
        }

        let problem = Problem::new(input, author_id, state.now());
        uow.insert_problem(&problem).await?;
        uow.commit().await?;

        info!(problem_id = %problem.id, slug = %problem.slug, "Problem created");
        Ok(problem)
    }

    /// Get problem by ID
    pub async fn get(state: &AppState, id: Uuid) -> AppResult<Problem> {
        let mut uow = state.begin().await?;
        uow.find_problem(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Problem {} not found", id)))
    }

    /// Get problem by slug
    pub async fn get_by_slug(state: &AppState, slug: &str) -> AppResult<Problem> {
        let mut uow = state.begin().await?;
        uow.find_problem_by_slug(slug)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Problem '{}' not found", slug)))
    }

    /// Update problem text and difficulty
    pub async fn update(state: &AppState, id: Uuid, update: ProblemUpdate) -> AppResult<Problem> {
        update.validate()?;
        if let Some(title) = update.title.as_deref() {
            require_non_blank("title", title)?;
        }
        if let Some(description) = update.description.as_deref() {
            require_non_blank("description", description)?;
        }

        Self::modify(state, id, |problem| {
            problem.apply_update(update);
            Ok(())
        })
        .await
    }

    /// DRAFT -> ACTIVE
    pub async fn publish(state: &AppState, id: Uuid) -> AppResult<Problem> {
        let problem = Self::modify(state, id, Problem::publish).await?;
        info!(problem_id = %id, "Problem published");
        Ok(problem)
    }

    pub async fn archive(state: &AppState, id: Uuid) -> AppResult<Problem> {
        let problem = Self::modify(state, id, |problem| {
            problem.archive();
            Ok(())
        })
        .await?;
        info!(problem_id = %id, "Problem archived");
        Ok(problem)
    }

    pub async fn like(state: &AppState, id: Uuid) -> AppResult<Problem> {
        Self::react(state, id, 1, 0).await
    }

    pub async fn dislike(state: &AppState, id: Uuid) -> AppResult<Problem> {
        Self::react(state, id, 0, 1).await
    }

    /// List problems matching `filter`
    pub async fn list(
        state: &AppState,
        filter: &ProblemFilter,
        order: ProblemOrder,
    ) -> AppResult<Vec<Problem>> {
        let mut uow = state.begin().await?;
        uow.list_problems(filter, order).await
    }

    /// Delete a problem and everything attached to it
    pub async fn delete(state: &AppState, id: Uuid) -> AppResult<()> {
        let mut uow = state.begin().await?;
        if !uow.delete_problem(id).await? {
            return Err(AppError::NotFound(format!("Problem {} not found", id)));
        }
        uow.commit().await?;

        info!(problem_id = %id, "Problem deleted");
        Ok(())
    }

    async fn react(state: &AppState, id: Uuid, likes: i32, dislikes: i32) -> AppResult<Problem> {
        let mut uow = state.begin().await?;
        let problem = uow
            .add_problem_reactions(id, likes, dislikes, state.now())
            .await?;
        uow.commit().await?;

        Ok(problem)
    }

    /// Lock, change, touch and store one problem in a single unit of work
    async fn modify<F>(state: &AppState, id: Uuid, change: F) -> AppResult<Problem>
    where
        F: FnOnce(&mut Problem) -> AppResult<()>,
    {
        let mut uow = state.begin().await?;
        let mut problem = uow
            .lock_problem(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Problem {} not found", id)))?;

        change(&mut problem)?;
        problem.touch(state.now());
        uow.update_problem(&problem).await?;
        uow.commit().await?;

        Ok(problem)
    }
}
