//! Category service
//!
//! Membership lives in one relation, so adding or removing a problem from a
//! category is a single row change and both directions agree at all times.

use tracing::{debug, info};
use uuid::Uuid;
use validator::Validate;

use crate::{
    db::{CategoryRepository, ProblemRepository, UnitOfWork},
    error::{AppError, AppResult},
    models::{Category, CategoryUpdate, NewCategory, Problem},
    state::AppState,
    utils::validation::{check, validate_color_code},
};

/// Category service for business logic
pub struct CategoryService;

impl CategoryService {
    /// Create a new active category
    pub async fn create(state: &AppState, input: NewCategory) -> AppResult<Category> {
        input.validate()?;
        if let Some(color) = input.color_code.as_deref() {
            check(validate_color_code(color))?;
        }

        let mut uow = state.begin().await?;
        if uow.find_category_by_name(&input.name).await?.is_some() {
            return Err(AppError::Validation(format!(
                "Category '{}' already exists",
                input.name
            )));
        }

        let category = Category::new(input, state.now());
        uow.insert_category(&category).await?;
        uow.commit().await?;

        info!(category_id = %category.id, name = %category.name, "Category created");
        Ok(category)
    }

    pub async fn get(state: &AppState, id: Uuid) -> AppResult<Category> {
        let mut uow = state.begin().await?;
        uow.find_category(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Category {} not found", id)))
    }

    /// Rename or restyle a category
    pub async fn update(state: &AppState, id: Uuid, update: CategoryUpdate) -> AppResult<Category> {
        update.validate()?;
        if let Some(color) = update.color_code.as_deref() {
            check(validate_color_code(color))?;
        }

        let mut uow = state.begin().await?;
        let mut category = uow
            .find_category(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Category {} not found", id)))?;

        if let Some(name) = update.name.as_deref() {
            if name != category.name && uow.find_category_by_name(name).await?.is_some() {
                return Err(AppError::Validation(format!(
                    "Category '{}' already exists",
                    name
                )));
            }
        }

        category.apply_update(update);
        category.touch(state.now());
        uow.update_category(&category).await?;
        uow.commit().await?;

        Ok(category)
    }

    pub async fn deactivate(state: &AppState, id: Uuid) -> AppResult<Category> {
        Self::update(
            state,
            id,
            CategoryUpdate {
                is_active: Some(false),
                ..Default::default()
            },
        )
        .await
    }

    pub async fn list(state: &AppState, active_only: bool) -> AppResult<Vec<Category>> {
        let mut uow = state.begin().await?;
        uow.list_categories(active_only).await
    }

    /// Delete a category; its problems stay
    pub async fn delete(state: &AppState, id: Uuid) -> AppResult<()> {
        let mut uow = state.begin().await?;
        if !uow.delete_category(id).await? {
            return Err(AppError::NotFound(format!("Category {} not found", id)));
        }
        uow.commit().await?;

        info!(category_id = %id, "Category deleted");
        Ok(())
    }

    /// Put `problem_id` into `category_id`; `false` if it already was
    pub async fn add_category(state: &AppState, problem_id: Uuid, category_id: Uuid) -> AppResult<bool> {
        let mut uow = state.begin().await?;
        let mut problem = Self::load_problem(uow.as_mut(), problem_id).await?;
        if uow.find_category(category_id).await?.is_none() {
            return Err(AppError::NotFound(format!("Category {} not found", category_id)));
        }

        let linked = uow.link_problem_category(problem_id, category_id).await?;
        if linked {
            problem.touch(state.now());
            uow.update_problem(&problem).await?;
        }
        uow.commit().await?;

        debug!(problem_id = %problem_id, category_id = %category_id, linked, "Category added");
        Ok(linked)
    }

    /// Take `problem_id` out of `category_id`; `false` if it was not in it
    pub async fn remove_category(
        state: &AppState,
        problem_id: Uuid,
        category_id: Uuid,
    ) -> AppResult<bool> {
        let mut uow = state.begin().await?;
        let mut problem = Self::load_problem(uow.as_mut(), problem_id).await?;

        let unlinked = uow.unlink_problem_category(problem_id, category_id).await?;
        if unlinked {
            problem.touch(state.now());
            uow.update_problem(&problem).await?;
        }
        uow.commit().await?;

        debug!(problem_id = %problem_id, category_id = %category_id, unlinked, "Category removed");
        Ok(unlinked)
    }

    pub async fn categories_of(state: &AppState, problem_id: Uuid) -> AppResult<Vec<Category>> {
        let mut uow = state.begin().await?;
        uow.categories_for_problem(problem_id).await
    }

    pub async fn problems_in(state: &AppState, category_id: Uuid) -> AppResult<Vec<Problem>> {
        let mut uow = state.begin().await?;
        uow.problems_in_category(category_id).await
    }

    pub async fn problem_count(state: &AppState, category_id: Uuid) -> AppResult<i64> {
        let mut uow = state.begin().await?;
        uow.count_problems_in_category(category_id).await
    }

    async fn load_problem(
        uow: &mut dyn UnitOfWork,
        problem_id: Uuid,
    ) -> AppResult<Problem> {
        uow.lock_problem(problem_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Problem {} not found", problem_id)))
    }
}
