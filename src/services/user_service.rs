//! User service

use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::{
    constants::DEFAULT_LEADERBOARD_SIZE,
    db::{ContestRepository, ProblemRepository, UserRepository},
    error::{AppError, AppResult},
    models::{ContestFilter, NewUser, ProblemFilter, ProblemOrder, User, UserUpdate},
    state::AppState,
    utils::validation::{check, validate_username},
};

/// User service for business logic
pub struct UserService;

impl UserService {
    /// Register a new user
    pub async fn register(state: &AppState, input: NewUser) -> AppResult<User> {
        input.validate()?;
        check(validate_username(&input.username))?;

        let now = state.now();
        let user = User::new(input, now);

        let mut uow = state.begin().await?;
        if uow.find_user_by_username(&user.username).await?.is_some() {
            return Err(AppError::Validation("Username already taken".to_string()));
        }
        if uow.find_user_by_email(&user.email).await?.is_some() {
            return Err(AppError::Validation("Email already registered".to_string()));
        }
        uow.insert_user(&user).await?;
        uow.commit().await?;

        info!(user_id = %user.id, username = %user.username, "User registered");
        Ok(user)
    }

    /// Get user by ID
    pub async fn get(state: &AppState, id: Uuid) -> AppResult<User> {
        let mut uow = state.begin().await?;
        uow.find_user(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", id)))
    }

    /// Get user by username
    pub async fn get_by_username(state: &AppState, username: &str) -> AppResult<User> {
        let mut uow = state.begin().await?;
        uow.find_user_by_username(username)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User '{}' not found", username)))
    }

    /// Update profile fields
    pub async fn update_profile(state: &AppState, id: Uuid, update: UserUpdate) -> AppResult<User> {
        update.validate()?;

        let mut uow = state.begin().await?;
        let mut user = uow
            .lock_user(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", id)))?;

        if let Some(email) = update.email.as_deref() {
            let email = email.to_lowercase();
            if email != user.email && uow.find_user_by_email(&email).await?.is_some() {
                return Err(AppError::Validation("Email already registered".to_string()));
            }
        }

        user.apply_update(update);
        user.touch(state.now());
        uow.update_user(&user).await?;
        uow.commit().await?;

        Ok(user)
    }

    /// Add `delta` (possibly negative) to the reputation score
    pub async fn adjust_reputation(state: &AppState, id: Uuid, delta: i32) -> AppResult<User> {
        let mut uow = state.begin().await?;
        let mut user = uow
            .lock_user(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", id)))?;

        user.reputation = user.reputation.saturating_add(delta);
        user.touch(state.now());
        uow.update_user(&user).await?;
        uow.commit().await?;

        info!(user_id = %id, delta, reputation = user.reputation, "Reputation adjusted");
        Ok(user)
    }

    /// Users ordered by reputation
    pub async fn leaderboard(state: &AppState, limit: Option<i64>) -> AppResult<Vec<User>> {
        let mut uow = state.begin().await?;
        uow.top_users_by_reputation(limit.unwrap_or(DEFAULT_LEADERBOARD_SIZE).max(0))
            .await
    }

    /// Delete a user with their submissions, progress and participations.
    ///
    /// Authors of problems or contests cannot be deleted.
    pub async fn delete(state: &AppState, id: Uuid) -> AppResult<()> {
        let mut uow = state.begin().await?;
        if uow.find_user(id).await?.is_none() {
            return Err(AppError::NotFound(format!("User {} not found", id)));
        }

        let authored = ProblemFilter {
            created_by: Some(id),
            limit: Some(1),
            ..Default::default()
        };
        let owns_contests = ContestFilter {
            created_by: Some(id),
            ..Default::default()
        };
        if !uow.list_problems(&authored, ProblemOrder::Newest).await?.is_empty()
            || !uow.list_contests(&owns_contests).await?.is_empty()
        {
            return Err(AppError::Validation(
                "User still owns problems or contests".to_string(),
            ));
        }

        uow.delete_user(id).await?;
        uow.commit().await?;

        info!(user_id = %id, "User deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use crate::test_utils::TestApp;

    #[tokio::test]
    async fn test_register_rejects_duplicates() {
        let app = TestApp::new();
        app.user("alice").await;

        let same_name = NewUser {
            username: "alice".to_string(),
            email: "other@example.com".to_string(),
            first_name: None,
            last_name: None,
            role: None,
        };
        assert!(matches!(
            UserService::register(&app.state, same_name).await,
            Err(AppError::Validation(_))
        ));

        let same_email = NewUser {
            username: "alicia".to_string(),
            email: "ALICE@example.com".to_string(),
            first_name: None,
            last_name: None,
            role: None,
        };
        assert!(matches!(
            UserService::register(&app.state, same_email).await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_register_rejects_bad_username() {
        let app = TestApp::new();
        let input = NewUser {
            username: "9lives".to_string(),
            email: "cat@example.com".to_string(),
            first_name: None,
            last_name: None,
            role: None,
        };
        assert!(matches!(
            UserService::register(&app.state, input).await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_update_profile_touches() {
        let app = TestApp::new();
        let alice = app.user("alice").await;
        app.advance(chrono::Duration::minutes(5));

        let updated = UserService::update_profile(
            &app.state,
            alice.id,
            UserUpdate {
                first_name: Some("Alice".to_string()),
                role: Some(Role::Organizer),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        assert_eq!(updated.first_name.as_deref(), Some("Alice"));
        assert_eq!(updated.role, Role::Organizer);
        assert!(updated.updated_at > alice.updated_at);
        assert_eq!(UserService::get(&app.state, alice.id).await.unwrap(), updated);
    }

    #[tokio::test]
    async fn test_leaderboard_orders_by_reputation() {
        let app = TestApp::new();
        let alice = app.user("alice").await;
        let bob = app.user("bob").await;
        UserService::adjust_reputation(&app.state, bob.id, 50).await.unwrap();
        UserService::adjust_reputation(&app.state, alice.id, 10).await.unwrap();

        let top = UserService::leaderboard(&app.state, Some(1)).await.unwrap();
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].id, bob.id);
    }

    #[tokio::test]
    async fn test_delete_author_is_rejected() {
        let app = TestApp::new();
        let author = app.user("author").await;
        app.problem_by(author.id, "echo", crate::models::Difficulty::Easy)
            .await;

        assert!(matches!(
            UserService::delete(&app.state, author.id).await,
            Err(AppError::Validation(_))
        ));

        let reader = app.user("reader").await;
        UserService::delete(&app.state, reader.id).await.unwrap();
        assert!(matches!(
            UserService::get(&app.state, reader.id).await,
            Err(AppError::NotFound(_))
        ));
    }
}
