//! User repository

use async_trait::async_trait;
use uuid::Uuid;

use crate::db::postgres::{PgUnitOfWork, expect_one};
use crate::error::AppResult;
use crate::models::User;

/// Storage operations for users
#[async_trait]
pub trait UserRepository: Send {
    async fn insert_user(&mut self, user: &User) -> AppResult<()>;

    async fn find_user(&mut self, id: Uuid) -> AppResult<Option<User>>;

    /// Like `find_user`, but holds the row until the unit of work ends
    async fn lock_user(&mut self, id: Uuid) -> AppResult<Option<User>>;

    async fn find_user_by_username(&mut self, username: &str) -> AppResult<Option<User>>;

    async fn find_user_by_email(&mut self, email: &str) -> AppResult<Option<User>>;

    /// Overwrite every mutable column of an existing user
    async fn update_user(&mut self, user: &User) -> AppResult<()>;

    /// Delete a user with their submissions, progress and participations
    async fn delete_user(&mut self, id: Uuid) -> AppResult<bool>;

    /// Highest reputation first, ties broken by earliest registration
    async fn top_users_by_reputation(&mut self, limit: i64) -> AppResult<Vec<User>>;
}

#[async_trait]
impl UserRepository for PgUnitOfWork {
    async fn insert_user(&mut self, user: &User) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO users (
                id, username, email, first_name, last_name, role, reputation,
                streak_count, last_activity_date, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(user.role.as_str())
        .bind(user.reputation)
        .bind(user.streak_count)
        .bind(user.last_activity_date)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(self.conn()?)
        .await?;

        Ok(())
    }

    async fn find_user(&mut self, id: Uuid) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(r#"SELECT * FROM users WHERE id = $1"#)
            .bind(id)
            .fetch_optional(self.conn()?)
            .await?;

        Ok(user)
    }

    async fn lock_user(&mut self, id: Uuid) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(r#"SELECT * FROM users WHERE id = $1 FOR UPDATE"#)
            .bind(id)
            .fetch_optional(self.conn()?)
            .await?;

        Ok(user)
    }

    async fn find_user_by_username(&mut self, username: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(r#"SELECT * FROM users WHERE username = $1"#)
            .bind(username)
            .fetch_optional(self.conn()?)
            .await?;

        Ok(user)
    }

    async fn find_user_by_email(&mut self, email: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(r#"SELECT * FROM users WHERE email = $1"#)
            .bind(email)
            .fetch_optional(self.conn()?)
            .await?;

        Ok(user)
    }

    async fn update_user(&mut self, user: &User) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET
                email = $2,
                first_name = $3,
                last_name = $4,
                role = $5,
                reputation = $6,
                streak_count = $7,
                last_activity_date = $8,
                updated_at = $9
            WHERE id = $1
            "#,
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(user.role.as_str())
        .bind(user.reputation)
        .bind(user.streak_count)
        .bind(user.last_activity_date)
        .bind(user.updated_at)
        .execute(self.conn()?)
        .await?;

        expect_one(result, "User not found")
    }

    async fn delete_user(&mut self, id: Uuid) -> AppResult<bool> {
        let conn = self.conn()?;

        sqlx::query(
            r#"
            DELETE FROM contest_solves
            WHERE participant_id IN (SELECT id FROM contest_participants WHERE user_id = $1)
            "#,
        )
        .bind(id)
        .execute(&mut *conn)
        .await?;

        for statement in [
            r#"DELETE FROM contest_participants WHERE user_id = $1"#,
            r#"DELETE FROM user_progress WHERE user_id = $1"#,
            r#"DELETE FROM submissions WHERE user_id = $1"#,
        ] {
            sqlx::query(statement).bind(id).execute(&mut *conn).await?;
        }

        let result = sqlx::query(r#"DELETE FROM users WHERE id = $1"#)
            .bind(id)
            .execute(&mut *conn)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn top_users_by_reputation(&mut self, limit: i64) -> AppResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT * FROM users
            ORDER BY reputation DESC, created_at ASC, id ASC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(self.conn()?)
        .await?;

        Ok(users)
    }
}
