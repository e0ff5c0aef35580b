//! User progress repository

use async_trait::async_trait;
use uuid::Uuid;

use crate::db::postgres::{PgUnitOfWork, expect_one};
use crate::error::AppResult;
use crate::models::{ProgressStatus, UserProgress};

/// Storage operations for per-(user, problem) progress
#[async_trait]
pub trait ProgressRepository: Send {
    async fn find_progress(
        &mut self,
        user_id: Uuid,
        problem_id: Uuid,
    ) -> AppResult<Option<UserProgress>>;

    /// Like `find_progress`, but holds the row until the unit of work ends
    async fn lock_progress(
        &mut self,
        user_id: Uuid,
        problem_id: Uuid,
    ) -> AppResult<Option<UserProgress>>;

    /// Insert unless the pair already has a record; `false` if it did
    async fn insert_progress(&mut self, progress: &UserProgress) -> AppResult<bool>;

    async fn update_progress(&mut self, progress: &UserProgress) -> AppResult<()>;

    /// Most recently updated first
    async fn progress_for_user(
        &mut self,
        user_id: Uuid,
        status: Option<ProgressStatus>,
    ) -> AppResult<Vec<UserProgress>>;

    async fn count_progress(&mut self, user_id: Uuid, status: ProgressStatus) -> AppResult<i64>;
}

#[async_trait]
impl ProgressRepository for PgUnitOfWork {
    async fn find_progress(
        &mut self,
        user_id: Uuid,
        problem_id: Uuid,
    ) -> AppResult<Option<UserProgress>> {
        let progress = sqlx::query_as::<_, UserProgress>(
            r#"SELECT * FROM user_progress WHERE user_id = $1 AND problem_id = $2"#,
        )
        .bind(user_id)
        .bind(problem_id)
        .fetch_optional(self.conn()?)
        .await?;

        Ok(progress)
    }

    async fn lock_progress(
        &mut self,
        user_id: Uuid,
        problem_id: Uuid,
    ) -> AppResult<Option<UserProgress>> {
        let progress = sqlx::query_as::<_, UserProgress>(
            r#"SELECT * FROM user_progress WHERE user_id = $1 AND problem_id = $2 FOR UPDATE"#,
        )
        .bind(user_id)
        .bind(problem_id)
        .fetch_optional(self.conn()?)
        .await?;

        Ok(progress)
    }

    async fn insert_progress(&mut self, progress: &UserProgress) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO user_progress (
                id, user_id, problem_id, status, attempts, best_score,
                last_submitted_at, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (user_id, problem_id) DO NOTHING
            "#,
        )
        .bind(progress.id)
        .bind(progress.user_id)
        .bind(progress.problem_id)
        .bind(progress.status.as_str())
        .bind(progress.attempts)
        .bind(progress.best_score)
        .bind(progress.last_submitted_at)
        .bind(progress.created_at)
        .bind(progress.updated_at)
        .execute(self.conn()?)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn update_progress(&mut self, progress: &UserProgress) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE user_progress
            SET
                status = $2,
                attempts = $3,
                best_score = $4,
                last_submitted_at = $5,
                updated_at = $6
            WHERE id = $1
            "#,
        )
        .bind(progress.id)
        .bind(progress.status.as_str())
        .bind(progress.attempts)
        .bind(progress.best_score)
        .bind(progress.last_submitted_at)
        .bind(progress.updated_at)
        .execute(self.conn()?)
        .await?;

        expect_one(result, "Progress not found")
    }

    async fn progress_for_user(
        &mut self,
        user_id: Uuid,
        status: Option<ProgressStatus>,
    ) -> AppResult<Vec<UserProgress>> {
        let progress = sqlx::query_as::<_, UserProgress>(
            r#"
            SELECT * FROM user_progress
            WHERE user_id = $1 AND ($2::text IS NULL OR status = $2)
            ORDER BY updated_at DESC, id
            "#,
        )
        .bind(user_id)
        .bind(status.map(|s| s.as_str()))
        .fetch_all(self.conn()?)
        .await?;

        Ok(progress)
    }

    async fn count_progress(&mut self, user_id: Uuid, status: ProgressStatus) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"SELECT COUNT(*) FROM user_progress WHERE user_id = $1 AND status = $2"#,
        )
        .bind(user_id)
        .bind(status.as_str())
        .fetch_one(self.conn()?)
        .await?;

        Ok(count)
    }
}
