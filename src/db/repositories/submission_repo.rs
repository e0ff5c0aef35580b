//! Submission repository

use async_trait::async_trait;
use uuid::Uuid;

use crate::db::postgres::{PgUnitOfWork, expect_one};
use crate::error::AppResult;
use crate::models::{Submission, SubmissionFilter, SubmissionStatus};

/// Storage operations for submissions
#[async_trait]
pub trait SubmissionRepository: Send {
    async fn insert_submission(&mut self, submission: &Submission) -> AppResult<()>;

    async fn find_submission(&mut self, id: Uuid) -> AppResult<Option<Submission>>;

    /// Like `find_submission`, but holds the row until the unit of work ends
    /// so that only one verdict can be applied to it.
    async fn lock_submission(&mut self, id: Uuid) -> AppResult<Option<Submission>>;

    /// Persist status, counts, metrics and judged-at
    async fn update_submission(&mut self, submission: &Submission) -> AppResult<()>;

    /// Newest first
    async fn list_submissions(&mut self, filter: &SubmissionFilter) -> AppResult<Vec<Submission>>;

    /// PENDING submissions, oldest first
    async fn pending_submissions(&mut self, limit: i64) -> AppResult<Vec<Submission>>;

    /// Fastest accepted run, then smallest memory, then earliest
    async fn best_accepted_submission(
        &mut self,
        user_id: Uuid,
        problem_id: Uuid,
    ) -> AppResult<Option<Submission>>;
}

#[async_trait]
impl SubmissionRepository for PgUnitOfWork {
    async fn insert_submission(&mut self, submission: &Submission) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO submissions (
                id, user_id, problem_id, code, language, status, execution_time_ms,
                memory_used_kb, passed_test_cases, total_test_cases, error_message,
                submitted_at, judged_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(submission.id)
        .bind(submission.user_id)
        .bind(submission.problem_id)
        .bind(&submission.code)
        .bind(submission.language.as_str())
        .bind(submission.status.as_str())
        .bind(submission.execution_time_ms)
        .bind(submission.memory_used_kb)
        .bind(submission.passed_test_cases)
        .bind(submission.total_test_cases)
        .bind(&submission.error_message)
        .bind(submission.submitted_at)
        .bind(submission.judged_at)
        .execute(self.conn()?)
        .await?;

        Ok(())
    }

    async fn find_submission(&mut self, id: Uuid) -> AppResult<Option<Submission>> {
        let submission =
            sqlx::query_as::<_, Submission>(r#"SELECT * FROM submissions WHERE id = $1"#)
                .bind(id)
                .fetch_optional(self.conn()?)
                .await?;

        Ok(submission)
    }

    async fn lock_submission(&mut self, id: Uuid) -> AppResult<Option<Submission>> {
        let submission = sqlx::query_as::<_, Submission>(
            r#"SELECT * FROM submissions WHERE id = $1 FOR UPDATE"#,
        )
        .bind(id)
        .fetch_optional(self.conn()?)
        .await?;

        Ok(submission)
    }

    async fn update_submission(&mut self, submission: &Submission) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE submissions
            SET
                status = $2,
                execution_time_ms = $3,
                memory_used_kb = $4,
                passed_test_cases = $5,
                total_test_cases = $6,
                error_message = $7,
                judged_at = $8
            WHERE id = $1
            "#,
        )
        .bind(submission.id)
        .bind(submission.status.as_str())
        .bind(submission.execution_time_ms)
        .bind(submission.memory_used_kb)
        .bind(submission.passed_test_cases)
        .bind(submission.total_test_cases)
        .bind(&submission.error_message)
        .bind(submission.judged_at)
        .execute(self.conn()?)
        .await?;

        expect_one(result, "Submission not found")
    }

    async fn list_submissions(&mut self, filter: &SubmissionFilter) -> AppResult<Vec<Submission>> {
        let submissions = sqlx::query_as::<_, Submission>(
            r#"
            SELECT * FROM submissions
            WHERE
                ($1::uuid IS NULL OR user_id = $1)
                AND ($2::uuid IS NULL OR problem_id = $2)
                AND ($3::text IS NULL OR status = $3)
            ORDER BY submitted_at DESC, id
            LIMIT $4
            "#,
        )
        .bind(filter.user_id)
        .bind(filter.problem_id)
        .bind(filter.status.map(|s| s.as_str()))
        .bind(filter.limit)
        .fetch_all(self.conn()?)
        .await?;

        Ok(submissions)
    }

    async fn pending_submissions(&mut self, limit: i64) -> AppResult<Vec<Submission>> {
        let submissions = sqlx::query_as::<_, Submission>(
            r#"
            SELECT * FROM submissions
            WHERE status = $1
            ORDER BY submitted_at ASC, id
            LIMIT $2
            "#,
        )
        .bind(SubmissionStatus::Pending.as_str())
        .bind(limit)
        .fetch_all(self.conn()?)
        .await?;

        Ok(submissions)
    }

    async fn best_accepted_submission(
        &mut self,
        user_id: Uuid,
        problem_id: Uuid,
    ) -> AppResult<Option<Submission>> {
        let submission = sqlx::query_as::<_, Submission>(
            r#"
            SELECT * FROM submissions
            WHERE user_id = $1 AND problem_id = $2 AND status = $3
            ORDER BY
                execution_time_ms ASC NULLS LAST,
                memory_used_kb ASC NULLS LAST,
                submitted_at ASC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .bind(problem_id)
        .bind(SubmissionStatus::Accepted.as_str())
        .fetch_optional(self.conn()?)
        .await?;

        Ok(submission)
    }
}
