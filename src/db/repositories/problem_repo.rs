//! Problem repository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::db::postgres::{PgUnitOfWork, expect_one};
use crate::error::{AppError, AppResult};
use crate::models::{Problem, ProblemFilter, ProblemOrder};

/// Storage operations for problems
#[async_trait]
pub trait ProblemRepository: Send {
    async fn insert_problem(&mut self, problem: &Problem) -> AppResult<()>;

    async fn find_problem(&mut self, id: Uuid) -> AppResult<Option<Problem>>;

    async fn find_problem_by_slug(&mut self, slug: &str) -> AppResult<Option<Problem>>;

    /// Like `find_problem`, but holds the row until the unit of work ends
    async fn lock_problem(&mut self, id: Uuid) -> AppResult<Option<Problem>>;

    /// Overwrite text, difficulty, status and `updated_at`.
    ///
    /// Counters and reactions are never written from a copy; they only move
    /// through the increment methods below.
    async fn update_problem(&mut self, problem: &Problem) -> AppResult<()>;

    /// Count one resolved submission in place and return the updated row
    async fn record_problem_resolution(
        &mut self,
        id: Uuid,
        accepted: bool,
        at: DateTime<Utc>,
    ) -> AppResult<Problem>;

    /// Add to the like and dislike counters in place
    async fn add_problem_reactions(
        &mut self,
        id: Uuid,
        likes: i32,
        dislikes: i32,
        at: DateTime<Utc>,
    ) -> AppResult<Problem>;

    /// Delete a problem and everything that belongs to it
    async fn delete_problem(&mut self, id: Uuid) -> AppResult<bool>;

    async fn list_problems(
        &mut self,
        filter: &ProblemFilter,
        order: ProblemOrder,
    ) -> AppResult<Vec<Problem>>;
}

fn order_clause(order: ProblemOrder) -> &'static str {
    match order {
        ProblemOrder::Newest => "p.created_at DESC, p.id",
        ProblemOrder::AcceptanceRate => {
            "CASE WHEN p.submission_count > 0 \
             THEN p.accepted_count * 100.0 / p.submission_count ELSE 0 END DESC, \
             p.created_at DESC, p.id"
        }
        ProblemOrder::SubmissionCount => "p.submission_count DESC, p.created_at DESC, p.id",
        ProblemOrder::Likes => "p.likes DESC, p.created_at DESC, p.id",
        ProblemOrder::Difficulty => {
            "CASE p.difficulty WHEN 'EASY' THEN 0 WHEN 'MEDIUM' THEN 1 ELSE 2 END, \
             p.created_at DESC, p.id"
        }
    }
}

#[async_trait]
impl ProblemRepository for PgUnitOfWork {
    async fn insert_problem(&mut self, problem: &Problem) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO problems (
                id, slug, title, description, constraints, difficulty, status,
                created_by, submission_count, accepted_count, likes, dislikes,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(problem.id)
        .bind(&problem.slug)
        .bind(&problem.title)
        .bind(&problem.description)
        .bind(&problem.constraints)
        .bind(problem.difficulty.as_str())
        .bind(problem.status.as_str())
        .bind(problem.created_by)
        .bind(problem.submission_count)
        .bind(problem.accepted_count)
        .bind(problem.likes)
        .bind(problem.dislikes)
        .bind(problem.created_at)
        .bind(problem.updated_at)
        .execute(self.conn()?)
        .await?;

        Ok(())
    }

    async fn find_problem(&mut self, id: Uuid) -> AppResult<Option<Problem>> {
        let problem = sqlx::query_as::<_, Problem>(r#"SELECT * FROM problems WHERE id = $1"#)
            .bind(id)
            .fetch_optional(self.conn()?)
            .await?;

        Ok(problem)
    }

    async fn find_problem_by_slug(&mut self, slug: &str) -> AppResult<Option<Problem>> {
        let problem = sqlx::query_as::<_, Problem>(r#"SELECT * FROM problems WHERE slug = $1"#)
            .bind(slug)
            .fetch_optional(self.conn()?)
            .await?;

        Ok(problem)
    }

    async fn lock_problem(&mut self, id: Uuid) -> AppResult<Option<Problem>> {
        let problem =
            sqlx::query_as::<_, Problem>(r#"SELECT * FROM problems WHERE id = $1 FOR UPDATE"#)
                .bind(id)
                .fetch_optional(self.conn()?)
                .await?;

        Ok(problem)
    }

    async fn update_problem(&mut self, problem: &Problem) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE problems
            SET
                title = $2,
                description = $3,
                constraints = $4,
                difficulty = $5,
                status = $6,
                updated_at = $7
            WHERE id = $1
            "#,
        )
        .bind(problem.id)
        .bind(&problem.title)
        .bind(&problem.description)
        .bind(&problem.constraints)
        .bind(problem.difficulty.as_str())
        .bind(problem.status.as_str())
        .bind(problem.updated_at)
        .execute(self.conn()?)
        .await?;

        expect_one(result, "Problem not found")
    }

    async fn record_problem_resolution(
        &mut self,
        id: Uuid,
        accepted: bool,
        at: DateTime<Utc>,
    ) -> AppResult<Problem> {
        let problem = sqlx::query_as::<_, Problem>(
            r#"
            UPDATE problems
            SET
                submission_count = submission_count + 1,
                accepted_count = accepted_count + $2,
                updated_at = $3
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(i32::from(accepted))
        .bind(at)
        .fetch_optional(self.conn()?)
        .await?;

        problem.ok_or_else(|| AppError::NotFound(format!("Problem {} not found", id)))
    }

    async fn add_problem_reactions(
        &mut self,
        id: Uuid,
        likes: i32,
        dislikes: i32,
        at: DateTime<Utc>,
    ) -> AppResult<Problem> {
        let problem = sqlx::query_as::<_, Problem>(
            r#"
            UPDATE problems
            SET likes = likes + $2, dislikes = dislikes + $3, updated_at = $4
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(likes)
        .bind(dislikes)
        .bind(at)
        .fetch_optional(self.conn()?)
        .await?;

        problem.ok_or_else(|| AppError::NotFound(format!("Problem {} not found", id)))
    }

    async fn delete_problem(&mut self, id: Uuid) -> AppResult<bool> {
        let conn = self.conn()?;

        sqlx::query(
            r#"
            DELETE FROM contest_solves
            WHERE contest_problem_id IN (SELECT id FROM contest_problems WHERE problem_id = $1)
            "#,
        )
        .bind(id)
        .execute(&mut *conn)
        .await?;

        for statement in [
            r#"DELETE FROM contest_problems WHERE problem_id = $1"#,
            r#"DELETE FROM problem_categories WHERE problem_id = $1"#,
            r#"DELETE FROM user_progress WHERE problem_id = $1"#,
            r#"DELETE FROM submissions WHERE problem_id = $1"#,
            r#"DELETE FROM code_templates WHERE problem_id = $1"#,
            r#"DELETE FROM test_cases WHERE problem_id = $1"#,
        ] {
            sqlx::query(statement).bind(id).execute(&mut *conn).await?;
        }

        let result = sqlx::query(r#"DELETE FROM problems WHERE id = $1"#)
            .bind(id)
            .execute(&mut *conn)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_problems(
        &mut self,
        filter: &ProblemFilter,
        order: ProblemOrder,
    ) -> AppResult<Vec<Problem>> {
        let search_pattern = filter.search.as_ref().map(|s| format!("%{}%", s));

        let sql = format!(
            r#"
            SELECT p.* FROM problems p
            WHERE
                ($1::text IS NULL OR p.difficulty = $1)
                AND ($2::text IS NULL OR p.status = $2)
                AND ($3::uuid IS NULL OR p.created_by = $3)
                AND ($4::text IS NULL OR p.title ILIKE $4 OR p.description ILIKE $4)
                AND ($5::float8 IS NULL OR
                    (CASE WHEN p.submission_count > 0
                        THEN p.accepted_count * 100.0 / p.submission_count
                        ELSE 0 END) >= $5)
                AND ($6::uuid IS NULL OR EXISTS (
                    SELECT 1 FROM problem_categories pc
                    WHERE pc.problem_id = p.id AND pc.category_id = $6))
            ORDER BY {}
            LIMIT $7
            "#,
            order_clause(order)
        );

        let problems = sqlx::query_as::<_, Problem>(&sql)
            .bind(filter.difficulty.map(|d| d.as_str()))
            .bind(filter.status.map(|s| s.as_str()))
            .bind(filter.created_by)
            .bind(&search_pattern)
            .bind(filter.min_acceptance_rate)
            .bind(filter.category_id)
            .bind(filter.limit)
            .fetch_all(self.conn()?)
            .await?;

        Ok(problems)
    }
}
