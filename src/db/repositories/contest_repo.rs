//! Contest repository
//!
//! Covers contests, their problem set, participants and the solve records
//! that make awards idempotent.

use async_trait::async_trait;
use uuid::Uuid;

use crate::db::postgres::{PgUnitOfWork, expect_one};
use crate::error::AppResult;
use crate::models::{Contest, ContestFilter, ContestParticipant, ContestProblem, ContestSolve};

/// Storage operations for contests
#[async_trait]
pub trait ContestRepository: Send {
    async fn insert_contest(&mut self, contest: &Contest) -> AppResult<()>;

    async fn find_contest(&mut self, id: Uuid) -> AppResult<Option<Contest>>;

    /// Fetch the contest and hold it exclusively until the unit of work ends
    async fn lock_contest(&mut self, id: Uuid) -> AppResult<Option<Contest>>;

    async fn update_contest(&mut self, contest: &Contest) -> AppResult<()>;

    /// Delete a contest with its problem set, participants and solves
    async fn delete_contest(&mut self, id: Uuid) -> AppResult<bool>;

    /// Earliest start first
    async fn list_contests(&mut self, filter: &ContestFilter) -> AppResult<Vec<Contest>>;

    async fn insert_contest_problem(&mut self, contest_problem: &ContestProblem) -> AppResult<()>;

    async fn find_contest_problem(&mut self, id: Uuid) -> AppResult<Option<ContestProblem>>;

    async fn find_contest_problem_by_problem(
        &mut self,
        contest_id: Uuid,
        problem_id: Uuid,
    ) -> AppResult<Option<ContestProblem>>;

    async fn contest_problems(&mut self, contest_id: Uuid) -> AppResult<Vec<ContestProblem>>;

    /// Delete a contest problem and the solves that reference it
    async fn delete_contest_problem(&mut self, id: Uuid) -> AppResult<bool>;

    async fn insert_participant(&mut self, participant: &ContestParticipant) -> AppResult<()>;

    async fn find_participant(
        &mut self,
        contest_id: Uuid,
        user_id: Uuid,
    ) -> AppResult<Option<ContestParticipant>>;

    /// Persist score and rank
    async fn update_participant(&mut self, participant: &ContestParticipant) -> AppResult<()>;

    /// Delete a participant and their solves
    async fn delete_participant(&mut self, id: Uuid) -> AppResult<bool>;

    /// Score descending, then earliest join, then id
    async fn ranked_participants(&mut self, contest_id: Uuid)
    -> AppResult<Vec<ContestParticipant>>;

    async fn count_participants(&mut self, contest_id: Uuid) -> AppResult<i64>;

    async fn find_solve(
        &mut self,
        participant_id: Uuid,
        contest_problem_id: Uuid,
    ) -> AppResult<Option<ContestSolve>>;

    async fn insert_solve(&mut self, solve: &ContestSolve) -> AppResult<()>;
}

#[async_trait]
impl ContestRepository for PgUnitOfWork {
    async fn insert_contest(&mut self, contest: &Contest) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO contests (
                id, title, description, start_time, end_time, duration_minutes,
                is_public, created_by, max_participants, status, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(contest.id)
        .bind(&contest.title)
        .bind(&contest.description)
        .bind(contest.start_time)
        .bind(contest.end_time)
        .bind(contest.duration_minutes)
        .bind(contest.is_public)
        .bind(contest.created_by)
        .bind(contest.max_participants)
        .bind(contest.status.as_str())
        .bind(contest.created_at)
        .bind(contest.updated_at)
        .execute(self.conn()?)
        .await?;

        Ok(())
    }

    async fn find_contest(&mut self, id: Uuid) -> AppResult<Option<Contest>> {
        let contest = sqlx::query_as::<_, Contest>(r#"SELECT * FROM contests WHERE id = $1"#)
            .bind(id)
            .fetch_optional(self.conn()?)
            .await?;

        Ok(contest)
    }

    async fn lock_contest(&mut self, id: Uuid) -> AppResult<Option<Contest>> {
        let contest =
            sqlx::query_as::<_, Contest>(r#"SELECT * FROM contests WHERE id = $1 FOR UPDATE"#)
                .bind(id)
                .fetch_optional(self.conn()?)
                .await?;

        Ok(contest)
    }

    async fn update_contest(&mut self, contest: &Contest) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE contests
            SET
                title = $2,
                description = $3,
                start_time = $4,
                end_time = $5,
                duration_minutes = $6,
                is_public = $7,
                max_participants = $8,
                status = $9,
                updated_at = $10
            WHERE id = $1
            "#,
        )
        .bind(contest.id)
        .bind(&contest.title)
        .bind(&contest.description)
        .bind(contest.start_time)
        .bind(contest.end_time)
        .bind(contest.duration_minutes)
        .bind(contest.is_public)
        .bind(contest.max_participants)
        .bind(contest.status.as_str())
        .bind(contest.updated_at)
        .execute(self.conn()?)
        .await?;

        expect_one(result, "Contest not found")
    }

    async fn delete_contest(&mut self, id: Uuid) -> AppResult<bool> {
        let conn = self.conn()?;

        sqlx::query(
            r#"
            DELETE FROM contest_solves
            WHERE participant_id IN (SELECT id FROM contest_participants WHERE contest_id = $1)
               OR contest_problem_id IN (SELECT id FROM contest_problems WHERE contest_id = $1)
            "#,
        )
        .bind(id)
        .execute(&mut *conn)
        .await?;

        for statement in [
            r#"DELETE FROM contest_participants WHERE contest_id = $1"#,
            r#"DELETE FROM contest_problems WHERE contest_id = $1"#,
        ] {
            sqlx::query(statement).bind(id).execute(&mut *conn).await?;
        }

        let result = sqlx::query(r#"DELETE FROM contests WHERE id = $1"#)
            .bind(id)
            .execute(&mut *conn)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_contests(&mut self, filter: &ContestFilter) -> AppResult<Vec<Contest>> {
        let contests = sqlx::query_as::<_, Contest>(
            r#"
            SELECT * FROM contests
            WHERE
                ($1::text IS NULL OR status = $1)
                AND (NOT $2 OR is_public = true)
                AND ($3::uuid IS NULL OR created_by = $3)
            ORDER BY start_time ASC, id
            "#,
        )
        .bind(filter.status.map(|s| s.as_str()))
        .bind(filter.public_only)
        .bind(filter.created_by)
        .fetch_all(self.conn()?)
        .await?;

        Ok(contests)
    }

    async fn insert_contest_problem(&mut self, contest_problem: &ContestProblem) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO contest_problems (id, contest_id, problem_id, points)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(contest_problem.id)
        .bind(contest_problem.contest_id)
        .bind(contest_problem.problem_id)
        .bind(contest_problem.points)
        .execute(self.conn()?)
        .await?;

        Ok(())
    }

    async fn find_contest_problem(&mut self, id: Uuid) -> AppResult<Option<ContestProblem>> {
        let contest_problem =
            sqlx::query_as::<_, ContestProblem>(r#"SELECT * FROM contest_problems WHERE id = $1"#)
                .bind(id)
                .fetch_optional(self.conn()?)
                .await?;

        Ok(contest_problem)
    }

    async fn find_contest_problem_by_problem(
        &mut self,
        contest_id: Uuid,
        problem_id: Uuid,
    ) -> AppResult<Option<ContestProblem>> {
        let contest_problem = sqlx::query_as::<_, ContestProblem>(
            r#"SELECT * FROM contest_problems WHERE contest_id = $1 AND problem_id = $2"#,
        )
        .bind(contest_id)
        .bind(problem_id)
        .fetch_optional(self.conn()?)
        .await?;

        Ok(contest_problem)
    }

    async fn contest_problems(&mut self, contest_id: Uuid) -> AppResult<Vec<ContestProblem>> {
        let contest_problems = sqlx::query_as::<_, ContestProblem>(
            r#"SELECT * FROM contest_problems WHERE contest_id = $1 ORDER BY points, id"#,
        )
        .bind(contest_id)
        .fetch_all(self.conn()?)
        .await?;

        Ok(contest_problems)
    }

    async fn delete_contest_problem(&mut self, id: Uuid) -> AppResult<bool> {
        let conn = self.conn()?;

        sqlx::query(r#"DELETE FROM contest_solves WHERE contest_problem_id = $1"#)
            .bind(id)
            .execute(&mut *conn)
            .await?;

        let result = sqlx::query(r#"DELETE FROM contest_problems WHERE id = $1"#)
            .bind(id)
            .execute(&mut *conn)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn insert_participant(&mut self, participant: &ContestParticipant) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO contest_participants (id, contest_id, user_id, joined_at, score, rank)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(participant.id)
        .bind(participant.contest_id)
        .bind(participant.user_id)
        .bind(participant.joined_at)
        .bind(participant.score)
        .bind(participant.rank)
        .execute(self.conn()?)
        .await?;

        Ok(())
    }

    async fn find_participant(
        &mut self,
        contest_id: Uuid,
        user_id: Uuid,
    ) -> AppResult<Option<ContestParticipant>> {
        let participant = sqlx::query_as::<_, ContestParticipant>(
            r#"SELECT * FROM contest_participants WHERE contest_id = $1 AND user_id = $2"#,
        )
        .bind(contest_id)
        .bind(user_id)
        .fetch_optional(self.conn()?)
        .await?;

        Ok(participant)
    }

    async fn update_participant(&mut self, participant: &ContestParticipant) -> AppResult<()> {
        let result =
            sqlx::query(r#"UPDATE contest_participants SET score = $2, rank = $3 WHERE id = $1"#)
                .bind(participant.id)
                .bind(participant.score)
                .bind(participant.rank)
                .execute(self.conn()?)
                .await?;

        expect_one(result, "Participant not found")
    }

    async fn delete_participant(&mut self, id: Uuid) -> AppResult<bool> {
        let conn = self.conn()?;

        sqlx::query(r#"DELETE FROM contest_solves WHERE participant_id = $1"#)
            .bind(id)
            .execute(&mut *conn)
            .await?;

        let result = sqlx::query(r#"DELETE FROM contest_participants WHERE id = $1"#)
            .bind(id)
            .execute(&mut *conn)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn ranked_participants(
        &mut self,
        contest_id: Uuid,
    ) -> AppResult<Vec<ContestParticipant>> {
        let participants = sqlx::query_as::<_, ContestParticipant>(
            r#"
            SELECT * FROM contest_participants
            WHERE contest_id = $1
            ORDER BY score DESC, joined_at ASC, id ASC
            "#,
        )
        .bind(contest_id)
        .fetch_all(self.conn()?)
        .await?;

        Ok(participants)
    }

    async fn count_participants(&mut self, contest_id: Uuid) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"SELECT COUNT(*) FROM contest_participants WHERE contest_id = $1"#,
        )
        .bind(contest_id)
        .fetch_one(self.conn()?)
        .await?;

        Ok(count)
    }

    async fn find_solve(
        &mut self,
        participant_id: Uuid,
        contest_problem_id: Uuid,
    ) -> AppResult<Option<ContestSolve>> {
        let solve = sqlx::query_as::<_, ContestSolve>(
            r#"
            SELECT * FROM contest_solves
            WHERE participant_id = $1 AND contest_problem_id = $2
            "#,
        )
        .bind(participant_id)
        .bind(contest_problem_id)
        .fetch_optional(self.conn()?)
        .await?;

        Ok(solve)
    }

    async fn insert_solve(&mut self, solve: &ContestSolve) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO contest_solves (
                id, participant_id, contest_problem_id, points_awarded, solved_at
            )
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(solve.id)
        .bind(solve.participant_id)
        .bind(solve.contest_problem_id)
        .bind(solve.points_awarded)
        .bind(solve.solved_at)
        .execute(self.conn()?)
        .await?;

        Ok(())
    }
}
