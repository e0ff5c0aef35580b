//! Test case repository

use async_trait::async_trait;
use uuid::Uuid;

use crate::db::postgres::{PgUnitOfWork, expect_one};
use crate::error::AppResult;
use crate::models::{TestCase, TestCaseFilter};

/// Storage operations for test cases
#[async_trait]
pub trait TestCaseRepository: Send {
    async fn insert_test_case(&mut self, test_case: &TestCase) -> AppResult<()>;

    async fn find_test_case(&mut self, id: Uuid) -> AppResult<Option<TestCase>>;

    async fn update_test_case(&mut self, test_case: &TestCase) -> AppResult<()>;

    async fn delete_test_case(&mut self, id: Uuid) -> AppResult<bool>;

    /// Cases of one problem in creation order
    async fn test_cases_for_problem(
        &mut self,
        problem_id: Uuid,
        filter: TestCaseFilter,
    ) -> AppResult<Vec<TestCase>>;
}

#[async_trait]
impl TestCaseRepository for PgUnitOfWork {
    async fn insert_test_case(&mut self, test_case: &TestCase) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO test_cases (
                id, problem_id, input_data, expected_output, is_sample, is_hidden,
                explanation, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(test_case.id)
        .bind(test_case.problem_id)
        .bind(&test_case.input_data)
        .bind(&test_case.expected_output)
        .bind(test_case.is_sample)
        .bind(test_case.is_hidden)
        .bind(&test_case.explanation)
        .bind(test_case.created_at)
        .bind(test_case.updated_at)
        .execute(self.conn()?)
        .await?;

        Ok(())
    }

    async fn find_test_case(&mut self, id: Uuid) -> AppResult<Option<TestCase>> {
        let test_case = sqlx::query_as::<_, TestCase>(r#"SELECT * FROM test_cases WHERE id = $1"#)
            .bind(id)
            .fetch_optional(self.conn()?)
            .await?;

        Ok(test_case)
    }

    async fn update_test_case(&mut self, test_case: &TestCase) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE test_cases
            SET
                input_data = $2,
                expected_output = $3,
                is_sample = $4,
                is_hidden = $5,
                explanation = $6,
                updated_at = $7
            WHERE id = $1
            "#,
        )
        .bind(test_case.id)
        .bind(&test_case.input_data)
        .bind(&test_case.expected_output)
        .bind(test_case.is_sample)
        .bind(test_case.is_hidden)
        .bind(&test_case.explanation)
        .bind(test_case.updated_at)
        .execute(self.conn()?)
        .await?;

        expect_one(result, "Test case not found")
    }

    async fn delete_test_case(&mut self, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query(r#"DELETE FROM test_cases WHERE id = $1"#)
            .bind(id)
            .execute(self.conn()?)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn test_cases_for_problem(
        &mut self,
        problem_id: Uuid,
        filter: TestCaseFilter,
    ) -> AppResult<Vec<TestCase>> {
        let test_cases = sqlx::query_as::<_, TestCase>(
            r#"
            SELECT * FROM test_cases
            WHERE problem_id = $1
                AND ($2::bool IS NULL OR is_sample = $2)
                AND ($3::bool IS NULL OR is_hidden = $3)
            ORDER BY created_at, id
            "#,
        )
        .bind(problem_id)
        .bind(filter.sample)
        .bind(filter.hidden)
        .fetch_all(self.conn()?)
        .await?;

        Ok(test_cases)
    }
}
