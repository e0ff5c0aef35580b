//! Category repository
//!
//! Problem membership is stored once, in `problem_categories`; both the
//! "categories of a problem" and "problems in a category" views read it.

use async_trait::async_trait;
use uuid::Uuid;

use crate::db::postgres::{PgUnitOfWork, expect_one};
use crate::error::AppResult;
use crate::models::{Category, Problem};

/// Storage operations for categories and problem membership
#[async_trait]
pub trait CategoryRepository: Send {
    async fn insert_category(&mut self, category: &Category) -> AppResult<()>;

    async fn find_category(&mut self, id: Uuid) -> AppResult<Option<Category>>;

    async fn find_category_by_name(&mut self, name: &str) -> AppResult<Option<Category>>;

    async fn update_category(&mut self, category: &Category) -> AppResult<()>;

    /// Delete a category and its membership rows; problems are untouched
    async fn delete_category(&mut self, id: Uuid) -> AppResult<bool>;

    async fn list_categories(&mut self, active_only: bool) -> AppResult<Vec<Category>>;

    /// Returns `false` when the link already existed
    async fn link_problem_category(&mut self, problem_id: Uuid, category_id: Uuid)
    -> AppResult<bool>;

    /// Returns `false` when there was no link
    async fn unlink_problem_category(
        &mut self,
        problem_id: Uuid,
        category_id: Uuid,
    ) -> AppResult<bool>;

    async fn categories_for_problem(&mut self, problem_id: Uuid) -> AppResult<Vec<Category>>;

    async fn problems_in_category(&mut self, category_id: Uuid) -> AppResult<Vec<Problem>>;

    async fn count_problems_in_category(&mut self, category_id: Uuid) -> AppResult<i64>;
}

#[async_trait]
impl CategoryRepository for PgUnitOfWork {
    async fn insert_category(&mut self, category: &Category) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO categories (
                id, name, description, icon_url, color_code, is_active, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(category.id)
        .bind(&category.name)
        .bind(&category.description)
        .bind(&category.icon_url)
        .bind(&category.color_code)
        .bind(category.is_active)
        .bind(category.created_at)
        .bind(category.updated_at)
        .execute(self.conn()?)
        .await?;

        Ok(())
    }

    async fn find_category(&mut self, id: Uuid) -> AppResult<Option<Category>> {
        let category = sqlx::query_as::<_, Category>(r#"SELECT * FROM categories WHERE id = $1"#)
            .bind(id)
            .fetch_optional(self.conn()?)
            .await?;

        Ok(category)
    }

    async fn find_category_by_name(&mut self, name: &str) -> AppResult<Option<Category>> {
        let category =
            sqlx::query_as::<_, Category>(r#"SELECT * FROM categories WHERE name = $1"#)
                .bind(name)
                .fetch_optional(self.conn()?)
                .await?;

        Ok(category)
    }

    async fn update_category(&mut self, category: &Category) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE categories
            SET
                name = $2,
                description = $3,
                icon_url = $4,
                color_code = $5,
                is_active = $6,
                updated_at = $7
            WHERE id = $1
            "#,
        )
        .bind(category.id)
        .bind(&category.name)
        .bind(&category.description)
        .bind(&category.icon_url)
        .bind(&category.color_code)
        .bind(category.is_active)
        .bind(category.updated_at)
        .execute(self.conn()?)
        .await?;

        expect_one(result, "Category not found")
    }

    async fn delete_category(&mut self, id: Uuid) -> AppResult<bool> {
        let conn = self.conn()?;

        sqlx::query(r#"DELETE FROM problem_categories WHERE category_id = $1"#)
            .bind(id)
            .execute(&mut *conn)
            .await?;

        let result = sqlx::query(r#"DELETE FROM categories WHERE id = $1"#)
            .bind(id)
            .execute(&mut *conn)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_categories(&mut self, active_only: bool) -> AppResult<Vec<Category>> {
        let categories = sqlx::query_as::<_, Category>(
            r#"
            SELECT * FROM categories
            WHERE (NOT $1 OR is_active = true)
            ORDER BY name
            "#,
        )
        .bind(active_only)
        .fetch_all(self.conn()?)
        .await?;

        Ok(categories)
    }

    async fn link_problem_category(
        &mut self,
        problem_id: Uuid,
        category_id: Uuid,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO problem_categories (problem_id, category_id)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(problem_id)
        .bind(category_id)
        .execute(self.conn()?)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn unlink_problem_category(
        &mut self,
        problem_id: Uuid,
        category_id: Uuid,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            r#"DELETE FROM problem_categories WHERE problem_id = $1 AND category_id = $2"#,
        )
        .bind(problem_id)
        .bind(category_id)
        .execute(self.conn()?)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn categories_for_problem(&mut self, problem_id: Uuid) -> AppResult<Vec<Category>> {
        let categories = sqlx::query_as::<_, Category>(
            r#"
            SELECT c.* FROM categories c
            JOIN problem_categories pc ON pc.category_id = c.id
            WHERE pc.problem_id = $1
            ORDER BY c.name
            "#,
        )
        .bind(problem_id)
        .fetch_all(self.conn()?)
        .await?;

        Ok(categories)
    }

    async fn problems_in_category(&mut self, category_id: Uuid) -> AppResult<Vec<Problem>> {
        let problems = sqlx::query_as::<_, Problem>(
            r#"
            SELECT p.* FROM problems p
            JOIN problem_categories pc ON pc.problem_id = p.id
            WHERE pc.category_id = $1
            ORDER BY p.created_at DESC, p.id
            "#,
        )
        .bind(category_id)
        .fetch_all(self.conn()?)
        .await?;

        Ok(problems)
    }

    async fn count_problems_in_category(&mut self, category_id: Uuid) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"SELECT COUNT(*) FROM problem_categories WHERE category_id = $1"#,
        )
        .bind(category_id)
        .fetch_one(self.conn()?)
        .await?;

        Ok(count)
    }
}
