//! Code template repository

use async_trait::async_trait;
use uuid::Uuid;

use crate::db::postgres::{PgUnitOfWork, expect_one};
use crate::error::AppResult;
use crate::models::{CodeTemplate, Language};

/// Storage operations for starter code
#[async_trait]
pub trait CodeTemplateRepository: Send {
    async fn insert_code_template(&mut self, template: &CodeTemplate) -> AppResult<()>;

    async fn update_code_template(&mut self, template: &CodeTemplate) -> AppResult<()>;

    async fn find_code_template(
        &mut self,
        problem_id: Uuid,
        language: Language,
    ) -> AppResult<Option<CodeTemplate>>;

    async fn code_templates_for_problem(&mut self, problem_id: Uuid)
    -> AppResult<Vec<CodeTemplate>>;

    async fn delete_code_template(&mut self, id: Uuid) -> AppResult<bool>;
}

#[async_trait]
impl CodeTemplateRepository for PgUnitOfWork {
    async fn insert_code_template(&mut self, template: &CodeTemplate) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO code_templates (
                id, problem_id, language, template_code, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(template.id)
        .bind(template.problem_id)
        .bind(template.language.as_str())
        .bind(&template.template_code)
        .bind(template.created_at)
        .bind(template.updated_at)
        .execute(self.conn()?)
        .await?;

        Ok(())
    }

    async fn update_code_template(&mut self, template: &CodeTemplate) -> AppResult<()> {
        let result = sqlx::query(
            r#"UPDATE code_templates SET template_code = $2, updated_at = $3 WHERE id = $1"#,
        )
        .bind(template.id)
        .bind(&template.template_code)
        .bind(template.updated_at)
        .execute(self.conn()?)
        .await?;

        expect_one(result, "Code template not found")
    }

    async fn find_code_template(
        &mut self,
        problem_id: Uuid,
        language: Language,
    ) -> AppResult<Option<CodeTemplate>> {
        let template = sqlx::query_as::<_, CodeTemplate>(
            r#"SELECT * FROM code_templates WHERE problem_id = $1 AND language = $2"#,
        )
        .bind(problem_id)
        .bind(language.as_str())
        .fetch_optional(self.conn()?)
        .await?;

        Ok(template)
    }

    async fn code_templates_for_problem(
        &mut self,
        problem_id: Uuid,
    ) -> AppResult<Vec<CodeTemplate>> {
        let templates = sqlx::query_as::<_, CodeTemplate>(
            r#"SELECT * FROM code_templates WHERE problem_id = $1 ORDER BY language"#,
        )
        .bind(problem_id)
        .fetch_all(self.conn()?)
        .await?;

        Ok(templates)
    }

    async fn delete_code_template(&mut self, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query(r#"DELETE FROM code_templates WHERE id = $1"#)
            .bind(id)
            .execute(self.conn()?)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
