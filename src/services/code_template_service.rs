//! Code template service

use tracing::info;
use uuid::Uuid;

use crate::{
    db::{CodeTemplateRepository, ProblemRepository},
    error::{AppError, AppResult},
    models::{CodeTemplate, Language},
    state::AppState,
    utils::validation::{check, validate_source_code},
};

pub struct CodeTemplateService;

impl CodeTemplateService {
    /// Create or replace the template for (problem, language)
    pub async fn set(
        state: &AppState,
        problem_id: Uuid,
        language: Language,
        template_code: String,
    ) -> AppResult<CodeTemplate> {
        check(validate_source_code(&template_code))?;

        let now = state.now();
        let mut uow = state.begin().await?;
        if uow.find_problem(problem_id).await?.is_none() {
            return Err(AppError::NotFound(format!("Problem {} not found", problem_id)));
        }

        let template = match uow.find_code_template(problem_id, language).await? {
            Some(mut existing) => {
                existing.template_code = template_code;
                existing.touch(now);
                uow.update_code_template(&existing).await?;
                existing
            }
            None => {
                let template = CodeTemplate::new(problem_id, language, template_code, now);
                uow.insert_code_template(&template).await?;
                template
            }
        };
        uow.commit().await?;

        info!(problem_id = %problem_id, language = %language, "Code template saved");
        Ok(template)
    }

    pub async fn get(state: &AppState, problem_id: Uuid, language: Language) -> AppResult<CodeTemplate> {
        let mut uow = state.begin().await?;
        uow.find_code_template(problem_id, language)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("No {} template for problem {}", language, problem_id))
            })
    }

    pub async fn list(state: &AppState, problem_id: Uuid) -> AppResult<Vec<CodeTemplate>> {
        let mut uow = state.begin().await?;
        uow.code_templates_for_problem(problem_id).await
    }

    /// Returns `false` when there was nothing to delete
    pub async fn delete(state: &AppState, problem_id: Uuid, language: Language) -> AppResult<bool> {
        let mut uow = state.begin().await?;
        let Some(template) = uow.find_code_template(problem_id, language).await? else {
            return Ok(false);
        };
        uow.delete_code_template(template.id).await?;
        uow.commit().await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::TestApp;

    #[tokio::test]
    async fn test_set_replaces_per_language() {
        let app = TestApp::new();
        let problem = app.problem("add").await;

        let first = CodeTemplateService::set(&app.state, problem.id, Language::Python, "def solve(): pass".into())
            .await
            .unwrap();
        app.advance(chrono::Duration::seconds(30));
        let second = CodeTemplateService::set(&app.state, problem.id, Language::Python, "def solve(a, b): pass".into())
            .await
            .unwrap();
        CodeTemplateService::set(&app.state, problem.id, Language::Rust, "fn main() {}".into())
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert!(second.updated_at > first.updated_at);

        let python = CodeTemplateService::get(&app.state, problem.id, Language::Python).await.unwrap();
        assert_eq!(python.template_code, "def solve(a, b): pass");
        assert_eq!(CodeTemplateService::list(&app.state, problem.id).await.unwrap().len(), 2);

        assert!(CodeTemplateService::delete(&app.state, problem.id, Language::Rust).await.unwrap());
        assert!(!CodeTemplateService::delete(&app.state, problem.id, Language::Rust).await.unwrap());
        assert!(matches!(
            CodeTemplateService::get(&app.state, problem.id, Language::Rust).await,
            Err(AppError::NotFound(_))
        ));
    }
}
