//! Test case service

use tracing::info;
use uuid::Uuid;

use crate::{
    db::{ProblemRepository, TestCaseRepository},
    error::{AppError, AppResult},
    models::{NewTestCase, TestCase, TestCaseFilter, TestCaseUpdate},
    state::AppState,
    utils::validation::{check, validate_test_case_data},
};

/// Test case service for business logic
pub struct TestCaseService;

impl TestCaseService {
    /// Attach a test case to a problem
    pub async fn add(state: &AppState, problem_id: Uuid, input: NewTestCase) -> AppResult<TestCase> {
        check(validate_test_case_data(&input.input_data, &input.expected_output))?;

        let mut uow = state.begin().await?;
        if uow.find_problem(problem_id).await?.is_none() {
            return Err(AppError::NotFound(format!("Problem {} not found", problem_id)));
        }

        let test_case = TestCase::new(problem_id, input, state.now());
        uow.insert_test_case(&test_case).await?;
        uow.commit().await?;

        info!(problem_id = %problem_id, test_case_id = %test_case.id, "Test case added");
        Ok(test_case)
    }

    pub async fn update(state: &AppState, id: Uuid, update: TestCaseUpdate) -> AppResult<TestCase> {
        let mut uow = state.begin().await?;
        let mut test_case = uow
            .find_test_case(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Test case {} not found", id)))?;

        test_case.apply_update(update);
        check(validate_test_case_data(
            &test_case.input_data,
            &test_case.expected_output,
        ))?;
        test_case.touch(state.now());
        uow.update_test_case(&test_case).await?;
        uow.commit().await?;

        Ok(test_case)
    }

    pub async fn delete(state: &AppState, id: Uuid) -> AppResult<()> {
        let mut uow = state.begin().await?;
        if !uow.delete_test_case(id).await? {
            return Err(AppError::NotFound(format!("Test case {} not found", id)));
        }
        uow.commit().await?;
        Ok(())
    }

    /// All cases of a problem narrowed by `filter`
    pub async fn list(
        state: &AppState,
        problem_id: Uuid,
        filter: TestCaseFilter,
    ) -> AppResult<Vec<TestCase>> {
        let mut uow = state.begin().await?;
        uow.test_cases_for_problem(problem_id, filter).await
    }

    /// Cases an end user may see: samples, and anything not hidden
    pub async fn visible(state: &AppState, problem_id: Uuid) -> AppResult<Vec<TestCase>> {
        let cases = Self::list(state, problem_id, TestCaseFilter::default()).await?;
        Ok(cases.into_iter().filter(TestCase::is_visible_to_user).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::TestApp;

    fn case(sample: bool, hidden: bool) -> NewTestCase {
        NewTestCase {
            input_data: "1 2".to_string(),
            expected_output: "3".to_string(),
            is_sample: sample,
            is_hidden: hidden,
            explanation: None,
        }
    }

    #[tokio::test]
    async fn test_visibility() {
        let app = TestApp::new();
        let problem = app.problem("add").await;

        let sample = TestCaseService::add(&app.state, problem.id, case(true, true)).await.unwrap();
        let open = TestCaseService::add(&app.state, problem.id, case(false, false)).await.unwrap();
        TestCaseService::add(&app.state, problem.id, case(false, true)).await.unwrap();

        let visible = TestCaseService::visible(&app.state, problem.id).await.unwrap();
        let mut ids: Vec<Uuid> = visible.iter().map(|c| c.id).collect();
        ids.sort();
        let mut expected = vec![sample.id, open.id];
        expected.sort();
        assert_eq!(ids, expected);

        let samples = TestCaseService::list(
            &app.state,
            problem.id,
            TestCaseFilter {
                sample: Some(true),
                hidden: None,
            },
        )
        .await
        .unwrap();
        assert_eq!(samples.len(), 1);
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let app = TestApp::new();
        let problem = app.problem("add").await;
        let created = TestCaseService::add(&app.state, problem.id, case(false, true)).await.unwrap();

        let updated = TestCaseService::update(
            &app.state,
            created.id,
            TestCaseUpdate {
                is_hidden: Some(false),
                explanation: Some("1 + 2".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert!(updated.is_visible_to_user());

        TestCaseService::delete(&app.state, created.id).await.unwrap();
        assert!(matches!(
            TestCaseService::delete(&app.state, created.id).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_add_to_missing_problem() {
        let app = TestApp::new();
        assert!(matches!(
            TestCaseService::add(&app.state, Uuid::new_v4(), case(true, false)).await,
            Err(AppError::NotFound(_))
        ));
    }
}
