//! Submission service
//!
//! Recording a verdict touches four records: the submission, the problem's
//! counters, the user's progress and the user's streak. They change together
//! inside one unit of work or not at all.

use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    constants::MAX_PENDING_BATCH,
    db::{ProblemRepository, SubmissionRepository, UserRepository},
    error::{AppError, AppResult},
    models::{Language, OutcomeReport, Submission, SubmissionFilter},
    services::ProgressService,
    state::AppState,
    utils::validation::{check, validate_source_code},
};

/// Submission service for business logic
pub struct SubmissionService;

impl SubmissionService {
    /// Create a new PENDING submission
    pub async fn create_submission(
        state: &AppState,
        user_id: Uuid,
        problem_id: Uuid,
        language: Language,
        code: String,
    ) -> AppResult<Submission> {
        check(validate_source_code(&code))?;

        let mut uow = state.begin().await?;
        if uow.find_user(user_id).await?.is_none() {
            return Err(AppError::NotFound(format!("User {} not found", user_id)));
        }
        if uow.find_problem(problem_id).await?.is_none() {
            return Err(AppError::NotFound(format!("Problem {} not found", problem_id)));
        }

        let submission = Submission::new(user_id, problem_id, language, code, state.now());
        uow.insert_submission(&submission).await?;
        uow.commit().await?;

        info!(
            submission_id = %submission.id,
            user_id = %user_id,
            problem_id = %problem_id,
            language = %language,
            "Submission created"
        );
        Ok(submission)
    }

    /// PENDING -> RUNNING, when the judge picks the submission up
    pub async fn start_judging(state: &AppState, id: Uuid) -> AppResult<Submission> {
        let mut uow = state.begin().await?;
        let mut submission = uow
            .lock_submission(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Submission {} not found", id)))?;

        submission.start()?;
        uow.update_submission(&submission).await?;
        uow.commit().await?;

        Ok(submission)
    }

    /// Apply the judge's verdict and propagate it to counters, progress and streak
    pub async fn record_outcome(
        state: &AppState,
        id: Uuid,
        report: OutcomeReport,
    ) -> AppResult<Submission> {
        let now = state.now();
        let mut uow = state.begin().await?;

        // Rows are taken in a fixed order: submission, problem, progress, user
        let mut submission = uow
            .lock_submission(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Submission {} not found", id)))?;

        if let Err(err) = submission.resolve(&report, now) {
            warn!(submission_id = %id, status = %report.status, error = %err, "Outcome rejected");
            return Err(err);
        }
        uow.update_submission(&submission).await?;

        uow.record_problem_resolution(submission.problem_id, submission.is_accepted(), now)
            .await?;

        ProgressService::apply_in(
            uow.as_mut(),
            submission.user_id,
            submission.problem_id,
            submission.status,
            submission.submitted_at,
            report.score,
            state.config().scoring.score_order,
            now,
        )
        .await?;

        let mut user = uow.lock_user(submission.user_id).await?.ok_or_else(|| {
            AppError::NotFound(format!("User {} not found", submission.user_id))
        })?;
        if user.record_activity(now.date_naive()) {
            user.touch(now);
            uow.update_user(&user).await?;
        }

        uow.commit().await?;

        info!(
            submission_id = %id,
            status = %submission.status,
            passed = submission.passed_test_cases,
            total = submission.total_test_cases,
            "Submission judged"
        );
        Ok(submission)
    }

    pub async fn get(state: &AppState, id: Uuid) -> AppResult<Submission> {
        let mut uow = state.begin().await?;
        uow.find_submission(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Submission {} not found", id)))
    }

    /// Newest first
    pub async fn list(state: &AppState, filter: &SubmissionFilter) -> AppResult<Vec<Submission>> {
        let mut uow = state.begin().await?;
        uow.list_submissions(filter).await
    }

    /// Oldest PENDING submissions, at most [`MAX_PENDING_BATCH`]
    pub async fn pending(state: &AppState, limit: Option<i64>) -> AppResult<Vec<Submission>> {
        let limit = limit.unwrap_or(MAX_PENDING_BATCH).clamp(1, MAX_PENDING_BATCH);
        let mut uow = state.begin().await?;
        uow.pending_submissions(limit).await
    }

    /// The user's fastest accepted submission for a problem
    pub async fn best_accepted(
        state: &AppState,
        user_id: Uuid,
        problem_id: Uuid,
    ) -> AppResult<Option<Submission>> {
        let mut uow = state.begin().await?;
        uow.best_accepted_submission(user_id, problem_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ProgressStatus, SubmissionStatus};
    use crate::services::{ProblemService, UserService};
    use crate::test_utils::TestApp;
    use chrono::Duration;

    async fn submit(app: &TestApp, user_id: Uuid, problem_id: Uuid) -> Submission {
        SubmissionService::create_submission(
            &app.state,
            user_id,
            problem_id,
            Language::Python,
            "print(sum(map(int, input().split())))".to_string(),
        )
        .await
        .unwrap()
    }

    /// Judge one wrong answer and return the user's streak afterwards
    async fn judge_once(app: &TestApp, user_id: Uuid, problem_id: Uuid) -> i32 {
        let submission = submit(app, user_id, problem_id).await;
        SubmissionService::record_outcome(
            &app.state,
            submission.id,
            OutcomeReport::new(SubmissionStatus::WrongAnswer, 0, 1),
        )
        .await
        .unwrap();
        UserService::get(&app.state, user_id).await.unwrap().streak_count
    }

    #[tokio::test]
    async fn test_first_accepted_submission() {
        let app = TestApp::new();
        let alice = app.user("alice").await;
        let problem = app.problem("sum").await;

        let submission = submit(&app, alice.id, problem.id).await;
        assert_eq!(submission.status, SubmissionStatus::Pending);

        let judged = SubmissionService::record_outcome(
            &app.state,
            submission.id,
            OutcomeReport::new(SubmissionStatus::Accepted, 10, 10).with_metrics(120, 2048),
        )
        .await
        .unwrap();
        assert_eq!(judged.status, SubmissionStatus::Accepted);
        assert_eq!(judged.judged_at, Some(app.clock_now()));

        let problem = ProblemService::get(&app.state, problem.id).await.unwrap();
        assert_eq!(problem.submission_count, 1);
        assert_eq!(problem.accepted_count, 1);
        assert_eq!(problem.acceptance_rate(), 100.0);

        let progress = ProgressService::get(&app.state, alice.id, problem.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(progress.status, ProgressStatus::Completed);
        assert_eq!(progress.attempts, 1);

        let alice = UserService::get(&app.state, alice.id).await.unwrap();
        assert_eq!(alice.streak_count, 1);
    }

    #[tokio::test]
    async fn test_wrong_answer_then_accepted() {
        let app = TestApp::new();
        let alice = app.user("alice").await;
        let problem = app.problem("sum").await;

        let first = submit(&app, alice.id, problem.id).await;
        SubmissionService::start_judging(&app.state, first.id).await.unwrap();
        SubmissionService::record_outcome(
            &app.state,
            first.id,
            OutcomeReport::new(SubmissionStatus::WrongAnswer, 3, 10).with_error("line 4 differs"),
        )
        .await
        .unwrap();

        let progress = ProgressService::get(&app.state, alice.id, problem.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(progress.status, ProgressStatus::InProgress);

        let second = submit(&app, alice.id, problem.id).await;
        SubmissionService::record_outcome(
            &app.state,
            second.id,
            OutcomeReport::new(SubmissionStatus::Accepted, 10, 10),
        )
        .await
        .unwrap();

        let progress = ProgressService::get(&app.state, alice.id, problem.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(progress.status, ProgressStatus::Completed);
        assert_eq!(progress.attempts, 2);

        let problem = ProblemService::get(&app.state, problem.id).await.unwrap();
        assert_eq!(problem.submission_count, 2);
        assert_eq!(problem.accepted_count, 1);
        assert_eq!(problem.acceptance_rate(), 50.0);
    }

    #[tokio::test]
    async fn test_rejected_outcome_changes_nothing() {
        let app = TestApp::new();
        let alice = app.user("alice").await;
        let problem = app.problem("sum").await;
        let submission = submit(&app, alice.id, problem.id).await;

        let invalid = SubmissionService::record_outcome(
            &app.state,
            submission.id,
            OutcomeReport::new(SubmissionStatus::Accepted, 11, 10),
        )
        .await;
        assert!(matches!(invalid, Err(AppError::Validation(_))));
        let stored = SubmissionService::get(&app.state, submission.id).await.unwrap();
        assert_eq!(stored.status, SubmissionStatus::Pending);

        SubmissionService::record_outcome(
            &app.state,
            submission.id,
            OutcomeReport::new(SubmissionStatus::TimeLimitExceeded, 4, 10),
        )
        .await
        .unwrap();

        let again = SubmissionService::record_outcome(
            &app.state,
            submission.id,
            OutcomeReport::new(SubmissionStatus::Accepted, 10, 10),
        )
        .await;
        assert!(matches!(again, Err(AppError::InvalidTransition { .. })));

        let problem = ProblemService::get(&app.state, problem.id).await.unwrap();
        assert_eq!(problem.submission_count, 1);
        assert_eq!(problem.accepted_count, 0);
        let progress = ProgressService::get(&app.state, alice.id, problem.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(progress.attempts, 1);
    }

    #[tokio::test]
    async fn test_concurrent_verdicts_on_one_submission() {
        let app = TestApp::new();
        let alice = app.user("alice").await;
        let problem = app.problem("sum").await;
        let submission = submit(&app, alice.id, problem.id).await;

        let results = futures::future::join_all((0..6).map(|_| {
            SubmissionService::record_outcome(
                &app.state,
                submission.id,
                OutcomeReport::new(SubmissionStatus::Accepted, 1, 1),
            )
        }))
        .await;

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(
            results
                .iter()
                .filter_map(|r| r.as_ref().err())
                .all(|e| matches!(e, AppError::InvalidTransition { .. }))
        );

        let problem = ProblemService::get(&app.state, problem.id).await.unwrap();
        assert_eq!(problem.submission_count, 1);
        let progress = ProgressService::get(&app.state, alice.id, problem.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(progress.attempts, 1);
    }

    #[tokio::test]
    async fn test_streak_follows_consecutive_days() {
        let app = TestApp::new();
        let alice = app.user("alice").await;
        let problem = app.problem("sum").await;

        assert_eq!(judge_once(&app, alice.id, problem.id).await, 1);
        // Same day does not extend the streak
        assert_eq!(judge_once(&app, alice.id, problem.id).await, 1);
        app.advance(Duration::days(1));
        assert_eq!(judge_once(&app, alice.id, problem.id).await, 2);
        app.advance(Duration::days(2));
        assert_eq!(judge_once(&app, alice.id, problem.id).await, 1);
    }

    #[tokio::test]
    async fn test_pending_queue_and_best_accepted() {
        let app = TestApp::new();
        let alice = app.user("alice").await;
        let problem = app.problem("sum").await;

        let slow = submit(&app, alice.id, problem.id).await;
        app.advance(Duration::seconds(5));
        let fast = submit(&app, alice.id, problem.id).await;
        app.advance(Duration::seconds(5));
        let running = submit(&app, alice.id, problem.id).await;
        SubmissionService::start_judging(&app.state, running.id).await.unwrap();

        let queue = SubmissionService::pending(&app.state, None).await.unwrap();
        let ids: Vec<Uuid> = queue.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![slow.id, fast.id]);
        assert_eq!(SubmissionService::pending(&app.state, Some(1)).await.unwrap().len(), 1);

        for (id, time) in [(slow.id, 900), (fast.id, 150)] {
            SubmissionService::record_outcome(
                &app.state,
                id,
                OutcomeReport::new(SubmissionStatus::Accepted, 5, 5).with_metrics(time, 1024),
            )
            .await
            .unwrap();
        }

        let best = SubmissionService::best_accepted(&app.state, alice.id, problem.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(best.id, fast.id);

        let filter = SubmissionFilter {
            status: Some(SubmissionStatus::Accepted),
            ..Default::default()
        };
        assert_eq!(SubmissionService::list(&app.state, &filter).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_create_submission_checks_references() {
        let app = TestApp::new();
        let alice = app.user("alice").await;
        let problem = app.problem("sum").await;

        let missing_problem = SubmissionService::create_submission(
            &app.state,
            alice.id,
            Uuid::new_v4(),
            Language::Rust,
            "fn main() {}".to_string(),
        )
        .await;
        assert!(matches!(missing_problem, Err(AppError::NotFound(_))));

        let empty = SubmissionService::create_submission(
            &app.state,
            alice.id,
            problem.id,
            Language::Rust,
            "   ".to_string(),
        )
        .await;
        assert!(matches!(empty, Err(AppError::Validation(_))));
    }
}
