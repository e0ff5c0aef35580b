//! Contest service
//!
//! Every operation that changes scores or the participant set first takes the
//! contest lock, then re-ranks the whole contest before committing.

use tracing::{debug, info};
use uuid::Uuid;
use validator::Validate;

use crate::{
    db::{ContestRepository, ProblemRepository, SubmissionRepository, UnitOfWork, UserRepository},
    error::{AppError, AppResult},
    models::{
        assign_ranks, Contest, ContestFilter, ContestParticipant, ContestProblem, ContestSolve,
        ContestStatus, NewContest, SubmissionStatus,
    },
    state::AppState,
};

/// Contest service for business logic
pub struct ContestService;

impl ContestService {
    /// Create a contest; its status is derived from the clock
    pub async fn create(state: &AppState, created_by: Uuid, input: NewContest) -> AppResult<Contest> {
        input.validate()?;

        let mut uow = state.begin().await?;
        if uow.find_user(created_by).await?.is_none() {
            return Err(AppError::NotFound(format!("User {} not found", created_by)));
        }

        let contest = Contest::new(input, created_by, state.now());
        uow.insert_contest(&contest).await?;
        uow.commit().await?;

        info!(contest_id = %contest.id, status = %contest.status, "Contest created");
        Ok(contest)
    }

    pub async fn get(state: &AppState, id: Uuid) -> AppResult<Contest> {
        let mut uow = state.begin().await?;
        uow.find_contest(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Contest {} not found", id)))
    }

    /// Contests matching `filter`, earliest start first
    pub async fn list(state: &AppState, filter: &ContestFilter) -> AppResult<Vec<Contest>> {
        let mut uow = state.begin().await?;
        uow.list_contests(filter).await
    }

    /// Register `user_id` for the contest
    pub async fn join(state: &AppState, contest_id: Uuid, user_id: Uuid) -> AppResult<ContestParticipant> {
        let now = state.now();
        let mut uow = state.begin().await?;
        let contest = Self::lock(uow.as_mut(), contest_id).await?;

        if !contest.accepts_participants_at(now) {
            return Err(AppError::Validation(format!(
                "Contest is {} and not open for registration",
                contest.status_at(now)
            )));
        }
        if uow.find_user(user_id).await?.is_none() {
            return Err(AppError::NotFound(format!("User {} not found", user_id)));
        }
        if uow.find_participant(contest_id, user_id).await?.is_some() {
            return Err(AppError::Validation(
                "Already registered for this contest".to_string(),
            ));
        }
        if !contest.has_room_for(uow.count_participants(contest_id).await?) {
            return Err(AppError::Validation("Contest is full".to_string()));
        }

        let participant = ContestParticipant::new(contest_id, user_id, now);
        uow.insert_participant(&participant).await?;
        let ranked = Self::rerank(uow.as_mut(), contest_id).await?;
        uow.commit().await?;

        info!(contest_id = %contest_id, user_id = %user_id, "Joined contest");
        ranked
            .into_iter()
            .find(|p| p.id == participant.id)
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Participant vanished after insert")))
    }

    /// Withdraw before the contest starts
    pub async fn leave(state: &AppState, contest_id: Uuid, user_id: Uuid) -> AppResult<()> {
        let now = state.now();
        let mut uow = state.begin().await?;
        let contest = Self::lock(uow.as_mut(), contest_id).await?;

        let participant = uow
            .find_participant(contest_id, user_id)
            .await?
            .ok_or(AppError::NotAParticipant { contest_id, user_id })?;

        if contest.status_at(now) != ContestStatus::Upcoming {
            return Err(AppError::Validation(
                "Cannot leave a contest after it has started".to_string(),
            ));
        }

        uow.delete_participant(participant.id).await?;
        Self::rerank(uow.as_mut(), contest_id).await?;
        uow.commit().await?;

        info!(contest_id = %contest_id, user_id = %user_id, "Left contest");
        Ok(())
    }

    /// Attach a problem worth `points`, or the configured default
    pub async fn add_problem(
        state: &AppState,
        contest_id: Uuid,
        problem_id: Uuid,
        points: Option<i32>,
    ) -> AppResult<ContestProblem> {
        let points = points.unwrap_or(state.config().scoring.default_contest_points);
        if points <= 0 {
            return Err(AppError::Validation("Points must be positive".to_string()));
        }

        let mut uow = state.begin().await?;
        Self::lock(uow.as_mut(), contest_id).await?;
        if uow.find_problem(problem_id).await?.is_none() {
            return Err(AppError::NotFound(format!("Problem {} not found", problem_id)));
        }
        if uow
            .find_contest_problem_by_problem(contest_id, problem_id)
            .await?
            .is_some()
        {
            return Err(AppError::Validation(
                "Problem is already part of this contest".to_string(),
            ));
        }

        let contest_problem = ContestProblem::new(contest_id, problem_id, points);
        uow.insert_contest_problem(&contest_problem).await?;
        uow.commit().await?;

        debug!(contest_id = %contest_id, problem_id = %problem_id, points, "Contest problem added");
        Ok(contest_problem)
    }

    /// Detach a problem and take back the points it awarded
    pub async fn remove_problem(
        state: &AppState,
        contest_id: Uuid,
        contest_problem_id: Uuid,
    ) -> AppResult<Vec<ContestParticipant>> {
        let mut uow = state.begin().await?;
        Self::lock(uow.as_mut(), contest_id).await?;
        let contest_problem = Self::contest_problem(uow.as_mut(), contest_id, contest_problem_id).await?;

        for mut participant in uow.ranked_participants(contest_id).await? {
            if let Some(solve) = uow.find_solve(participant.id, contest_problem.id).await? {
                participant.score -= solve.points_awarded;
                uow.update_participant(&participant).await?;
            }
        }
        uow.delete_contest_problem(contest_problem.id).await?;

        let ranked = Self::rerank(uow.as_mut(), contest_id).await?;
        uow.commit().await?;

        Ok(ranked)
    }

    pub async fn problems(state: &AppState, contest_id: Uuid) -> AppResult<Vec<ContestProblem>> {
        let mut uow = state.begin().await?;
        uow.contest_problems(contest_id).await
    }

    /// Apply one judged outcome to the contest standings.
    ///
    /// Only the first ACCEPTED outcome per participant and problem scores.
    /// Returns every participant in rank order.
    pub async fn record_contest_submission(
        state: &AppState,
        contest_id: Uuid,
        user_id: Uuid,
        contest_problem_id: Uuid,
        outcome: SubmissionStatus,
    ) -> AppResult<Vec<ContestParticipant>> {
        let now = state.now();
        let mut uow = state.begin().await?;
        Self::lock(uow.as_mut(), contest_id).await?;
        let contest_problem = Self::contest_problem(uow.as_mut(), contest_id, contest_problem_id).await?;

        let mut participant = uow
            .find_participant(contest_id, user_id)
            .await?
            .ok_or(AppError::NotAParticipant { contest_id, user_id })?;

        if outcome.is_accepted()
            && uow.find_solve(participant.id, contest_problem.id).await?.is_none()
        {
            let solve = ContestSolve::new(participant.id, contest_problem.id, contest_problem.points, now);
            uow.insert_solve(&solve).await?;
            participant.score += contest_problem.points;
            uow.update_participant(&participant).await?;

            info!(
                contest_id = %contest_id,
                user_id = %user_id,
                points = contest_problem.points,
                score = participant.score,
                "Contest problem solved"
            );
        }

        let ranked = Self::rerank(uow.as_mut(), contest_id).await?;
        uow.commit().await?;

        Ok(ranked)
    }

    /// Score a judged submission against the contest problem for its problem
    pub async fn record_submission_in_contest(
        state: &AppState,
        contest_id: Uuid,
        submission_id: Uuid,
    ) -> AppResult<Vec<ContestParticipant>> {
        let (user_id, contest_problem_id, status) = {
            let mut uow = state.begin().await?;
            let submission = uow
                .find_submission(submission_id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Submission {} not found", submission_id)))?;
            if !submission.status.is_terminal() {
                return Err(AppError::Validation(format!(
                    "Submission {} has not been judged yet",
                    submission_id
                )));
            }
            let contest_problem = uow
                .find_contest_problem_by_problem(contest_id, submission.problem_id)
                .await?
                .ok_or_else(|| {
                    AppError::NotFound(format!(
                        "Problem {} is not part of contest {}",
                        submission.problem_id, contest_id
                    ))
                })?;
            (submission.user_id, contest_problem.id, submission.status)
        };

        Self::record_contest_submission(state, contest_id, user_id, contest_problem_id, status).await
    }

    /// Participants in rank order
    pub async fn leaderboard(state: &AppState, contest_id: Uuid) -> AppResult<Vec<ContestParticipant>> {
        let mut uow = state.begin().await?;
        if uow.find_contest(contest_id).await?.is_none() {
            return Err(AppError::NotFound(format!("Contest {} not found", contest_id)));
        }
        uow.ranked_participants(contest_id).await
    }

    pub async fn cancel(state: &AppState, contest_id: Uuid) -> AppResult<Contest> {
        let now = state.now();
        let mut uow = state.begin().await?;
        let mut contest = Self::lock(uow.as_mut(), contest_id).await?;

        contest.cancel(now)?;
        contest.touch(now);
        uow.update_contest(&contest).await?;
        uow.commit().await?;

        info!(contest_id = %contest_id, "Contest cancelled");
        Ok(contest)
    }

    /// Rewrite stored statuses that disagree with the clock; returns how many changed
    pub async fn refresh_statuses(state: &AppState) -> AppResult<usize> {
        let now = state.now();
        let mut uow = state.begin().await?;

        let mut changed = 0;
        for mut contest in uow.list_contests(&ContestFilter::default()).await? {
            if contest.sync_status(now) {
                contest.touch(now);
                uow.update_contest(&contest).await?;
                debug!(contest_id = %contest.id, status = %contest.status, "Contest status synced");
                changed += 1;
            }
        }
        uow.commit().await?;

        if changed > 0 {
            info!(changed, "Contest statuses refreshed");
        }
        Ok(changed)
    }

    /// Delete a contest with its problems, participants and solves
    pub async fn delete(state: &AppState, contest_id: Uuid) -> AppResult<()> {
        let mut uow = state.begin().await?;
        if !uow.delete_contest(contest_id).await? {
            return Err(AppError::NotFound(format!("Contest {} not found", contest_id)));
        }
        uow.commit().await?;

        info!(contest_id = %contest_id, "Contest deleted");
        Ok(())
    }

    async fn lock(uow: &mut dyn UnitOfWork, contest_id: Uuid) -> AppResult<Contest> {
        uow.lock_contest(contest_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Contest {} not found", contest_id)))
    }

    /// A contest problem that must belong to `contest_id`
    async fn contest_problem(
        uow: &mut dyn UnitOfWork,
        contest_id: Uuid,
        contest_problem_id: Uuid,
    ) -> AppResult<ContestProblem> {
        uow.find_contest_problem(contest_problem_id)
            .await?
            .filter(|cp| cp.contest_id == contest_id)
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "Contest problem {} not found in contest {}",
                    contest_problem_id, contest_id
                ))
            })
    }

    /// Recompute ranks and store the ones that moved
    async fn rerank(
        uow: &mut dyn UnitOfWork,
        contest_id: Uuid,
    ) -> AppResult<Vec<ContestParticipant>> {
        let mut participants = uow.ranked_participants(contest_id).await?;
        for participant in assign_ranks(&mut participants) {
            uow.update_participant(&participant).await?;
        }
        Ok(participants)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Language, OutcomeReport};
    use crate::services::SubmissionService;
    use crate::test_utils::TestApp;
    use chrono::Duration;

    #[tokio::test]
    async fn test_accepted_twice_scores_once() {
        let app = TestApp::new();
        let alice = app.user("alice").await;
        let contest = app.contest(alice.id).await;
        let problem = app.problem("sum").await;
        let cp = ContestService::add_problem(&app.state, contest.id, problem.id, None)
            .await
            .unwrap();
        assert_eq!(cp.points, 100);
        ContestService::join(&app.state, contest.id, alice.id).await.unwrap();
        app.advance(Duration::minutes(90));

        for _ in 0..2 {
            ContestService::record_contest_submission(
                &app.state,
                contest.id,
                alice.id,
                cp.id,
                SubmissionStatus::Accepted,
            )
            .await
            .unwrap();
        }

        let board = ContestService::leaderboard(&app.state, contest.id).await.unwrap();
        assert_eq!(board.len(), 1);
        assert_eq!(board[0].score, 100);
        assert_eq!(board[0].rank, Some(1));
    }

    #[tokio::test]
    async fn test_ties_break_on_join_time() {
        let app = TestApp::new();
        let organizer = app.user("organizer").await;
        let alice = app.user("alice").await;
        let bob = app.user("bob").await;
        let carol = app.user("carol").await;
        let contest = app.contest(organizer.id).await;
        let problem = app.problem("sum").await;
        let cp = ContestService::add_problem(&app.state, contest.id, problem.id, Some(50))
            .await
            .unwrap();

        for user in [&alice, &bob, &carol] {
            ContestService::join(&app.state, contest.id, user.id).await.unwrap();
            app.advance(Duration::minutes(1));
        }

        for user in [&bob, &alice] {
            ContestService::record_contest_submission(
                &app.state,
                contest.id,
                user.id,
                cp.id,
                SubmissionStatus::Accepted,
            )
            .await
            .unwrap();
        }
        let ranked = ContestService::record_contest_submission(
            &app.state,
            contest.id,
            carol.id,
            cp.id,
            SubmissionStatus::WrongAnswer,
        )
        .await
        .unwrap();

        let order: Vec<(Uuid, i32, Option<i32>)> =
            ranked.iter().map(|p| (p.user_id, p.score, p.rank)).collect();
        assert_eq!(
            order,
            vec![
                (alice.id, 50, Some(1)),
                (bob.id, 50, Some(2)),
                (carol.id, 0, Some(3)),
            ]
        );
    }

    #[tokio::test]
    async fn test_scoring_requires_participant_and_own_problem() {
        let app = TestApp::new();
        let alice = app.user("alice").await;
        let contest = app.contest(alice.id).await;
        let other = app.contest(alice.id).await;
        let problem = app.problem("sum").await;
        let cp = ContestService::add_problem(&app.state, contest.id, problem.id, None)
            .await
            .unwrap();

        let result = ContestService::record_contest_submission(
            &app.state,
            contest.id,
            alice.id,
            cp.id,
            SubmissionStatus::Accepted,
        )
        .await;
        assert!(matches!(result, Err(AppError::NotAParticipant { .. })));

        ContestService::join(&app.state, other.id, alice.id).await.unwrap();
        let result = ContestService::record_contest_submission(
            &app.state,
            other.id,
            alice.id,
            cp.id,
            SubmissionStatus::Accepted,
        )
        .await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_join_rules() {
        let app = TestApp::new();
        let organizer = app.user("organizer").await;
        let alice = app.user("alice").await;
        let bob = app.user("bob").await;
        let now = app.clock_now();
        let contest = ContestService::create(
            &app.state,
            organizer.id,
            NewContest {
                title: "Tiny Round".to_string(),
                description: None,
                start_time: now + Duration::hours(1),
                end_time: now + Duration::hours(2),
                duration_minutes: 60,
                is_public: None,
                max_participants: Some(1),
            },
        )
        .await
        .unwrap();

        let joined = ContestService::join(&app.state, contest.id, alice.id).await.unwrap();
        assert_eq!(joined.joined_at, now);
        assert_eq!(joined.rank, Some(1));

        assert!(matches!(
            ContestService::join(&app.state, contest.id, alice.id).await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            ContestService::join(&app.state, contest.id, bob.id).await,
            Err(AppError::Validation(msg)) if msg == "Contest is full"
        ));

        ContestService::leave(&app.state, contest.id, alice.id).await.unwrap();
        ContestService::join(&app.state, contest.id, bob.id).await.unwrap();

        app.advance(Duration::minutes(90));
        assert!(matches!(
            ContestService::leave(&app.state, contest.id, bob.id).await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            ContestService::leave(&app.state, contest.id, alice.id).await,
            Err(AppError::NotAParticipant { .. })
        ));
    }

    #[tokio::test]
    async fn test_cancelled_contest_rejects_joins() {
        let app = TestApp::new();
        let organizer = app.user("organizer").await;
        let alice = app.user("alice").await;
        let contest = app.contest(organizer.id).await;

        let cancelled = ContestService::cancel(&app.state, contest.id).await.unwrap();
        assert_eq!(cancelled.status, ContestStatus::Cancelled);
        assert!(matches!(
            ContestService::join(&app.state, contest.id, alice.id).await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_refresh_statuses_follows_clock() {
        let app = TestApp::new();
        let organizer = app.user("organizer").await;
        let contest = app.contest(organizer.id).await;
        assert_eq!(contest.status, ContestStatus::Upcoming);

        assert_eq!(ContestService::refresh_statuses(&app.state).await.unwrap(), 0);
        app.advance(Duration::hours(2));
        assert_eq!(ContestService::refresh_statuses(&app.state).await.unwrap(), 1);
        assert_eq!(
            ContestService::get(&app.state, contest.id).await.unwrap().status,
            ContestStatus::Running
        );
        app.advance(Duration::hours(2));
        ContestService::refresh_statuses(&app.state).await.unwrap();
        assert_eq!(
            ContestService::get(&app.state, contest.id).await.unwrap().status,
            ContestStatus::Completed
        );
    }

    #[tokio::test]
    async fn test_remove_problem_takes_points_back() {
        let app = TestApp::new();
        let organizer = app.user("organizer").await;
        let alice = app.user("alice").await;
        let contest = app.contest(organizer.id).await;
        let first = app.problem("first").await;
        let second = app.problem("second").await;
        let cp1 = ContestService::add_problem(&app.state, contest.id, first.id, Some(100))
            .await
            .unwrap();
        let cp2 = ContestService::add_problem(&app.state, contest.id, second.id, Some(30))
            .await
            .unwrap();
        assert!(matches!(
            ContestService::add_problem(&app.state, contest.id, first.id, None).await,
            Err(AppError::Validation(_))
        ));

        ContestService::join(&app.state, contest.id, alice.id).await.unwrap();
        for cp in [&cp1, &cp2] {
            ContestService::record_contest_submission(
                &app.state,
                contest.id,
                alice.id,
                cp.id,
                SubmissionStatus::Accepted,
            )
            .await
            .unwrap();
        }

        let ranked = ContestService::remove_problem(&app.state, contest.id, cp1.id)
            .await
            .unwrap();
        assert_eq!(ranked[0].score, 30);
        assert_eq!(ContestService::problems(&app.state, contest.id).await.unwrap(), vec![cp2]);
    }

    #[tokio::test]
    async fn test_record_judged_submission() {
        let app = TestApp::new();
        let organizer = app.user("organizer").await;
        let alice = app.user("alice").await;
        let contest = app.contest(organizer.id).await;
        let problem = app.problem("sum").await;
        ContestService::add_problem(&app.state, contest.id, problem.id, Some(70))
            .await
            .unwrap();
        ContestService::join(&app.state, contest.id, alice.id).await.unwrap();

        let submission = SubmissionService::create_submission(
            &app.state,
            alice.id,
            problem.id,
            Language::Cpp,
            "int main() { return 0; }".to_string(),
        )
        .await
        .unwrap();

        assert!(matches!(
            ContestService::record_submission_in_contest(&app.state, contest.id, submission.id).await,
            Err(AppError::Validation(_))
        ));

        SubmissionService::record_outcome(
            &app.state,
            submission.id,
            OutcomeReport::new(SubmissionStatus::Accepted, 3, 3),
        )
        .await
        .unwrap();
        let ranked = ContestService::record_submission_in_contest(&app.state, contest.id, submission.id)
            .await
            .unwrap();
        assert_eq!(ranked[0].score, 70);
    }

    #[tokio::test]
    async fn test_concurrent_scoring_awards_once() {
        let app = TestApp::new();
        let organizer = app.user("organizer").await;
        let contest = app.contest(organizer.id).await;
        let problem = app.problem("sum").await;
        let cp = ContestService::add_problem(&app.state, contest.id, problem.id, None)
            .await
            .unwrap();

        let mut users = Vec::new();
        for name in ["ann", "ben", "cat", "dan"] {
            let user = app.user(name).await;
            ContestService::join(&app.state, contest.id, user.id).await.unwrap();
            app.advance(Duration::seconds(1));
            users.push(user);
        }

        let attempts = users.iter().chain(users.iter()).map(|user| {
            ContestService::record_contest_submission(
                &app.state,
                contest.id,
                user.id,
                cp.id,
                SubmissionStatus::Accepted,
            )
        });
        for result in futures::future::join_all(attempts).await {
            result.unwrap();
        }

        let board = ContestService::leaderboard(&app.state, contest.id).await.unwrap();
        assert!(board.iter().all(|p| p.score == 100));
        let ranks: Vec<Option<i32>> = board.iter().map(|p| p.rank).collect();
        assert_eq!(ranks, vec![Some(1), Some(2), Some(3), Some(4)]);
        assert_eq!(board[0].user_id, users[0].id);
    }

    #[tokio::test]
    async fn test_delete_contest() {
        let app = TestApp::new();
        let organizer = app.user("organizer").await;
        let contest = app.contest(organizer.id).await;
        ContestService::join(&app.state, contest.id, organizer.id).await.unwrap();

        ContestService::delete(&app.state, contest.id).await.unwrap();
        assert!(matches!(
            ContestService::leaderboard(&app.state, contest.id).await,
            Err(AppError::NotFound(_))
        ));
    }
}
