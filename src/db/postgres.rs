//! PostgreSQL adapter
//!
//! Every unit of work is one database transaction. Repository impls for
//! [`PgUnitOfWork`] live beside their traits in `repositories/`.

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool, Postgres, Transaction, postgres::PgQueryResult};
use tracing::debug;

use super::gateway::{Gateway, UnitOfWork};
use crate::error::{AppError, AppResult};

/// Gateway backed by a connection pool
#[derive(Debug, Clone)]
pub struct PgGateway {
    pool: PgPool,
}

impl PgGateway {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Gateway for PgGateway {
    async fn begin(&self) -> AppResult<Box<dyn UnitOfWork>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgUnitOfWork { tx: Some(tx) }))
    }
}

/// An open transaction; rolled back by sqlx when dropped uncommitted
pub struct PgUnitOfWork {
    tx: Option<Transaction<'static, Postgres>>,
}

impl PgUnitOfWork {
    pub(crate) fn conn(&mut self) -> AppResult<&mut PgConnection> {
        self.tx
            .as_deref_mut()
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("unit of work already committed")))
    }
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    async fn commit(&mut self) -> AppResult<()> {
        match self.tx.take() {
            Some(tx) => {
                tx.commit().await?;
                debug!("Transaction committed");
                Ok(())
            }
            None => Err(AppError::Internal(anyhow::anyhow!(
                "unit of work already committed"
            ))),
        }
    }
}

/// Turn "no row matched" on an UPDATE into `NotFound`
pub(crate) fn expect_one(result: PgQueryResult, what: &str) -> AppResult<()> {
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(what.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::{Config, DatabaseConfig};
    use crate::db::{ContestRepository, UserRepository, create_pool, run_migrations};
    use crate::models::{Language, NewUser, OutcomeReport, ProgressStatus, SubmissionStatus};
    use crate::services::{ContestService, ProblemService, ProgressService, SubmissionService, UserService};
    use crate::state::AppState;
    use crate::test_utils::epoch;
    use crate::utils::time::ManualClock;

    /// Connect to `DATABASE_URL` and bring the schema up to date
    async fn state() -> AppState {
        let config = Config {
            database: DatabaseConfig {
                url: std::env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
                ..Default::default()
            },
            ..Default::default()
        };
        let pool = create_pool(&config.database).await.unwrap();
        run_migrations(&pool).await.unwrap();
        AppState::new(
            Arc::new(PgGateway::new(pool)),
            Arc::new(ManualClock::new(epoch())),
            config,
        )
    }

    fn unique(prefix: &str) -> String {
        format!("{}-{}", prefix, &uuid::Uuid::new_v4().simple().to_string()[..12])
    }

    /// A fresh user with one problem of their own
    async fn seed(state: &AppState) -> (crate::models::User, crate::models::Problem) {
        let name = unique("race");
        let user = UserService::register(
            state,
            NewUser {
                username: name.clone(),
                email: format!("{}@example.com", name),
                first_name: None,
                last_name: None,
                role: None,
            },
        )
        .await
        .unwrap();
        let problem = ProblemService::create(
            state,
            user.id,
            crate::models::NewProblem {
                title: "Race".to_string(),
                slug: name,
                description: "Print the input".to_string(),
                constraints: None,
                difficulty: crate::models::Difficulty::Easy,
            },
        )
        .await
        .unwrap();
        (user, problem)
    }

    #[tokio::test]
    #[ignore = "requires DATABASE_URL"]
    async fn test_uncommitted_work_rolls_back() {
        let state = state().await;
        let username = unique("ghost");

        {
            let mut uow = state.begin().await.unwrap();
            let user = crate::models::User::new(
                NewUser {
                    username: username.clone(),
                    email: format!("{}@example.com", username),
                    first_name: None,
                    last_name: None,
                    role: None,
                },
                state.now(),
            );
            uow.insert_user(&user).await.unwrap();
            assert!(uow.find_user_by_username(&username).await.unwrap().is_some());
        }

        let mut uow = state.begin().await.unwrap();
        assert!(uow.find_user_by_username(&username).await.unwrap().is_none());
    }

    #[tokio::test]
    #[ignore = "requires DATABASE_URL"]
    async fn test_record_outcome_round_trip() {
        let state = state().await;
        let name = unique("pg");
        let user = UserService::register(
            &state,
            NewUser {
                username: name.clone(),
                email: format!("{}@example.com", name),
                first_name: None,
                last_name: None,
                role: None,
            },
        )
        .await
        .unwrap();
        let problem = ProblemService::create(
            &state,
            user.id,
            crate::models::NewProblem {
                title: "Echo".to_string(),
                slug: name.clone(),
                description: "Print the input".to_string(),
                constraints: None,
                difficulty: crate::models::Difficulty::Easy,
            },
        )
        .await
        .unwrap();

        let submission =
            SubmissionService::create_submission(&state, user.id, problem.id, Language::Go, "package main".into())
                .await
                .unwrap();
        let judged = SubmissionService::record_outcome(
            &state,
            submission.id,
            OutcomeReport::new(SubmissionStatus::Accepted, 2, 2).with_metrics(15, 512),
        )
        .await
        .unwrap();
        assert_eq!(SubmissionService::get(&state, submission.id).await.unwrap(), judged);

        let progress = ProgressService::get(&state, user.id, problem.id).await.unwrap().unwrap();
        assert_eq!(progress.status, ProgressStatus::Completed);
        assert_eq!(ProblemService::get(&state, problem.id).await.unwrap().acceptance_rate(), 100.0);

        // Duplicate slugs surface as validation errors with the constraint name
        let mut uow = state.begin().await.unwrap();
        let clash = crate::models::User::new(
            NewUser {
                username: name.clone(),
                email: format!("other-{}@example.com", name),
                first_name: None,
                last_name: None,
                role: None,
            },
            state.now(),
        );
        let err = uow.insert_user(&clash).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(msg) if msg.contains("users_username_key")));
    }

    #[tokio::test]
    #[ignore = "requires DATABASE_URL"]
    async fn test_contest_lock_and_cascade() {
        let state = state().await;
        let name = unique("host");
        let host = UserService::register(
            &state,
            NewUser {
                username: name.clone(),
                email: format!("{}@example.com", name),
                first_name: None,
                last_name: None,
                role: None,
            },
        )
        .await
        .unwrap();
        let now = state.now();
        let contest = ContestService::create(
            &state,
            host.id,
            crate::models::NewContest {
                title: "Pg Round".to_string(),
                description: None,
                start_time: now + chrono::Duration::hours(1),
                end_time: now + chrono::Duration::hours(2),
                duration_minutes: 60,
                is_public: Some(false),
                max_participants: None,
            },
        )
        .await
        .unwrap();
        ContestService::join(&state, contest.id, host.id).await.unwrap();

        let mut uow = state.begin().await.unwrap();
        assert_eq!(uow.lock_contest(contest.id).await.unwrap(), Some(contest.clone()));
        uow.commit().await.unwrap();

        ContestService::delete(&state, contest.id).await.unwrap();
        let mut uow = state.begin().await.unwrap();
        assert_eq!(uow.count_participants(contest.id).await.unwrap(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    #[ignore = "requires DATABASE_URL"]
    async fn test_concurrent_verdicts_keep_every_count() {
        const N: i32 = 20;
        let state = state().await;
        let (user, problem) = seed(&state).await;

        let mut ids = Vec::new();
        for _ in 0..N {
            let submission = SubmissionService::create_submission(
                &state,
                user.id,
                problem.id,
                Language::Python,
                "print(input())".into(),
            )
            .await
            .unwrap();
            ids.push(submission.id);
        }

        let handles = ids.into_iter().map(|id| {
            let state = state.clone();
            tokio::spawn(async move {
                SubmissionService::record_outcome(
                    &state,
                    id,
                    OutcomeReport::new(SubmissionStatus::Accepted, 1, 1),
                )
                .await
            })
        });
        for result in futures::future::join_all(handles).await {
            result.unwrap().unwrap();
        }

        let problem = ProblemService::get(&state, problem.id).await.unwrap();
        assert_eq!(problem.submission_count, N);
        assert_eq!(problem.accepted_count, N);
        let progress = ProgressService::get(&state, user.id, problem.id).await.unwrap().unwrap();
        assert_eq!(progress.attempts, N);
        assert_eq!(progress.status, ProgressStatus::Completed);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    #[ignore = "requires DATABASE_URL"]
    async fn test_racing_workers_resolve_a_submission_once() {
        let state = state().await;
        let (user, problem) = seed(&state).await;
        let submission = SubmissionService::create_submission(
            &state,
            user.id,
            problem.id,
            Language::Rust,
            "fn main() {}".into(),
        )
        .await
        .unwrap();
        let id = submission.id;

        let handles = (0..8).map(|_| {
            let state = state.clone();
            tokio::spawn(async move {
                SubmissionService::record_outcome(
                    &state,
                    id,
                    OutcomeReport::new(SubmissionStatus::Accepted, 1, 1),
                )
                .await
            })
        });
        let results: Vec<_> = futures::future::join_all(handles)
            .await
            .into_iter()
            .map(|joined| joined.unwrap())
            .collect();

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(
            results
                .iter()
                .filter_map(|r| r.as_ref().err())
                .all(|e| matches!(e, AppError::InvalidTransition { .. }))
        );

        let problem = ProblemService::get(&state, problem.id).await.unwrap();
        assert_eq!(problem.submission_count, 1);
        let progress = ProgressService::get(&state, user.id, problem.id).await.unwrap().unwrap();
        assert_eq!(progress.attempts, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    #[ignore = "requires DATABASE_URL"]
    async fn test_concurrent_likes_all_count() {
        let state = state().await;
        let (_, problem) = seed(&state).await;
        let id = problem.id;

        let handles = (0..10).map(|_| {
            let state = state.clone();
            tokio::spawn(async move { ProblemService::like(&state, id).await })
        });
        for result in futures::future::join_all(handles).await {
            result.unwrap().unwrap();
        }

        assert_eq!(ProblemService::get(&state, id).await.unwrap().likes, 10);
    }
}
