//! Shared fixtures for service tests
//!
//! Every fixture runs against a fresh [`MemoryGateway`] and a [`ManualClock`]
//! pinned to a known instant, so tests can move time explicitly.

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use uuid::Uuid;

use crate::config::Config;
use crate::db::MemoryGateway;
use crate::models::{
    Contest, Difficulty, NewContest, NewProblem, NewUser, Problem, Role, User,
};
use crate::services::{ContestService, ProblemService, UserService};
use crate::state::AppState;
use crate::utils::time::ManualClock;

/// Instant every test clock starts at
pub fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
}

pub struct TestApp {
    pub state: AppState,
    pub clock: Arc<ManualClock>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        let clock = Arc::new(ManualClock::new(epoch()));
        let state = AppState::new(Arc::new(MemoryGateway::new()), clock.clone(), config);
        Self { state, clock }
    }

    pub fn advance(&self, by: Duration) {
        self.clock.advance(by);
    }

    pub async fn user(&self, username: &str) -> User {
        UserService::register(
            &self.state,
            NewUser {
                username: username.to_string(),
                email: format!("{}@example.com", username),
                first_name: None,
                last_name: None,
                role: Some(Role::Participant),
            },
        )
        .await
        .unwrap()
    }

    /// Published problem authored by a fresh organizer
    pub async fn problem(&self, slug: &str) -> Problem {
        let author = self.user(&format!("author-{}", slug)).await;
        self.problem_by(author.id, slug, Difficulty::Easy).await
    }

    pub async fn problem_by(&self, author_id: Uuid, slug: &str, difficulty: Difficulty) -> Problem {
        let problem = ProblemService::create(
            &self.state,
            author_id,
            NewProblem {
                title: format!("Problem {}", slug),
                slug: slug.to_string(),
                description: "Read the input and print the answer".to_string(),
                constraints: None,
                difficulty,
            },
        )
        .await
        .unwrap();
        ProblemService::publish(&self.state, problem.id).await.unwrap()
    }

    /// Contest starting in one hour and lasting two
    pub async fn contest(&self, created_by: Uuid) -> Contest {
        let now = self.clock_now();
        ContestService::create(
            &self.state,
            created_by,
            NewContest {
                title: "Weekly Round".to_string(),
                description: None,
                start_time: now + Duration::hours(1),
                end_time: now + Duration::hours(3),
                duration_minutes: 120,
                is_public: Some(true),
                max_participants: None,
            },
        )
        .await
        .unwrap()
    }

    pub fn clock_now(&self) -> DateTime<Utc> {
        self.state.now()
    }
}
