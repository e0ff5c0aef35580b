//! In-process memory adapter
//!
//! A unit of work holds the single state lock for its whole lifetime and
//! edits a private copy of the state. Commit swaps the copy in; dropping the
//! unit of work throws it away. Units of work are therefore fully serialized,
//! which also makes [`ContestRepository::lock_contest`] a plain lookup.
//!
//! [`ContestRepository::lock_contest`]: crate::db::ContestRepository::lock_contest

mod store;

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use super::gateway::{Gateway, UnitOfWork};
use crate::error::{AppError, AppResult};
use crate::models::{
    Category, CodeTemplate, Contest, ContestParticipant, ContestProblem, ContestSolve, Problem,
    Submission, TestCase, User, UserProgress,
};

#[derive(Debug, Clone, Default)]
pub(crate) struct MemoryState {
    users: HashMap<Uuid, User>,
    problems: HashMap<Uuid, Problem>,
    categories: HashMap<Uuid, Category>,
    /// (problem_id, category_id)
    problem_categories: BTreeSet<(Uuid, Uuid)>,
    test_cases: HashMap<Uuid, TestCase>,
    code_templates: HashMap<Uuid, CodeTemplate>,
    submissions: HashMap<Uuid, Submission>,
    progress: HashMap<Uuid, UserProgress>,
    contests: HashMap<Uuid, Contest>,
    contest_problems: HashMap<Uuid, ContestProblem>,
    participants: HashMap<Uuid, ContestParticipant>,
    solves: HashMap<Uuid, ContestSolve>,
}

/// Gateway over a shared in-memory state
#[derive(Debug, Clone, Default)]
pub struct MemoryGateway {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Gateway for MemoryGateway {
    async fn begin(&self) -> AppResult<Box<dyn UnitOfWork>> {
        let guard = self.state.clone().lock_owned().await;
        let work = guard.clone();
        Ok(Box::new(MemoryUnitOfWork {
            guard: Some(guard),
            work,
        }))
    }
}

pub struct MemoryUnitOfWork {
    guard: Option<OwnedMutexGuard<MemoryState>>,
    work: MemoryState,
}

impl MemoryUnitOfWork {
    fn state(&mut self) -> AppResult<&mut MemoryState> {
        if self.guard.is_none() {
            return Err(AppError::Internal(anyhow::anyhow!(
                "unit of work already committed"
            )));
        }
        Ok(&mut self.work)
    }
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    async fn commit(&mut self) -> AppResult<()> {
        let mut guard = self.guard.take().ok_or_else(|| {
            AppError::Internal(anyhow::anyhow!("unit of work already committed"))
        })?;
        *guard = std::mem::take(&mut self.work);
        Ok(())
    }
}

/// Mirrors the error PostgreSQL reports for a unique constraint
fn duplicate(constraint: &str) -> AppError {
    AppError::Validation(format!("Duplicate value violates {}", constraint))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tokio_test::{assert_err, assert_ok};

    use crate::db::UserRepository;
    use crate::models::{NewUser, Role};

    fn user(username: &str) -> User {
        User::new(
            NewUser {
                username: username.to_string(),
                email: format!("{}@example.com", username),
                first_name: None,
                last_name: None,
                role: Some(Role::Participant),
            },
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn test_commit_publishes_writes() {
        let gateway = MemoryGateway::new();
        let alice = user("alice");

        let mut uow = gateway.begin().await.unwrap();
        uow.insert_user(&alice).await.unwrap();
        // A unit of work reads its own writes
        assert!(uow.find_user(alice.id).await.unwrap().is_some());
        assert_ok!(uow.commit().await);

        let mut uow = gateway.begin().await.unwrap();
        assert_eq!(uow.find_user(alice.id).await.unwrap(), Some(alice));
    }

    #[tokio::test]
    async fn test_drop_discards_writes() {
        let gateway = MemoryGateway::new();
        let alice = user("alice");

        {
            let mut uow = gateway.begin().await.unwrap();
            uow.insert_user(&alice).await.unwrap();
        }

        let mut uow = gateway.begin().await.unwrap();
        assert!(uow.find_user(alice.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_use_after_commit_fails() {
        let gateway = MemoryGateway::new();
        let mut uow = gateway.begin().await.unwrap();
        uow.commit().await.unwrap();

        assert_err!(uow.find_user(Uuid::new_v4()).await);
        assert_err!(uow.commit().await);
    }

    #[tokio::test]
    async fn test_unique_username() {
        let gateway = MemoryGateway::new();
        let mut uow = gateway.begin().await.unwrap();
        uow.insert_user(&user("alice")).await.unwrap();

        let mut clash = user("bob");
        clash.username = "alice".to_string();
        let err = uow.insert_user(&clash).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
