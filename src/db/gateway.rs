//! Persistence gateway
//!
//! Services never talk to a database directly. They open a [`UnitOfWork`]
//! from a [`Gateway`], call repository methods on it, and commit. Reads made
//! through a unit of work observe that unit's own writes; dropping a unit of
//! work without committing discards everything it did.

use async_trait::async_trait;

use super::repositories::{
    CategoryRepository, CodeTemplateRepository, ContestRepository, ProblemRepository,
    ProgressRepository, SubmissionRepository, TestCaseRepository, UserRepository,
};
use crate::error::AppResult;

/// Entry point to a storage backend
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Open a new unit of work
    async fn begin(&self) -> AppResult<Box<dyn UnitOfWork>>;
}

/// One atomic batch of repository calls
#[async_trait]
pub trait UnitOfWork:
    UserRepository
    + ProblemRepository
    + CategoryRepository
    + TestCaseRepository
    + CodeTemplateRepository
    + SubmissionRepository
    + ProgressRepository
    + ContestRepository
    + Send
{
    /// Make every write of this unit visible to later units.
    ///
    /// Calling any repository method after a commit is an error.
    async fn commit(&mut self) -> AppResult<()>;
}
