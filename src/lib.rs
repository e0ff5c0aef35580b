//! CodeForge - competitive programming domain core
//!
//! This library holds the domain model and business rules of the CodeForge
//! platform: users, problems, test cases, code templates, categories,
//! submissions, per-user progress and contests.
//!
//! # Features
//!
//! - Submission lifecycle with a closed verdict state machine
//! - Problem counters, user progress and daily streaks updated atomically
//! - Contest scoring with idempotent awards and deterministic ranks
//! - Many-to-many categories backed by a single relation
//!
//! # Architecture
//!
//! The crate follows a layered architecture:
//! - **Services**: Business logic
//! - **Gateway**: Units of work over PostgreSQL or an in-process store
//! - **Repositories**: Storage access per entity
//! - **Models**: Domain models and invariants

pub mod config;
pub mod constants;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod state;
pub mod utils;

#[cfg(test)]
mod test_utils;

// Re-export commonly used types
pub use config::Config;
pub use error::{AppError, AppResult};
pub use state::AppState;
