//! Database module
//!
//! This module handles database connections, migrations, the persistence
//! gateway and its two adapters (PostgreSQL and in-process memory).

pub mod connection;
pub mod gateway;
pub mod memory;
pub mod postgres;
pub mod repositories;

use sqlx::PgPool;

pub use connection::*;
pub use gateway::{Gateway, UnitOfWork};
pub use memory::MemoryGateway;
pub use postgres::PgGateway;
pub use repositories::*;

/// Run database migrations
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
