//! Application-wide constants
//!
//! This module contains all constant values used throughout the crate.
//! Constants are grouped by their purpose for better organization.

// =============================================================================
// LOGGING DEFAULTS
// =============================================================================

/// Default tracing filter when `RUST_LOG` is not set
pub const DEFAULT_LOG_FILTER: &str = "info";

// =============================================================================
// DATABASE DEFAULTS
// =============================================================================

/// Default maximum database connections in the pool
pub const DEFAULT_DATABASE_MAX_CONNECTIONS: u32 = 20;

/// Default timeout for acquiring a pooled connection, in seconds
pub const DEFAULT_DATABASE_ACQUIRE_TIMEOUT_SECS: u64 = 5;

// =============================================================================
// SCORING DEFAULTS
// =============================================================================

/// Points awarded for a contest problem when none are given
pub const DEFAULT_CONTEST_PROBLEM_POINTS: i32 = 100;

// =============================================================================
// SCHEDULER DEFAULTS
// =============================================================================

/// Interval between contest status synchronisations, in seconds
pub const DEFAULT_STATUS_SYNC_INTERVAL_SECS: u64 = 30;

// =============================================================================
// VALIDATION
// =============================================================================

/// Username minimum length
pub const MIN_USERNAME_LENGTH: u64 = 3;

/// Username maximum length
pub const MAX_USERNAME_LENGTH: u64 = 32;

/// Maximum problem title length
pub const MAX_PROBLEM_TITLE_LENGTH: u64 = 256;

/// Maximum problem description length
pub const MAX_PROBLEM_DESCRIPTION_LENGTH: u64 = 65535;

/// Maximum problem slug length
pub const MAX_SLUG_LENGTH: u64 = 128;

/// Category name length bounds
pub const MIN_CATEGORY_NAME_LENGTH: u64 = 2;
pub const MAX_CATEGORY_NAME_LENGTH: u64 = 50;

/// Maximum category description length
pub const MAX_CATEGORY_DESCRIPTION_LENGTH: u64 = 255;

/// Maximum contest title length
pub const MAX_CONTEST_TITLE_LENGTH: u64 = 256;

/// Maximum source code size in bytes (1 MB)
pub const MAX_SOURCE_CODE_SIZE: usize = 1024 * 1024;

/// Maximum test case input size in bytes (10 MB)
pub const MAX_TEST_CASE_INPUT_SIZE: usize = 10 * 1024 * 1024;

/// Maximum test case output size in bytes (10 MB)
pub const MAX_TEST_CASE_OUTPUT_SIZE: usize = 10 * 1024 * 1024;

// =============================================================================
// PAGINATION
// =============================================================================

/// Default number of rows returned by leaderboard style queries
pub const DEFAULT_LEADERBOARD_SIZE: i64 = 10;

/// Maximum number of pending submissions handed out at once
pub const MAX_PENDING_BATCH: i64 = 100;
