//! Application state management
//!
//! This module contains the shared state every service operation receives:
//! the persistence gateway, the clock, and the configuration.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::config::Config;
use crate::db::{Gateway, UnitOfWork};
use crate::error::AppResult;
use crate::utils::time::Clock;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

/// Inner state (wrapped in Arc for cheap cloning)
struct AppStateInner {
    /// Storage backend
    gateway: Arc<dyn Gateway>,

    /// Source of "now" for timestamps and contest status
    clock: Arc<dyn Clock>,

    /// Application configuration
    config: Config,
}

impl AppState {
    /// Create a new application state
    pub fn new(gateway: Arc<dyn Gateway>, clock: Arc<dyn Clock>, config: Config) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                gateway,
                clock,
                config,
            }),
        }
    }

    /// Open a unit of work on the gateway
    pub async fn begin(&self) -> AppResult<Box<dyn UnitOfWork>> {
        self.inner.gateway.begin().await
    }

    /// Current time according to the injected clock
    pub fn now(&self) -> DateTime<Utc> {
        self.inner.clock.now()
    }

    /// Get a reference to the configuration
    pub fn config(&self) -> &Config {
        &self.inner.config
    }
}
