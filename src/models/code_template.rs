//! Code template model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::Language;

/// Starter code shown for a problem in one language
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct CodeTemplate {
    pub id: Uuid,
    pub problem_id: Uuid,
    #[sqlx(try_from = "String")]
    pub language: Language,
    pub template_code: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CodeTemplate {
    pub fn new(
        problem_id: Uuid,
        language: Language,
        template_code: String,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            problem_id,
            language,
            template_code,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }
}
