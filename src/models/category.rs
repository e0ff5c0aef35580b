//! Category model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::constants::{
    MAX_CATEGORY_DESCRIPTION_LENGTH, MAX_CATEGORY_NAME_LENGTH, MIN_CATEGORY_NAME_LENGTH,
};

/// Problem category.
///
/// Membership lives in the problem/category relation only; use
/// `CategoryRepository::problems_in_category` for the problem side.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub icon_url: Option<String>,
    /// UI color, e.g. `#FF5733`
    pub color_code: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Category {
    pub fn new(input: NewCategory, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: input.name,
            description: input.description,
            icon_url: input.icon_url,
            color_code: input.color_code,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }

    pub fn apply_update(&mut self, update: CategoryUpdate) {
        if let Some(name) = update.name {
            self.name = name;
        }
        if let Some(description) = update.description {
            self.description = Some(description);
        }
        if let Some(icon_url) = update.icon_url {
            self.icon_url = Some(icon_url);
        }
        if let Some(color_code) = update.color_code {
            self.color_code = Some(color_code);
        }
        if let Some(is_active) = update.is_active {
            self.is_active = is_active;
        }
    }
}

/// Create category input
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewCategory {
    #[validate(length(min = MIN_CATEGORY_NAME_LENGTH, max = MAX_CATEGORY_NAME_LENGTH))]
    pub name: String,

    #[validate(length(max = MAX_CATEGORY_DESCRIPTION_LENGTH))]
    pub description: Option<String>,

    #[validate(url)]
    pub icon_url: Option<String>,

    pub color_code: Option<String>,
}

/// Update category input
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct CategoryUpdate {
    #[validate(length(min = MIN_CATEGORY_NAME_LENGTH, max = MAX_CATEGORY_NAME_LENGTH))]
    pub name: Option<String>,

    #[validate(length(max = MAX_CATEGORY_DESCRIPTION_LENGTH))]
    pub description: Option<String>,

    #[validate(url)]
    pub icon_url: Option<String>,

    pub color_code: Option<String>,

    pub is_active: Option<bool>,
}
