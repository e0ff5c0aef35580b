//! User model

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::constants::{MAX_USERNAME_LENGTH, MIN_USERNAME_LENGTH};

/// Platform user
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    #[sqlx(try_from = "String")]
    pub role: Role,
    pub reputation: i32,
    pub streak_count: i32,
    pub last_activity_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Build a fresh user from validated registration input
    pub fn new(input: NewUser, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            username: input.username,
            email: input.email.to_lowercase(),
            first_name: input.first_name,
            last_name: input.last_name,
            role: input.role.unwrap_or_default(),
            reputation: 0,
            streak_count: 0,
            last_activity_date: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }

    pub fn apply_update(&mut self, update: UserUpdate) {
        if let Some(email) = update.email {
            self.email = email.to_lowercase();
        }
        if let Some(first_name) = update.first_name {
            self.first_name = Some(first_name);
        }
        if let Some(last_name) = update.last_name {
            self.last_name = Some(last_name);
        }
        if let Some(role) = update.role {
            self.role = role;
        }
    }

    /// Register activity on `day` and maintain the daily streak.
    ///
    /// Returns `true` when the streak or the activity date changed.
    pub fn record_activity(&mut self, day: NaiveDate) -> bool {
        match self.last_activity_date {
            Some(last) if last == day => false,
            // Out-of-order reports never move the activity date backwards
            Some(last) if last > day => false,
            Some(last) if last.succ_opt() == Some(day) => {
                self.streak_count += 1;
                self.last_activity_date = Some(day);
                true
            }
            _ => {
                self.streak_count = 1;
                self.last_activity_date = Some(day);
                true
            }
        }
    }
}

/// User role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    #[default]
    Participant,
    Organizer,
    Admin,
}

impl Role {
    /// Get role as string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Participant => "PARTICIPANT",
            Self::Organizer => "ORGANIZER",
            Self::Admin => "ADMIN",
        }
    }

    /// Parse role from string
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PARTICIPANT" => Some(Self::Participant),
            "ORGANIZER" => Some(Self::Organizer),
            "ADMIN" => Some(Self::Admin),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Registration input
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewUser {
    #[validate(length(min = MIN_USERNAME_LENGTH, max = MAX_USERNAME_LENGTH))]
    pub username: String,

    #[validate(email)]
    pub email: String,

    #[validate(length(max = 64))]
    pub first_name: Option<String>,

    #[validate(length(max = 64))]
    pub last_name: Option<String>,

    pub role: Option<Role>,
}

/// Profile changes; `None` leaves a field untouched
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UserUpdate {
    #[validate(email)]
    pub email: Option<String>,

    #[validate(length(max = 64))]
    pub first_name: Option<String>,

    #[validate(length(max = 64))]
    pub last_name: Option<String>,

    pub role: Option<Role>,
}
