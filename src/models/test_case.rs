//! Test case model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Test case belonging to a single problem
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct TestCase {
    pub id: Uuid,
    pub problem_id: Uuid,
    pub input_data: String,
    pub expected_output: String,
    pub is_sample: bool,
    pub is_hidden: bool,
    pub explanation: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TestCase {
    pub fn new(problem_id: Uuid, input: NewTestCase, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            problem_id,
            input_data: input.input_data,
            expected_output: input.expected_output,
            is_sample: input.is_sample,
            is_hidden: input.is_hidden,
            explanation: input.explanation,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }

    /// Samples are always shown, even when flagged hidden
    pub fn is_visible_to_user(&self) -> bool {
        !self.is_hidden || self.is_sample
    }

    pub fn apply_update(&mut self, update: TestCaseUpdate) {
        if let Some(input_data) = update.input_data {
            self.input_data = input_data;
        }
        if let Some(expected_output) = update.expected_output {
            self.expected_output = expected_output;
        }
        if let Some(is_sample) = update.is_sample {
            self.is_sample = is_sample;
        }
        if let Some(is_hidden) = update.is_hidden {
            self.is_hidden = is_hidden;
        }
        if let Some(explanation) = update.explanation {
            self.explanation = Some(explanation);
        }
    }
}

/// Create test case input
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewTestCase {
    pub input_data: String,
    pub expected_output: String,
    pub is_sample: bool,
    pub is_hidden: bool,
    pub explanation: Option<String>,
}

/// Update test case input
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TestCaseUpdate {
    pub input_data: Option<String>,
    pub expected_output: Option<String>,
    pub is_sample: Option<bool>,
    pub is_hidden: Option<bool>,
    pub explanation: Option<String>,
}

/// Flag filter for listing the cases of a problem
#[derive(Debug, Clone, Copy, Default)]
pub struct TestCaseFilter {
    pub sample: Option<bool>,
    pub hidden: Option<bool>,
}

impl TestCaseFilter {
    pub fn matches(&self, case: &TestCase) -> bool {
        self.sample.is_none_or(|s| s == case.is_sample)
            && self.hidden.is_none_or(|h| h == case.is_hidden)
    }
}
