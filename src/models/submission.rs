//! Submission model and judging lifecycle
//!
//! A submission starts `PENDING`, may move to `RUNNING`, and ends in exactly one
//! terminal verdict. `PENDING -> terminal` is allowed directly for verdicts that
//! never reach execution (for example a compilation failure).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Submission database model
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Submission {
    pub id: Uuid,
    pub user_id: Uuid,
    pub problem_id: Uuid,
    #[serde(skip_serializing)]
    pub code: String,
    #[sqlx(try_from = "String")]
    pub language: Language,
    #[sqlx(try_from = "String")]
    pub status: SubmissionStatus,
    /// Wall time in milliseconds
    pub execution_time_ms: Option<i32>,
    /// Peak memory in kilobytes
    pub memory_used_kb: Option<i32>,
    pub passed_test_cases: i32,
    pub total_test_cases: i32,
    pub error_message: Option<String>,
    pub submitted_at: DateTime<Utc>,
    pub judged_at: Option<DateTime<Utc>>,
}

impl Submission {
    /// New pending submission
    pub fn new(
        user_id: Uuid,
        problem_id: Uuid,
        language: Language,
        code: String,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            problem_id,
            code,
            language,
            status: SubmissionStatus::Pending,
            execution_time_ms: None,
            memory_used_kb: None,
            passed_test_cases: 0,
            total_test_cases: 0,
            error_message: None,
            submitted_at: now,
            judged_at: None,
        }
    }

    pub fn is_accepted(&self) -> bool {
        self.status.is_accepted()
    }

    pub fn is_pending(&self) -> bool {
        !self.status.is_terminal()
    }

    pub fn is_failed(&self) -> bool {
        self.status.is_failure()
    }

    /// Percentage of passed test cases, 0 when nothing ran
    pub fn success_rate(&self) -> f64 {
        if self.total_test_cases == 0 {
            return 0.0;
        }
        self.passed_test_cases as f64 * 100.0 / self.total_test_cases as f64
    }

    /// PENDING -> RUNNING
    pub fn start(&mut self) -> AppResult<()> {
        self.transition(SubmissionStatus::Running)
    }

    /// Move to a terminal verdict and copy the judge's report.
    ///
    /// The error message is only kept for failure verdicts.
    pub fn resolve(&mut self, report: &OutcomeReport, now: DateTime<Utc>) -> AppResult<()> {
        if !report.status.is_terminal() || !self.status.can_transition_to(report.status) {
            return Err(AppError::invalid_transition(self.status, report.status));
        }
        report.validate()?;
        self.status = report.status;

        self.passed_test_cases = report.passed_test_cases;
        self.total_test_cases = report.total_test_cases;
        self.execution_time_ms = report.execution_time_ms;
        self.memory_used_kb = report.memory_used_kb;
        self.error_message = if report.status.is_failure() {
            report.error_message.clone()
        } else {
            None
        };
        self.judged_at = Some(now);
        Ok(())
    }

    fn transition(&mut self, to: SubmissionStatus) -> AppResult<()> {
        if !self.status.can_transition_to(to) {
            return Err(AppError::invalid_transition(self.status, to));
        }
        self.status = to;
        Ok(())
    }
}

/// Submission lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubmissionStatus {
    Pending,
    Running,
    Accepted,
    WrongAnswer,
    TimeLimitExceeded,
    CompilationError,
    RuntimeError,
    MemoryLimitExceeded,
}

impl SubmissionStatus {
    /// All statuses, non-terminal first
    pub const ALL: [SubmissionStatus; 8] = [
        Self::Pending,
        Self::Running,
        Self::Accepted,
        Self::WrongAnswer,
        Self::TimeLimitExceeded,
        Self::CompilationError,
        Self::RuntimeError,
        Self::MemoryLimitExceeded,
    ];

    /// Get status as string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Running => "RUNNING",
            Self::Accepted => "ACCEPTED",
            Self::WrongAnswer => "WRONG_ANSWER",
            Self::TimeLimitExceeded => "TIME_LIMIT_EXCEEDED",
            Self::CompilationError => "COMPILATION_ERROR",
            Self::RuntimeError => "RUNTIME_ERROR",
            Self::MemoryLimitExceeded => "MEMORY_LIMIT_EXCEEDED",
        }
    }

    /// Parse status from string
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|status| status.as_str() == s)
    }

    /// Check if this is a final verdict (judging complete)
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending | Self::Running)
    }

    /// Check if this verdict means the solution was accepted
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }

    /// Terminal and not accepted
    pub fn is_failure(&self) -> bool {
        self.is_terminal() && !self.is_accepted()
    }

    /// Edges of the judging state machine
    pub fn can_transition_to(&self, to: SubmissionStatus) -> bool {
        match self {
            Self::Pending => to == Self::Running || to.is_terminal(),
            Self::Running => to.is_terminal(),
            _ => false,
        }
    }
}

impl std::fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Submission languages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Language {
    Java,
    Python,
    Javascript,
    Cpp,
    C,
    Csharp,
    Ruby,
    Go,
    Rust,
    Swift,
    Kotlin,
    Typescript,
}

impl Language {
    pub const ALL: [Language; 12] = [
        Self::Java,
        Self::Python,
        Self::Javascript,
        Self::Cpp,
        Self::C,
        Self::Csharp,
        Self::Ruby,
        Self::Go,
        Self::Rust,
        Self::Swift,
        Self::Kotlin,
        Self::Typescript,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Java => "JAVA",
            Self::Python => "PYTHON",
            Self::Javascript => "JAVASCRIPT",
            Self::Cpp => "CPP",
            Self::C => "C",
            Self::Csharp => "CSHARP",
            Self::Ruby => "RUBY",
            Self::Go => "GO",
            Self::Rust => "RUST",
            Self::Swift => "SWIFT",
            Self::Kotlin => "KOTLIN",
            Self::Typescript => "TYPESCRIPT",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|lang| lang.as_str() == s)
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What the judge reports when a submission resolves
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeReport {
    pub status: SubmissionStatus,
    pub passed_test_cases: i32,
    pub total_test_cases: i32,
    pub execution_time_ms: Option<i32>,
    pub memory_used_kb: Option<i32>,
    pub error_message: Option<String>,
    /// Caller-defined score used for `UserProgress::best_score`
    pub score: Option<i32>,
}

impl OutcomeReport {
    pub fn new(status: SubmissionStatus, passed: i32, total: i32) -> Self {
        Self {
            status,
            passed_test_cases: passed,
            total_test_cases: total,
            execution_time_ms: None,
            memory_used_kb: None,
            error_message: None,
            score: None,
        }
    }

    pub fn with_metrics(mut self, execution_time_ms: i32, memory_used_kb: i32) -> Self {
        self.execution_time_ms = Some(execution_time_ms);
        self.memory_used_kb = Some(memory_used_kb);
        self
    }

    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }

    pub fn with_score(mut self, score: i32) -> Self {
        self.score = Some(score);
        self
    }

    /// Counter and metric sanity checks
    pub fn validate(&self) -> AppResult<()> {
        if self.passed_test_cases < 0 || self.total_test_cases < 0 {
            return Err(AppError::Validation(
                "Test case counts cannot be negative".to_string(),
            ));
        }
        if self.passed_test_cases > self.total_test_cases {
            return Err(AppError::Validation(format!(
                "Passed test cases ({}) exceed total ({})",
                self.passed_test_cases, self.total_test_cases
            )));
        }
        if self.execution_time_ms.is_some_and(|t| t < 0)
            || self.memory_used_kb.is_some_and(|m| m < 0)
        {
            return Err(AppError::Validation(
                "Execution metrics cannot be negative".to_string(),
            ));
        }
        Ok(())
    }
}

/// Listing filter; unset fields do not restrict the result
#[derive(Debug, Clone, Default)]
pub struct SubmissionFilter {
    pub user_id: Option<Uuid>,
    pub problem_id: Option<Uuid>,
    pub status: Option<SubmissionStatus>,
    pub limit: Option<i64>,
}

impl SubmissionFilter {
    pub fn matches(&self, submission: &Submission) -> bool {
        self.user_id.is_none_or(|id| id == submission.user_id)
            && self.problem_id.is_none_or(|id| id == submission.problem_id)
            && self.status.is_none_or(|s| s == submission.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending() -> Submission {
        Submission::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            Language::Rust,
            "fn main() {}".to_string(),
            Utc::now(),
        )
    }

    #[test]
    fn test_transition_table() {
        use SubmissionStatus::*;

        assert!(Pending.can_transition_to(Running));
        assert!(Pending.can_transition_to(CompilationError));
        assert!(Running.can_transition_to(Accepted));
        assert!(!Running.can_transition_to(Running));
        assert!(!Running.can_transition_to(Pending));

        for terminal in SubmissionStatus::ALL.into_iter().filter(|s| s.is_terminal()) {
            for to in SubmissionStatus::ALL {
                assert!(!terminal.can_transition_to(to));
            }
        }
    }

    #[test]
    fn test_classification() {
        assert!(!SubmissionStatus::Pending.is_terminal());
        assert!(!SubmissionStatus::Running.is_terminal());
        assert!(SubmissionStatus::Accepted.is_accepted());
        assert!(!SubmissionStatus::Accepted.is_failure());
        assert!(SubmissionStatus::MemoryLimitExceeded.is_failure());
        assert_eq!(
            SubmissionStatus::parse("TIME_LIMIT_EXCEEDED"),
            Some(SubmissionStatus::TimeLimitExceeded)
        );
        assert_eq!(Language::parse("CSHARP"), Some(Language::Csharp));
    }

    #[test]
    fn test_resolve_sets_report_fields() {
        let mut submission = pending();
        submission.start().unwrap();

        let report = OutcomeReport::new(SubmissionStatus::WrongAnswer, 3, 4)
            .with_metrics(120, 2048)
            .with_error("expected 3, got 4");
        submission.resolve(&report, Utc::now()).unwrap();

        assert_eq!(submission.status, SubmissionStatus::WrongAnswer);
        assert_eq!(submission.success_rate(), 75.0);
        assert_eq!(submission.error_message.as_deref(), Some("expected 3, got 4"));
        assert!(submission.judged_at.is_some());
        assert!(submission.is_failed());
    }

    #[test]
    fn test_accepted_drops_error_message() {
        let mut submission = pending();
        let report = OutcomeReport::new(SubmissionStatus::Accepted, 2, 2).with_error("noise");
        submission.resolve(&report, Utc::now()).unwrap();
        assert!(submission.error_message.is_none());
        assert!(submission.is_accepted());
    }

    #[test]
    fn test_resolve_twice_is_invalid() {
        let mut submission = pending();
        let report = OutcomeReport::new(SubmissionStatus::Accepted, 1, 1);
        submission.resolve(&report, Utc::now()).unwrap();

        let again = submission.resolve(&report, Utc::now());
        assert!(matches!(again, Err(AppError::InvalidTransition { .. })));
        assert!(matches!(
            submission.start(),
            Err(AppError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_resolve_rejects_bad_reports() {
        let mut submission = pending();

        let non_terminal = OutcomeReport::new(SubmissionStatus::Running, 0, 0);
        assert!(matches!(
            submission.resolve(&non_terminal, Utc::now()),
            Err(AppError::InvalidTransition { .. })
        ));

        let too_many = OutcomeReport::new(SubmissionStatus::Accepted, 5, 4);
        assert!(matches!(
            submission.resolve(&too_many, Utc::now()),
            Err(AppError::Validation(_))
        ));
        assert_eq!(submission.status, SubmissionStatus::Pending);
    }

    #[test]
    fn test_serialized_form_hides_code() {
        let value = serde_json::to_value(pending()).unwrap();
        assert!(value.get("code").is_none());
        assert_eq!(value["status"], "PENDING");
        assert_eq!(value["language"], "RUST");
    }

    #[test]
    fn test_success_rate_without_cases() {
        assert_eq!(pending().success_rate(), 0.0);
    }
}
