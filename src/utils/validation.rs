//! Input validation utilities

use std::sync::LazyLock;

use regex::Regex;

use crate::constants::{MAX_SOURCE_CODE_SIZE, MAX_TEST_CASE_INPUT_SIZE, MAX_TEST_CASE_OUTPUT_SIZE};
use crate::error::{AppError, AppResult};

static SLUG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").expect("valid slug regex"));

static COLOR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#[0-9A-Fa-f]{6}$").expect("valid color regex"));

/// Validate username format
pub fn validate_username(username: &str) -> Result<(), &'static str> {
    if username.len() < 3 {
        return Err("Username must be at least 3 characters");
    }
    if username.len() > 32 {
        return Err("Username must be at most 32 characters");
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err("Username can only contain letters, numbers, underscores, and hyphens");
    }
    if !username.chars().next().is_some_and(|c| c.is_ascii_alphabetic()) {
        return Err("Username must start with a letter");
    }
    Ok(())
}

/// Validate problem slug (`two-sum`, `lru-cache-2`)
pub fn validate_slug(slug: &str) -> Result<(), &'static str> {
    if SLUG_RE.is_match(slug) {
        Ok(())
    } else {
        Err("Slug may only contain lowercase letters, digits, and single hyphens")
    }
}

/// Validate a `#RRGGBB` color code
pub fn validate_color_code(color: &str) -> Result<(), &'static str> {
    if COLOR_RE.is_match(color) {
        Ok(())
    } else {
        Err("Color code must look like #RRGGBB")
    }
}

/// Validate source code size
pub fn validate_source_code(code: &str) -> Result<(), &'static str> {
    if code.trim().is_empty() {
        return Err("Source code cannot be empty");
    }
    if code.len() > MAX_SOURCE_CODE_SIZE {
        return Err("Source code exceeds maximum size of 1MB");
    }
    Ok(())
}

/// Validate test case payload sizes
pub fn validate_test_case_data(input: &str, expected_output: &str) -> Result<(), &'static str> {
    if input.len() > MAX_TEST_CASE_INPUT_SIZE {
        return Err("Test case input exceeds maximum size of 10MB");
    }
    if expected_output.len() > MAX_TEST_CASE_OUTPUT_SIZE {
        return Err("Test case output exceeds maximum size of 10MB");
    }
    Ok(())
}

/// Reject blank required text
pub fn require_non_blank(field: &str, value: &str) -> AppResult<()> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{} cannot be blank", field)));
    }
    Ok(())
}

/// Lift a `&'static str` check into the crate error type
pub fn check(result: Result<(), &'static str>) -> AppResult<()> {
    result.map_err(|msg| AppError::Validation(msg.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_username() {
        assert!(validate_username("alice").is_ok());
        assert!(validate_username("Alice_123").is_ok());
        assert!(validate_username("ab").is_err()); // Too short
        assert!(validate_username("123abc").is_err()); // Starts with number
        assert!(validate_username("user@name").is_err()); // Invalid character
    }

    #[test]
    fn test_validate_slug() {
        assert!(validate_slug("two-sum").is_ok());
        assert!(validate_slug("lru-cache-2").is_ok());
        assert!(validate_slug("Two-Sum").is_err());
        assert!(validate_slug("two--sum").is_err());
        assert!(validate_slug("-two").is_err());
        assert!(validate_slug("").is_err());
    }

    #[test]
    fn test_validate_color_code() {
        assert!(validate_color_code("#FF5733").is_ok());
        assert!(validate_color_code("#ff5733").is_ok());
        assert!(validate_color_code("FF5733").is_err());
        assert!(validate_color_code("#FFF").is_err());
    }

    #[test]
    fn test_validate_source_code() {
        assert!(validate_source_code("print(1)").is_ok());
        assert!(validate_source_code("   ").is_err());
        assert!(validate_source_code(&"x".repeat(MAX_SOURCE_CODE_SIZE + 1)).is_err());
    }

    #[test]
    fn test_require_non_blank() {
        assert!(require_non_blank("title", "Two Sum").is_ok());
        assert!(matches!(
            require_non_blank("title", " \t"),
            Err(AppError::Validation(_))
        ));
    }
}
