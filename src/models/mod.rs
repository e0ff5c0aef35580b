//! Domain models
//!
//! This module contains all domain models used throughout the crate.

pub mod category;
pub mod code_template;
pub mod contest;
pub mod problem;
pub mod submission;
pub mod test_case;
pub mod user;
pub mod user_progress;

pub use category::*;
pub use code_template::*;
pub use contest::*;
pub use problem::*;
pub use submission::*;
pub use test_case::*;
pub use user::*;
pub use user_progress::*;

/// A TEXT column held a value that is not a known variant
#[derive(Debug, thiserror::Error)]
#[error("unknown {kind} value '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

/// Enums are stored as their SCREAMING_SNAKE_CASE name
macro_rules! text_column {
    ($($ty:ident),* $(,)?) => {
        $(
            impl TryFrom<String> for $ty {
                type Error = UnknownVariant;

                fn try_from(value: String) -> Result<Self, Self::Error> {
                    Self::parse(&value).ok_or(UnknownVariant {
                        kind: stringify!($ty),
                        value,
                    })
                }
            }
        )*
    };
}

text_column!(
    Role,
    Difficulty,
    ProblemStatus,
    SubmissionStatus,
    Language,
    ProgressStatus,
    ContestStatus,
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_columns_decode() {
        assert_eq!(
            SubmissionStatus::try_from("WRONG_ANSWER".to_string()).unwrap(),
            SubmissionStatus::WrongAnswer
        );
        let err = Role::try_from("ROOT".to_string()).unwrap_err();
        assert_eq!(err.to_string(), "unknown Role value 'ROOT'");
    }
}
