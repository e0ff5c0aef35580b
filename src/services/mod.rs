//! Business logic services
//!
//! Each service is a unit struct with static async operations that take the
//! shared [`AppState`](crate::state::AppState) and run inside one unit of work.

pub mod category_service;
pub mod code_template_service;
pub mod contest_service;
pub mod problem_service;
pub mod progress_service;
pub mod submission_service;
pub mod test_case_service;
pub mod user_service;

pub use category_service::CategoryService;
pub use code_template_service::CodeTemplateService;
pub use contest_service::ContestService;
pub use problem_service::ProblemService;
pub use progress_service::ProgressService;
pub use submission_service::SubmissionService;
pub use test_case_service::TestCaseService;
pub use user_service::UserService;
