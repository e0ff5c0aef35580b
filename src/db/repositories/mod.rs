//! Database repositories
//!
//! Each repository is a trait implemented by every unit-of-work type. The
//! PostgreSQL implementations sit next to their trait; the memory ones live
//! in `db::memory`.

pub mod category_repo;
pub mod code_template_repo;
pub mod contest_repo;
pub mod problem_repo;
pub mod progress_repo;
pub mod submission_repo;
pub mod test_case_repo;
pub mod user_repo;

pub use category_repo::CategoryRepository;
pub use code_template_repo::CodeTemplateRepository;
pub use contest_repo::ContestRepository;
pub use problem_repo::ProblemRepository;
pub use progress_repo::ProgressRepository;
pub use submission_repo::SubmissionRepository;
pub use test_case_repo::TestCaseRepository;
pub use user_repo::UserRepository;
