//! Repository impls for the memory adapter
//!
//! Ordering and uniqueness follow the PostgreSQL adapter and the schema in
//! `migrations/`, constraint names included.

use std::cmp::Reverse;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{MemoryUnitOfWork, duplicate};
use crate::db::repositories::{
    CategoryRepository, CodeTemplateRepository, ContestRepository, ProblemRepository,
    ProgressRepository, SubmissionRepository, TestCaseRepository, UserRepository,
};
use crate::error::{AppError, AppResult};
use crate::models::{
    Category, CodeTemplate, Contest, ContestFilter, ContestParticipant, ContestProblem,
    ContestSolve, Language, Problem, ProblemFilter, ProblemOrder, ProgressStatus, Submission,
    SubmissionFilter, SubmissionStatus, TestCase, TestCaseFilter, User, UserProgress,
};

fn take_limit<T>(mut items: Vec<T>, limit: Option<i64>) -> Vec<T> {
    if let Some(limit) = limit {
        items.truncate(usize::try_from(limit).unwrap_or(0));
    }
    items
}

fn replace<T: Clone>(
    slot: Option<&mut T>,
    value: &T,
    missing: &str,
) -> AppResult<()> {
    match slot {
        Some(stored) => {
            *stored = value.clone();
            Ok(())
        }
        None => Err(AppError::NotFound(missing.to_string())),
    }
}

#[async_trait]
impl UserRepository for MemoryUnitOfWork {
    async fn insert_user(&mut self, user: &User) -> AppResult<()> {
        let state = self.state()?;
        if state.users.values().any(|u| u.username == user.username) {
            return Err(duplicate("users_username_key"));
        }
        if state.users.values().any(|u| u.email == user.email) {
            return Err(duplicate("users_email_key"));
        }
        state.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn find_user(&mut self, id: Uuid) -> AppResult<Option<User>> {
        Ok(self.state()?.users.get(&id).cloned())
    }

    async fn lock_user(&mut self, id: Uuid) -> AppResult<Option<User>> {
        self.find_user(id).await
    }

    async fn find_user_by_username(&mut self, username: &str) -> AppResult<Option<User>> {
        let state = self.state()?;
        Ok(state.users.values().find(|u| u.username == username).cloned())
    }

    async fn find_user_by_email(&mut self, email: &str) -> AppResult<Option<User>> {
        let state = self.state()?;
        Ok(state.users.values().find(|u| u.email == email).cloned())
    }

    async fn update_user(&mut self, user: &User) -> AppResult<()> {
        let state = self.state()?;
        if state
            .users
            .values()
            .any(|u| u.id != user.id && u.email == user.email)
        {
            return Err(duplicate("users_email_key"));
        }
        replace(state.users.get_mut(&user.id), user, "User not found")
    }

    async fn delete_user(&mut self, id: Uuid) -> AppResult<bool> {
        let state = self.state()?;
        let participant_ids: Vec<Uuid> = state
            .participants
            .values()
            .filter(|p| p.user_id == id)
            .map(|p| p.id)
            .collect();
        state
            .solves
            .retain(|_, s| !participant_ids.contains(&s.participant_id));
        state.participants.retain(|_, p| p.user_id != id);
        state.progress.retain(|_, p| p.user_id != id);
        state.submissions.retain(|_, s| s.user_id != id);
        Ok(state.users.remove(&id).is_some())
    }

    async fn top_users_by_reputation(&mut self, limit: i64) -> AppResult<Vec<User>> {
        let mut users: Vec<User> = self.state()?.users.values().cloned().collect();
        users.sort_by_key(|u| (Reverse(u.reputation), u.created_at, u.id));
        Ok(take_limit(users, Some(limit)))
    }
}

#[async_trait]
impl ProblemRepository for MemoryUnitOfWork {
    async fn insert_problem(&mut self, problem: &Problem) -> AppResult<()> {
        let state = self.state()?;
        if state.problems.values().any(|p| p.slug == problem.slug) {
            return Err(duplicate("problems_slug_key"));
        }
        state.problems.insert(problem.id, problem.clone());
        Ok(())
    }

    async fn find_problem(&mut self, id: Uuid) -> AppResult<Option<Problem>> {
        Ok(self.state()?.problems.get(&id).cloned())
    }

    async fn find_problem_by_slug(&mut self, slug: &str) -> AppResult<Option<Problem>> {
        let state = self.state()?;
        Ok(state.problems.values().find(|p| p.slug == slug).cloned())
    }

    async fn lock_problem(&mut self, id: Uuid) -> AppResult<Option<Problem>> {
        self.find_problem(id).await
    }

    async fn update_problem(&mut self, problem: &Problem) -> AppResult<()> {
        let stored = self
            .state()?
            .problems
            .get_mut(&problem.id)
            .ok_or_else(|| AppError::NotFound("Problem not found".to_string()))?;
        // Counters and reactions stay as stored, matching the SQL UPDATE
        *stored = Problem {
            submission_count: stored.submission_count,
            accepted_count: stored.accepted_count,
            likes: stored.likes,
            dislikes: stored.dislikes,
            ..problem.clone()
        };
        Ok(())
    }

    async fn record_problem_resolution(
        &mut self,
        id: Uuid,
        accepted: bool,
        at: DateTime<Utc>,
    ) -> AppResult<Problem> {
        let problem = self
            .state()?
            .problems
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Problem {} not found", id)))?;
        problem.record_resolution(accepted);
        problem.touch(at);
        Ok(problem.clone())
    }

    async fn add_problem_reactions(
        &mut self,
        id: Uuid,
        likes: i32,
        dislikes: i32,
        at: DateTime<Utc>,
    ) -> AppResult<Problem> {
        let problem = self
            .state()?
            .problems
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Problem {} not found", id)))?;
        problem.likes += likes;
        problem.dislikes += dislikes;
        problem.touch(at);
        Ok(problem.clone())
    }

    async fn delete_problem(&mut self, id: Uuid) -> AppResult<bool> {
        let state = self.state()?;
        let contest_problem_ids: Vec<Uuid> = state
            .contest_problems
            .values()
            .filter(|cp| cp.problem_id == id)
            .map(|cp| cp.id)
            .collect();
        state
            .solves
            .retain(|_, s| !contest_problem_ids.contains(&s.contest_problem_id));
        state.contest_problems.retain(|_, cp| cp.problem_id != id);
        state.problem_categories.retain(|(problem_id, _)| *problem_id != id);
        state.progress.retain(|_, p| p.problem_id != id);
        state.submissions.retain(|_, s| s.problem_id != id);
        state.code_templates.retain(|_, t| t.problem_id != id);
        state.test_cases.retain(|_, t| t.problem_id != id);
        Ok(state.problems.remove(&id).is_some())
    }

    async fn list_problems(
        &mut self,
        filter: &ProblemFilter,
        order: ProblemOrder,
    ) -> AppResult<Vec<Problem>> {
        let state = self.state()?;
        let mut problems: Vec<Problem> = state
            .problems
            .values()
            .filter(|p| filter.matches(p))
            .filter(|p| {
                filter
                    .category_id
                    .is_none_or(|c| state.problem_categories.contains(&(p.id, c)))
            })
            .cloned()
            .collect();

        problems.sort_by(|a, b| {
            let newest = b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id));
            match order {
                ProblemOrder::Newest => newest,
                ProblemOrder::AcceptanceRate => b
                    .acceptance_rate()
                    .total_cmp(&a.acceptance_rate())
                    .then(newest),
                ProblemOrder::SubmissionCount => {
                    b.submission_count.cmp(&a.submission_count).then(newest)
                }
                ProblemOrder::Likes => b.likes.cmp(&a.likes).then(newest),
                ProblemOrder::Difficulty => a.difficulty.cmp(&b.difficulty).then(newest),
            }
        });

        Ok(take_limit(problems, filter.limit))
    }
}

#[async_trait]
impl CategoryRepository for MemoryUnitOfWork {
    async fn insert_category(&mut self, category: &Category) -> AppResult<()> {
        let state = self.state()?;
        if state.categories.values().any(|c| c.name == category.name) {
            return Err(duplicate("categories_name_key"));
        }
        state.categories.insert(category.id, category.clone());
        Ok(())
    }

    async fn find_category(&mut self, id: Uuid) -> AppResult<Option<Category>> {
        Ok(self.state()?.categories.get(&id).cloned())
    }

    async fn find_category_by_name(&mut self, name: &str) -> AppResult<Option<Category>> {
        let state = self.state()?;
        Ok(state.categories.values().find(|c| c.name == name).cloned())
    }

    async fn update_category(&mut self, category: &Category) -> AppResult<()> {
        let state = self.state()?;
        if state
            .categories
            .values()
            .any(|c| c.id != category.id && c.name == category.name)
        {
            return Err(duplicate("categories_name_key"));
        }
        replace(
            state.categories.get_mut(&category.id),
            category,
            "Category not found",
        )
    }

    async fn delete_category(&mut self, id: Uuid) -> AppResult<bool> {
        let state = self.state()?;
        state
            .problem_categories
            .retain(|(_, category_id)| *category_id != id);
        Ok(state.categories.remove(&id).is_some())
    }

    async fn list_categories(&mut self, active_only: bool) -> AppResult<Vec<Category>> {
        let mut categories: Vec<Category> = self
            .state()?
            .categories
            .values()
            .filter(|c| !active_only || c.is_active)
            .cloned()
            .collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    async fn link_problem_category(
        &mut self,
        problem_id: Uuid,
        category_id: Uuid,
    ) -> AppResult<bool> {
        Ok(self
            .state()?
            .problem_categories
            .insert((problem_id, category_id)))
    }

    async fn unlink_problem_category(
        &mut self,
        problem_id: Uuid,
        category_id: Uuid,
    ) -> AppResult<bool> {
        Ok(self
            .state()?
            .problem_categories
            .remove(&(problem_id, category_id)))
    }

    async fn categories_for_problem(&mut self, problem_id: Uuid) -> AppResult<Vec<Category>> {
        let state = self.state()?;
        let mut categories: Vec<Category> = state
            .problem_categories
            .iter()
            .filter(|(p, _)| *p == problem_id)
            .filter_map(|(_, c)| state.categories.get(c).cloned())
            .collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    async fn problems_in_category(&mut self, category_id: Uuid) -> AppResult<Vec<Problem>> {
        let state = self.state()?;
        let mut problems: Vec<Problem> = state
            .problem_categories
            .iter()
            .filter(|(_, c)| *c == category_id)
            .filter_map(|(p, _)| state.problems.get(p).cloned())
            .collect();
        problems.sort_by_key(|p| (Reverse(p.created_at), p.id));
        Ok(problems)
    }

    async fn count_problems_in_category(&mut self, category_id: Uuid) -> AppResult<i64> {
        let state = self.state()?;
        let count = state
            .problem_categories
            .iter()
            .filter(|(_, c)| *c == category_id)
            .count();
        Ok(count as i64)
    }
}

#[async_trait]
impl TestCaseRepository for MemoryUnitOfWork {
    async fn insert_test_case(&mut self, test_case: &TestCase) -> AppResult<()> {
        self.state()?
            .test_cases
            .insert(test_case.id, test_case.clone());
        Ok(())
    }

    async fn find_test_case(&mut self, id: Uuid) -> AppResult<Option<TestCase>> {
        Ok(self.state()?.test_cases.get(&id).cloned())
    }

    async fn update_test_case(&mut self, test_case: &TestCase) -> AppResult<()> {
        let state = self.state()?;
        replace(
            state.test_cases.get_mut(&test_case.id),
            test_case,
            "Test case not found",
        )
    }

    async fn delete_test_case(&mut self, id: Uuid) -> AppResult<bool> {
        Ok(self.state()?.test_cases.remove(&id).is_some())
    }

    async fn test_cases_for_problem(
        &mut self,
        problem_id: Uuid,
        filter: TestCaseFilter,
    ) -> AppResult<Vec<TestCase>> {
        let mut test_cases: Vec<TestCase> = self
            .state()?
            .test_cases
            .values()
            .filter(|t| t.problem_id == problem_id && filter.matches(t))
            .cloned()
            .collect();
        test_cases.sort_by_key(|t| (t.created_at, t.id));
        Ok(test_cases)
    }
}

#[async_trait]
impl CodeTemplateRepository for MemoryUnitOfWork {
    async fn insert_code_template(&mut self, template: &CodeTemplate) -> AppResult<()> {
        let state = self.state()?;
        if state
            .code_templates
            .values()
            .any(|t| t.problem_id == template.problem_id && t.language == template.language)
        {
            return Err(duplicate("code_templates_problem_language_key"));
        }
        state.code_templates.insert(template.id, template.clone());
        Ok(())
    }

    async fn update_code_template(&mut self, template: &CodeTemplate) -> AppResult<()> {
        let state = self.state()?;
        replace(
            state.code_templates.get_mut(&template.id),
            template,
            "Code template not found",
        )
    }

    async fn find_code_template(
        &mut self,
        problem_id: Uuid,
        language: Language,
    ) -> AppResult<Option<CodeTemplate>> {
        let state = self.state()?;
        Ok(state
            .code_templates
            .values()
            .find(|t| t.problem_id == problem_id && t.language == language)
            .cloned())
    }

    async fn code_templates_for_problem(
        &mut self,
        problem_id: Uuid,
    ) -> AppResult<Vec<CodeTemplate>> {
        let mut templates: Vec<CodeTemplate> = self
            .state()?
            .code_templates
            .values()
            .filter(|t| t.problem_id == problem_id)
            .cloned()
            .collect();
        templates.sort_by_key(|t| t.language.as_str());
        Ok(templates)
    }

    async fn delete_code_template(&mut self, id: Uuid) -> AppResult<bool> {
        Ok(self.state()?.code_templates.remove(&id).is_some())
    }
}

#[async_trait]
impl SubmissionRepository for MemoryUnitOfWork {
    async fn insert_submission(&mut self, submission: &Submission) -> AppResult<()> {
        self.state()?
            .submissions
            .insert(submission.id, submission.clone());
        Ok(())
    }

    async fn find_submission(&mut self, id: Uuid) -> AppResult<Option<Submission>> {
        Ok(self.state()?.submissions.get(&id).cloned())
    }

    async fn lock_submission(&mut self, id: Uuid) -> AppResult<Option<Submission>> {
        self.find_submission(id).await
    }

    async fn update_submission(&mut self, submission: &Submission) -> AppResult<()> {
        let state = self.state()?;
        replace(
            state.submissions.get_mut(&submission.id),
            submission,
            "Submission not found",
        )
    }

    async fn list_submissions(&mut self, filter: &SubmissionFilter) -> AppResult<Vec<Submission>> {
        let mut submissions: Vec<Submission> = self
            .state()?
            .submissions
            .values()
            .filter(|s| filter.matches(s))
            .cloned()
            .collect();
        submissions.sort_by_key(|s| (Reverse(s.submitted_at), s.id));
        Ok(take_limit(submissions, filter.limit))
    }

    async fn pending_submissions(&mut self, limit: i64) -> AppResult<Vec<Submission>> {
        let mut submissions: Vec<Submission> = self
            .state()?
            .submissions
            .values()
            .filter(|s| s.status == SubmissionStatus::Pending)
            .cloned()
            .collect();
        submissions.sort_by_key(|s| (s.submitted_at, s.id));
        Ok(take_limit(submissions, Some(limit)))
    }

    async fn best_accepted_submission(
        &mut self,
        user_id: Uuid,
        problem_id: Uuid,
    ) -> AppResult<Option<Submission>> {
        let state = self.state()?;
        // NULL metrics sort last
        Ok(state
            .submissions
            .values()
            .filter(|s| s.user_id == user_id && s.problem_id == problem_id && s.is_accepted())
            .min_by_key(|s| {
                (
                    s.execution_time_ms.is_none(),
                    s.execution_time_ms,
                    s.memory_used_kb.is_none(),
                    s.memory_used_kb,
                    s.submitted_at,
                )
            })
            .cloned())
    }
}

#[async_trait]
impl ProgressRepository for MemoryUnitOfWork {
    async fn find_progress(
        &mut self,
        user_id: Uuid,
        problem_id: Uuid,
    ) -> AppResult<Option<UserProgress>> {
        let state = self.state()?;
        Ok(state
            .progress
            .values()
            .find(|p| p.user_id == user_id && p.problem_id == problem_id)
            .cloned())
    }

    async fn lock_progress(
        &mut self,
        user_id: Uuid,
        problem_id: Uuid,
    ) -> AppResult<Option<UserProgress>> {
        self.find_progress(user_id, problem_id).await
    }

    async fn insert_progress(&mut self, progress: &UserProgress) -> AppResult<bool> {
        let state = self.state()?;
        if state
            .progress
            .values()
            .any(|p| p.user_id == progress.user_id && p.problem_id == progress.problem_id)
        {
            return Ok(false);
        }
        state.progress.insert(progress.id, progress.clone());
        Ok(true)
    }

    async fn update_progress(&mut self, progress: &UserProgress) -> AppResult<()> {
        let state = self.state()?;
        replace(
            state.progress.get_mut(&progress.id),
            progress,
            "Progress not found",
        )
    }

    async fn progress_for_user(
        &mut self,
        user_id: Uuid,
        status: Option<ProgressStatus>,
    ) -> AppResult<Vec<UserProgress>> {
        let mut progress: Vec<UserProgress> = self
            .state()?
            .progress
            .values()
            .filter(|p| p.user_id == user_id && status.is_none_or(|s| s == p.status))
            .cloned()
            .collect();
        progress.sort_by_key(|p| (Reverse(p.updated_at), p.id));
        Ok(progress)
    }

    async fn count_progress(&mut self, user_id: Uuid, status: ProgressStatus) -> AppResult<i64> {
        let count = self
            .state()?
            .progress
            .values()
            .filter(|p| p.user_id == user_id && p.status == status)
            .count();
        Ok(count as i64)
    }
}

#[async_trait]
impl ContestRepository for MemoryUnitOfWork {
    async fn insert_contest(&mut self, contest: &Contest) -> AppResult<()> {
        self.state()?.contests.insert(contest.id, contest.clone());
        Ok(())
    }

    async fn find_contest(&mut self, id: Uuid) -> AppResult<Option<Contest>> {
        Ok(self.state()?.contests.get(&id).cloned())
    }

    async fn lock_contest(&mut self, id: Uuid) -> AppResult<Option<Contest>> {
        // The unit of work already holds the only lock there is
        self.find_contest(id).await
    }

    async fn update_contest(&mut self, contest: &Contest) -> AppResult<()> {
        let state = self.state()?;
        replace(state.contests.get_mut(&contest.id), contest, "Contest not found")
    }

    async fn delete_contest(&mut self, id: Uuid) -> AppResult<bool> {
        let state = self.state()?;
        let participant_ids: Vec<Uuid> = state
            .participants
            .values()
            .filter(|p| p.contest_id == id)
            .map(|p| p.id)
            .collect();
        let contest_problem_ids: Vec<Uuid> = state
            .contest_problems
            .values()
            .filter(|cp| cp.contest_id == id)
            .map(|cp| cp.id)
            .collect();
        state.solves.retain(|_, s| {
            !participant_ids.contains(&s.participant_id)
                && !contest_problem_ids.contains(&s.contest_problem_id)
        });
        state.participants.retain(|_, p| p.contest_id != id);
        state.contest_problems.retain(|_, cp| cp.contest_id != id);
        Ok(state.contests.remove(&id).is_some())
    }

    async fn list_contests(&mut self, filter: &ContestFilter) -> AppResult<Vec<Contest>> {
        let mut contests: Vec<Contest> = self
            .state()?
            .contests
            .values()
            .filter(|c| filter.matches(c))
            .cloned()
            .collect();
        contests.sort_by_key(|c| (c.start_time, c.id));
        Ok(contests)
    }

    async fn insert_contest_problem(&mut self, contest_problem: &ContestProblem) -> AppResult<()> {
        let state = self.state()?;
        if state.contest_problems.values().any(|cp| {
            cp.contest_id == contest_problem.contest_id
                && cp.problem_id == contest_problem.problem_id
        }) {
            return Err(duplicate("contest_problems_contest_problem_key"));
        }
        state
            .contest_problems
            .insert(contest_problem.id, contest_problem.clone());
        Ok(())
    }

    async fn find_contest_problem(&mut self, id: Uuid) -> AppResult<Option<ContestProblem>> {
        Ok(self.state()?.contest_problems.get(&id).cloned())
    }

    async fn find_contest_problem_by_problem(
        &mut self,
        contest_id: Uuid,
        problem_id: Uuid,
    ) -> AppResult<Option<ContestProblem>> {
        let state = self.state()?;
        Ok(state
            .contest_problems
            .values()
            .find(|cp| cp.contest_id == contest_id && cp.problem_id == problem_id)
            .cloned())
    }

    async fn contest_problems(&mut self, contest_id: Uuid) -> AppResult<Vec<ContestProblem>> {
        let mut contest_problems: Vec<ContestProblem> = self
            .state()?
            .contest_problems
            .values()
            .filter(|cp| cp.contest_id == contest_id)
            .cloned()
            .collect();
        contest_problems.sort_by_key(|cp| (cp.points, cp.id));
        Ok(contest_problems)
    }

    async fn delete_contest_problem(&mut self, id: Uuid) -> AppResult<bool> {
        let state = self.state()?;
        state.solves.retain(|_, s| s.contest_problem_id != id);
        Ok(state.contest_problems.remove(&id).is_some())
    }

    async fn insert_participant(&mut self, participant: &ContestParticipant) -> AppResult<()> {
        let state = self.state()?;
        if state.participants.values().any(|p| {
            p.contest_id == participant.contest_id && p.user_id == participant.user_id
        }) {
            return Err(duplicate("contest_participants_contest_user_key"));
        }
        state
            .participants
            .insert(participant.id, participant.clone());
        Ok(())
    }

    async fn find_participant(
        &mut self,
        contest_id: Uuid,
        user_id: Uuid,
    ) -> AppResult<Option<ContestParticipant>> {
        let state = self.state()?;
        Ok(state
            .participants
            .values()
            .find(|p| p.contest_id == contest_id && p.user_id == user_id)
            .cloned())
    }

    async fn update_participant(&mut self, participant: &ContestParticipant) -> AppResult<()> {
        let state = self.state()?;
        replace(
            state.participants.get_mut(&participant.id),
            participant,
            "Participant not found",
        )
    }

    async fn delete_participant(&mut self, id: Uuid) -> AppResult<bool> {
        let state = self.state()?;
        state.solves.retain(|_, s| s.participant_id != id);
        Ok(state.participants.remove(&id).is_some())
    }

    async fn ranked_participants(
        &mut self,
        contest_id: Uuid,
    ) -> AppResult<Vec<ContestParticipant>> {
        let mut participants: Vec<ContestParticipant> = self
            .state()?
            .participants
            .values()
            .filter(|p| p.contest_id == contest_id)
            .cloned()
            .collect();
        participants.sort_by_key(|p| (Reverse(p.score), p.joined_at, p.id));
        Ok(participants)
    }

    async fn count_participants(&mut self, contest_id: Uuid) -> AppResult<i64> {
        let count = self
            .state()?
            .participants
            .values()
            .filter(|p| p.contest_id == contest_id)
            .count();
        Ok(count as i64)
    }

    async fn find_solve(
        &mut self,
        participant_id: Uuid,
        contest_problem_id: Uuid,
    ) -> AppResult<Option<ContestSolve>> {
        let state = self.state()?;
        Ok(state
            .solves
            .values()
            .find(|s| s.participant_id == participant_id && s.contest_problem_id == contest_problem_id)
            .cloned())
    }

    async fn insert_solve(&mut self, solve: &ContestSolve) -> AppResult<()> {
        let state = self.state()?;
        if state.solves.values().any(|s| {
            s.participant_id == solve.participant_id
                && s.contest_problem_id == solve.contest_problem_id
        }) {
            return Err(duplicate("contest_solves_participant_problem_key"));
        }
        state.solves.insert(solve.id, solve.clone());
        Ok(())
    }
}
