//! Request guards run before a lifecycle operation.
//!
//! A request carries a [`RequestContext`] through an ordered [`Pipeline`] of
//! [`Stage`]s. Each stage either continues with an enriched context or halts
//! with the error the client should see.

use crate::db::Database;
use crate::error::{ApiError, ApiResult};
use crate::types::{Task, TaskId, UserId};
use tracing::debug;

/// Values resolved for a single request.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    /// Authenticated user, if the session cookie resolved.
    pub user: Option<UserId>,
    /// Task id named in the request path.
    pub task_id: Option<TaskId>,
    /// Task loaded by [`Stage::TaskExists`].
    pub task: Option<Task>,
}

impl RequestContext {
    pub fn new(user: Option<UserId>) -> Self {
        Self {
            user,
            ..Default::default()
        }
    }

    pub fn with_task_id(mut self, task_id: TaskId) -> Self {
        self.task_id = Some(task_id);
        self
    }

    /// The authenticated user. Only fails if no login stage ran.
    pub fn user(&self) -> ApiResult<&UserId> {
        self.user.as_ref().ok_or_else(ApiError::not_logged_in)
    }

    /// Take the loaded task out of the context.
    pub fn into_task(self) -> ApiResult<Task> {
        self.task.ok_or_else(ApiError::task_unavailable)
    }
}

/// Outcome of one stage.
#[derive(Debug)]
pub enum Flow {
    Continue(RequestContext),
    Halt(ApiError),
}

impl Flow {
    pub fn into_result(self) -> ApiResult<RequestContext> {
        match self {
            Flow::Continue(ctx) => Ok(ctx),
            Flow::Halt(err) => Err(err),
        }
    }
}

/// A single guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// The session must resolve to a user.
    RequireLogin,
    /// The task in the path must exist; loads it into the context.
    TaskExists,
    /// The authenticated user must be the task's creator.
    RequireCreator,
}

impl Stage {
    pub fn name(self) -> &'static str {
        match self {
            Stage::RequireLogin => "require_login",
            Stage::TaskExists => "task_exists",
            Stage::RequireCreator => "require_creator",
        }
    }

    pub fn apply(self, db: &Database, mut ctx: RequestContext) -> Flow {
        match self {
            Stage::RequireLogin => {
                if ctx.user.is_none() {
                    return Flow::Halt(ApiError::not_logged_in());
                }
                Flow::Continue(ctx)
            }
            Stage::TaskExists => {
                let Some(ref task_id) = ctx.task_id else {
                    return Flow::Halt(ApiError::task_unavailable());
                };
                match db.get_task(task_id) {
                    Ok(Some(task)) => {
                        ctx.task = Some(task);
                        Flow::Continue(ctx)
                    }
                    Ok(None) => Flow::Halt(ApiError::task_unavailable()),
                    Err(e) => Flow::Halt(e.into()),
                }
            }
            Stage::RequireCreator => {
                if ctx.task.is_none()
                    && let Some(ref task_id) = ctx.task_id
                {
                    match db.get_task(task_id) {
                        Ok(task) => ctx.task = task,
                        Err(e) => return Flow::Halt(e.into()),
                    }
                }
                let owns = match (&ctx.task, &ctx.user) {
                    (Some(task), Some(user)) => task.created_by == *user,
                    _ => false,
                };
                if !owns {
                    return Flow::Halt(ApiError::task_unavailable());
                }
                Flow::Continue(ctx)
            }
        }
    }
}

/// An ordered list of stages.
#[derive(Debug, Clone, Copy)]
pub struct Pipeline {
    stages: &'static [Stage],
}

/// Any logged-in user.
pub const AUTHENTICATED: Pipeline = Pipeline::new(&[Stage::RequireLogin]);

/// Logged in, and the task exists.
pub const EXISTING_TASK: Pipeline = Pipeline::new(&[Stage::RequireLogin, Stage::TaskExists]);

/// Logged in, the task exists, and the caller created it.
pub const OWNED_TASK: Pipeline = Pipeline::new(&[
    Stage::RequireLogin,
    Stage::TaskExists,
    Stage::RequireCreator,
]);

impl Pipeline {
    pub const fn new(stages: &'static [Stage]) -> Self {
        Self { stages }
    }

    /// Run every stage in order, stopping at the first halt.
    pub fn run(&self, db: &Database, ctx: RequestContext) -> Flow {
        let mut ctx = ctx;
        for stage in self.stages {
            match stage.apply(db, ctx) {
                Flow::Continue(next) => ctx = next,
                Flow::Halt(err) => {
                    debug!(stage = stage.name(), code = ?err.code, "guard halted request");
                    return Flow::Halt(err);
                }
            }
        }
        Flow::Continue(ctx)
    }

    /// Run the pipeline and convert the outcome to a `Result`.
    pub fn check(&self, db: &Database, ctx: RequestContext) -> ApiResult<RequestContext> {
        self.run(db, ctx).into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{ms_to_datetime, now_ms};
    use crate::error::ErrorCode;

    fn setup() -> (Database, Task) {
        let db = Database::open_in_memory().unwrap();
        let task = Task {
            id: TaskId::generate(),
            title: "t".into(),
            description: "d".into(),
            created_by: UserId::generate(),
            created_on: ms_to_datetime(now_ms()),
            completed: false,
            completed_on: None,
            due_date: None,
            estimated_completion_time: None,
            parent_task: None,
        };
        db.insert_task(&task).unwrap();
        (db, task)
    }

    #[test]
    fn login_stage_halts_anonymous_requests() {
        let (db, _) = setup();
        let err = AUTHENTICATED
            .check(&db, RequestContext::new(None))
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::NotLoggedIn);
    }

    #[test]
    fn login_is_checked_before_existence() {
        let (db, _) = setup();
        let ctx = RequestContext::new(None).with_task_id(TaskId::generate());
        let err = OWNED_TASK.check(&db, ctx).unwrap_err();
        assert_eq!(err.code, ErrorCode::NotLoggedIn);
    }

    #[test]
    fn existence_stage_loads_task() {
        let (db, task) = setup();
        let ctx = RequestContext::new(Some(UserId::generate())).with_task_id(task.id.clone());

        let ctx = EXISTING_TASK.check(&db, ctx).unwrap();
        assert_eq!(ctx.into_task().unwrap(), task);
    }

    #[test]
    fn missing_task_and_foreign_task_look_the_same() {
        let (db, task) = setup();

        let missing = RequestContext::new(Some(task.created_by.clone()))
            .with_task_id(TaskId::generate());
        let missing = OWNED_TASK.check(&db, missing).unwrap_err();

        let foreign = RequestContext::new(Some(UserId::generate())).with_task_id(task.id.clone());
        let foreign = OWNED_TASK.check(&db, foreign).unwrap_err();

        assert_eq!(missing.code, ErrorCode::TaskUnavailable);
        assert_eq!(foreign.code, ErrorCode::TaskUnavailable);
        assert_eq!(missing.message, foreign.message);
    }

    #[test]
    fn creator_passes_full_pipeline() {
        let (db, task) = setup();
        let ctx = RequestContext::new(Some(task.created_by.clone())).with_task_id(task.id.clone());

        let ctx = OWNED_TASK.check(&db, ctx).unwrap();
        assert_eq!(ctx.user().unwrap(), &task.created_by);
    }

    #[test]
    fn creator_stage_loads_task_when_run_alone() {
        let (db, task) = setup();
        let pipeline = Pipeline::new(&[Stage::RequireCreator]);
        let ctx = RequestContext::new(Some(task.created_by.clone())).with_task_id(task.id.clone());

        let ctx = pipeline.check(&db, ctx).unwrap();
        assert!(ctx.task.is_some());
    }
}
