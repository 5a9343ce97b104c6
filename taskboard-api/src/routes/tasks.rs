/// Task endpoints
///
/// # Endpoints
///
/// - `GET /api/tasks` - Filtered, paged listing of visible tasks
/// - `POST /api/tasks` - Create a task in a project the caller belongs to
/// - `GET /api/tasks/:id` - One task (project members and the assignee)
/// - `PUT /api/tasks/:id` - Partial update
/// - `DELETE /api/tasks/:id` - Delete with comments (project owner or admin)
///
/// Mutations notify affected users and broadcast to the project room.
///
/// # Listing query
///
/// `project`, `q`, `status`, `assignee`, `priority`, `dueBefore`, `dueAfter`,
/// `page` (default 1) and `limit` (default 50, clamped to the configured
/// maximum). The page window is applied before the visibility filter, so a
/// page can come back shorter than `limit`.

use crate::{
    app::AppState,
    error::{validate, ApiError, ApiResult},
    routes::{
        double_option, non_blank, parse_date, parse_enum, parse_nullable, parse_optional_date,
        parse_optional_uuid, parse_present_enum, parse_uuid, MessageResponse,
    },
};
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use taskboard_shared::{
    auth::middleware::AuthContext,
    models::task::{TaskFilter, TaskView},
    services::tasks::{self, CreateTaskInput, TaskQuery, UpdateTaskInput, DEFAULT_PAGE_LIMIT},
};
use validator::Validate;

/// Listing query parameters
///
/// Everything is taken as a string and parsed by hand so that a bad value
/// yields a specific 400 message.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListTasksParams {
    pub project: Option<String>,
    pub q: Option<String>,
    pub status: Option<String>,
    pub assignee: Option<String>,
    pub priority: Option<String>,
    pub due_before: Option<String>,
    pub due_after: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

impl ListTasksParams {
    fn into_query(self) -> ApiResult<TaskQuery> {
        let filter = TaskFilter {
            project_id: parse_optional_uuid(self.project.as_deref(), "project")?,
            project_ids: None,
            status: parse_enum(self.status.as_deref())?,
            assignee_id: parse_optional_uuid(self.assignee.as_deref(), "assignee")?,
            priority: parse_enum(self.priority.as_deref())?,
            due_before: parse_optional_date(self.due_before.as_deref(), "dueBefore")?,
            due_after: parse_optional_date(self.due_after.as_deref(), "dueAfter")?,
            search: non_blank(self.q.as_deref()).map(str::to_string),
        };

        Ok(TaskQuery {
            filter,
            page: parse_number(self.page.as_deref(), "page")?.unwrap_or(1),
            limit: parse_number(self.limit.as_deref(), "limit")?.unwrap_or(DEFAULT_PAGE_LIMIT),
        })
    }
}

fn parse_number(raw: Option<&str>, field: &str) -> ApiResult<Option<i64>> {
    non_blank(raw)
        .map(|r| {
            r.parse::<i64>()
                .map_err(|_| ApiError::BadRequest(format!("Invalid {}", field)))
        })
        .transpose()
}

/// Create task request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    #[serde(default)]
    #[validate(length(max = 200, message = "Title must be at most 200 characters"))]
    pub title: String,

    #[validate(length(max = 5000, message = "Description must be at most 5000 characters"))]
    pub description: Option<String>,

    /// Owning project ID
    pub project: Option<String>,

    /// Assignee user ID; must be the project owner or a member
    pub assignee: Option<String>,

    pub status: Option<String>,

    pub priority: Option<String>,

    pub due_date: Option<String>,
}

/// Update task request
///
/// Absent fields are left unchanged. `assignee` and `dueDate` accept `null`
/// (or an empty string) to clear them. The project cannot be changed.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskRequest {
    #[validate(length(max = 200, message = "Title must be at most 200 characters"))]
    pub title: Option<String>,

    #[validate(length(max = 5000, message = "Description must be at most 5000 characters"))]
    pub description: Option<String>,

    #[serde(default, deserialize_with = "double_option")]
    pub assignee: Option<Option<String>>,

    pub status: Option<String>,

    pub priority: Option<String>,

    #[serde(default, deserialize_with = "double_option")]
    pub due_date: Option<Option<String>>,
}

pub async fn list_tasks(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(params): Query<ListTasksParams>,
) -> ApiResult<Json<Vec<TaskView>>> {
    let query = params.into_query()?;
    let tasks = tasks::list(
        state.store.as_ref(),
        &auth,
        &query,
        state.config.tasks.page_max_limit,
    )
    .await?;

    Ok(Json(tasks))
}

/// Create a task
///
/// # Errors
///
/// - `400 Bad Request`: Missing title or project, malformed value, invalid assignee
/// - `403 Forbidden`: Caller is not related to the project
/// - `404 Not Found`: Project does not exist
pub async fn create_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    payload: Result<Json<CreateTaskRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<TaskView>)> {
    let Json(req) = payload?;
    validate(&req)?;

    let input = CreateTaskInput {
        project_id: parse_optional_uuid(req.project.as_deref(), "project")?,
        assignee_id: parse_optional_uuid(req.assignee.as_deref(), "assignee")?,
        status: parse_enum(req.status.as_deref())?,
        priority: parse_enum(req.priority.as_deref())?,
        due_date: parse_optional_date(req.due_date.as_deref(), "dueDate")?,
        title: req.title,
        description: req.description,
    };

    let task = tasks::create(state.store.as_ref(), state.events.as_ref(), &auth, input).await?;
    Ok((StatusCode::CREATED, Json(task)))
}

pub async fn get_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
) -> ApiResult<Json<TaskView>> {
    let task_id = parse_uuid(&id, "task")?;
    let task = tasks::get(state.store.as_ref(), &auth, task_id).await?;
    Ok(Json(task))
}

/// Update a task
///
/// Allowed for the assignee, the project owner, project members and admins.
pub async fn update_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateTaskRequest>, JsonRejection>,
) -> ApiResult<Json<TaskView>> {
    let task_id = parse_uuid(&id, "task")?;
    let Json(req) = payload?;
    validate(&req)?;

    let input = UpdateTaskInput {
        assignee_id: parse_nullable(req.assignee, |r| parse_uuid(r, "assignee"))?,
        due_date: parse_nullable(req.due_date, |r| parse_date(r, "dueDate"))?,
        status: parse_present_enum(req.status.as_deref())?,
        priority: parse_present_enum(req.priority.as_deref())?,
        title: req.title,
        description: req.description,
    };

    let task = tasks::update(
        state.store.as_ref(),
        state.events.as_ref(),
        &auth,
        task_id,
        input,
    )
    .await?;

    Ok(Json(task))
}

pub async fn delete_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    let task_id = parse_uuid(&id, "task")?;
    let removed_comments = tasks::delete(
        state.store.as_ref(),
        state.events.as_ref(),
        &auth,
        task_id,
    )
    .await?;

    tracing::debug!(task_id = %task_id, removed_comments, "Task deleted");
    Ok(Json(MessageResponse::new("Task removed")))
}
