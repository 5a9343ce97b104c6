/// Project endpoints
///
/// # Endpoints
///
/// - `GET /api/projects` - Projects the caller owns or belongs to (all, for admins)
/// - `POST /api/projects` - Create a project owned by the caller
/// - `GET /api/projects/:id` - One project (owner, member or admin)
/// - `PUT /api/projects/:id` - Partial update (owner or admin)
/// - `DELETE /api/projects/:id` - Delete with all tasks and comments (owner or admin)

use crate::{
    app::AppState,
    error::{validate, ApiResult},
    routes::{double_option, parse_date, parse_nullable, parse_optional_date, parse_uuid},
};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use taskboard_shared::{
    auth::middleware::AuthContext,
    models::project::ProjectView,
    services::projects::{self, CreateProjectInput, UpdateProjectInput},
};
use uuid::Uuid;
use validator::Validate;

/// Create project request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectRequest {
    #[serde(default)]
    #[validate(length(max = 200, message = "Title must be at most 200 characters"))]
    pub title: String,

    #[validate(length(max = 5000, message = "Description must be at most 5000 characters"))]
    pub description: Option<String>,

    pub start_date: Option<String>,

    pub end_date: Option<String>,

    /// Member user IDs
    #[serde(default)]
    pub members: Vec<String>,

    pub status: Option<String>,
}

/// Update project request
///
/// Absent fields are left unchanged; `null` clears a date.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProjectRequest {
    #[validate(length(max = 200, message = "Title must be at most 200 characters"))]
    pub title: Option<String>,

    #[validate(length(max = 5000, message = "Description must be at most 5000 characters"))]
    pub description: Option<String>,

    #[serde(default, deserialize_with = "double_option")]
    pub start_date: Option<Option<String>>,

    #[serde(default, deserialize_with = "double_option")]
    pub end_date: Option<Option<String>>,

    /// Replaces the member set
    pub members: Option<Vec<String>>,

    pub status: Option<String>,
}

/// Delete project response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteProjectResponse {
    pub message: String,
    pub deleted_tasks: u64,
    pub deleted_comments: u64,
}

fn parse_members(raw: &[String]) -> ApiResult<Vec<Uuid>> {
    raw.iter().map(|m| parse_uuid(m, "member")).collect()
}

pub async fn list_projects(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Vec<ProjectView>>> {
    let projects = projects::list(state.store.as_ref(), &auth).await?;
    Ok(Json(projects))
}

/// Create a project
///
/// The caller becomes the owner. Every listed member must be an existing user.
///
/// # Errors
///
/// - `400 Bad Request`: Missing title, malformed ID or date, unknown member
pub async fn create_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    payload: Result<Json<CreateProjectRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<ProjectView>)> {
    let Json(req) = payload?;
    validate(&req)?;

    let input = CreateProjectInput {
        start_date: parse_optional_date(req.start_date.as_deref(), "startDate")?,
        end_date: parse_optional_date(req.end_date.as_deref(), "endDate")?,
        members: parse_members(&req.members)?,
        title: req.title,
        description: req.description,
        status: req.status,
    };

    let project = projects::create(state.store.as_ref(), &auth, input).await?;
    Ok((StatusCode::CREATED, Json(project)))
}

pub async fn get_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
) -> ApiResult<Json<ProjectView>> {
    let project_id = parse_uuid(&id, "project")?;
    let project = projects::get(state.store.as_ref(), &auth, project_id).await?;
    Ok(Json(project))
}

/// Update a project
///
/// # Errors
///
/// - `403 Forbidden`: Caller is neither owner nor admin
/// - `404 Not Found`: No such project
pub async fn update_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateProjectRequest>, JsonRejection>,
) -> ApiResult<Json<ProjectView>> {
    let project_id = parse_uuid(&id, "project")?;
    let Json(req) = payload?;
    validate(&req)?;

    let input = UpdateProjectInput {
        start_date: parse_nullable(req.start_date, |r| parse_date(r, "startDate"))?,
        end_date: parse_nullable(req.end_date, |r| parse_date(r, "endDate"))?,
        members: req.members.as_deref().map(parse_members).transpose()?,
        title: req.title,
        description: req.description,
        status: req.status,
    };

    let project = projects::update(
        state.store.as_ref(),
        state.events.as_ref(),
        &auth,
        project_id,
        input,
    )
    .await?;
    Ok(Json(project))
}

/// Delete a project and everything under it
///
/// # Response
///
/// ```json
/// { "message": "Project removed", "deletedTasks": 3, "deletedComments": 7 }
/// ```
pub async fn delete_project(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
) -> ApiResult<Json<DeleteProjectResponse>> {
    let project_id = parse_uuid(&id, "project")?;
    let summary = projects::delete(state.store.as_ref(), &auth, project_id).await?;

    Ok(Json(DeleteProjectResponse {
        message: "Project removed".to_string(),
        deleted_tasks: summary.deleted_tasks,
        deleted_comments: summary.deleted_comments,
    }))
}
