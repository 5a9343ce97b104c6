/// Comment endpoints
///
/// - `GET /api/comments?task=<id>` - Comments on a task, oldest first
/// - `POST /api/comments` - `{ taskId, text }`
/// - `DELETE /api/comments/:id` - Author, project owner or admin

use crate::{
    app::AppState,
    error::{validate, ApiError, ApiResult},
    routes::{non_blank, parse_optional_uuid, parse_uuid, MessageResponse},
};
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use taskboard_shared::{
    auth::middleware::AuthContext, models::comment::CommentView, services::comments,
};
use validator::Validate;

#[derive(Debug, Deserialize)]
pub struct ListCommentsParams {
    pub task: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommentRequest {
    pub task_id: Option<String>,

    #[serde(default)]
    #[validate(length(max = 5000, message = "Comment must be at most 5000 characters"))]
    pub text: String,
}

pub async fn list_comments(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(params): Query<ListCommentsParams>,
) -> ApiResult<Json<Vec<CommentView>>> {
    let raw = non_blank(params.task.as_deref())
        .ok_or_else(|| ApiError::BadRequest("task query param required".to_string()))?;
    let task_id = parse_uuid(raw, "task")?;

    let comments = comments::list(state.store.as_ref(), &auth, task_id).await?;
    Ok(Json(comments))
}

pub async fn create_comment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    payload: Result<Json<CreateCommentRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<CommentView>)> {
    let Json(req) = payload?;
    validate(&req)?;

    let task_id = parse_optional_uuid(req.task_id.as_deref(), "task")?;
    let comment = comments::create(state.store.as_ref(), &auth, task_id, &req.text).await?;

    Ok((StatusCode::CREATED, Json(comment)))
}

pub async fn delete_comment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    let comment_id = parse_uuid(&id, "comment")?;
    comments::delete(state.store.as_ref(), &auth, comment_id).await?;

    Ok(Json(MessageResponse::new("Comment removed")))
}
