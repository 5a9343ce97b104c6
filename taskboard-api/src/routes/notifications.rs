/// Notification feed
///
/// - `GET /api/notifications` - The caller's 50 most recent notifications
/// - `PUT /api/notifications/:id/read` - Mark one read (idempotent)

use crate::{app::AppState, error::ApiResult, routes::parse_uuid};
use axum::{
    extract::{Path, State},
    Extension, Json,
};
use taskboard_shared::{
    auth::middleware::AuthContext, models::notification::Notification, services::notifications,
};

pub async fn list_notifications(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Vec<Notification>>> {
    Ok(Json(notifications::list(state.store.as_ref(), &auth).await?))
}

/// Mark a notification read
///
/// Another user's notification is reported as `404 Notification not found`.
pub async fn mark_read(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
) -> ApiResult<Json<Notification>> {
    let notification_id = parse_uuid(&id, "notification")?;
    let notification = notifications::mark_read(state.store.as_ref(), &auth, notification_id).await?;
    Ok(Json(notification))
}
