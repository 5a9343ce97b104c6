/// Admin-only endpoints
///
/// - `GET /api/admin/users?page&limit` - All users, 20 per page by default

use crate::{app::AppState, error::ApiResult};
use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Extension, Json,
};
use serde::Deserialize;
use taskboard_shared::{auth::middleware::AuthContext, models::user::User, services::accounts};

#[derive(Debug, Deserialize)]
pub struct ListUsersParams {
    #[serde(default = "default_page")]
    pub page: i64,

    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_page() -> i64 {
    1
}

fn default_limit() -> i64 {
    20
}

/// List users
///
/// # Errors
///
/// - `403 Forbidden`: Caller is not an admin
pub async fn list_users(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    params: Result<Query<ListUsersParams>, QueryRejection>,
) -> ApiResult<Json<Vec<User>>> {
    let Query(params) = params?;
    let users = accounts::list_users(state.store.as_ref(), &auth, params.page, params.limit).await?;
    Ok(Json(users))
}
