/// Dashboard endpoints
///
/// - `GET /api/dashboard/overview` - Projects, assigned tasks, status counts, next 7 days
/// - `GET /api/dashboard/stats` - `{ totalTasks, done, percent }`
/// - `GET /api/dashboard/calendar?project&from&to` - Visible tasks due in a range
/// - `GET /api/dashboard/report?projectId` - Status breakdown for one project

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    routes::{non_blank, parse_optional_date, parse_optional_uuid, parse_uuid},
};
use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::Utc;
use serde::Deserialize;
use taskboard_shared::{
    auth::middleware::AuthContext,
    models::task::TaskView,
    services::dashboard::{self, CalendarQuery, Overview, ProjectReport, Stats},
};

#[derive(Debug, Deserialize)]
pub struct CalendarParams {
    pub project: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportParams {
    pub project_id: Option<String>,
}

pub async fn overview(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Overview>> {
    Ok(Json(dashboard::overview(state.store.as_ref(), &auth, Utc::now()).await?))
}

pub async fn stats(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Stats>> {
    Ok(Json(dashboard::stats(state.store.as_ref(), &auth).await?))
}

pub async fn calendar(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(params): Query<CalendarParams>,
) -> ApiResult<Json<Vec<TaskView>>> {
    let query = CalendarQuery {
        project_id: parse_optional_uuid(params.project.as_deref(), "project")?,
        from: parse_optional_date(params.from.as_deref(), "from")?,
        to: parse_optional_date(params.to.as_deref(), "to")?,
    };

    Ok(Json(dashboard::calendar(state.store.as_ref(), &auth, query).await?))
}

pub async fn report(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(params): Query<ReportParams>,
) -> ApiResult<Json<ProjectReport>> {
    let raw = non_blank(params.project_id.as_deref())
        .ok_or_else(|| ApiError::BadRequest("projectId required".to_string()))?;
    let project_id = parse_uuid(raw, "project")?;

    Ok(Json(dashboard::report(state.store.as_ref(), &auth, project_id).await?))
}
