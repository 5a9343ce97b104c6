/// Authentication endpoints
///
/// # Endpoints
///
/// - `POST /api/auth/register` - Create a password account
/// - `POST /api/auth/login` - Exchange email and password for a token
/// - `POST /api/auth/google-login` - Exchange a Google ID token for a token
/// - `GET /api/auth/me` - Current user profile (requires bearer token)
///
/// Register and login answer with `{ _id, name, email, role, token }`.

use crate::{
    app::AppState,
    error::{validate, ApiResult},
    routes::parse_enum,
};
use axum::{extract::rejection::JsonRejection, extract::State, http::StatusCode, Extension, Json};
use serde::Deserialize;
use taskboard_shared::{
    models::user::User,
    services::accounts::{self, AuthResponse, RegisterInput},
};
use validator::Validate;

/// Register request
///
/// Missing fields default to empty and are reported together by the
/// service with a single message.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[serde(default)]
    #[validate(length(max = 100, message = "Name must be at most 100 characters"))]
    pub name: String,

    #[serde(default)]
    #[validate(length(max = 254, message = "Email must be at most 254 characters"))]
    pub email: String,

    #[serde(default)]
    #[validate(length(max = 128, message = "Password must be at most 128 characters"))]
    pub password: String,

    /// `member` (default), `manager`, or `admin` when admin signup is enabled
    pub role: Option<String>,
}

/// Login request
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,

    #[serde(default)]
    pub password: String,
}

/// External identity login request
#[derive(Debug, Deserialize)]
pub struct GoogleLoginRequest {
    /// Google ID token from the client-side sign-in flow
    #[serde(default)]
    pub token: String,
}

/// Register a new user
///
/// # Errors
///
/// - `400 Bad Request`: Missing fields, unknown role, or email already registered
/// - `403 Forbidden`: `admin` requested while admin signup is disabled
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<AuthResponse>)> {
    let Json(req) = payload?;
    validate(&req)?;

    let input = RegisterInput {
        role: parse_enum(req.role.as_deref())?,
        name: req.name,
        email: req.email,
        password: req.password,
    };

    let response = accounts::register(
        state.store.as_ref(),
        &state.tokens,
        input,
        state.config.auth.allow_admin_signup,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(response)))
}

/// Login with email and password
///
/// # Errors
///
/// - `400 Bad Request`: Missing email or password
/// - `401 Unauthorized`: Unknown email or wrong password (indistinguishable)
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<Json<AuthResponse>> {
    let Json(req) = payload?;

    let response = accounts::login(state.store.as_ref(), &state.tokens, &req.email, &req.password).await?;
    Ok(Json(response))
}

/// Login with a Google ID token
///
/// Links the Google account to an existing user with the same email, or
/// creates a member account without a password.
///
/// # Errors
///
/// - `400 Bad Request`: Missing token, or the token carries no email
/// - `401 Unauthorized`: Google rejected the token
/// - `500 Internal Server Error`: Google login is not configured
pub async fn google_login(
    State(state): State<AppState>,
    payload: Result<Json<GoogleLoginRequest>, JsonRejection>,
) -> ApiResult<Json<AuthResponse>> {
    let Json(req) = payload?;

    let response = accounts::google_login(
        state.store.as_ref(),
        &state.tokens,
        state.verifier.as_deref(),
        &req.token,
        state.config.auth.expose_verifier_errors,
    )
    .await?;

    Ok(Json(response))
}

/// Current user profile
///
/// The middleware already loaded the user, so this never touches the store.
pub async fn me(Extension(user): Extension<User>) -> Json<User> {
    Json(user)
}
