/// Bearer-token authentication middleware
///
/// Resolves the `Authorization` header against the store and inserts the
/// resulting [`AuthContext`] and [`User`] into request extensions. Handlers
/// behind this layer extract them with `Extension<AuthContext>`.
///
/// The user is re-loaded on every request, so a role change or account
/// removal takes effect immediately.

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use taskboard_shared::auth::middleware::authenticate;

use crate::{app::AppState, error::ApiError};

pub async fn jwt_auth_layer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let authorization = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    let (auth, user) = authenticate(state.store.as_ref(), state.tokens.secret(), authorization)
        .await
        .map_err(|e| {
            tracing::debug!(error = %e, path = %req.uri().path(), "Request not authenticated");
            ApiError::from(e)
        })?;

    req.extensions_mut().insert(auth);
    req.extensions_mut().insert(user);

    Ok(next.run(req).await)
}
