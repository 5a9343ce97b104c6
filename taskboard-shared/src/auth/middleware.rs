/// Bearer-token authentication
///
/// Resolves an `Authorization` header into an [`AuthContext`]. The HTTP
/// layer calls [`authenticate`] from its middleware and inserts the context
/// into request extensions; the WebSocket upgrade calls [`authenticate_token`]
/// with the token from the query string.
///
/// Checks run in a fixed order so the caller always gets the most specific
/// failure:
///
/// 1. header present
/// 2. header shaped `Bearer <token>` (scheme case-insensitive, extra spaces tolerated)
/// 3. signing secret configured
/// 4. signature, expiry and issuer valid
/// 5. user still exists
///
/// # Example
///
/// ```no_run
/// use taskboard_shared::auth::middleware::{authenticate, AuthError};
/// use taskboard_shared::store::MemoryStore;
///
/// # async fn example(header: Option<&str>) -> Result<(), AuthError> {
/// let store = MemoryStore::new();
/// let (auth, _user) = authenticate(&store, Some("secret"), header).await?;
/// println!("User: {} ({})", auth.user_id, auth.role);
/// # Ok(())
/// # }
/// ```

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::jwt::validate_token;
use crate::models::user::{User, UserRole};
use crate::store::{Store, StoreError};

/// Authenticated subject of a request
///
/// Built from the freshly loaded user, so the role is never stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthContext {
    pub user_id: Uuid,
    pub role: UserRole,
}

impl AuthContext {
    pub fn new(user_id: Uuid, role: UserRole) -> Self {
        Self { user_id, role }
    }

    pub fn from_user(user: &User) -> Self {
        Self::new(user.id, user.role)
    }

    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

/// Error type for bearer authentication
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Not authorized, token missing")]
    MissingToken,

    #[error("Not authorized, bad authorization format")]
    BadFormat,

    #[error("Server misconfigured: missing JWT secret")]
    MissingSecret,

    #[error("Not authorized, token failed")]
    InvalidToken,

    #[error("User not found")]
    UserNotFound,

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Extracts the token from a `Bearer <token>` header value
///
/// Exactly two whitespace-separated parts are required and the scheme is
/// matched case-insensitively.
pub fn parse_bearer(header: &str) -> Result<&str, AuthError> {
    let mut parts = header.split_whitespace();

    match (parts.next(), parts.next(), parts.next()) {
        (Some(scheme), Some(token), None) if scheme.eq_ignore_ascii_case("bearer") => Ok(token),
        _ => Err(AuthError::BadFormat),
    }
}

/// Authenticates a raw `Authorization` header value
pub async fn authenticate(
    store: &dyn Store,
    secret: Option<&str>,
    header: Option<&str>,
) -> Result<(AuthContext, User), AuthError> {
    let header = header
        .filter(|h| !h.trim().is_empty())
        .ok_or(AuthError::MissingToken)?;
    let token = parse_bearer(header)?;

    authenticate_token(store, secret, token).await
}

/// Authenticates a bare token
pub async fn authenticate_token(
    store: &dyn Store,
    secret: Option<&str>,
    token: &str,
) -> Result<(AuthContext, User), AuthError> {
    let secret = secret.ok_or_else(|| {
        tracing::error!("JWT secret is not configured");
        AuthError::MissingSecret
    })?;

    let claims = validate_token(token, secret).map_err(|e| {
        tracing::debug!(error = %e, "Token verification failed");
        AuthError::InvalidToken
    })?;

    let user = store
        .find_user(claims.sub)
        .await?
        .ok_or(AuthError::UserNotFound)?;

    Ok((AuthContext::from_user(&user), user))
}
