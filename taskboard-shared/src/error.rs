/// Service-level error type
///
/// Every service operation returns [`ServiceError`]. The variant encodes the
/// error class; the HTTP layer maps it to a status code and surfaces the
/// message string unchanged.
///
/// | Variant | Status |
/// |---|---|
/// | `Validation`, `Conflict` | 400 |
/// | `Unauthorized`, `Upstream` | 401 |
/// | `Forbidden` | 403 |
/// | `NotFound` | 404 |
/// | `Config`, `Internal`, `Store` | 500 |

use crate::auth::jwt::JwtError;
use crate::auth::password::PasswordError;
use crate::store::StoreError;

/// Service result type alias
pub type ServiceResult<T> = Result<T, ServiceError>;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Malformed or missing input
    #[error("{0}")]
    Validation(String),

    /// Missing or invalid credential
    #[error("{0}")]
    Unauthorized(String),

    /// Authenticated but not permitted
    #[error("{0}")]
    Forbidden(String),

    /// Referenced entity absent
    #[error("{0}")]
    NotFound(String),

    /// Integrity rule violated (e.g. duplicate email)
    #[error("{0}")]
    Conflict(String),

    /// Required server configuration missing
    #[error("{0}")]
    Config(String),

    /// External identity verifier failure
    #[error("{0}")]
    Upstream(String),

    /// Unexpected internal failure
    #[error("{0}")]
    Internal(String),

    /// Persistence failure
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ServiceError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }
}

impl From<PasswordError> for ServiceError {
    fn from(e: PasswordError) -> Self {
        Self::Internal(e.to_string())
    }
}

impl From<JwtError> for ServiceError {
    fn from(e: JwtError) -> Self {
        Self::Internal(e.to_string())
    }
}
