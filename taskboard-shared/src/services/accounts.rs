/// Account operations
///
/// Registration, password login, external identity login, profile lookup
/// and the admin user listing. Successful logins return an
/// [`AuthResponse`] with a freshly signed bearer token.
///
/// Accounts created through the external identity flow have no password
/// hash; password login for them always fails with the generic
/// `Invalid email or password`.

use chrono::Duration;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::identity::IdentityVerifier;
use crate::auth::jwt::{create_token, Claims};
use crate::auth::middleware::AuthContext;
use crate::auth::password::{hash_password, verify_optional};
use crate::auth::policy;
use crate::error::{ServiceError, ServiceResult};
use crate::models::user::{normalize_email, CreateUser, UpdateUser, User, UserRole};
use crate::store::{Store, StoreError};

/// Signs bearer tokens for authenticated users
#[derive(Debug, Clone)]
pub struct TokenIssuer {
    secret: Option<String>,
    lifetime: Duration,
}

impl TokenIssuer {
    pub fn new(secret: Option<String>, lifetime: Duration) -> Self {
        Self { secret, lifetime }
    }

    pub fn secret(&self) -> Option<&str> {
        self.secret.as_deref()
    }

    pub fn issue(&self, user_id: Uuid) -> ServiceResult<String> {
        let secret = self.secret.as_deref().ok_or_else(|| {
            ServiceError::Config("Server misconfigured: missing JWT secret".to_string())
        })?;

        Ok(create_token(&Claims::new(user_id, self.lifetime), secret)?)
    }
}

/// Body returned by register and login endpoints
#[derive(Debug, Clone, Serialize)]
pub struct AuthResponse {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: UserRole,
    pub token: String,
}

impl AuthResponse {
    fn new(user: &User, token: String) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
            token,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RegisterInput {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Option<UserRole>,
}

/// Creates a password account
///
/// `admin` may only be requested when `allow_admin_signup` is set.
pub async fn register(
    store: &dyn Store,
    issuer: &TokenIssuer,
    input: RegisterInput,
    allow_admin_signup: bool,
) -> ServiceResult<AuthResponse> {
    let name = input.name.trim();
    let email = normalize_email(&input.email);
    if name.is_empty() || email.is_empty() || input.password.is_empty() {
        return Err(ServiceError::validation(
            "Please provide name, email and password",
        ));
    }

    let role = input.role.unwrap_or_default();
    if role.is_admin() && !allow_admin_signup {
        return Err(ServiceError::forbidden("Cannot self-register as admin"));
    }

    if store.find_user_by_email(&email).await?.is_some() {
        return Err(email_taken());
    }

    let user = store
        .create_user(CreateUser {
            name: name.to_string(),
            email,
            password_hash: Some(hash_password(&input.password)?),
            role,
            google_id: None,
            avatar_url: None,
        })
        .await
        .map_err(|e| match e {
            StoreError::Duplicate(_) => email_taken(),
            other => other.into(),
        })?;

    info!(user_id = %user.id, role = %user.role, "User registered");

    let token = issuer.issue(user.id)?;
    Ok(AuthResponse::new(&user, token))
}

pub async fn login(
    store: &dyn Store,
    issuer: &TokenIssuer,
    email: &str,
    password: &str,
) -> ServiceResult<AuthResponse> {
    let email = normalize_email(email);
    if email.is_empty() || password.is_empty() {
        return Err(ServiceError::validation("Please provide email and password"));
    }

    let user = match store.find_user_by_email(&email).await? {
        Some(user) if verify_optional(password, user.password_hash.as_deref())? => user,
        _ => {
            return Err(ServiceError::Unauthorized(
                "Invalid email or password".to_string(),
            ))
        }
    };

    info!(user_id = %user.id, "User logged in");

    let token = issuer.issue(user.id)?;
    Ok(AuthResponse::new(&user, token))
}

/// Signs in with an external ID token
///
/// An existing account with the same email gets the external subject linked
/// (and the provider picture, if it has no avatar). Otherwise a password-less
/// member account is created.
pub async fn google_login(
    store: &dyn Store,
    issuer: &TokenIssuer,
    verifier: Option<&dyn IdentityVerifier>,
    token: &str,
    expose_errors: bool,
) -> ServiceResult<AuthResponse> {
    if token.trim().is_empty() {
        return Err(ServiceError::validation("Google token is required"));
    }
    let verifier = verifier
        .ok_or_else(|| ServiceError::Config("Google login is not configured".to_string()))?;

    let identity = verifier.verify(token.trim()).await.map_err(|e| {
        warn!(error = %e, "External identity verification failed");
        let message = if expose_errors {
            format!("Google authentication failed: {}", e)
        } else {
            "Google authentication failed".to_string()
        };
        ServiceError::Upstream(message)
    })?;

    let email = identity
        .email
        .as_deref()
        .map(normalize_email)
        .filter(|e| !e.is_empty())
        .ok_or_else(|| ServiceError::validation("Google payload missing email"))?;

    let user = match store.find_user_by_email(&email).await? {
        Some(user) => link_identity(store, user, &identity.subject, identity.picture).await?,
        None => {
            let name = identity
                .name
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| email.split('@').next().unwrap_or_default().to_string());

            let created = store
                .create_user(CreateUser {
                    name,
                    email: email.clone(),
                    password_hash: None,
                    role: UserRole::Member,
                    google_id: Some(identity.subject.clone()),
                    avatar_url: identity.picture.clone(),
                })
                .await;

            match created {
                Ok(user) => {
                    info!(user_id = %user.id, "Account created from external identity");
                    user
                }
                // Lost a race with a concurrent first login for the same email
                Err(StoreError::Duplicate(_)) => {
                    let user = store
                        .find_user_by_email(&email)
                        .await?
                        .ok_or_else(|| ServiceError::Internal("Failed to find or create user".to_string()))?;
                    link_identity(store, user, &identity.subject, identity.picture).await?
                }
                Err(e) => return Err(e.into()),
            }
        }
    };

    let token = issuer.issue(user.id)?;
    Ok(AuthResponse::new(&user, token))
}

/// The actor's own profile
pub async fn me(store: &dyn Store, actor: &AuthContext) -> ServiceResult<User> {
    store
        .find_user(actor.user_id)
        .await?
        .ok_or_else(|| ServiceError::not_found("User not found"))
}

/// All users, paged; admins only
pub async fn list_users(
    store: &dyn Store,
    actor: &AuthContext,
    page: i64,
    limit: i64,
) -> ServiceResult<Vec<User>> {
    if !policy::authorize(actor, &[UserRole::Admin]) {
        return Err(ServiceError::forbidden("Forbidden: insufficient role"));
    }

    let limit = limit.clamp(1, 100);
    let offset = (page.max(1) - 1).saturating_mul(limit);
    Ok(store.list_users(limit, offset).await?)
}

async fn link_identity(
    store: &dyn Store,
    user: User,
    subject: &str,
    picture: Option<String>,
) -> ServiceResult<User> {
    let mut update = UpdateUser::default();
    if user.google_id.as_deref() != Some(subject) {
        update.google_id = Some(Some(subject.to_string()));
    }
    if user.avatar_url.is_none() && picture.is_some() {
        update.avatar_url = Some(picture);
    }

    if update.google_id.is_none() && update.avatar_url.is_none() {
        return Ok(user);
    }

    info!(user_id = %user.id, "Linked external identity");
    Ok(store.update_user(user.id, update).await?.unwrap_or(user))
}

fn email_taken() -> ServiceError {
    ServiceError::Conflict("User with that email already exists".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::validate_token;

    #[test]
    fn test_issuer_requires_secret() {
        let issuer = TokenIssuer::new(None, Duration::days(7));
        match issuer.issue(Uuid::new_v4()) {
            Err(ServiceError::Config(msg)) => {
                assert_eq!(msg, "Server misconfigured: missing JWT secret")
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_issued_token_carries_subject() {
        let issuer = TokenIssuer::new(Some("secret".to_string()), Duration::hours(1));
        let user_id = Uuid::new_v4();

        let token = issuer.issue(user_id).unwrap();
        assert_eq!(validate_token(&token, "secret").unwrap().sub, user_id);
    }
}
