/// External identity verification
///
/// An [`IdentityVerifier`] turns a third-party ID token into verified
/// profile claims. [`GoogleVerifier`] asks Google's `tokeninfo` endpoint to
/// validate the token and then checks the audience against the configured
/// client ID.

use async_trait::async_trait;
use serde::Deserialize;

/// Default Google token validation endpoint
pub const GOOGLE_TOKENINFO_URL: &str = "https://oauth2.googleapis.com/tokeninfo";

/// Verified profile claims
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalIdentity {
    /// Stable subject identifier at the provider
    pub subject: String,

    /// Email, if the provider released one
    pub email: Option<String>,

    pub name: Option<String>,

    pub picture: Option<String>,

    pub email_verified: bool,
}

/// Errors from the identity verification layer
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    /// The HTTP request itself failed
    #[error("Verifier request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The provider rejected the token
    #[error("Token rejected by provider ({status}): {body}")]
    Rejected { status: u16, body: String },

    /// Token was issued for a different client
    #[error("Token audience mismatch")]
    AudienceMismatch,
}

#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<ExternalIdentity, IdentityError>;
}

/// Response shape of the Google `tokeninfo` endpoint
///
/// Booleans arrive as the strings `"true"`/`"false"`.
#[derive(Debug, Deserialize)]
struct TokenInfo {
    aud: String,
    sub: String,
    email: Option<String>,
    email_verified: Option<String>,
    name: Option<String>,
    picture: Option<String>,
}

/// Google ID token verifier backed by `tokeninfo`
pub struct GoogleVerifier {
    client: reqwest::Client,
    tokeninfo_url: String,
    client_id: String,
}

impl GoogleVerifier {
    pub fn new(client_id: String, tokeninfo_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            tokeninfo_url,
            client_id,
        }
    }

    fn check_claims(&self, info: TokenInfo) -> Result<ExternalIdentity, IdentityError> {
        if info.aud != self.client_id {
            return Err(IdentityError::AudienceMismatch);
        }

        Ok(ExternalIdentity {
            subject: info.sub,
            email: info.email,
            name: info.name,
            picture: info.picture,
            email_verified: info.email_verified.as_deref() == Some("true"),
        })
    }
}

#[async_trait]
impl IdentityVerifier for GoogleVerifier {
    async fn verify(&self, token: &str) -> Result<ExternalIdentity, IdentityError> {
        let response = self
            .client
            .get(&self.tokeninfo_url)
            .query(&[("id_token", token)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(IdentityError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let info: TokenInfo = response.json().await?;
        self.check_claims(info)
    }
}
