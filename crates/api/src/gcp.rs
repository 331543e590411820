//! Service-account credentials for Google Cloud APIs.
//!
//! Both the Firestore store and the Cloud Storage client authenticate with a
//! short-lived OAuth access token obtained through the JWT-bearer grant: the
//! service-account key signs an RS256 assertion which is exchanged at the
//! token endpoint. Tokens are cached until shortly before expiry and the
//! provider is shared behind an `Arc`.

use std::path::Path;

use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;

/// OAuth scopes the catalog needs: Firestore, Storage, and signBlob.
pub const SCOPES: &str = "https://www.googleapis.com/auth/datastore \
    https://www.googleapis.com/auth/devstorage.read_write \
    https://www.googleapis.com/auth/iam";

/// Lifetime requested for each assertion and the safety margin applied to
/// cached tokens.
const ASSERTION_LIFETIME_SECS: i64 = 3600;
const EXPIRY_MARGIN_SECS: i64 = 60;

/// Errors acquiring service-account credentials.
#[derive(Debug, Error)]
pub enum GcpError {
    /// Key file could not be read.
    #[error("cannot read service account key: {0}")]
    KeyFile(#[from] std::io::Error),

    /// Key file is not a valid service-account JSON document.
    #[error("invalid service account key: {0}")]
    KeyFormat(#[from] serde_json::Error),

    /// The private key could not sign the assertion.
    #[error("cannot sign token assertion: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),

    /// Transport failure reaching the token endpoint.
    #[error("token endpoint unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    /// The token endpoint refused the exchange.
    #[error("token exchange rejected: {0}")]
    Exchange(String),
}

/// The fields of a service-account key file the provider needs.
#[derive(Debug, Clone, Deserialize)]
struct ServiceAccountKey {
    client_email: String,
    private_key: String,
    token_uri: String,
}

#[derive(Serialize)]
struct GrantClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

struct CachedToken {
    token: String,
    expires_at: i64,
}

/// Cached access-token provider for a single service account.
pub struct GcpTokenProvider {
    client: reqwest::Client,
    key: ServiceAccountKey,
    encoding_key: EncodingKey,
    scopes: String,
    cached: Mutex<Option<CachedToken>>,
}

impl GcpTokenProvider {
    /// Load a provider from a service-account key file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not a service-account
    /// key, or carries an unusable private key.
    pub fn from_file(path: impl AsRef<Path>, scopes: &str) -> Result<Self, GcpError> {
        let raw = std::fs::read_to_string(path)?;
        let key: ServiceAccountKey = serde_json::from_str(&raw)?;
        let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())?;

        Ok(Self {
            client: reqwest::Client::new(),
            key,
            encoding_key,
            scopes: scopes.to_owned(),
            cached: Mutex::new(None),
        })
    }

    /// Email of the underlying service account (used as the signed-URL
    /// credential identity).
    #[must_use]
    pub fn client_email(&self) -> &str {
        &self.key.client_email
    }

    /// A valid access token, freshly exchanged or served from cache.
    ///
    /// # Errors
    ///
    /// Returns `GcpError` if signing or the exchange fails.
    pub async fn access_token(&self) -> Result<String, GcpError> {
        let mut cached = self.cached.lock().await;
        let now = Utc::now().timestamp();

        if let Some(token) = cached.as_ref()
            && token.expires_at - EXPIRY_MARGIN_SECS > now
        {
            return Ok(token.token.clone());
        }

        let assertion = self.sign_assertion(now)?;
        let response = self
            .client
            .post(&self.key.token_uri)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(GcpError::Exchange(format!("{status}: {body}")));
        }

        let token: TokenResponse = response.json().await?;
        let access = token.access_token.clone();
        *cached = Some(CachedToken {
            token: token.access_token,
            expires_at: now + token.expires_in,
        });

        Ok(access)
    }

    fn sign_assertion(&self, now: i64) -> Result<String, GcpError> {
        let claims = GrantClaims {
            iss: &self.key.client_email,
            scope: &self.scopes,
            aud: &self.key.token_uri,
            iat: now,
            exp: now + ASSERTION_LIFETIME_SECS,
        };
        Ok(jsonwebtoken::encode(
            &Header::new(Algorithm::RS256),
            &claims,
            &self.encoding_key,
        )?)
    }
}
