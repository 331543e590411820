//! Bearer token service.
//!
//! HS256 JWTs with a one-hour lifetime. The subject claim carries the user
//! id; nothing else is encoded, so a token grants exactly "this user is
//! authenticated" and any per-request data comes from the store.

use chrono::Utc;
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use meridian_core::UserId;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Token lifetime in seconds.
const TOKEN_TTL_SECS: i64 = 60 * 60;

/// Errors from token verification or minting.
#[derive(Debug, Error)]
pub enum TokenError {
    /// Token was valid once but has expired.
    #[error("token expired")]
    Expired,

    /// Token is malformed or its signature does not check out.
    #[error("invalid token")]
    Invalid,

    /// Token could not be minted.
    #[error("token encoding failed")]
    Encoding,
}

/// Claims carried by every issued token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: String,
    /// Issued-at, unix seconds.
    pub iat: i64,
    /// Expiry, unix seconds.
    pub exp: i64,
}

impl Claims {
    /// The authenticated user's id.
    #[must_use]
    pub fn user_id(&self) -> UserId {
        UserId::new(self.sub.clone())
    }
}

/// Mints and verifies bearer tokens from one shared secret.
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl TokenService {
    /// Build a service from the configured signing secret.
    #[must_use]
    pub fn new(secret: &SecretString) -> Self {
        let bytes = secret.expose_secret().as_bytes();
        Self {
            encoding: EncodingKey::from_secret(bytes),
            decoding: DecodingKey::from_secret(bytes),
            validation: Validation::new(Algorithm::HS256),
        }
    }

    /// Mint a token for `user_id`.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Encoding`] if signing fails.
    pub fn issue(&self, user_id: &UserId) -> Result<String, TokenError> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: user_id.as_str().to_owned(),
            iat: now,
            exp: now + TOKEN_TTL_SECS,
        };
        encode(&Header::default(), &claims, &self.encoding).map_err(|_| TokenError::Encoding)
    }

    /// Verify a token and return its claims.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Expired`] past the expiry claim, otherwise
    /// [`TokenError::Invalid`] for anything that does not verify.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid,
            })
    }
}
