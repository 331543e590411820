//! API configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `MERIDIAN_JWT_SECRET` - Bearer-token signing secret (min 32 chars, high entropy)
//!
//! ## Optional
//! - `MERIDIAN_HOST` - Bind address (default: 127.0.0.1)
//! - `MERIDIAN_PORT` - Listen port (default: 8080)
//! - `MERIDIAN_GCP_PROJECT` - Firestore project id; presence selects the GCP
//!   backend, absence selects the in-memory one
//! - `MERIDIAN_GCS_BUCKET` - Object storage bucket (required with the GCP backend)
//! - `GOOGLE_APPLICATION_CREDENTIALS` - Service account key file path
//!   (required with the GCP backend)
//! - `SENTRY_DSN` - Sentry error tracking DSN

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};

use secrecy::SecretString;
use thiserror::Error;

const SECRET_MIN_LENGTH: usize = 32;
const SECRET_MIN_ENTROPY: f64 = 3.3;

/// Substrings that mark a secret as copy-pasted boilerplate (checked
/// case-insensitively).
const PLACEHOLDER_MARKERS: &[&str] = &[
    "your-", "changeme", "replace", "placeholder", "example", "secret", "password", "xxx",
    "todo", "fixme", "insert", "enter-", "put-your", "add-your",
];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing environment variable {0}")]
    Missing(&'static str),
    #[error("environment variable {var} is invalid: {reason}")]
    Invalid { var: &'static str, reason: String },
    #[error("{var} is not a usable secret: {reason}")]
    WeakSecret { var: &'static str, reason: String },
}

/// API application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Bearer-token signing secret
    pub jwt_secret: SecretString,
    /// GCP backend configuration; `None` selects the in-memory backend
    pub gcp: Option<GcpConfig>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
}

/// Firestore + Cloud Storage backend configuration.
#[derive(Debug, Clone)]
pub struct GcpConfig {
    /// Firestore project id
    pub project_id: String,
    /// Object storage bucket
    pub bucket: String,
    /// Path to the service account key file
    pub credentials_path: String,
}

impl AppConfig {
    /// Load configuration from environment variables, reading a `.env` file
    /// first when one exists.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when a required variable is absent or
    /// unparseable, or when the signing secret looks like a placeholder or
    /// has too little entropy.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        Ok(Self {
            host: parsed("MERIDIAN_HOST", "127.0.0.1")?,
            port: parsed("MERIDIAN_PORT", "8080")?,
            jwt_secret: signing_secret("MERIDIAN_JWT_SECRET")?,
            gcp: GcpConfig::from_env()?,
            sentry_dsn: std::env::var("SENTRY_DSN").ok(),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl GcpConfig {
    /// `Some` when `MERIDIAN_GCP_PROJECT` is set; the bucket and credentials
    /// path then become required.
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let Ok(project_id) = std::env::var("MERIDIAN_GCP_PROJECT") else {
            return Ok(None);
        };

        Ok(Some(Self {
            project_id,
            bucket: required("MERIDIAN_GCS_BUCKET")?,
            credentials_path: required("GOOGLE_APPLICATION_CREDENTIALS")?,
        }))
    }
}

fn required(var: &'static str) -> Result<String, ConfigError> {
    std::env::var(var).map_err(|_| ConfigError::Missing(var))
}

fn parsed<T>(var: &'static str, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    std::env::var(var)
        .unwrap_or_else(|_| default.to_owned())
        .parse()
        .map_err(|e: T::Err| ConfigError::Invalid {
            var,
            reason: e.to_string(),
        })
}

fn signing_secret(var: &'static str) -> Result<SecretString, ConfigError> {
    let value = required(var)?;
    vet_secret(var, &value)?;
    Ok(SecretString::from(value))
}

/// Vet a signing secret: minimum length, no placeholder markers, and enough
/// Shannon entropy that it plausibly came from a generator.
fn vet_secret(var: &'static str, value: &str) -> Result<(), ConfigError> {
    if value.len() < SECRET_MIN_LENGTH {
        return Err(ConfigError::WeakSecret {
            var,
            reason: format!("shorter than {SECRET_MIN_LENGTH} characters"),
        });
    }

    let lowered = value.to_lowercase();
    if let Some(marker) = PLACEHOLDER_MARKERS.iter().find(|m| lowered.contains(**m)) {
        return Err(ConfigError::WeakSecret {
            var,
            reason: format!("contains placeholder text '{marker}'"),
        });
    }

    let entropy = shannon_entropy(value);
    if entropy < SECRET_MIN_ENTROPY {
        return Err(ConfigError::WeakSecret {
            var,
            reason: format!(
                "entropy {entropy:.2} bits/char is below {SECRET_MIN_ENTROPY}; generate one randomly"
            ),
        });
    }

    Ok(())
}

/// Shannon entropy of the string in bits per character.
#[allow(clippy::cast_precision_loss)] // secrets are far shorter than 2^52
fn shannon_entropy(s: &str) -> f64 {
    let mut counts: HashMap<char, f64> = HashMap::new();
    for c in s.chars() {
        *counts.entry(c).or_insert(0.0) += 1.0;
    }

    let total = s.chars().count() as f64;
    counts
        .values()
        .map(|n| {
            let p = n / total;
            -p * p.log2()
        })
        .sum()
}
