//! Google Cloud Storage backend.
//!
//! Uploads and deletes go through the JSON API. Public URLs assume the
//! bucket grants public read (the deployment uploads catalog assets to a
//! world-readable bucket). Signed URLs use the V4 query-string scheme with
//! the signature produced server-side by the IAM Credentials `signBlob`
//! endpoint, so the private key never has to be loaded for raw RSA here.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::Utc;
use reqwest::StatusCode;
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use serde_json::json;
use sha2::{Digest, Sha256};

use crate::gcp::GcpTokenProvider;

use super::{ObjectStorage, StorageError};

const STORAGE_HOST: &str = "storage.googleapis.com";

/// Cloud Storage blob store for one bucket.
pub struct GcsStorage {
    client: reqwest::Client,
    bucket: String,
    tokens: Arc<GcpTokenProvider>,
}

impl GcsStorage {
    /// Create a storage client for `bucket`, sharing a token provider.
    #[must_use]
    pub fn new(bucket: String, tokens: Arc<GcpTokenProvider>) -> Self {
        Self {
            client: reqwest::Client::new(),
            bucket,
            tokens,
        }
    }

    async fn bearer(&self) -> Result<String, StorageError> {
        self.tokens
            .access_token()
            .await
            .map_err(|e| StorageError::Credentials(e.to_string()))
    }

    fn object_url(&self, path: &str) -> String {
        format!(
            "https://{STORAGE_HOST}/{}/{}",
            self.bucket,
            encode_path(path)
        )
    }

    /// Ask the IAM Credentials API to sign `payload` with the service
    /// account's key; returns the raw signature bytes.
    async fn sign_blob(&self, payload: &str) -> Result<Vec<u8>, StorageError> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct SignBlobResponse {
            signed_blob: String,
        }

        let token = self.bearer().await?;
        let url = format!(
            "https://iamcredentials.googleapis.com/v1/projects/-/serviceAccounts/{}:signBlob",
            self.tokens.client_email()
        );
        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .json(&json!({ "payload": BASE64.encode(payload) }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(StorageError::Signing(format!(
                "signBlob failed: {}",
                response.status()
            )));
        }

        let body: SignBlobResponse = response.json().await?;
        BASE64
            .decode(body.signed_blob)
            .map_err(|e| StorageError::Signing(format!("undecodable signature: {e}")))
    }
}

#[async_trait]
impl ObjectStorage for GcsStorage {
    async fn upload(
        &self,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, StorageError> {
        let token = self.bearer().await?;
        let url = format!(
            "https://{STORAGE_HOST}/upload/storage/v1/b/{}/o?uploadType=media&name={}",
            self.bucket,
            urlencoding::encode(path)
        );
        let response = self
            .client
            .post(&url)
            .bearer_auth(token)
            .header(CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(StorageError::Rejected(format!("{status}: {body}")));
        }

        Ok(self.object_url(path))
    }

    async fn delete(&self, path: &str) -> Result<(), StorageError> {
        let token = self.bearer().await?;
        let url = format!(
            "https://{STORAGE_HOST}/storage/v1/b/{}/o/{}",
            self.bucket,
            urlencoding::encode(path)
        );
        let response = self.client.delete(&url).bearer_auth(token).send().await?;

        // Absent blobs are treated as already deleted.
        if !response.status().is_success() && response.status() != StatusCode::NOT_FOUND {
            return Err(StorageError::Rejected(format!(
                "delete failed: {}",
                response.status()
            )));
        }
        Ok(())
    }

    async fn public_url(&self, path: &str) -> Result<Option<String>, StorageError> {
        Ok(Some(self.object_url(path)))
    }

    async fn signed_url(&self, path: &str, ttl: Duration) -> Result<String, StorageError> {
        let now = Utc::now();
        let datestamp = now.format("%Y%m%d").to_string();
        let timestamp = now.format("%Y%m%dT%H%M%SZ").to_string();

        let scope = format!("{datestamp}/auto/storage/goog4_request");
        let credential = format!("{}/{scope}", self.tokens.client_email());

        let canonical_uri = format!("/{}/{}", self.bucket, encode_path(path));
        // Query parameters must be listed in sorted order.
        let canonical_query = format!(
            "X-Goog-Algorithm=GOOG4-RSA-SHA256\
             &X-Goog-Credential={}\
             &X-Goog-Date={timestamp}\
             &X-Goog-Expires={}\
             &X-Goog-SignedHeaders=host",
            urlencoding::encode(&credential),
            ttl.as_secs()
        );

        let canonical_request = format!(
            "GET\n{canonical_uri}\n{canonical_query}\nhost:{STORAGE_HOST}\n\nhost\nUNSIGNED-PAYLOAD"
        );
        let request_hash = hex(Sha256::digest(canonical_request.as_bytes()).as_slice());
        let string_to_sign =
            format!("GOOG4-RSA-SHA256\n{timestamp}\n{scope}\n{request_hash}");

        let signature = hex(&self.sign_blob(&string_to_sign).await?);

        Ok(format!(
            "https://{STORAGE_HOST}{canonical_uri}?{canonical_query}&X-Goog-Signature={signature}"
        ))
    }
}

/// Percent-encode a blob path segment by segment, preserving slashes.
fn encode_path(path: &str) -> String {
    path.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().fold(String::new(), |mut out, b| {
        use std::fmt::Write as _;
        let _ = write!(out, "{b:02x}");
        out
    })
}
