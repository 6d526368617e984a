//! Request authentication.
//!
//! The aggregator authenticates each request with
//! `base64(HMAC-SHA256(secret, timestamp + METHOD + requestPath + body))`,
//! where `requestPath` includes the query string exactly as sent.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::fmt;

use crate::error::ApiClientError;

type HmacSha256 = Hmac<Sha256>;

/// API credentials issued by the aggregator's developer portal.
#[derive(Clone)]
pub struct Credentials {
    /// API key.
    pub api_key: String,
    /// Secret used to sign requests.
    pub secret_key: String,
    /// Passphrase chosen when the key was created.
    pub passphrase: String,
    /// Optional project identifier.
    pub project_id: Option<String>,
}

impl Credentials {
    /// Creates credentials without a project identifier.
    #[must_use]
    pub fn new(
        api_key: impl Into<String>,
        secret_key: impl Into<String>,
        passphrase: impl Into<String>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            secret_key: secret_key.into(),
            passphrase: passphrase.into(),
            project_id: None,
        }
    }

    /// Attaches a project identifier.
    #[must_use]
    pub fn with_project_id(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = Some(project_id.into());
        self
    }

    /// Signs a request.
    ///
    /// # Errors
    ///
    /// Returns [`ApiClientError::Signing`] if the secret cannot key an HMAC.
    pub fn sign(
        &self,
        timestamp: &str,
        method: &str,
        request_path: &str,
        body: &str,
    ) -> Result<String, ApiClientError> {
        sign(
            &self.secret_key,
            &prehash(timestamp, method, request_path, body),
        )
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &self.api_key)
            .field("secret_key", &"***")
            .field("passphrase", &"***")
            .field("project_id", &self.project_id)
            .finish()
    }
}

/// Formats a timestamp the way the aggregator expects (`2024-01-01T00:00:00.000Z`).
#[must_use]
pub fn timestamp(now: DateTime<Utc>) -> String {
    now.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

/// Builds the signed request path from a path and query parameters.
///
/// Parameters are form-urlencoded in order; encoded commas are restored so
/// list parameters such as `chains=1,56` are signed as sent.
#[must_use]
pub fn request_path<K, V>(path: &str, params: &[(K, V)]) -> String
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    if params.is_empty() {
        return path.to_owned();
    }
    let query = url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(params.iter().map(|(k, v)| (k.as_ref(), v.as_ref())))
        .finish()
        .replace("%2C", ",");
    format!("{path}?{query}")
}

/// Concatenates the fields covered by the signature.
#[must_use]
pub fn prehash(timestamp: &str, method: &str, request_path: &str, body: &str) -> String {
    format!("{timestamp}{method}{request_path}{body}")
}

/// Computes `base64(HMAC-SHA256(secret, message))`.
///
/// # Errors
///
/// Returns [`ApiClientError::Signing`] if the secret cannot key an HMAC.
pub fn sign(secret: &str, message: &str) -> Result<String, ApiClientError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| ApiClientError::Signing(e.to_string()))?;
    mac.update(message.as_bytes());
    Ok(BASE64_STANDARD.encode(mac.finalize().into_bytes()))
}
