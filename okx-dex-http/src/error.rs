//! Errors raised while talking to the aggregator.

use http::StatusCode;
use okx_dex::DexError;

/// Errors that can occur while interacting with the aggregator.
#[derive(Debug, thiserror::Error)]
pub enum ApiClientError {
    /// URL parse error.
    #[error("URL parse error: {context}: {source}")]
    UrlParse {
        /// Human-readable context.
        context: &'static str,
        /// The underlying parse error.
        #[source]
        source: url::ParseError,
    },
    /// HTTP transport error.
    #[error("HTTP error: {context}: {source}")]
    Http {
        /// Human-readable context.
        context: &'static str,
        /// The underlying reqwest error.
        #[source]
        source: reqwest::Error,
    },
    /// The response body was not a valid envelope.
    #[error("Failed to deserialize JSON: {context}: {source}")]
    JsonDeserialization {
        /// Human-readable context.
        context: &'static str,
        /// The underlying reqwest error.
        #[source]
        source: reqwest::Error,
    },
    /// Unexpected HTTP status code.
    #[error("Unexpected HTTP status {status}: {context}: {body}")]
    HttpStatus {
        /// Human-readable context.
        context: &'static str,
        /// The HTTP status code.
        status: StatusCode,
        /// The response body.
        body: String,
    },
    /// Failed to read response body.
    #[error("Failed to read response body as text: {context}: {source}")]
    ResponseBodyRead {
        /// Human-readable context.
        context: &'static str,
        /// The underlying reqwest error.
        #[source]
        source: reqwest::Error,
    },
    /// The envelope carried a non-zero code.
    #[error("Aggregator returned code {code}: {context}: {msg}")]
    Api {
        /// Human-readable context.
        context: &'static str,
        /// Aggregator error code.
        code: String,
        /// Aggregator error message.
        msg: String,
    },
    /// The envelope's `data` did not match the expected record.
    #[error("Unexpected payload: {context}: {source}")]
    Payload {
        /// Human-readable context.
        context: &'static str,
        /// The underlying serde error.
        #[source]
        source: serde_json::Error,
    },
    /// The envelope's `data` was empty where a record was required.
    #[error("Empty response data: {context}")]
    EmptyData {
        /// Human-readable context.
        context: &'static str,
    },
    /// Request body serialization failed.
    #[error("Failed to serialize request body: {context}: {source}")]
    JsonSerialization {
        /// Human-readable context.
        context: &'static str,
        /// The underlying serde error.
        #[source]
        source: serde_json::Error,
    },
    /// Computing the request signature failed.
    #[error("Failed to sign request: {0}")]
    Signing(String),
}

impl From<ApiClientError> for DexError {
    fn from(err: ApiClientError) -> Self {
        match err {
            ApiClientError::Api { code, msg, .. } => Self::ExternalApi {
                code: Some(code),
                message: msg,
            },
            ApiClientError::HttpStatus { status, .. } => Self::ExternalApi {
                code: Some(status.as_str().to_owned()),
                message: err.to_string(),
            },
            other => Self::external(other.to_string()),
        }
    }
}
