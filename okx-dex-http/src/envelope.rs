//! Response envelope decoding.
//!
//! Every aggregator response is wrapped as `{"code": "0", "msg": "", "data": ...}`.
//! `code` is a string on most endpoints and an integer on a few; `data` is
//! usually an array but some endpoints return a bare object or `null`.

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::ApiClientError;

/// Success code of the envelope.
pub const SUCCESS_CODE: &str = "0";

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Code {
    Text(String),
    Number(i64),
}

/// The raw `{code, msg, data}` envelope.
#[derive(Debug, Deserialize)]
pub struct ApiEnvelope {
    code: Code,
    #[serde(default)]
    msg: String,
    #[serde(default)]
    data: Value,
}

impl ApiEnvelope {
    /// Returns the envelope code as a string.
    #[must_use]
    pub fn code(&self) -> String {
        match &self.code {
            Code::Text(code) => code.clone(),
            Code::Number(code) => code.to_string(),
        }
    }

    /// Returns the envelope message.
    #[must_use]
    pub fn msg(&self) -> &str {
        &self.msg
    }

    /// Checks the code and decodes `data` as a list of records.
    ///
    /// A `null` payload is an empty list; a bare object is a one-item list.
    ///
    /// # Errors
    ///
    /// Returns [`ApiClientError::Api`] for a non-zero code and
    /// [`ApiClientError::Payload`] if an item does not decode as `T`.
    pub fn into_items<T>(self, context: &'static str) -> Result<Vec<T>, ApiClientError>
    where
        T: DeserializeOwned,
    {
        let code = self.code();
        if code != SUCCESS_CODE {
            return Err(ApiClientError::Api {
                context,
                code,
                msg: self.msg,
            });
        }
        let items = match self.data {
            Value::Null => Vec::new(),
            Value::Array(items) => items,
            other => vec![other],
        };
        items
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<T>, _>>()
            .map_err(|source| ApiClientError::Payload { context, source })
    }

    /// Like [`Self::into_items`], returning the first record.
    ///
    /// # Errors
    ///
    /// Additionally returns [`ApiClientError::EmptyData`] if there is no record.
    pub fn into_first<T>(self, context: &'static str) -> Result<T, ApiClientError>
    where
        T: DeserializeOwned,
    {
        self.into_items(context)?
            .into_iter()
            .next()
            .ok_or(ApiClientError::EmptyData { context })
    }
}
