// Response envelope
//
// Every remote call resolves to `{ success, data, message?, error? }`.
// Bodies that already carry a `success` field pass through unchanged;
// anything else is wrapped as a successful payload.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Canonical result of a remote call.
///
/// When `success` is true, `data` is the sole source of truth. When it is
/// false, `data` must be ignored and `error` / `message` explain the failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> Envelope<T> {
    /// A successful envelope around `data`.
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            error: None,
        }
    }

    /// An unsuccessful envelope with an error message.
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: None,
            error: Some(error.into()),
        }
    }

    /// Returns `true` when the envelope is successful and carries data.
    pub fn is_usable(&self) -> bool {
        self.success && self.data.is_some()
    }

    /// Best available explanation for an unsuccessful envelope.
    pub fn failure_message(&self) -> String {
        self.error
            .clone()
            .or_else(|| self.message.clone())
            .unwrap_or_else(|| "API request failed".into())
    }

    /// Unwrap the payload, turning `{success: false}` or a missing `data`
    /// into [`Error::Api`].
    pub fn into_data(self) -> Result<T, Error> {
        if !self.success {
            return Err(Error::Api {
                message: self.failure_message(),
            });
        }
        self.data.ok_or_else(|| Error::Api {
            message: "response marked successful but carried no data".into(),
        })
    }

    /// Transform the payload, keeping the envelope metadata.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Envelope<U> {
        Envelope {
            success: self.success,
            data: self.data.map(f),
            message: self.message,
            error: self.error,
        }
    }
}

impl Envelope<serde_json::Value> {
    /// Normalize a decoded 2xx body.
    ///
    /// Objects with a `success` key are taken as-is; every other JSON value
    /// is wrapped as `{success: true, data: body}`.
    pub fn normalize(body: serde_json::Value) -> Result<Self, Error> {
        let wrapped = body
            .as_object()
            .is_some_and(|obj| obj.contains_key("success"));

        if wrapped {
            serde_json::from_value(body.clone()).map_err(|e| Error::Parse {
                message: format!("malformed envelope: {e}"),
                body: body.to_string(),
            })
        } else {
            Ok(Self::ok(body))
        }
    }

    /// Decode the raw payload into a typed envelope.
    ///
    /// Unsuccessful envelopes keep their metadata and drop `data` without
    /// attempting to decode it.
    pub fn decode<T: DeserializeOwned>(self) -> Result<Envelope<T>, Error> {
        if !self.success {
            return Ok(Envelope {
                success: false,
                data: None,
                message: self.message,
                error: self.error,
            });
        }

        let data = match self.data {
            Some(value) => {
                let raw = value.to_string();
                let typed = serde_json::from_value(value).map_err(|e| Error::Parse {
                    message: format!("{e} (body preview: {:?})", body_preview(&raw)),
                    body: raw.clone(),
                })?;
                Some(typed)
            }
            None => None,
        };

        Ok(Envelope {
            success: true,
            data,
            message: self.message,
            error: self.error,
        })
    }
}

/// First 200 characters of a response body, cut on a char boundary.
pub(crate) fn body_preview(body: &str) -> &str {
    match body.char_indices().nth(200) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}
