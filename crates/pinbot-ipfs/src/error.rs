//! Error types for pinbot-ipfs.

use reqwest::StatusCode;
use thiserror::Error;

/// Result type for pinbot-ipfs operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by the storage and cluster clients.
#[derive(Debug, Error)]
pub enum Error {
    /// The text is not a valid content identifier.
    #[error("invalid cid {input:?}: {reason}")]
    MalformedCid { input: String, reason: String },

    /// An API address could not be understood.
    #[error("invalid API address {0:?}")]
    InvalidAddress(String),

    /// The request never produced a response (connect, TLS, timeout).
    #[error("{0}")]
    Transport(#[from] reqwest::Error),

    /// The remote answered with a non-success status.
    #[error("{status}: {message}")]
    Api { status: StatusCode, message: String },

    /// The response body could not be decoded.
    #[error("unexpected response: {0}")]
    Decode(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Decode(e.to_string())
    }
}

impl Error {
    /// Build an [`Error::Api`] from a non-success response.
    ///
    /// Both the daemon (`{"Message": ...}`) and cluster (`{"message": ...}`) error
    /// bodies are understood; anything else is passed through as text.
    pub(crate) async fn from_response(resp: reqwest::Response) -> Self {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        Error::Api {
            status,
            message: error_message(&body),
        }
    }
}

fn error_message(body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["Message", "message"] {
            if let Some(msg) = value.get(key).and_then(|m| m.as_str()) {
                return msg.to_string();
            }
        }
    }
    let body = body.trim();
    if body.is_empty() {
        "empty response body".to_string()
    } else {
        body.to_string()
    }
}
