//! Client error types.
//!
//! Core reports failures as a JSON body `{"error": "...", "trace": [...]}`
//! next to a non-200 status. Transport failures use the pseudo status `1`.

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

/// Status used when the request never produced an HTTP response.
pub const TRANSPORT_FAILURE_STATUS: u16 = 1;

/// Error body returned by Komodo Core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(default)]
    pub trace: Vec<String>,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            trace: Vec::new(),
        }
    }

    pub fn with_trace(mut self, line: impl Into<String>) -> Self {
        self.trace.push(line.into());
        self
    }
}

impl std::fmt::Display for ErrorBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.error)?;
        for line in &self.trace {
            write!(f, " | {line}")?;
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Core answered with a non-200 status, or the request failed in transit.
    #[error("request failed with status {status}: {result}")]
    Api { status: u16, result: ErrorBody },

    /// A 200 response whose body did not match the expected type.
    #[error("failed to decode response: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("failed to encode message: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("terminal stream failed: {0}")]
    Stream(#[from] tokio_util::codec::AnyDelimiterCodecError),

    /// Core refused the websocket login message.
    #[error("websocket login rejected: {0}")]
    LoginRejected(String),

    #[error("invalid client configuration: {0}")]
    Config(String),
}

impl ClientError {
    pub(crate) fn transport(cause: impl std::fmt::Debug) -> Self {
        Self::Api {
            status: TRANSPORT_FAILURE_STATUS,
            result: ErrorBody::new("Request failed with error").with_trace(format!("{cause:?}")),
        }
    }

    pub(crate) fn unreadable_body(status: StatusCode, cause: impl std::fmt::Debug) -> Self {
        Self::Api {
            status: status.as_u16(),
            result: ErrorBody::new("Failed to get response body").with_trace(format!("{cause:?}")),
        }
    }

    /// Status code for [`ClientError::Api`], if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True when no HTTP response was received at all.
    pub fn is_transport(&self) -> bool {
        self.status() == Some(TRANSPORT_FAILURE_STATUS)
    }
}

pub type ClientResult<T> = Result<T, ClientError>;
