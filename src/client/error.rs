//! Errors returned by the management API clients.

use serde::Deserialize;
use thiserror::Error;

/// A failure talking to the remote management API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The API answered with a non-success HTTP status.
    #[error("unexpected status {status} ({code}): {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// ARM error code, e.g. `ResourceNotFound`.
        code: String,
        /// ARM error message.
        message: String,
    },

    /// The request could not be sent or the response could not be read.
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The response body did not match the expected shape.
    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    /// A long-running operation reached a terminal state other than success.
    #[error("operation finished with status {status}: {message}")]
    OperationFailed {
        /// Terminal status reported by the API (`Failed`, `Canceled`).
        status: String,
        /// Error message attached to the operation, if any.
        message: String,
    },

    /// The operation's deadline passed before the call completed.
    #[error("timed out waiting for the operation to complete")]
    Timeout,

    /// The operation was cancelled by the host.
    #[error("operation was cancelled")]
    Cancelled,
}

impl ApiError {
    /// Build a status error.
    pub fn status(status: u16, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Status {
            status,
            code: code.into(),
            message: message.into(),
        }
    }

    /// Build the 404 the API returns for an absent object.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::status(404, "ResourceNotFound", message)
    }

    /// The HTTP status, when the API answered at all.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Transport(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Whether the remote object does not exist.
    pub fn is_not_found(&self) -> bool {
        self.status_code() == Some(404)
    }

    /// Decode an ARM error body (`{"error": {"code": .., "message": ..}}`).
    ///
    /// Bodies that are not ARM error documents keep their raw text as the
    /// message.
    pub fn from_response(status: u16, body: &str) -> Self {
        #[derive(Deserialize)]
        struct Envelope {
            error: Option<ErrorBody>,
        }

        match serde_json::from_str::<Envelope>(body) {
            Ok(Envelope {
                error: Some(ErrorBody { code, message }),
            }) => Self::status(
                status,
                code.unwrap_or_default(),
                message.unwrap_or_default(),
            ),
            _ => Self::status(status, String::new(), body.trim().to_string()),
        }
    }
}

/// The `error` object ARM attaches to failures and failed operations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ErrorBody {
    /// Machine-readable error code.
    pub code: Option<String>,
    /// Human-readable message.
    pub message: Option<String>,
}
