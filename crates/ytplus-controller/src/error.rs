//! Error taxonomy for controller operations.

use std::time::Duration;

use thiserror::Error;

/// Result alias for controller operations.
pub type ControllerResult<T> = Result<T, ControllerError>;

/// Failures surfaced by the controller and the backend client.
///
/// None of these are fatal: every path leaves the controller idle and ready to
/// retry.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ControllerError {
    /// Input was rejected before any request was made.
    #[error("{0}")]
    Validation(String),
    /// The backend answered with a non-success status.
    #[error("{endpoint} rejected the request (status {status}): {message}")]
    Rejected {
        /// Endpoint path that was called.
        endpoint: &'static str,
        /// HTTP status code.
        status: u16,
        /// Server-provided error text.
        message: String,
    },
    /// The request never produced a response.
    #[error("request to {endpoint} failed: {detail}")]
    Transport {
        /// Endpoint path that was called.
        endpoint: &'static str,
        /// Transport error description.
        detail: String,
    },
    /// The response body could not be decoded.
    #[error("failed to decode {endpoint} response: {detail}")]
    Decode {
        /// Endpoint path that was called.
        endpoint: &'static str,
        /// Decoder error description.
        detail: String,
    },
    /// The request did not finish within its time budget.
    #[error("request to {endpoint} timed out after {}s", .after.as_secs_f32())]
    Timeout {
        /// Endpoint path that was called.
        endpoint: &'static str,
        /// Budget that elapsed.
        after: Duration,
    },
    /// The backend base URL could not be combined with an endpoint path.
    #[error("invalid API URL: {0}")]
    InvalidUrl(String),
}

impl ControllerError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Whether the error was raised before any network call.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Text suitable for an inline notice.
    ///
    /// Rejections show only the server's message; everything else shows the
    /// full description.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(message) | Self::Rejected { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}
