//! Gateway client errors and error classification

use thiserror::Error;

/// How a failed remote call should be treated by callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Throttling or server-side failure; worth retrying after a wait
    Retryable,
    /// The target does not exist; only meaningful to delete
    NotFound,
    /// Malformed request or unknown failure; retrying will not help
    Fatal,
}

const RETRYABLE_CODES: &[&str] = &[
    "ThrottlingException",
    "TooManyRequestsException",
    "RequestLimitExceeded",
    "InternalServerException",
    "ServiceUnavailableException",
    "InternalFailure",
];

const NOT_FOUND_CODE: &str = "ResourceNotFoundException";

/// Classifies an AWS error code.
///
/// Validation codes (`ValidationException`, `InvalidParameterException`,
/// `InvalidRequestException`) and every unrecognized code are fatal.
pub fn classify_code(code: &str) -> ErrorClass {
    if RETRYABLE_CODES.contains(&code) {
        ErrorClass::Retryable
    } else if code == NOT_FOUND_CODE {
        ErrorClass::NotFound
    } else {
        ErrorClass::Fatal
    }
}

/// Errors that can occur when calling the gateway control plane
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The service returned an error code
    #[error("gateway API error {code}: {message}")]
    Api {
        /// AWS error code, e.g. "ThrottlingException"
        code: String,
        /// Message returned with the error
        message: String,
    },

    /// Timeout, dispatch failure or unreadable response
    #[error("transport error: {0}")]
    Transport(String),

    /// Request could not be built locally
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The caller cancelled the operation
    #[error("operation cancelled")]
    Cancelled,

    /// Retryable failures persisted past the retry budget
    #[error("{operation} failed after {attempts} attempts: {source}")]
    RetriesExhausted {
        /// Operation name, e.g. "CreateGatewayTarget"
        operation: &'static str,
        /// Total attempts made
        attempts: u32,
        /// The last failure
        source: Box<GatewayError>,
    },
}

impl GatewayError {
    /// Builds an API error from a code and message.
    pub fn api(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Api {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Classifies this error. Cancellation is reported as fatal here;
    /// callers check [`GatewayError::is_cancelled`] first.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Api { code, .. } => classify_code(code),
            Self::Transport(_) => ErrorClass::Retryable,
            Self::InvalidRequest(_) | Self::Cancelled => ErrorClass::Fatal,
            Self::RetriesExhausted { source, .. } => source.class(),
        }
    }

    /// Returns true if a retry may succeed.
    pub fn is_retryable(&self) -> bool {
        !self.is_cancelled() && self.class() == ErrorClass::Retryable
    }

    /// Returns true if the target does not exist.
    pub fn is_not_found(&self) -> bool {
        self.class() == ErrorClass::NotFound
    }

    /// Returns true if the operation was cancelled by the caller.
    pub fn is_cancelled(&self) -> bool {
        match self {
            Self::Cancelled => true,
            Self::RetriesExhausted { source, .. } => source.is_cancelled(),
            _ => false,
        }
    }
}
