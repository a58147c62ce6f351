//! Remote service error types.

use std::fmt;

/// Errors from calls to the remote back-office services.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// The HTTP client could not be constructed.
    ClientSetup {
        /// Error details.
        details: String,
    },
    /// The request never produced a response.
    RequestFailed {
        /// The endpoint that was called.
        endpoint: String,
        /// Error details.
        details: String,
    },
    /// The service answered with a non-success status.
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Message supplied by the service, if the body carried one.
        message: Option<String>,
    },
    /// The response body did not have the expected shape.
    InvalidResponse {
        /// The endpoint that was called.
        endpoint: String,
        /// Error details.
        details: String,
    },
}

impl RemoteError {
    /// Returns the human-readable message supplied by the server, if any.
    #[must_use]
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::Rejected { message, .. } => message.as_deref(),
            _ => None,
        }
    }
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ClientSetup { details } => {
                write!(f, "failed to set up HTTP client: {details}")
            }
            Self::RequestFailed { endpoint, details } => {
                write!(f, "request to '{endpoint}' failed: {details}")
            }
            Self::Rejected { status, message } => match message {
                Some(message) => write!(f, "rejected with status {status}: {message}"),
                None => write!(f, "rejected with status {status}"),
            },
            Self::InvalidResponse { endpoint, details } => {
                write!(f, "unexpected response from '{endpoint}': {details}")
            }
        }
    }
}

impl std::error::Error for RemoteError {}
