//! Error types for the platform-access crate.
//!
//! Errors are designed for layered context using rootcause:
//! - `StoreError`: failures of the underlying key-value store
//! - `SessionError`: failures reading or writing the persisted session
//! - `AccessError`: failures surfaced by the authority to its callers

use std::fmt;

/// Errors from the persistent key-value store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Reading the backing storage failed.
    ReadFailed { details: String },
    /// Writing the backing storage failed.
    WriteFailed { details: String },
    /// The backing storage is not in a format the store understands.
    Unreadable { details: String },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReadFailed { details } => write!(f, "store read failed: {details}"),
            Self::WriteFailed { details } => write!(f, "store write failed: {details}"),
            Self::Unreadable { details } => write!(f, "store is unreadable: {details}"),
        }
    }
}

impl std::error::Error for StoreError {}

/// Errors from loading or saving the persisted session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// The stored user snapshot (or session record) does not parse.
    Corrupt { reason: String },
    /// The session record was written by an unknown schema version.
    UnsupportedVersion { found: u32 },
    /// The store itself failed.
    Store(StoreError),
}

impl SessionError {
    /// Returns true if the stored data, rather than the store, is at fault.
    #[must_use]
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            Self::Corrupt { .. }
                | Self::UnsupportedVersion { .. }
                | Self::Store(StoreError::Unreadable { .. })
        )
    }
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Corrupt { reason } => write!(f, "stored session is corrupt: {reason}"),
            Self::UnsupportedVersion { found } => {
                write!(f, "stored session has unsupported schema version {found}")
            }
            Self::Store(inner) => write!(f, "session store error: {inner}"),
        }
    }
}

impl std::error::Error for SessionError {}

impl From<StoreError> for SessionError {
    fn from(err: StoreError) -> Self {
        Self::Store(err)
    }
}

/// Generic text shown when a login fails without a server-provided reason.
pub const GENERIC_LOGIN_FAILURE: &str = "Login failed. Please try again.";

/// Errors surfaced by the authority.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessError {
    /// The persisted session could not be parsed and was discarded.
    PersistenceCorruption { reason: String },
    /// A remote enrichment (permissions, avatar) failed.
    RemoteFetchFailure { resource: String, reason: String },
    /// A guard refused access.
    AuthorizationDenied { permission: String },
    /// Login failed unexpectedly; the session was torn down.
    LoginFailed { message: String },
}

impl AccessError {
    /// Returns the text to show the user.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::PersistenceCorruption { .. } => {
                "Your session could not be restored. Please sign in again.".to_string()
            }
            Self::RemoteFetchFailure { resource, .. } => {
                format!("Could not load {resource}; some features may be unavailable.")
            }
            Self::AuthorizationDenied { .. } => {
                "You do not have permission to access this page.".to_string()
            }
            Self::LoginFailed { message } => message.clone(),
        }
    }
}

impl fmt::Display for AccessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PersistenceCorruption { reason } => {
                write!(f, "persisted session is corrupt: {reason}")
            }
            Self::RemoteFetchFailure { resource, reason } => {
                write!(f, "failed to fetch {resource}: {reason}")
            }
            Self::AuthorizationDenied { permission } => {
                write!(f, "missing permission '{permission}'")
            }
            Self::LoginFailed { message } => write!(f, "login failed: {message}"),
        }
    }
}

impl std::error::Error for AccessError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_error_corruption_classification() {
        assert!(
            SessionError::Corrupt {
                reason: "eof".to_string()
            }
            .is_corruption()
        );
        assert!(SessionError::UnsupportedVersion { found: 9 }.is_corruption());
        assert!(
            SessionError::Store(StoreError::Unreadable {
                details: "expected value".to_string()
            })
            .is_corruption()
        );
        assert!(
            !SessionError::Store(StoreError::ReadFailed {
                details: "denied".to_string()
            })
            .is_corruption()
        );
    }

    #[test]
    fn login_failed_user_message_is_server_text() {
        let err = AccessError::LoginFailed {
            message: "Account disabled".to_string(),
        };
        assert_eq!(err.user_message(), "Account disabled");
        assert!(err.to_string().contains("Account disabled"));
    }

    #[test]
    fn authorization_denied_display() {
        let err = AccessError::AuthorizationDenied {
            permission: "view_users".to_string(),
        };
        assert!(err.to_string().contains("view_users"));
        assert!(err.user_message().contains("permission"));
    }

    #[test]
    fn remote_fetch_failure_display() {
        let err = AccessError::RemoteFetchFailure {
            resource: "permissions".to_string(),
            reason: "timeout".to_string(),
        };
        assert!(err.to_string().contains("permissions"));
        assert!(err.to_string().contains("timeout"));
    }
}
