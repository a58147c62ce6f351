//! User-visible notices raised by the authority and guards.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::AccessError;

/// How prominently a notice should be shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// A message for the user, shown without blocking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub severity: Severity,
    pub message: String,
}

impl Notice {
    #[must_use]
    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
        }
    }
}

impl From<&AccessError> for Notice {
    fn from(err: &AccessError) -> Self {
        let severity = match err {
            AccessError::RemoteFetchFailure { .. } | AccessError::AuthorizationDenied { .. } => {
                Severity::Warning
            }
            AccessError::PersistenceCorruption { .. } | AccessError::LoginFailed { .. } => {
                Severity::Error
            }
        };
        Self {
            severity,
            message: err.user_message(),
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.severity, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_failure_is_a_warning() {
        let notice = Notice::from(&AccessError::RemoteFetchFailure {
            resource: "permissions".to_string(),
            reason: "503".to_string(),
        });
        assert_eq!(notice.severity, Severity::Warning);
        assert!(notice.message.contains("permissions"));
    }

    #[test]
    fn login_failure_is_an_error() {
        let notice = Notice::from(&AccessError::LoginFailed {
            message: "Bad credentials".to_string(),
        });
        assert_eq!(notice.to_string(), "[error] Bad credentials");
    }
}
