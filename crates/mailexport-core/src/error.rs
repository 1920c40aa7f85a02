//! Error types for the core library.

use thiserror::Error;

/// Errors that can occur while discovering folders or exporting messages.
#[derive(Debug, Error)]
pub enum Error {
    /// The mailbox or archive root cannot be bound. Fatal to the whole run.
    #[error("{target} is not accessible: {reason}")]
    NotAccessible {
        /// What was being bound (mailbox, archive root, ...).
        target: String,
        /// What the remote side reported.
        reason: String,
        /// Remediation hint for the user.
        hint: String,
    },

    /// The requested folder matched nothing that was discovered.
    #[error("folder '{target}' not found ({} folders available)", available.len())]
    TargetNotFound {
        /// The name, path or id that was requested.
        target: String,
        /// Paths of every discovered folder, in discovery order.
        available: Vec<String>,
    },

    /// Caller supplied an invalid parameter. Raised before any remote call.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The remote API rejected a request.
    #[error("remote request failed{}: {message}", status.map(|s| format!(" ({s})")).unwrap_or_default())]
    Remote {
        /// HTTP status, if the failure came with one.
        status: Option<u16>,
        /// Error text reported by the server.
        message: String,
    },

    /// Transport-level HTTP failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Malformed JSON payload.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Malformed SOAP payload.
    #[error("XML error: {0}")]
    Xml(String),

    /// Token acquisition or refresh failed.
    #[error("authentication error: {0}")]
    Auth(#[from] mailexport_oauth::Error),

    /// The caller cancelled the operation.
    #[error("operation cancelled")]
    Cancelled,
}

impl Error {
    /// Short machine-readable category of this error.
    #[must_use]
    pub const fn category(&self) -> &'static str {
        match self {
            Self::NotAccessible { .. } => "not_accessible",
            Self::TargetNotFound { .. } => "target_not_found",
            Self::InvalidArgument(_) => "invalid_argument",
            Self::Remote { .. } | Self::Http(_) | Self::Json(_) | Self::Xml(_) => "remote_failure",
            Self::Auth(_) => "auth_failure",
            Self::Cancelled => "cancelled",
        }
    }

    /// Whether this error aborts the whole run rather than one export.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        !matches!(self, Self::TargetNotFound { .. } | Self::InvalidArgument(_))
    }

    /// Remediation hint, for errors that carry one.
    #[must_use]
    pub fn hint(&self) -> Option<&str> {
        match self {
            Self::NotAccessible { hint, .. } => Some(hint),
            _ => None,
        }
    }

    /// HTTP status of a remote failure, if any.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Remote { status, .. } => *status,
            _ => None,
        }
    }
}

impl From<quick_xml::Error> for Error {
    fn from(e: quick_xml::Error) -> Self {
        Self::Xml(e.to_string())
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories_are_distinct() {
        let not_accessible = Error::NotAccessible {
            target: "archive".into(),
            reason: "ErrorItemNotFound".into(),
            hint: "enable it".into(),
        };
        assert_eq!(not_accessible.category(), "not_accessible");
        assert_eq!(not_accessible.hint(), Some("enable it"));
        assert!(not_accessible.is_fatal());

        let missing = Error::TargetNotFound {
            target: "Nope".into(),
            available: vec!["Inbox".into()],
        };
        assert_eq!(missing.category(), "target_not_found");
        assert!(!missing.is_fatal());

        assert_eq!(Error::InvalidArgument("x".into()).category(), "invalid_argument");
        assert_eq!(Error::Cancelled.category(), "cancelled");
    }

    #[test]
    fn test_remote_message_includes_status() {
        let err = Error::Remote {
            status: Some(403),
            message: "Access is denied".into(),
        };
        assert_eq!(err.to_string(), "remote request failed (403): Access is denied");
        assert_eq!(err.category(), "remote_failure");
        assert_eq!(err.status(), Some(403));

        let bare = Error::Remote {
            status: None,
            message: "ErrorInternalServerError".into(),
        };
        assert_eq!(bare.to_string(), "remote request failed: ErrorInternalServerError");
    }
}
