//! Sign-in failures.

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Why a sign-in or token operation failed.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The identity platform could not be reached.
    #[error("identity platform request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// A response body was not the JSON the endpoint documents.
    #[error("malformed identity platform response: {0}")]
    Json(#[from] serde_json::Error),

    /// The token or device authorization endpoint answered with an error body.
    #[error("sign-in rejected ({code}): {description}")]
    Rejected {
        /// Error code such as `invalid_grant` or `authorization_pending`.
        code: String,
        /// Description returned alongside the code, possibly empty.
        description: String,
    },

    /// The device code lapsed before the user finished signing in.
    #[error("device code expired before sign-in completed")]
    CodeExpired,

    /// The token carries no refresh token to redeem.
    #[error("no refresh token was issued; sign in again")]
    NoRefreshToken,

    /// A token response passed JSON parsing but is unusable.
    #[error("unusable token response: {0}")]
    InvalidResponse(String),

    /// Polling gave up once the device code lifetime ran out.
    #[error("sign-in not completed within {0} seconds")]
    TimedOut(u64),

    /// The user declined the consent prompt.
    #[error("sign-in was declined")]
    Declined,

    /// Tenant or endpoint settings are unusable.
    #[error("invalid sign-in configuration: {0}")]
    InvalidConfig(String),

    /// An endpoint URL could not be built.
    #[error("invalid endpoint URL: {0}")]
    Url(#[from] url::ParseError),
}

/// How a device code poll answer should be handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollStatus {
    /// The user has not finished yet.
    Pending,
    /// Keep polling, but less often.
    SlowDown,
    /// Stop polling.
    Terminal,
}

impl Error {
    /// Builds a [`Error::Rejected`] from an endpoint error body.
    #[must_use]
    pub fn rejected(code: impl Into<String>, description: impl Into<String>) -> Self {
        Self::Rejected {
            code: code.into(),
            description: description.into(),
        }
    }

    /// Error code reported by the endpoint, if any.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Rejected { code, .. } => Some(code),
            _ => None,
        }
    }

    /// Classifies an answer to a device code poll (RFC 8628 section 3.5).
    #[must_use]
    pub fn poll_status(&self) -> PollStatus {
        match self.code() {
            Some("authorization_pending") => PollStatus::Pending,
            Some("slow_down") => PollStatus::SlowDown,
            _ => PollStatus::Terminal,
        }
    }

    /// Maps device-flow specific rejections onto dedicated variants.
    #[must_use]
    pub(crate) fn into_device_error(self) -> Self {
        match self.code() {
            Some("access_denied" | "authorization_declined") => Self::Declined,
            Some("expired_token" | "code_expired") => Self::CodeExpired,
            _ => self,
        }
    }
}
