//! Access tokens issued by the identity platform.

use crate::error::{Error, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A token this many seconds from `expires_at` is refreshed before use.
const REFRESH_MARGIN_SECS: i64 = 60;

/// An issued access token and what is needed to renew it.
///
/// Tokens live in memory for the length of one run and are never written
/// to disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Token {
    /// Bearer string sent in `Authorization` headers.
    pub access_token: String,
    /// Usually `Bearer`.
    pub token_type: String,
    /// `None` when the endpoint did not say.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    /// Redeemable for new access tokens, possibly for other resources.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Space-separated scopes the token was issued for.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

impl Token {
    /// A token with no expiry, refresh token, or scope.
    #[must_use]
    pub fn new(access_token: impl Into<String>, token_type: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            token_type: token_type.into(),
            expires_at: None,
            refresh_token: None,
            scope: None,
        }
    }

    /// Builds a token from a token endpoint answer, stamping `expires_at`
    /// relative to `issued_at`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidResponse`] if the access token is blank.
    pub fn issued(response: TokenResponse, issued_at: DateTime<Utc>) -> Result<Self> {
        let TokenResponse {
            access_token,
            token_type,
            expires_in,
            refresh_token,
            scope,
        } = response;

        if access_token.trim().is_empty() {
            return Err(Error::InvalidResponse("access_token is blank".into()));
        }

        Ok(Self {
            access_token,
            token_type,
            expires_at: expires_in.map(|secs| issued_at + Duration::seconds(i64::from(secs))),
            refresh_token: refresh_token.filter(|t| !t.is_empty()),
            scope,
        })
    }

    /// Whether the token must be refreshed before it is sent again.
    #[must_use]
    pub fn needs_refresh(&self) -> bool {
        self.needs_refresh_at(Utc::now())
    }

    fn needs_refresh_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|exp| now + Duration::seconds(REFRESH_MARGIN_SECS) >= exp)
    }

    /// Sets the expiry.
    #[must_use]
    pub const fn with_expires_at(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Sets the scope string.
    #[must_use]
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    /// Keeps `previous`'s refresh token when the endpoint did not rotate it.
    #[must_use]
    pub fn inherit_refresh_token(mut self, previous: &Self) -> Self {
        if self.refresh_token.is_none() {
            self.refresh_token.clone_from(&previous.refresh_token);
        }
        self
    }

    /// The refresh token to redeem.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoRefreshToken`] if none was issued.
    pub fn refresh_token(&self) -> Result<&str> {
        self.refresh_token.as_deref().ok_or(Error::NoRefreshToken)
    }
}

/// Success body of the token endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    /// Bearer string.
    pub access_token: String,
    /// Defaults to `Bearer` when absent.
    #[serde(default = "bearer")]
    pub token_type: String,
    /// Lifetime in seconds.
    #[serde(default)]
    pub expires_in: Option<u32>,
    /// Present when `offline_access` was requested.
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Granted scopes, space-separated.
    #[serde(default)]
    pub scope: Option<String>,
}

fn bearer() -> String {
    "Bearer".to_owned()
}

/// Error body shared by the token and device authorization endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct EndpointError {
    /// Machine-readable code.
    pub error: String,
    /// Free text, often prefixed with an `AADSTS` number.
    #[serde(default)]
    pub error_description: String,
}

impl From<EndpointError> for Error {
    fn from(body: EndpointError) -> Self {
        Self::rejected(body.error, body.error_description)
    }
}
