//! Long-lived bearer token source.

use tokio::sync::Mutex;
use tracing::info;

use crate::error::Result;
use crate::flow::OAuthClient;
use crate::token::Token;

/// A signed-in session that hands out bearer strings.
///
/// The token is kept in memory only. When it is within the expiry skew the
/// next call to [`TokenSession::bearer`] refreshes it first, so an export
/// that outlives a single access token keeps working.
#[derive(Debug)]
pub struct TokenSession {
    client: OAuthClient,
    token: Mutex<Token>,
}

impl TokenSession {
    /// Wraps an already issued token.
    #[must_use]
    pub fn new(client: OAuthClient, token: Token) -> Self {
        Self {
            client,
            token: Mutex::new(token),
        }
    }

    /// Returns a valid access token, refreshing it if necessary.
    ///
    /// # Errors
    ///
    /// Returns an error if the token expired and cannot be refreshed.
    pub async fn bearer(&self) -> Result<String> {
        let mut token = self.token.lock().await;
        if token.needs_refresh() {
            info!("Access token expired, refreshing");
            *token = self.client.refresh_token(&token).await?;
        }
        Ok(token.access_token.clone())
    }

    /// Derives a session for other scopes from this session's refresh token.
    ///
    /// # Errors
    ///
    /// Returns an error if the refresh token cannot be redeemed for `scopes`.
    pub async fn for_scopes(&self, scopes: &[&str]) -> Result<Self> {
        let token = self.token.lock().await;
        let derived = self.client.exchange_for_scopes(&token, scopes).await?;
        Ok(Self::new(self.client.clone(), derived))
    }
}
