//! `OAuth2` flows against the token endpoint.

mod device;

pub use device::{DeviceAuthorization, DeviceFlow};

use crate::error::Result;
use crate::provider::Provider;
use crate::token::{EndpointError, Token, TokenResponse};
use chrono::Utc;
use reqwest::Client;
use tracing::debug;
use url::Url;

/// Public (secretless) `OAuth2` client registration.
#[derive(Debug, Clone)]
pub struct OAuthClient {
    /// Application (client) ID.
    pub client_id: String,
    /// Provider configuration.
    pub provider: Provider,
    /// HTTP client.
    http_client: Client,
}

impl OAuthClient {
    /// Creates a new OAuth client.
    #[must_use]
    pub fn new(client_id: impl Into<String>, provider: Provider) -> Self {
        Self {
            client_id: client_id.into(),
            provider,
            http_client: Client::new(),
        }
    }

    /// Refreshes an access token for the scopes it was originally issued for.
    ///
    /// # Errors
    ///
    /// Returns an error if the refresh fails or if the token has no refresh token.
    pub async fn refresh_token(&self, token: &Token) -> Result<Token> {
        let scope = token
            .scope
            .clone()
            .unwrap_or_else(|| self.provider.default_scopes.join(" "));
        self.redeem_refresh_token(token, &scope).await
    }

    /// Redeems the refresh token of `token` for a token with different scopes.
    ///
    /// The identity platform issues refresh tokens that are valid across
    /// resources, so a Graph sign-in can yield an EWS token without prompting
    /// the user again.
    ///
    /// # Errors
    ///
    /// Returns an error if the exchange fails or if the token has no refresh token.
    pub async fn exchange_for_scopes(&self, token: &Token, scopes: &[&str]) -> Result<Token> {
        let mut scope = scopes.join(" ");
        if !scopes.contains(&"offline_access") {
            scope.push_str(" offline_access");
        }
        self.redeem_refresh_token(token, &scope).await
    }

    async fn redeem_refresh_token(&self, token: &Token, scope: &str) -> Result<Token> {
        let refresh_token = token.refresh_token()?;
        debug!(scope, "Redeeming refresh token");

        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", self.client_id.as_str()),
            ("scope", scope),
        ];

        let renewed = self
            .post_token_request(&self.provider.token_url, &params)
            .await?
            .inherit_refresh_token(token);

        // Later refreshes must ask for the same resource.
        Ok(match renewed.scope {
            Some(_) => renewed,
            None => renewed.with_scope(scope),
        })
    }

    /// Posts a form to a token-issuing endpoint and parses the token.
    pub(crate) async fn post_token_request(
        &self,
        url: &Url,
        params: &[(&str, &str)],
    ) -> Result<Token> {
        let issued_at = Utc::now();
        let response = self.http_client.post(url.clone()).form(params).send().await?;

        if !response.status().is_success() {
            return Err(response.json::<EndpointError>().await?.into());
        }

        Token::issued(response.json::<TokenResponse>().await?, issued_at)
    }

    pub(crate) const fn http_client(&self) -> &Client {
        &self.http_client
    }
}
