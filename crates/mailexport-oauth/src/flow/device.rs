//! Device Authorization Flow implementation (RFC 8628).

use super::OAuthClient;
use crate::error::{Error, PollStatus, Result};
use crate::token::{EndpointError, Token};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Grant type for polling the token endpoint.
const DEVICE_CODE_GRANT: &str = "urn:ietf:params:oauth:grant-type:device_code";

/// Added to the poll interval on every `slow_down` answer.
const SLOW_DOWN_STEP: Duration = Duration::from_secs(5);

/// Device authorization response.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DeviceAuthorization {
    /// Device code for polling.
    pub device_code: String,
    /// User code to display to the user.
    pub user_code: String,
    /// Verification URI where user should go.
    pub verification_uri: String,
    /// Complete verification URI (optional).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification_uri_complete: Option<String>,
    /// Ready-to-print sign-in instructions (Microsoft extension).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Expiration time in seconds.
    pub expires_in: u32,
    /// Polling interval in seconds (minimum 5 seconds).
    #[serde(default = "default_interval")]
    pub interval: u32,
}

const fn default_interval() -> u32 {
    5
}

impl DeviceAuthorization {
    /// Text to show the user so they can complete sign-in.
    #[must_use]
    pub fn instructions(&self) -> String {
        self.message.clone().unwrap_or_else(|| {
            format!(
                "To sign in, open {} and enter the code {} to authenticate.",
                self.verification_uri, self.user_code
            )
        })
    }
}

/// Device Authorization Flow for `OAuth2`.
///
/// Suitable for command-line tools: the user completes sign-in in any
/// browser while the tool polls the token endpoint.
#[derive(Debug)]
pub struct DeviceFlow {
    client: OAuthClient,
}

impl DeviceFlow {
    /// Creates a new device flow.
    #[must_use]
    pub const fn new(client: OAuthClient) -> Self {
        Self { client }
    }

    /// Requests device authorization from the server.
    ///
    /// Returns the device code and user code that should be displayed to the user.
    ///
    /// # Arguments
    ///
    /// * `scopes` - Optional scopes to request (uses provider defaults if None)
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint rejects the client or cannot be reached.
    pub async fn request_device_authorization(
        &self,
        scopes: Option<&[String]>,
    ) -> Result<DeviceAuthorization> {
        let device_auth_url = &self.client.provider.device_auth_url;

        let scope_str = scopes.map_or_else(
            || self.client.provider.default_scopes.join(" "),
            |s| s.join(" "),
        );

        let mut params = vec![("client_id", self.client.client_id.as_str())];
        if !scope_str.is_empty() {
            params.push(("scope", scope_str.as_str()));
        }

        debug!(scope = %scope_str, "Requesting device authorization");
        let response = self
            .client
            .http_client()
            .post(device_auth_url.clone())
            .form(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(response.json::<EndpointError>().await?.into());
        }

        response.json().await.map_err(Into::into)
    }

    /// Polls the token endpoint once, after waiting `interval`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Declined`] if the user declined and [`Error::CodeExpired`]
    /// if the device code lapsed. Answers that mean "keep polling" come back as
    /// [`Error::Rejected`]; see [`Error::poll_status`].
    pub async fn poll_for_token(&self, device_code: &str, interval: Duration) -> Result<Token> {
        tokio::time::sleep(interval).await;

        let params = [
            ("grant_type", DEVICE_CODE_GRANT),
            ("device_code", device_code),
            ("client_id", self.client.client_id.as_str()),
        ];

        self.client
            .post_token_request(&self.client.provider.token_url, &params)
            .await
            .map_err(Error::into_device_error)
    }

    /// Polls until the user completes sign-in or the device code expires.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TimedOut`] once `auth.expires_in` has elapsed, or any
    /// terminal error reported by the token endpoint.
    pub async fn wait_for_token(&self, auth: &DeviceAuthorization) -> Result<Token> {
        let deadline = Instant::now() + Duration::from_secs(u64::from(auth.expires_in));
        let mut interval = Duration::from_secs(u64::from(auth.interval.max(1)));

        loop {
            if Instant::now() + interval >= deadline {
                return Err(Error::TimedOut(auth.expires_in.into()));
            }

            let err = match self.poll_for_token(&auth.device_code, interval).await {
                Ok(token) => {
                    info!("Device authorization completed");
                    return Ok(token);
                }
                Err(err) => err,
            };

            match err.poll_status() {
                PollStatus::Pending => debug!("Authorization pending"),
                PollStatus::SlowDown => {
                    interval += SLOW_DOWN_STEP;
                    debug!(?interval, "Server asked to slow down polling");
                }
                PollStatus::Terminal => return Err(err),
            }
        }
    }

    /// Runs the whole flow: request a code, hand it to `present`, then poll.
    ///
    /// # Errors
    ///
    /// Returns an error if authorization fails or times out.
    pub async fn authorize<F>(&self, scopes: Option<&[String]>, present: F) -> Result<Token>
    where
        F: FnOnce(&DeviceAuthorization),
    {
        let auth = self.request_device_authorization(scopes).await?;
        present(&auth);
        self.wait_for_token(&auth).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::provider::Provider;

    #[test]
    fn test_default_interval() {
        assert_eq!(default_interval(), 5);
    }

    #[test]
    fn test_device_auth_deserialization() {
        let json = r#"{
            "device_code": "dev123",
            "user_code": "ABCD-EFGH",
            "verification_uri": "https://microsoft.com/devicelogin",
            "expires_in": 900,
            "message": "To sign in, use a web browser to open the page https://microsoft.com/devicelogin and enter the code ABCD-EFGH to authenticate."
        }"#;

        let auth: DeviceAuthorization = serde_json::from_str(json).unwrap();
        assert_eq!(auth.device_code, "dev123");
        assert_eq!(auth.user_code, "ABCD-EFGH");
        assert_eq!(auth.interval, 5);
        assert!(auth.instructions().contains("ABCD-EFGH"));
        assert!(auth.instructions().starts_with("To sign in, use a web browser"));
    }

    #[test]
    fn test_instructions_fallback_without_message() {
        let auth = DeviceAuthorization {
            device_code: "dev".into(),
            user_code: "CODE".into(),
            verification_uri: "https://example.com/device".into(),
            verification_uri_complete: None,
            message: None,
            expires_in: 600,
            interval: 5,
        };

        let text = auth.instructions();
        assert!(text.contains("https://example.com/device"));
        assert!(text.contains("CODE"));
    }

    #[tokio::test]
    async fn test_wait_for_token_times_out_without_polling() {
        let client = OAuthClient::new("client", Provider::microsoft("common").unwrap());
        let flow = DeviceFlow::new(client);
        let auth = DeviceAuthorization {
            device_code: "dev".into(),
            user_code: "CODE".into(),
            verification_uri: "https://example.com/device".into(),
            verification_uri_complete: None,
            message: None,
            expires_in: 3,
            interval: 5,
        };

        assert!(matches!(
            flow.wait_for_token(&auth).await,
            Err(Error::TimedOut(3))
        ));
    }
}
