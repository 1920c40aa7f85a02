//! Identity platform endpoints and scopes.

use crate::error::{Error, Result};
use url::Url;

/// Delegated Graph scopes needed to enumerate and read mailboxes.
///
/// `offline_access` is required so the refresh token can later be redeemed
/// for [`EWS_SCOPE`].
pub const GRAPH_SCOPES: &[&str] = &[
    "User.Read",
    "Mail.Read",
    "Mail.ReadBasic",
    "Mail.Read.Shared",
    "MailboxSettings.Read",
    "offline_access",
];

/// Exchange Web Services scope, used for In-Place Archive access.
pub const EWS_SCOPE: &str = "https://outlook.office365.com/EWS.AccessAsUser.All";

/// Public cloud login host.
pub const DEFAULT_AUTHORITY: &str = "https://login.microsoftonline.com";

/// Token and device code endpoints of one tenant.
#[derive(Debug, Clone)]
pub struct Provider {
    /// Tenant id, verified domain, or `common` / `organizations` / `consumers`.
    pub tenant: String,
    /// Token endpoint.
    pub token_url: Url,
    /// Device authorization endpoint.
    pub device_auth_url: Url,
    /// Scopes requested at sign-in.
    pub default_scopes: Vec<String>,
}

impl Provider {
    /// Microsoft identity platform v2.0 endpoints on the public cloud.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if the tenant is blank.
    pub fn microsoft(tenant: &str) -> Result<Self> {
        Self::with_authority(DEFAULT_AUTHORITY, tenant)
    }

    /// Endpoints under another login host, such as a national cloud.
    ///
    /// # Errors
    ///
    /// Returns an error if the tenant is blank or the host does not form a URL.
    pub fn with_authority(authority: &str, tenant: &str) -> Result<Self> {
        let tenant = tenant.trim();
        if tenant.is_empty() {
            return Err(Error::InvalidConfig("tenant id is empty".into()));
        }
        if tenant.contains('/') {
            return Err(Error::InvalidConfig(format!("tenant id '{tenant}' contains '/'")));
        }

        let base = Url::parse(authority.trim_end_matches('/'))?;
        let endpoint = |leaf: &str| base.join(&format!("{tenant}/oauth2/v2.0/{leaf}"));

        Ok(Self {
            tenant: tenant.to_owned(),
            token_url: endpoint("token")?,
            device_auth_url: endpoint("devicecode")?,
            default_scopes: GRAPH_SCOPES.iter().map(ToString::to_string).collect(),
        })
    }

    /// Checks that credentials will only travel over TLS.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if an endpoint is not `https`.
    pub fn validate(&self) -> Result<()> {
        for url in [&self.token_url, &self.device_auth_url] {
            if url.scheme() != "https" {
                return Err(Error::InvalidConfig(format!("{url} is not an https endpoint")));
            }
        }
        Ok(())
    }
}
