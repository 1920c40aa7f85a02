//! Interactive sign-in.

use std::sync::Arc;

use anyhow::{Context, Result};
use mailexport_core::{Error, GraphDirectory, UserProfile};
use mailexport_oauth::{
    DeviceAuthorization, DeviceFlow, EWS_SCOPE, OAuthClient, Provider, TokenSession,
};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::Config;

/// A signed-in user.
pub struct SignedIn {
    /// Graph-scoped session.
    pub graph: Arc<TokenSession>,
    /// Profile of the signed-in user.
    pub profile: UserProfile,
}

impl SignedIn {
    /// Primary mailbox address, empty when Graph reported none.
    pub fn mailbox(&self) -> &str {
        self.profile.mailbox_address().unwrap_or_default()
    }

    /// Display name, falling back to the mailbox address.
    pub fn display_name(&self) -> &str {
        self.profile
            .display_name
            .as_deref()
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| self.mailbox())
    }
}

fn present(auth: &DeviceAuthorization) {
    println!();
    println!("{}", auth.instructions());
    println!();
    println!("Waiting for sign-in to complete (code expires in {} seconds)...", auth.expires_in);
}

/// Runs the device code flow and fetches the user's profile.
///
/// # Errors
///
/// Returns an error if sign-in fails, times out, or is cancelled.
pub async fn sign_in(config: &Config, cancel: &CancellationToken) -> Result<SignedIn> {
    let provider =
        Provider::with_authority(&config.azure_ad.instance, &config.azure_ad.tenant_id)?;
    provider.validate()?;
    let client = OAuthClient::new(config.azure_ad.client_id.clone(), provider);
    let flow = DeviceFlow::new(client.clone());

    println!("Initializing authentication...");
    let token = tokio::select! {
        biased;
        () = cancel.cancelled() => return Err(Error::Cancelled.into()),
        token = flow.authorize(None, present) => token.context("device code sign-in failed")?,
    };

    let graph = Arc::new(TokenSession::new(client, token));
    let directory = GraphDirectory::new(Arc::clone(&graph)).with_base_url(&config.graph.base_url);
    let profile = tokio::select! {
        biased;
        () = cancel.cancelled() => return Err(Error::Cancelled.into()),
        profile = directory.me() => profile?,
    };

    let signed_in = SignedIn { graph, profile };
    info!(mailbox = signed_in.mailbox(), "Signed in");
    println!();
    println!("Authentication successful!");
    println!("Logged in as: {}", signed_in.display_name());
    println!("Email: {}", signed_in.mailbox());
    Ok(signed_in)
}

/// Redeems the Graph sign-in for an EWS session without prompting again.
///
/// # Errors
///
/// Returns an error if the refresh token cannot be redeemed for EWS.
pub async fn ews_session(signed_in: &SignedIn) -> Result<Arc<TokenSession>> {
    println!("Acquiring EWS access token...");
    let session = signed_in
        .graph
        .for_scopes(&[EWS_SCOPE])
        .await
        .context("could not obtain an Exchange Web Services token; the app registration needs the EWS.AccessAsUser.All permission")?;
    println!("EWS access token acquired");
    Ok(Arc::new(session))
}
