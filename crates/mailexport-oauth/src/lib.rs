//! # mailexport-oauth
//!
//! Interactive sign-in against the Microsoft identity platform for
//! command-line mailbox exports.
//!
//! ## Features
//!
//! - **Device Flow** (RFC 8628): the user completes sign-in in any browser
//! - **Token management**: refresh ahead of expiry, and redeeming a refresh
//!   token for another resource (Graph to EWS) without a second sign-in
//! - **Sessions**: [`TokenSession`] hands out bearer strings and refreshes
//!   them transparently during long exports
//!
//! ## Quick Start
//!
//! ```ignore
//! use mailexport_oauth::{DeviceFlow, OAuthClient, Provider, TokenSession};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let provider = Provider::microsoft("common")?;
//!     let client = OAuthClient::new("your_client_id", provider);
//!     let flow = DeviceFlow::new(client.clone());
//!
//!     let auth = flow.request_device_authorization(None).await?;
//!     println!("{}", auth.instructions());
//!
//!     let token = flow.wait_for_token(&auth).await?;
//!     let session = TokenSession::new(client, token);
//!     println!("Bearer: {}", session.bearer().await?);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod error;
pub mod flow;
pub mod provider;
pub mod session;
pub mod token;

pub use error::{Error, PollStatus, Result};
pub use flow::{DeviceAuthorization, DeviceFlow, OAuthClient};
pub use provider::{EWS_SCOPE, GRAPH_SCOPES, Provider};
pub use session::TokenSession;
pub use token::Token;
