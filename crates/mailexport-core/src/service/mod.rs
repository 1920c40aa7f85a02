//! Folder discovery and message export over a [`MailDirectory`].
//!
//! Both operations issue one remote call at a time. Every call races the
//! caller's [`CancellationToken`], so an interrupted run stops at the next
//! suspension point with [`Error::Cancelled`].
//!
//! [`MailDirectory`]: crate::directory::MailDirectory

mod export;
mod flatten;

use std::future::Future;

use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};

pub use export::{PROGRESS_INTERVAL, export_messages};
pub use flatten::{RootSelector, StopPredicate, flatten};

/// Awaits `call` unless `cancel` fires first.
async fn cancellable<T>(
    cancel: &CancellationToken,
    call: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(Error::Cancelled),
        result = call => result,
    }
}
