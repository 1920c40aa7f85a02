//! # mailexport-core
//!
//! Folder discovery, message export and report rendering for Exchange
//! Online mailboxes.
//!
//! This crate provides:
//! - A backend-agnostic data model ([`FolderNode`], [`EmailRecord`])
//! - The [`MailDirectory`] capability trait with Microsoft Graph and
//!   Exchange Web Services (In-Place Archive) implementations
//! - Depth-first, fully paged folder tree flattening ([`flatten`])
//! - Bounded or unbounded message export ([`export_messages`])
//! - JSON and self-contained HTML reports ([`to_json`], [`to_html`])
//!
//! The core never touches the file system; [`output_file_name`] only
//! computes where a caller should write.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod directory;
mod error;
pub mod model;
pub mod output;
pub mod render;
pub mod service;

pub use directory::{
    Backend, EwsDirectory, GraphDirectory, MAX_PAGE_SIZE, MailDirectory, Page, PageCursor,
};
pub use directory::graph::UserProfile;
pub use error::{Error, Result};
pub use model::{
    BodyType, EmailAddress, EmailBody, EmailRecord, ExportLimit, ExportRequest, FlagInfo,
    FolderNode, FolderSelector, Importance, OutputFormat, RemoteMessage,
};
pub use output::{output_file_name, sanitize_file_name};
pub use render::{HtmlReport, from_json, to_html, to_json};
pub use service::{PROGRESS_INTERVAL, RootSelector, StopPredicate, export_messages, flatten};
pub use tokio_util::sync::CancellationToken;
