//! Remote mailbox directory backends.
//!
//! Both the Graph REST API and the legacy Exchange Web Services API are
//! exposed through [`MailDirectory`], so folder discovery and message export
//! run unchanged against either one. The two differ mainly in paging: Graph
//! hands out continuation links, EWS uses numeric offsets.

pub mod ews;
pub mod graph;

use std::fmt;

use async_trait::async_trait;

use crate::error::Result;
use crate::model::{FolderNode, RemoteMessage};

pub use ews::EwsDirectory;
pub use graph::GraphDirectory;

/// Largest page either backend will serve.
pub const MAX_PAGE_SIZE: u32 = 1000;

/// Where the next page of a listing begins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageCursor {
    /// Zero-based item offset (EWS).
    Offset(u32),
    /// Opaque continuation link (Graph `@odata.nextLink`).
    Link(String),
}

/// One page of a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    /// Items on this page, in server order.
    pub items: Vec<T>,
    /// Cursor for the following page, `None` when this was the last.
    pub next: Option<PageCursor>,
}

impl<T> Page<T> {
    /// A page with nothing after it.
    #[must_use]
    pub const fn last(items: Vec<T>) -> Self {
        Self { items, next: None }
    }

    /// A page followed by `next`.
    #[must_use]
    pub const fn with_next(items: Vec<T>, next: PageCursor) -> Self {
        Self {
            items,
            next: Some(next),
        }
    }
}

/// Which API a directory talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// Microsoft Graph (primary mailbox, shared mailboxes).
    Graph,
    /// Exchange Web Services (In-Place Archive).
    Ews,
}

impl Backend {
    /// Suffix appended to output file names for this backend.
    #[must_use]
    pub const fn file_suffix(self) -> &'static str {
        match self {
            Self::Graph => "",
            Self::Ews => "_archive",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Graph => "graph",
            Self::Ews => "ews",
        })
    }
}

/// Capability interface over a remote mailbox directory.
///
/// Folders returned by the listing calls carry their display name as path;
/// the flattener rebases them under their parent.
#[async_trait]
pub trait MailDirectory: Send + Sync {
    /// Backend kind, used for logging and output naming.
    fn backend(&self) -> Backend;

    /// Largest page size the backend accepts.
    fn max_page_size(&self) -> u32 {
        MAX_PAGE_SIZE
    }

    /// Lists the top-level folders of a mailbox.
    async fn list_root_folders(
        &self,
        mailbox: &str,
        cursor: Option<&PageCursor>,
    ) -> Result<Page<FolderNode>>;

    /// Lists the direct children of a folder.
    async fn list_child_folders(
        &self,
        mailbox: &str,
        folder_id: &str,
        cursor: Option<&PageCursor>,
    ) -> Result<Page<FolderNode>>;

    /// Lists messages of a folder, newest first, with full bodies.
    async fn list_messages(
        &self,
        mailbox: &str,
        folder_id: &str,
        page_size: u32,
        cursor: Option<&PageCursor>,
    ) -> Result<Page<RemoteMessage>>;

    /// Binds the In-Place Archive root of a mailbox.
    ///
    /// Fails with [`crate::Error::NotAccessible`] when the mailbox has no
    /// archive or the backend cannot reach archives.
    async fn bind_archive_root(&self, mailbox: &str) -> Result<FolderNode>;
}
