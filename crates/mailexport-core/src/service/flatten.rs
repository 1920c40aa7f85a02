//! Depth-first folder tree flattening.

use std::collections::VecDeque;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::cancellable;
use crate::directory::{MailDirectory, Page, PageCursor};
use crate::error::{Error, Result};
use crate::model::FolderNode;

/// Predicate that halts discovery once it first returns `true`.
pub type StopPredicate<'a> = &'a (dyn Fn(&FolderNode) -> bool + Send + Sync);

/// Where traversal starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RootSelector {
    /// Every top-level folder of the mailbox.
    #[default]
    TopLevel,
    /// The children of the mailbox's In-Place Archive root.
    ///
    /// The archive root itself is not part of the output.
    ArchiveRoot,
}

/// Which listing a frame pages through.
#[derive(Debug, Clone)]
enum Listing {
    Roots,
    Children(String),
}

/// One level of the traversal stack.
#[derive(Debug)]
struct Frame {
    listing: Listing,
    /// Path of the folder whose children this frame holds; `None` at root level.
    parent_path: Option<String>,
    pending: VecDeque<FolderNode>,
    cursor: Option<PageCursor>,
    fetched: bool,
}

impl Frame {
    const fn new(listing: Listing, parent_path: Option<String>) -> Self {
        Self {
            listing,
            parent_path,
            pending: VecDeque::new(),
            cursor: None,
            fetched: false,
        }
    }

    fn children_of(folder: &FolderNode) -> Self {
        Self::new(
            Listing::Children(folder.id.clone()),
            Some(folder.path.clone()),
        )
    }

    const fn has_more_pages(&self) -> bool {
        !self.fetched || self.cursor.is_some()
    }

    fn place(&self, folder: FolderNode) -> FolderNode {
        match &self.parent_path {
            Some(parent) => folder.nested_under(parent),
            None => folder,
        }
    }

    /// Queues a page fetched at `previous`. Returns `false` when the level
    /// is exhausted.
    fn accept(&mut self, page: Page<FolderNode>, previous: Option<&PageCursor>) -> bool {
        self.fetched = true;
        if page.next.is_some() && page.next.as_ref() == previous {
            warn!(cursor = ?previous, "backend repeated a folder page cursor, ending level");
            self.pending.extend(page.items);
            self.cursor = None;
            return false;
        }
        let more = !page.items.is_empty() || page.next.is_some();
        self.pending.extend(page.items);
        self.cursor = page.next;
        more
    }
}

/// Walks a mailbox folder hierarchy into a flat, pre-order list.
///
/// Each folder is appended before its children are listed, and every
/// level is paged to exhaustion before traversal returns to its parent.
/// When `stop` first matches, the matching folder is appended and the walk
/// ends immediately.
///
/// A failure listing one folder's children is logged and that subtree is
/// treated as empty. A failure at the root level is fatal.
///
/// # Errors
///
/// - [`Error::NotAccessible`] if the root level cannot be listed or the
///   archive root cannot be bound.
/// - [`Error::Cancelled`] if `cancel` fires.
/// - [`Error::Auth`] if the access token cannot be refreshed.
pub async fn flatten(
    directory: &dyn MailDirectory,
    mailbox: &str,
    roots: RootSelector,
    stop: Option<StopPredicate<'_>>,
    cancel: &CancellationToken,
) -> Result<Vec<FolderNode>> {
    let root_frame = match roots {
        RootSelector::TopLevel => Frame::new(Listing::Roots, None),
        RootSelector::ArchiveRoot => {
            let archive = cancellable(cancel, directory.bind_archive_root(mailbox)).await?;
            debug!(id = %archive.id, name = %archive.display_name, "bound archive root");
            Frame::new(Listing::Children(archive.id), None)
        }
    };

    let mut folders = Vec::new();
    let mut stack = vec![root_frame];

    while let Some(frame) = stack.last_mut() {
        if let Some(folder) = frame.pending.pop_front() {
            let folder = frame.place(folder);
            let descend = folder.has_children().then(|| Frame::children_of(&folder));
            let matched = stop.is_some_and(|stop| stop(&folder));
            folders.push(folder);
            if matched {
                debug!(count = folders.len(), "stop condition met");
                return Ok(folders);
            }
            if let Some(child) = descend {
                stack.push(child);
            }
            continue;
        }

        if !frame.has_more_pages() {
            stack.pop();
            continue;
        }

        let listing = frame.listing.clone();
        let cursor = frame.cursor.take();
        let at_root = stack.len() == 1;
        let page = match &listing {
            Listing::Roots => {
                cancellable(cancel, directory.list_root_folders(mailbox, cursor.as_ref())).await
            }
            Listing::Children(id) => {
                cancellable(
                    cancel,
                    directory.list_child_folders(mailbox, id, cursor.as_ref()),
                )
                .await
            }
        };

        match page {
            Ok(page) => {
                debug!(listing = ?listing, items = page.items.len(), more = page.next.is_some(), "folder page");
                if let Some(frame) = stack.last_mut() {
                    frame.accept(page, cursor.as_ref());
                }
            }
            Err(err) if at_root => return Err(root_unavailable(mailbox, roots, err)),
            Err(err @ (Error::Cancelled | Error::Auth(_))) => return Err(err),
            Err(err) => {
                let parent = stack
                    .last()
                    .and_then(|f| f.parent_path.clone())
                    .unwrap_or_default();
                warn!(folder = %parent, error = %err, "could not list child folders, skipping subtree");
                stack.pop();
            }
        }
    }

    info!(count = folders.len(), backend = %directory.backend(), "folder discovery complete");
    Ok(folders)
}

/// Root-level listing failures mean the mailbox, or its archive, is unreachable.
fn root_unavailable(mailbox: &str, roots: RootSelector, err: Error) -> Error {
    if matches!(err, Error::Cancelled | Error::Auth(_) | Error::NotAccessible { .. }) {
        return err;
    }
    let owner = if mailbox.trim().is_empty() {
        "signed-in user's mailbox".to_string()
    } else {
        format!("mailbox {mailbox}")
    };
    let (target, hint) = match roots {
        RootSelector::TopLevel => (
            owner,
            "check the mailbox address and that your account has been granted access to it",
        ),
        RootSelector::ArchiveRoot => (
            format!("archive folders of {owner}"),
            "the archive exists but its folders could not be listed; check that your account \
             has full access to the archive and that EWS is allowed for the mailbox",
        ),
    };
    Error::NotAccessible {
        target,
        reason: err.to_string(),
        hint: hint.into(),
    }
}
