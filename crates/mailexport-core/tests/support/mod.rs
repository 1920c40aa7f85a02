//! In-memory [`MailDirectory`] for driving the flattener and exporter.

#![allow(dead_code)]
#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use mailexport_core::model::{RemoteBody, RemoteRecipient};
use mailexport_core::{
    Backend, CancellationToken, Error, FolderNode, MailDirectory, Page, PageCursor, RemoteMessage,
    Result,
};

const ROOT: &str = "";

/// How the fake hands out continuation cursors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorStyle {
    Offset,
    Link,
}

pub struct FakeDirectory {
    backend: Backend,
    page_size: usize,
    cursors: CursorStyle,
    folders: HashMap<String, Vec<FolderNode>>,
    archive: Option<FolderNode>,
    failing: HashSet<String>,
    /// `None` slots stand for listed items that are not mail.
    messages: HashMap<String, Vec<Option<RemoteMessage>>>,
    stuck: HashSet<String>,
    fail_on_page: HashMap<String, usize>,
    cancel_after: Option<(usize, CancellationToken)>,
    calls: Mutex<Vec<String>>,
}

impl Default for FakeDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeDirectory {
    pub fn new() -> Self {
        Self {
            backend: Backend::Graph,
            page_size: 1000,
            cursors: CursorStyle::Offset,
            folders: HashMap::new(),
            archive: None,
            failing: HashSet::new(),
            messages: HashMap::new(),
            stuck: HashSet::new(),
            fail_on_page: HashMap::new(),
            cancel_after: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub const fn with_backend(mut self, backend: Backend) -> Self {
        self.backend = backend;
        self
    }

    /// Folder listing page size.
    pub const fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    pub const fn with_cursors(mut self, cursors: CursorStyle) -> Self {
        self.cursors = cursors;
        self
    }

    /// Adds a top-level folder.
    pub fn root(mut self, id: &str, name: &str) -> Self {
        self.folders
            .entry(ROOT.into())
            .or_default()
            .push(FolderNode::new(id, name));
        self
    }

    /// Adds a child folder and bumps the parent's child count.
    pub fn child(mut self, parent: &str, id: &str, name: &str) -> Self {
        for folder in self.folders.values_mut().flatten() {
            if folder.id == parent {
                folder.child_count += 1;
            }
        }
        if let Some(archive) = self.archive.as_mut().filter(|a| a.id == parent) {
            archive.child_count += 1;
        }
        self.folders
            .entry(parent.into())
            .or_default()
            .push(FolderNode::new(id, name));
        self
    }

    /// Adds `count` children named `<prefix>-<n>`.
    pub fn children(mut self, parent: &str, prefix: &str, count: usize) -> Self {
        for n in 0..count {
            let name = format!("{prefix}-{n}");
            self = self.child(parent, &name, &name);
        }
        self
    }

    /// Overrides the advertised child count of an existing folder.
    pub fn with_child_count(mut self, id: &str, child_count: u32) -> Self {
        for folder in self.folders.values_mut().flatten() {
            if folder.id == id {
                folder.child_count = child_count;
            }
        }
        self
    }

    pub fn archive(mut self, id: &str, name: &str) -> Self {
        self.archive = Some(FolderNode::new(id, name));
        self
    }

    /// Makes every listing under `id` fail. Use `""` for the root level.
    pub fn failing(mut self, id: &str) -> Self {
        self.failing.insert(id.into());
        self
    }

    /// Stocks a folder with `count` messages, newest first.
    pub fn messages(mut self, folder_id: &str, count: usize) -> Self {
        let messages = (0..count).map(|n| Some(message(folder_id, n))).collect();
        self.messages.insert(folder_id.into(), messages);
        self
    }

    /// Puts `count` non-mail items (contacts, tasks) ahead of the folder's
    /// messages. They take up listing slots but are never returned.
    pub fn non_mail_first(mut self, folder_id: &str, count: usize) -> Self {
        let slots = self.messages.entry(folder_id.into()).or_default();
        slots.splice(0..0, std::iter::repeat_n(None, count));
        self
    }

    /// Answers every message listing of `folder_id` with an empty page
    /// pointing at offset 0.
    pub fn stuck(mut self, folder_id: &str) -> Self {
        self.stuck.insert(folder_id.into());
        self
    }

    /// Fails the `page`-th (1-based) message listing of `folder_id`.
    pub fn fail_on_page(mut self, folder_id: &str, page: usize) -> Self {
        self.fail_on_page.insert(folder_id.into(), page);
        self
    }

    /// Cancels `token` while serving the `calls`-th remote call.
    pub fn cancel_after(mut self, calls: usize, token: CancellationToken) -> Self {
        self.cancel_after = Some((calls, token));
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        let mut calls = self.calls.lock().unwrap();
        calls.push(call);
        if let Some((after, token)) = &self.cancel_after {
            if calls.len() >= *after {
                token.cancel();
            }
        }
    }

    fn check(&self, id: &str) -> Result<()> {
        if self.failing.contains(id) {
            return Err(Error::Remote {
                status: Some(403),
                message: format!("ErrorAccessDenied: listing {id} is not allowed"),
            });
        }
        Ok(())
    }

    fn page<T: Clone>(
        &self,
        items: &[T],
        page_size: usize,
        cursor: Option<&PageCursor>,
    ) -> Page<T> {
        let offset = match cursor {
            None => 0,
            Some(PageCursor::Offset(n)) => *n as usize,
            Some(PageCursor::Link(link)) => link
                .rsplit('=')
                .next()
                .and_then(|n| n.parse().ok())
                .unwrap(),
        };
        let end = (offset + page_size).min(items.len());
        let slice = items.get(offset..end).unwrap_or_default().to_vec();
        let next = (end < items.len()).then(|| match self.cursors {
            CursorStyle::Offset => PageCursor::Offset(u32::try_from(end).unwrap()),
            CursorStyle::Link => PageCursor::Link(format!("https://fake.test/next?$skip={end}")),
        });
        Page { items: slice, next }
    }

    fn folder_page(&self, parent: &str, cursor: Option<&PageCursor>) -> Result<Page<FolderNode>> {
        self.check(parent)?;
        let folders = self.folders.get(parent).map(Vec::as_slice).unwrap_or_default();
        Ok(self.page(folders, self.page_size, cursor))
    }
}

pub fn message(folder_id: &str, n: usize) -> RemoteMessage {
    RemoteMessage {
        id: format!("{folder_id}-msg-{n}"),
        subject: Some(format!("Message {n}")),
        from: Some(RemoteRecipient::new(
            Some("Sender".into()),
            Some("sender@contoso.com".into()),
        )),
        is_read: Some(n % 2 == 0),
        body: Some(RemoteBody {
            content_type: Some(if n % 3 == 0 { "html" } else { "text" }.into()),
            content: Some(format!("Body {n}")),
        }),
        ..RemoteMessage::default()
    }
}

#[async_trait]
impl MailDirectory for FakeDirectory {
    fn backend(&self) -> Backend {
        self.backend
    }

    async fn list_root_folders(
        &self,
        _mailbox: &str,
        cursor: Option<&PageCursor>,
    ) -> Result<Page<FolderNode>> {
        self.record(format!("roots:{cursor:?}"));
        self.folder_page(ROOT, cursor)
    }

    async fn list_child_folders(
        &self,
        _mailbox: &str,
        folder_id: &str,
        cursor: Option<&PageCursor>,
    ) -> Result<Page<FolderNode>> {
        self.record(format!("children:{folder_id}:{cursor:?}"));
        self.folder_page(folder_id, cursor)
    }

    async fn list_messages(
        &self,
        _mailbox: &str,
        folder_id: &str,
        page_size: u32,
        cursor: Option<&PageCursor>,
    ) -> Result<Page<RemoteMessage>> {
        let call = format!("messages:{folder_id}:{page_size}");
        self.record(call.clone());
        self.check(folder_id)?;
        let served = self.calls().iter().filter(|c| **c == call).count();
        if self.fail_on_page.get(folder_id) == Some(&served) {
            return Err(Error::Remote {
                status: Some(503),
                message: format!("ErrorServerBusy: page {served} of {folder_id}"),
            });
        }
        if self.stuck.contains(folder_id) {
            return Ok(Page::with_next(Vec::new(), PageCursor::Offset(0)));
        }

        let page_size = page_size.min(self.max_page_size()) as usize;
        let slots = self.messages.get(folder_id).map(Vec::as_slice).unwrap_or_default();
        let page = self.page(slots, page_size, cursor);
        Ok(Page {
            items: page.items.into_iter().flatten().collect(),
            next: page.next,
        })
    }

    async fn bind_archive_root(&self, mailbox: &str) -> Result<FolderNode> {
        self.record("archive".into());
        self.archive.clone().ok_or_else(|| Error::NotAccessible {
            target: format!("archive of {mailbox}"),
            reason: "ErrorFolderNotFound".into(),
            hint: "ensure In-Place Archive is enabled".into(),
        })
    }
}
