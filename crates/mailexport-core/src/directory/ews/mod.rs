//! Exchange Web Services backend.
//!
//! Graph cannot reach In-Place Archive mailboxes, so archive exports go
//! through EWS. Requests are hand-built SOAP envelopes ([`soap`]) and
//! responses are read into a small element tree ([`xml`]) before being
//! mapped onto the shared model ([`parse`]).

mod parse;
mod soap;
mod xml;

use std::sync::Arc;

use async_trait::async_trait;
use mailexport_oauth::TokenSession;
use reqwest::Client;
use tracing::{debug, warn};

use super::{Backend, MailDirectory, Page, PageCursor};
use crate::error::{Error, Result};
use crate::model::{FolderNode, RemoteMessage};
use parse::{EwsFault, Parsed};
use soap::FolderRef;

/// Default Exchange Online EWS endpoint.
pub const EWS_ENDPOINT: &str = "https://outlook.office365.com/EWS/Exchange.asmx";

/// Response codes meaning the mailbox has no reachable archive.
const ARCHIVE_MISSING_CODES: &[&str] = &[
    "ErrorItemNotFound",
    "ErrorFolderNotFound",
    "ErrorMailboxStoreUnavailable",
    "ErrorNonExistentMailbox",
];

/// Directory backed by Exchange Web Services.
#[derive(Debug, Clone)]
pub struct EwsDirectory {
    client: Client,
    session: Arc<TokenSession>,
    endpoint: String,
}

impl EwsDirectory {
    /// Creates a directory using the Exchange Online endpoint.
    ///
    /// `session` must carry a token for the EWS resource, not Graph.
    #[must_use]
    pub fn new(session: Arc<TokenSession>) -> Self {
        Self {
            client: Client::new(),
            session,
            endpoint: EWS_ENDPOINT.to_string(),
        }
    }

    /// Overrides the EWS endpoint.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    async fn call(&self, action: &str, mailbox: &str, envelope: String) -> Result<String> {
        debug!(action, endpoint = %self.endpoint, "EWS POST");
        let bearer = self.session.bearer().await?;
        let mut request = self
            .client
            .post(&self.endpoint)
            .bearer_auth(bearer)
            .header("content-type", "text/xml; charset=utf-8")
            .header("accept", "text/xml");
        if !mailbox.trim().is_empty() {
            request = request.header("X-AnchorMailbox", mailbox.trim());
        }

        let response = request.body(envelope).send().await?;
        let status = response.status();
        let body = response.text().await?;
        // EWS reports SOAP faults with 500, so let the parser read those.
        if !status.is_success() && !body.contains("Envelope") {
            return Err(Error::Remote {
                status: Some(status.as_u16()),
                message: body.chars().take(200).collect(),
            });
        }
        Ok(body)
    }

    async fn find_folders(
        &self,
        mailbox: &str,
        parent: FolderRef<'_>,
        cursor: Option<&PageCursor>,
    ) -> Result<Page<FolderNode>> {
        let offset = offset_of(cursor)?;
        let envelope = soap::find_folder(parent, self.max_page_size(), offset);
        let body = self.call("FindFolder", mailbox, envelope).await?;
        parse::find_folder_response(&body)?.map_err(Error::from)
    }
}

fn offset_of(cursor: Option<&PageCursor>) -> Result<u32> {
    match cursor {
        None => Ok(0),
        Some(PageCursor::Offset(offset)) => Ok(*offset),
        Some(PageCursor::Link(_)) => Err(Error::InvalidArgument(
            "EWS paging uses offsets, not continuation links".into(),
        )),
    }
}

fn archive_outcome(mailbox: &str, parsed: Parsed<FolderNode>) -> Result<FolderNode> {
    parsed.map_err(|fault: EwsFault| {
        if ARCHIVE_MISSING_CODES.contains(&fault.code.as_str()) {
            Error::NotAccessible {
                target: format!("archive of {mailbox}"),
                reason: fault.message,
                hint: "ensure In-Place Archive is enabled in the Exchange admin center".into(),
            }
        } else {
            fault.into()
        }
    })
}

#[async_trait]
impl MailDirectory for EwsDirectory {
    fn backend(&self) -> Backend {
        Backend::Ews
    }

    async fn list_root_folders(
        &self,
        mailbox: &str,
        cursor: Option<&PageCursor>,
    ) -> Result<Page<FolderNode>> {
        let root = FolderRef::Distinguished {
            id: "msgfolderroot",
            mailbox,
        };
        self.find_folders(mailbox, root, cursor).await
    }

    async fn list_child_folders(
        &self,
        mailbox: &str,
        folder_id: &str,
        cursor: Option<&PageCursor>,
    ) -> Result<Page<FolderNode>> {
        self.find_folders(mailbox, FolderRef::Id(folder_id), cursor).await
    }

    async fn list_messages(
        &self,
        mailbox: &str,
        folder_id: &str,
        page_size: u32,
        cursor: Option<&PageCursor>,
    ) -> Result<Page<RemoteMessage>> {
        let offset = offset_of(cursor)?;
        let page_size = page_size.clamp(1, self.max_page_size());
        let envelope = soap::find_item(FolderRef::Id(folder_id), page_size, offset);
        let body = self.call("FindItem", mailbox, envelope).await?;
        let ids = parse::find_item_response(&body)?.map_err(Error::from)?;
        if ids.items.is_empty() {
            return Ok(Page {
                items: Vec::new(),
                next: ids.next,
            });
        }

        let body = self
            .call("GetItem", mailbox, soap::get_items(&ids.items))
            .await?;
        let items = parse::get_item_response(&body)?.map_err(Error::from)?;
        if items.len() != ids.items.len() {
            warn!(
                requested = ids.items.len(),
                received = items.len(),
                "GetItem returned fewer messages than listed"
            );
        }
        Ok(Page {
            items,
            next: ids.next,
        })
    }

    async fn bind_archive_root(&self, mailbox: &str) -> Result<FolderNode> {
        let archive = FolderRef::Distinguished {
            id: "archivemsgfolderroot",
            mailbox,
        };
        let body = self
            .call("GetFolder", mailbox, soap::get_folder(archive))
            .await?;
        archive_outcome(mailbox, parse::get_folder_response(&body)?)
    }
}
