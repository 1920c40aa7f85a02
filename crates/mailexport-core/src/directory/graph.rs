//! Microsoft Graph backend.

use std::sync::Arc;

use async_trait::async_trait;
use mailexport_oauth::TokenSession;
use reqwest::{Client, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::{Backend, MailDirectory, Page, PageCursor};
use crate::error::{Error, Result};
use crate::model::{FolderNode, RemoteMessage};

/// Default Graph endpoint.
pub const GRAPH_API_BASE: &str = "https://graph.microsoft.com/v1.0";

/// Message properties requested from Graph; attachments are never fetched.
const MESSAGE_SELECT_FIELDS: &str = concat!(
    "id,subject,from,toRecipients,ccRecipients,bccRecipients,replyTo,",
    "receivedDateTime,sentDateTime,hasAttachments,importance,isRead,isDraft,",
    "internetMessageId,conversationId,categories,body,bodyPreview,flag"
);

const FOLDER_SELECT_FIELDS: &str =
    "id,displayName,childFolderCount,totalItemCount,unreadItemCount";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphMailFolder {
    id: String,
    display_name: Option<String>,
    child_folder_count: Option<u32>,
    total_item_count: Option<u32>,
    unread_item_count: Option<u32>,
}

impl From<GraphMailFolder> for FolderNode {
    fn from(folder: GraphMailFolder) -> Self {
        Self::new(folder.id, folder.display_name.unwrap_or_default())
            .with_counts(
                folder.total_item_count.unwrap_or(0),
                folder.unread_item_count.unwrap_or(0),
            )
            .with_child_count(folder.child_folder_count.unwrap_or(0))
    }
}

#[derive(Debug, Deserialize)]
struct GraphPage<T> {
    value: Vec<T>,
    #[serde(rename = "@odata.nextLink")]
    next_link: Option<String>,
}

impl<T> GraphPage<T> {
    fn into_page<U: From<T>>(self) -> Page<U> {
        Page {
            items: self.value.into_iter().map(U::from).collect(),
            next: self.next_link.map(PageCursor::Link),
        }
    }
}

#[derive(Debug, Deserialize)]
struct GraphErrorBody {
    error: GraphErrorDetail,
}

#[derive(Debug, Deserialize)]
struct GraphErrorDetail {
    code: String,
    #[serde(default)]
    message: String,
}

/// Profile of the signed-in user (`GET /me`).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    /// Display name.
    pub display_name: Option<String>,
    /// Primary SMTP address.
    pub mail: Option<String>,
    /// User principal name.
    pub user_principal_name: Option<String>,
}

impl UserProfile {
    /// Mailbox address to use for the signed-in user.
    #[must_use]
    pub fn mailbox_address(&self) -> Option<&str> {
        self.mail
            .as_deref()
            .or(self.user_principal_name.as_deref())
            .filter(|s| !s.is_empty())
    }
}

/// Directory backed by the Graph REST API.
#[derive(Debug, Clone)]
pub struct GraphDirectory {
    client: Client,
    session: Arc<TokenSession>,
    base_url: String,
}

impl GraphDirectory {
    /// Creates a directory using the public Graph endpoint.
    #[must_use]
    pub fn new(session: Arc<TokenSession>) -> Self {
        Self {
            client: Client::new(),
            session,
            base_url: GRAPH_API_BASE.to_string(),
        }
    }

    /// Overrides the Graph endpoint (national clouds, proxies).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Fetches the signed-in user's profile.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn me(&self) -> Result<UserProfile> {
        let url = self.endpoint(&[], &["me"])?;
        self.get_json(url).await
    }

    /// Builds `{base}/users/{mailbox}/{segments..}`; an empty mailbox maps to `/me`.
    fn endpoint(&self, mailbox: &[&str], segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| Error::InvalidArgument(format!("invalid Graph base URL: {e}")))?;
        {
            let mut path = url.path_segments_mut().map_err(|()| {
                Error::InvalidArgument(format!("Graph base URL cannot be a base: {}", self.base_url))
            })?;
            path.pop_if_empty();
            match mailbox.first().map(|m| m.trim()) {
                Some(m) if !m.is_empty() => {
                    path.push("users").push(m);
                }
                Some(_) => {
                    path.push("me");
                }
                None => {}
            }
            path.extend(segments);
        }
        Ok(url)
    }

    fn folders_url(&self, mailbox: &str, parent: Option<&str>) -> Result<Url> {
        let mut url = match parent {
            Some(id) => self.endpoint(&[mailbox], &["mailFolders", id, "childFolders"])?,
            None => self.endpoint(&[mailbox], &["mailFolders"])?,
        };
        url.query_pairs_mut()
            .append_pair("$top", &self.max_page_size().to_string())
            .append_pair("$select", FOLDER_SELECT_FIELDS);
        Ok(url)
    }

    fn messages_url(&self, mailbox: &str, folder_id: &str, page_size: u32) -> Result<Url> {
        let mut url = self.endpoint(&[mailbox], &["mailFolders", folder_id, "messages"])?;
        url.query_pairs_mut()
            .append_pair("$top", &page_size.to_string())
            .append_pair("$select", MESSAGE_SELECT_FIELDS);
        Ok(url)
    }

    /// Resolves where a page starts: a continuation link replaces the URL,
    /// an offset becomes `$skip`.
    fn page_url(first: Url, cursor: Option<&PageCursor>) -> Result<Url> {
        match cursor {
            None => Ok(first),
            Some(PageCursor::Link(link)) => Url::parse(link)
                .map_err(|e| Error::InvalidArgument(format!("invalid continuation link: {e}"))),
            Some(PageCursor::Offset(skip)) => {
                let mut url = first;
                url.query_pairs_mut().append_pair("$skip", &skip.to_string());
                Ok(url)
            }
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        debug!(%url, "Graph GET");
        let bearer = self.session.bearer().await?;
        let response = self
            .client
            .get(url)
            .bearer_auth(bearer)
            .header("accept", "application/json")
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(remote_error(status.as_u16(), &body));
        }
        serde_json::from_str(&body).map_err(Into::into)
    }
}

/// Turns a Graph error payload into [`Error::Remote`].
fn remote_error(status: u16, body: &str) -> Error {
    let message = serde_json::from_str::<GraphErrorBody>(body).map_or_else(
        |_| body.chars().take(200).collect(),
        |parsed| format!("{}: {}", parsed.error.code, parsed.error.message),
    );
    Error::Remote {
        status: Some(status),
        message,
    }
}

#[async_trait]
impl MailDirectory for GraphDirectory {
    fn backend(&self) -> Backend {
        Backend::Graph
    }

    async fn list_root_folders(
        &self,
        mailbox: &str,
        cursor: Option<&PageCursor>,
    ) -> Result<Page<FolderNode>> {
        let url = Self::page_url(self.folders_url(mailbox, None)?, cursor)?;
        let page: GraphPage<GraphMailFolder> = self.get_json(url).await?;
        Ok(page.into_page())
    }

    async fn list_child_folders(
        &self,
        mailbox: &str,
        folder_id: &str,
        cursor: Option<&PageCursor>,
    ) -> Result<Page<FolderNode>> {
        let url = Self::page_url(self.folders_url(mailbox, Some(folder_id))?, cursor)?;
        let page: GraphPage<GraphMailFolder> = self.get_json(url).await?;
        Ok(page.into_page())
    }

    async fn list_messages(
        &self,
        mailbox: &str,
        folder_id: &str,
        page_size: u32,
        cursor: Option<&PageCursor>,
    ) -> Result<Page<RemoteMessage>> {
        let url = Self::page_url(self.messages_url(mailbox, folder_id, page_size)?, cursor)?;
        let page: GraphPage<RemoteMessage> = self.get_json(url).await?;
        Ok(page.into_page())
    }

    async fn bind_archive_root(&self, mailbox: &str) -> Result<FolderNode> {
        Err(Error::NotAccessible {
            target: format!("archive of {mailbox}"),
            reason: "Microsoft Graph does not expose In-Place Archive mailboxes".into(),
            hint: "use the archive backend (--archive), which goes through Exchange Web Services"
                .into(),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use mailexport_oauth::{OAuthClient, Provider, Token};

    fn directory() -> GraphDirectory {
        let client = OAuthClient::new("client", Provider::microsoft("common").unwrap());
        let session = TokenSession::new(client, Token::new("token", "Bearer"));
        GraphDirectory::new(Arc::new(session))
    }

    #[test]
    fn test_folder_urls() {
        let dir = directory();
        let roots = dir.folders_url("alice@contoso.com", None).unwrap();
        assert!(
            roots
                .as_str()
                .starts_with("https://graph.microsoft.com/v1.0/users/alice@contoso.com/mailFolders?")
        );
        assert!(roots.as_str().contains("%24top=1000"));

        let children = dir.folders_url("", Some("AAMkAD=")).unwrap();
        assert!(
            children
                .as_str()
                .starts_with("https://graph.microsoft.com/v1.0/me/mailFolders/AAMkAD=/childFolders")
        );
    }

    #[test]
    fn test_base_url_override() {
        let dir = directory().with_base_url("https://graph.microsoft.us/v1.0/");
        let url = dir.messages_url("bob@contoso.us", "inbox", 25).unwrap();
        assert!(
            url.as_str()
                .starts_with("https://graph.microsoft.us/v1.0/users/bob@contoso.us/mailFolders/inbox/messages?")
        );
        assert!(url.as_str().contains("%24top=25"));
    }

    #[test]
    fn test_page_url_cursor_handling() {
        let first = Url::parse("https://graph.microsoft.com/v1.0/me/mailFolders?%24top=10").unwrap();
        let link = "https://graph.microsoft.com/v1.0/me/mailFolders?%24top=10&%24skip=10";

        let next = GraphDirectory::page_url(first.clone(), Some(&PageCursor::Link(link.into())))
            .unwrap();
        assert_eq!(next.as_str(), link);

        let offset = GraphDirectory::page_url(first, Some(&PageCursor::Offset(20))).unwrap();
        assert!(offset.as_str().ends_with("%24skip=20"));
    }

    #[test]
    fn test_folder_page_parsing() {
        let json = r#"{
            "@odata.context": "https://graph.microsoft.com/v1.0/$metadata#users('x')/mailFolders",
            "value": [
                {"id": "AAA", "displayName": "Inbox", "childFolderCount": 2, "totalItemCount": 40, "unreadItemCount": 3},
                {"id": "BBB", "displayName": "Sent Items", "childFolderCount": 0, "totalItemCount": 7, "unreadItemCount": 0}
            ],
            "@odata.nextLink": "https://graph.microsoft.com/v1.0/users/x/mailFolders?%24skip=2"
        }"#;

        let page: GraphPage<GraphMailFolder> = serde_json::from_str(json).unwrap();
        let page: Page<FolderNode> = page.into_page();
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[0].path, "Inbox");
        assert_eq!(page.items[0].child_count, 2);
        assert_eq!(page.items[0].unread_items, 3);
        assert!(matches!(page.next, Some(PageCursor::Link(_))));
    }

    #[test]
    fn test_message_page_parsing() {
        let json = r#"{
            "value": [{
                "id": "MSG1",
                "subject": "Quarterly report",
                "from": {"emailAddress": {"name": "Alice", "address": "alice@contoso.com"}},
                "toRecipients": [{"emailAddress": {"name": "Bob", "address": "bob@contoso.com"}}],
                "ccRecipients": [],
                "receivedDateTime": "2024-03-01T09:15:00Z",
                "hasAttachments": true,
                "importance": "high",
                "isRead": false,
                "isDraft": false,
                "categories": ["Finance"],
                "body": {"contentType": "html", "content": "<p>Numbers</p>"},
                "bodyPreview": "Numbers",
                "flag": {"flagStatus": "flagged"}
            }]
        }"#;

        let page: GraphPage<RemoteMessage> = serde_json::from_str(json).unwrap();
        let page: Page<RemoteMessage> = page.into_page();
        assert!(page.next.is_none());
        let msg = &page.items[0];
        assert_eq!(msg.subject.as_deref(), Some("Quarterly report"));
        assert_eq!(
            msg.from.as_ref().unwrap().email_address.as_ref().unwrap().address.as_deref(),
            Some("alice@contoso.com")
        );
        assert_eq!(msg.body.as_ref().unwrap().content_type.as_deref(), Some("html"));
        assert_eq!(msg.received_date_time.unwrap().to_rfc3339(), "2024-03-01T09:15:00+00:00");
    }

    #[test]
    fn test_remote_error_parsing() {
        let body = r#"{"error":{"code":"ErrorAccessDenied","message":"Access is denied."}}"#;
        let err = remote_error(403, body);
        assert_eq!(err.status(), Some(403));
        assert!(err.to_string().contains("ErrorAccessDenied: Access is denied."));

        let err = remote_error(502, "Bad Gateway");
        assert!(err.to_string().contains("Bad Gateway"));
    }

    #[tokio::test]
    async fn test_archive_is_not_accessible_through_graph() {
        let err = directory().bind_archive_root("alice@contoso.com").await.unwrap_err();
        assert_eq!(err.category(), "not_accessible");
        assert!(err.hint().unwrap().contains("--archive"));
    }

    #[test]
    fn test_profile_mailbox_address() {
        let profile = UserProfile {
            display_name: Some("Alice".into()),
            mail: None,
            user_principal_name: Some("alice@contoso.com".into()),
        };
        assert_eq!(profile.mailbox_address(), Some("alice@contoso.com"));
    }
}
