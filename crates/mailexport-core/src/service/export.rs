//! Paged message export.

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::cancellable;
use crate::directory::MailDirectory;
use crate::error::Result;
use crate::model::{
    BodyType, EmailAddress, EmailBody, EmailRecord, ExportLimit, FlagInfo, Importance,
    RemoteMessage, RemoteRecipient,
};

/// Messages between progress reports in "export all" mode.
pub const PROGRESS_INTERVAL: usize = 1000;

/// Retrieves up to `limit` messages from a folder, newest first.
///
/// Pages are requested at `min(limit, backend maximum)` and fetched until
/// the limit is reached or the backend reports no further page. Retrieval
/// stops mid-page once the limit is met. An empty page that carries a new
/// cursor does not end the export.
///
/// # Errors
///
/// Any remote failure aborts the export; messages gathered so far are
/// discarded. Returns [`crate::Error::Cancelled`] if `cancel` fires.
pub async fn export_messages(
    directory: &dyn MailDirectory,
    mailbox: &str,
    folder_id: &str,
    limit: ExportLimit,
    cancel: &CancellationToken,
) -> Result<Vec<EmailRecord>> {
    let page_size = limit.page_size(directory.max_page_size());
    let mut records: Vec<EmailRecord> = Vec::new();
    let mut cursor = None;
    let mut next_report = PROGRESS_INTERVAL;

    debug!(folder_id, %limit, page_size, "exporting messages");
    loop {
        let page = cancellable(
            cancel,
            directory.list_messages(mailbox, folder_id, page_size, cursor.as_ref()),
        )
        .await?;
        let listed = page.items.len();

        for message in page.items {
            if limit.is_reached(records.len()) {
                break;
            }
            records.push(message.into());
        }

        if limit == ExportLimit::All && records.len() >= next_report {
            info!(exported = records.len(), "export in progress");
            next_report = (records.len() / PROGRESS_INTERVAL + 1) * PROGRESS_INTERVAL;
        }

        if limit.is_reached(records.len()) {
            break;
        }
        // A page can be empty yet not last: EWS skips non-mail items but still
        // advances its offset past them.
        match page.next {
            None => break,
            Some(next) if cursor.as_ref() == Some(&next) => {
                warn!(folder_id, cursor = ?next, "backend repeated a page cursor, stopping");
                break;
            }
            Some(next) => {
                if listed == 0 {
                    debug!(folder_id, cursor = ?next, "page held no messages, continuing");
                }
                cursor = Some(next);
            }
        }
    }

    info!(exported = records.len(), folder_id, "export complete");
    Ok(records)
}

fn address(recipient: RemoteRecipient) -> EmailAddress {
    recipient
        .email_address
        .map(|a| EmailAddress {
            name: a.name,
            address: a.address,
        })
        .unwrap_or_default()
}

fn addresses(recipients: Option<Vec<RemoteRecipient>>) -> Option<Vec<EmailAddress>> {
    recipients.map(|list| list.into_iter().map(address).collect())
}

impl From<RemoteMessage> for EmailRecord {
    fn from(message: RemoteMessage) -> Self {
        let body = message.body.map_or_else(EmailBody::default, |body| EmailBody {
            content_type: BodyType::from_declared(body.content_type.as_deref()),
            content: body.content,
        });

        Self {
            id: message.id,
            subject: message.subject,
            from: message.from.map(address),
            to: addresses(message.to_recipients),
            cc: addresses(message.cc_recipients),
            bcc: addresses(message.bcc_recipients),
            reply_to: addresses(message.reply_to),
            received_at: message.received_date_time,
            sent_at: message.sent_date_time,
            has_attachments: message.has_attachments.unwrap_or(false),
            importance: message.importance.as_deref().and_then(Importance::parse),
            is_read: message.is_read.unwrap_or(false),
            is_draft: message.is_draft.unwrap_or(false),
            internet_message_id: message.internet_message_id,
            conversation_id: message.conversation_id,
            categories: message.categories,
            body,
            body_preview: message.body_preview,
            flag: message.flag.map(|f| FlagInfo {
                flag_status: f.flag_status,
            }),
        }
    }
}
