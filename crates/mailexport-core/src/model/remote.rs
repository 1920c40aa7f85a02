//! Raw message shape returned by the directory backends.
//!
//! Mirrors the Graph `message` resource; the EWS backend fills the same
//! shape from SOAP responses so the exporter maps a single representation.

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// `emailAddress` object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RemoteAddress {
    /// Display name.
    pub name: Option<String>,
    /// SMTP address.
    pub address: Option<String>,
}

/// `recipient` object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteRecipient {
    /// Wrapped address.
    pub email_address: Option<RemoteAddress>,
}

impl RemoteRecipient {
    /// Convenience constructor.
    #[must_use]
    pub fn new(name: Option<String>, address: Option<String>) -> Self {
        Self {
            email_address: Some(RemoteAddress { name, address }),
        }
    }
}

/// `itemBody` object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteBody {
    /// `html` or `text`; may be missing.
    pub content_type: Option<String>,
    /// Body content.
    pub content: Option<String>,
}

/// `followupFlag` object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteFlag {
    /// Flag status.
    pub flag_status: Option<String>,
}

/// A message as listed by a backend, before normalization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteMessage {
    /// Message id.
    pub id: String,
    /// Subject.
    pub subject: Option<String>,
    /// Sender.
    pub from: Option<RemoteRecipient>,
    /// To recipients.
    pub to_recipients: Option<Vec<RemoteRecipient>>,
    /// Cc recipients.
    pub cc_recipients: Option<Vec<RemoteRecipient>>,
    /// Bcc recipients.
    pub bcc_recipients: Option<Vec<RemoteRecipient>>,
    /// Reply-To addresses.
    pub reply_to: Option<Vec<RemoteRecipient>>,
    /// Received timestamp.
    pub received_date_time: Option<DateTime<Utc>>,
    /// Sent timestamp.
    pub sent_date_time: Option<DateTime<Utc>>,
    /// Attachment indicator.
    pub has_attachments: Option<bool>,
    /// `low`, `normal` or `high`, in any case.
    pub importance: Option<String>,
    /// Read state.
    pub is_read: Option<bool>,
    /// Draft state.
    pub is_draft: Option<bool>,
    /// RFC 5322 Message-ID.
    pub internet_message_id: Option<String>,
    /// Conversation id.
    pub conversation_id: Option<String>,
    /// Categories.
    pub categories: Option<Vec<String>>,
    /// Body.
    pub body: Option<RemoteBody>,
    /// Text preview.
    pub body_preview: Option<String>,
    /// Follow-up flag.
    pub flag: Option<RemoteFlag>,
}
