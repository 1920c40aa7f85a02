//! Canonical exported email record.
//!
//! Field names serialize in `PascalCase` so exports stay compatible with the
//! files produced by earlier versions of the exporter.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A sender or recipient. Both parts may be missing on malformed mail.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EmailAddress {
    /// Display name.
    pub name: Option<String>,
    /// SMTP address.
    pub address: Option<String>,
}

impl EmailAddress {
    /// Creates an address with both parts present.
    #[must_use]
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            address: Some(address.into()),
        }
    }

    /// Whether neither a name nor an address is known.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.name.as_deref().is_none_or(str::is_empty)
            && self.address.as_deref().is_none_or(str::is_empty)
    }
}

impl fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.name.as_deref().filter(|n| !n.is_empty());
        let address = self.address.as_deref().filter(|a| !a.is_empty());
        match (name, address) {
            (Some(name), Some(address)) => write!(f, "{name} <{address}>"),
            (Some(only), None) | (None, Some(only)) => f.write_str(only),
            (None, None) => f.write_str("(unknown)"),
        }
    }
}

/// How [`EmailBody::content`] must be interpreted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BodyType {
    /// Markup.
    Html,
    /// Plain text.
    #[default]
    Text,
}

impl BodyType {
    /// Interprets a backend content type; anything but HTML is text.
    #[must_use]
    pub fn from_declared(declared: Option<&str>) -> Self {
        match declared {
            Some(value) if value.trim().eq_ignore_ascii_case("html") => Self::Html,
            _ => Self::Text,
        }
    }
}

/// Message body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EmailBody {
    /// Body format.
    pub content_type: BodyType,
    /// Body content, absent when the server returned none.
    pub content: Option<String>,
}

/// Message importance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Importance {
    /// Low importance.
    Low,
    /// Normal importance.
    Normal,
    /// High importance.
    High,
}

impl Importance {
    /// Parses a backend importance value case-insensitively.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "low" => Some(Self::Low),
            "normal" => Some(Self::Normal),
            "high" => Some(Self::High),
            _ => None,
        }
    }

    /// Display label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Normal => "Normal",
            Self::High => "High",
        }
    }
}

/// Follow-up flag state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct FlagInfo {
    /// `notFlagged`, `flagged` or `complete`.
    pub flag_status: Option<String>,
}

impl FlagInfo {
    /// Whether the message is flagged for follow-up.
    #[must_use]
    pub fn is_flagged(&self) -> bool {
        self.flag_status
            .as_deref()
            .is_some_and(|s| s.eq_ignore_ascii_case("flagged"))
    }
}

/// One exported message. Built once per remote message, never mutated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EmailRecord {
    /// Remote message id.
    pub id: String,
    /// Subject line.
    pub subject: Option<String>,
    /// Sender.
    pub from: Option<EmailAddress>,
    /// To recipients.
    #[serde(rename = "ToRecipients")]
    pub to: Option<Vec<EmailAddress>>,
    /// Cc recipients.
    #[serde(rename = "CcRecipients")]
    pub cc: Option<Vec<EmailAddress>>,
    /// Bcc recipients.
    #[serde(rename = "BccRecipients")]
    pub bcc: Option<Vec<EmailAddress>>,
    /// Reply-To addresses.
    pub reply_to: Option<Vec<EmailAddress>>,
    /// When the message arrived.
    #[serde(rename = "ReceivedDateTime")]
    pub received_at: Option<DateTime<Utc>>,
    /// When the message was sent.
    #[serde(rename = "SentDateTime")]
    pub sent_at: Option<DateTime<Utc>>,
    /// Whether the message has attachments.
    pub has_attachments: bool,
    /// Importance, if the server reported one.
    pub importance: Option<Importance>,
    /// Read state.
    pub is_read: bool,
    /// Draft state.
    pub is_draft: bool,
    /// RFC 5322 Message-ID.
    pub internet_message_id: Option<String>,
    /// Conversation (thread) id.
    pub conversation_id: Option<String>,
    /// Outlook categories.
    pub categories: Option<Vec<String>>,
    /// Message body.
    pub body: EmailBody,
    /// Server-generated text preview.
    pub body_preview: Option<String>,
    /// Follow-up flag.
    pub flag: Option<FlagInfo>,
}
