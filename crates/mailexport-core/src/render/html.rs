//! Self-contained HTML report.
//!
//! Every piece of message metadata is escaped. HTML bodies are embedded
//! as-is: they come from the mail server already rendered for display and
//! are exported faithfully rather than sanitized, which makes the body
//! panel an injection surface if the report is opened in a privileged
//! context.

use std::fmt;

use chrono::{DateTime, Utc};
use html_escape::encode_safe;

use crate::model::{BodyType, EmailAddress, EmailRecord, Importance};

const STYLE: &str = r"
body { font-family: 'Segoe UI', Tahoma, Geneva, Verdana, sans-serif; background: #f3f2f1; color: #323130; margin: 0; padding: 24px; }
.header { background: linear-gradient(135deg, #0078d4, #005a9e); color: #fff; padding: 24px 32px; border-radius: 8px; margin-bottom: 24px; }
.header h1 { margin: 0 0 8px 0; font-size: 28px; }
.header .subtitle { opacity: 0.9; font-size: 15px; }
.header .meta { margin-top: 12px; font-size: 13px; opacity: 0.8; }
.email { background: #fff; border-radius: 8px; box-shadow: 0 1px 3px rgba(0,0,0,0.12); margin-bottom: 20px; overflow: hidden; }
.email-header { padding: 16px 24px; border-bottom: 1px solid #edebe9; }
.email-number { display: inline-block; background: #0078d4; color: #fff; font-size: 12px; padding: 2px 8px; border-radius: 10px; margin-bottom: 8px; }
.email-subject { font-size: 20px; font-weight: 600; margin: 0 0 8px 0; word-break: break-word; }
.badge { display: inline-block; font-size: 11px; font-weight: 600; padding: 2px 8px; border-radius: 4px; margin-right: 6px; }
.badge.read { background: #dff6dd; color: #107c10; }
.badge.unread { background: #fff4ce; color: #8a6d00; }
.badge.important { background: #fde7e9; color: #a4262c; }
.badge.draft { background: #edebe9; color: #605e5c; }
.badge.flagged { background: #fed9cc; color: #d83b01; }
.email-meta { width: 100%; border-collapse: collapse; font-size: 14px; }
.email-meta th { text-align: left; width: 140px; color: #605e5c; font-weight: 600; padding: 6px 24px; vertical-align: top; }
.email-meta td { padding: 6px 24px 6px 0; word-break: break-word; }
.email-body { padding: 16px 24px; border-top: 1px solid #edebe9; overflow-x: auto; }
.email-body pre { white-space: pre-wrap; word-wrap: break-word; font-family: Consolas, 'Courier New', monospace; font-size: 13px; margin: 0; }
.email-body.preview { color: #605e5c; }
.email-body.empty { color: #a19f9d; font-style: italic; }
";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC";

/// Header information for a rendered report.
#[derive(Debug, Clone)]
pub struct HtmlReport<'a> {
    folder: &'a str,
    mailbox: &'a str,
    exported_at: DateTime<Utc>,
}

impl<'a> HtmlReport<'a> {
    /// A report for `folder` of `mailbox`, stamped with the current time.
    #[must_use]
    pub fn new(folder: &'a str, mailbox: &'a str) -> Self {
        Self {
            folder,
            mailbox,
            exported_at: Utc::now(),
        }
    }

    /// Overrides the export timestamp shown in the header.
    #[must_use]
    pub const fn exported_at(mut self, exported_at: DateTime<Utc>) -> Self {
        self.exported_at = exported_at;
        self
    }

    /// Renders one card per record, in order.
    #[must_use]
    pub fn render(&self, records: &[EmailRecord]) -> String {
        Document {
            report: self,
            records,
        }
        .to_string()
    }
}

/// Renders `records` as an HTML report stamped with the current time.
#[must_use]
pub fn to_html(records: &[EmailRecord], folder: &str, mailbox: &str) -> String {
    HtmlReport::new(folder, mailbox).render(records)
}

struct Document<'r, 'a> {
    report: &'r HtmlReport<'a>,
    records: &'r [EmailRecord],
}

impl fmt::Display for Document<'_, '_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let folder = encode_safe(self.report.folder);
        let mailbox = encode_safe(self.report.mailbox);

        writeln!(f, "<!DOCTYPE html>")?;
        writeln!(f, "<html lang=\"en\">")?;
        writeln!(f, "<head>")?;
        writeln!(f, "<meta charset=\"utf-8\">")?;
        writeln!(
            f,
            "<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">"
        )?;
        writeln!(f, "<title>{folder}</title>")?;
        writeln!(f, "<style>{STYLE}</style>")?;
        writeln!(f, "</head>")?;
        writeln!(f, "<body>")?;
        writeln!(f, "<div class=\"header\">")?;
        writeln!(f, "<h1>{folder}</h1>")?;
        writeln!(f, "<div class=\"subtitle\">Folder: {folder} &middot; Mailbox: {mailbox}</div>")?;
        writeln!(
            f,
            "<div class=\"meta\">Exported: {} &middot; Total emails: {}</div>",
            self.report.exported_at.format(TIMESTAMP_FORMAT),
            self.records.len()
        )?;
        writeln!(f, "</div>")?;

        for (index, record) in self.records.iter().enumerate() {
            write_card(f, index + 1, record)?;
        }

        writeln!(f, "</body>")?;
        writeln!(f, "</html>")
    }
}

fn write_card(f: &mut fmt::Formatter<'_>, number: usize, record: &EmailRecord) -> fmt::Result {
    let subject = record
        .subject
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or("(No Subject)");

    writeln!(f, "<div class=\"email\">")?;
    writeln!(f, "<div class=\"email-header\">")?;
    writeln!(f, "<span class=\"email-number\">Email #{number}</span>")?;
    writeln!(f, "<h2 class=\"email-subject\">{}</h2>", encode_safe(subject))?;
    write_badges(f, record)?;
    writeln!(f, "</div>")?;

    writeln!(f, "<table class=\"email-meta\">")?;
    if let Some(from) = &record.from {
        write_row(f, "From", &encode_safe(&from.to_string()))?;
    }
    write_address_row(f, "To", record.to.as_deref())?;
    write_address_row(f, "Cc", record.cc.as_deref())?;
    write_address_row(f, "Bcc", record.bcc.as_deref())?;
    write_address_row(f, "Reply-To", record.reply_to.as_deref())?;
    write_row(f, "Received", &timestamp(record.received_at))?;
    write_row(f, "Sent", &timestamp(record.sent_at))?;
    write_row(
        f,
        "Importance",
        record.importance.unwrap_or(Importance::Normal).as_str(),
    )?;
    write_row(
        f,
        "Has Attachments",
        if record.has_attachments { "Yes" } else { "No" },
    )?;
    if let Some(categories) = &record.categories {
        write_row(f, "Categories", &encode_safe(&categories.join(", ")))?;
    }
    if let Some(conversation) = &record.conversation_id {
        write_row(f, "Conversation ID", &encode_safe(conversation))?;
    }
    writeln!(f, "</table>")?;

    write_body(f, record)?;
    writeln!(f, "</div>")
}

fn write_badges(f: &mut fmt::Formatter<'_>, record: &EmailRecord) -> fmt::Result {
    write!(f, "<div class=\"badges\">")?;
    if record.is_read {
        write!(f, "<span class=\"badge read\">Read</span>")?;
    } else {
        write!(f, "<span class=\"badge unread\">Unread</span>")?;
    }
    if record.importance == Some(Importance::High) {
        write!(f, "<span class=\"badge important\">Important</span>")?;
    }
    if record.is_draft {
        write!(f, "<span class=\"badge draft\">Draft</span>")?;
    }
    if record.flag.as_ref().is_some_and(|flag| flag.is_flagged()) {
        write!(f, "<span class=\"badge flagged\">Flagged</span>")?;
    }
    writeln!(f, "</div>")
}

/// Writes a metadata row; `value` must already be escaped.
fn write_row(f: &mut fmt::Formatter<'_>, label: &str, value: &str) -> fmt::Result {
    writeln!(f, "<tr><th>{label}</th><td>{value}</td></tr>")
}

fn write_address_row(
    f: &mut fmt::Formatter<'_>,
    label: &str,
    addresses: Option<&[EmailAddress]>,
) -> fmt::Result {
    let Some(addresses) = addresses.filter(|list| !list.is_empty()) else {
        return Ok(());
    };
    let joined = addresses
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    write_row(f, label, &encode_safe(&joined))
}

fn timestamp(value: Option<DateTime<Utc>>) -> String {
    value.map_or_else(
        || "N/A".to_string(),
        |t| t.format(TIMESTAMP_FORMAT).to_string(),
    )
}

fn write_body(f: &mut fmt::Formatter<'_>, record: &EmailRecord) -> fmt::Result {
    let content = record
        .body
        .content
        .as_deref()
        .filter(|c| !c.trim().is_empty());
    let preview = record
        .body_preview
        .as_deref()
        .filter(|p| !p.trim().is_empty());

    match (record.body.content_type, content, preview) {
        (BodyType::Html, Some(html), _) => {
            writeln!(f, "<div class=\"email-body html\">\n{html}\n</div>")
        }
        (BodyType::Text, Some(text), _) => writeln!(
            f,
            "<div class=\"email-body text\"><pre>{}</pre></div>",
            encode_safe(text)
        ),
        (_, None, Some(preview)) => writeln!(
            f,
            "<div class=\"email-body preview\"><pre>{}</pre></div>",
            encode_safe(preview)
        ),
        (_, None, None) => writeln!(f, "<div class=\"email-body empty\">No content</div>"),
    }
}
