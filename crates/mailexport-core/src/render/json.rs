//! Indented JSON export.

use crate::error::Result;
use crate::model::EmailRecord;

/// Serializes records as an indented JSON array.
///
/// Non-ASCII text is written as-is; only the escapes JSON requires are
/// applied.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn to_json(records: &[EmailRecord]) -> Result<String> {
    Ok(serde_json::to_string_pretty(records)?)
}

/// Parses a document produced by [`to_json`].
///
/// # Errors
///
/// Returns an error if `json` is not an array of email records.
pub fn from_json(json: &str) -> Result<Vec<EmailRecord>> {
    Ok(serde_json::from_str(json)?)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::{BodyType, EmailAddress, EmailBody, FlagInfo, Importance};
    use chrono::{TimeZone, Utc};
    use proptest::prelude::*;

    fn sample() -> EmailRecord {
        EmailRecord {
            id: "AAMkAGI2".into(),
            subject: Some("Réunion – 会議".into()),
            from: Some(EmailAddress::new("Zoë", "zoe@contoso.com")),
            to: Some(vec![EmailAddress::new("Bob", "bob@contoso.com")]),
            received_at: Some(Utc.with_ymd_and_hms(2024, 3, 1, 9, 15, 0).unwrap()),
            importance: Some(Importance::High),
            body: EmailBody {
                content_type: BodyType::Html,
                content: Some("<p>Bonjour</p>".into()),
            },
            flag: Some(FlagInfo {
                flag_status: Some("flagged".into()),
            }),
            ..EmailRecord::default()
        }
    }

    #[test]
    fn test_unicode_is_not_escaped() {
        let json = to_json(&[sample()]).unwrap();
        assert!(json.contains("Réunion – 会議"));
        assert!(json.contains("Zoë"));
        assert!(!json.contains("\\u"));
    }

    #[test]
    fn test_pascal_case_shape() {
        let json = to_json(&[sample()]).unwrap();
        for key in [
            "\"Id\"",
            "\"ToRecipients\"",
            "\"ReceivedDateTime\"",
            "\"Body\"",
            "\"ContentType\": \"Html\"",
            "\"FlagStatus\"",
        ] {
            assert!(json.contains(key), "missing {key}");
        }
        assert!(json.starts_with("[\n  {"));
    }

    #[test]
    fn test_empty_export() {
        assert_eq!(to_json(&[]).unwrap(), "[]");
        assert!(from_json("[]").unwrap().is_empty());
    }

    fn text() -> impl Strategy<Value = Option<String>> {
        proptest::option::of("\\PC{0,24}")
    }

    fn address() -> impl Strategy<Value = EmailAddress> {
        (text(), text()).prop_map(|(name, address)| EmailAddress { name, address })
    }

    fn record() -> impl Strategy<Value = EmailRecord> {
        (
            ("[A-Za-z0-9=+/-]{1,32}", text(), proptest::option::of(address())),
            proptest::option::of(proptest::collection::vec(address(), 0..4)),
            proptest::option::of(0i64..4_000_000_000),
            (any::<bool>(), any::<bool>(), any::<bool>()),
            proptest::option::of(prop_oneof![
                Just(Importance::Low),
                Just(Importance::Normal),
                Just(Importance::High)
            ]),
            (any::<bool>(), text(), text()),
            proptest::option::of(proptest::collection::vec("\\PC{0,12}", 0..3)),
        )
            .prop_map(
                |((id, subject, from), to, received, flags, importance, body, categories)| {
                    let (has_attachments, is_read, is_draft) = flags;
                    let (html, content, body_preview) = body;
                    EmailRecord {
                        id,
                        subject,
                        from,
                        cc: to.clone(),
                        to,
                        received_at: received
                            .and_then(|secs| Utc.timestamp_opt(secs, 0).single()),
                        has_attachments,
                        is_read,
                        is_draft,
                        importance,
                        categories,
                        body: EmailBody {
                            content_type: if html { BodyType::Html } else { BodyType::Text },
                            content,
                        },
                        body_preview,
                        ..EmailRecord::default()
                    }
                },
            )
    }

    proptest! {
        #[test]
        fn prop_json_round_trip(records in proptest::collection::vec(record(), 0..5)) {
            let json = to_json(&records).unwrap();
            prop_assert_eq!(from_json(&json).unwrap(), records);
        }
    }
}
