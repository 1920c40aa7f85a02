//! SOAP request envelopes for the EWS operations the exporter uses.

use std::fmt::Write as _;

use quick_xml::escape::escape;

const ENVELOPE_OPEN: &str = concat!(
    r#"<?xml version="1.0" encoding="utf-8"?>"#,
    r#"<soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/" "#,
    r#"xmlns:t="http://schemas.microsoft.com/exchange/services/2006/types" "#,
    r#"xmlns:m="http://schemas.microsoft.com/exchange/services/2006/messages">"#,
    r#"<soap:Header><t:RequestServerVersion Version="Exchange2016"/></soap:Header>"#,
    "<soap:Body>"
);

const ENVELOPE_CLOSE: &str = "</soap:Body></soap:Envelope>";

/// Properties requested in addition to `AllProperties` for messages.
const EXTRA_MESSAGE_FIELDS: &[&str] = &["item:Preview", "item:Flag"];

/// A folder reference inside a request.
#[derive(Debug, Clone, Copy)]
pub(crate) enum FolderRef<'a> {
    /// Well-known folder of a specific mailbox (`msgfolderroot`, `archivemsgfolderroot`).
    Distinguished { id: &'a str, mailbox: &'a str },
    /// Folder by id.
    Id(&'a str),
}

impl FolderRef<'_> {
    fn write_to(self, out: &mut String) {
        match self {
            Self::Distinguished { id, mailbox } => {
                let _ = write!(out, r#"<t:DistinguishedFolderId Id="{}">"#, escape(id));
                if !mailbox.trim().is_empty() {
                    let _ = write!(
                        out,
                        "<t:Mailbox><t:EmailAddress>{}</t:EmailAddress></t:Mailbox>",
                        escape(mailbox.trim())
                    );
                }
                out.push_str("</t:DistinguishedFolderId>");
            }
            Self::Id(id) => {
                let _ = write!(out, r#"<t:FolderId Id="{}"/>"#, escape(id));
            }
        }
    }
}

fn envelope(body: &str) -> String {
    let mut out = String::with_capacity(ENVELOPE_OPEN.len() + body.len() + ENVELOPE_CLOSE.len());
    out.push_str(ENVELOPE_OPEN);
    out.push_str(body);
    out.push_str(ENVELOPE_CLOSE);
    out
}

/// `GetFolder` for a single folder.
pub(crate) fn get_folder(folder: FolderRef<'_>) -> String {
    let mut body = String::from(
        "<m:GetFolder><m:FolderShape><t:BaseShape>AllProperties</t:BaseShape></m:FolderShape><m:FolderIds>",
    );
    folder.write_to(&mut body);
    body.push_str("</m:FolderIds></m:GetFolder>");
    envelope(&body)
}

/// Shallow `FindFolder` starting at `offset`.
pub(crate) fn find_folder(parent: FolderRef<'_>, page_size: u32, offset: u32) -> String {
    let mut body = format!(
        concat!(
            r#"<m:FindFolder Traversal="Shallow">"#,
            "<m:FolderShape><t:BaseShape>AllProperties</t:BaseShape></m:FolderShape>",
            r#"<m:IndexedPageFolderView MaxEntriesReturned="{}" Offset="{}" BasePoint="Beginning"/>"#,
            "<m:ParentFolderIds>"
        ),
        page_size, offset
    );
    parent.write_to(&mut body);
    body.push_str("</m:ParentFolderIds></m:FindFolder>");
    envelope(&body)
}

/// Shallow `FindItem` returning ids only, newest first.
pub(crate) fn find_item(folder: FolderRef<'_>, page_size: u32, offset: u32) -> String {
    let mut body = format!(
        concat!(
            r#"<m:FindItem Traversal="Shallow">"#,
            "<m:ItemShape><t:BaseShape>IdOnly</t:BaseShape></m:ItemShape>",
            r#"<m:IndexedPageItemView MaxEntriesReturned="{}" Offset="{}" BasePoint="Beginning"/>"#,
            r#"<m:SortOrder><t:FieldOrder Order="Descending"><t:FieldURI FieldURI="item:DateTimeReceived"/></t:FieldOrder></m:SortOrder>"#,
            "<m:ParentFolderIds>"
        ),
        page_size, offset
    );
    folder.write_to(&mut body);
    body.push_str("</m:ParentFolderIds></m:FindItem>");
    envelope(&body)
}

/// `GetItem` with bodies for the given item ids.
pub(crate) fn get_items(item_ids: &[String]) -> String {
    let mut body = String::from(
        "<m:GetItem><m:ItemShape><t:BaseShape>AllProperties</t:BaseShape><t:BodyType>Best</t:BodyType><t:AdditionalProperties>",
    );
    for field in EXTRA_MESSAGE_FIELDS {
        let _ = write!(body, r#"<t:FieldURI FieldURI="{field}"/>"#);
    }
    body.push_str("</t:AdditionalProperties></m:ItemShape><m:ItemIds>");
    for id in item_ids {
        let _ = write!(body, r#"<t:ItemId Id="{}"/>"#, escape(id.as_str()));
    }
    body.push_str("</m:ItemIds></m:GetItem>");
    envelope(&body)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::directory::ews::xml::parse_document;

    #[test]
    fn test_archive_root_request_names_mailbox() {
        let xml = get_folder(FolderRef::Distinguished {
            id: "archivemsgfolderroot",
            mailbox: "alice@contoso.com",
        });
        let doc = parse_document(&xml).unwrap();
        let folder = doc.find("DistinguishedFolderId").unwrap();
        assert_eq!(folder.attr("Id"), Some("archivemsgfolderroot"));
        assert_eq!(
            folder.find("EmailAddress").unwrap().text(),
            Some("alice@contoso.com")
        );
    }

    #[test]
    fn test_find_folder_paging_attributes() {
        let xml = find_folder(FolderRef::Id("AQMk=="), 1000, 2000);
        let doc = parse_document(&xml).unwrap();
        let view = doc.find("IndexedPageFolderView").unwrap();
        assert_eq!(view.attr("MaxEntriesReturned"), Some("1000"));
        assert_eq!(view.attr("Offset"), Some("2000"));
        assert_eq!(doc.find("FolderId").unwrap().attr("Id"), Some("AQMk=="));
    }

    #[test]
    fn test_ids_are_escaped() {
        let xml = get_items(&["a\"<b>".to_string(), "plain".to_string()]);
        let doc = parse_document(&xml).unwrap();
        let ids: Vec<_> = doc
            .find("ItemIds")
            .unwrap()
            .children_named("ItemId")
            .map(|e| e.attr("Id").unwrap().to_string())
            .collect();
        assert_eq!(ids, vec!["a\"<b>", "plain"]);
    }

    #[test]
    fn test_find_item_requests_ids_only() {
        let xml = find_item(FolderRef::Id("F1"), 10, 0);
        assert!(xml.contains("<t:BaseShape>IdOnly</t:BaseShape>"));
        assert!(xml.contains(r#"MaxEntriesReturned="10""#));
    }
}
