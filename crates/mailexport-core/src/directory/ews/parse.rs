//! Maps EWS SOAP responses onto the shared model.

use chrono::{DateTime, Utc};

use super::xml::{Element, parse_document};
use crate::directory::{Page, PageCursor};
use crate::error::{Error, Result};
use crate::model::{FolderNode, RemoteBody, RemoteFlag, RemoteMessage, RemoteRecipient};

/// Folder element kinds returned by `FindFolder`/`GetFolder`.
const FOLDER_KINDS: &[&str] = &[
    "Folder",
    "SearchFolder",
    "CalendarFolder",
    "ContactsFolder",
    "TasksFolder",
];

/// Item element kinds that are mail messages.
const MESSAGE_KINDS: &[&str] = &[
    "Message",
    "MeetingRequest",
    "MeetingResponse",
    "MeetingCancellation",
];

/// An EWS `ResponseClass="Error"` result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct EwsFault {
    pub(crate) code: String,
    pub(crate) message: String,
}

impl From<EwsFault> for Error {
    fn from(fault: EwsFault) -> Self {
        Self::Remote {
            status: None,
            message: format!("{}: {}", fault.code, fault.message),
        }
    }
}

/// Outcome of parsing a response: either the payload or a per-message fault.
pub(crate) type Parsed<T> = std::result::Result<T, EwsFault>;

/// Extracts the response messages, failing on the first error-class one.
fn response_messages(doc: &Element) -> Result<Parsed<Vec<&Element>>> {
    if let Some(fault) = doc.find("Fault") {
        let message = fault
            .child_text("faultstring")
            .unwrap_or("SOAP fault")
            .to_string();
        return Err(Error::Remote {
            status: None,
            message,
        });
    }

    let container = doc
        .find("ResponseMessages")
        .ok_or_else(|| Error::Xml("response has no ResponseMessages".into()))?;

    for message in &container.children {
        if message.attr("ResponseClass") == Some("Error") {
            return Ok(Err(EwsFault {
                code: message
                    .child_text("ResponseCode")
                    .unwrap_or("ErrorUnknown")
                    .to_string(),
                message: message.child_text("MessageText").unwrap_or_default().to_string(),
            }));
        }
    }
    Ok(Ok(container.children.iter().collect()))
}

fn parse_u32(element: &Element, child: &str) -> u32 {
    element
        .child_text(child)
        .and_then(|v| v.parse().ok())
        .unwrap_or(0)
}

fn parse_bool(element: &Element, child: &str) -> Option<bool> {
    element
        .child_text(child)
        .map(|v| v.eq_ignore_ascii_case("true"))
}

fn parse_time(element: &Element, child: &str) -> Option<DateTime<Utc>> {
    element
        .child_text(child)
        .and_then(|v| DateTime::parse_from_rfc3339(v).ok())
        .map(|t| t.with_timezone(&Utc))
}

fn folder_node(element: &Element) -> Option<FolderNode> {
    let id = element.child("FolderId")?.attr("Id")?;
    Some(
        FolderNode::new(id, element.child_text("DisplayName").unwrap_or_default())
            .with_counts(
                parse_u32(element, "TotalCount"),
                parse_u32(element, "UnreadCount"),
            )
            .with_child_count(parse_u32(element, "ChildFolderCount")),
    )
}

fn folders_in(container: &Element) -> Vec<FolderNode> {
    container
        .children
        .iter()
        .filter(|e| FOLDER_KINDS.contains(&e.name.as_str()))
        .filter_map(folder_node)
        .collect()
}

/// Next-page cursor from a `RootFolder` paging element.
fn next_offset(root: &Element, page_len: usize) -> Option<PageCursor> {
    let is_last = root
        .attr("IncludesLastItemInRange")
        .is_none_or(|v| v.eq_ignore_ascii_case("true"));
    if is_last || page_len == 0 {
        return None;
    }
    root.attr("IndexedPagingOffset")
        .and_then(|v| v.parse().ok())
        .map(PageCursor::Offset)
}

/// Parses a `GetFolder` response for a single folder.
pub(crate) fn get_folder_response(xml: &str) -> Result<Parsed<FolderNode>> {
    let doc = parse_document(xml)?;
    let messages = match response_messages(&doc)? {
        Ok(messages) => messages,
        Err(fault) => return Ok(Err(fault)),
    };
    messages
        .iter()
        .filter_map(|m| m.child("Folders"))
        .flat_map(folders_in)
        .next()
        .map(Ok)
        .ok_or_else(|| Error::Xml("GetFolder response contains no folder".into()))
}

/// Parses a `FindFolder` response page.
pub(crate) fn find_folder_response(xml: &str) -> Result<Parsed<Page<FolderNode>>> {
    let doc = parse_document(xml)?;
    let messages = match response_messages(&doc)? {
        Ok(messages) => messages,
        Err(fault) => return Ok(Err(fault)),
    };
    let root = messages
        .iter()
        .find_map(|m| m.child("RootFolder"))
        .ok_or_else(|| Error::Xml("FindFolder response has no RootFolder".into()))?;

    let items = root.child("Folders").map(folders_in).unwrap_or_default();
    let next = next_offset(root, items.len());
    Ok(Ok(Page { items, next }))
}

/// Parses a `FindItem` response page into message ids.
pub(crate) fn find_item_response(xml: &str) -> Result<Parsed<Page<String>>> {
    let doc = parse_document(xml)?;
    let messages = match response_messages(&doc)? {
        Ok(messages) => messages,
        Err(fault) => return Ok(Err(fault)),
    };
    let root = messages
        .iter()
        .find_map(|m| m.child("RootFolder"))
        .ok_or_else(|| Error::Xml("FindItem response has no RootFolder".into()))?;

    let listed = root.child("Items").map_or(0, |items| items.children.len());
    let items: Vec<String> = root
        .child("Items")
        .into_iter()
        .flat_map(|items| items.children.iter())
        .filter(|e| MESSAGE_KINDS.contains(&e.name.as_str()))
        .filter_map(|e| e.child("ItemId")?.attr("Id").map(str::to_string))
        .collect();
    // Offsets advance over every listed item, including skipped non-mail ones.
    let next = next_offset(root, listed);
    Ok(Ok(Page { items, next }))
}

fn recipient(mailbox: &Element) -> RemoteRecipient {
    RemoteRecipient::new(
        mailbox.child_text("Name").map(str::to_string),
        mailbox.child_text("EmailAddress").map(str::to_string),
    )
}

fn recipients(element: &Element, child: &str) -> Option<Vec<RemoteRecipient>> {
    element
        .child(child)
        .map(|list| list.children_named("Mailbox").map(recipient).collect())
}

/// `NotFlagged` becomes `notFlagged`, matching the Graph spelling.
fn graph_flag_status(status: &str) -> String {
    let mut chars = status.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_lowercase().chain(chars).collect()
    })
}

fn remote_message(element: &Element) -> Option<RemoteMessage> {
    let id = element.child("ItemId")?.attr("Id")?.to_string();
    let body = element.child("Body").map(|body| RemoteBody {
        content_type: body.attr("BodyType").map(str::to_string),
        content: Some(body.raw_text().to_string()).filter(|c| !c.trim().is_empty()),
    });

    Some(RemoteMessage {
        id,
        subject: element.child_text("Subject").map(str::to_string),
        from: element.child("From").and_then(|f| f.child("Mailbox")).map(recipient),
        to_recipients: recipients(element, "ToRecipients"),
        cc_recipients: recipients(element, "CcRecipients"),
        bcc_recipients: recipients(element, "BccRecipients"),
        reply_to: recipients(element, "ReplyTo"),
        received_date_time: parse_time(element, "DateTimeReceived"),
        sent_date_time: parse_time(element, "DateTimeSent"),
        has_attachments: parse_bool(element, "HasAttachments"),
        importance: element.child_text("Importance").map(str::to_string),
        is_read: parse_bool(element, "IsRead"),
        is_draft: parse_bool(element, "IsDraft"),
        internet_message_id: element.child_text("InternetMessageId").map(str::to_string),
        conversation_id: element
            .child("ConversationId")
            .and_then(|c| c.attr("Id"))
            .map(str::to_string),
        categories: element.child("Categories").map(|c| {
            c.children_named("String")
                .filter_map(Element::text)
                .map(str::to_string)
                .collect()
        }),
        body,
        body_preview: element.child_text("Preview").map(str::to_string),
        flag: element.child("Flag").map(|f| RemoteFlag {
            flag_status: f.child_text("FlagStatus").map(graph_flag_status),
        }),
    })
}

/// Parses a `GetItem` response, preserving request order.
pub(crate) fn get_item_response(xml: &str) -> Result<Parsed<Vec<RemoteMessage>>> {
    let doc = parse_document(xml)?;
    let messages = match response_messages(&doc)? {
        Ok(messages) => messages,
        Err(fault) => return Ok(Err(fault)),
    };
    let mut found = Vec::new();
    for message in messages {
        if let Some(items) = message.child("Items") {
            items.find_all(&|name| MESSAGE_KINDS.contains(&name), &mut found);
        }
    }
    Ok(Ok(found.into_iter().filter_map(remote_message).collect()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const FIND_FOLDER: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/">
  <s:Body>
    <m:FindFolderResponse xmlns:m="http://schemas.microsoft.com/exchange/services/2006/messages" xmlns:t="http://schemas.microsoft.com/exchange/services/2006/types">
      <m:ResponseMessages>
        <m:FindFolderResponseMessage ResponseClass="Success">
          <m:ResponseCode>NoError</m:ResponseCode>
          <m:RootFolder IndexedPagingOffset="2" TotalItemsInView="3" IncludesLastItemInRange="false">
            <t:Folders>
              <t:Folder>
                <t:FolderId Id="F-2023" ChangeKey="x"/>
                <t:DisplayName>2023</t:DisplayName>
                <t:TotalCount>120</t:TotalCount>
                <t:ChildFolderCount>1</t:ChildFolderCount>
                <t:UnreadCount>4</t:UnreadCount>
              </t:Folder>
              <t:CalendarFolder>
                <t:FolderId Id="F-CAL"/>
                <t:DisplayName>Calendar</t:DisplayName>
                <t:TotalCount>0</t:TotalCount>
                <t:ChildFolderCount>0</t:ChildFolderCount>
              </t:CalendarFolder>
            </t:Folders>
          </m:RootFolder>
        </m:FindFolderResponseMessage>
      </m:ResponseMessages>
    </m:FindFolderResponse>
  </s:Body>
</s:Envelope>"#;

    const GET_ITEM: &str = r#"<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/"><s:Body>
<m:GetItemResponse xmlns:m="m" xmlns:t="t"><m:ResponseMessages>
<m:GetItemResponseMessage ResponseClass="Success"><m:ResponseCode>NoError</m:ResponseCode><m:Items>
<t:Message>
  <t:ItemId Id="ITEM-1" ChangeKey="ck"/>
  <t:Subject>Budget &amp; plan</t:Subject>
  <t:Body BodyType="HTML">&lt;p&gt;See attached&lt;/p&gt;</t:Body>
  <t:DateTimeReceived>2023-11-02T08:30:00Z</t:DateTimeReceived>
  <t:DateTimeSent>2023-11-02T08:29:55Z</t:DateTimeSent>
  <t:HasAttachments>true</t:HasAttachments>
  <t:Importance>High</t:Importance>
  <t:Categories><t:String>Red</t:String><t:String>Finance</t:String></t:Categories>
  <t:Preview>See attached</t:Preview>
  <t:Flag><t:FlagStatus>Flagged</t:FlagStatus></t:Flag>
  <t:ToRecipients>
    <t:Mailbox><t:Name>Bob</t:Name><t:EmailAddress>bob@contoso.com</t:EmailAddress></t:Mailbox>
    <t:Mailbox><t:EmailAddress>carol@contoso.com</t:EmailAddress></t:Mailbox>
  </t:ToRecipients>
  <t:IsDraft>false</t:IsDraft>
  <t:From><t:Mailbox><t:Name>Alice</t:Name><t:EmailAddress>alice@contoso.com</t:EmailAddress></t:Mailbox></t:From>
  <t:InternetMessageId>&lt;abc@contoso.com&gt;</t:InternetMessageId>
  <t:IsRead>true</t:IsRead>
  <t:ConversationId Id="CONV-1"/>
</t:Message>
</m:Items></m:GetItemResponseMessage>
</m:ResponseMessages></m:GetItemResponse></s:Body></s:Envelope>"#;

    #[test]
    fn test_find_folder_page() {
        let page = find_folder_response(FIND_FOLDER).unwrap().unwrap();
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[0].id, "F-2023");
        assert_eq!(page.items[0].total_items, 120);
        assert_eq!(page.items[0].unread_items, 4);
        assert_eq!(page.items[0].child_count, 1);
        assert_eq!(page.items[1].unread_items, 0);
        assert_eq!(page.next, Some(PageCursor::Offset(2)));
    }

    #[test]
    fn test_last_page_has_no_cursor() {
        let xml = FIND_FOLDER.replace(
            r#"IncludesLastItemInRange="false""#,
            r#"IncludesLastItemInRange="true""#,
        );
        let page = find_folder_response(&xml).unwrap().unwrap();
        assert!(page.next.is_none());
    }

    #[test]
    fn test_error_response_is_a_fault() {
        let xml = r#"<s:Envelope xmlns:s="s"><s:Body><m:GetFolderResponse xmlns:m="m"><m:ResponseMessages>
            <m:GetFolderResponseMessage ResponseClass="Error">
              <m:MessageText>The specified folder could not be found in the store.</m:MessageText>
              <m:ResponseCode>ErrorFolderNotFound</m:ResponseCode>
            </m:GetFolderResponseMessage>
          </m:ResponseMessages></m:GetFolderResponse></s:Body></s:Envelope>"#;

        let fault = get_folder_response(xml).unwrap().unwrap_err();
        assert_eq!(fault.code, "ErrorFolderNotFound");
        assert!(fault.message.contains("could not be found"));
    }

    #[test]
    fn test_soap_fault_is_remote_error() {
        let xml = r#"<s:Envelope xmlns:s="s"><s:Body><s:Fault><faultcode>a:ErrorSchemaValidation</faultcode><faultstring>The request failed schema validation.</faultstring></s:Fault></s:Body></s:Envelope>"#;
        let err = find_item_response(xml).unwrap_err();
        assert!(err.to_string().contains("schema validation"));
    }

    #[test]
    fn test_get_item_maps_message() {
        let messages = get_item_response(GET_ITEM).unwrap().unwrap();
        assert_eq!(messages.len(), 1);
        let msg = &messages[0];
        assert_eq!(msg.id, "ITEM-1");
        assert_eq!(msg.subject.as_deref(), Some("Budget & plan"));
        let body = msg.body.as_ref().unwrap();
        assert_eq!(body.content_type.as_deref(), Some("HTML"));
        assert_eq!(body.content.as_deref(), Some("<p>See attached</p>"));
        assert_eq!(msg.to_recipients.as_ref().unwrap().len(), 2);
        assert_eq!(msg.cc_recipients, None);
        assert_eq!(msg.importance.as_deref(), Some("High"));
        assert_eq!(msg.is_read, Some(true));
        assert_eq!(msg.has_attachments, Some(true));
        assert_eq!(msg.conversation_id.as_deref(), Some("CONV-1"));
        assert_eq!(msg.internet_message_id.as_deref(), Some("<abc@contoso.com>"));
        assert_eq!(
            msg.categories.as_deref(),
            Some(&["Red".to_string(), "Finance".to_string()][..])
        );
        assert_eq!(
            msg.flag.as_ref().unwrap().flag_status.as_deref(),
            Some("flagged")
        );
        assert_eq!(
            msg.received_date_time.unwrap().to_rfc3339(),
            "2023-11-02T08:30:00+00:00"
        );
    }

    #[test]
    fn test_find_item_skips_non_mail_but_advances_offset() {
        let xml = r#"<s:Envelope xmlns:s="s"><s:Body><m:FindItemResponse xmlns:m="m" xmlns:t="t"><m:ResponseMessages>
            <m:FindItemResponseMessage ResponseClass="Success"><m:ResponseCode>NoError</m:ResponseCode>
              <m:RootFolder IndexedPagingOffset="3" TotalItemsInView="10" IncludesLastItemInRange="false"><t:Items>
                <t:Message><t:ItemId Id="A"/></t:Message>
                <t:Contact><t:ItemId Id="B"/></t:Contact>
                <t:MeetingRequest><t:ItemId Id="C"/></t:MeetingRequest>
              </t:Items></m:RootFolder>
            </m:FindItemResponseMessage></m:ResponseMessages></m:FindItemResponse></s:Body></s:Envelope>"#;

        let page = find_item_response(xml).unwrap().unwrap();
        assert_eq!(page.items, vec!["A", "C"]);
        assert_eq!(page.next, Some(PageCursor::Offset(3)));
    }

    #[test]
    fn test_flag_status_spelling() {
        assert_eq!(graph_flag_status("NotFlagged"), "notFlagged");
        assert_eq!(graph_flag_status(""), "");
    }
}
