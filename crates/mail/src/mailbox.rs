//! Paged message listing
//!
//! Fetches one page of a mailbox location, caches the messages and returns
//! the parameters for the following page.

use anyhow::Result;
use log::debug;

use crate::api::{GetAllMessagesParameters, MailboxApi, normalize_message};
use crate::models::Message;
use crate::storage::MessageStore;

/// One page of a message listing
#[derive(Debug, Clone)]
pub struct MessagesPage {
    pub messages: Vec<Message>,
    /// Total number of messages in the location on the server
    pub total: u32,
    /// Parameters that continue after the last message of this page
    pub next: GetAllMessagesParameters,
}

impl MessagesPage {
    /// Whether the server returned nothing, i.e. paging is done
    pub fn is_last(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Fetch a page of messages and upsert them into the store
pub fn fetch_messages_page(
    api: &dyn MailboxApi,
    store: &dyn MessageStore,
    params: &GetAllMessagesParameters,
) -> Result<MessagesPage> {
    let response = api.fetch_messages(params)?;
    let next = response.bookmark_parameters_or(params);
    let total = response.total;

    let mut messages = Vec::with_capacity(response.messages.len());
    for api_message in response.messages {
        let message = normalize_message(api_message, &params.user_id);
        store.save_message(message.clone())?;
        messages.push(message);
    }

    debug!(
        "Fetched {} of {} messages in {:?}",
        messages.len(),
        total,
        params.label_id
    );

    Ok(MessagesPage {
        messages,
        total,
        next,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ApiMessage, MessagesResponse};
    use crate::models::{ConversationId, MessageId, UserId};
    use crate::storage::InMemoryMailStore;
    use std::sync::Mutex;

    /// Serves two pages keyed on the `end_id` bookmark
    #[derive(Default)]
    struct PagedApi {
        requests: Mutex<Vec<GetAllMessagesParameters>>,
    }

    fn api_message(id: &str, time: i64) -> ApiMessage {
        serde_json::from_value(serde_json::json!({
            "ID": id,
            "ConversationID": format!("conv-{}", id),
            "Subject": format!("Subject {}", id),
            "Sender": { "Name": "Sender", "Address": "sender@proton.me" },
            "Time": time,
            "Unread": 1,
            "LabelIDs": ["0"]
        }))
        .unwrap()
    }

    impl MailboxApi for PagedApi {
        fn fetch_messages(&self, params: &GetAllMessagesParameters) -> Result<MessagesResponse> {
            self.requests.lock().unwrap().push(params.clone());
            let messages = match params.end_id.as_deref() {
                None => vec![api_message("m3", 300), api_message("m2", 200)],
                Some("m2") => vec![api_message("m1", 100)],
                Some(_) => Vec::new(),
            };
            Ok(MessagesResponse {
                code: 1000,
                total: 3,
                messages,
            })
        }
        fn mark_messages_read(&self, _: &UserId, _: &[MessageId]) -> Result<()> {
            unimplemented!()
        }
        fn mark_messages_unread(&self, _: &UserId, _: &[MessageId]) -> Result<()> {
            unimplemented!()
        }
        fn label_messages(&self, _: &UserId, _: &str, _: &[MessageId]) -> Result<()> {
            unimplemented!()
        }
        fn unlabel_messages(&self, _: &UserId, _: &str, _: &[MessageId]) -> Result<()> {
            unimplemented!()
        }
        fn delete_messages(&self, _: &UserId, _: &[MessageId], _: &str) -> Result<()> {
            unimplemented!()
        }
        fn mark_conversations_read(&self, _: &UserId, _: &[ConversationId]) -> Result<()> {
            unimplemented!()
        }
        fn mark_conversations_unread(&self, _: &UserId, _: &[ConversationId], _: &str) -> Result<()> {
            unimplemented!()
        }
        fn label_conversations(&self, _: &UserId, _: &str, _: &[ConversationId]) -> Result<()> {
            unimplemented!()
        }
        fn unlabel_conversations(&self, _: &UserId, _: &str, _: &[ConversationId]) -> Result<()> {
            unimplemented!()
        }
        fn delete_conversations(&self, _: &UserId, _: &[ConversationId], _: &str) -> Result<()> {
            unimplemented!()
        }
    }

    #[test]
    fn test_pages_until_empty() {
        let api = PagedApi::default();
        let store = InMemoryMailStore::new();
        let user = UserId::new("u1");
        let mut params = GetAllMessagesParameters::new(user.clone()).with_label("0");

        let mut seen = Vec::new();
        loop {
            let page = fetch_messages_page(&api, &store, &params).unwrap();
            if page.is_last() {
                break;
            }
            seen.extend(page.messages.iter().map(|m| m.id.as_str().to_string()));
            params = page.next;
        }

        assert_eq!(seen, vec!["m3", "m2", "m1"]);
        assert_eq!(api.requests.lock().unwrap().len(), 3);

        let cached = store.find_message(&MessageId::new("m2")).unwrap().unwrap();
        assert_eq!(cached.user_id, user);
        assert!(cached.unread);
        assert_eq!(cached.subject, "Subject m2");
    }

    #[test]
    fn test_second_request_continues_from_bookmark() {
        let api = PagedApi::default();
        let store = InMemoryMailStore::new();
        let params = GetAllMessagesParameters::new(UserId::new("u1"));

        let first = fetch_messages_page(&api, &store, &params).unwrap();
        assert_eq!(first.total, 3);
        assert_eq!(first.next.end, Some(200));
        assert_eq!(first.next.end_id.as_deref(), Some("m2"));
    }
}
