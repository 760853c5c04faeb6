//! Action handler for mailbox operations
//!
//! Coordinates between the mail API and local storage for mutations.

use anyhow::Result;
use log::{info, warn};
use std::sync::Arc;

use super::usecases::{
    ConversationActions, ConversationsActionResult, MessageActions, ReadStatusAction,
    StarredStatusAction,
};
use crate::api::MailboxApi;
use crate::models::{ConversationId, Message, MessageId, MessageLocation, UserId};
use crate::storage::MessageStore;

/// Handler for move, delete, star and read/unread actions
///
/// Actions are performed in two steps:
/// 1. Call the mail API to update server state
/// 2. Update local storage to reflect the change
///
/// The server stays the source of truth; local state only mirrors
/// successful calls.
pub struct MailboxActionHandler {
    api: Arc<dyn MailboxApi>,
    store: Arc<dyn MessageStore>,
}

impl MailboxActionHandler {
    pub fn new(api: Arc<dyn MailboxApi>, store: Arc<dyn MessageStore>) -> Self {
        Self { api, store }
    }

    /// Apply `update` to each stored message, skipping ids not cached locally
    fn update_messages<F>(&self, ids: &[MessageId], update: F) -> Result<()>
    where
        F: Fn(&Message) -> Vec<String>,
    {
        for id in ids {
            if let Some(message) = self.store.find_message(id)? {
                self.store.update_message_labels(id, update(&message))?;
            }
        }
        Ok(())
    }

    fn conversation_message_ids(&self, ids: &[ConversationId]) -> Result<Vec<MessageId>> {
        let mut message_ids = Vec::new();
        for conversation_id in ids {
            message_ids.extend(
                self.store
                    .list_messages_for_conversation(conversation_id)?
                    .into_iter()
                    .map(|m| m.id),
            );
        }
        Ok(message_ids)
    }

    fn set_starred_locally(&self, ids: &[MessageId], action: StarredStatusAction) -> Result<()> {
        let starred = MessageLocation::Starred.id_string();
        self.update_messages(ids, |message| {
            let mut labels = message.label_ids.clone();
            match action {
                StarredStatusAction::Star => {
                    if !labels.contains(&starred) {
                        labels.push(starred.clone());
                    }
                }
                StarredStatusAction::Unstar => labels.retain(|l| l != &starred),
            }
            labels
        })
    }

    fn move_conversations(&self, ids: &[ConversationId], user_id: &UserId, folder_id: &str) -> Result<()> {
        info!("Moving {} conversations to {}", ids.len(), folder_id);
        self.api.label_conversations(user_id, folder_id, ids)?;

        let message_ids = self.conversation_message_ids(ids)?;
        self.update_messages(&message_ids, |message| relocate(&message.label_ids, None, folder_id))
    }

    fn change_conversations_read(
        &self,
        ids: &[ConversationId],
        action: ReadStatusAction,
        user_id: &UserId,
        location_id: &str,
    ) -> Result<()> {
        match action {
            ReadStatusAction::MarkRead => {
                self.api.mark_conversations_read(user_id, ids)?;
                for id in self.conversation_message_ids(ids)? {
                    self.store.set_message_unread(&id, false)?;
                }
            }
            ReadStatusAction::MarkUnread => {
                self.api.mark_conversations_unread(user_id, ids, location_id)?;
                // Only the latest message in the location turns unread
                for conversation_id in ids {
                    let latest = self
                        .store
                        .list_messages_for_conversation(conversation_id)?
                        .into_iter()
                        .filter(|m| m.has_label(location_id))
                        .max_by_key(|m| m.time);
                    if let Some(message) = latest {
                        self.store.set_message_unread(&message.id, true)?;
                    }
                }
            }
        }
        Ok(())
    }

    fn change_conversations_starred(
        &self,
        ids: &[ConversationId],
        user_id: &UserId,
        action: StarredStatusAction,
    ) -> Result<()> {
        let starred = MessageLocation::Starred.id_string();
        match action {
            StarredStatusAction::Star => self.api.label_conversations(user_id, &starred, ids)?,
            StarredStatusAction::Unstar => self.api.unlabel_conversations(user_id, &starred, ids)?,
        }
        let message_ids = self.conversation_message_ids(ids)?;
        self.set_starred_locally(&message_ids, action)
    }

    fn delete_conversations(&self, ids: &[ConversationId], user_id: &UserId, location_id: &str) -> Result<()> {
        info!("Deleting {} conversations from {}", ids.len(), location_id);
        self.api.delete_conversations(user_id, ids, location_id)?;

        for conversation_id in ids {
            for message in self.store.list_messages_for_conversation(conversation_id)? {
                if message.has_label(location_id) {
                    self.store.delete_message(&message.id)?;
                }
            }
        }
        Ok(())
    }
}

/// Label ids after moving a message into `destination`
///
/// A message sits in at most one exclusive location, so those are dropped
/// along with the folder it is leaving.
fn relocate(label_ids: &[String], current_folder_id: Option<&str>, destination: &str) -> Vec<String> {
    let mut labels: Vec<String> = label_ids
        .iter()
        .filter(|id| Some(id.as_str()) != current_folder_id)
        .filter(|id| {
            !id.parse::<i32>()
                .ok()
                .and_then(MessageLocation::from_value)
                .is_some_and(MessageLocation::is_exclusive)
        })
        .cloned()
        .collect();

    if !labels.iter().any(|l| l == destination) {
        labels.push(destination.to_string());
    }
    labels
}

fn into_result(outcome: Result<()>, action: &str) -> ConversationsActionResult {
    match outcome {
        Ok(()) => ConversationsActionResult::Success,
        Err(e) => {
            warn!("Conversation {} failed: {:#}", action, e);
            ConversationsActionResult::Error
        }
    }
}

impl MessageActions for MailboxActionHandler {
    fn move_to_folder(
        &self,
        ids: &[MessageId],
        new_folder_id: &str,
        current_folder_id: &str,
        user_id: &UserId,
    ) -> Result<()> {
        info!(
            "Moving {} messages from {} to {}",
            ids.len(),
            current_folder_id,
            new_folder_id
        );
        self.api.label_messages(user_id, new_folder_id, ids)?;

        self.update_messages(ids, |message| {
            relocate(&message.label_ids, Some(current_folder_id), new_folder_id)
        })
    }

    fn change_read_status(
        &self,
        ids: &[MessageId],
        action: ReadStatusAction,
        user_id: &UserId,
    ) -> Result<()> {
        let unread = match action {
            ReadStatusAction::MarkRead => {
                self.api.mark_messages_read(user_id, ids)?;
                false
            }
            ReadStatusAction::MarkUnread => {
                self.api.mark_messages_unread(user_id, ids)?;
                true
            }
        };

        for id in ids {
            self.store.set_message_unread(id, unread)?;
        }
        Ok(())
    }

    fn change_starred_status(
        &self,
        user_id: &UserId,
        ids: &[MessageId],
        action: StarredStatusAction,
    ) -> Result<()> {
        let starred = MessageLocation::Starred.id_string();
        match action {
            StarredStatusAction::Star => self.api.label_messages(user_id, &starred, ids)?,
            StarredStatusAction::Unstar => self.api.unlabel_messages(user_id, &starred, ids)?,
        }
        self.set_starred_locally(ids, action)
    }

    fn delete(&self, ids: &[MessageId], current_folder_id: &str, user_id: &UserId) -> Result<()> {
        info!("Deleting {} messages from {}", ids.len(), current_folder_id);
        self.api.delete_messages(user_id, ids, current_folder_id)?;

        for id in ids {
            self.store.delete_message(id)?;
        }
        Ok(())
    }
}

impl ConversationActions for MailboxActionHandler {
    fn move_to_folder(
        &self,
        ids: &[ConversationId],
        user_id: &UserId,
        folder_id: &str,
    ) -> ConversationsActionResult {
        into_result(self.move_conversations(ids, user_id, folder_id), "move")
    }

    fn change_read_status(
        &self,
        ids: &[ConversationId],
        action: ReadStatusAction,
        user_id: &UserId,
        location_id: &str,
    ) -> ConversationsActionResult {
        into_result(
            self.change_conversations_read(ids, action, user_id, location_id),
            "read status change",
        )
    }

    fn change_starred_status(
        &self,
        ids: &[ConversationId],
        user_id: &UserId,
        action: StarredStatusAction,
    ) -> ConversationsActionResult {
        into_result(
            self.change_conversations_starred(ids, user_id, action),
            "starred status change",
        )
    }

    fn delete(
        &self,
        ids: &[ConversationId],
        user_id: &UserId,
        location_id: &str,
    ) -> ConversationsActionResult {
        into_result(self.delete_conversations(ids, user_id, location_id), "delete")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{GetAllMessagesParameters, MessagesResponse};
    use crate::storage::InMemoryMailStore;
    use chrono::{TimeZone, Utc};
    use std::sync::Mutex;

    /// Fake API recording each call as a short string
    #[derive(Default)]
    struct RecordingApi {
        calls: Mutex<Vec<String>>,
        fail: bool,
    }

    impl RecordingApi {
        fn record(&self, call: String) -> Result<()> {
            self.calls.lock().unwrap().push(call);
            if self.fail {
                anyhow::bail!("HTTP 500");
            }
            Ok(())
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    fn join<T: AsRef<str>>(ids: impl IntoIterator<Item = T>) -> String {
        ids.into_iter()
            .map(|id| id.as_ref().to_string())
            .collect::<Vec<_>>()
            .join(",")
    }

    impl MailboxApi for RecordingApi {
        fn fetch_messages(&self, _params: &GetAllMessagesParameters) -> Result<MessagesResponse> {
            anyhow::bail!("not used")
        }
        fn mark_messages_read(&self, _user_id: &UserId, ids: &[MessageId]) -> Result<()> {
            self.record(format!("read {}", join(ids.iter().map(|i| i.as_str()))))
        }
        fn mark_messages_unread(&self, _user_id: &UserId, ids: &[MessageId]) -> Result<()> {
            self.record(format!("unread {}", join(ids.iter().map(|i| i.as_str()))))
        }
        fn label_messages(&self, _user_id: &UserId, label_id: &str, ids: &[MessageId]) -> Result<()> {
            self.record(format!("label {} {}", label_id, join(ids.iter().map(|i| i.as_str()))))
        }
        fn unlabel_messages(&self, _user_id: &UserId, label_id: &str, ids: &[MessageId]) -> Result<()> {
            self.record(format!("unlabel {} {}", label_id, join(ids.iter().map(|i| i.as_str()))))
        }
        fn delete_messages(&self, _user_id: &UserId, ids: &[MessageId], label_id: &str) -> Result<()> {
            self.record(format!("delete {} {}", label_id, join(ids.iter().map(|i| i.as_str()))))
        }
        fn mark_conversations_read(&self, _user_id: &UserId, ids: &[ConversationId]) -> Result<()> {
            self.record(format!("conv read {}", join(ids.iter().map(|i| i.as_str()))))
        }
        fn mark_conversations_unread(
            &self,
            _user_id: &UserId,
            ids: &[ConversationId],
            label_id: &str,
        ) -> Result<()> {
            self.record(format!("conv unread {} {}", label_id, join(ids.iter().map(|i| i.as_str()))))
        }
        fn label_conversations(&self, _user_id: &UserId, label_id: &str, ids: &[ConversationId]) -> Result<()> {
            self.record(format!("conv label {} {}", label_id, join(ids.iter().map(|i| i.as_str()))))
        }
        fn unlabel_conversations(&self, _user_id: &UserId, label_id: &str, ids: &[ConversationId]) -> Result<()> {
            self.record(format!("conv unlabel {} {}", label_id, join(ids.iter().map(|i| i.as_str()))))
        }
        fn delete_conversations(&self, _user_id: &UserId, ids: &[ConversationId], label_id: &str) -> Result<()> {
            self.record(format!("conv delete {} {}", label_id, join(ids.iter().map(|i| i.as_str()))))
        }
    }

    fn message(id: &str, conversation: &str, labels: &[&str], millis: i64) -> Message {
        Message::builder(id, conversation)
            .user_id(UserId::new("u1"))
            .time(Utc.timestamp_millis_opt(millis).unwrap())
            .label_ids(labels.iter().map(|l| l.to_string()).collect())
            .build()
    }

    fn setup(fail: bool) -> (MailboxActionHandler, Arc<RecordingApi>, Arc<InMemoryMailStore>) {
        let api = Arc::new(RecordingApi {
            fail,
            ..Default::default()
        });
        let store = Arc::new(InMemoryMailStore::new());
        store.save_message(message("m1", "c1", &["0", "custom"], 1_000)).unwrap();
        store.save_message(message("m2", "c1", &["0"], 2_000)).unwrap();
        store.save_message(message("m3", "c2", &["6"], 3_000)).unwrap();
        (MailboxActionHandler::new(api.clone(), store.clone()), api, store)
    }

    fn labels_of(store: &InMemoryMailStore, id: &str) -> Vec<String> {
        store
            .find_message(&MessageId::new(id))
            .unwrap()
            .unwrap()
            .label_ids
    }

    #[test]
    fn test_relocate_drops_exclusive_locations() {
        let labels = vec!["0".to_string(), "5".to_string(), "10".to_string(), "custom".to_string()];
        assert_eq!(relocate(&labels, None, "6"), vec!["5", "10", "custom", "6"]);
        assert_eq!(relocate(&labels, Some("custom"), "3"), vec!["5", "10", "3"]);
    }

    #[test]
    fn test_move_messages_calls_api_then_updates_store() {
        let (handler, api, store) = setup(false);
        let user = UserId::new("u1");

        MessageActions::move_to_folder(&handler, &[MessageId::new("m3")], "0", "6", &user).unwrap();

        assert_eq!(api.calls(), vec!["label 0 m3"]);
        assert_eq!(labels_of(&store, "m3"), vec!["0"]);
    }

    #[test]
    fn test_message_api_failure_leaves_store_untouched() {
        let (handler, _, store) = setup(true);

        let result = MessageActions::move_to_folder(
            &handler,
            &[MessageId::new("m1")],
            "3",
            "0",
            &UserId::new("u1"),
        );

        assert!(result.is_err());
        assert_eq!(labels_of(&store, "m1"), vec!["0", "custom"]);
    }

    #[test]
    fn test_star_and_unstar_messages() {
        let (handler, api, store) = setup(false);
        let user = UserId::new("u1");
        let ids = [MessageId::new("m1")];

        MessageActions::change_starred_status(&handler, &user, &ids, StarredStatusAction::Star).unwrap();
        assert!(store.find_message(&ids[0]).unwrap().unwrap().is_starred());

        MessageActions::change_starred_status(&handler, &user, &ids, StarredStatusAction::Unstar).unwrap();
        assert!(!store.find_message(&ids[0]).unwrap().unwrap().is_starred());
        assert_eq!(api.calls(), vec!["label 10 m1", "unlabel 10 m1"]);
    }

    #[test]
    fn test_message_read_status_and_delete() {
        let (handler, api, store) = setup(false);
        let user = UserId::new("u1");
        let ids = [MessageId::new("m2")];

        MessageActions::change_read_status(&handler, &ids, ReadStatusAction::MarkUnread, &user).unwrap();
        assert!(store.find_message(&ids[0]).unwrap().unwrap().unread);

        MessageActions::delete(&handler, &ids, "0", &user).unwrap();
        assert!(store.find_message(&ids[0]).unwrap().is_none());
        assert_eq!(api.calls(), vec!["unread m2", "delete 0 m2"]);
    }

    #[test]
    fn test_move_conversation_relocates_every_message() {
        let (handler, api, store) = setup(false);

        let result = ConversationActions::move_to_folder(
            &handler,
            &[ConversationId::new("c1")],
            &UserId::new("u1"),
            "6",
        );

        assert_eq!(result, ConversationsActionResult::Success);
        assert_eq!(api.calls(), vec!["conv label 6 c1"]);
        assert_eq!(labels_of(&store, "m1"), vec!["custom", "6"]);
        assert_eq!(labels_of(&store, "m2"), vec!["6"]);
    }

    #[test]
    fn test_mark_conversation_unread_touches_latest_message_only() {
        let (handler, api, store) = setup(false);

        let result = ConversationActions::change_read_status(
            &handler,
            &[ConversationId::new("c1")],
            ReadStatusAction::MarkUnread,
            &UserId::new("u1"),
            "0",
        );

        assert!(result.is_success());
        assert_eq!(api.calls(), vec!["conv unread 0 c1"]);
        assert!(!store.find_message(&MessageId::new("m1")).unwrap().unwrap().unread);
        assert!(store.find_message(&MessageId::new("m2")).unwrap().unwrap().unread);
    }

    #[test]
    fn test_delete_conversation_removes_messages_in_location() {
        let (handler, _, store) = setup(false);
        store.save_message(message("m4", "c1", &["3"], 4_000)).unwrap();

        let result = ConversationActions::delete(
            &handler,
            &[ConversationId::new("c1")],
            &UserId::new("u1"),
            "0",
        );

        assert!(result.is_success());
        assert!(store.find_message(&MessageId::new("m1")).unwrap().is_none());
        assert!(store.find_message(&MessageId::new("m4")).unwrap().is_some());
    }

    #[test]
    fn test_conversation_failure_maps_to_error() {
        let (handler, _, store) = setup(true);

        let result = ConversationActions::change_starred_status(
            &handler,
            &[ConversationId::new("c1")],
            &UserId::new("u1"),
            StarredStatusAction::Star,
        );

        assert_eq!(result, ConversationsActionResult::Error);
        assert!(!store.find_message(&MessageId::new("m1")).unwrap().unwrap().is_starred());
    }
}
