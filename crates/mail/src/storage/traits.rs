//! Storage trait definitions

use anyhow::Result;
use tokio::sync::watch;

use crate::models::{ConversationId, Label, LabelId, LabelType, Message, MessageId, UserId};

/// Local label, folder and contact group storage
///
/// Rows are keyed by (user_id, label_id). List results are ordered by
/// display order, then ID.
pub trait LabelStore: Send + Sync {
    /// All labels of every type for a user
    fn find_all_labels(&self, user_id: &UserId) -> Result<Vec<Label>>;

    /// Subscribe to the user's labels
    ///
    /// The receiver holds the current snapshot and is updated after every
    /// mutation that touches this user's rows.
    fn observe_all_labels(&self, user_id: &UserId) -> Result<watch::Receiver<Vec<Label>>>;

    fn find_labels_by_id(&self, user_id: &UserId, ids: &[LabelId]) -> Result<Vec<Label>>;

    fn find_label_by_id(&self, id: &LabelId) -> Result<Option<Label>>;

    fn find_labels_by_type(&self, user_id: &UserId, label_type: LabelType) -> Result<Vec<Label>>;

    /// One page of labels of a type
    fn find_labels_paged(
        &self,
        user_id: &UserId,
        label_type: LabelType,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Label>>;

    /// Upsert labels by primary key
    fn insert_or_update(&self, labels: &[Label]) -> Result<()>;

    fn delete_label_by_id(&self, id: &LabelId) -> Result<()>;

    /// Delete every label of every type for a user
    fn delete_all_labels(&self, user_id: &UserId) -> Result<()>;

    fn delete_contact_groups(&self, user_id: &UserId) -> Result<()>;
}

/// Local message storage
pub trait MessageStore: Send + Sync {
    fn find_message(&self, id: &MessageId) -> Result<Option<Message>>;

    /// Insert or replace a message (last writer wins)
    fn save_message(&self, message: Message) -> Result<()>;

    /// Messages of a conversation, ordered by time ascending
    fn list_messages_for_conversation(&self, conversation_id: &ConversationId) -> Result<Vec<Message>>;

    fn update_message_labels(&self, id: &MessageId, label_ids: Vec<String>) -> Result<()>;

    fn set_message_unread(&self, id: &MessageId, unread: bool) -> Result<()>;

    fn delete_message(&self, id: &MessageId) -> Result<()>;
}
