//! In-memory storage implementation
//!
//! Used by tests and as a lightweight store for hosts that do not persist
//! mail locally.

use anyhow::Result;
use std::collections::HashMap;
use std::sync::RwLock;
use tokio::sync::watch;

use super::watch::LabelWatchers;
use super::{LabelStore, MessageStore};
use crate::models::{ConversationId, Label, LabelId, LabelType, Message, MessageId, UserId};

/// Labels keyed by (user_id, label_id)
type LabelMap = HashMap<(UserId, LabelId), Label>;

/// In-memory implementation of LabelStore and MessageStore
///
/// Uses HashMaps protected by RwLocks for thread-safe access.
pub struct InMemoryMailStore {
    labels: RwLock<LabelMap>,
    messages: RwLock<HashMap<MessageId, Message>>,
    watchers: LabelWatchers,
}

impl InMemoryMailStore {
    /// Create a new empty in-memory store
    pub fn new() -> Self {
        Self {
            labels: RwLock::new(HashMap::new()),
            messages: RwLock::new(HashMap::new()),
            watchers: LabelWatchers::new(),
        }
    }

    fn sorted_labels<F>(&self, filter: F) -> Vec<Label>
    where
        F: Fn(&Label) -> bool,
    {
        let labels = self.labels.read().unwrap();
        sorted(&labels, filter)
    }

    /// Publish fresh snapshots for `users`
    ///
    /// Callers hold the `labels` write lock, so snapshots reach observers in
    /// the same order the writes were applied.
    fn notify(&self, labels: &LabelMap, users: &[UserId]) {
        for user_id in users {
            if self.watchers.is_observed(user_id) {
                self.watchers
                    .publish(user_id, sorted(labels, |l| &l.user_id == user_id));
            }
        }
    }

    /// Remove labels matching `filter` and notify each affected user
    fn remove_labels<F>(&self, filter: F)
    where
        F: Fn(&Label) -> bool,
    {
        let mut affected = Vec::new();
        let mut labels = self.labels.write().unwrap();
        labels.retain(|(user_id, _), label| {
            if filter(&*label) {
                if !affected.contains(user_id) {
                    affected.push(user_id.clone());
                }
                false
            } else {
                true
            }
        });
        self.notify(&labels, &affected);
    }
}

fn sorted<F>(labels: &LabelMap, filter: F) -> Vec<Label>
where
    F: Fn(&Label) -> bool,
{
    let mut result: Vec<Label> = labels.values().filter(|l| filter(l)).cloned().collect();
    result.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.id.0.cmp(&b.id.0)));
    result
}

impl Default for InMemoryMailStore {
    fn default() -> Self {
        Self::new()
    }
}

impl LabelStore for InMemoryMailStore {
    fn find_all_labels(&self, user_id: &UserId) -> Result<Vec<Label>> {
        Ok(self.sorted_labels(|l| &l.user_id == user_id))
    }

    fn observe_all_labels(&self, user_id: &UserId) -> Result<watch::Receiver<Vec<Label>>> {
        // Writers publish under the write lock; holding the read lock keeps
        // the seed from overtaking a newer snapshot
        let labels = self.labels.read().unwrap();
        let current = sorted(&labels, |l| &l.user_id == user_id);
        Ok(self.watchers.subscribe(user_id, current))
    }

    fn find_labels_by_id(&self, user_id: &UserId, ids: &[LabelId]) -> Result<Vec<Label>> {
        Ok(self.sorted_labels(|l| &l.user_id == user_id && ids.contains(&l.id)))
    }

    fn find_label_by_id(&self, id: &LabelId) -> Result<Option<Label>> {
        Ok(self.sorted_labels(|l| &l.id == id).into_iter().next())
    }

    fn find_labels_by_type(&self, user_id: &UserId, label_type: LabelType) -> Result<Vec<Label>> {
        Ok(self.sorted_labels(|l| &l.user_id == user_id && l.label_type == label_type))
    }

    fn find_labels_paged(
        &self,
        user_id: &UserId,
        label_type: LabelType,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Label>> {
        Ok(self
            .find_labels_by_type(user_id, label_type)?
            .into_iter()
            .skip(offset)
            .take(limit)
            .collect())
    }

    fn insert_or_update(&self, labels: &[Label]) -> Result<()> {
        let mut affected: Vec<UserId> = Vec::new();
        let mut stored = self.labels.write().unwrap();
        for label in labels {
            stored.insert((label.user_id.clone(), label.id.clone()), label.clone());
            if !affected.contains(&label.user_id) {
                affected.push(label.user_id.clone());
            }
        }
        self.notify(&stored, &affected);
        Ok(())
    }

    fn delete_label_by_id(&self, id: &LabelId) -> Result<()> {
        self.remove_labels(|l| &l.id == id);
        Ok(())
    }

    fn delete_all_labels(&self, user_id: &UserId) -> Result<()> {
        self.remove_labels(|l| &l.user_id == user_id);
        Ok(())
    }

    fn delete_contact_groups(&self, user_id: &UserId) -> Result<()> {
        self.remove_labels(|l| &l.user_id == user_id && l.label_type == LabelType::ContactGroup);
        Ok(())
    }
}

impl MessageStore for InMemoryMailStore {
    fn find_message(&self, id: &MessageId) -> Result<Option<Message>> {
        let messages = self.messages.read().unwrap();
        Ok(messages.get(id).cloned())
    }

    fn save_message(&self, message: Message) -> Result<()> {
        let mut messages = self.messages.write().unwrap();
        messages.insert(message.id.clone(), message);
        Ok(())
    }

    fn list_messages_for_conversation(&self, conversation_id: &ConversationId) -> Result<Vec<Message>> {
        let messages = self.messages.read().unwrap();
        let mut result: Vec<Message> = messages
            .values()
            .filter(|m| &m.conversation_id == conversation_id)
            .cloned()
            .collect();
        result.sort_by(|a, b| a.time.cmp(&b.time));
        Ok(result)
    }

    fn update_message_labels(&self, id: &MessageId, label_ids: Vec<String>) -> Result<()> {
        let mut messages = self.messages.write().unwrap();
        if let Some(message) = messages.get_mut(id) {
            message.label_ids = label_ids;
        }
        Ok(())
    }

    fn set_message_unread(&self, id: &MessageId, unread: bool) -> Result<()> {
        let mut messages = self.messages.write().unwrap();
        if let Some(message) = messages.get_mut(id) {
            message.unread = unread;
        }
        Ok(())
    }

    fn delete_message(&self, id: &MessageId) -> Result<()> {
        let mut messages = self.messages.write().unwrap();
        messages.remove(id);
        Ok(())
    }
}
