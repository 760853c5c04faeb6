//! Action sheet router
//!
//! Resolves a user action on a selection against either the message or the
//! conversation use cases, then reports the outcome as an
//! [`ActionSheetEvent`].

use anyhow::Result;
use log::debug;
use std::sync::Arc;
use tokio::sync::watch;

use super::usecases::{
    ConversationActions, ConversationMode, ConversationsActionResult, MessageActions,
    ReadStatusAction, StarredStatusAction,
};
use super::view_state::{ActionSheetState, MoveSectionState};
use crate::models::{ConversationId, LabelType, MessageId, MessageLocation, UserId};
use crate::storage::MessageStore;

/// Where the action sheet was opened from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionSheetTarget {
    MailboxItemsInMailboxScreen,
    MessageItemInDetailScreen,
    MessageItemWithinConversationDetailScreen,
    ConversationItemInDetailScreen,
}

impl ActionSheetTarget {
    /// Whether the screen hosting the sheet should close after an action
    ///
    /// A single message inside an open conversation leaves the
    /// conversation on screen.
    pub fn dismisses_backing_activity(self) -> bool {
        self != ActionSheetTarget::MessageItemWithinConversationDetailScreen
    }
}

/// Whether ids in a selection name messages or conversations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionScope {
    Messages,
    Conversations,
}

/// Outcome of an action sheet operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionSheetEvent {
    ShowLabelsManager {
        ids: Vec<String>,
        current_location: i32,
        label_type: LabelType,
        target: ActionSheetTarget,
        /// Labels already applied to any of the selected items
        checked_label_ids: Vec<String>,
    },
    ShowMessageHeaders {
        headers: String,
    },
    DismissActionSheet {
        dismiss_backing_activity: bool,
    },
    /// Part of the host event contract but never emitted: read and unread
    /// changes dismiss the sheet instead
    ChangeReadStatus {
        read: bool,
        is_successful: bool,
    },
    ChangeStarredStatus {
        starred: bool,
        is_successful: bool,
    },
    CouldNotCompleteActionError,
}

/// Failures the action sheet reports itself
#[derive(Debug, thiserror::Error)]
pub enum ActionSheetError {
    #[error("Message {0} not found")]
    MessageNotFound(String),
}

/// Router behind the message/conversation action sheet
pub struct ActionSheet {
    target: ActionSheetTarget,
    user_id: UserId,
    message_store: Arc<dyn MessageStore>,
    message_actions: Arc<dyn MessageActions>,
    conversation_actions: Arc<dyn ConversationActions>,
    conversation_mode: Arc<dyn ConversationMode>,
    events: watch::Sender<Option<ActionSheetEvent>>,
    state: watch::Sender<ActionSheetState>,
}

impl ActionSheet {
    pub fn new(
        target: ActionSheetTarget,
        user_id: UserId,
        message_store: Arc<dyn MessageStore>,
        message_actions: Arc<dyn MessageActions>,
        conversation_actions: Arc<dyn ConversationActions>,
        conversation_mode: Arc<dyn ConversationMode>,
    ) -> Self {
        let (events, _) = watch::channel(None);
        let (state, _) = watch::channel(ActionSheetState::Initial);
        Self {
            target,
            user_id,
            message_store,
            message_actions,
            conversation_actions,
            conversation_mode,
            events,
            state,
        }
    }

    pub fn target(&self) -> ActionSheetTarget {
        self.target
    }

    /// Latest event; `None` until the first operation completes
    pub fn subscribe_events(&self) -> watch::Receiver<Option<ActionSheetEvent>> {
        self.events.subscribe()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<ActionSheetState> {
        self.state.subscribe()
    }

    /// Resolve whether `ids` are conversations or messages for `location`
    pub fn scope(&self, location: MessageLocation) -> ActionScope {
        if self.conversation_mode.is_enabled(location)
            && self.target != ActionSheetTarget::MessageItemWithinConversationDetailScreen
        {
            ActionScope::Conversations
        } else {
            ActionScope::Messages
        }
    }

    fn emit(&self, event: ActionSheetEvent) -> ActionSheetEvent {
        debug!("Action sheet ({:?}) emitting {:?}", self.target, event);
        self.events.send_replace(Some(event.clone()));
        event
    }

    fn dismiss(&self) -> ActionSheetEvent {
        self.emit(ActionSheetEvent::DismissActionSheet {
            dismiss_backing_activity: self.target.dismisses_backing_activity(),
        })
    }

    /// Dismiss on success, report an error otherwise
    fn dismiss_or_error(&self, result: ConversationsActionResult) -> ActionSheetEvent {
        match result {
            ConversationsActionResult::Success => self.dismiss(),
            ConversationsActionResult::Error => {
                self.emit(ActionSheetEvent::CouldNotCompleteActionError)
            }
        }
    }

    /// Open the labels (or folders) manager for a selection
    pub fn show_labels_manager(
        &self,
        ids: &[String],
        location: MessageLocation,
        label_type: LabelType,
    ) -> Result<ActionSheetEvent> {
        let messages = match self.scope(location) {
            ActionScope::Messages => {
                let mut messages = Vec::new();
                for id in ids {
                    if let Some(message) = self.message_store.find_message(&MessageId::new(id.as_str()))? {
                        messages.push(message);
                    }
                }
                messages
            }
            ActionScope::Conversations => {
                let mut messages = Vec::new();
                for id in ids {
                    messages.extend(
                        self.message_store
                            .list_messages_for_conversation(&ConversationId::new(id.as_str()))?,
                    );
                }
                messages
            }
        };

        let mut checked_label_ids: Vec<String> = Vec::new();
        for label_id in messages.iter().flat_map(|m| m.label_ids_not_including_locations()) {
            if !checked_label_ids.contains(&label_id) {
                checked_label_ids.push(label_id);
            }
        }

        Ok(self.emit(ActionSheetEvent::ShowLabelsManager {
            ids: ids.to_vec(),
            current_location: location.value(),
            label_type,
            target: self.target,
            checked_label_ids,
        }))
    }

    /// Show the raw headers of a stored message
    pub fn show_message_headers(&self, id: &str) -> Result<ActionSheetEvent> {
        let message = self
            .message_store
            .find_message(&MessageId::new(id))?
            .ok_or_else(|| ActionSheetError::MessageNotFound(id.to_string()))?;

        Ok(self.emit(ActionSheetEvent::ShowMessageHeaders {
            headers: message.header.unwrap_or_default(),
        }))
    }

    pub fn move_to_inbox(&self, ids: &[String], location: MessageLocation) -> Result<ActionSheetEvent> {
        self.move_to_folder(ids, location, MessageLocation::Inbox)
    }

    /// Move a selection into a system folder (inbox, archive, spam or trash)
    pub fn move_to_folder(
        &self,
        ids: &[String],
        location: MessageLocation,
        destination: MessageLocation,
    ) -> Result<ActionSheetEvent> {
        let destination_id = destination.id_string();
        match self.scope(location) {
            ActionScope::Conversations => {
                let result = self.conversation_actions.move_to_folder(
                    &conversation_ids(ids),
                    &self.user_id,
                    &destination_id,
                );
                Ok(self.dismiss_or_error(result))
            }
            ActionScope::Messages => {
                self.message_actions.move_to_folder(
                    &message_ids(ids),
                    &destination_id,
                    &location.id_string(),
                    &self.user_id,
                )?;
                Ok(self.dismiss())
            }
        }
    }

    pub fn delete(&self, ids: &[String], location: MessageLocation) -> Result<ActionSheetEvent> {
        let location_id = location.id_string();
        match self.scope(location) {
            ActionScope::Conversations => {
                let result =
                    self.conversation_actions
                        .delete(&conversation_ids(ids), &self.user_id, &location_id);
                Ok(self.dismiss_or_error(result))
            }
            ActionScope::Messages => {
                self.message_actions
                    .delete(&message_ids(ids), &location_id, &self.user_id)?;
                Ok(self.dismiss())
            }
        }
    }

    pub fn mark_read(
        &self,
        ids: &[String],
        location: MessageLocation,
        location_id: &str,
    ) -> Result<ActionSheetEvent> {
        self.change_read_status(ids, location, location_id, ReadStatusAction::MarkRead)
    }

    pub fn mark_unread(
        &self,
        ids: &[String],
        location: MessageLocation,
        location_id: &str,
    ) -> Result<ActionSheetEvent> {
        self.change_read_status(ids, location, location_id, ReadStatusAction::MarkUnread)
    }

    fn change_read_status(
        &self,
        ids: &[String],
        location: MessageLocation,
        location_id: &str,
        action: ReadStatusAction,
    ) -> Result<ActionSheetEvent> {
        match self.scope(location) {
            ActionScope::Conversations => {
                let result = self.conversation_actions.change_read_status(
                    &conversation_ids(ids),
                    action,
                    &self.user_id,
                    location_id,
                );
                Ok(self.dismiss_or_error(result))
            }
            ActionScope::Messages => {
                self.message_actions
                    .change_read_status(&message_ids(ids), action, &self.user_id)?;
                Ok(self.dismiss())
            }
        }
    }

    pub fn star_message(&self, ids: &[String], location: MessageLocation) -> Result<ActionSheetEvent> {
        self.change_starred_status(ids, location, StarredStatusAction::Star)
    }

    pub fn unstar_message(&self, ids: &[String], location: MessageLocation) -> Result<ActionSheetEvent> {
        self.change_starred_status(ids, location, StarredStatusAction::Unstar)
    }

    fn change_starred_status(
        &self,
        ids: &[String],
        location: MessageLocation,
        action: StarredStatusAction,
    ) -> Result<ActionSheetEvent> {
        let starred = action == StarredStatusAction::Star;
        let is_successful = match self.scope(location) {
            ActionScope::Conversations => self
                .conversation_actions
                .change_starred_status(&conversation_ids(ids), &self.user_id, action)
                .is_success(),
            ActionScope::Messages => {
                self.message_actions
                    .change_starred_status(&self.user_id, &message_ids(ids), action)?;
                true
            }
        };

        Ok(self.emit(ActionSheetEvent::ChangeStarredStatus {
            starred,
            is_successful,
        }))
    }

    /// Compute which move/delete actions apply and publish them as state
    pub fn setup_view_state(&self, ids: &[String], location: MessageLocation) -> MoveSectionState {
        let section = MoveSectionState::new(ids.to_vec(), location, self.target);
        self.state.send_replace(ActionSheetState::Data(section.clone()));
        section
    }
}

fn message_ids(ids: &[String]) -> Vec<MessageId> {
    ids.iter().map(|id| MessageId::new(id.as_str())).collect()
}

fn conversation_ids(ids: &[String]) -> Vec<ConversationId> {
    ids.iter().map(|id| ConversationId::new(id.as_str())).collect()
}
