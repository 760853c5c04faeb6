//! Mailbox use-case seams
//!
//! The action sheet never talks to the API directly. It dispatches to one
//! of these traits depending on whether the selection is a list of
//! messages or a list of conversations.

use anyhow::Result;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::models::{ConversationId, MessageId, MessageLocation, UserId};

/// Outcome of a conversation-scoped use case
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversationsActionResult {
    Success,
    Error,
}

impl ConversationsActionResult {
    pub fn is_success(self) -> bool {
        self == ConversationsActionResult::Success
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadStatusAction {
    MarkRead,
    MarkUnread,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StarredStatusAction {
    Star,
    Unstar,
}

/// Use cases acting on individual messages
///
/// Failures are returned as errors.
pub trait MessageActions: Send + Sync {
    fn move_to_folder(
        &self,
        ids: &[MessageId],
        new_folder_id: &str,
        current_folder_id: &str,
        user_id: &UserId,
    ) -> Result<()>;

    fn change_read_status(
        &self,
        ids: &[MessageId],
        action: ReadStatusAction,
        user_id: &UserId,
    ) -> Result<()>;

    fn change_starred_status(
        &self,
        user_id: &UserId,
        ids: &[MessageId],
        action: StarredStatusAction,
    ) -> Result<()>;

    fn delete(&self, ids: &[MessageId], current_folder_id: &str, user_id: &UserId) -> Result<()>;
}

/// Use cases acting on whole conversations
///
/// Failures are folded into [`ConversationsActionResult::Error`].
pub trait ConversationActions: Send + Sync {
    fn move_to_folder(
        &self,
        ids: &[ConversationId],
        user_id: &UserId,
        folder_id: &str,
    ) -> ConversationsActionResult;

    fn change_read_status(
        &self,
        ids: &[ConversationId],
        action: ReadStatusAction,
        user_id: &UserId,
        location_id: &str,
    ) -> ConversationsActionResult;

    fn change_starred_status(
        &self,
        ids: &[ConversationId],
        user_id: &UserId,
        action: StarredStatusAction,
    ) -> ConversationsActionResult;

    fn delete(
        &self,
        ids: &[ConversationId],
        user_id: &UserId,
        location_id: &str,
    ) -> ConversationsActionResult;
}

/// Whether a location lists conversations rather than messages
///
/// Resolved on every call since the user can switch view mode at any time.
pub trait ConversationMode: Send + Sync {
    fn is_enabled(&self, location: MessageLocation) -> bool;
}

/// The user's view-mode preference
pub struct ViewModeSetting {
    conversation_grouping: AtomicBool,
}

impl ViewModeSetting {
    pub fn new(conversation_grouping: bool) -> Self {
        Self {
            conversation_grouping: AtomicBool::new(conversation_grouping),
        }
    }

    pub fn set_conversation_grouping(&self, enabled: bool) {
        self.conversation_grouping.store(enabled, Ordering::SeqCst);
    }

    pub fn conversation_grouping(&self) -> bool {
        self.conversation_grouping.load(Ordering::SeqCst)
    }
}

impl ConversationMode for ViewModeSetting {
    fn is_enabled(&self, location: MessageLocation) -> bool {
        // Drafts, sent mail and search results are always listed per message
        let message_only = matches!(
            location,
            MessageLocation::Draft
                | MessageLocation::AllDraft
                | MessageLocation::Sent
                | MessageLocation::AllSent
                | MessageLocation::Search
        );
        self.conversation_grouping() && !message_only
    }
}
