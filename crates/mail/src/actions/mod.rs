//! Mailbox actions module
//!
//! Provides the move, delete, star and read/unread use cases, the handler
//! implementing them against the API and local storage, and the action
//! sheet that routes user actions to message or conversation scope.

mod handler;
mod sheet;
mod usecases;
mod view_state;

pub use handler::MailboxActionHandler;
pub use sheet::{ActionScope, ActionSheet, ActionSheetError, ActionSheetEvent, ActionSheetTarget};
pub use usecases::{
    ConversationActions, ConversationMode, ConversationsActionResult, MessageActions,
    ReadStatusAction, StarredStatusAction, ViewModeSetting,
};
pub use view_state::{ActionSheetState, MoveSectionState, MoveSectionVisibility, move_section_visibility};
