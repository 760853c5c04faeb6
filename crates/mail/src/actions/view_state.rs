//! Visibility of the move and delete actions in the action sheet

use super::sheet::ActionSheetTarget;
use crate::models::MessageLocation;

/// Which move/delete actions the sheet offers for a selection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveSectionState {
    pub ids: Vec<String>,
    pub location: MessageLocation,
    pub target: ActionSheetTarget,
    pub show_move_to_inbox: bool,
    pub show_move_to_trash: bool,
    pub show_move_to_archive: bool,
    pub show_move_to_spam: bool,
    pub show_delete: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ActionSheetState {
    #[default]
    Initial,
    Data(MoveSectionState),
}

/// Visibility flags: (inbox, trash, archive, spam, delete)
pub type MoveSectionVisibility = (bool, bool, bool, bool, bool);

/// Visibility of each move/delete action for a location and target
///
/// Only move-to-inbox depends on the target: a conversation opened in the
/// detail screen can always be moved back to the inbox.
pub fn move_section_visibility(location: MessageLocation, target: ActionSheetTarget) -> MoveSectionVisibility {
    use MessageLocation::*;

    let (inbox, trash, archive, spam, delete) = match location {
        //               inbox  trash  archive spam   delete
        Inbox => (false, true, true, true, false),
        Archive => (true, true, false, true, false),
        Spam => (true, true, false, false, true),
        Trash => (true, false, true, false, true),
        Draft => (false, true, true, false, true),
        Sent => (false, true, true, false, true),
        AllDraft => (false, true, true, true, false),
        AllSent => (false, true, true, true, false),
        AllMail => (false, true, true, true, false),
        Starred => (false, true, true, true, false),
        AllScheduled => (false, true, true, true, false),
        Label => (false, true, true, true, false),
        LabelOffline => (false, true, true, true, false),
        LabelFolder => (false, true, true, true, false),
        Search => (false, true, true, true, false),
        Invalid => (false, true, true, true, false),
    };

    let inbox = inbox || target == ActionSheetTarget::ConversationItemInDetailScreen;
    (inbox, trash, archive, spam, delete)
}

impl MoveSectionState {
    pub fn new(ids: Vec<String>, location: MessageLocation, target: ActionSheetTarget) -> Self {
        let (inbox, trash, archive, spam, delete) = move_section_visibility(location, target);
        Self {
            ids,
            location,
            target,
            show_move_to_inbox: inbox,
            show_move_to_trash: trash,
            show_move_to_archive: archive,
            show_move_to_spam: spam,
            show_delete: delete,
        }
    }
}
