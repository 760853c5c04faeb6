//! Mailbox locations (system folders) and their numeric identifiers

use serde::{Deserialize, Serialize};

/// A mailbox location the user can be looking at
///
/// System locations double as label IDs on the server: a message in the
/// inbox carries label "0", a starred message carries label "10", and so on.
/// `Label`, `LabelOffline`, `LabelFolder` and `Search` are client-side views
/// and never appear on messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageLocation {
    Invalid,
    Inbox,
    AllDraft,
    AllSent,
    Trash,
    Spam,
    AllMail,
    Archive,
    Sent,
    Draft,
    Starred,
    AllScheduled,
    Label,
    LabelOffline,
    LabelFolder,
    Search,
}

impl MessageLocation {
    pub const ALL: [MessageLocation; 16] = [
        MessageLocation::Invalid,
        MessageLocation::Inbox,
        MessageLocation::AllDraft,
        MessageLocation::AllSent,
        MessageLocation::Trash,
        MessageLocation::Spam,
        MessageLocation::AllMail,
        MessageLocation::Archive,
        MessageLocation::Sent,
        MessageLocation::Draft,
        MessageLocation::Starred,
        MessageLocation::AllScheduled,
        MessageLocation::Label,
        MessageLocation::LabelOffline,
        MessageLocation::LabelFolder,
        MessageLocation::Search,
    ];

    /// Numeric value of the location
    pub fn value(self) -> i32 {
        match self {
            MessageLocation::Invalid => -1,
            MessageLocation::Inbox => 0,
            MessageLocation::AllDraft => 1,
            MessageLocation::AllSent => 2,
            MessageLocation::Trash => 3,
            MessageLocation::Spam => 4,
            MessageLocation::AllMail => 5,
            MessageLocation::Archive => 6,
            MessageLocation::Sent => 7,
            MessageLocation::Draft => 8,
            MessageLocation::Starred => 10,
            MessageLocation::AllScheduled => 12,
            MessageLocation::Label => 98,
            MessageLocation::LabelOffline => 99,
            MessageLocation::LabelFolder => 100,
            MessageLocation::Search => 1000,
        }
    }

    /// The location value as the string ID used by the API
    pub fn id_string(self) -> String {
        self.value().to_string()
    }

    pub fn from_value(value: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|l| l.value() == value)
    }

    /// Whether this location is a server-side system label that can be
    /// attached to messages
    pub fn is_system_label(self) -> bool {
        (0..=12).contains(&self.value())
    }

    /// Check whether a label ID string names a system location
    pub fn is_location_label_id(label_id: &str) -> bool {
        label_id
            .parse::<i32>()
            .ok()
            .and_then(Self::from_value)
            .is_some_and(Self::is_system_label)
    }

    /// Locations a message can only be in one of at a time
    ///
    /// Moving a message into one of these removes it from the others.
    pub fn is_exclusive(self) -> bool {
        matches!(
            self,
            MessageLocation::Inbox
                | MessageLocation::Trash
                | MessageLocation::Spam
                | MessageLocation::Archive
        )
    }
}
