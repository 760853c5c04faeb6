//! FFI-friendly type wrappers for UniFFI export
//!
//! These types convert internal Rust types to FFI-compatible versions:
//! - `DateTime<Utc>` → `i64` (Unix timestamp, milliseconds)
//! - `LabelId`/`MessageId`/... → `String`
//! - Enums carrying data → flat records or simple enums

use chrono::{TimeZone, Utc};

use crate::actions::{ActionSheetError, ActionSheetEvent, ActionSheetTarget, MoveSectionState};
use crate::api::ApiError;
use crate::compose::DraftError;
use crate::mailbox::MessagesPage;
use crate::models::{
    AddressId, ConversationId, EmailAddress, Label, LabelId, LabelType, Message, MessageLocation,
    ParsedHeaders, UserId,
};

// ============================================================================
// Error Types
// ============================================================================

/// FFI-friendly error type
#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum MailError {
    #[error("Database error: {message}")]
    Database { message: String },

    #[error("Network error: {message}")]
    Network { message: String },

    #[error("Authentication required")]
    AuthRequired,

    #[error("Not found: {resource}")]
    NotFound { resource: String },

    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("Draft {draft_id} has no sending address")]
    MissingAddressId { draft_id: String },

    #[error("Encryption failed: {message}")]
    Crypto { message: String },
}

impl From<anyhow::Error> for MailError {
    fn from(e: anyhow::Error) -> Self {
        if let Some(api_error) = e.downcast_ref::<ApiError>() {
            return match api_error {
                ApiError::NoSession(_) => MailError::AuthRequired,
                ApiError::Status { status: 401, .. } => MailError::AuthRequired,
                _ => MailError::Network {
                    message: api_error.to_string(),
                },
            };
        }
        if let Some(ActionSheetError::MessageNotFound(id)) = e.downcast_ref::<ActionSheetError>() {
            return MailError::NotFound {
                resource: format!("message {}", id),
            };
        }
        if let Some(DraftError::MissingAddressId(draft_id)) = e.downcast_ref::<DraftError>() {
            return MailError::MissingAddressId {
                draft_id: draft_id.clone(),
            };
        }
        if let Some(crypto_error) = e.downcast_ref::<MailError>() {
            return MailError::Crypto {
                message: crypto_error.to_string(),
            };
        }
        if e.downcast_ref::<ureq::Error>().is_some() {
            return MailError::Network {
                message: format!("{:#}", e),
            };
        }
        MailError::Database {
            message: format!("{:#}", e),
        }
    }
}

impl From<uniffi::UnexpectedUniFFICallbackError> for MailError {
    fn from(e: uniffi::UnexpectedUniFFICallbackError) -> Self {
        MailError::Crypto { message: e.reason }
    }
}

// ============================================================================
// Email Address
// ============================================================================

/// FFI-friendly email address
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiEmailAddress {
    pub name: Option<String>,
    pub email: String,
}

impl From<EmailAddress> for FfiEmailAddress {
    fn from(e: EmailAddress) -> Self {
        Self {
            name: e.name,
            email: e.email,
        }
    }
}

impl From<FfiEmailAddress> for EmailAddress {
    fn from(e: FfiEmailAddress) -> Self {
        match e.name {
            Some(name) => EmailAddress::with_name(name, e.email),
            None => EmailAddress::new(e.email),
        }
    }
}

// ============================================================================
// Label Types
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Enum)]
pub enum FfiLabelType {
    MessageLabel,
    ContactGroup,
    Folder,
}

impl From<LabelType> for FfiLabelType {
    fn from(t: LabelType) -> Self {
        match t {
            LabelType::MessageLabel => FfiLabelType::MessageLabel,
            LabelType::ContactGroup => FfiLabelType::ContactGroup,
            LabelType::Folder => FfiLabelType::Folder,
        }
    }
}

impl From<FfiLabelType> for LabelType {
    fn from(t: FfiLabelType) -> Self {
        match t {
            FfiLabelType::MessageLabel => LabelType::MessageLabel,
            FfiLabelType::ContactGroup => LabelType::ContactGroup,
            FfiLabelType::Folder => LabelType::Folder,
        }
    }
}

/// FFI-friendly label, folder or contact group
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiLabel {
    pub id: String,
    pub name: String,
    pub label_type: FfiLabelType,
    pub color: String,
    pub order: i32,
    pub path: String,
    pub parent_id: Option<String>,
    pub notify: bool,
    pub expanded: bool,
    pub sticky: bool,
}

impl From<Label> for FfiLabel {
    fn from(l: Label) -> Self {
        Self {
            id: l.id.0,
            name: l.name,
            label_type: l.label_type.into(),
            color: l.color,
            order: l.order,
            path: l.path,
            parent_id: l.parent_id.map(|p| p.0),
            notify: l.notify,
            expanded: l.expanded,
            sticky: l.sticky,
        }
    }
}

impl FfiLabel {
    /// Attach the owning user to build the domain label
    pub fn into_label(self, user_id: UserId) -> Label {
        Label {
            id: LabelId::new(self.id),
            user_id,
            name: self.name,
            label_type: self.label_type.into(),
            color: self.color,
            order: self.order,
            path: self.path,
            parent_id: self.parent_id.filter(|p| !p.is_empty()).map(LabelId::new),
            notify: self.notify,
            expanded: self.expanded,
            sticky: self.sticky,
        }
    }
}

/// When observing labels should also refresh them from the server
#[derive(Debug, Clone, Copy, uniffi::Enum)]
pub enum FfiRefreshPolicy {
    Always,
    IfEmpty,
    Never,
}

impl From<FfiRefreshPolicy> for crate::labels::RefreshPolicy {
    fn from(p: FfiRefreshPolicy) -> Self {
        match p {
            FfiRefreshPolicy::Always => crate::labels::RefreshPolicy::Always,
            FfiRefreshPolicy::IfEmpty => crate::labels::RefreshPolicy::IfEmpty,
            FfiRefreshPolicy::Never => crate::labels::RefreshPolicy::Never,
        }
    }
}

// ============================================================================
// Locations
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Enum)]
pub enum FfiMessageLocation {
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

impl From<FfiMessageLocation> for MessageLocation {
    fn from(l: FfiMessageLocation) -> Self {
        match l {
            FfiMessageLocation::Invalid => MessageLocation::Invalid,
            FfiMessageLocation::Inbox => MessageLocation::Inbox,
            FfiMessageLocation::AllDraft => MessageLocation::AllDraft,
            FfiMessageLocation::AllSent => MessageLocation::AllSent,
            FfiMessageLocation::Trash => MessageLocation::Trash,
            FfiMessageLocation::Spam => MessageLocation::Spam,
            FfiMessageLocation::AllMail => MessageLocation::AllMail,
            FfiMessageLocation::Archive => MessageLocation::Archive,
            FfiMessageLocation::Sent => MessageLocation::Sent,
            FfiMessageLocation::Draft => MessageLocation::Draft,
            FfiMessageLocation::Starred => MessageLocation::Starred,
            FfiMessageLocation::AllScheduled => MessageLocation::AllScheduled,
            FfiMessageLocation::Label => MessageLocation::Label,
            FfiMessageLocation::LabelOffline => MessageLocation::LabelOffline,
            FfiMessageLocation::LabelFolder => MessageLocation::LabelFolder,
            FfiMessageLocation::Search => MessageLocation::Search,
        }
    }
}

impl From<MessageLocation> for FfiMessageLocation {
    fn from(l: MessageLocation) -> Self {
        match l {
            MessageLocation::Invalid => FfiMessageLocation::Invalid,
            MessageLocation::Inbox => FfiMessageLocation::Inbox,
            MessageLocation::AllDraft => FfiMessageLocation::AllDraft,
            MessageLocation::AllSent => FfiMessageLocation::AllSent,
            MessageLocation::Trash => FfiMessageLocation::Trash,
            MessageLocation::Spam => FfiMessageLocation::Spam,
            MessageLocation::AllMail => FfiMessageLocation::AllMail,
            MessageLocation::Archive => FfiMessageLocation::Archive,
            MessageLocation::Sent => FfiMessageLocation::Sent,
            MessageLocation::Draft => FfiMessageLocation::Draft,
            MessageLocation::Starred => FfiMessageLocation::Starred,
            MessageLocation::AllScheduled => FfiMessageLocation::AllScheduled,
            MessageLocation::Label => FfiMessageLocation::Label,
            MessageLocation::LabelOffline => FfiMessageLocation::LabelOffline,
            MessageLocation::LabelFolder => FfiMessageLocation::LabelFolder,
            MessageLocation::Search => FfiMessageLocation::Search,
        }
    }
}

// ============================================================================
// Action Sheet
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Enum)]
pub enum FfiActionSheetTarget {
    MailboxItemsInMailboxScreen,
    MessageItemInDetailScreen,
    MessageItemWithinConversationDetailScreen,
    ConversationItemInDetailScreen,
}

impl From<FfiActionSheetTarget> for ActionSheetTarget {
    fn from(t: FfiActionSheetTarget) -> Self {
        match t {
            FfiActionSheetTarget::MailboxItemsInMailboxScreen => {
                ActionSheetTarget::MailboxItemsInMailboxScreen
            }
            FfiActionSheetTarget::MessageItemInDetailScreen => {
                ActionSheetTarget::MessageItemInDetailScreen
            }
            FfiActionSheetTarget::MessageItemWithinConversationDetailScreen => {
                ActionSheetTarget::MessageItemWithinConversationDetailScreen
            }
            FfiActionSheetTarget::ConversationItemInDetailScreen => {
                ActionSheetTarget::ConversationItemInDetailScreen
            }
        }
    }
}

impl From<ActionSheetTarget> for FfiActionSheetTarget {
    fn from(t: ActionSheetTarget) -> Self {
        match t {
            ActionSheetTarget::MailboxItemsInMailboxScreen => {
                FfiActionSheetTarget::MailboxItemsInMailboxScreen
            }
            ActionSheetTarget::MessageItemInDetailScreen => {
                FfiActionSheetTarget::MessageItemInDetailScreen
            }
            ActionSheetTarget::MessageItemWithinConversationDetailScreen => {
                FfiActionSheetTarget::MessageItemWithinConversationDetailScreen
            }
            ActionSheetTarget::ConversationItemInDetailScreen => {
                FfiActionSheetTarget::ConversationItemInDetailScreen
            }
        }
    }
}

/// Result of an action sheet operation
#[derive(Debug, Clone, PartialEq, uniffi::Enum)]
pub enum FfiActionSheetEvent {
    ShowLabelsManager {
        ids: Vec<String>,
        current_location: i32,
        label_type: FfiLabelType,
        target: FfiActionSheetTarget,
        checked_label_ids: Vec<String>,
    },
    ShowMessageHeaders {
        headers: String,
    },
    DismissActionSheet {
        dismiss_backing_activity: bool,
    },
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

impl From<ActionSheetEvent> for FfiActionSheetEvent {
    fn from(e: ActionSheetEvent) -> Self {
        match e {
            ActionSheetEvent::ShowLabelsManager {
                ids,
                current_location,
                label_type,
                target,
                checked_label_ids,
            } => FfiActionSheetEvent::ShowLabelsManager {
                ids,
                current_location,
                label_type: label_type.into(),
                target: target.into(),
                checked_label_ids,
            },
            ActionSheetEvent::ShowMessageHeaders { headers } => {
                FfiActionSheetEvent::ShowMessageHeaders { headers }
            }
            ActionSheetEvent::DismissActionSheet {
                dismiss_backing_activity,
            } => FfiActionSheetEvent::DismissActionSheet {
                dismiss_backing_activity,
            },
            ActionSheetEvent::ChangeReadStatus { read, is_successful } => {
                FfiActionSheetEvent::ChangeReadStatus { read, is_successful }
            }
            ActionSheetEvent::ChangeStarredStatus {
                starred,
                is_successful,
            } => FfiActionSheetEvent::ChangeStarredStatus {
                starred,
                is_successful,
            },
            ActionSheetEvent::CouldNotCompleteActionError => {
                FfiActionSheetEvent::CouldNotCompleteActionError
            }
        }
    }
}

/// Which move/delete actions to show
#[derive(Debug, Clone, PartialEq, uniffi::Record)]
pub struct FfiMoveSectionState {
    pub ids: Vec<String>,
    pub location: FfiMessageLocation,
    pub target: FfiActionSheetTarget,
    pub show_move_to_inbox: bool,
    pub show_move_to_trash: bool,
    pub show_move_to_archive: bool,
    pub show_move_to_spam: bool,
    pub show_delete: bool,
}

impl From<MoveSectionState> for FfiMoveSectionState {
    fn from(s: MoveSectionState) -> Self {
        Self {
            ids: s.ids,
            location: s.location.into(),
            target: s.target.into(),
            show_move_to_inbox: s.show_move_to_inbox,
            show_move_to_trash: s.show_move_to_trash,
            show_move_to_archive: s.show_move_to_archive,
            show_move_to_spam: s.show_move_to_spam,
            show_delete: s.show_delete,
        }
    }
}

// ============================================================================
// Messages
// ============================================================================

/// Server-parsed security headers
#[derive(Debug, Clone, PartialEq, uniffi::Record)]
pub struct FfiParsedHeaders {
    pub recipient_encryption: Option<String>,
    pub recipient_authentication: Option<String>,
}

impl From<ParsedHeaders> for FfiParsedHeaders {
    fn from(h: ParsedHeaders) -> Self {
        Self {
            recipient_encryption: h.recipient_encryption,
            recipient_authentication: h.recipient_authentication,
        }
    }
}

impl From<FfiParsedHeaders> for ParsedHeaders {
    fn from(h: FfiParsedHeaders) -> Self {
        Self {
            recipient_encryption: h.recipient_encryption,
            recipient_authentication: h.recipient_authentication,
        }
    }
}

/// FFI-friendly message, also used to pass drafts in
///
/// Every stored field round-trips, so a message read with `get_message`
/// can be edited and saved back without losing data.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiMessage {
    pub id: String,
    pub conversation_id: String,
    pub user_id: String,
    pub address_id: Option<String>,
    pub subject: String,
    pub sender: FfiEmailAddress,
    pub to: Vec<FfiEmailAddress>,
    pub cc: Vec<FfiEmailAddress>,
    /// Unix timestamp in milliseconds
    pub time_millis: i64,
    pub unread: bool,
    pub label_ids: Vec<String>,
    pub header: Option<String>,
    pub parsed_headers: Option<FfiParsedHeaders>,
    /// Armored, encrypted body
    pub message_body: Option<String>,
    /// Plaintext body of a draft being edited
    pub decrypted_body: Option<String>,
}

impl From<Message> for FfiMessage {
    fn from(m: Message) -> Self {
        Self {
            id: m.id.0,
            conversation_id: m.conversation_id.0,
            user_id: m.user_id.0,
            address_id: m.address_id.map(|a| a.0),
            subject: m.subject,
            sender: m.sender.into(),
            to: m.to.into_iter().map(FfiEmailAddress::from).collect(),
            cc: m.cc.into_iter().map(FfiEmailAddress::from).collect(),
            time_millis: m.time.timestamp_millis(),
            unread: m.unread,
            label_ids: m.label_ids,
            header: m.header,
            parsed_headers: m.parsed_headers.map(FfiParsedHeaders::from),
            message_body: m.message_body,
            decrypted_body: m.decrypted_body,
        }
    }
}

impl From<FfiMessage> for Message {
    fn from(m: FfiMessage) -> Self {
        Message {
            id: m.id.into(),
            conversation_id: ConversationId::new(m.conversation_id),
            user_id: UserId::new(m.user_id),
            address_id: m.address_id.map(AddressId::new),
            subject: m.subject,
            sender: m.sender.into(),
            to: m.to.into_iter().map(EmailAddress::from).collect(),
            cc: m.cc.into_iter().map(EmailAddress::from).collect(),
            time: Utc
                .timestamp_millis_opt(m.time_millis)
                .single()
                .unwrap_or_else(Utc::now),
            unread: m.unread,
            label_ids: m.label_ids,
            header: m.header,
            parsed_headers: m.parsed_headers.map(ParsedHeaders::from),
            message_body: m.message_body,
            decrypted_body: m.decrypted_body,
        }
    }
}

/// One page of a message listing
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiMessagesPage {
    pub messages: Vec<FfiMessage>,
    pub total: u32,
    /// Bookmark for the next page: pass back as `end` / `end_id`
    pub next_end: Option<i64>,
    pub next_end_id: Option<String>,
}

impl From<MessagesPage> for FfiMessagesPage {
    fn from(p: MessagesPage) -> Self {
        Self {
            messages: p.messages.into_iter().map(FfiMessage::from).collect(),
            total: p.total,
            next_end: p.next.end,
            next_end_id: p.next.end_id,
        }
    }
}

// ============================================================================
// Callback Traits
// ============================================================================

/// Encryption provided by the host's crypto library
#[uniffi::export(callback_interface)]
pub trait DraftCrypto: Send + Sync {
    /// Encrypt `text` with the keys of `address_id`, returning the ciphertext
    fn encrypt(&self, address_id: String, text: String, armored: bool) -> Result<String, MailError>;
}

// ============================================================================
// Log Callback
// ============================================================================

/// Log level for FFI callback
#[derive(Debug, Clone, Copy, uniffi::Enum)]
pub enum FfiLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<log::Level> for FfiLogLevel {
    fn from(level: log::Level) -> Self {
        match level {
            log::Level::Error => FfiLogLevel::Error,
            log::Level::Warn => FfiLogLevel::Warn,
            log::Level::Info => FfiLogLevel::Info,
            log::Level::Debug => FfiLogLevel::Debug,
            log::Level::Trace => FfiLogLevel::Trace,
        }
    }
}

impl From<FfiLogLevel> for log::Level {
    fn from(level: FfiLogLevel) -> Self {
        match level {
            FfiLogLevel::Error => log::Level::Error,
            FfiLogLevel::Warn => log::Level::Warn,
            FfiLogLevel::Info => log::Level::Info,
            FfiLogLevel::Debug => log::Level::Debug,
            FfiLogLevel::Trace => log::Level::Trace,
        }
    }
}

/// Callback interface for receiving log messages from Rust
///
/// Kotlin should implement this with `android.util.Log`.
#[uniffi::export(callback_interface)]
pub trait LogCallback: Send + Sync {
    /// Called when a log message is emitted
    ///
    /// # Arguments
    /// * `level` - The log level (error, warn, info, debug, trace)
    /// * `target` - The logging target (typically module path, e.g., "mail::labels")
    /// * `message` - The log message
    fn on_log(&self, level: FfiLogLevel, target: String, message: String);
}
