//! Mail crate - Business logic for the mail client core
//!
//! This crate provides platform-independent mail functionality including:
//! - Domain models (Label, Message, MessageLocation)
//! - REST API client for labels and mailbox endpoints
//! - Storage trait abstractions with in-memory and SQLite backends
//! - Label repository with fetch-then-cache refresh and live observation
//! - Mailbox actions and the action sheet router (message vs conversation scope)
//! - Draft saving with per-address encryption
//!
//! This crate has zero UI dependencies and is exported to Kotlin through
//! UniFFI (see the `ffi` module and the `mail-ffi` crate).

uniffi::setup_scaffolding!();

pub mod actions;
pub mod api;
pub mod compose;
pub mod config;
pub mod ffi;
pub mod labels;
pub mod mailbox;
pub mod models;
pub mod storage;

pub use actions::{
    ActionScope, ActionSheet, ActionSheetError, ActionSheetEvent, ActionSheetState, ActionSheetTarget,
    ConversationActions, ConversationMode, ConversationsActionResult, MailboxActionHandler,
    MessageActions, MoveSectionState, ReadStatusAction, StarredStatusAction, ViewModeSetting,
    move_section_visibility,
};
pub use api::{ApiClient, ApiError, GetAllMessagesParameters, LabelApi, MailboxApi, Session};
pub use compose::{AddressCrypto, AddressCryptoFactory, CipherText, DraftError, SaveDraft};
pub use config::MailConfig;
pub use labels::{LabelRepository, LabelsObservation, RefreshPolicy, SelectedLabels};
pub use mailbox::{MessagesPage, fetch_messages_page};
pub use models::{
    AddressId, ConversationId, EmailAddress, Label, LabelId, LabelType, Message, MessageId,
    MessageLocation, ParsedHeaders, UserId,
};
pub use storage::{InMemoryMailStore, LabelStore, MessageStore, SqliteMailStore};
