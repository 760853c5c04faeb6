//! MailService facade for UniFFI export
//!
//! This provides a high-level, FFI-friendly API that wraps the internal
//! storage, label repository, action sheet and draft functionality.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::Result as AnyResult;
use log::info;
use tokio::sync::watch;

use crate::actions::{ActionSheet, MailboxActionHandler, ViewModeSetting};
use crate::api::{ApiClient, GetAllMessagesParameters, Session};
use crate::compose::{AddressCrypto, AddressCryptoFactory, CipherText, SaveDraft};
use crate::config::MailConfig;
use crate::ffi::logging::set_log_level;
use crate::ffi::types::*;
use crate::labels::{LabelRepository, SelectedLabels};
use crate::mailbox::fetch_messages_page;
use crate::models::{AddressId, Label, LabelId, LabelType, MessageId, UserId};
use crate::storage::{MessageStore, SqliteMailStore};

/// Main service object for mail operations
///
/// This is the primary entry point for Kotlin code to interact with the
/// mail crate. Calls block; run them off the main thread.
#[derive(uniffi::Object)]
pub struct MailService {
    store: Arc<SqliteMailStore>,
    api: Arc<ApiClient>,
    labels: LabelRepository,
    actions: Arc<MailboxActionHandler>,
    view_mode: Arc<ViewModeSetting>,
}

#[uniffi::export]
impl MailService {
    /// Create a new MailService
    ///
    /// # Arguments
    /// * `db_path` - Path to the SQLite database file
    /// * `config_path` - Optional JSON config file; defaults to the app
    ///   config directory, then the environment
    #[uniffi::constructor]
    pub fn new(db_path: String, config_path: Option<String>) -> Result<Arc<Self>, MailError> {
        let config = match config_path {
            Some(path) => MailConfig::from_file(Path::new(&path)),
            None => MailConfig::load(),
        }
        .map_err(|e| MailError::InvalidArgument {
            message: format!("Failed to load config: {:#}", e),
        })?;
        set_log_level(config.log_level());

        // Ensure parent directories exist
        if let Some(parent) = PathBuf::from(&db_path).parent() {
            std::fs::create_dir_all(parent).map_err(|e| MailError::Database {
                message: format!("Failed to create database directory: {}", e),
            })?;
        }

        let store = Arc::new(SqliteMailStore::new(&db_path).map_err(|e| MailError::Database {
            message: format!("Failed to open database: {:#}", e),
        })?);
        let api = Arc::new(ApiClient::new(&config));

        info!("Mail service ready (api: {})", config.api_base_url);

        Ok(Arc::new(Self {
            labels: LabelRepository::new(store.clone(), api.clone()),
            actions: Arc::new(MailboxActionHandler::new(api.clone(), store.clone())),
            view_mode: Arc::new(ViewModeSetting::new(true)),
            store,
            api,
        }))
    }

    // ========================================================================
    // Sessions and settings
    // ========================================================================

    /// Register the authenticated session used for a user's requests
    pub fn set_session(&self, user_id: String, uid: String, access_token: String) {
        self.api
            .set_session(UserId::new(user_id), Session { uid, access_token });
    }

    pub fn remove_session(&self, user_id: String) {
        self.api.remove_session(&UserId::new(user_id));
    }

    /// Whether mailbox lists group messages into conversations
    pub fn set_conversation_mode(&self, enabled: bool) {
        self.view_mode.set_conversation_grouping(enabled);
    }

    // ========================================================================
    // Labels
    // ========================================================================

    /// Start observing a user's labels
    pub fn observe_all_labels(
        &self,
        user_id: String,
        policy: FfiRefreshPolicy,
    ) -> Result<Arc<FfiLabelsObservation>, MailError> {
        let observation = self
            .labels
            .observe_all_labels(&UserId::new(user_id), policy.into())?;

        Ok(Arc::new(FfiLabelsObservation {
            receiver: Mutex::new(observation.labels),
            refresh_error: observation.refresh_error.map(|e| format!("{:#}", e)),
        }))
    }

    /// Observe the labels with the given ids, from local storage only
    pub fn observe_labels(
        &self,
        user_id: String,
        ids: Vec<String>,
    ) -> Result<Arc<FfiSelectedLabels>, MailError> {
        let ids: Vec<LabelId> = ids.into_iter().map(LabelId::new).collect();
        let selected = self.labels.observe_labels(&UserId::new(user_id), &ids)?;
        Ok(Arc::new(FfiSelectedLabels {
            inner: Mutex::new(selected),
        }))
    }

    /// All labels of a user; fetched when nothing is cached
    pub fn find_all_labels(&self, user_id: String) -> Result<Vec<FfiLabel>, MailError> {
        let labels = self.labels.find_all_labels(&UserId::new(user_id))?;
        Ok(to_ffi_labels(labels))
    }

    /// Fetch labels, folders and contact groups from the server
    pub fn refresh_labels(&self, user_id: String) -> Result<Vec<FfiLabel>, MailError> {
        let labels = self.labels.refresh_labels(&UserId::new(user_id))?;
        Ok(to_ffi_labels(labels))
    }

    pub fn find_labels(&self, user_id: String, ids: Vec<String>) -> Result<Vec<FfiLabel>, MailError> {
        let ids: Vec<LabelId> = ids.into_iter().map(LabelId::new).collect();
        let labels = self.labels.find_labels(&UserId::new(user_id), &ids)?;
        Ok(to_ffi_labels(labels))
    }

    pub fn find_label(&self, id: String) -> Result<Option<FfiLabel>, MailError> {
        let label = self.labels.find_label(&LabelId::new(id))?;
        Ok(label.map(FfiLabel::from))
    }

    pub fn find_contact_groups(&self, user_id: String) -> Result<Vec<FfiLabel>, MailError> {
        let labels = self.labels.find_contact_groups(&UserId::new(user_id))?;
        Ok(to_ffi_labels(labels))
    }

    /// Page through labels or folders in display order
    pub fn find_labels_paged(
        &self,
        user_id: String,
        label_type: FfiLabelType,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<FfiLabel>, MailError> {
        let user_id = UserId::new(user_id);
        let (limit, offset) = (limit as usize, offset as usize);
        let labels = match LabelType::from(label_type) {
            LabelType::Folder => self.labels.find_folders_paged(&user_id, limit, offset)?,
            LabelType::MessageLabel => self.labels.find_labels_paged(&user_id, limit, offset)?,
            LabelType::ContactGroup => self
                .labels
                .find_contact_groups(&user_id)?
                .into_iter()
                .skip(offset)
                .take(limit)
                .collect(),
        };
        Ok(to_ffi_labels(labels))
    }

    pub fn save_labels(&self, user_id: String, labels: Vec<FfiLabel>) -> Result<(), MailError> {
        let user_id = UserId::new(user_id);
        let labels: Vec<Label> = labels
            .into_iter()
            .map(|l| l.into_label(user_id.clone()))
            .collect();
        self.labels.save_labels(&labels)?;
        Ok(())
    }

    pub fn delete_label(&self, id: String) -> Result<(), MailError> {
        self.labels.delete_label(&LabelId::new(id))?;
        Ok(())
    }

    pub fn delete_all_labels(&self, user_id: String) -> Result<(), MailError> {
        self.labels.delete_all_labels(&UserId::new(user_id))?;
        Ok(())
    }

    pub fn delete_contact_groups(&self, user_id: String) -> Result<(), MailError> {
        self.labels.delete_contact_groups(&UserId::new(user_id))?;
        Ok(())
    }

    // ========================================================================
    // Messages
    // ========================================================================

    /// Fetch one page of a location, continuing from an optional bookmark
    pub fn fetch_messages_page(
        &self,
        user_id: String,
        label_id: String,
        end: Option<i64>,
        end_id: Option<String>,
    ) -> Result<FfiMessagesPage, MailError> {
        let mut params = GetAllMessagesParameters::new(UserId::new(user_id)).with_label(label_id);
        params.end = end;
        params.end_id = end_id;

        let page = fetch_messages_page(self.api.as_ref(), self.store.as_ref(), &params)?;
        Ok(page.into())
    }

    pub fn get_message(&self, id: String) -> Result<Option<FfiMessage>, MailError> {
        let message = self.store.find_message(&MessageId::new(id))?;
        Ok(message.map(FfiMessage::from))
    }

    /// Encrypt a draft's body with its address keys and store it locally
    pub fn save_draft(
        &self,
        draft: FfiMessage,
        crypto: Box<dyn DraftCrypto>,
    ) -> Result<FfiMessage, MailError> {
        let factory = Arc::new(CallbackCryptoFactory {
            callback: Arc::from(crypto),
        });
        let saved = SaveDraft::new(factory, self.store.clone()).save(draft.into())?;
        Ok(saved.into())
    }

    // ========================================================================
    // Action sheet
    // ========================================================================

    /// Create the action sheet router for one sheet instance
    pub fn action_sheet(&self, target: FfiActionSheetTarget, user_id: String) -> Arc<FfiActionSheet> {
        Arc::new(FfiActionSheet {
            inner: ActionSheet::new(
                target.into(),
                UserId::new(user_id),
                self.store.clone(),
                self.actions.clone(),
                self.actions.clone(),
                self.view_mode.clone(),
            ),
        })
    }
}

fn to_ffi_labels(labels: Vec<Label>) -> Vec<FfiLabel> {
    labels.into_iter().map(FfiLabel::from).collect()
}

/// Polling handle over a label observation
#[derive(uniffi::Object)]
pub struct FfiLabelsObservation {
    receiver: Mutex<watch::Receiver<Vec<Label>>>,
    refresh_error: Option<String>,
}

#[uniffi::export]
impl FfiLabelsObservation {
    /// Current labels, marking them seen
    pub fn current(&self) -> Vec<FfiLabel> {
        let mut receiver = self.receiver.lock().unwrap();
        to_ffi_labels(receiver.borrow_and_update().clone())
    }

    /// The new labels if they changed since the last read
    pub fn poll_changed(&self) -> Option<Vec<FfiLabel>> {
        let mut receiver = self.receiver.lock().unwrap();
        match receiver.has_changed() {
            Ok(true) => Some(to_ffi_labels(receiver.borrow_and_update().clone())),
            _ => None,
        }
    }

    /// Why the initial refresh failed, if it did
    pub fn refresh_error(&self) -> Option<String> {
        self.refresh_error.clone()
    }
}

/// Polling handle over a selection of labels
#[derive(uniffi::Object)]
pub struct FfiSelectedLabels {
    inner: Mutex<SelectedLabels>,
}

#[uniffi::export]
impl FfiSelectedLabels {
    /// Selected labels as currently stored
    pub fn current(&self) -> Vec<FfiLabel> {
        to_ffi_labels(self.inner.lock().unwrap().current())
    }

    /// The new selection if it changed since the last read
    pub fn poll_changed(&self) -> Option<Vec<FfiLabel>> {
        self.inner.lock().unwrap().poll_changed().map(to_ffi_labels)
    }
}

/// Action sheet router exported to the host
#[derive(uniffi::Object)]
pub struct FfiActionSheet {
    inner: ActionSheet,
}

#[uniffi::export]
impl FfiActionSheet {
    pub fn show_labels_manager(
        &self,
        ids: Vec<String>,
        location: FfiMessageLocation,
        label_type: FfiLabelType,
    ) -> Result<FfiActionSheetEvent, MailError> {
        let event = self
            .inner
            .show_labels_manager(&ids, location.into(), label_type.into())?;
        Ok(event.into())
    }

    pub fn show_message_headers(&self, id: String) -> Result<FfiActionSheetEvent, MailError> {
        Ok(self.inner.show_message_headers(&id)?.into())
    }

    pub fn move_to_inbox(
        &self,
        ids: Vec<String>,
        location: FfiMessageLocation,
    ) -> Result<FfiActionSheetEvent, MailError> {
        Ok(self.inner.move_to_inbox(&ids, location.into())?.into())
    }

    pub fn move_to_folder(
        &self,
        ids: Vec<String>,
        location: FfiMessageLocation,
        destination: FfiMessageLocation,
    ) -> Result<FfiActionSheetEvent, MailError> {
        let event = self
            .inner
            .move_to_folder(&ids, location.into(), destination.into())?;
        Ok(event.into())
    }

    pub fn delete(
        &self,
        ids: Vec<String>,
        location: FfiMessageLocation,
    ) -> Result<FfiActionSheetEvent, MailError> {
        Ok(self.inner.delete(&ids, location.into())?.into())
    }

    pub fn mark_read(
        &self,
        ids: Vec<String>,
        location: FfiMessageLocation,
        location_id: String,
    ) -> Result<FfiActionSheetEvent, MailError> {
        Ok(self.inner.mark_read(&ids, location.into(), &location_id)?.into())
    }

    pub fn mark_unread(
        &self,
        ids: Vec<String>,
        location: FfiMessageLocation,
        location_id: String,
    ) -> Result<FfiActionSheetEvent, MailError> {
        Ok(self.inner.mark_unread(&ids, location.into(), &location_id)?.into())
    }

    pub fn star_message(
        &self,
        ids: Vec<String>,
        location: FfiMessageLocation,
    ) -> Result<FfiActionSheetEvent, MailError> {
        Ok(self.inner.star_message(&ids, location.into())?.into())
    }

    pub fn unstar_message(
        &self,
        ids: Vec<String>,
        location: FfiMessageLocation,
    ) -> Result<FfiActionSheetEvent, MailError> {
        Ok(self.inner.unstar_message(&ids, location.into())?.into())
    }

    pub fn setup_view_state(&self, ids: Vec<String>, location: FfiMessageLocation) -> FfiMoveSectionState {
        self.inner.setup_view_state(&ids, location.into()).into()
    }
}

/// Adapts the host's crypto callback to the draft seam
struct CallbackCryptoFactory {
    callback: Arc<dyn DraftCrypto>,
}

struct CallbackCrypto {
    callback: Arc<dyn DraftCrypto>,
    address_id: AddressId,
}

impl AddressCryptoFactory for CallbackCryptoFactory {
    fn create(&self, address_id: &AddressId) -> AnyResult<Box<dyn AddressCrypto>> {
        Ok(Box::new(CallbackCrypto {
            callback: self.callback.clone(),
            address_id: address_id.clone(),
        }))
    }
}

impl AddressCrypto for CallbackCrypto {
    fn encrypt(&self, text: &str, armored: bool) -> AnyResult<CipherText> {
        let encrypted =
            self.callback
                .encrypt(self.address_id.as_str().to_string(), text.to_string(), armored)?;
        Ok(CipherText::new(encrypted))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Message, ParsedHeaders};
    use chrono::{TimeZone, Utc};
    use tempfile::TempDir;

    struct ReverseCrypto;

    impl DraftCrypto for ReverseCrypto {
        fn encrypt(&self, address_id: String, text: String, _armored: bool) -> Result<String, MailError> {
            Ok(format!("{}:{}", address_id, text.chars().rev().collect::<String>()))
        }
    }

    fn service(dir: &TempDir) -> Arc<MailService> {
        let config_path = dir.path().join("mail.json");
        std::fs::write(&config_path, r#"{ "api_base_url": "http://127.0.0.1:9" }"#).unwrap();
        MailService::new(
            dir.path().join("db").join("mail.db").to_string_lossy().to_string(),
            Some(config_path.to_string_lossy().to_string()),
        )
        .unwrap()
    }

    fn draft(address_id: Option<&str>) -> FfiMessage {
        FfiMessage {
            id: "d1".to_string(),
            conversation_id: "c1".to_string(),
            user_id: "u1".to_string(),
            address_id: address_id.map(str::to_string),
            subject: "Draft".to_string(),
            sender: FfiEmailAddress {
                name: None,
                email: "me@proton.me".to_string(),
            },
            to: Vec::new(),
            cc: Vec::new(),
            time_millis: 1_700_000_000_000,
            unread: false,
            label_ids: vec!["8".to_string(), "1".to_string()],
            header: None,
            parsed_headers: None,
            message_body: None,
            decrypted_body: Some("hello".to_string()),
        }
    }

    #[test]
    fn test_save_draft_through_callback() {
        let dir = TempDir::new().unwrap();
        let service = service(&dir);

        let saved = service.save_draft(draft(Some("a1")), Box::new(ReverseCrypto)).unwrap();

        assert_eq!(saved.message_body.as_deref(), Some("a1:olleh"));
        let stored = service.get_message("d1".to_string()).unwrap().unwrap();
        assert_eq!(stored.message_body.as_deref(), Some("a1:olleh"));
    }

    #[test]
    fn test_save_draft_without_address() {
        let dir = TempDir::new().unwrap();
        let service = service(&dir);

        let err = service.save_draft(draft(None), Box::new(ReverseCrypto)).unwrap_err();
        assert!(matches!(err, MailError::MissingAddressId { .. }));
    }

    #[test]
    fn test_labels_without_session_require_auth() {
        let dir = TempDir::new().unwrap();
        let service = service(&dir);

        let err = service.find_all_labels("u1".to_string()).unwrap_err();
        assert!(matches!(err, MailError::AuthRequired));
    }

    #[test]
    fn test_saved_labels_are_observable() {
        let dir = TempDir::new().unwrap();
        let service = service(&dir);
        let observation = service
            .observe_all_labels("u1".to_string(), FfiRefreshPolicy::Never)
            .unwrap();
        assert!(observation.current().is_empty());
        assert!(observation.poll_changed().is_none());

        service
            .save_labels(
                "u1".to_string(),
                vec![FfiLabel {
                    id: "f1".to_string(),
                    name: "Work".to_string(),
                    label_type: FfiLabelType::Folder,
                    color: "#00ff00".to_string(),
                    order: 1,
                    path: "Work".to_string(),
                    parent_id: None,
                    notify: true,
                    expanded: false,
                    sticky: false,
                }],
            )
            .unwrap();

        let changed = observation.poll_changed().unwrap();
        assert_eq!(changed.len(), 1);
        assert_eq!(
            service
                .find_labels_paged("u1".to_string(), FfiLabelType::Folder, 10, 0)
                .unwrap()
                .len(),
            1
        );
    }

    #[test]
    fn test_draft_edit_keeps_stored_fields() {
        let dir = TempDir::new().unwrap();
        let service = service(&dir);
        let stored = Message::builder("d1", "c1")
            .user_id(UserId::new("u1"))
            .address_id(AddressId::new("a1"))
            .time(Utc.timestamp_millis_opt(1_700_000_000_123).unwrap())
            .header("X-Pm-Origin: internal")
            .parsed_headers(ParsedHeaders {
                recipient_encryption: Some("pgp-pm".to_string()),
                recipient_authentication: Some("pgp-auth".to_string()),
            })
            .label_ids(vec!["8".to_string()])
            .build();
        service.store.save_message(stored.clone()).unwrap();

        let mut edited = service.get_message("d1".to_string()).unwrap().unwrap();
        edited.decrypted_body = Some("second pass".to_string());
        service.save_draft(edited, Box::new(ReverseCrypto)).unwrap();

        let reloaded = service.store.find_message(&MessageId::new("d1")).unwrap().unwrap();
        assert_eq!(reloaded.parsed_headers, stored.parsed_headers);
        assert_eq!(reloaded.time.timestamp_millis(), 1_700_000_000_123);
        assert_eq!(reloaded.header, stored.header);
        assert_eq!(reloaded.message_body.as_deref(), Some("a1:ssap dnoces"));
    }

    #[test]
    fn test_observe_selected_labels() {
        let dir = TempDir::new().unwrap();
        let service = service(&dir);
        let folder = |id: &str, name: &str| FfiLabel {
            id: id.to_string(),
            name: name.to_string(),
            label_type: FfiLabelType::Folder,
            color: "#00ff00".to_string(),
            order: 0,
            path: name.to_string(),
            parent_id: None,
            notify: false,
            expanded: false,
            sticky: false,
        };
        service
            .save_labels("u1".to_string(), vec![folder("f1", "Work"), folder("f2", "Home")])
            .unwrap();

        let selected = service
            .observe_labels("u1".to_string(), vec!["f1".to_string()])
            .unwrap();
        assert_eq!(selected.current().len(), 1);

        service
            .save_labels("u1".to_string(), vec![folder("f2", "House")])
            .unwrap();
        assert!(selected.poll_changed().is_none());

        service
            .save_labels("u1".to_string(), vec![folder("f1", "Office")])
            .unwrap();
        let changed = selected.poll_changed().unwrap();
        assert_eq!(changed.len(), 1);
        assert_eq!(changed[0].name, "Office");
    }

    #[test]
    fn test_headers_of_unknown_message_are_not_found() {
        let dir = TempDir::new().unwrap();
        let service = service(&dir);
        let sheet = service.action_sheet(FfiActionSheetTarget::MessageItemInDetailScreen, "u1".to_string());

        let err = sheet.show_message_headers("m404".to_string()).unwrap_err();
        assert!(matches!(err, MailError::NotFound { resource } if resource == "message m404"));
    }

    #[test]
    fn test_action_sheet_view_state() {
        let dir = TempDir::new().unwrap();
        let service = service(&dir);
        let sheet = service.action_sheet(FfiActionSheetTarget::MessageItemWithinConversationDetailScreen, "u1".to_string());

        let state = sheet.setup_view_state(vec!["m1".to_string()], FfiMessageLocation::Trash);

        assert!(state.show_move_to_inbox);
        assert!(!state.show_move_to_trash);
        assert!(state.show_delete);
    }
}
