//! FFI bindings for UniFFI export
//!
//! This module provides Kotlin (and Swift) bindings for the mail crate via
//! UniFFI.
//!
//! ## Usage from Kotlin
//!
//! ```kotlin
//! // Route Rust logs to logcat first
//! initializeLogging(AndroidLogCallback(), FfiLogLevel.INFO)
//!
//! val service = MailService(dbPath = "${filesDir}/mail.db", configPath = null)
//! service.setSession(userId, uid, accessToken)
//!
//! // Labels, refreshed from the server on first observation
//! val labels = service.observeAllLabels(userId, FfiRefreshPolicy.ALWAYS)
//! render(labels.current())
//!
//! // Action sheet for the selected conversations
//! val sheet = service.actionSheet(FfiActionSheetTarget.MAILBOX_ITEMS_IN_MAILBOX_SCREEN, userId)
//! val event = sheet.moveToInbox(selectedIds, FfiMessageLocation.ARCHIVE)
//! ```

mod logging;
mod service;
mod types;

// Re-export all FFI types and the MailService
pub use logging::{init_ffi_logger, initialize_logging, set_log_callback, set_log_level, update_log_level};
pub use service::*;
pub use types::*;
