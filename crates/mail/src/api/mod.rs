//! REST API integration
//!
//! This module provides:
//! - Wire types for the label and message endpoints
//! - `LabelApi` / `MailboxApi` traits, the seams the repository and action
//!   handler depend on
//! - `ApiClient`, the blocking HTTP implementation of both
//! - Normalization of wire types into domain models

mod client;
mod normalize;
mod params;

pub use client::{ApiClient, Session};
pub use normalize::{normalize_label, normalize_message};
pub use params::{GetAllMessagesParameters, SortBy, SortDirection};

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::models::{ConversationId, MessageId, ParsedHeaders, UserId};

/// Response code for a successful call
pub const CODE_OK: i32 = 1000;
/// Response code for a successful call with per-item results
pub const CODE_MULTI_STATUS: i32 = 1001;

/// Typed API failures callers may want to match on
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("No session for user {0}")]
    NoSession(String),

    #[error("HTTP {status} from {endpoint}")]
    Status { status: u16, endpoint: String },

    #[error("API error {code} from {endpoint}")]
    Code { code: i32, endpoint: String },

    #[error("{endpoint} rejected {} item(s): {}", .failed_ids.len(), .failed_ids.join(", "))]
    PartialFailure {
        endpoint: String,
        failed_ids: Vec<String>,
    },
}

/// Label as returned by `core/v4/labels`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ApiLabel {
    #[serde(rename = "ID")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(rename = "Type")]
    pub label_type: i32,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub order: i32,
    #[serde(rename = "ParentID", default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub notify: i32,
    #[serde(default)]
    pub expanded: i32,
    #[serde(default)]
    pub sticky: i32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LabelsResponse {
    pub code: i32,
    #[serde(default)]
    pub labels: Vec<ApiLabel>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ApiAddress {
    #[serde(default)]
    pub name: String,
    pub address: String,
}

/// Message metadata as returned by `mail/v4/messages`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ApiMessage {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "ConversationID")]
    pub conversation_id: String,
    #[serde(rename = "AddressID", default)]
    pub address_id: Option<String>,
    #[serde(default)]
    pub subject: String,
    pub sender: ApiAddress,
    #[serde(default)]
    pub to_list: Vec<ApiAddress>,
    #[serde(rename = "CCList", default)]
    pub cc_list: Vec<ApiAddress>,
    /// Unix timestamp in seconds
    pub time: i64,
    #[serde(default)]
    pub unread: i32,
    #[serde(rename = "LabelIDs", default)]
    pub label_ids: Vec<String>,
    #[serde(default)]
    pub header: Option<String>,
    #[serde(default)]
    pub parsed_headers: Option<ParsedHeaders>,
    #[serde(default)]
    pub body: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MessagesResponse {
    pub code: i32,
    #[serde(default)]
    pub total: u32,
    #[serde(default)]
    pub messages: Vec<ApiMessage>,
}

/// Envelope returned by mutation endpoints
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ActionResponse {
    pub code: i32,
    /// Per-item outcomes, present with `CODE_MULTI_STATUS`
    #[serde(default)]
    pub responses: Vec<ItemResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ItemResponse {
    #[serde(rename = "ID")]
    pub id: String,
    pub response: ItemResult,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ItemResult {
    pub code: i32,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct IdsRequest {
    #[serde(rename = "IDs")]
    pub ids: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct LabelIdsRequest {
    #[serde(rename = "LabelID")]
    pub label_id: String,
    #[serde(rename = "IDs")]
    pub ids: Vec<String>,
}

/// Remote source for labels, folders and contact groups
pub trait LabelApi: Send + Sync {
    fn fetch_labels(&self, user_id: &UserId) -> Result<Vec<ApiLabel>>;

    fn fetch_folders(&self, user_id: &UserId) -> Result<Vec<ApiLabel>>;

    fn fetch_contact_groups(&self, user_id: &UserId) -> Result<Vec<ApiLabel>>;
}

/// Remote mailbox listing and mutation endpoints
pub trait MailboxApi: Send + Sync {
    fn fetch_messages(&self, params: &GetAllMessagesParameters) -> Result<MessagesResponse>;

    fn mark_messages_read(&self, user_id: &UserId, ids: &[MessageId]) -> Result<()>;

    fn mark_messages_unread(&self, user_id: &UserId, ids: &[MessageId]) -> Result<()>;

    fn label_messages(&self, user_id: &UserId, label_id: &str, ids: &[MessageId]) -> Result<()>;

    fn unlabel_messages(&self, user_id: &UserId, label_id: &str, ids: &[MessageId]) -> Result<()>;

    /// Permanently delete messages from the given location
    fn delete_messages(&self, user_id: &UserId, ids: &[MessageId], label_id: &str) -> Result<()>;

    fn mark_conversations_read(&self, user_id: &UserId, ids: &[ConversationId]) -> Result<()>;

    /// Mark the conversations unread within the given location
    fn mark_conversations_unread(
        &self,
        user_id: &UserId,
        ids: &[ConversationId],
        label_id: &str,
    ) -> Result<()>;

    fn label_conversations(
        &self,
        user_id: &UserId,
        label_id: &str,
        ids: &[ConversationId],
    ) -> Result<()>;

    fn unlabel_conversations(
        &self,
        user_id: &UserId,
        label_id: &str,
        ids: &[ConversationId],
    ) -> Result<()>;

    fn delete_conversations(
        &self,
        user_id: &UserId,
        ids: &[ConversationId],
        label_id: &str,
    ) -> Result<()>;
}
