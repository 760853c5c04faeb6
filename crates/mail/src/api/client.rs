//! REST API HTTP client
//!
//! Uses synchronous HTTP (ureq) to stay executor-agnostic; callers move the
//! work onto a background thread. Failed calls are not retried here.

use anyhow::{Context, Result};
use log::{debug, warn};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;
use ureq::{Agent, RequestBuilder};

use super::{
    ActionResponse, ApiError, ApiLabel, CODE_MULTI_STATUS, CODE_OK, GetAllMessagesParameters,
    IdsRequest, LabelApi, LabelIdsRequest, LabelsResponse, MailboxApi, MessagesResponse,
};
use crate::config::MailConfig;
use crate::models::{ConversationId, LabelType, MessageId, UserId};

/// Authenticated session for one user
#[derive(Debug, Clone)]
pub struct Session {
    pub uid: String,
    pub access_token: String,
}

/// HTTP client for the mail REST API
pub struct ApiClient {
    agent: Agent,
    base_url: String,
    app_version: String,
    sessions: RwLock<HashMap<UserId, Session>>,
}

impl ApiClient {
    /// Create a new client from the loaded configuration
    pub fn new(config: &MailConfig) -> Self {
        let agent: Agent = Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(config.request_timeout_secs)))
            .build()
            .into();

        Self {
            agent,
            base_url: config.api_base_url.clone(),
            app_version: config.app_version.clone(),
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Register (or replace) the session used for a user's requests
    pub fn set_session(&self, user_id: UserId, session: Session) {
        if let Ok(mut sessions) = self.sessions.write() {
            sessions.insert(user_id, session);
        }
    }

    /// Forget a user's session (logout)
    pub fn remove_session(&self, user_id: &UserId) {
        if let Ok(mut sessions) = self.sessions.write() {
            sessions.remove(user_id);
        }
    }

    pub fn has_session(&self, user_id: &UserId) -> bool {
        self.sessions
            .read()
            .map(|s| s.contains_key(user_id))
            .unwrap_or(false)
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint)
    }

    fn session(&self, user_id: &UserId) -> Result<Session> {
        let sessions = self
            .sessions
            .read()
            .map_err(|_| anyhow::anyhow!("Session table poisoned"))?;
        sessions
            .get(user_id)
            .cloned()
            .ok_or_else(|| ApiError::NoSession(user_id.as_str().to_string()).into())
    }

    /// Attach the session and client headers to a request
    fn authorized<B>(&self, request: RequestBuilder<B>, user_id: &UserId) -> Result<RequestBuilder<B>> {
        let session = self.session(user_id)?;
        Ok(request
            .header("x-pm-uid", &session.uid)
            .header("Authorization", &format!("Bearer {}", session.access_token))
            .header("x-pm-appversion", &self.app_version))
    }

    fn get_json<T: DeserializeOwned>(
        &self,
        user_id: &UserId,
        endpoint: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let mut request = self.authorized(self.agent.get(&self.url(endpoint)), user_id)?;
        for (key, value) in query {
            request = request.query(*key, value);
        }

        let mut response = request.call().map_err(|e| map_transport_error(e, endpoint))?;
        response
            .body_mut()
            .read_json()
            .with_context(|| format!("Failed to parse {} response", endpoint))
    }

    fn put_action<B: Serialize>(&self, user_id: &UserId, endpoint: &str, body: &B) -> Result<()> {
        let request = self.authorized(self.agent.put(&self.url(endpoint)), user_id)?;

        let mut response = request
            .send_json(body)
            .map_err(|e| map_transport_error(e, endpoint))?;
        let result: ActionResponse = response
            .body_mut()
            .read_json()
            .with_context(|| format!("Failed to parse {} response", endpoint))?;

        ensure_success(result.code, endpoint)?;
        ensure_items_succeeded(&result, endpoint)
    }

    fn fetch_labels_of_type(&self, user_id: &UserId, label_type: LabelType) -> Result<Vec<ApiLabel>> {
        let endpoint = "core/v4/labels";
        let response: LabelsResponse =
            self.get_json(user_id, endpoint, &[("Type", label_type.as_int().to_string())])?;
        ensure_success(response.code, endpoint)?;

        debug!(
            "Fetched {} labels of type {:?} for user {}",
            response.labels.len(),
            label_type,
            user_id.as_str()
        );
        Ok(response.labels)
    }
}

impl LabelApi for ApiClient {
    fn fetch_labels(&self, user_id: &UserId) -> Result<Vec<ApiLabel>> {
        self.fetch_labels_of_type(user_id, LabelType::MessageLabel)
    }

    fn fetch_folders(&self, user_id: &UserId) -> Result<Vec<ApiLabel>> {
        self.fetch_labels_of_type(user_id, LabelType::Folder)
    }

    fn fetch_contact_groups(&self, user_id: &UserId) -> Result<Vec<ApiLabel>> {
        self.fetch_labels_of_type(user_id, LabelType::ContactGroup)
    }
}

impl MailboxApi for ApiClient {
    fn fetch_messages(&self, params: &GetAllMessagesParameters) -> Result<MessagesResponse> {
        let endpoint = "mail/v4/messages";
        let response: MessagesResponse =
            self.get_json(&params.user_id, endpoint, &params.query_pairs())?;
        ensure_success(response.code, endpoint)?;
        Ok(response)
    }

    fn mark_messages_read(&self, user_id: &UserId, ids: &[MessageId]) -> Result<()> {
        self.put_action(user_id, "mail/v4/messages/read", &ids_request(ids.iter().map(|id| id.as_str())))
    }

    fn mark_messages_unread(&self, user_id: &UserId, ids: &[MessageId]) -> Result<()> {
        self.put_action(user_id, "mail/v4/messages/unread", &ids_request(ids.iter().map(|id| id.as_str())))
    }

    fn label_messages(&self, user_id: &UserId, label_id: &str, ids: &[MessageId]) -> Result<()> {
        let body = label_ids_request(label_id, ids.iter().map(|id| id.as_str()));
        self.put_action(user_id, "mail/v4/messages/label", &body)
    }

    fn unlabel_messages(&self, user_id: &UserId, label_id: &str, ids: &[MessageId]) -> Result<()> {
        let body = label_ids_request(label_id, ids.iter().map(|id| id.as_str()));
        self.put_action(user_id, "mail/v4/messages/unlabel", &body)
    }

    fn delete_messages(&self, user_id: &UserId, ids: &[MessageId], label_id: &str) -> Result<()> {
        let body = label_ids_request(label_id, ids.iter().map(|id| id.as_str()));
        self.put_action(user_id, "mail/v4/messages/delete", &body)
    }

    fn mark_conversations_read(&self, user_id: &UserId, ids: &[ConversationId]) -> Result<()> {
        self.put_action(
            user_id,
            "mail/v4/conversations/read",
            &ids_request(ids.iter().map(|id| id.as_str())),
        )
    }

    fn mark_conversations_unread(
        &self,
        user_id: &UserId,
        ids: &[ConversationId],
        label_id: &str,
    ) -> Result<()> {
        let body = label_ids_request(label_id, ids.iter().map(|id| id.as_str()));
        self.put_action(user_id, "mail/v4/conversations/unread", &body)
    }

    fn label_conversations(
        &self,
        user_id: &UserId,
        label_id: &str,
        ids: &[ConversationId],
    ) -> Result<()> {
        let body = label_ids_request(label_id, ids.iter().map(|id| id.as_str()));
        self.put_action(user_id, "mail/v4/conversations/label", &body)
    }

    fn unlabel_conversations(
        &self,
        user_id: &UserId,
        label_id: &str,
        ids: &[ConversationId],
    ) -> Result<()> {
        let body = label_ids_request(label_id, ids.iter().map(|id| id.as_str()));
        self.put_action(user_id, "mail/v4/conversations/unlabel", &body)
    }

    fn delete_conversations(
        &self,
        user_id: &UserId,
        ids: &[ConversationId],
        label_id: &str,
    ) -> Result<()> {
        let body = label_ids_request(label_id, ids.iter().map(|id| id.as_str()));
        self.put_action(user_id, "mail/v4/conversations/delete", &body)
    }
}

fn ids_request<'a>(ids: impl Iterator<Item = &'a str>) -> IdsRequest {
    IdsRequest {
        ids: ids.map(str::to_string).collect(),
    }
}

fn label_ids_request<'a>(label_id: &str, ids: impl Iterator<Item = &'a str>) -> LabelIdsRequest {
    LabelIdsRequest {
        label_id: label_id.to_string(),
        ids: ids.map(str::to_string).collect(),
    }
}

fn ensure_success(code: i32, endpoint: &str) -> Result<()> {
    if code == CODE_OK || code == CODE_MULTI_STATUS {
        Ok(())
    } else {
        Err(ApiError::Code {
            code,
            endpoint: endpoint.to_string(),
        }
        .into())
    }
}

/// Fail when a multi-status response rejected any item
///
/// Callers mirror actions into local storage only on success, so a partial
/// failure leaves every item as the next sync reports it.
fn ensure_items_succeeded(response: &ActionResponse, endpoint: &str) -> Result<()> {
    let failed_ids: Vec<String> = response
        .responses
        .iter()
        .filter(|item| item.response.code != CODE_OK)
        .map(|item| {
            warn!(
                "{} rejected {} with code {}: {}",
                endpoint,
                item.id,
                item.response.code,
                item.response.error.as_deref().unwrap_or("no details")
            );
            item.id.clone()
        })
        .collect();

    if failed_ids.is_empty() {
        Ok(())
    } else {
        Err(ApiError::PartialFailure {
            endpoint: endpoint.to_string(),
            failed_ids,
        }
        .into())
    }
}

fn map_transport_error(error: ureq::Error, endpoint: &str) -> anyhow::Error {
    match error {
        ureq::Error::StatusCode(status) => ApiError::Status {
            status,
            endpoint: endpoint.to_string(),
        }
        .into(),
        other => anyhow::Error::new(other).context(format!("Failed to send {} request", endpoint)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_joins_base_and_endpoint() {
        let config = MailConfig::from_json(r#"{ "api_base_url": "https://api.example/" }"#).unwrap();
        let client = ApiClient::new(&config);
        assert_eq!(client.url("core/v4/labels"), "https://api.example/core/v4/labels");
    }

    #[test]
    fn test_request_without_session_fails() {
        let client = ApiClient::new(&MailConfig::default());
        let err = client.fetch_labels(&UserId::new("nobody")).unwrap_err();
        assert!(matches!(err.downcast_ref::<ApiError>(), Some(ApiError::NoSession(_))));
    }

    #[test]
    fn test_sessions_are_per_user() {
        let client = ApiClient::new(&MailConfig::default());
        let user = UserId::new("u1");
        client.set_session(
            user.clone(),
            Session {
                uid: "uid".to_string(),
                access_token: "token".to_string(),
            },
        );
        assert!(client.has_session(&user));
        assert!(!client.has_session(&UserId::new("u2")));

        client.remove_session(&user);
        assert!(!client.has_session(&user));
    }

    #[test]
    fn test_ensure_success_codes() {
        assert!(ensure_success(1000, "x").is_ok());
        assert!(ensure_success(1001, "x").is_ok());
        let err = ensure_success(2501, "x").unwrap_err();
        assert!(matches!(err.downcast_ref::<ApiError>(), Some(ApiError::Code { code: 2501, .. })));
    }

    #[test]
    fn test_multi_status_item_failures_are_reported() {
        let accepted: ActionResponse = serde_json::from_value(serde_json::json!({
            "Code": 1001,
            "Responses": [{ "ID": "m1", "Response": { "Code": 1000 } }]
        }))
        .unwrap();
        assert!(ensure_items_succeeded(&accepted, "x").is_ok());

        let partial: ActionResponse = serde_json::from_value(serde_json::json!({
            "Code": 1001,
            "Responses": [
                { "ID": "m1", "Response": { "Code": 1000 } },
                { "ID": "m2", "Response": { "Code": 2501, "Error": "Message does not exist" } }
            ]
        }))
        .unwrap();
        let err = ensure_items_succeeded(&partial, "mail/v4/messages/label").unwrap_err();
        match err.downcast_ref::<ApiError>() {
            Some(ApiError::PartialFailure { failed_ids, .. }) => assert_eq!(failed_ids, &vec!["m2".to_string()]),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_request_bodies_use_wire_names() {
        let body = label_ids_request("10", ["m1", "m2"].into_iter());
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json, serde_json::json!({ "LabelID": "10", "IDs": ["m1", "m2"] }));
    }
}
