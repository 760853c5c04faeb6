//! Query parameters for the messages listing endpoint

use super::MessagesResponse;
use crate::models::UserId;

/// Sort field for message listings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortBy {
    Time,
}

impl SortBy {
    pub fn as_str(self) -> &'static str {
        match self {
            SortBy::Time => "Time",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascendant,
    Descendant,
}

impl SortDirection {
    pub fn as_int(self) -> i32 {
        match self {
            SortDirection::Ascendant => 0,
            SortDirection::Descendant => 1,
        }
    }
}

/// Parameters for `GET mail/v4/messages`
///
/// Paging is done with bookmarks: `end`/`end_id` point at the oldest message
/// already received, so the next request continues from there.
#[derive(Debug, Clone, PartialEq)]
pub struct GetAllMessagesParameters {
    pub user_id: UserId,
    pub page: Option<u32>,
    pub page_size: u32,
    pub label_id: Option<String>,
    pub sort_by: SortBy,
    pub sort_direction: SortDirection,
    pub begin: Option<i64>,
    pub end: Option<i64>,
    pub begin_id: Option<String>,
    pub end_id: Option<String>,
    pub keyword: Option<String>,
}

impl GetAllMessagesParameters {
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            page: None,
            page_size: 50,
            label_id: None,
            sort_by: SortBy::Time,
            sort_direction: SortDirection::Descendant,
            begin: None,
            end: None,
            begin_id: None,
            end_id: None,
            keyword: None,
        }
    }

    pub fn with_label(mut self, label_id: impl Into<String>) -> Self {
        self.label_id = Some(label_id.into());
        self
    }

    pub fn with_keyword(mut self, keyword: impl Into<String>) -> Self {
        self.keyword = Some(keyword.into());
        self
    }

    /// Query string pairs; unset optional parameters are omitted
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(page) = self.page {
            pairs.push(("Page", page.to_string()));
        }
        pairs.push(("PageSize", self.page_size.to_string()));
        if let Some(label_id) = &self.label_id {
            pairs.push(("LabelID", label_id.clone()));
        }
        pairs.push(("Sort", self.sort_by.as_str().to_string()));
        pairs.push(("Desc", self.sort_direction.as_int().to_string()));
        if let Some(begin) = self.begin {
            pairs.push(("Begin", begin.to_string()));
        }
        if let Some(end) = self.end {
            pairs.push(("End", end.to_string()));
        }
        if let Some(begin_id) = &self.begin_id {
            pairs.push(("BeginID", begin_id.clone()));
        }
        if let Some(end_id) = &self.end_id {
            pairs.push(("EndID", end_id.clone()));
        }
        if let Some(keyword) = &self.keyword {
            pairs.push(("Keyword", keyword.clone()));
        }
        pairs
    }
}

impl MessagesResponse {
    /// Parameters for the page after this response
    ///
    /// Messages arrive sorted by time, so the last one is the bookmark. An
    /// empty response leaves `current` unchanged.
    pub fn bookmark_parameters_or(
        &self,
        current: &GetAllMessagesParameters,
    ) -> GetAllMessagesParameters {
        match self.messages.last() {
            Some(last) => GetAllMessagesParameters {
                end: Some(last.time),
                end_id: Some(last.id.clone()),
                ..current.clone()
            },
            None => current.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiMessage;

    fn api_message(id: &str, time: i64) -> ApiMessage {
        serde_json::from_value(serde_json::json!({
            "ID": id,
            "ConversationID": "c1",
            "Subject": "s",
            "Sender": { "Name": "", "Address": "a@proton.me" },
            "Time": time,
            "Unread": 0,
            "LabelIDs": ["0"]
        }))
        .unwrap()
    }

    #[test]
    fn test_default_query_pairs() {
        let params = GetAllMessagesParameters::new(UserId::new("u1"));
        assert_eq!(
            params.query_pairs(),
            vec![
                ("PageSize", "50".to_string()),
                ("Sort", "Time".to_string()),
                ("Desc", "1".to_string()),
            ]
        );
    }

    #[test]
    fn test_query_pairs_include_optional_filters() {
        let params = GetAllMessagesParameters::new(UserId::new("u1"))
            .with_label("6")
            .with_keyword("invoice");
        let pairs = params.query_pairs();
        assert!(pairs.contains(&("LabelID", "6".to_string())));
        assert!(pairs.contains(&("Keyword", "invoice".to_string())));
    }

    #[test]
    fn test_bookmark_uses_last_message() {
        let current = GetAllMessagesParameters::new(UserId::new("u1")).with_label("0");
        let response = MessagesResponse {
            code: 1000,
            total: 2,
            messages: vec![api_message("m1", 200), api_message("m2", 100)],
        };

        let next = response.bookmark_parameters_or(&current);
        assert_eq!(next.end, Some(100));
        assert_eq!(next.end_id.as_deref(), Some("m2"));
        assert_eq!(next.label_id.as_deref(), Some("0"));
    }

    #[test]
    fn test_bookmark_keeps_current_when_empty() {
        let current = GetAllMessagesParameters::new(UserId::new("u1"));
        let response = MessagesResponse {
            code: 1000,
            total: 0,
            messages: Vec::new(),
        };

        assert_eq!(response.bookmark_parameters_or(&current), current);
    }
}
