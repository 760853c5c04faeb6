//! Message model and the address type it carries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{AddressId, ConversationId, MessageLocation, UserId};

/// Unique identifier for a message
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

impl MessageId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for MessageId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for MessageId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// An email address with optional display name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailAddress {
    pub name: Option<String>,
    pub email: String,
}

impl EmailAddress {
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            name: None,
            email: email.into(),
        }
    }

    pub fn with_name(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            email: email.into(),
        }
    }

    /// Parse "Name <address>" or a bare address
    pub fn parse(s: &str) -> Self {
        let s = s.trim();

        if let Some(open) = s.rfind('<')
            && let Some(close) = s.rfind('>')
            && open < close
        {
            let name = s[..open].trim().trim_matches('"');
            return Self {
                name: (!name.is_empty()).then(|| name.to_string()),
                email: s[open + 1..close].trim().to_string(),
            };
        }

        Self::new(s)
    }

    pub fn display(&self) -> String {
        match &self.name {
            Some(name) => format!("{} <{}>", name, self.email),
            None => self.email.clone(),
        }
    }
}

/// Server-parsed security headers of a received message
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedHeaders {
    #[serde(rename = "X-Pm-Recipient-Encryption", default)]
    pub recipient_encryption: Option<String>,
    #[serde(rename = "X-Pm-Recipient-Authentication", default)]
    pub recipient_authentication: Option<String>,
}

/// A single message, either received or a local draft
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub conversation_id: ConversationId,
    pub user_id: UserId,
    /// Sending address; required for drafts since it scopes the encryption keys
    pub address_id: Option<AddressId>,
    pub subject: String,
    pub sender: EmailAddress,
    pub to: Vec<EmailAddress>,
    pub cc: Vec<EmailAddress>,
    pub time: DateTime<Utc>,
    pub unread: bool,
    /// Label IDs, including system location IDs ("0" for inbox, ...)
    pub label_ids: Vec<String>,
    /// Raw MIME headers, when downloaded
    pub header: Option<String>,
    pub parsed_headers: Option<ParsedHeaders>,
    /// Armored, encrypted body as stored on the server
    pub message_body: Option<String>,
    /// Plaintext body; only ever held in memory and in drafts being edited
    #[serde(skip)]
    pub decrypted_body: Option<String>,
}

impl Message {
    pub fn builder(id: impl Into<MessageId>, conversation_id: impl Into<ConversationId>) -> MessageBuilder {
        MessageBuilder::new(id.into(), conversation_id.into())
    }

    /// Label IDs that are user labels or folders, without system locations
    pub fn label_ids_not_including_locations(&self) -> Vec<String> {
        self.label_ids
            .iter()
            .filter(|id| !MessageLocation::is_location_label_id(id))
            .cloned()
            .collect()
    }

    pub fn has_label(&self, label_id: &str) -> bool {
        self.label_ids.iter().any(|l| l == label_id)
    }

    pub fn is_starred(&self) -> bool {
        self.has_label(&MessageLocation::Starred.id_string())
    }
}

/// Builder for creating Message instances
pub struct MessageBuilder {
    id: MessageId,
    conversation_id: ConversationId,
    user_id: UserId,
    address_id: Option<AddressId>,
    subject: String,
    sender: Option<EmailAddress>,
    to: Vec<EmailAddress>,
    cc: Vec<EmailAddress>,
    time: Option<DateTime<Utc>>,
    unread: bool,
    label_ids: Vec<String>,
    header: Option<String>,
    parsed_headers: Option<ParsedHeaders>,
    message_body: Option<String>,
    decrypted_body: Option<String>,
}

impl MessageBuilder {
    fn new(id: MessageId, conversation_id: ConversationId) -> Self {
        Self {
            id,
            conversation_id,
            user_id: UserId::new(""),
            address_id: None,
            subject: String::new(),
            sender: None,
            to: Vec::new(),
            cc: Vec::new(),
            time: None,
            unread: false,
            label_ids: Vec::new(),
            header: None,
            parsed_headers: None,
            message_body: None,
            decrypted_body: None,
        }
    }

    pub fn user_id(mut self, user_id: UserId) -> Self {
        self.user_id = user_id;
        self
    }

    pub fn address_id(mut self, address_id: AddressId) -> Self {
        self.address_id = Some(address_id);
        self
    }

    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    pub fn sender(mut self, sender: EmailAddress) -> Self {
        self.sender = Some(sender);
        self
    }

    pub fn to(mut self, to: Vec<EmailAddress>) -> Self {
        self.to = to;
        self
    }

    pub fn cc(mut self, cc: Vec<EmailAddress>) -> Self {
        self.cc = cc;
        self
    }

    pub fn time(mut self, time: DateTime<Utc>) -> Self {
        self.time = Some(time);
        self
    }

    pub fn unread(mut self, unread: bool) -> Self {
        self.unread = unread;
        self
    }

    pub fn label_ids(mut self, label_ids: Vec<String>) -> Self {
        self.label_ids = label_ids;
        self
    }

    pub fn header(mut self, header: impl Into<String>) -> Self {
        self.header = Some(header.into());
        self
    }

    pub fn parsed_headers(mut self, parsed_headers: ParsedHeaders) -> Self {
        self.parsed_headers = Some(parsed_headers);
        self
    }

    pub fn message_body(mut self, body: impl Into<String>) -> Self {
        self.message_body = Some(body.into());
        self
    }

    pub fn decrypted_body(mut self, body: impl Into<String>) -> Self {
        self.decrypted_body = Some(body.into());
        self
    }

    pub fn build(self) -> Message {
        Message {
            id: self.id,
            conversation_id: self.conversation_id,
            user_id: self.user_id,
            address_id: self.address_id,
            subject: self.subject,
            sender: self.sender.unwrap_or_else(|| EmailAddress::new("")),
            to: self.to,
            cc: self.cc,
            time: self.time.unwrap_or_else(Utc::now),
            unread: self.unread,
            label_ids: self.label_ids,
            header: self.header,
            parsed_headers: self.parsed_headers,
            message_body: self.message_body,
            decrypted_body: self.decrypted_body,
        }
    }
}
