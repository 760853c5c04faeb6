//! User and address identifiers

use serde::{Deserialize, Serialize};

/// Unique identifier for a logged-in user
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for UserId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Identifier of one of the user's sending addresses
///
/// Encryption keys are scoped to an address, so drafts must carry one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AddressId(pub String);

impl AddressId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for AddressId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for AddressId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}
