//! Encrypt a draft body and persist the draft locally

use anyhow::{Context, Result};
use log::debug;
use std::sync::Arc;

use crate::models::{AddressId, Message};
use crate::storage::MessageStore;

/// Encrypted output of [`AddressCrypto::encrypt`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CipherText {
    armored: String,
}

impl CipherText {
    pub fn new(armored: impl Into<String>) -> Self {
        Self {
            armored: armored.into(),
        }
    }

    /// ASCII-armored form
    pub fn armored(&self) -> &str {
        &self.armored
    }

    pub fn into_armored(self) -> String {
        self.armored
    }
}

/// Encryption with the keys of one sending address
pub trait AddressCrypto: Send + Sync {
    fn encrypt(&self, text: &str, armored: bool) -> Result<CipherText>;
}

/// Creates an [`AddressCrypto`] scoped to an address
pub trait AddressCryptoFactory: Send + Sync {
    fn create(&self, address_id: &AddressId) -> Result<Box<dyn AddressCrypto>>;
}

#[derive(Debug, thiserror::Error)]
pub enum DraftError {
    #[error("Draft {0} has no sending address")]
    MissingAddressId(String),
}

/// Saves drafts with an encrypted body
///
/// Works offline: nothing is sent to the server here.
pub struct SaveDraft {
    crypto_factory: Arc<dyn AddressCryptoFactory>,
    store: Arc<dyn MessageStore>,
}

impl SaveDraft {
    pub fn new(crypto_factory: Arc<dyn AddressCryptoFactory>, store: Arc<dyn MessageStore>) -> Self {
        Self {
            crypto_factory,
            store,
        }
    }

    /// Encrypt the plaintext body for the draft's address and store it
    ///
    /// Fails with [`DraftError::MissingAddressId`] before touching crypto or
    /// storage when the draft has no address. A missing plaintext body is
    /// encrypted as the empty string.
    pub fn save(&self, mut message: Message) -> Result<Message> {
        let address_id = message
            .address_id
            .clone()
            .ok_or_else(|| DraftError::MissingAddressId(message.id.as_str().to_string()))?;

        let crypto = self
            .crypto_factory
            .create(&address_id)
            .with_context(|| format!("No crypto for address {}", address_id.as_str()))?;
        let body = message.decrypted_body.as_deref().unwrap_or("");
        let encrypted = crypto
            .encrypt(body, true)
            .context("Failed to encrypt draft body")?;

        message.message_body = Some(encrypted.into_armored());
        self.store.save_message(message.clone())?;

        debug!("Saved draft {} locally", message.id.as_str());
        Ok(message)
    }
}
