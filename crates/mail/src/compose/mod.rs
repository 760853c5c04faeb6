//! Draft composition

mod save_draft;

pub use save_draft::{AddressCrypto, AddressCryptoFactory, CipherText, DraftError, SaveDraft};
