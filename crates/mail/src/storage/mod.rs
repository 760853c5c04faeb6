//! Storage traits and implementations
//!
//! This module defines the storage abstraction layer for labels and
//! messages. The trait-based design allows swapping between in-memory and
//! persistent storage implementations.

mod memory;
mod sqlite;
mod traits;
mod watch;

pub use memory::InMemoryMailStore;
pub use sqlite::SqliteMailStore;
pub use traits::{LabelStore, MessageStore};
