//! Domain models for mail entities

mod conversation;
mod label;
mod location;
mod message;
mod user;

pub use conversation::ConversationId;
pub use label::{Label, LabelId, LabelType};
pub use location::MessageLocation;
pub use message::{EmailAddress, Message, MessageBuilder, MessageId, ParsedHeaders};
pub use user::{AddressId, UserId};
