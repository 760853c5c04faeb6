//! API response normalization
//!
//! Converts wire types into the local record shapes.

use anyhow::{Context, Result};
use chrono::{TimeZone, Utc};

use super::{ApiAddress, ApiLabel, ApiMessage};
use crate::models::{
    AddressId, ConversationId, EmailAddress, Label, LabelId, LabelType, Message, MessageId, UserId,
};

/// Map a remote label, folder or contact group to the local label record
pub fn normalize_label(api_label: ApiLabel, user_id: &UserId) -> Result<Label> {
    let label_type = LabelType::from_int(api_label.label_type)
        .with_context(|| format!("Unknown label type {} for label {}", api_label.label_type, api_label.id))?;

    let path = api_label
        .path
        .filter(|p| !p.is_empty())
        .unwrap_or_else(|| api_label.name.clone());

    Ok(Label {
        id: LabelId::new(api_label.id),
        user_id: user_id.clone(),
        name: api_label.name,
        label_type,
        color: api_label.color,
        order: api_label.order,
        path,
        parent_id: api_label
            .parent_id
            .filter(|p| !p.is_empty())
            .map(LabelId::new),
        notify: api_label.notify != 0,
        expanded: api_label.expanded != 0,
        sticky: api_label.sticky != 0,
    })
}

/// Map a remote message to the local message record
pub fn normalize_message(api_message: ApiMessage, user_id: &UserId) -> Message {
    let time = Utc
        .timestamp_opt(api_message.time, 0)
        .single()
        .unwrap_or_else(Utc::now);

    let mut builder = Message::builder(
        MessageId::new(api_message.id),
        ConversationId::new(api_message.conversation_id),
    )
    .user_id(user_id.clone())
    .subject(api_message.subject)
    .sender(to_address(api_message.sender))
    .to(api_message.to_list.into_iter().map(to_address).collect())
    .cc(api_message.cc_list.into_iter().map(to_address).collect())
    .time(time)
    .unread(api_message.unread != 0)
    .label_ids(api_message.label_ids);

    if let Some(address_id) = api_message.address_id {
        builder = builder.address_id(AddressId::new(address_id));
    }
    if let Some(header) = api_message.header {
        builder = builder.header(header);
    }
    if let Some(parsed) = api_message.parsed_headers {
        builder = builder.parsed_headers(parsed);
    }
    if let Some(body) = api_message.body {
        builder = builder.message_body(body);
    }

    builder.build()
}

fn to_address(address: ApiAddress) -> EmailAddress {
    if address.name.is_empty() {
        EmailAddress::new(address.address)
    } else {
        EmailAddress::with_name(address.name, address.address)
    }
}
