//! Label model shared by message labels, folders and contact groups

use serde::{Deserialize, Serialize};

use super::UserId;

/// Unique identifier for a label (server-assigned)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LabelId(pub String);

impl LabelId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for LabelId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for LabelId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Discriminator selecting which kind of entity a label row holds
///
/// All three kinds share one storage table; the integer value is used both
/// on the wire (`Type` field) and in the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LabelType {
    MessageLabel,
    ContactGroup,
    Folder,
}

impl LabelType {
    pub fn as_int(self) -> i32 {
        match self {
            LabelType::MessageLabel => 1,
            LabelType::ContactGroup => 2,
            LabelType::Folder => 3,
        }
    }

    pub fn from_int(value: i32) -> Option<Self> {
        match value {
            1 => Some(LabelType::MessageLabel),
            2 => Some(LabelType::ContactGroup),
            3 => Some(LabelType::Folder),
            _ => None,
        }
    }
}

/// A label, folder or contact group owned by a user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Label {
    /// Label ID
    pub id: LabelId,
    /// Owner of the label
    pub user_id: UserId,
    /// Display name
    pub name: String,
    /// Which kind of label this is
    pub label_type: LabelType,
    /// Hex color, e.g. "#7272a7"
    pub color: String,
    /// Display order within its kind
    pub order: i32,
    /// Slash-separated path for nested folders
    pub path: String,
    /// Parent folder, if nested
    pub parent_id: Option<LabelId>,
    pub notify: bool,
    pub expanded: bool,
    pub sticky: bool,
}

impl Label {
    /// Create a new label of the given type with default presentation fields
    pub fn new(
        id: impl Into<LabelId>,
        user_id: UserId,
        name: impl Into<String>,
        label_type: LabelType,
    ) -> Self {
        let name = name.into();
        Self {
            id: id.into(),
            user_id,
            path: name.clone(),
            name,
            label_type,
            color: String::new(),
            order: 0,
            parent_id: None,
            notify: false,
            expanded: false,
            sticky: false,
        }
    }

    /// Builder method to set the color
    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = color.into();
        self
    }

    /// Builder method to set the display order
    pub fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    /// Builder method to nest this label under a parent folder
    pub fn with_parent(mut self, parent_id: impl Into<LabelId>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    pub fn is_folder(&self) -> bool {
        self.label_type == LabelType::Folder
    }

    pub fn is_contact_group(&self) -> bool {
        self.label_type == LabelType::ContactGroup
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_type_int_mapping() {
        for label_type in [LabelType::MessageLabel, LabelType::ContactGroup, LabelType::Folder] {
            assert_eq!(LabelType::from_int(label_type.as_int()), Some(label_type));
        }
        assert_eq!(LabelType::from_int(0), None);
        assert_eq!(LabelType::from_int(4), None);
    }

    #[test]
    fn test_new_label_defaults_path_to_name() {
        let label = Label::new("l1", UserId::new("u1"), "Work", LabelType::Folder)
            .with_color("#ff0000")
            .with_order(2)
            .with_parent("l0");

        assert_eq!(label.path, "Work");
        assert_eq!(label.parent_id, Some(LabelId::new("l0")));
        assert!(label.is_folder());
        assert!(!label.is_contact_group());
    }
}
