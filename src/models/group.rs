//! Group and profile records.

use serde::{Deserialize, Serialize};

/// Identifier of the public group every user belongs to.
pub const PUBLIC_GROUP: &str = "__world__";

/// A group as returned by the server.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Group {
    pub fn is_public(&self) -> bool {
        self.id == PUBLIC_GROUP
    }
}

/// Payload for creating a private group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewGroup {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl NewGroup {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
        }
    }
}

/// Partial group update. At least one field must be set.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GroupUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl GroupUpdate {
    pub fn name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            description: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none()
    }
}

/// Profile of the authenticated user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    /// `acct:username@authority`, or None for anonymous requests.
    #[serde(default)]
    pub userid: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_update_serializes_only_set_fields() {
        let update = GroupUpdate::name("Renamed");
        assert_eq!(
            serde_json::to_value(&update).unwrap(),
            serde_json::json!({"name": "Renamed"})
        );
        assert!(GroupUpdate::default().is_empty());
    }

    #[test]
    fn test_public_group() {
        let group: Group =
            serde_json::from_str(r#"{"id": "__world__", "name": "Public", "public": true}"#)
                .unwrap();
        assert!(group.is_public());
        assert_eq!(group.extra["public"], true);
    }
}
