//! Wire models for the lostnet backend.
//!
//! The backend stores MongoDB-style documents: ids arrive under `_id`, and
//! reference fields (`userId`, `itemId`, `requestedBy`) are either a bare id
//! string or a populated sub-document depending on the endpoint.  Every
//! struct derives `Serialize` and `Deserialize` so cached values can be
//! handed straight to the view layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{ItemId, RequestId, UserId};

// ---------------------------------------------------------------------------
// Item status
// ---------------------------------------------------------------------------

/// Lifecycle status of a found item.
///
/// `Available` is the initial state set at creation and the only state in
/// which requests may be created.  `Delivered` is terminal.  `Requested` is
/// carried for display; it is just as non-requestable as `Delivered`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ItemStatus {
    Available,
    Requested,
    Delivered,
}

impl ItemStatus {
    /// Whether a new request may be created against an item in this state.
    pub fn is_requestable(self) -> bool {
        matches!(self, ItemStatus::Available)
    }

    /// Whether this state admits no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, ItemStatus::Delivered)
    }
}

impl std::fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ItemStatus::Available => "Available",
            ItemStatus::Requested => "Requested",
            ItemStatus::Delivered => "Delivered",
        };
        write!(f, "{s}")
    }
}

// ---------------------------------------------------------------------------
// User
// ---------------------------------------------------------------------------

/// A user profile as returned by the backend.
///
/// Everything beyond the id is optional: registration only collects name,
/// email and password, the rest is filled in through profile updates.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id", alias = "id")]
    pub id: UserId,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    /// URL of the profile image blob, if one was uploaded.
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub present_address: Option<String>,
    #[serde(default)]
    pub permanent_address: Option<String>,
    #[serde(default)]
    pub date_of_birth: Option<String>,
    /// Guardian name; the backend spells the field `gurdianName`.
    #[serde(default, rename = "gurdianName")]
    pub guardian_name: Option<String>,
}

impl User {
    /// A profile carrying only the id, with every other field unset.
    pub fn with_id(id: UserId) -> Self {
        Self {
            id,
            first_name: None,
            last_name: None,
            email: None,
            image: None,
            role: None,
            present_address: None,
            permanent_address: None,
            date_of_birth: None,
            guardian_name: None,
        }
    }
}

/// Fields a user may change through a profile update.  Serialized as the
/// `data` part of the multipart update request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ProfileFields {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub present_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permanent_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<String>,
    #[serde(rename = "gurdianName", skip_serializing_if = "Option::is_none")]
    pub guardian_name: Option<String>,
}

// ---------------------------------------------------------------------------
// References
// ---------------------------------------------------------------------------

/// A user reference that may arrive populated or as a bare id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum UserRef {
    Profile(Box<User>),
    Id(UserId),
}

impl UserRef {
    pub fn id(&self) -> &UserId {
        match self {
            UserRef::Profile(user) => &user.id,
            UserRef::Id(id) => id,
        }
    }

    /// The embedded profile, when the endpoint populated it.
    pub fn profile(&self) -> Option<&User> {
        match self {
            UserRef::Profile(user) => Some(user),
            UserRef::Id(_) => None,
        }
    }
}

/// An item reference that may arrive populated or as a bare id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum ItemRef {
    Item(Box<Item>),
    Id(ItemId),
}

impl ItemRef {
    pub fn id(&self) -> &ItemId {
        match self {
            ItemRef::Item(item) => &item.id,
            ItemRef::Id(id) => id,
        }
    }

    pub fn item(&self) -> Option<&Item> {
        match self {
            ItemRef::Item(item) => Some(item),
            ItemRef::Id(_) => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Item
// ---------------------------------------------------------------------------

/// A found item posted by its finder.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    #[serde(rename = "_id", alias = "id")]
    pub id: ItemId,
    pub title: String,
    pub description: String,
    /// Free-text description of where the item was found.
    pub location: String,
    /// URL of the item photo, if one was uploaded.
    #[serde(default)]
    pub image: Option<String>,
    pub date_of_found: DateTime<Utc>,
    pub status: ItemStatus,
    /// The finder.  Detail endpoints populate the full profile, list
    /// endpoints may send only the id.
    #[serde(rename = "userId")]
    pub owner: UserRef,
}

impl Item {
    pub fn owner_id(&self) -> &UserId {
        self.owner.id()
    }
}

/// Form fields for reporting a found item, before the client attaches the
/// finder id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemDraft {
    pub title: String,
    pub description: String,
    pub location: String,
    pub date_of_found: DateTime<Utc>,
}

/// Fields submitted when reporting a found item.  Serialized as the `data`
/// part of the multipart create request; the backend sets `_id` and the
/// initial `Available` status.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NewItem {
    pub title: String,
    pub description: String,
    pub location: String,
    pub date_of_found: DateTime<Utc>,
    #[serde(rename = "userId")]
    pub owner_id: UserId,
}

impl NewItem {
    pub fn from_draft(draft: ItemDraft, owner_id: UserId) -> Self {
        Self {
            title: draft.title,
            description: draft.description,
            location: draft.location,
            date_of_found: draft.date_of_found,
            owner_id,
        }
    }
}

// ---------------------------------------------------------------------------
// Item request
// ---------------------------------------------------------------------------

/// A claim on a found item by a prospective owner.
///
/// Requests are immutable after creation; delivery is recorded on the item,
/// not here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ItemRequest {
    #[serde(rename = "_id", alias = "id")]
    pub id: RequestId,
    /// The requested item; populated in "my requests" listings.
    #[serde(rename = "itemId")]
    pub item: ItemRef,
    /// The requester; populated in per-item listings.
    pub requested_by: UserRef,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// An attached image for item or profile uploads: raw bytes plus the
/// metadata the multipart part carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub bytes: Vec<u8>,
    pub file_name: String,
    /// MIME type, e.g. `image/jpeg`.
    pub content_type: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_deserializes_with_bare_owner_id() {
        let json = r#"{
            "_id": "i1",
            "title": "Black umbrella",
            "description": "Left at the bus stop",
            "location": "Main St",
            "dateOfFound": "2025-11-02T09:30:00Z",
            "status": "Available",
            "userId": "u1"
        }"#;
        let item: Item = serde_json::from_str(json).unwrap();
        assert_eq!(item.id.as_str(), "i1");
        assert_eq!(item.owner_id().as_str(), "u1");
        assert!(item.owner.profile().is_none());
        assert_eq!(item.status, ItemStatus::Available);
    }

    #[test]
    fn item_deserializes_with_populated_owner() {
        let json = r#"{
            "_id": "i2",
            "title": "Wallet",
            "description": "Brown leather",
            "location": "Park",
            "dateOfFound": "2025-11-02T09:30:00Z",
            "status": "Delivered",
            "userId": {
                "_id": "u2",
                "firstName": "Ada",
                "lastName": "Lovelace",
                "email": "ada@example.com"
            }
        }"#;
        let item: Item = serde_json::from_str(json).unwrap();
        assert_eq!(item.owner_id().as_str(), "u2");
        let profile = item.owner.profile().unwrap();
        assert_eq!(profile.first_name.as_deref(), Some("Ada"));
        assert!(item.status.is_terminal());
    }

    #[test]
    fn request_deserializes_with_populated_item_and_requester() {
        let json = r#"{
            "_id": "r1",
            "itemId": {
                "_id": "i1",
                "title": "Keys",
                "description": "Three keys on a ring",
                "location": "Library",
                "dateOfFound": "2025-11-02T09:30:00Z",
                "status": "Available",
                "userId": "u1"
            },
            "requestedBy": { "_id": "u2", "firstName": "Ada" }
        }"#;
        let req: ItemRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.item.id().as_str(), "i1");
        assert_eq!(req.requested_by.id().as_str(), "u2");
    }

    #[test]
    fn guardian_field_keeps_backend_spelling() {
        let fields = ProfileFields {
            guardian_name: Some("June".into()),
            ..Default::default()
        };
        let json = serde_json::to_string(&fields).unwrap();
        assert!(json.contains("\"gurdianName\":\"June\""));
    }

    #[test]
    fn only_available_is_requestable() {
        assert!(ItemStatus::Available.is_requestable());
        assert!(!ItemStatus::Requested.is_requestable());
        assert!(!ItemStatus::Delivered.is_requestable());
    }
}
