//! Cache query keys.
//!
//! Each fetched view is cached under the identity of the query that produced
//! it.  Keys are a tagged enum with structural equality rather than
//! concatenated strings, so `item:<id>` can never collide with a user key
//! that happens to share the text.

use lostnet_shared::types::{ItemId, UserId};

/// Identity of a cached query.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueryKey {
    /// All items visible on the home listing.
    Items,
    /// A single item detail view.
    ItemById(ItemId),
    /// The currently authenticated user's profile.
    CurrentUser,
    /// Items posted by one finder.
    ItemsByUser(UserId),
    /// Requests made against one item.
    RequestsByItem(ItemId),
    /// Requests made by one requester.
    RequestsByRequester(UserId),
}

/// The key's kind, used to invalidate a whole family of parameterised keys
/// in one call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyFamily {
    Items,
    ItemById,
    CurrentUser,
    ItemsByUser,
    RequestsByItem,
    RequestsByRequester,
}

impl QueryKey {
    pub fn family(&self) -> KeyFamily {
        match self {
            QueryKey::Items => KeyFamily::Items,
            QueryKey::ItemById(_) => KeyFamily::ItemById,
            QueryKey::CurrentUser => KeyFamily::CurrentUser,
            QueryKey::ItemsByUser(_) => KeyFamily::ItemsByUser,
            QueryKey::RequestsByItem(_) => KeyFamily::RequestsByItem,
            QueryKey::RequestsByRequester(_) => KeyFamily::RequestsByRequester,
        }
    }
}

impl std::fmt::Display for QueryKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueryKey::Items => write!(f, "items"),
            QueryKey::ItemById(id) => write!(f, "item:{id}"),
            QueryKey::CurrentUser => write!(f, "user"),
            QueryKey::ItemsByUser(id) => write!(f, "items-by-user:{id}"),
            QueryKey::RequestsByItem(id) => write!(f, "item-requests-by-item:{id}"),
            QueryKey::RequestsByRequester(id) => {
                write!(f, "item-requests-by-requester:{id}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_matches_wire_key_format() {
        assert_eq!(QueryKey::Items.to_string(), "items");
        assert_eq!(
            QueryKey::ItemById(ItemId::from("i1")).to_string(),
            "item:i1"
        );
        assert_eq!(QueryKey::CurrentUser.to_string(), "user");
        assert_eq!(
            QueryKey::RequestsByRequester(UserId::from("u9")).to_string(),
            "item-requests-by-requester:u9"
        );
    }

    #[test]
    fn structural_equality_distinguishes_parameters() {
        assert_ne!(
            QueryKey::ItemById(ItemId::from("a")),
            QueryKey::ItemById(ItemId::from("b"))
        );
        assert_eq!(
            QueryKey::ItemsByUser(UserId::from("u1")).family(),
            QueryKey::ItemsByUser(UserId::from("u2")).family()
        );
    }
}
