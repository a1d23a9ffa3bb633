//! Cache entries and the snapshots handed to consumers.

use serde::Serialize;

use lostnet_shared::error::ApiError;
use lostnet_shared::models::{Item, ItemRequest, User};

/// The payload cached under a query key.
///
/// One variant per key kind; screens pick the variant they asked for and
/// treat a mismatch as absent data.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub enum CachedValue {
    Items(Vec<Item>),
    Item(Item),
    User(User),
    Requests(Vec<ItemRequest>),
}

impl CachedValue {
    pub fn as_items(&self) -> Option<&[Item]> {
        match self {
            CachedValue::Items(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_item(&self) -> Option<&Item> {
        match self {
            CachedValue::Item(item) => Some(item),
            _ => None,
        }
    }

    pub fn as_user(&self) -> Option<&User> {
        match self {
            CachedValue::User(user) => Some(user),
            _ => None,
        }
    }

    pub fn as_requests(&self) -> Option<&[ItemRequest]> {
        match self {
            CachedValue::Requests(requests) => Some(requests),
            _ => None,
        }
    }
}

/// Snapshot of a cache entry as observed by a consumer.
///
/// `data` keeps its last-known value across staleness and failed reloads, so
/// screens can keep rendering while a refetch is pending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryState {
    pub data: Option<CachedValue>,
    pub is_loading: bool,
    pub error: Option<ApiError>,
}

impl QueryState {
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Internal per-key record.
#[derive(Debug, Default)]
pub(crate) struct CacheEntry {
    /// Last successfully loaded value.  Never cleared by invalidation or by
    /// a failed reload.
    pub data: Option<CachedValue>,
    /// Error from the most recent load, cleared by the next success.
    pub error: Option<ApiError>,
    /// Marked by invalidation: the value may be outdated and must be
    /// refetched on the next access.
    pub stale: bool,
    /// Whether any load ever completed successfully.
    pub loaded: bool,
    /// Monotone per-key sequence, bumped on every load start and every
    /// invalidation.  A finished load only applies while its sequence is
    /// still current.
    pub seq: u64,
    /// Sequence of the load currently in flight, if any.
    pub inflight: Option<u64>,
    /// Number of live watch handles on this key.
    pub subscribers: usize,
}

impl CacheEntry {
    /// Fresh entries are served without touching the loader.
    pub fn is_fresh(&self) -> bool {
        self.loaded && !self.stale && self.error.is_none()
    }

    pub fn snapshot(&self) -> QueryState {
        QueryState {
            data: self.data.clone(),
            is_loading: self.inflight.is_some(),
            error: self.error.clone(),
        }
    }
}
