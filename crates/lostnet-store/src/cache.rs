//! The keyed in-memory cache every screen reads from.
//!
//! Entries follow a stale-while-revalidate protocol: `get` loads on first
//! access and after invalidation, invalidation marks an entry for refetch
//! without discarding its last-known value, and failed loads keep previous
//! data alongside the error.
//!
//! The store runs on a cooperative single-runtime model: the entry map is
//! guarded by a mutex that is never held across an await, and every load
//! re-checks the entry after resuming from I/O.  Loads are tagged with a
//! per-key monotone sequence; invalidation bumps the sequence, so a fetch
//! that was in flight when an invalidation happened is superseded and its
//! result discarded rather than applied over newer state.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::broadcast;
use tracing::{debug, warn};

use lostnet_shared::constants::DEFAULT_CACHE_CAPACITY;
use lostnet_shared::error::ApiError;

use crate::entry::{CacheEntry, CachedValue, QueryState};
use crate::key::{KeyFamily, QueryKey};

/// Change notification emitted by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheEvent {
    /// A load settled and the entry changed.
    Updated(QueryKey),
    /// The entry was marked stale; subscribers should refetch.
    Invalidated(QueryKey),
}

impl CacheEvent {
    pub fn key(&self) -> &QueryKey {
        match self {
            CacheEvent::Updated(key) | CacheEvent::Invalidated(key) => key,
        }
    }
}

type EntryMap = HashMap<QueryKey, CacheEntry>;

/// Process-wide query cache.
///
/// Constructed once at client start and shared behind an [`Arc`]; tests
/// build isolated instances.
pub struct CacheStore {
    entries: Arc<Mutex<EntryMap>>,
    events: broadcast::Sender<CacheEvent>,
    /// Upper bound on entries kept while they have no subscribers.
    capacity: usize,
}

enum Step {
    Return(QueryState),
    Wait,
    Load(u64),
}

impl CacheStore {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CACHE_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            events,
            capacity,
        }
    }

    fn lock_entries(&self) -> MutexGuard<'_, EntryMap> {
        // A panic while holding the lock leaves the map consistent (all
        // writes are single assignments), so recover instead of propagating
        // the poison.
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Read the entry for `key`, loading it if missing, stale, or failed.
    ///
    /// Concurrent calls for the same key share a single underlying load: the
    /// first caller runs `loader`, the rest wait on the change channel and
    /// observe the same outcome, success or failure.  `loader` may be
    /// invoked more than once by one call if its load is superseded by an
    /// invalidation mid-flight.
    pub async fn get<F, Fut>(&self, key: &QueryKey, loader: F) -> QueryState
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<CachedValue, ApiError>>,
    {
        let mut waited = false;
        loop {
            // Subscribe before inspecting so a load settling in between
            // cannot be missed.
            let mut events = self.events.subscribe();

            let step = {
                let mut entries = self.lock_entries();
                let entry = entries.entry(key.clone()).or_default();
                if entry.is_fresh() {
                    Step::Return(entry.snapshot())
                } else if entry.inflight.is_some() {
                    Step::Wait
                } else if waited && entry.error.is_some() && !entry.stale {
                    // The load this call waited on failed; share its outcome
                    // instead of firing a duplicate request.
                    Step::Return(entry.snapshot())
                } else {
                    entry.seq += 1;
                    entry.inflight = Some(entry.seq);
                    Step::Load(entry.seq)
                }
            };

            match step {
                Step::Return(state) => return state,
                Step::Wait => {
                    waited = true;
                    loop {
                        match events.recv().await {
                            Ok(event) if event.key() == key => break,
                            Ok(_) => continue,
                            // Lagged or closed: re-inspect the entry.
                            Err(_) => break,
                        }
                    }
                }
                Step::Load(my_seq) => {
                    let result = loader().await;

                    let settled = {
                        let mut entries = self.lock_entries();
                        let entry = entries.entry(key.clone()).or_default();
                        if entry.seq != my_seq {
                            // Superseded by an invalidation while in flight:
                            // the result may predate the mutation, so it is
                            // discarded and the load retried.
                            if entry.inflight == Some(my_seq) {
                                entry.inflight = None;
                            }
                            debug!(key = %key, seq = my_seq, "Discarding superseded load");
                            None
                        } else {
                            entry.inflight = None;
                            match result {
                                Ok(value) => {
                                    entry.data = Some(value);
                                    entry.error = None;
                                    entry.stale = false;
                                    entry.loaded = true;
                                    debug!(key = %key, seq = my_seq, "Cache entry updated");
                                }
                                Err(err) => {
                                    warn!(key = %key, error = %err, "Cache load failed");
                                    // The attempt consumed the staleness; no
                                    // automatic retry until the next get or
                                    // invalidation.
                                    entry.stale = false;
                                    entry.error = Some(err);
                                }
                            }
                            Some(entry.snapshot())
                        }
                    };

                    let _ = self.events.send(CacheEvent::Updated(key.clone()));

                    match settled {
                        Some(state) => {
                            self.evict_idle();
                            return state;
                        }
                        None => continue,
                    }
                }
            }
        }
    }

    /// Current state of `key` without triggering a load.
    pub fn peek(&self, key: &QueryKey) -> QueryState {
        let entries = self.lock_entries();
        entries
            .get(key)
            .map(CacheEntry::snapshot)
            .unwrap_or(QueryState {
                data: None,
                is_loading: false,
                error: None,
            })
    }

    /// Mark `key` stale: the last-known value stays readable, the next `get`
    /// refetches, and any load currently in flight is superseded.
    ///
    /// Idempotent and commutative, so dependent-key sets may be invalidated
    /// in any order.
    pub fn invalidate(&self, key: &QueryKey) {
        let notified = {
            let mut entries = self.lock_entries();
            match entries.get_mut(key) {
                Some(entry) => {
                    entry.stale = true;
                    entry.seq += 1;
                    debug!(key = %key, seq = entry.seq, "Cache entry invalidated");
                    true
                }
                // Never fetched; nothing to mark.
                None => false,
            }
        };
        if notified {
            let _ = self.events.send(CacheEvent::Invalidated(key.clone()));
        }
    }

    /// Invalidate every key matching `predicate`.
    pub fn invalidate_where<P>(&self, predicate: P)
    where
        P: Fn(&QueryKey) -> bool,
    {
        let matched: Vec<QueryKey> = {
            let mut entries = self.lock_entries();
            let mut matched = Vec::new();
            for (key, entry) in entries.iter_mut() {
                if predicate(key) {
                    entry.stale = true;
                    entry.seq += 1;
                    matched.push(key.clone());
                }
            }
            matched
        };
        for key in matched {
            debug!(key = %key, "Cache entry invalidated");
            let _ = self.events.send(CacheEvent::Invalidated(key));
        }
    }

    /// Invalidate every key of one family, e.g. all `items-by-user:<id>`
    /// entries in one call.
    pub fn invalidate_family(&self, family: KeyFamily) {
        self.invalidate_where(|key| key.family() == family);
    }

    /// Subscribe to changes affecting `key`.  The handle counts as a live
    /// subscriber until dropped, which protects the entry from idle
    /// eviction.
    pub fn watch(&self, key: &QueryKey) -> WatchHandle {
        {
            let mut entries = self.lock_entries();
            entries.entry(key.clone()).or_default().subscribers += 1;
        }
        WatchHandle {
            key: key.clone(),
            entries: Arc::clone(&self.entries),
            events: self.events.subscribe(),
        }
    }

    /// Drop zero-subscriber, settled entries while the table exceeds its
    /// capacity.  No TTL: an entry someone still watches is never evicted.
    pub fn evict_idle(&self) {
        let mut entries = self.lock_entries();
        if entries.len() <= self.capacity {
            return;
        }
        let excess = entries.len() - self.capacity;
        let idle: Vec<QueryKey> = entries
            .iter()
            .filter(|(_, entry)| entry.subscribers == 0 && entry.inflight.is_none())
            .map(|(key, _)| key.clone())
            .take(excess)
            .collect();
        for key in idle {
            debug!(key = %key, "Evicting idle cache entry");
            entries.remove(&key);
        }
    }

    #[cfg(test)]
    fn subscriber_count(&self, key: &QueryKey) -> usize {
        self.lock_entries()
            .get(key)
            .map(|entry| entry.subscribers)
            .unwrap_or(0)
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.lock_entries().len()
    }
}

impl Default for CacheStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Live subscription to one key's changes.
pub struct WatchHandle {
    key: QueryKey,
    entries: Arc<Mutex<EntryMap>>,
    events: broadcast::Receiver<CacheEvent>,
}

impl WatchHandle {
    /// Wait for the next change to the watched key.  Returns `None` once the
    /// store is gone.
    pub async fn changed(&mut self) -> Option<CacheEvent> {
        loop {
            match self.events.recv().await {
                Ok(event) if event.key() == &self.key => return Some(event),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    pub fn key(&self) -> &QueryKey {
        &self.key
    }
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(entry) = entries.get_mut(&self.key) {
            entry.subscribers = entry.subscribers.saturating_sub(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use chrono::Utc;
    use lostnet_shared::models::{Item, ItemStatus, UserRef};
    use lostnet_shared::types::{ItemId, UserId};

    fn item(id: &str, title: &str) -> Item {
        Item {
            id: ItemId::from(id),
            title: title.into(),
            description: "desc".into(),
            location: "loc".into(),
            image: None,
            date_of_found: Utc::now(),
            status: ItemStatus::Available,
            owner: UserRef::Id(UserId::from("u1")),
        }
    }

    fn counting_loader(
        calls: Arc<AtomicUsize>,
        delay: Duration,
    ) -> impl Fn() -> std::pin::Pin<Box<dyn Future<Output = Result<CachedValue, ApiError>>>> + Clone
    {
        move || {
            let calls = calls.clone();
            Box::pin(async move {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                Ok(CachedValue::Item(item("i1", &format!("v{n}"))))
            })
        }
    }

    #[tokio::test]
    async fn get_loads_once_and_serves_from_cache() {
        let store = CacheStore::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let key = QueryKey::ItemById(ItemId::from("i1"));
        let loader = counting_loader(calls.clone(), Duration::ZERO);

        let first = store.get(&key, loader.clone()).await;
        let second = store.get(&key, loader).await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(first.data, second.data);
        assert!(!second.is_loading);
        assert!(second.error.is_none());
    }

    #[tokio::test]
    async fn concurrent_gets_share_one_load() {
        let store = CacheStore::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let key = QueryKey::Items;
        let loader = counting_loader(calls.clone(), Duration::from_millis(10));

        let (a, b) = tokio::join!(store.get(&key, loader.clone()), store.get(&key, loader));

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(a.data.is_some());
        assert_eq!(a.data, b.data);
    }

    #[tokio::test]
    async fn invalidation_keeps_data_and_triggers_refetch() {
        let store = CacheStore::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let key = QueryKey::ItemById(ItemId::from("i1"));
        let loader = counting_loader(calls.clone(), Duration::ZERO);

        let first = store.get(&key, loader.clone()).await;
        store.invalidate(&key);

        // Before the refetch completes the previous value is still readable.
        let peeked = store.peek(&key);
        assert_eq!(peeked.data, first.data);
        assert!(peeked.error.is_none());

        let second = store.get(&key, loader).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_ne!(first.data, second.data);
    }

    #[tokio::test]
    async fn invalidating_an_unfetched_key_is_a_noop() {
        let store = CacheStore::new();
        store.invalidate(&QueryKey::CurrentUser);
        assert_eq!(store.len(), 0);
    }

    #[tokio::test]
    async fn failed_load_keeps_previous_data() {
        let store = CacheStore::new();
        let key = QueryKey::ItemById(ItemId::from("i1"));

        let first = store
            .get(&key, || async { Ok(CachedValue::Item(item("i1", "good"))) })
            .await;
        store.invalidate(&key);

        let failed = store
            .get(&key, || async {
                Err(ApiError::Network("connection reset".into()))
            })
            .await;

        assert_eq!(failed.data, first.data);
        assert!(matches!(failed.error, Some(ApiError::Network(_))));
    }

    #[tokio::test]
    async fn waiter_shares_the_failure_without_a_duplicate_load() {
        let store = CacheStore::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let key = QueryKey::Items;
        let loader = {
            let calls = calls.clone();
            move || {
                let calls = calls.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    Err::<CachedValue, _>(ApiError::Network("timeout".into()))
                }
            }
        };

        let (a, b) = tokio::join!(store.get(&key, loader.clone()), store.get(&key, loader));

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(a.is_error());
        assert!(b.is_error());

        // A later access is a fresh attempt and may retry.
        let retried = store
            .get(&key, || async { Ok(CachedValue::Items(vec![])) })
            .await;
        assert!(retried.error.is_none());
        assert!(retried.data.is_some());
    }

    #[tokio::test]
    async fn load_superseded_by_invalidation_is_discarded() {
        let store = Arc::new(CacheStore::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let key = QueryKey::ItemById(ItemId::from("i1"));

        // First load is slow so the invalidation lands mid-flight; the
        // retried load is instant.
        let loader = {
            let calls = calls.clone();
            move || {
                let calls = calls.clone();
                async move {
                    let n = calls.fetch_add(1, Ordering::SeqCst);
                    if n == 0 {
                        tokio::time::sleep(Duration::from_millis(50)).await;
                    }
                    Ok(CachedValue::Item(item("i1", &format!("v{n}"))))
                }
            }
        };

        let task = {
            let store = Arc::clone(&store);
            let key = key.clone();
            tokio::spawn(async move { store.get(&key, loader).await })
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        store.invalidate(&key);

        let state = task.await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        let loaded = state.data.as_ref().and_then(CachedValue::as_item).unwrap();
        assert_eq!(loaded.title, "v1");
    }

    #[tokio::test]
    async fn invalidate_family_marks_every_member() {
        let store = CacheStore::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let key_a = QueryKey::ItemsByUser(UserId::from("u1"));
        let key_b = QueryKey::ItemsByUser(UserId::from("u2"));
        let loader = counting_loader(calls.clone(), Duration::ZERO);

        store.get(&key_a, loader.clone()).await;
        store.get(&key_b, loader.clone()).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        store.invalidate_family(KeyFamily::ItemsByUser);

        store.get(&key_a, loader.clone()).await;
        store.get(&key_b, loader).await;
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn watch_observes_invalidation() {
        let store = CacheStore::new();
        let key = QueryKey::Items;
        store
            .get(&key, || async { Ok(CachedValue::Items(vec![])) })
            .await;

        let mut handle = store.watch(&key);
        assert_eq!(store.subscriber_count(&key), 1);

        store.invalidate(&key);
        let event = handle.changed().await;
        assert_eq!(event, Some(CacheEvent::Invalidated(key.clone())));

        drop(handle);
        assert_eq!(store.subscriber_count(&key), 0);
    }

    #[tokio::test]
    async fn idle_entries_are_evicted_watched_entries_survive() {
        let store = CacheStore::with_capacity(1);
        let idle = QueryKey::ItemById(ItemId::from("idle"));
        let watched = QueryKey::ItemById(ItemId::from("watched"));

        store
            .get(&idle, || async { Ok(CachedValue::Item(item("idle", "a"))) })
            .await;
        let _handle = store.watch(&watched);
        store
            .get(&watched, || async {
                Ok(CachedValue::Item(item("watched", "b")))
            })
            .await;

        assert!(store.peek(&idle).data.is_none());
        assert!(store.peek(&watched).data.is_some());
    }
}
