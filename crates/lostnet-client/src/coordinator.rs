//! Mutation coordination.
//!
//! Every write goes through [`MutationCoordinator::perform`]: the operation
//! commits server-side first, and only then are the dependent cache keys
//! invalidated, so a refetch triggered by the invalidation always observes
//! the mutation's effect or later.  A failed operation invalidates nothing —
//! the visible state stays exactly as it was before the attempt.

use std::future::Future;
use std::sync::Arc;

use tracing::{debug, warn};

use lostnet_shared::error::ApiError;
use lostnet_store::{CacheStore, QueryKey};

pub struct MutationCoordinator {
    store: Arc<CacheStore>,
}

impl MutationCoordinator {
    pub fn new(store: Arc<CacheStore>) -> Self {
        Self { store }
    }

    /// Run exactly one gateway write; on success, mark every dependent key
    /// stale.
    ///
    /// Invalidating a superset of the affected keys is safe; a subset is a
    /// stale-view bug, so callers pass the full dependent set for their
    /// operation.
    pub async fn perform<T, Fut>(
        &self,
        operation: Fut,
        dependent_keys: &[QueryKey],
    ) -> Result<T, ApiError>
    where
        Fut: Future<Output = Result<T, ApiError>>,
    {
        match operation.await {
            Ok(value) => {
                for key in dependent_keys {
                    self.store.invalidate(key);
                }
                debug!(
                    invalidated = dependent_keys.len(),
                    "Mutation committed, dependent keys marked stale"
                );
                Ok(value)
            }
            Err(err) => {
                warn!(error = %err, "Mutation failed, cache left untouched");
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use lostnet_shared::types::{ItemId, UserId};
    use lostnet_store::CachedValue;

    async fn prime(store: &CacheStore, key: &QueryKey) {
        store
            .get(key, || async { Ok(CachedValue::Items(vec![])) })
            .await;
    }

    #[tokio::test]
    async fn success_invalidates_every_dependent_key() {
        let store = Arc::new(CacheStore::new());
        let coordinator = MutationCoordinator::new(Arc::clone(&store));

        let keys = [
            QueryKey::Items,
            QueryKey::ItemById(ItemId::from("i1")),
            QueryKey::ItemsByUser(UserId::from("u1")),
        ];
        for key in &keys {
            prime(&store, key).await;
        }

        coordinator
            .perform(async { Ok::<_, ApiError>(()) }, &keys)
            .await
            .unwrap();

        // Every dependent key refetches on next access.
        let calls = Arc::new(AtomicUsize::new(0));
        for key in &keys {
            let calls = calls.clone();
            store
                .get(key, move || {
                    let calls = calls.clone();
                    async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        Ok(CachedValue::Items(vec![]))
                    }
                })
                .await;
        }
        assert_eq!(calls.load(Ordering::SeqCst), keys.len());
    }

    #[tokio::test]
    async fn failure_leaves_every_entry_untouched() {
        let store = Arc::new(CacheStore::new());
        let coordinator = MutationCoordinator::new(Arc::clone(&store));

        let keys = [QueryKey::Items, QueryKey::ItemById(ItemId::from("i1"))];
        for key in &keys {
            prime(&store, key).await;
        }
        let before: Vec<_> = keys.iter().map(|k| store.peek(k)).collect();

        let outcome = coordinator
            .perform(
                async { Err::<(), _>(ApiError::Network("connection reset".into())) },
                &keys,
            )
            .await;
        assert!(outcome.is_err());

        let after: Vec<_> = keys.iter().map(|k| store.peek(k)).collect();
        assert_eq!(before, after);

        // No refetch happens either: the entries are still fresh.
        let calls = Arc::new(AtomicUsize::new(0));
        for key in &keys {
            let calls = calls.clone();
            store
                .get(key, move || {
                    let calls = calls.clone();
                    async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        Ok(CachedValue::Items(vec![]))
                    }
                })
                .await;
        }
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
