//! The client facade screens talk to.
//!
//! [`App`] owns the cache store, the gateway, and the session.  Queries
//! resolve through the cache under their [`QueryKey`]; mutations run through
//! the coordinator with the fixed set of dependent keys each operation may
//! have affected.  Every mutation helper applies the client-side legality
//! checks first — identity present, owner matches, status permits — so a
//! doomed request never reaches the network.

use std::sync::{Arc, Mutex, MutexGuard};

use lostnet_shared::error::ApiError;
use lostnet_shared::lifecycle;
use lostnet_shared::models::{
    ImageUpload, Item, ItemDraft, ItemRequest, ItemStatus, NewItem, ProfileFields, User,
};
use lostnet_shared::types::{Credential, ItemId, UserId};
use lostnet_store::{CacheStore, CachedValue, CredentialStore, QueryKey, QueryState, WatchHandle};

use crate::coordinator::MutationCoordinator;
use crate::gateway::RemoteApi;
use crate::guard::{self, ScreenGate};
use crate::identity::AuthIdentity;
use crate::session::AuthSession;

pub struct App<G> {
    gateway: Arc<G>,
    store: Arc<CacheStore>,
    coordinator: MutationCoordinator,
    session: Mutex<AuthSession>,
}

impl<G: RemoteApi> App<G> {
    pub fn new(gateway: G, credentials: CredentialStore) -> Self {
        let store = Arc::new(CacheStore::new());
        Self {
            gateway: Arc::new(gateway),
            coordinator: MutationCoordinator::new(Arc::clone(&store)),
            store,
            session: Mutex::new(AuthSession::new(credentials)),
        }
    }

    pub fn store(&self) -> &Arc<CacheStore> {
        &self.store
    }

    /// Subscribe to changes of one cached query.
    pub fn watch(&self, key: &QueryKey) -> WatchHandle {
        self.store.watch(key)
    }

    fn lock_session(&self) -> MutexGuard<'_, AuthSession> {
        self.session
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn require_identity(&self) -> Result<AuthIdentity, ApiError> {
        self.lock_session()
            .identity()
            .cloned()
            .ok_or(ApiError::Unauthenticated)
    }

    fn require_credential(&self) -> Result<Credential, ApiError> {
        self.lock_session()
            .credential()
            .cloned()
            .ok_or(ApiError::Unauthenticated)
    }

    // -----------------------------------------------------------------
    // Session
    // -----------------------------------------------------------------

    /// Resolve the stored credential.  Called once at client start, before
    /// the first protected screen mounts.
    pub fn restore_session(&self) {
        self.lock_session().load();
    }

    /// Gate a protected screen on the current session state.
    pub fn gate(&self) -> ScreenGate {
        guard::decide(&self.lock_session())
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<AuthIdentity, ApiError> {
        let credential = self.gateway.login(email, password).await?;
        self.lock_session().establish(credential)
    }

    pub async fn register(
        &self,
        first_name: &str,
        last_name: &str,
        email: &str,
        password: &str,
    ) -> Result<(), ApiError> {
        self.gateway
            .register(first_name, last_name, email, password)
            .await
    }

    pub fn logout(&self) -> Result<(), ApiError> {
        self.lock_session().logout()?;
        // The cached profile belongs to the signed-out user.
        self.store.invalidate(&QueryKey::CurrentUser);
        Ok(())
    }

    // -----------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------

    /// All items currently available, for the home listing.
    pub async fn items(&self) -> QueryState {
        let gateway = Arc::clone(&self.gateway);
        self.store
            .get(&QueryKey::Items, move || {
                let gateway = Arc::clone(&gateway);
                async move { gateway.list_items().await.map(CachedValue::Items) }
            })
            .await
    }

    /// One item's detail view.
    pub async fn item(&self, id: &ItemId) -> QueryState {
        let key = QueryKey::ItemById(id.clone());
        let gateway = Arc::clone(&self.gateway);
        let id = id.clone();
        self.store
            .get(&key, move || {
                let gateway = Arc::clone(&gateway);
                let id = id.clone();
                async move { gateway.get_item(&id).await.map(CachedValue::Item) }
            })
            .await
    }

    /// The authenticated user's profile.  Without an identity this reports
    /// [`ApiError::Unauthenticated`] and touches neither cache nor network.
    pub async fn current_user(&self) -> QueryState {
        let identity = match self.require_identity() {
            Ok(identity) => identity,
            Err(err) => {
                return QueryState {
                    data: None,
                    is_loading: false,
                    error: Some(err),
                }
            }
        };
        let gateway = Arc::clone(&self.gateway);
        self.store
            .get(&QueryKey::CurrentUser, move || {
                let gateway = Arc::clone(&gateway);
                let user_id = identity.user_id.clone();
                async move { gateway.get_user(&user_id).await.map(CachedValue::User) }
            })
            .await
    }

    /// Items one finder has posted.
    pub async fn items_by_user(&self, user_id: &UserId) -> QueryState {
        let key = QueryKey::ItemsByUser(user_id.clone());
        let gateway = Arc::clone(&self.gateway);
        let user_id = user_id.clone();
        self.store
            .get(&key, move || {
                let gateway = Arc::clone(&gateway);
                let user_id = user_id.clone();
                async move {
                    gateway
                        .list_items_by_user(&user_id)
                        .await
                        .map(CachedValue::Items)
                }
            })
            .await
    }

    /// Who wants this item, requester profiles included.
    pub async fn requests_for_item(&self, item_id: &ItemId) -> QueryState {
        let key = QueryKey::RequestsByItem(item_id.clone());
        let gateway = Arc::clone(&self.gateway);
        let item_id = item_id.clone();
        self.store
            .get(&key, move || {
                let gateway = Arc::clone(&gateway);
                let item_id = item_id.clone();
                async move {
                    gateway
                        .list_requests_for_item(&item_id)
                        .await
                        .map(CachedValue::Requests)
                }
            })
            .await
    }

    /// The authenticated user's own requests.
    pub async fn my_requests(&self) -> QueryState {
        let identity = match self.require_identity() {
            Ok(identity) => identity,
            Err(err) => {
                return QueryState {
                    data: None,
                    is_loading: false,
                    error: Some(err),
                }
            }
        };
        let key = QueryKey::RequestsByRequester(identity.user_id.clone());
        let gateway = Arc::clone(&self.gateway);
        self.store
            .get(&key, move || {
                let gateway = Arc::clone(&gateway);
                let user_id = identity.user_id.clone();
                async move {
                    gateway
                        .list_requests_by_requester(&user_id)
                        .await
                        .map(CachedValue::Requests)
                }
            })
            .await
    }

    // -----------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------

    /// Report a found item.  Invalidates the home listing and the finder's
    /// own listing.
    pub async fn report_found_item(
        &self,
        draft: ItemDraft,
        image: Option<ImageUpload>,
    ) -> Result<Item, ApiError> {
        let identity = self.require_identity()?;
        let credential = self.require_credential()?;

        let new_item = NewItem::from_draft(draft, identity.user_id.clone());
        let keys = [
            QueryKey::Items,
            QueryKey::ItemsByUser(identity.user_id.clone()),
        ];
        let gateway = Arc::clone(&self.gateway);
        self.coordinator
            .perform(
                async move {
                    gateway
                        .create_item(&new_item, image.as_ref(), &credential)
                        .await
                },
                &keys,
            )
            .await
    }

    /// Request an available item for the authenticated user.
    ///
    /// The status pre-check runs against the (possibly cached) item as an
    /// optimization; the backend's own check stays authoritative and its
    /// `Conflict` must still be handled by the caller.
    pub async fn request_item(&self, item_id: &ItemId) -> Result<ItemRequest, ApiError> {
        let identity = self.require_identity()?;
        let credential = self.require_credential()?;

        let state = self.item(item_id).await;
        if let Some(item) = state.data.as_ref().and_then(CachedValue::as_item) {
            lifecycle::ensure_requestable(item)?;
        }

        let keys = [
            QueryKey::RequestsByItem(item_id.clone()),
            QueryKey::RequestsByRequester(identity.user_id.clone()),
        ];
        let gateway = Arc::clone(&self.gateway);
        let item_id = item_id.clone();
        let requester = identity.user_id.clone();
        self.coordinator
            .perform(
                async move {
                    gateway
                        .create_request(&item_id, &requester, &credential)
                        .await
                },
                &keys,
            )
            .await
    }

    /// Mark an item as handed over to its requester.
    ///
    /// Only offered to (and accepted from) the item's owner; handing over an
    /// already delivered item is rejected here with an informational
    /// `Conflict` instead of reaching the network.
    pub async fn hand_over_item(&self, item_id: &ItemId) -> Result<Item, ApiError> {
        let identity = self.require_identity()?;
        let credential = self.require_credential()?;

        let state = self.item(item_id).await;
        let item = match state.data.as_ref().and_then(CachedValue::as_item) {
            Some(item) => item.clone(),
            None => {
                return Err(state
                    .error
                    .unwrap_or_else(|| ApiError::NotFound("item not found".into())))
            }
        };
        lifecycle::ensure_hand_over(&item, &identity.user_id)?;

        let keys = [
            QueryKey::ItemById(item_id.clone()),
            QueryKey::Items,
            QueryKey::ItemsByUser(item.owner_id().clone()),
        ];
        let gateway = Arc::clone(&self.gateway);
        let item_id = item_id.clone();
        self.coordinator
            .perform(
                async move {
                    gateway
                        .set_item_status(&item_id, ItemStatus::Delivered, &credential)
                        .await
                },
                &keys,
            )
            .await
    }

    /// Delete one of the authenticated user's own items.
    pub async fn delete_item(&self, item_id: &ItemId) -> Result<(), ApiError> {
        let identity = self.require_identity()?;
        let credential = self.require_credential()?;

        let keys = [
            QueryKey::Items,
            QueryKey::ItemById(item_id.clone()),
            QueryKey::ItemsByUser(identity.user_id.clone()),
        ];
        let gateway = Arc::clone(&self.gateway);
        let item_id = item_id.clone();
        self.coordinator
            .perform(
                async move { gateway.delete_item(&item_id, &credential).await },
                &keys,
            )
            .await
    }

    /// Update the authenticated user's profile.  Item listings embed owner
    /// display fields, so they are invalidated along with the profile.
    pub async fn update_profile(
        &self,
        fields: ProfileFields,
        image: Option<ImageUpload>,
    ) -> Result<User, ApiError> {
        let identity = self.require_identity()?;
        let credential = self.require_credential()?;

        let keys = [QueryKey::CurrentUser, QueryKey::Items];
        let gateway = Arc::clone(&self.gateway);
        self.coordinator
            .perform(
                async move {
                    gateway
                        .update_user_profile(&identity.user_id, &fields, image.as_ref(), &credential)
                        .await
                },
                &keys,
            )
            .await
    }
}
