//! # lostnet-store
//!
//! Client-side state for the lostnet application: the keyed in-memory cache
//! every screen reads from, and the durable store holding the single bearer
//! credential.
//!
//! The cache is the only shared mutable state in the client core.  One
//! instance is constructed at process start and injected into whatever needs
//! it, so tests can build isolated instances.

pub mod cache;
pub mod credentials;
pub mod entry;
pub mod key;

mod error;

pub use cache::{CacheEvent, CacheStore, WatchHandle};
pub use credentials::CredentialStore;
pub use entry::{CachedValue, QueryState};
pub use error::StoreError;
pub use key::{KeyFamily, QueryKey};
