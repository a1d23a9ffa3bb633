//! # lostnet-shared
//!
//! Types shared across the lostnet client core: wire models for the
//! lost-and-found backend, typed identifiers, the error taxonomy every layer
//! reports through, and the item lifecycle rules the client mirrors from the
//! server.

pub mod constants;
pub mod error;
pub mod lifecycle;
pub mod models;
pub mod types;

pub use error::{ApiError, Severity};
pub use models::{Item, ItemRequest, ItemStatus, User};
pub use types::{Credential, ItemId, RequestId, UserId};
