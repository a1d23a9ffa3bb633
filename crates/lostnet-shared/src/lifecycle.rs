//! Item lifecycle rules.
//!
//! `Available → Delivered` is the only client-initiated transition; request
//! creation is legal only while the item is `Available`.  The backend
//! enforces the same rules authoritatively — these checks exist so the
//! client can gate UI affordances and reject doomed operations before any
//! network call is made.

use crate::error::ApiError;
use crate::models::{Item, ItemStatus};
use crate::types::UserId;

/// Check that a request may be created against `item`.
///
/// Fails with [`ApiError::Conflict`] for any non-`Available` status; the
/// caller must still handle the same failure from the backend, which remains
/// the source of truth.
pub fn ensure_requestable(item: &Item) -> Result<(), ApiError> {
    if item.status.is_requestable() {
        Ok(())
    } else {
        Err(ApiError::Conflict(format!(
            "item is {} and cannot be requested",
            item.status
        )))
    }
}

/// Check that `viewer` may hand over `item`.
///
/// Only the finder may mark an item delivered, and marking an already
/// delivered item again is rejected here rather than sent to the network
/// (the resulting `Conflict` carries informational severity).
pub fn ensure_hand_over(item: &Item, viewer: &UserId) -> Result<(), ApiError> {
    if item.owner_id() != viewer {
        return Err(ApiError::Unauthorized(
            "only the finder can hand over this item".into(),
        ));
    }
    if item.status == ItemStatus::Delivered {
        return Err(ApiError::Conflict("item was already handed over".into()));
    }
    Ok(())
}

/// Whether `from → to` is a transition the model admits at all.
///
/// `Delivered` is terminal; `Requested` can still be delivered but can never
/// become `Available` again.
pub fn transition_allowed(from: ItemStatus, to: ItemStatus) -> bool {
    match (from, to) {
        (ItemStatus::Available, ItemStatus::Requested) => true,
        (ItemStatus::Available, ItemStatus::Delivered) => true,
        (ItemStatus::Requested, ItemStatus::Delivered) => true,
        _ => false,
    }
}
