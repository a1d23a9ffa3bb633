//! Route guarding for protected screens.
//!
//! Evaluated on every protected screen mount.  The loading placeholder is
//! the first and only thing shown until credential resolution finishes;
//! anonymous sessions are redirected to login instead of seeing protected
//! content.

use crate::identity::AuthIdentity;
use crate::session::{AuthSession, AuthStatus};

/// What a protected screen should do on mount.
#[derive(Debug, Clone, PartialEq)]
pub enum ScreenGate {
    /// Identity resolution still pending; render a loading placeholder.
    Loading,
    /// No identity; navigate to the login screen.
    RedirectToLogin,
    Admit(AuthIdentity),
}

/// Gate a protected screen on the session's resolution state.
pub fn decide(session: &AuthSession) -> ScreenGate {
    match session.status() {
        AuthStatus::Pending => ScreenGate::Loading,
        AuthStatus::Anonymous => ScreenGate::RedirectToLogin,
        AuthStatus::Authenticated(identity) => ScreenGate::Admit(identity.clone()),
    }
}
