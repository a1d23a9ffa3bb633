//! # lostnet-client
//!
//! Client core for the lostnet lost-and-found exchange: identity extraction
//! from the stored bearer token, the typed gateway to the backend API, the
//! mutation coordinator that keeps cached views consistent after writes, and
//! the session/route-guard machinery screens mount behind.
//!
//! Screens read through [`App`]: queries resolve via the shared cache store
//! and mutations invalidate exactly the cache keys they may have affected.

pub mod app;
pub mod config;
pub mod coordinator;
pub mod gateway;
pub mod guard;
pub mod identity;
pub mod session;

use tracing_subscriber::{fmt, EnvFilter};

pub use app::App;
pub use config::ClientConfig;
pub use coordinator::MutationCoordinator;
pub use gateway::{HttpGateway, RemoteApi};
pub use guard::ScreenGate;
pub use identity::{resolve_identity, AuthIdentity};
pub use session::{AuthSession, AuthStatus};

/// Install the global tracing subscriber for a client process.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("lostnet_client=debug,lostnet_store=info,warn"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .init();
}
