//! Authenticated session state.
//!
//! The session owns the durable credential store and resolves the stored
//! token into an identity exactly once at startup.  Until that resolution
//! completes the session reports [`AuthStatus::Pending`], which the route
//! guard renders as a loading placeholder — protected content never shows
//! before the check finishes.

use tracing::{info, warn};

use lostnet_shared::error::ApiError;
use lostnet_shared::types::Credential;
use lostnet_store::{CredentialStore, StoreError};

use crate::identity::{resolve_identity, AuthIdentity};

/// Resolution state of the stored credential.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthStatus {
    /// The stored credential has not been read yet.
    Pending,
    /// No credential, or one that does not decode to an identity.
    Anonymous,
    Authenticated(AuthIdentity),
}

pub struct AuthSession {
    credentials: CredentialStore,
    status: AuthStatus,
    credential: Option<Credential>,
}

impl AuthSession {
    /// A session that has not yet looked at durable storage.
    pub fn new(credentials: CredentialStore) -> Self {
        Self {
            credentials,
            status: AuthStatus::Pending,
            credential: None,
        }
    }

    /// Read the stored credential and resolve it.  Called once at client
    /// start; a corrupt or absent credential leaves the session anonymous,
    /// never panics.
    pub fn load(&mut self) -> &AuthStatus {
        match self.credentials.load() {
            Ok(Some(credential)) => match resolve_identity(&credential) {
                Some(identity) => {
                    info!(user = %identity.user_id, "Session restored from stored credential");
                    self.credential = Some(credential);
                    self.status = AuthStatus::Authenticated(identity);
                }
                None => {
                    warn!("Stored credential is not decodable, treating as anonymous");
                    self.credential = None;
                    self.status = AuthStatus::Anonymous;
                }
            },
            Ok(None) => {
                self.credential = None;
                self.status = AuthStatus::Anonymous;
            }
            Err(err) => {
                warn!(error = %err, "Failed to read stored credential");
                self.credential = None;
                self.status = AuthStatus::Anonymous;
            }
        }
        &self.status
    }

    /// Persist a freshly issued credential and adopt its identity.  Called
    /// after a successful login.
    pub fn establish(&mut self, credential: Credential) -> Result<AuthIdentity, ApiError> {
        let identity = resolve_identity(&credential).ok_or(ApiError::Unauthenticated)?;
        self.credentials
            .store(&credential)
            .map_err(storage_error)?;

        info!(user = %identity.user_id, "Session established");
        self.credential = Some(credential);
        self.status = AuthStatus::Authenticated(identity.clone());
        Ok(identity)
    }

    /// Clear the stored credential and return to anonymous.
    pub fn logout(&mut self) -> Result<(), ApiError> {
        self.credentials.clear().map_err(storage_error)?;
        self.credential = None;
        self.status = AuthStatus::Anonymous;
        info!("Session cleared");
        Ok(())
    }

    pub fn status(&self) -> &AuthStatus {
        &self.status
    }

    pub fn identity(&self) -> Option<&AuthIdentity> {
        match &self.status {
            AuthStatus::Authenticated(identity) => Some(identity),
            _ => None,
        }
    }

    pub fn credential(&self) -> Option<&Credential> {
        self.credential.as_ref()
    }
}

/// Local persistence failures are not part of the wire taxonomy; surface
/// them as retryable client-side faults.
fn storage_error(err: StoreError) -> ApiError {
    ApiError::Protocol(format!("credential storage failed: {err}"))
}
