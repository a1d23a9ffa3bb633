//! Durable storage for the bearer credential.
//!
//! The client persists exactly one value: the token issued at login, kept
//! under a single well-known key.  Its presence or absence is the sole
//! signal the route guard and identity resolver act on.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;

use lostnet_shared::constants::CREDENTIAL_KEY;
use lostnet_shared::types::Credential;

use crate::error::{Result, StoreError};

/// File-backed credential store.
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    /// Open the default credential store.
    ///
    /// The credential file is placed in the platform-appropriate data
    /// directory, e.g. `~/.local/share/lostnet/accessToken` on Linux.
    pub fn new() -> Result<Self> {
        let project_dirs =
            ProjectDirs::from("com", "lostnet", "lostnet").ok_or(StoreError::NoDataDir)?;

        let data_dir = project_dirs.data_dir();
        std::fs::create_dir_all(data_dir)?;

        Ok(Self::open_at(&data_dir.join(CREDENTIAL_KEY)))
    }

    /// Open a credential store at an explicit path.  Useful for tests and
    /// custom directory layouts.
    pub fn open_at(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    /// Persist the credential, replacing any previous one.  Called at login.
    pub fn store(&self, credential: &Credential) -> Result<()> {
        std::fs::write(&self.path, credential.token())?;
        tracing::info!(path = %self.path.display(), "Credential stored");
        Ok(())
    }

    /// Read the stored credential, if any.
    pub fn load(&self) -> Result<Option<Credential>> {
        match std::fs::read_to_string(&self.path) {
            Ok(token) => {
                let token = token.trim();
                if token.is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(Credential::new(token)))
                }
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(StoreError::Io(err)),
        }
    }

    /// Remove the stored credential.  Called at logout; removing an absent
    /// credential is not an error.
    pub fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                tracing::info!(path = %self.path.display(), "Credential cleared");
                Ok(())
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(StoreError::Io(err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_load_clear_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = CredentialStore::open_at(&dir.path().join("accessToken"));

        assert!(store.load().unwrap().is_none());

        let credential = Credential::new("header.payload.signature");
        store.store(&credential).unwrap();
        assert_eq!(store.load().unwrap(), Some(credential));

        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn clearing_twice_is_fine() {
        let dir = tempfile::tempdir().unwrap();
        let store = CredentialStore::open_at(&dir.path().join("accessToken"));
        store.clear().unwrap();
        store.clear().unwrap();
    }

    #[test]
    fn blank_file_counts_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("accessToken");
        std::fs::write(&path, "  \n").unwrap();
        let store = CredentialStore::open_at(&path);
        assert!(store.load().unwrap().is_none());
    }
}
