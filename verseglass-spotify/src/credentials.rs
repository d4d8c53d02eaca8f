//! Credential value type, shared handle, and file persistence.

use crate::error::AuthError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Access/refresh token pair. Expiry is opaque: the access token is used
/// until the remote rejects it, then refreshed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub access_token: String,
    pub refresh_token: String,
}

/// Shared read handle to the current credentials.
///
/// The token manager is the only writer and always replaces the whole value,
/// never individual fields, so readers observe a consistent pair.
pub type CredentialHandle = Arc<RwLock<Option<Credentials>>>;

/// JSON-file persistence for credentials.
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    #[must_use]
    pub const fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Load persisted credentials, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(&self) -> Result<Option<Credentials>, AuthError> {
        if !self.path.exists() {
            info!("No persisted credentials at {:?}", self.path);
            return Ok(None);
        }

        let content = fs::read_to_string(&self.path)?;
        let credentials: Credentials = serde_json::from_str(&content)?;
        info!("Loaded persisted credentials");
        Ok(Some(credentials))
    }

    /// Persist credentials, creating the parent directory if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save(&self, credentials: &Credentials) -> Result<(), AuthError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(credentials)?;
        fs::write(&self.path, content)?;
        debug!("Persisted credentials to {:?}", self.path);
        Ok(())
    }

    /// Remove persisted credentials.
    pub fn clear(&self) {
        if self.path.exists() {
            let _ = fs::remove_file(&self.path);
            info!("Cleared persisted credentials");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = CredentialStore::new(dir.path().join("creds.json"));
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_save_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = CredentialStore::new(dir.path().join("creds.json"));

        store
            .save(&Credentials {
                access_token: "access".to_string(),
                refresh_token: "refresh".to_string(),
            })
            .unwrap();

        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded.access_token, "access");
        assert_eq!(loaded.refresh_token, "refresh");
    }

    #[test]
    fn test_clear_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("creds.json");
        let store = CredentialStore::new(path.clone());

        store
            .save(&Credentials {
                access_token: "a".to_string(),
                refresh_token: "r".to_string(),
            })
            .unwrap();
        assert!(path.exists());

        store.clear();
        assert!(!path.exists());
        // Clearing twice is harmless
        store.clear();
    }

    #[test]
    fn test_load_corrupt_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("creds.json");
        fs::write(&path, "not json").unwrap();

        let store = CredentialStore::new(path);
        assert!(matches!(store.load(), Err(AuthError::Json(_))));
    }
}
