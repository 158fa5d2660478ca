//! Stored credential for auto-reconnect.
//!
//! The key is kept as a small JSON document in the data directory and removed
//! again on an explicit disconnect.

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::info;

const FILE_NAME: &str = "credential.json";

#[derive(Debug, Serialize, Deserialize)]
struct StoredCredential {
    private_key: String,
    saved_at: DateTime<Utc>,
}

/// File-backed store for the wallet credential.
#[derive(Debug, Clone)]
pub struct KeyStore {
    path: PathBuf,
}

impl KeyStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store under the platform data directory.
    pub fn default_location() -> Result<Self> {
        Ok(Self::new(crate::config::data_dir()?.join(FILE_NAME)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn save(&self, private_key: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let credential = StoredCredential {
            private_key: private_key.to_string(),
            saved_at: Utc::now(),
        };
        let content = serde_json::to_vec_pretty(&credential)?;
        tokio::fs::write(&self.path, content).await?;
        restrict_permissions(&self.path).await?;
        info!("Stored wallet credential at {}", self.path.display());
        Ok(())
    }

    /// The stored key, if any.
    pub async fn load(&self) -> Result<Option<String>> {
        match tokio::fs::read(&self.path).await {
            Ok(content) => {
                let credential: StoredCredential = serde_json::from_slice(&content)?;
                Ok(Some(credential.private_key))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::Io(e)),
        }
    }

    /// Delete the stored key. A missing file is not an error.
    pub async fn remove(&self) -> Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {
                info!("Removed stored wallet credential");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::Io(e)),
        }
    }
}

#[cfg(unix)]
async fn restrict_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600)).await?;
    Ok(())
}

#[cfg(not(unix))]
async fn restrict_permissions(_path: &Path) -> Result<()> {
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn scratch_store() -> KeyStore {
        let dir = std::env::temp_dir().join(format!("notchbet-{}", uuid::Uuid::new_v4()));
        KeyStore::new(dir.join(FILE_NAME))
    }

    #[tokio::test]
    async fn test_save_load_remove() {
        let store = scratch_store();
        assert_eq!(store.load().await.unwrap(), None);

        store.save("ab".repeat(32).as_str()).await.unwrap();
        assert_eq!(store.load().await.unwrap(), Some("ab".repeat(32)));

        store.remove().await.unwrap();
        assert_eq!(store.load().await.unwrap(), None);
        // Removing twice is fine.
        tokio_test::assert_ok!(store.remove().await);
    }

    #[tokio::test]
    async fn test_corrupt_file_is_an_error() {
        let store = scratch_store();
        tokio::fs::create_dir_all(store.path().parent().unwrap())
            .await
            .unwrap();
        tokio::fs::write(store.path(), b"not json").await.unwrap();
        assert!(matches!(store.load().await, Err(Error::Serialization(_))));
    }
}
