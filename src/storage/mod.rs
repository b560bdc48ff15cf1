//! Payment proof object storage.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tracing::info;

use crate::error::StorageError;

pub const MAX_OBJECT_NAME_LEN: usize = 255;

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `bytes` under `name` and return a URL the admin can open.
    async fn put(&self, name: &str, bytes: &[u8]) -> Result<String, StorageError>;
}

/// Writes proofs into a local directory served under `public_base_url`.
pub struct LocalObjectStore {
    root: PathBuf,
    public_base_url: String,
}

impl LocalObjectStore {
    pub fn new(root: impl Into<PathBuf>, public_base_url: &str) -> Self {
        let public_base_url = public_base_url.trim_end_matches('/').to_string();
        assert!(
            !public_base_url.is_empty(),
            "Public base URL must be provided"
        );
        Self {
            root: root.into(),
            public_base_url,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn put(&self, name: &str, bytes: &[u8]) -> Result<String, StorageError> {
        validate_object_name(name)?;
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|err| StorageError::ObjectStore(format!("create {:?}: {err}", self.root)))?;

        let path = self.root.join(name);
        // create_new refuses to overwrite a proof that already exists
        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .map_err(|err| StorageError::ObjectStore(format!("open {name}: {err}")))?;
        file.write_all(bytes)
            .await
            .map_err(|err| StorageError::ObjectStore(format!("write {name}: {err}")))?;
        file.sync_all()
            .await
            .map_err(|err| StorageError::ObjectStore(format!("sync {name}: {err}")))?;

        info!("Stored payment proof {} ({} bytes)", name, bytes.len());
        Ok(format!("{}/{}", self.public_base_url, name))
    }
}

fn validate_object_name(name: &str) -> Result<(), StorageError> {
    if name.is_empty() || name.len() > MAX_OBJECT_NAME_LEN {
        return Err(StorageError::ObjectStore(format!(
            "object name must be 1..={MAX_OBJECT_NAME_LEN} bytes"
        )));
    }
    if name.contains(['/', '\\']) || name.starts_with('.') {
        return Err(StorageError::ObjectStore(format!(
            "object name '{name}' is not a plain file name"
        )));
    }
    Ok(())
}
