use async_trait::async_trait;
use tokio::fs;
use tracing::{debug, info};

use std::path::{Component, Path, PathBuf};

use super::BlobStore;
use crate::error::StoreError;

/// Objects stored as plain files below a root directory.
#[derive(Debug, Clone)]
pub struct FilesystemBlobStore {
    root: PathBuf,
    public_base_url: Option<String>,
}

impl FilesystemBlobStore {
    pub async fn new(root: PathBuf, public_base_url: Option<String>) -> Result<Self, StoreError> {
        fs::create_dir_all(&root).await?;
        // Locators are absolute `file://` URLs
        let root = root.canonicalize()?;

        info!(path = %root.display(), "Blob store initialized");

        Ok(Self {
            root,
            public_base_url: public_base_url.map(|url| url.trim_end_matches('/').to_string()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolves `key` below the root, rejecting anything that could escape it.
    fn object_path(&self, key: &str) -> Result<PathBuf, StoreError> {
        let mut resolved = self.root.clone();
        for component in Path::new(key).components() {
            match component {
                Component::Normal(c) => resolved.push(c),
                _ => return Err(StoreError::InvalidKey(key.to_string())),
            }
        }
        if resolved == self.root {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        Ok(resolved)
    }
}

#[async_trait]
impl BlobStore for FilesystemBlobStore {
    async fn put(&self, key: &str, data: Vec<u8>) -> Result<(), StoreError> {
        let path = self.object_path(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        fs::write(&path, &data).await?;

        debug!(key = %key, size = data.len(), "Stored blob");
        Ok(())
    }

    async fn locate(&self, key: &str) -> Result<String, StoreError> {
        let path = self.object_path(key)?;

        if !fs::try_exists(&path).await? {
            return Err(StoreError::NotFound(format!("blob {key}")));
        }

        Ok(match &self.public_base_url {
            Some(base) => format!("{base}/{key}"),
            None => format!("file://{}", path.display()),
        })
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        let path = self.object_path(key)?;

        fs::remove_file(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StoreError::NotFound(format!("blob {key}"))
            } else {
                StoreError::Io(e)
            }
        })?;

        debug!(key = %key, "Deleted blob");
        Ok(())
    }
}
