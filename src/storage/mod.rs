mod filesystem;
mod firebase;
mod local;
mod memory;

pub use filesystem::FilesystemBlobStore;
pub use firebase::FirebaseBlobStore;
pub use memory::MemoryBlobStore;

use async_trait::async_trait;

use std::sync::Arc;

use crate::{
    config::BlobStoreConfig,
    error::StoreError,
    models::{LocalImage, NoteId},
};

/// Object key of the single image a note may carry.
pub fn image_key(id: &NoteId) -> String {
    format!("images/{id}.jpg")
}

/// Binary object storage, one JPEG per note.
///
/// Implementors provide the key-level primitives; the note-level operations
/// derive the key from the note id.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Writes `data` at `key`, replacing any existing object.
    async fn put(&self, key: &str, data: Vec<u8>) -> Result<(), StoreError>;

    /// A fetchable locator for the object at `key`.
    async fn locate(&self, key: &str) -> Result<String, StoreError>;

    async fn remove(&self, key: &str) -> Result<(), StoreError>;

    /// Reads the picked image and stores it as the note's photo.
    ///
    /// [`LocalImage::Stored`] writes nothing and only checks that the photo exists.
    async fn upload(&self, image: &LocalImage, id: &NoteId) -> Result<(), StoreError> {
        let key = image_key(id);
        if matches!(image, LocalImage::Stored) {
            self.locate(&key).await?;
            return Ok(());
        }

        let data = image.read_bytes().await?;
        tracing::debug!(key = %key, size = data.len(), "uploading image");
        self.put(&key, data).await
    }

    async fn download(&self, id: &NoteId) -> Result<String, StoreError> {
        self.locate(&image_key(id)).await
    }

    async fn delete(&self, id: &NoteId) -> Result<(), StoreError> {
        self.remove(&image_key(id)).await
    }
}

pub async fn connect(config: &BlobStoreConfig) -> Result<Arc<dyn BlobStore>, StoreError> {
    match config {
        BlobStoreConfig::Firebase {
            bucket,
            endpoint,
            auth_token,
        } => {
            tracing::info!("Using Firebase Storage bucket '{}' for images", bucket);
            Ok(Arc::new(
                FirebaseBlobStore::new(endpoint, bucket).with_auth_token(auth_token.clone()),
            ))
        }
        BlobStoreConfig::Filesystem {
            root,
            public_base_url,
        } => Ok(Arc::new(
            FilesystemBlobStore::new(root.clone(), public_base_url.clone()).await?,
        )),
        BlobStoreConfig::Memory => {
            tracing::warn!("Using in-memory blob store, images are lost on restart");
            Ok(Arc::new(MemoryBlobStore::new()))
        }
    }
}
