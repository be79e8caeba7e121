use async_trait::async_trait;
use tokio::sync::RwLock;

use std::collections::HashMap;

use super::BlobStore;
use crate::error::StoreError;

/// Process-local blob store. Locators use the `memory://` scheme and are not fetchable.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    objects: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.objects.read().await.get(key).cloned()
    }

    pub async fn keys(&self) -> Vec<String> {
        self.objects.read().await.keys().cloned().collect()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, key: &str, data: Vec<u8>) -> Result<(), StoreError> {
        self.objects.write().await.insert(key.to_string(), data);
        Ok(())
    }

    async fn locate(&self, key: &str) -> Result<String, StoreError> {
        if self.objects.read().await.contains_key(key) {
            Ok(format!("memory://{key}"))
        } else {
            Err(StoreError::NotFound(format!("blob {key}")))
        }
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        match self.objects.write().await.remove(key) {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound(format!("blob {key}"))),
        }
    }
}
