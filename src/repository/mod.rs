mod embedded;
mod firestore;
mod memory;
mod postgres;

pub use firestore::FirestoreDocumentStore;
pub use memory::MemoryDocumentStore;
pub use postgres::PgDocumentStore;

use async_trait::async_trait;

use std::sync::Arc;

use crate::{
    config::DocumentStoreConfig,
    error::StoreError,
    models::{Note, NoteFields, NoteId},
};

/// Durable storage of note records in a single collection.
///
/// Every call is one remote round trip and is never retried.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Inserts a new document and returns the identifier the store assigned.
    async fn create(&self, fields: &NoteFields) -> Result<NoteId, StoreError>;

    /// Every document in the collection, in no particular order.
    async fn read_all(&self) -> Result<Vec<Note>, StoreError>;

    async fn read(&self, id: &NoteId) -> Result<Option<Note>, StoreError>;

    /// Overwrites all fields of an existing document.
    ///
    /// Fails with [`StoreError::NotFound`] when `id` does not exist.
    async fn update(&self, id: &NoteId, fields: &NoteFields) -> Result<(), StoreError>;

    /// Removes a document. Removing a missing document succeeds.
    async fn delete(&self, id: &NoteId) -> Result<(), StoreError>;
}

/// Opens the configured document store, running migrations where the backend has them.
pub async fn connect(config: &DocumentStoreConfig) -> Result<Arc<dyn DocumentStore>, StoreError> {
    match config {
        DocumentStoreConfig::Postgres { dsn } => {
            let mut repo = PgDocumentStore::new(dsn).await?;
            repo.migrate().await?;
            Ok(Arc::new(repo))
        }
        DocumentStoreConfig::Firestore {
            project_id,
            database,
            collection,
            endpoint,
            api_key,
            auth_token,
        } => {
            tracing::info!("Using Firestore project '{}' for notes", project_id);
            Ok(Arc::new(
                FirestoreDocumentStore::new(endpoint, project_id, database, collection)
                    .with_api_key(api_key.clone())
                    .with_auth_token(auth_token.clone()),
            ))
        }
        DocumentStoreConfig::Memory => {
            tracing::warn!("Using in-memory document store, notes are lost on restart");
            Ok(Arc::new(MemoryDocumentStore::new()))
        }
    }
}
