use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use std::collections::HashMap;

use super::DocumentStore;
use crate::{
    error::StoreError,
    models::{Note, NoteFields, NoteId},
};

/// Process-local document store. Contents vanish with the process.
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    documents: RwLock<HashMap<NoteId, NoteFields>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn create(&self, fields: &NoteFields) -> Result<NoteId, StoreError> {
        let id = NoteId::new(Uuid::new_v4().simple().to_string());
        self.documents
            .write()
            .await
            .insert(id.clone(), fields.clone());
        Ok(id)
    }

    async fn read_all(&self) -> Result<Vec<Note>, StoreError> {
        Ok(self
            .documents
            .read()
            .await
            .iter()
            .map(|(id, fields)| Note::from_document(id.clone(), fields.clone()))
            .collect())
    }

    async fn read(&self, id: &NoteId) -> Result<Option<Note>, StoreError> {
        Ok(self
            .documents
            .read()
            .await
            .get(id)
            .map(|fields| Note::from_document(id.clone(), fields.clone())))
    }

    async fn update(&self, id: &NoteId, fields: &NoteFields) -> Result<(), StoreError> {
        match self.documents.write().await.get_mut(id) {
            Some(stored) => {
                *stored = fields.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound(format!("note {id}"))),
        }
    }

    async fn delete(&self, id: &NoteId) -> Result<(), StoreError> {
        self.documents.write().await.remove(id);
        Ok(())
    }
}
