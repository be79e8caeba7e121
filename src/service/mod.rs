use crate::{
    error::{NoteError, StoreError},
    models::{LocalImage, Note, NoteFields, NoteId, PersistenceStatus, SaveNote},
    repository::DocumentStore,
    storage::BlobStore,
};

use std::sync::Arc;

/// Outcome of a [`NoteService::reconcile`] pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Notes that claimed an image and were checked.
    pub checked: usize,
    /// Notes whose image was missing and whose flag was cleared.
    pub repaired: Vec<NoteId>,
}

/// Note-level operations over a document store and a blob store.
///
/// Holds no state of its own: every read goes to the stores, so callers
/// always get a fresh snapshot.
#[derive(Clone)]
pub struct NoteService {
    documents: Arc<dyn DocumentStore>,
    blobs: Arc<dyn BlobStore>,
}

impl NoteService {
    pub fn new(documents: Arc<dyn DocumentStore>, blobs: Arc<dyn BlobStore>) -> Self {
        Self { documents, blobs }
    }

    pub async fn list(&self) -> Result<Vec<Note>, NoteError> {
        Ok(self.documents.read_all().await?)
    }

    pub async fn get(&self, id: &NoteId) -> Result<Option<Note>, NoteError> {
        Ok(self.documents.read(id).await?)
    }

    /// Writes the note document, then the photo if one was picked.
    ///
    /// The document goes first because a new note's id is the photo's key.
    /// If the upload fails the stored note keeps claiming an image; the
    /// error carries the persisted note and nothing is rolled back.
    pub async fn save(&self, request: SaveNote) -> Result<Note, NoteError> {
        if request.headline.is_empty() {
            return Err(NoteError::Validation("headline must not be empty".to_string()));
        }
        if matches!(request.image, Some(LocalImage::Stored)) {
            self.check_stored_image(request.id.as_ref()).await?;
        }

        let fields = NoteFields {
            headline: request.headline,
            body: request.body,
            has_image: request.image.is_some(),
        };

        let id = match request.id {
            Some(id) => {
                self.documents.update(&id, &fields).await?;
                tracing::info!(id = %id, has_image = fields.has_image, "note updated");
                id
            }
            None => {
                let id = self.documents.create(&fields).await?;
                tracing::info!(id = %id, has_image = fields.has_image, "note created");
                id
            }
        };

        let note = Note::from_document(id.clone(), fields);

        let upload = request
            .image
            .as_ref()
            .filter(|image| !matches!(image, LocalImage::Stored));
        if let Some(image) = upload {
            if let Err(source) = self.blobs.upload(image, &id).await {
                tracing::error!(id = %id, "image upload failed after note was saved: {}", source);
                return Err(NoteError::ImageUpload {
                    note: Box::new(note),
                    source,
                });
            }
        }

        Ok(note)
    }

    /// Locator of the note's photo, or `None` when there is none to show.
    ///
    /// A failed lookup is treated as "no image" so the note stays viewable.
    pub async fn load_image(&self, note: &Note) -> Option<String> {
        let PersistenceStatus::Persisted(id) = note.status() else {
            return None;
        };
        if !note.has_image {
            return None;
        }

        match self.blobs.download(id).await {
            Ok(url) => Some(url),
            Err(e) => {
                tracing::warn!(id = %id, "image unavailable: {}", e);
                None
            }
        }
    }

    /// Drops the note's photo. The returned note no longer claims an image;
    /// the document keeps its flag until the note is saved again.
    pub async fn discard_image(&self, note: &Note) -> Note {
        if let (true, PersistenceStatus::Persisted(id)) = (note.has_image, note.status()) {
            self.delete_image_best_effort(id).await;
        }

        Note {
            has_image: false,
            ..note.clone()
        }
    }

    /// Removes the photo (best effort) and the document. A draft has nothing to remove.
    pub async fn delete(&self, note: Note) -> Result<(), NoteError> {
        let PersistenceStatus::Persisted(id) = note.status() else {
            tracing::debug!("draft note has nothing to delete");
            return Ok(());
        };

        if note.has_image {
            self.delete_image_best_effort(id).await;
        }

        self.documents.delete(id).await?;
        tracing::info!(id = %id, "note deleted");

        Ok(())
    }

    /// Clears the image flag of every note whose photo is missing from the blob store.
    ///
    /// Notes whose photo lookup fails for any other reason are left alone.
    pub async fn reconcile(&self) -> Result<ReconcileReport, NoteError> {
        let mut report = ReconcileReport::default();

        for note in self.documents.read_all().await? {
            let Some(id) = note.id.clone().filter(|_| note.has_image) else {
                continue;
            };
            report.checked += 1;

            match self.blobs.download(&id).await {
                Ok(_) => continue,
                Err(e) if e.is_not_found() => {}
                Err(e) => {
                    tracing::warn!(id = %id, "skipping note, image lookup failed: {}", e);
                    continue;
                }
            }

            let fields = NoteFields {
                has_image: false,
                ..note.fields()
            };
            match self.documents.update(&id, &fields).await {
                Ok(()) => {
                    tracing::info!(id = %id, "cleared image flag of note without image");
                    report.repaired.push(id);
                }
                Err(StoreError::NotFound(_)) => {
                    tracing::debug!(id = %id, "note vanished during reconcile");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Ok(report)
    }

    /// Keeping a stored photo needs an existing note whose photo is present.
    async fn check_stored_image(&self, id: Option<&NoteId>) -> Result<(), NoteError> {
        let Some(id) = id else {
            return Err(NoteError::Validation(
                "a new note has no stored image to keep".to_string(),
            ));
        };

        match self.blobs.download(id).await {
            Ok(_) => Ok(()),
            Err(e) if e.is_not_found() => Err(NoteError::Validation(format!(
                "note {id} has no stored image to keep"
            ))),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete_image_best_effort(&self, id: &NoteId) {
        if let Err(e) = self.blobs.delete(id).await {
            tracing::warn!(id = %id, "failed to delete image: {}", e);
        }
    }
}
