use thiserror::Error;

use crate::models::Note;

/// Failures of a single document store or blob store call.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("database error: {0}")]
    Database(#[from] tokio_postgres::Error),

    #[error("migration error: {0}")]
    Migration(#[from] refinery::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{service} responded with {status}: {body}")]
    Remote {
        service: &'static str,
        status: u16,
        body: String,
    },

    #[error("malformed document {id}: {reason}")]
    MalformedDocument { id: String, reason: String },

    #[error("invalid object key: {0}")]
    InvalidKey(String),

    #[error("unsupported image source: {0}")]
    UnsupportedSource(String),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound(_) => true,
            Self::Io(e) => matches!(e.kind(), std::io::ErrorKind::NotFound),
            _ => false,
        }
    }
}

/// Failures of a note-level operation.
#[derive(Debug, Error)]
pub enum NoteError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// The document was written but the photo never reached the blob store,
    /// so the stored note claims an image that does not exist.
    #[error("note saved but image upload failed: {source}")]
    ImageUpload {
        note: Box<Note>,
        #[source]
        source: StoreError,
    },
}

impl NoteError {
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Store(e) => e.is_not_found(),
            _ => false,
        }
    }
}
