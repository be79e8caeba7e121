use serde::{Deserialize, Serialize};

use std::{fmt, path::PathBuf};

/// Longest headline the input layer accepts, in characters.
pub const HEADLINE_MAX_CHARS: usize = 50;

/// Store-assigned, opaque note identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoteId(String);

impl NoteId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for NoteId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for NoteId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl AsRef<str> for NoteId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// The mutable part of a note, as written to the document store.
///
/// Stored documents are loosely typed: records written before `hasImage`
/// existed, or by other clients, read back with defaults for missing fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NoteFields {
    pub headline: String,
    pub body: String,
    pub has_image: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistenceStatus<'a> {
    /// Exists only in the editor, nothing was written remotely.
    Draft,
    /// Backed by the document with this id.
    Persisted(&'a NoteId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Note {
    pub id: Option<NoteId>,
    pub headline: String,
    pub body: String,
    pub has_image: bool,
}

impl Note {
    pub fn draft(headline: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            id: None,
            headline: headline.into(),
            body: body.into(),
            has_image: false,
        }
    }

    pub fn from_document(id: NoteId, fields: NoteFields) -> Self {
        Self {
            id: Some(id),
            headline: fields.headline,
            body: fields.body,
            has_image: fields.has_image,
        }
    }

    pub const fn status(&self) -> PersistenceStatus<'_> {
        match &self.id {
            Some(id) => PersistenceStatus::Persisted(id),
            None => PersistenceStatus::Draft,
        }
    }

    pub fn fields(&self) -> NoteFields {
        NoteFields {
            headline: self.headline.clone(),
            body: self.body.clone(),
            has_image: self.has_image,
        }
    }
}

/// Where the bytes of a photo picked in the editor come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalImage {
    /// A file on the local filesystem (camera or gallery result).
    Path(PathBuf),
    /// Bytes already in memory, e.g. a multipart upload.
    Bytes(Vec<u8>),
    /// A `file://` or `http(s)://` locator, read by the calling process.
    /// Never built from HTTP input.
    Url(String),
    /// The photo already stored under the note's own key, kept as is.
    Stored,
}

/// Input of [`crate::service::NoteService::save`].
#[derive(Debug, Clone)]
pub struct SaveNote {
    /// `None` creates a new note, `Some` overwrites an existing one.
    pub id: Option<NoteId>,
    pub headline: String,
    pub body: String,
    pub image: Option<LocalImage>,
}

impl SaveNote {
    pub fn new(headline: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            id: None,
            headline: headline.into(),
            body: body.into(),
            image: None,
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: NoteId) -> Self {
        self.id = Some(id);
        self
    }

    #[must_use]
    pub fn with_image(mut self, image: LocalImage) -> Self {
        self.image = Some(image);
        self
    }
}
