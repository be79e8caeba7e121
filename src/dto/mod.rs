use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{models::Note, service::ReconcileReport};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NoteResponse {
    /// Note ID
    pub id: String,
    /// Note headline
    pub headline: String,
    /// Note body
    pub body: String,
    /// Whether a photo is attached
    pub has_image: bool,
}

impl From<Note> for NoteResponse {
    fn from(note: Note) -> Self {
        Self {
            id: note.id.map(|id| id.to_string()).unwrap_or_default(),
            headline: note.headline,
            body: note.body,
            has_image: note.has_image,
        }
    }
}

/// Multipart form accepted when creating or updating a note.
#[derive(Debug, ToSchema)]
#[allow(dead_code)]
pub struct SaveNoteForm {
    /// Note headline, 1 to 50 characters
    pub headline: String,
    /// Note body
    pub body: Option<String>,
    /// JPEG photo to attach
    #[schema(value_type = Option<String>, format = Binary)]
    pub image: Option<Vec<u8>>,
    /// On update, keep the photo already stored for this note
    pub keep_image: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ImageResponse {
    /// Fetchable image locator, null when the note has no image available
    pub url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReconcileResponse {
    /// Notes claiming an image that were checked
    pub checked: usize,
    /// IDs of notes whose missing image flag was cleared
    pub repaired: Vec<String>,
}

impl From<ReconcileReport> for ReconcileResponse {
    fn from(report: ReconcileReport) -> Self {
        Self {
            checked: report.checked,
            repaired: report.repaired.iter().map(ToString::to_string).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// What went wrong
    pub error: String,
    /// The note as stored, when it was saved despite the failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<NoteResponse>,
}
