use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, Path, State, multipart::MultipartError},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use axum_macros::debug_handler;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use std::sync::Arc;

use crate::{
    dto::{ErrorResponse, ImageResponse, NoteResponse, ReconcileResponse, SaveNoteForm},
    error::{NoteError, StoreError},
    models::{HEADLINE_MAX_CHARS, LocalImage, Note, NoteId, SaveNote},
    service::NoteService,
};

#[derive(OpenApi)]
#[openapi(
    paths(
        create_note,
        update_note,
        delete_note,
        get_one_note,
        get_all_notes,
        get_note_image,
        delete_note_image,
        reconcile
    ),
    components(schemas(
        NoteResponse,
        SaveNoteForm,
        ImageResponse,
        ReconcileResponse,
        ErrorResponse
    )),
    tags(
        (name = "notes", description = "Notes and their photos"),
        (name = "maintenance", description = "Consistency repair")
    )
)]
pub struct ApiDoc;

/// The HTTP API the mobile client talks to.
pub fn router(service: Arc<NoteService>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/notes", get(get_all_notes).post(create_note))
        .route(
            "/notes/{id}",
            get(get_one_note).put(update_note).delete(delete_note),
        )
        .route(
            "/notes/{id}/image",
            get(get_note_image).delete(delete_note_image),
        )
        .route("/maintenance/reconcile", post(reconcile))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .with_state(service)
        // Photos are stored as sent
        .layer(DefaultBodyLimit::disable())
        .layer(TraceLayer::new_for_http())
}

async fn root() -> Response {
    (StatusCode::OK, "Notebook is up").into_response()
}

fn error_body(status: StatusCode, error: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
            note: None,
        }),
    )
        .into_response()
}

fn note_not_found() -> Response {
    error_body(StatusCode::NOT_FOUND, "Note not found")
}

fn error_response(e: NoteError, action: &str) -> Response {
    match e {
        NoteError::Validation(reason) => error_body(StatusCode::BAD_REQUEST, reason),
        NoteError::ImageUpload { note, source } => {
            tracing::error!("failed to {}: image upload failed: {}", action, source);
            (
                StatusCode::BAD_GATEWAY,
                Json(ErrorResponse {
                    error: format!("Note saved but image upload failed: {source}"),
                    note: Some((*note).into()),
                }),
            )
                .into_response()
        }
        NoteError::Store(e) if e.is_not_found() => note_not_found(),
        NoteError::Store(e @ (StoreError::Transport(_) | StoreError::Remote { .. })) => {
            tracing::error!("failed to {}: {}", action, e);
            error_body(StatusCode::BAD_GATEWAY, format!("Failed to {action}"))
        }
        NoteError::Store(e) => {
            tracing::error!("failed to {}: {}", action, e);
            error_body(StatusCode::INTERNAL_SERVER_ERROR, format!("Failed to {action}"))
        }
    }
}

async fn read_form(id: Option<NoteId>, mut multipart: Multipart) -> Result<SaveNote, Response> {
    let mut headline = String::new();
    let mut body = String::new();
    let mut image = None;
    let mut keep_image = false;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        error_body(StatusCode::BAD_REQUEST, format!("Multipart error: {e}"))
    })? {
        let name = field.name().unwrap_or("").to_string();
        let invalid = |e: MultipartError| {
            error_body(StatusCode::BAD_REQUEST, format!("Failed to read field '{name}': {e}"))
        };

        match name.as_str() {
            "headline" => headline = field.text().await.map_err(invalid)?,
            "body" => body = field.text().await.map_err(invalid)?,
            "image" => {
                let data = field.bytes().await.map_err(invalid)?;
                if !data.is_empty() {
                    image = Some(LocalImage::Bytes(data.to_vec()));
                }
            }
            "keep_image" => {
                let flag = field.text().await.map_err(invalid)?;
                keep_image = matches!(flag.trim(), "true" | "1" | "on");
            }
            "image_url" => {
                return Err(error_body(
                    StatusCode::BAD_REQUEST,
                    "Image locators are not accepted, upload the image or set keep_image",
                ));
            }
            other => tracing::debug!("ignoring unknown form field '{}'", other),
        }
    }

    if headline.chars().count() > HEADLINE_MAX_CHARS {
        return Err(error_body(
            StatusCode::BAD_REQUEST,
            format!("Headline must be at most {HEADLINE_MAX_CHARS} characters"),
        ));
    }

    if keep_image {
        if id.is_none() {
            return Err(error_body(
                StatusCode::BAD_REQUEST,
                "keep_image only applies to an existing note",
            ));
        }
        if image.is_some() {
            return Err(error_body(
                StatusCode::BAD_REQUEST,
                "Send either an image or keep_image, not both",
            ));
        }
        image = Some(LocalImage::Stored);
    }

    Ok(SaveNote {
        id,
        headline,
        body,
        image,
    })
}

async fn find_note(service: &NoteService, id: String) -> Result<Note, Response> {
    match service.get(&NoteId::from(id)).await {
        Ok(Some(note)) => Ok(note),
        Ok(None) => Err(note_not_found()),
        Err(e) => Err(error_response(e, "get note")),
    }
}

#[utoipa::path(
    post,
    path = "/notes",
    request_body(content = SaveNoteForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Note created successfully", body = NoteResponse),
        (status = 400, description = "Invalid headline or form", body = ErrorResponse),
        (status = 502, description = "Note saved but image upload failed", body = ErrorResponse),
        (status = 500, description = "Internal server error")
    ),
    tag = "notes"
)]
#[debug_handler]
pub async fn create_note(
    State(service): State<Arc<NoteService>>,
    multipart: Multipart,
) -> Response {
    let request = match read_form(None, multipart).await {
        Ok(request) => request,
        Err(response) => return response,
    };

    match service.save(request).await {
        Ok(note) => (StatusCode::CREATED, Json(NoteResponse::from(note))).into_response(),
        Err(e) => error_response(e, "create note"),
    }
}

#[utoipa::path(
    put,
    path = "/notes/{id}",
    params(
        ("id" = String, Path, description = "Note ID")
    ),
    request_body(content = SaveNoteForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Note updated successfully", body = NoteResponse),
        (status = 400, description = "Invalid headline or form", body = ErrorResponse),
        (status = 404, description = "Note not found"),
        (status = 502, description = "Note saved but image upload failed", body = ErrorResponse),
        (status = 500, description = "Internal server error")
    ),
    tag = "notes"
)]
#[debug_handler]
pub async fn update_note(
    State(service): State<Arc<NoteService>>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Response {
    let request = match read_form(Some(NoteId::from(id.clone())), multipart).await {
        Ok(request) => request,
        Err(response) => return response,
    };

    if matches!(request.image, Some(LocalImage::Stored)) {
        if let Err(response) = find_note(&service, id).await {
            return response;
        }
    }

    match service.save(request).await {
        Ok(note) => (StatusCode::OK, Json(NoteResponse::from(note))).into_response(),
        Err(e) => error_response(e, "update note"),
    }
}

#[utoipa::path(
    delete,
    path = "/notes/{id}",
    params(
        ("id" = String, Path, description = "Note ID")
    ),
    responses(
        (status = 204, description = "Note and its image deleted"),
        (status = 404, description = "Note not found"),
        (status = 500, description = "Internal server error")
    ),
    tag = "notes"
)]
#[debug_handler]
pub async fn delete_note(
    State(service): State<Arc<NoteService>>,
    Path(id): Path<String>,
) -> Response {
    let note = match find_note(&service, id).await {
        Ok(note) => note,
        Err(response) => return response,
    };

    match service.delete(note).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response(e, "delete note"),
    }
}

#[utoipa::path(
    get,
    path = "/notes/{id}",
    params(
        ("id" = String, Path, description = "Note ID")
    ),
    responses(
        (status = 200, description = "Note found", body = NoteResponse),
        (status = 404, description = "Note not found"),
        (status = 500, description = "Internal server error")
    ),
    tag = "notes"
)]
#[debug_handler]
pub async fn get_one_note(
    State(service): State<Arc<NoteService>>,
    Path(id): Path<String>,
) -> Response {
    match find_note(&service, id).await {
        Ok(note) => (StatusCode::OK, Json(NoteResponse::from(note))).into_response(),
        Err(response) => response,
    }
}

#[utoipa::path(
    get,
    path = "/notes",
    responses(
        (status = 200, description = "List of all notes", body = Vec<NoteResponse>),
        (status = 500, description = "Internal server error")
    ),
    tag = "notes"
)]
#[debug_handler]
pub async fn get_all_notes(State(service): State<Arc<NoteService>>) -> Response {
    match service.list().await {
        Ok(notes) => {
            let notes: Vec<NoteResponse> = notes.into_iter().map(NoteResponse::from).collect();
            (StatusCode::OK, Json(notes)).into_response()
        }
        Err(e) => error_response(e, "get all notes"),
    }
}

#[utoipa::path(
    get,
    path = "/notes/{id}/image",
    params(
        ("id" = String, Path, description = "Note ID")
    ),
    responses(
        (status = 200, description = "Image locator, null when no image is available", body = ImageResponse),
        (status = 404, description = "Note not found"),
        (status = 500, description = "Internal server error")
    ),
    tag = "notes"
)]
#[debug_handler]
pub async fn get_note_image(
    State(service): State<Arc<NoteService>>,
    Path(id): Path<String>,
) -> Response {
    let note = match find_note(&service, id).await {
        Ok(note) => note,
        Err(response) => return response,
    };

    let url = service.load_image(&note).await;
    (StatusCode::OK, Json(ImageResponse { url })).into_response()
}

#[utoipa::path(
    delete,
    path = "/notes/{id}/image",
    params(
        ("id" = String, Path, description = "Note ID")
    ),
    responses(
        (status = 200, description = "Image removed, note saved without it", body = NoteResponse),
        (status = 404, description = "Note not found"),
        (status = 500, description = "Internal server error")
    ),
    tag = "notes"
)]
#[debug_handler]
pub async fn delete_note_image(
    State(service): State<Arc<NoteService>>,
    Path(id): Path<String>,
) -> Response {
    let note = match find_note(&service, id).await {
        Ok(note) => note,
        Err(response) => return response,
    };

    let note = service.discard_image(&note).await;
    let request = SaveNote {
        id: note.id,
        headline: note.headline,
        body: note.body,
        image: None,
    };

    match service.save(request).await {
        Ok(note) => (StatusCode::OK, Json(NoteResponse::from(note))).into_response(),
        Err(e) => error_response(e, "remove note image"),
    }
}

#[utoipa::path(
    post,
    path = "/maintenance/reconcile",
    responses(
        (status = 200, description = "Notes claiming a missing image were repaired", body = ReconcileResponse),
        (status = 500, description = "Internal server error")
    ),
    tag = "maintenance"
)]
#[debug_handler]
pub async fn reconcile(State(service): State<Arc<NoteService>>) -> Response {
    match service.reconcile().await {
        Ok(report) => (StatusCode::OK, Json(ReconcileResponse::from(report))).into_response(),
        Err(e) => error_response(e, "reconcile notes"),
    }
}
