mod common;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, Query, RawQuery, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use serde_json::{Value, json};

use std::{
    collections::{BTreeMap, HashMap},
    sync::{Arc, Mutex},
};

use notebook::{
    LocalImage, NoteId, NoteService, SaveNote, StoreError,
    models::NoteFields,
    repository::{DocumentStore, FirestoreDocumentStore},
    storage::{BlobStore, FirebaseBlobStore},
};

const PAGE_SIZE: usize = 2;

// =============================================================================
// Fake Firestore and Firebase Storage REST endpoints
// =============================================================================

#[derive(Default)]
struct FakeFirebase {
    documents: BTreeMap<String, Value>,
    next_id: u32,
    objects: HashMap<String, Vec<u8>>,
    api_keys: Vec<Option<String>>,
    authorizations: Vec<Option<String>>,
}

type Shared = Arc<Mutex<FakeFirebase>>;

fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({"error": {"code": 404, "status": "NOT_FOUND"}})),
    )
        .into_response()
}

fn document_json(prefix: &str, id: &str, fields: &Value) -> Value {
    json!({
        "name": format!("{prefix}/{id}"),
        "fields": fields,
        "createTime": "2024-01-01T00:00:00Z"
    })
}

fn prefix(project: &str, database: &str, collection: &str) -> String {
    format!("projects/{project}/databases/{database}/documents/{collection}")
}

async fn create_document(
    State(fake): State<Shared>,
    Path((project, database, collection)): Path<(String, String, String)>,
    Query(query): Query<HashMap<String, String>>,
    Json(body): Json<Value>,
) -> Response {
    let mut fake = fake.lock().unwrap();
    fake.api_keys.push(query.get("key").cloned());
    fake.next_id += 1;

    let id = format!("doc{}", fake.next_id);
    let fields = body["fields"].clone();
    fake.documents.insert(id.clone(), fields.clone());

    Json(document_json(&prefix(&project, &database, &collection), &id, &fields)).into_response()
}

async fn list_documents(
    State(fake): State<Shared>,
    Path((project, database, collection)): Path<(String, String, String)>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    if collection == "unavailable" {
        return (StatusCode::SERVICE_UNAVAILABLE, "backend unavailable").into_response();
    }

    let fake = fake.lock().unwrap();
    let prefix = prefix(&project, &database, &collection);
    let offset: usize = query
        .get("pageToken")
        .and_then(|token| token.parse().ok())
        .unwrap_or(0);

    let documents: Vec<Value> = fake
        .documents
        .iter()
        .skip(offset)
        .take(PAGE_SIZE)
        .map(|(id, fields)| document_json(&prefix, id, fields))
        .collect();

    if documents.is_empty() {
        return Json(json!({})).into_response();
    }

    let mut page = json!({ "documents": documents });
    if offset + PAGE_SIZE < fake.documents.len() {
        page["nextPageToken"] = json!((offset + PAGE_SIZE).to_string());
    }
    Json(page).into_response()
}

async fn get_document(
    State(fake): State<Shared>,
    Path((project, database, collection, id)): Path<(String, String, String, String)>,
) -> Response {
    let fake = fake.lock().unwrap();
    match fake.documents.get(&id) {
        Some(fields) => {
            Json(document_json(&prefix(&project, &database, &collection), &id, fields))
                .into_response()
        }
        None => not_found(),
    }
}

async fn patch_document(
    State(fake): State<Shared>,
    Path((project, database, collection, id)): Path<(String, String, String, String)>,
    RawQuery(query): RawQuery,
    Json(body): Json<Value>,
) -> Response {
    let mut fake = fake.lock().unwrap();
    let must_exist = query
        .as_deref()
        .is_some_and(|q| q.contains("currentDocument.exists=true"));

    if must_exist && !fake.documents.contains_key(&id) {
        return not_found();
    }

    let fields = body["fields"].clone();
    fake.documents.insert(id.clone(), fields.clone());
    Json(document_json(&prefix(&project, &database, &collection), &id, &fields)).into_response()
}

async fn delete_document(
    State(fake): State<Shared>,
    Path((_, _, _, id)): Path<(String, String, String, String)>,
) -> Response {
    fake.lock().unwrap().documents.remove(&id);
    Json(json!({})).into_response()
}

async fn upload_object(
    State(fake): State<Shared>,
    Path(bucket): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok());
    if query.get("uploadType").map(String::as_str) != Some("media")
        || content_type != Some("image/jpeg")
    {
        return (StatusCode::BAD_REQUEST, "unexpected upload").into_response();
    }
    let Some(name) = query.get("name").cloned() else {
        return (StatusCode::BAD_REQUEST, "missing name").into_response();
    };

    let mut fake = fake.lock().unwrap();
    fake.authorizations.push(
        headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
    );
    fake.objects.insert(name.clone(), body.to_vec());

    Json(json!({"name": name, "bucket": bucket, "downloadTokens": "tok-1"})).into_response()
}

async fn object_metadata(
    State(fake): State<Shared>,
    Path((bucket, name)): Path<(String, String)>,
) -> Response {
    if fake.lock().unwrap().objects.contains_key(&name) {
        Json(json!({"name": name, "bucket": bucket, "downloadTokens": "tok-1,tok-2"}))
            .into_response()
    } else {
        not_found()
    }
}

async fn delete_object(
    State(fake): State<Shared>,
    Path((_, name)): Path<(String, String)>,
) -> Response {
    match fake.lock().unwrap().objects.remove(&name) {
        Some(_) => StatusCode::NO_CONTENT.into_response(),
        None => not_found(),
    }
}

async fn spawn_fake() -> (String, Shared) {
    let fake = Shared::default();
    let router = Router::new()
        .route(
            "/v1/projects/{project}/databases/{database}/documents/{collection}",
            get(list_documents).post(create_document),
        )
        .route(
            "/v1/projects/{project}/databases/{database}/documents/{collection}/{id}",
            get(get_document)
                .patch(patch_document)
                .delete(delete_document),
        )
        .route("/v0/b/{bucket}/o", axum::routing::post(upload_object))
        .route(
            "/v0/b/{bucket}/o/{name}",
            get(object_metadata).delete(delete_object),
        )
        .with_state(fake.clone());

    (common::serve(router).await, fake)
}

fn fields(headline: &str, has_image: bool) -> NoteFields {
    NoteFields {
        headline: headline.to_string(),
        body: format!("{headline} body"),
        has_image,
    }
}

// =============================================================================
// Firestore
// =============================================================================

#[tokio::test]
async fn firestore_round_trip_across_pages() {
    let (base_url, fake) = spawn_fake().await;
    let store = FirestoreDocumentStore::new(&base_url, "demo", "(default)", "notes")
        .with_api_key(Some("web-key".to_string()));

    let a = store.create(&fields("A", false)).await.unwrap();
    let b = store.create(&fields("B", true)).await.unwrap();
    let c = store.create(&fields("C", false)).await.unwrap();

    let mut notes = store.read_all().await.unwrap();
    notes.sort_by(|x, y| x.headline.cmp(&y.headline));
    assert_eq!(notes.len(), 3);
    assert_eq!(notes[1].id.as_ref(), Some(&b));
    assert_eq!(notes[1].body, "B body");
    assert!(notes[1].has_image);

    store.update(&a, &fields("A2", true)).await.unwrap();
    let updated = store.read(&a).await.unwrap().unwrap();
    assert_eq!(updated.headline, "A2");
    assert!(updated.has_image);

    store.delete(&c).await.unwrap();
    assert_eq!(store.read(&c).await.unwrap(), None);
    assert_eq!(store.read_all().await.unwrap().len(), 2);

    let keys = fake.lock().unwrap().api_keys.clone();
    assert!(keys.iter().all(|key| key.as_deref() == Some("web-key")));
}

#[tokio::test]
async fn firestore_update_of_missing_document_is_not_found() {
    let (base_url, fake) = spawn_fake().await;
    let store = FirestoreDocumentStore::new(&base_url, "demo", "(default)", "notes");

    let err = store
        .update(&NoteId::from("ghost"), &fields("H", false))
        .await
        .unwrap_err();

    assert!(matches!(err, StoreError::NotFound(_)));
    assert!(fake.lock().unwrap().documents.is_empty());
}

#[tokio::test]
async fn firestore_delete_of_missing_document_succeeds() {
    let (base_url, _) = spawn_fake().await;
    let store = FirestoreDocumentStore::new(&base_url, "demo", "(default)", "notes");

    store.delete(&NoteId::from("ghost")).await.unwrap();
}

#[tokio::test]
async fn firestore_empty_collection_lists_nothing() {
    let (base_url, _) = spawn_fake().await;
    let store = FirestoreDocumentStore::new(&base_url, "demo", "(default)", "notes");

    assert!(store.read_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn firestore_failure_surfaces_status() {
    let (base_url, _) = spawn_fake().await;
    let store = FirestoreDocumentStore::new(&base_url, "demo", "(default)", "unavailable");

    let err = store.read_all().await.unwrap_err();

    assert!(matches!(
        err,
        StoreError::Remote {
            service: "firestore",
            status: 503,
            ..
        }
    ));
}

// =============================================================================
// Firebase Storage
// =============================================================================

#[tokio::test]
async fn firebase_storage_upload_locate_delete() {
    let (base_url, fake) = spawn_fake().await;
    let store = FirebaseBlobStore::new(&base_url, "notebook.appspot.com")
        .with_auth_token(Some("secret".to_string()));
    let id = NoteId::from("abc");

    store
        .upload(&LocalImage::Bytes(b"jpeg".to_vec()), &id)
        .await
        .unwrap();
    {
        let fake = fake.lock().unwrap();
        assert_eq!(fake.objects.get("images/abc.jpg").map(Vec::as_slice), Some(&b"jpeg"[..]));
        assert_eq!(fake.authorizations, vec![Some("Bearer secret".to_string())]);
    }

    let url = store.download(&id).await.unwrap();
    assert_eq!(
        url,
        format!("{base_url}/v0/b/notebook.appspot.com/o/images%2Fabc.jpg?alt=media&token=tok-1")
    );

    store.delete(&id).await.unwrap();
    assert!(store.download(&id).await.unwrap_err().is_not_found());
    assert!(store.delete(&id).await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn notes_with_photos_over_firebase() {
    let (base_url, fake) = spawn_fake().await;
    let service = NoteService::new(
        Arc::new(FirestoreDocumentStore::new(&base_url, "demo", "(default)", "notes")),
        Arc::new(FirebaseBlobStore::new(&base_url, "notebook.appspot.com")),
    );

    let saved = service
        .save(SaveNote::new("Receipt", "lunch").with_image(LocalImage::Bytes(b"jpeg".to_vec())))
        .await
        .unwrap();
    let id = saved.id.clone().unwrap();
    assert!(fake.lock().unwrap().objects.contains_key(&format!("images/{id}.jpg")));

    let stored = service.get(&id).await.unwrap().unwrap();
    let url = service.load_image(&stored).await.unwrap();
    assert!(url.ends_with("?alt=media&token=tok-1"));

    service.delete(stored).await.unwrap();

    assert!(service.list().await.unwrap().is_empty());
    assert!(fake.lock().unwrap().objects.is_empty());
}
