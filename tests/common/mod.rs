#![allow(dead_code)]

use async_trait::async_trait;
use axum::Router;

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicBool, Ordering},
};

use notebook::{
    NoteService, StoreError,
    models::{Note, NoteFields, NoteId},
    repository::{DocumentStore, MemoryDocumentStore},
    storage::{BlobStore, MemoryBlobStore},
};

/// Ordered log of every store call, shared by both doubles.
pub type CallLog = Arc<Mutex<Vec<String>>>;

pub fn unavailable() -> StoreError {
    StoreError::Remote {
        service: "test",
        status: 503,
        body: "unavailable".to_string(),
    }
}

// =============================================================================
// Document store double
// =============================================================================

pub struct RecordingDocumentStore {
    pub inner: MemoryDocumentStore,
    log: CallLog,
    fail_writes: AtomicBool,
    fail_deletes: AtomicBool,
}

impl RecordingDocumentStore {
    pub fn new(log: CallLog) -> Self {
        Self {
            inner: MemoryDocumentStore::new(),
            log,
            fail_writes: AtomicBool::new(false),
            fail_deletes: AtomicBool::new(false),
        }
    }

    /// Make `create` and `update` fail as if the store were unreachable.
    pub fn fail_writes(&self) {
        self.fail_writes.store(true, Ordering::SeqCst);
    }

    pub fn fail_deletes(&self) {
        self.fail_deletes.store(true, Ordering::SeqCst);
    }

    fn record(&self, call: String) {
        self.log.lock().unwrap().push(call);
    }

    fn check_writes(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            Err(unavailable())
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl DocumentStore for RecordingDocumentStore {
    async fn create(&self, fields: &NoteFields) -> Result<NoteId, StoreError> {
        self.record("documents.create".to_string());
        self.check_writes()?;
        self.inner.create(fields).await
    }

    async fn read_all(&self) -> Result<Vec<Note>, StoreError> {
        self.record("documents.read_all".to_string());
        self.inner.read_all().await
    }

    async fn read(&self, id: &NoteId) -> Result<Option<Note>, StoreError> {
        self.record(format!("documents.read {id}"));
        self.inner.read(id).await
    }

    async fn update(&self, id: &NoteId, fields: &NoteFields) -> Result<(), StoreError> {
        self.record(format!("documents.update {id}"));
        self.check_writes()?;
        self.inner.update(id, fields).await
    }

    async fn delete(&self, id: &NoteId) -> Result<(), StoreError> {
        self.record(format!("documents.delete {id}"));
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        self.inner.delete(id).await
    }
}

// =============================================================================
// Blob store double
// =============================================================================

pub struct RecordingBlobStore {
    pub inner: MemoryBlobStore,
    log: CallLog,
    fail_puts: AtomicBool,
    fail_removes: AtomicBool,
}

impl RecordingBlobStore {
    pub fn new(log: CallLog) -> Self {
        Self {
            inner: MemoryBlobStore::new(),
            log,
            fail_puts: AtomicBool::new(false),
            fail_removes: AtomicBool::new(false),
        }
    }

    pub fn fail_puts(&self) {
        self.fail_puts.store(true, Ordering::SeqCst);
    }

    pub fn fail_removes(&self) {
        self.fail_removes.store(true, Ordering::SeqCst);
    }

    fn record(&self, call: String) {
        self.log.lock().unwrap().push(call);
    }
}

#[async_trait]
impl BlobStore for RecordingBlobStore {
    async fn put(&self, key: &str, data: Vec<u8>) -> Result<(), StoreError> {
        self.record(format!("blobs.put {key}"));
        if self.fail_puts.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        self.inner.put(key, data).await
    }

    async fn locate(&self, key: &str) -> Result<String, StoreError> {
        self.record(format!("blobs.locate {key}"));
        self.inner.locate(key).await
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.record(format!("blobs.remove {key}"));
        if self.fail_removes.load(Ordering::SeqCst) {
            return Err(unavailable());
        }
        self.inner.remove(key).await
    }
}

// =============================================================================
// Harness
// =============================================================================

pub struct Harness {
    pub documents: Arc<RecordingDocumentStore>,
    pub blobs: Arc<RecordingBlobStore>,
    pub service: NoteService,
    log: CallLog,
}

impl Harness {
    pub fn new() -> Self {
        let log: CallLog = Arc::new(Mutex::new(Vec::new()));
        let documents = Arc::new(RecordingDocumentStore::new(log.clone()));
        let blobs = Arc::new(RecordingBlobStore::new(log.clone()));
        let service = NoteService::new(documents.clone(), blobs.clone());

        Self {
            documents,
            blobs,
            service,
            log,
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    pub fn clear_calls(&self) {
        self.log.lock().unwrap().clear();
    }

    /// Every stored note, read straight from the backing store.
    pub async fn stored_notes(&self) -> Vec<Note> {
        self.documents.inner.read_all().await.unwrap()
    }

    pub async fn stored_image(&self, id: &NoteId) -> Option<Vec<u8>> {
        self.blobs
            .inner
            .get(&notebook::storage::image_key(id))
            .await
    }
}

/// Serves `router` on an ephemeral local port and returns its base URL.
pub async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    format!("http://{addr}")
}
