//! # notebook
//!
//! Short text notes, each with an optional photo. Notes live in a document
//! store, photos in a blob store keyed by note id, and [`service::NoteService`]
//! keeps the two in step. [`handlers::rest`] serves the service over HTTP to
//! the mobile client.

pub mod config;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod service;
pub mod storage;

pub use error::{NoteError, StoreError};
pub use models::{LocalImage, Note, NoteId, SaveNote};
pub use service::NoteService;
