use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};

use std::collections::HashMap;

use super::DocumentStore;
use crate::{
    error::StoreError,
    models::{Note, NoteFields, NoteId},
};

const SERVICE: &str = "firestore";
const PAGE_SIZE: &str = "300";

/// Firestore typed value. Only the variants notes use are modelled, others
/// deserialize to an empty value.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Value {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    string_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    boolean_value: Option<bool>,
}

impl Value {
    fn string(value: String) -> Self {
        Self {
            string_value: Some(value),
            boolean_value: None,
        }
    }

    const fn boolean(value: bool) -> Self {
        Self {
            string_value: None,
            boolean_value: Some(value),
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Document {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    name: String,
    #[serde(default)]
    fields: HashMap<String, Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListDocumentsResponse {
    #[serde(default)]
    documents: Vec<Document>,
    #[serde(default)]
    next_page_token: Option<String>,
}

impl Document {
    fn from_fields(fields: &NoteFields) -> Self {
        let mut map = HashMap::with_capacity(3);
        map.insert("headline".to_string(), Value::string(fields.headline.clone()));
        map.insert("body".to_string(), Value::string(fields.body.clone()));
        map.insert("hasImage".to_string(), Value::boolean(fields.has_image));
        Self {
            name: String::new(),
            fields: map,
        }
    }

    fn id(&self) -> Result<NoteId, StoreError> {
        match self.name.rsplit('/').next() {
            Some(id) if !id.is_empty() => Ok(NoteId::from(id)),
            _ => Err(StoreError::MalformedDocument {
                id: self.name.clone(),
                reason: "document name carries no id".to_string(),
            }),
        }
    }

    fn into_note(mut self) -> Result<Note, StoreError> {
        let id = self.id()?;
        let mut text = |key: &str| {
            self.fields
                .remove(key)
                .and_then(|v| v.string_value)
                .unwrap_or_default()
        };
        let headline = text("headline");
        let body = text("body");
        let has_image = self
            .fields
            .get("hasImage")
            .and_then(|v| v.boolean_value)
            .unwrap_or(false);

        Ok(Note::from_document(
            id,
            NoteFields {
                headline,
                body,
                has_image,
            },
        ))
    }
}

/// Notes kept in a Firestore collection, accessed through the REST API.
pub struct FirestoreDocumentStore {
    client: reqwest::Client,
    collection_url: String,
    api_key: Option<String>,
    auth_token: Option<String>,
}

impl FirestoreDocumentStore {
    pub fn new(endpoint: &str, project_id: &str, database: &str, collection: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            collection_url: format!(
                "{}/v1/projects/{project_id}/databases/{database}/documents/{collection}",
                endpoint.trim_end_matches('/')
            ),
            api_key: None,
            auth_token: None,
        }
    }

    #[must_use]
    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key;
        self
    }

    #[must_use]
    pub fn with_auth_token(mut self, auth_token: Option<String>) -> Self {
        self.auth_token = auth_token;
        self
    }

    fn document_url(&self, id: &NoteId) -> String {
        format!(
            "{}/{}",
            self.collection_url,
            urlencoding::encode(id.as_str())
        )
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let mut request = self.client.request(method, url);
        if let Some(key) = &self.api_key {
            request = request.query(&[("key", key)]);
        }
        if let Some(token) = &self.auth_token {
            request = request.bearer_auth(token);
        }
        request
    }
}

async fn remote_error(response: Response) -> StoreError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    StoreError::Remote {
        service: SERVICE,
        status,
        body,
    }
}

#[async_trait]
impl DocumentStore for FirestoreDocumentStore {
    async fn create(&self, fields: &NoteFields) -> Result<NoteId, StoreError> {
        let response = self
            .request(Method::POST, &self.collection_url)
            .json(&Document::from_fields(fields))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(remote_error(response).await);
        }

        let document: Document = response.json().await?;
        let id = document.id()?;
        tracing::debug!(id = %id, "firestore document created");
        Ok(id)
    }

    async fn read_all(&self) -> Result<Vec<Note>, StoreError> {
        let mut notes = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self
                .request(Method::GET, &self.collection_url)
                .query(&[("pageSize", PAGE_SIZE)]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token)]);
            }

            let response = request.send().await?;
            if !response.status().is_success() {
                return Err(remote_error(response).await);
            }

            let page: ListDocumentsResponse = response.json().await?;
            for document in page.documents {
                notes.push(document.into_note()?);
            }

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        Ok(notes)
    }

    async fn read(&self, id: &NoteId) -> Result<Option<Note>, StoreError> {
        let response = self
            .request(Method::GET, &self.document_url(id))
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(remote_error(response).await);
        }

        let document: Document = response.json().await?;
        document.into_note().map(Some)
    }

    async fn update(&self, id: &NoteId, fields: &NoteFields) -> Result<(), StoreError> {
        let response = self
            .request(Method::PATCH, &self.document_url(id))
            .query(&[
                ("updateMask.fieldPaths", "headline"),
                ("updateMask.fieldPaths", "body"),
                ("updateMask.fieldPaths", "hasImage"),
                ("currentDocument.exists", "true"),
            ])
            .json(&Document::from_fields(fields))
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(StoreError::NotFound(format!("note {id}")));
        }
        if !response.status().is_success() {
            return Err(remote_error(response).await);
        }

        Ok(())
    }

    async fn delete(&self, id: &NoteId) -> Result<(), StoreError> {
        let response = self
            .request(Method::DELETE, &self.document_url(id))
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            tracing::debug!(id = %id, "delete of missing note ignored");
            return Ok(());
        }
        if !response.status().is_success() {
            return Err(remote_error(response).await);
        }

        Ok(())
    }
}
