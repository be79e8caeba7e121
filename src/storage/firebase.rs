use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, Response, StatusCode, header::CONTENT_TYPE};
use serde::Deserialize;

use super::BlobStore;
use crate::error::StoreError;

const SERVICE: &str = "firebase storage";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ObjectMetadata {
    /// Comma separated list of tokens granting public read access.
    #[serde(default)]
    download_tokens: Option<String>,
}

/// Objects kept in a Firebase Storage bucket, accessed through the REST API.
pub struct FirebaseBlobStore {
    client: reqwest::Client,
    objects_url: String,
    auth_token: Option<String>,
}

impl FirebaseBlobStore {
    pub fn new(endpoint: &str, bucket: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            objects_url: format!("{}/v0/b/{bucket}/o", endpoint.trim_end_matches('/')),
            auth_token: None,
        }
    }

    #[must_use]
    pub fn with_auth_token(mut self, auth_token: Option<String>) -> Self {
        self.auth_token = auth_token;
        self
    }

    fn object_url(&self, key: &str) -> String {
        format!("{}/{}", self.objects_url, urlencoding::encode(key))
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let request = self.client.request(method, url);
        match &self.auth_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
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
impl BlobStore for FirebaseBlobStore {
    async fn put(&self, key: &str, data: Vec<u8>) -> Result<(), StoreError> {
        let size = data.len();
        let response = self
            .request(Method::POST, &self.objects_url)
            .query(&[("uploadType", "media"), ("name", key)])
            .header(CONTENT_TYPE, "image/jpeg")
            .body(data)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(remote_error(response).await);
        }

        tracing::debug!(key = %key, size, "firebase object uploaded");
        Ok(())
    }

    async fn locate(&self, key: &str) -> Result<String, StoreError> {
        let url = self.object_url(key);
        let response = self.request(Method::GET, &url).send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(StoreError::NotFound(format!("blob {key}")));
        }
        if !response.status().is_success() {
            return Err(remote_error(response).await);
        }

        let metadata: ObjectMetadata = response.json().await?;
        let token = metadata
            .download_tokens
            .as_deref()
            .and_then(|tokens| tokens.split(',').next())
            .filter(|token| !token.is_empty());

        Ok(match token {
            Some(token) => format!("{url}?alt=media&token={}", urlencoding::encode(token)),
            None => format!("{url}?alt=media"),
        })
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        let response = self
            .request(Method::DELETE, &self.object_url(key))
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(StoreError::NotFound(format!("blob {key}")));
        }
        if !response.status().is_success() {
            return Err(remote_error(response).await);
        }

        Ok(())
    }
}
