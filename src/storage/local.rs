use std::path::PathBuf;

use crate::{error::StoreError, models::LocalImage};

impl LocalImage {
    /// Fetches the image bytes from wherever the editor picked them.
    pub async fn read_bytes(&self) -> Result<Vec<u8>, StoreError> {
        match self {
            Self::Bytes(data) => Ok(data.clone()),
            Self::Path(path) => read_file(path.clone()).await,
            Self::Url(url) => {
                if let Some(path) = url.strip_prefix("file://") {
                    let path = urlencoding::decode(path)
                        .map_err(|e| StoreError::UnsupportedSource(format!("{url}: {e}")))?;
                    return read_file(PathBuf::from(path.into_owned())).await;
                }

                if url.starts_with("http://") || url.starts_with("https://") {
                    return fetch(url).await;
                }

                Err(StoreError::UnsupportedSource(url.clone()))
            }
            Self::Stored => Err(StoreError::UnsupportedSource(
                "stored image has no local bytes".to_string(),
            )),
        }
    }
}

async fn read_file(path: PathBuf) -> Result<Vec<u8>, StoreError> {
    tokio::fs::read(&path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            StoreError::NotFound(format!("image file {}", path.display()))
        } else {
            StoreError::Io(e)
        }
    })
}

async fn fetch(url: &str) -> Result<Vec<u8>, StoreError> {
    let response = reqwest::get(url).await?;

    if response.status() == reqwest::StatusCode::NOT_FOUND {
        return Err(StoreError::NotFound(format!("image at {url}")));
    }
    if !response.status().is_success() {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        return Err(StoreError::Remote {
            service: "image source",
            status,
            body,
        });
    }

    Ok(response.bytes().await?.to_vec())
}
