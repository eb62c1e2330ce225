use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{error, info};

use crate::data::appwrite_store::{AppwriteClient, is_valid_id};
use crate::data::document_store::{StoreError, new_document_id};

#[derive(Debug, Clone, PartialEq)]
pub struct StoredFile {
    pub content_type: String,
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Opaque-id blob storage for donation images.
#[async_trait]
pub trait FileStore: Send + Sync {
    fn backend(&self) -> &'static str;
    async fn put(&self, file: StoredFile) -> Result<String, StoreError>;
    async fn get(&self, id: &str) -> Result<Option<StoredFile>, StoreError>;
}

#[derive(Default)]
pub struct MemoryFileStore {
    files: RwLock<HashMap<String, StoredFile>>,
}

impl MemoryFileStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FileStore for MemoryFileStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn put(&self, file: StoredFile) -> Result<String, StoreError> {
        let id = new_document_id();
        self.files.write().await.insert(id.clone(), file);
        Ok(id)
    }

    async fn get(&self, id: &str) -> Result<Option<StoredFile>, StoreError> {
        Ok(self.files.read().await.get(id).cloned())
    }
}

#[derive(Serialize, Deserialize)]
struct FileMeta {
    content_type: String,
    file_name: String,
}

/// Files under a directory, each with a `<id>.json` sidecar for its metadata.
pub struct LocalFileStore {
    root: PathBuf,
}

impl LocalFileStore {
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        info!(root = %root.display(), "local file store ready");
        Ok(Self { root })
    }

    fn paths(&self, id: &str) -> Option<(PathBuf, PathBuf)> {
        // ids are generated hex; anything else never maps onto the filesystem
        if id.is_empty() || !id.chars().all(|c| c.is_ascii_alphanumeric()) {
            return None;
        }
        Some((self.root.join(id), self.root.join(format!("{id}.json"))))
    }
}

#[async_trait]
impl FileStore for LocalFileStore {
    fn backend(&self) -> &'static str {
        "local"
    }

    async fn put(&self, file: StoredFile) -> Result<String, StoreError> {
        let id = new_document_id();
        let (data_path, meta_path) = self
            .paths(&id)
            .ok_or_else(|| StoreError::Malformed(format!("unusable file id {id}")))?;
        let meta = serde_json::to_vec(&FileMeta {
            content_type: file.content_type,
            file_name: file.file_name,
        })
        .map_err(|e| StoreError::Malformed(e.to_string()))?;

        tokio::fs::write(&data_path, &file.bytes).await?;
        tokio::fs::write(&meta_path, meta).await?;
        Ok(id)
    }

    async fn get(&self, id: &str) -> Result<Option<StoredFile>, StoreError> {
        let Some((data_path, meta_path)) = self.paths(id) else {
            return Ok(None);
        };
        let meta = match tokio::fs::read(&meta_path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let meta: FileMeta =
            serde_json::from_slice(&meta).map_err(|e| StoreError::Malformed(e.to_string()))?;
        let bytes = tokio::fs::read(&data_path).await?;
        Ok(Some(StoredFile {
            content_type: meta.content_type,
            file_name: meta.file_name,
            bytes,
        }))
    }
}

#[derive(Deserialize)]
struct AppwriteFile {
    #[serde(rename = "$id")]
    id: String,
    name: String,
    #[serde(rename = "mimeType")]
    mime_type: String,
}

pub struct AppwriteFileStore {
    client: AppwriteClient,
    bucket_id: String,
}

impl AppwriteFileStore {
    pub fn new(client: AppwriteClient, bucket_id: impl Into<String>) -> Self {
        Self {
            client,
            bucket_id: bucket_id.into(),
        }
    }

    fn files_path(&self) -> String {
        format!("/storage/buckets/{}/files", self.bucket_id)
    }
}

#[async_trait]
impl FileStore for AppwriteFileStore {
    fn backend(&self) -> &'static str {
        "appwrite"
    }

    async fn put(&self, file: StoredFile) -> Result<String, StoreError> {
        let part = Part::bytes(file.bytes)
            .file_name(file.file_name)
            .mime_str(&file.content_type)?;
        let form = Form::new()
            .text("fileId", new_document_id())
            .part("file", part);

        let response = self
            .client
            .request(reqwest::Method::POST, &self.files_path())
            .multipart(form)
            .send()
            .await?;
        let created: AppwriteFile = AppwriteClient::check(response)
            .await
            .inspect_err(|e| error!("appwrite upload failed: {}", e))?
            .json()
            .await?;
        Ok(created.id)
    }

    async fn get(&self, id: &str) -> Result<Option<StoredFile>, StoreError> {
        if !is_valid_id(id) {
            return Ok(None);
        }
        let path = format!("{}/{}", self.files_path(), id);
        let response = self
            .client
            .request(reqwest::Method::GET, &path)
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let meta: AppwriteFile = AppwriteClient::check(response).await?.json().await?;

        let response = self
            .client
            .request(reqwest::Method::GET, &format!("{path}/view"))
            .send()
            .await?;
        let bytes = AppwriteClient::check(response).await?.bytes().await?;
        Ok(Some(StoredFile {
            content_type: meta.mime_type,
            file_name: meta.name,
            bytes: bytes.to_vec(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png() -> StoredFile {
        StoredFile {
            content_type: "image/png".into(),
            file_name: "plate.png".into(),
            bytes: vec![0x89, b'P', b'N', b'G'],
        }
    }

    #[tokio::test]
    async fn local_store_keeps_bytes_and_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalFileStore::open(dir.path()).await.unwrap();

        let id = store.put(png()).await.unwrap();
        assert_eq!(store.get(&id).await.unwrap(), Some(png()));
        assert_eq!(store.get("unknown").await.unwrap(), None);
    }

    #[tokio::test]
    async fn appwrite_store_refuses_path_like_ids_offline() {
        let client = AppwriteClient::new(&crate::infrastructure::config::AppwriteConfig {
            endpoint: "http://127.0.0.1:9/v1".into(),
            project_id: "p".into(),
            api_key: "k".into(),
            database_id: "db".into(),
            bucket_id: "b".into(),
            timeout_secs: 1,
        })
        .unwrap();
        let store = AppwriteFileStore::new(client, "b");

        assert_eq!(store.get("..").await.unwrap(), None);
        assert_eq!(store.get("abc?project=other").await.unwrap(), None);
    }

    #[tokio::test]
    async fn local_store_refuses_path_like_ids() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalFileStore::open(dir.path()).await.unwrap();
        assert_eq!(store.get("../etc/passwd").await.unwrap(), None);
    }
}
