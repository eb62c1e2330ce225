use std::sync::Arc;

use base64::{Engine as _, engine::general_purpose::STANDARD};
use tracing::{error, info, instrument};

use crate::data::file_store::{FileStore, StoredFile};
use crate::domain::error::DomainError;

/// An image as it arrives over the API, base64 encoded.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub content_type: String,
    pub data: String,
}

#[derive(Clone)]
pub struct MediaService {
    files: Arc<dyn FileStore>,
    max_bytes: usize,
}

impl MediaService {
    pub fn new(files: Arc<dyn FileStore>, max_bytes: usize) -> Self {
        Self { files, max_bytes }
    }

    /// Decodes and checks an upload without storing it.
    pub fn decode(&self, upload: ImageUpload) -> Result<StoredFile, DomainError> {
        let content_type = upload.content_type.trim().to_ascii_lowercase();
        if !content_type.starts_with("image/") {
            return Err(DomainError::validation("only image uploads are accepted"));
        }

        // tolerate data URLs as produced by browsers
        let encoded = match upload.data.split_once(";base64,") {
            Some((prefix, rest)) if prefix.starts_with("data:") => rest,
            _ => upload.data.as_str(),
        };
        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|e| DomainError::validation(format!("image is not valid base64: {e}")))?;
        if bytes.is_empty() {
            return Err(DomainError::validation("image is empty"));
        }
        if bytes.len() > self.max_bytes {
            return Err(DomainError::validation(format!(
                "image exceeds {} bytes",
                self.max_bytes
            )));
        }

        let file_name = match upload.file_name.trim() {
            "" => "image".to_string(),
            name => name.to_string(),
        };
        Ok(StoredFile {
            content_type,
            file_name,
            bytes,
        })
    }

    #[instrument(skip(self, file), fields(size = file.bytes.len()))]
    pub async fn store(&self, file: StoredFile) -> Result<String, DomainError> {
        let id = self.files.put(file).await.map_err(|e| {
            error!(backend = self.files.backend(), "image upload failed: {}", e);
            DomainError::from(e)
        })?;
        info!(image_id = %id, backend = self.files.backend(), "image stored");
        Ok(id)
    }

    pub async fn upload(&self, upload: ImageUpload) -> Result<String, DomainError> {
        let file = self.decode(upload)?;
        self.store(file).await
    }

    pub async fn fetch(&self, id: &str) -> Result<StoredFile, DomainError> {
        self.files
            .get(id)
            .await
            .map_err(|e| {
                error!(image_id = id, "image download failed: {}", e);
                DomainError::from(e)
            })?
            .ok_or_else(|| DomainError::FileNotFound(id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::file_store::MemoryFileStore;

    fn media(max_bytes: usize) -> MediaService {
        MediaService::new(Arc::new(MemoryFileStore::new()), max_bytes)
    }

    fn upload(content_type: &str, data: &str) -> ImageUpload {
        ImageUpload {
            file_name: "food.jpg".into(),
            content_type: content_type.into(),
            data: data.into(),
        }
    }

    #[tokio::test]
    async fn stores_and_serves_an_image() {
        let media = media(1024);
        let id = media
            .upload(upload("image/jpeg", &STANDARD.encode(b"jpegbytes")))
            .await
            .unwrap();
        let file = media.fetch(&id).await.unwrap();
        assert_eq!(file.bytes, b"jpegbytes");
        assert_eq!(file.content_type, "image/jpeg");
    }

    #[test]
    fn accepts_data_urls() {
        let data = format!("data:image/png;base64,{}", STANDARD.encode(b"png"));
        let file = media(1024).decode(upload("image/png", &data)).unwrap();
        assert_eq!(file.bytes, b"png");
    }

    #[test]
    fn rejects_non_images_bad_base64_and_oversized_payloads() {
        let media = media(4);
        for bad in [
            upload("text/plain", &STANDARD.encode(b"hi")),
            upload("image/png", "***"),
            upload("image/png", ""),
            upload("image/png", &STANDARD.encode(b"too large")),
        ] {
            assert!(matches!(media.decode(bad), Err(DomainError::Validation(_))));
        }
    }

    #[tokio::test]
    async fn unknown_image_is_not_found() {
        assert!(matches!(
            media(4).fetch("nope").await,
            Err(DomainError::FileNotFound(_))
        ));
    }
}
