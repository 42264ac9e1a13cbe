//! Blob storage for ID images and signatures

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Files addressed by filename only
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn upload(&self, filename: &str, bytes: Vec<u8>, content_type: &str) -> AppResult<()>;
    async fn download(&self, filename: &str) -> AppResult<Vec<u8>>;
}

/// Reject anything that could escape the storage root
fn check_filename(filename: &str) -> AppResult<()> {
    let valid = !filename.is_empty()
        && !filename.contains(['/', '\\'])
        && filename != "."
        && filename != ".."
        && !filename.starts_with('.');
    if valid {
        Ok(())
    } else {
        Err(AppError::Validation(format!("Invalid filename: {}", filename)))
    }
}

/// Blob store on the local filesystem
pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    pub async fn new(root: impl AsRef<Path>) -> AppResult<Self> {
        let root = root.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&root)
            .await
            .map_err(|e| AppError::Storage(format!("Cannot create {}: {}", root.display(), e)))?;
        Ok(Self { root })
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn upload(&self, filename: &str, bytes: Vec<u8>, content_type: &str) -> AppResult<()> {
        check_filename(filename)?;
        tracing::debug!("Storing {} ({}, {} bytes)", filename, content_type, bytes.len());
        tokio::fs::write(self.root.join(filename), bytes)
            .await
            .map_err(|e| AppError::Storage(format!("Cannot write {}: {}", filename, e)))
    }

    async fn download(&self, filename: &str) -> AppResult<Vec<u8>> {
        check_filename(filename)?;
        match tokio::fs::read(self.root.join(filename)).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(AppError::NotFound(format!("File {} not found", filename)))
            }
            Err(e) => Err(AppError::Storage(format!("Cannot read {}: {}", filename, e))),
        }
    }
}

/// Blob store kept in process memory
#[derive(Default)]
pub struct MemoryBlobStore {
    files: Mutex<HashMap<String, Vec<u8>>>,
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn upload(&self, filename: &str, bytes: Vec<u8>, _content_type: &str) -> AppResult<()> {
        check_filename(filename)?;
        self.files
            .lock()
            .map_err(|_| AppError::Internal("Blob store lock poisoned".to_string()))?
            .insert(filename.to_string(), bytes);
        Ok(())
    }

    async fn download(&self, filename: &str) -> AppResult<Vec<u8>> {
        check_filename(filename)?;
        self.files
            .lock()
            .map_err(|_| AppError::Internal("Blob store lock poisoned".to_string()))?
            .get(filename)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("File {} not found", filename)))
    }
}

/// Decoded `data:` URL
#[derive(Debug, PartialEq, Eq)]
pub struct DataUrl {
    pub bytes: Vec<u8>,
    pub content_type: String,
    pub extension: String,
}

/// Parse `data:image/<ext>;base64,<payload>` or
/// `data:application/octet-stream;base64,<payload>` (stored as jpeg)
pub fn decode_data_url(input: &str) -> AppResult<DataUrl> {
    let (prefix, payload) = input
        .split_once(',')
        .ok_or_else(|| AppError::Validation("Malformed data URL".to_string()))?;

    let media_type = prefix
        .strip_prefix("data:")
        .and_then(|rest| rest.split(';').next())
        .ok_or_else(|| AppError::Validation("Malformed data URL".to_string()))?;

    let (content_type, extension) = if let Some(ext) = media_type.strip_prefix("image/") {
        (media_type.to_string(), ext.to_string())
    } else if media_type == "application/octet-stream" {
        ("image/jpeg".to_string(), "jpeg".to_string())
    } else {
        return Err(AppError::Validation(format!("Unsupported media type: {}", media_type)));
    };

    if extension.is_empty() || !extension.chars().all(|c| c.is_ascii_alphanumeric() || c == '+') {
        return Err(AppError::Validation(format!("Unsupported media type: {}", media_type)));
    }

    let bytes = STANDARD
        .decode(payload.trim())
        .map_err(|e| AppError::Validation(format!("Invalid base64 payload: {}", e)))?;

    Ok(DataUrl {
        bytes,
        content_type,
        extension,
    })
}

/// Content type served for a stored filename
pub fn content_type_for(filename: &str) -> &'static str {
    match filename.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase()).as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("svg+xml") | Some("svg") => "image/svg+xml",
        _ => "application/octet-stream",
    }
}

#[derive(Clone)]
pub struct StorageService {
    blobs: Arc<dyn BlobStore>,
}

impl StorageService {
    pub fn new(blobs: Arc<dyn BlobStore>) -> Self {
        Self { blobs }
    }

    /// Decode a data URL and store it under a fresh `uuid.ext` filename
    pub async fn store_data_url(&self, data_url: &str) -> AppResult<String> {
        let decoded = decode_data_url(data_url)?;
        let filename = format!("{}.{}", Uuid::new_v4(), decoded.extension);
        self.blobs
            .upload(&filename, decoded.bytes, &decoded.content_type)
            .await?;
        Ok(filename)
    }

    pub async fn fetch(&self, filename: &str) -> AppResult<Vec<u8>> {
        self.blobs.download(filename).await
    }
}
