use async_trait::async_trait;
use evia_storage::Storage;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;

use super::source::UploadStream;
use crate::gemini::AiFileStore;

/// Why one upload did not produce an identifier.
#[derive(Debug, Error)]
pub enum UploadFailure {
    #[error("failed to open upload source: {0}")]
    Source(#[from] std::io::Error),

    #[error("AI file store upload failed: {0}")]
    AiFileStore(String),

    #[error("object storage upload failed: {0}")]
    ObjectStorage(String),

    #[error("upload task aborted: {0}")]
    Aborted(String),
}

/// Destination parameters for one inbound image.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub mime_type: String,
    /// Object storage key
    pub storage_key: String,
    /// Display name in the AI file store
    pub display_name: String,
}

#[derive(Debug)]
pub enum UploadResult {
    Success { identifier: String },
    Failure { cause: UploadFailure },
}

/// One outbound transfer of the image to one external service.
///
/// Tasks do not retry; any failure is returned as-is.
#[async_trait]
pub trait UploadTask: Send + Sync {
    /// Stable name used in logs.
    fn name(&self) -> &'static str;

    async fn run(&self, stream: UploadStream, request: &UploadRequest) -> UploadResult;
}

/// Uploads into the Gemini file store; the identifier is the file URI.
pub struct AiFileUploadTask {
    store: Arc<dyn AiFileStore>,
}

impl AiFileUploadTask {
    pub fn new(store: Arc<dyn AiFileStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl UploadTask for AiFileUploadTask {
    fn name(&self) -> &'static str {
        "ai_file_store"
    }

    async fn run(&self, stream: UploadStream, request: &UploadRequest) -> UploadResult {
        let started = Instant::now();
        let result = self
            .store
            .upload_file(stream, &request.mime_type, &request.display_name)
            .await;

        match result {
            Ok(file_uri) => {
                tracing::debug!(
                    task = self.name(),
                    file_uri = %file_uri,
                    duration_ms = started.elapsed().as_millis() as u64,
                    "Upload finished"
                );
                UploadResult::Success {
                    identifier: file_uri,
                }
            }
            Err(e) => UploadResult::Failure {
                cause: UploadFailure::AiFileStore(e.to_string()),
            },
        }
    }
}

/// Uploads into object storage; the identifier is the public URL.
pub struct ObjectStorageUploadTask {
    storage: Arc<dyn Storage>,
}

impl ObjectStorageUploadTask {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }
}

#[async_trait]
impl UploadTask for ObjectStorageUploadTask {
    fn name(&self) -> &'static str {
        "object_storage"
    }

    async fn run(&self, stream: UploadStream, request: &UploadRequest) -> UploadResult {
        let started = Instant::now();
        let result = self
            .storage
            .upload_stream(&request.storage_key, &request.mime_type, stream)
            .await;

        match result {
            Ok(url) => {
                tracing::debug!(
                    task = self.name(),
                    backend = %self.storage.backend_type(),
                    storage_key = %request.storage_key,
                    duration_ms = started.elapsed().as_millis() as u64,
                    "Upload finished"
                );
                UploadResult::Success { identifier: url }
            }
            Err(e) => UploadResult::Failure {
                cause: UploadFailure::ObjectStorage(e.to_string()),
            },
        }
    }
}
