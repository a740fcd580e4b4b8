use async_trait::async_trait;
use std::io;
use std::path::Path;
use std::pin::Pin;
use tempfile::TempPath;
use tokio::io::AsyncRead;

/// Owned, readable byte stream handed to one upload.
pub type UploadStream = Pin<Box<dyn AsyncRead + Send + Unpin>>;

/// Hands out independent readers over the same file content.
///
/// Every call to `open` starts at byte 0 and shares no cursor with earlier
/// readers, so two uploads can consume the file concurrently.
#[async_trait]
pub trait FileSource: Send + Sync {
    async fn open(&self) -> io::Result<UploadStream>;
}

/// A spooled upload on disk. The file is deleted when the source is dropped.
#[derive(Debug)]
pub struct TempFileSource {
    path: TempPath,
}

impl TempFileSource {
    pub fn new(path: TempPath) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl FileSource for TempFileSource {
    async fn open(&self) -> io::Result<UploadStream> {
        let file = tokio::fs::File::open(&*self.path).await?;
        Ok(Box::pin(file))
    }
}
