//! Concurrent image upload pipeline
//!
//! One inbound image is uploaded to the Gemini file store and to object
//! storage at the same time. Each upload reads its own stream from a
//! [`FileSource`], runs as an [`UploadTask`] on its own tokio task, and the
//! [`UploadCoordinator`] joins both into a [`JoinedUploadOutcome`].

pub mod coordinator;
pub mod source;
pub mod task;

pub use coordinator::{JoinedUploadOutcome, UploadCoordinator};
pub use source::{FileSource, TempFileSource, UploadStream};
pub use task::{
    AiFileUploadTask, ObjectStorageUploadTask, UploadFailure, UploadRequest, UploadResult,
    UploadTask,
};
