use std::sync::Arc;
use tokio::task::{JoinError, JoinHandle};

use super::source::{FileSource, UploadStream};
use super::task::{UploadFailure, UploadRequest, UploadResult, UploadTask};

/// Combined result of the two uploads.
///
/// `Both` is only produced when both tasks succeeded.
#[derive(Debug)]
pub enum JoinedUploadOutcome {
    Both {
        file_uri: String,
        image_location: String,
    },
    Failed {
        task: &'static str,
        cause: UploadFailure,
    },
}

/// Runs the AI file store upload and the object storage upload in parallel.
///
/// Both tasks always run to completion before an outcome is returned. When
/// either fails the first failure in registration order (AI file store, then
/// object storage) is reported and the other result is dropped. Objects that
/// were uploaded are not removed.
#[derive(Clone)]
pub struct UploadCoordinator {
    ai_task: Arc<dyn UploadTask>,
    storage_task: Arc<dyn UploadTask>,
}

impl UploadCoordinator {
    pub fn new(ai_task: Arc<dyn UploadTask>, storage_task: Arc<dyn UploadTask>) -> Self {
        Self {
            ai_task,
            storage_task,
        }
    }

    #[tracing::instrument(skip(self, source, request), fields(storage_key = %request.storage_key))]
    pub async fn run(
        &self,
        source: Arc<dyn FileSource>,
        request: UploadRequest,
    ) -> JoinedUploadOutcome {
        let ai_stream = match source.open().await {
            Ok(stream) => stream,
            Err(e) => return self.source_failure(self.ai_task.name(), e),
        };
        let storage_stream = match source.open().await {
            Ok(stream) => stream,
            Err(e) => return self.source_failure(self.storage_task.name(), e),
        };

        let request = Arc::new(request);
        let ai = spawn(self.ai_task.clone(), ai_stream, request.clone());
        let storage = spawn(self.storage_task.clone(), storage_stream, request);

        let (ai_joined, storage_joined) = tokio::join!(ai, storage);
        let ai_result = settle(self.ai_task.name(), ai_joined);
        let storage_result = settle(self.storage_task.name(), storage_joined);

        match (ai_result, storage_result) {
            (
                UploadResult::Success {
                    identifier: file_uri,
                },
                UploadResult::Success {
                    identifier: image_location,
                },
            ) => JoinedUploadOutcome::Both {
                file_uri,
                image_location,
            },
            (UploadResult::Failure { cause }, other) => {
                self.report(self.ai_task.name(), &cause, self.storage_task.name(), &other);
                JoinedUploadOutcome::Failed {
                    task: self.ai_task.name(),
                    cause,
                }
            }
            (other, UploadResult::Failure { cause }) => {
                self.report(self.storage_task.name(), &cause, self.ai_task.name(), &other);
                JoinedUploadOutcome::Failed {
                    task: self.storage_task.name(),
                    cause,
                }
            }
        }
    }

    fn source_failure(&self, task: &'static str, error: std::io::Error) -> JoinedUploadOutcome {
        tracing::error!(task = task, error = %error, "Could not open upload source");
        JoinedUploadOutcome::Failed {
            task,
            cause: UploadFailure::Source(error),
        }
    }

    fn report(
        &self,
        failed: &'static str,
        cause: &UploadFailure,
        other: &'static str,
        other_result: &UploadResult,
    ) {
        tracing::error!(task = failed, error = %cause, "Image upload failed");
        match other_result {
            UploadResult::Success { identifier } => tracing::warn!(
                task = other,
                identifier = %identifier,
                "Discarding successful upload; the remote object is left in place"
            ),
            UploadResult::Failure { cause } => {
                tracing::error!(task = other, error = %cause, "Image upload failed")
            }
        }
    }
}

fn spawn(
    task: Arc<dyn UploadTask>,
    stream: UploadStream,
    request: Arc<UploadRequest>,
) -> JoinHandle<UploadResult> {
    tokio::spawn(async move { task.run(stream, &request).await })
}

fn settle(task: &'static str, joined: Result<UploadResult, JoinError>) -> UploadResult {
    joined.unwrap_or_else(|e| {
        tracing::error!(task = task, error = %e, "Upload task did not complete");
        UploadResult::Failure {
            cause: UploadFailure::Aborted(e.to_string()),
        }
    })
}
