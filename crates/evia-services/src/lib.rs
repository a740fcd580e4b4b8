//! Evia services
//!
//! Business logic sitting between the HTTP layer and the stores: the Gemini
//! client, the concurrent image upload pipeline and the complaint, auth and
//! drug services.

pub mod auth;
pub mod complaint;
pub mod drug;
pub mod email;
pub mod gemini;
pub mod upload;

pub use auth::{AuthService, AuthSettings};
pub use complaint::ComplaintService;
pub use drug::DrugService;
pub use email::{EmailService, LogMailer, OtpMailer};
pub use gemini::{AiChat, AiFileStore, ChatPart, GeminiClient, GeminiError, GenerationMode};
pub use upload::{
    AiFileUploadTask, FileSource, JoinedUploadOutcome, ObjectStorageUploadTask, TempFileSource,
    UploadCoordinator, UploadFailure, UploadRequest, UploadResult, UploadStream, UploadTask,
};
