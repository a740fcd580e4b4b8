//! Evia Core Library
//!
//! This crate provides core domain models, error types, configuration and the
//! token encryption service shared across all Evia components.

pub mod config;
pub mod encryption;
pub mod error;
pub mod models;
pub mod storage_types;

// Re-export commonly used types
pub use config::{AiConfig, BaseConfig, Config, EviaConfig, SmtpConfig};
pub use encryption::EncryptionService;
pub use error::{AppError, ErrorMetadata, FieldError, LogLevel};
pub use storage_types::StorageBackend;
