//! Evia Storage Library
//!
//! Storage abstraction for complaint images, with an S3 backend (objects are
//! written with a public-read ACL) and a local filesystem backend.
//!
//! # Storage key format
//!
//! Complaint images live under `complaints/{user_id}/{uuid}.{ext}`. Keys must
//! not contain `..` or a leading `/`; see the `keys` module.

pub mod factory;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use evia_core::StorageBackend;
pub use factory::create_storage;
pub use keys::complaint_image_key;
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use traits::{Storage, StorageError, StorageResult};
