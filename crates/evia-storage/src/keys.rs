//! Shared key generation and validation for storage backends.

use uuid::Uuid;

use crate::{StorageError, StorageResult};

/// Generate a unique storage key for a complaint image.
///
/// Only the extension of the client filename is kept, so two users uploading
/// `photo.png` never overwrite each other.
pub fn complaint_image_key(user_id: i64, original_filename: &str) -> String {
    let extension = original_filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty() && ext.len() <= 8 && ext.chars().all(|c| c.is_ascii_alphanumeric()));

    match extension {
        Some(ext) => format!("complaints/{}/{}.{}", user_id, Uuid::new_v4(), ext),
        None => format!("complaints/{}/{}", user_id, Uuid::new_v4()),
    }
}

/// Reject keys that could escape the storage root.
pub fn validate_key(storage_key: &str) -> StorageResult<()> {
    if storage_key.is_empty() || storage_key.contains("..") || storage_key.starts_with('/') {
        return Err(StorageError::InvalidKey(format!(
            "Storage key contains invalid characters: {}",
            storage_key
        )));
    }
    Ok(())
}
