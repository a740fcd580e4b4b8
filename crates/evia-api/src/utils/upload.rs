//! Multipart parsing for complaint image uploads

use axum::extract::multipart::Field;
use axum::extract::Multipart;
use evia_core::models::ComplaintSubmission;
use evia_core::{AppError, FieldError};
use evia_services::TempFileSource;
use tokio::io::AsyncWriteExt;

/// Complaint form with the image already spooled to a temporary file.
pub struct ComplaintForm {
    pub submission: ComplaintSubmission,
    pub image: TempFileSource,
}

/// Read the `complaint` text and the `image` file from a multipart body.
///
/// The image is streamed to disk so both uploads can reopen it; it is rejected
/// once it grows past `max_size`.
pub async fn read_complaint_form(
    mut multipart: Multipart,
    max_size: usize,
    allowed_types: &[String],
) -> Result<ComplaintForm, AppError> {
    let mut complaint = String::new();
    let mut image: Option<(TempFileSource, String, String)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Failed to read multipart: {}", e)))?
    {
        let name = field.name().map(String::from);
        match name.as_deref() {
            Some("complaint") => {
                complaint = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Failed to read field: {}", e)))?;
            }
            Some("image") => {
                if image.is_some() {
                    return Err(AppError::BadRequest(
                        "Only one image may be uploaded".to_string(),
                    ));
                }
                let filename = field
                    .file_name()
                    .map(String::from)
                    .unwrap_or_else(|| "image".to_string());
                let content_type = field
                    .content_type()
                    .map(String::from)
                    .unwrap_or_else(|| "application/octet-stream".to_string());
                validate_content_type(&content_type, allowed_types)?;

                if let Some(source) = spool(field, max_size).await? {
                    let mime_type = normalize_mime_type(&content_type).to_lowercase();
                    image = Some((source, filename, mime_type));
                }
            }
            _ => {}
        }
    }

    let complaint = complaint.trim().to_string();
    let Some((image, image_filename, image_content_type)) = image else {
        let mut errors = Vec::new();
        if complaint.is_empty() {
            errors.push(required("complaint"));
        }
        errors.push(required("image"));
        return Err(AppError::Validation {
            message: "Validation failed".to_string(),
            errors,
        });
    };

    Ok(ComplaintForm {
        submission: ComplaintSubmission {
            complaint,
            image_filename,
            image_content_type,
        },
        image,
    })
}

fn required(field: &str) -> FieldError {
    FieldError {
        field: field.to_string(),
        tag: "required".to_string(),
        message: format!("The {} field is required", field),
    }
}

/// Stream one field to a temp file. Empty fields yield `None`.
async fn spool(mut field: Field<'_>, max_size: usize) -> Result<Option<TempFileSource>, AppError> {
    let path = tempfile::NamedTempFile::new()?.into_temp_path();
    let mut file = tokio::fs::File::create(&path).await?;
    let mut written = 0usize;

    while let Some(chunk) = field
        .chunk()
        .await
        .map_err(|e| AppError::BadRequest(format!("Failed to read file data: {}", e)))?
    {
        written += chunk.len();
        if written > max_size {
            return Err(AppError::PayloadTooLarge(format!(
                "Image exceeds maximum allowed size of {} MB",
                max_size / 1024 / 1024
            )));
        }
        file.write_all(&chunk).await?;
    }
    file.flush().await?;

    if written == 0 {
        return Ok(None);
    }
    Ok(Some(TempFileSource::new(path)))
}

/// Strip parameters, e.g. "image/jpeg; charset=utf-8" -> "image/jpeg".
fn normalize_mime_type(content_type: &str) -> &str {
    content_type
        .split(';')
        .next()
        .map(|s| s.trim())
        .unwrap_or(content_type)
}

fn validate_content_type(content_type: &str, allowed_types: &[String]) -> Result<(), AppError> {
    let normalized = normalize_mime_type(content_type).to_lowercase();
    if !allowed_types.iter().any(|ct| normalized == ct.to_lowercase()) {
        return Err(AppError::InvalidInput(format!(
            "Invalid content type. Allowed types: {}",
            allowed_types.join(", ")
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_type_parameters_do_not_bypass_allowlist() {
        let allowed = vec!["image/png".to_string(), "image/jpeg".to_string()];
        assert!(validate_content_type("image/PNG; charset=utf-8", &allowed).is_ok());
        assert!(validate_content_type("text/html; x=image/png", &allowed).is_err());
        assert!(validate_content_type("application/octet-stream", &allowed).is_err());
    }
}
