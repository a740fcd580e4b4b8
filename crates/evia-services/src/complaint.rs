//! Complaint submission and retrieval
//!
//! `submit` runs the full image pipeline: concurrent uploads, then the AI
//! analysis seeded with the uploaded file, then a transactional insert. Later
//! steps never start unless the earlier ones succeeded.

use chrono::Utc;
use evia_core::models::{
    Complaint, ComplaintAnalysis, ComplaintResponse, ComplaintSubmission, DrugResponse,
    SimplifyRequest, SimplifyResponse, UpdateComplaintRequest, User,
};
use evia_core::AppError;
use evia_db::{ComplaintStore, DrugStore};
use evia_storage::complaint_image_key;
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::gemini::{AiChat, ChatPart, GenerationMode};
use crate::upload::{
    FileSource, JoinedUploadOutcome, UploadCoordinator, UploadFailure, UploadRequest,
};

/// Display name given to every image in the AI file store.
const AI_FILE_DISPLAY_NAME: &str = "uploaded-image";

#[derive(Clone)]
pub struct ComplaintService {
    complaints: Arc<dyn ComplaintStore>,
    drugs: Arc<dyn DrugStore>,
    chat: Arc<dyn AiChat>,
    uploads: UploadCoordinator,
}

impl ComplaintService {
    pub fn new(
        complaints: Arc<dyn ComplaintStore>,
        drugs: Arc<dyn DrugStore>,
        chat: Arc<dyn AiChat>,
        uploads: UploadCoordinator,
    ) -> Self {
        Self {
            complaints,
            drugs,
            chat,
            uploads,
        }
    }

    #[tracing::instrument(skip(self, user, submission, source), fields(user_id = user.id))]
    pub async fn submit(
        &self,
        user: &User,
        submission: ComplaintSubmission,
        source: Arc<dyn FileSource>,
    ) -> Result<ComplaintResponse, AppError> {
        submission.validate()?;

        let request = UploadRequest {
            mime_type: submission.image_content_type.clone(),
            storage_key: complaint_image_key(user.id, &submission.image_filename),
            display_name: AI_FILE_DISPLAY_NAME.to_string(),
        };
        let (file_uri, image_url) = match self.uploads.run(source, request).await {
            JoinedUploadOutcome::Both {
                file_uri,
                image_location,
            } => (file_uri, image_location),
            JoinedUploadOutcome::Failed { task, cause } => {
                let message = format!("Image upload failed ({}): {}", task, cause);
                return Err(match cause {
                    UploadFailure::ObjectStorage(_) => AppError::Storage(message),
                    UploadFailure::AiFileStore(_) => AppError::Ai(message),
                    UploadFailure::Source(_) | UploadFailure::Aborted(_) => {
                        AppError::Internal(message)
                    }
                });
            }
        };

        let raw = self
            .chat
            .send_message(
                GenerationMode::ComplaintAnalysis,
                vec![ChatPart::File {
                    uri: file_uri,
                    mime_type: submission.image_content_type,
                }],
                &submission.complaint,
            )
            .await
            .map_err(|e| AppError::Ai(e.to_string()))?;

        let analysis = ComplaintAnalysis::parse(&raw)
            .map_err(|e| AppError::Internal(format!("Failed to parse AI response: {}", e)))?;

        let complaint = Complaint {
            id: Uuid::new_v4(),
            user_id: user.id,
            title: analysis.suggested_title.clone(),
            complaint_msg: submission.complaint,
            response: raw.trim().to_string(),
            image_url,
            created_at: Utc::now(),
        };
        self.complaints.insert(&complaint).await?;

        tracing::info!(complaint_id = %complaint.id, "Complaint created");
        Ok(ComplaintResponse {
            complaint_id: complaint.id,
            title: complaint.title,
            response: analysis,
            image_url: complaint.image_url,
        })
    }

    /// Rewrite a medical text in plain language.
    pub async fn simplify(&self, request: SimplifyRequest) -> Result<SimplifyResponse, AppError> {
        request.validate()?;

        let simplified = self
            .chat
            .send_message(GenerationMode::Simplifier, Vec::new(), &request.message)
            .await
            .map_err(|e| AppError::Ai(e.to_string()))?;

        Ok(SimplifyResponse {
            message: request.message,
            simplified_msg: simplified.trim().to_string(),
        })
    }

    pub async fn get_by_id(&self, user: &User, id: Uuid) -> Result<ComplaintResponse, AppError> {
        let complaint = self.owned(user, id).await?;
        to_response(&complaint)
    }

    pub async fn get_all(&self, user: &User) -> Result<Vec<ComplaintResponse>, AppError> {
        self.complaints
            .find_by_user(user.id)
            .await?
            .iter()
            .map(to_response)
            .collect()
    }

    pub async fn update(
        &self,
        user: &User,
        id: Uuid,
        request: UpdateComplaintRequest,
    ) -> Result<ComplaintResponse, AppError> {
        request.validate()?;
        self.owned(user, id).await?;

        let updated = self
            .complaints
            .update_title(id, request.suggested_title.trim())
            .await?
            .ok_or_else(not_found)?;
        to_response(&updated)
    }

    /// Catalogue drugs named in the complaint's `details.drug` advice.
    pub async fn recommended_drugs(
        &self,
        user: &User,
        id: Uuid,
    ) -> Result<Vec<DrugResponse>, AppError> {
        let complaint = self.owned(user, id).await?;
        let analysis = ComplaintAnalysis::parse(&complaint.response)
            .map_err(|e| AppError::Internal(format!("Stored AI response is invalid: {}", e)))?;

        let mut seen = HashSet::new();
        let mut drugs = Vec::new();
        for name in analysis.drug_candidates() {
            for drug in self.drugs.search_by_name(&name).await? {
                if seen.insert(drug.id) {
                    drugs.push(DrugResponse::from(drug));
                }
            }
        }
        Ok(drugs)
    }

    /// Fetch a complaint and check it belongs to `user`.
    async fn owned(&self, user: &User, id: Uuid) -> Result<Complaint, AppError> {
        let complaint = self
            .complaints
            .find_by_id(id)
            .await?
            .ok_or_else(not_found)?;

        if complaint.user_id != user.id {
            tracing::warn!(complaint_id = %id, user_id = user.id, "Complaint access denied");
            return Err(AppError::Forbidden(
                "You are not authorized to access this complaint".to_string(),
            ));
        }
        Ok(complaint)
    }
}

fn not_found() -> AppError {
    AppError::NotFound("Complaint not found".to_string())
}

fn to_response(complaint: &Complaint) -> Result<ComplaintResponse, AppError> {
    ComplaintResponse::from_stored(complaint)
        .map_err(|e| AppError::Internal(format!("Stored AI response is invalid: {}", e)))
}
