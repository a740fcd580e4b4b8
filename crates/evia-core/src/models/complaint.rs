use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Stored complaint. `response` keeps the raw JSON returned by the AI model.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Complaint {
    pub id: Uuid,
    pub user_id: i64,
    pub title: String,
    pub complaint_msg: String,
    pub response: String,
    pub image_url: String,
    pub created_at: DateTime<Utc>,
}

/// Structured assessment produced by the model for an image complaint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplaintAnalysis {
    pub overview: String,
    pub conclusion: String,
    pub suggested_title: String,
    pub details: ComplaintDetails,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplaintDetails {
    pub symptoms: String,
    pub handling: String,
    pub drug: String,
    pub reason: String,
    pub precautions: String,
}

impl ComplaintAnalysis {
    /// Parse the model's JSON text.
    pub fn parse(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw.trim())
    }

    /// Candidate drug names mentioned in `details.drug`.
    ///
    /// The model answers in free text ("Paracetamol, ibuprofen or
    /// hydrocortisone cream"), so the field is split on list separators.
    pub fn drug_candidates(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        let normalized = self
            .details
            .drug
            .replace(" or ", ",")
            .replace(" and ", ",")
            .replace(" atau ", ",")
            .replace(" dan ", ",");

        for part in normalized.split([',', ';', '\n', '/']) {
            let name = part
                .trim()
                .trim_matches(|c: char| !c.is_alphanumeric())
                .to_string();
            if name.len() < 3 {
                continue;
            }
            if !names.iter().any(|n| n.eq_ignore_ascii_case(&name)) {
                names.push(name);
            }
        }

        names
    }
}

/// Multipart fields of an image complaint, after the image has been spooled.
#[derive(Debug, Validate)]
pub struct ComplaintSubmission {
    #[validate(length(min = 1, code = "required"))]
    pub complaint: String,
    #[validate(length(min = 1, code = "required"))]
    pub image_filename: String,
    pub image_content_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplaintResponse {
    pub complaint_id: Uuid,
    pub title: String,
    pub response: ComplaintAnalysis,
    pub image_url: String,
}

impl ComplaintResponse {
    pub fn from_stored(complaint: &Complaint) -> Result<Self, serde_json::Error> {
        Ok(ComplaintResponse {
            complaint_id: complaint.id,
            title: complaint.title.clone(),
            response: ComplaintAnalysis::parse(&complaint.response)?,
            image_url: complaint.image_url.clone(),
        })
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct SimplifyRequest {
    #[serde(default)]
    #[validate(length(min = 1, code = "required"))]
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SimplifyResponse {
    pub message: String,
    pub simplified_msg: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateComplaintRequest {
    #[serde(default)]
    #[validate(length(min = 1, code = "required"))]
    pub suggested_title: String,
}
