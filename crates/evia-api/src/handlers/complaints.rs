use crate::auth::AuthUser;
use crate::error::{ApiResponse, HttpAppError, ValidatedJson};
use crate::state::AppState;
use crate::utils::upload::read_complaint_form;
use axum::{
    extract::{Multipart, Path, State},
    response::IntoResponse,
};
use evia_core::models::{SimplifyRequest, UpdateComplaintRequest};
use std::sync::Arc;
use uuid::Uuid;

pub async fn simplify(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    ValidatedJson(request): ValidatedJson<SimplifyRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let simplified = state.complaints.simplify(request).await?;
    Ok(ApiResponse::ok("Simplify success", simplified))
}

/// Accept a complaint with a photo of an external wound.
///
/// The image is spooled to a temp file, then uploaded to the AI file store and
/// to object storage concurrently before the analysis runs. The temp file is
/// removed when the request finishes.
#[tracing::instrument(skip(state, user, multipart), fields(user_id = user.0.id))]
pub async fn external_wound(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    multipart: Multipart,
) -> Result<impl IntoResponse, HttpAppError> {
    let form = read_complaint_form(
        multipart,
        state.config.max_image_size_bytes(),
        state.config.allowed_image_content_types(),
    )
    .await?;

    let complaint = state
        .complaints
        .submit(&user.0, form.submission, Arc::new(form.image))
        .await?;
    Ok(ApiResponse::ok("Identify external wound success", complaint))
}

pub async fn get_all(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<impl IntoResponse, HttpAppError> {
    let complaints = state.complaints.get_all(&user.0).await?;
    Ok(ApiResponse::ok("Get all complaint success", complaints))
}

#[tracing::instrument(skip(state, user), fields(user_id = user.0.id, complaint_id = %id))]
pub async fn get_by_id(
    Path(id): Path<Uuid>,
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<impl IntoResponse, HttpAppError> {
    let complaint = state.complaints.get_by_id(&user.0, id).await?;
    Ok(ApiResponse::ok("Get complaint success", complaint))
}

#[tracing::instrument(skip(state, user, request), fields(user_id = user.0.id, complaint_id = %id))]
pub async fn update(
    Path(id): Path<Uuid>,
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ValidatedJson(request): ValidatedJson<UpdateComplaintRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let complaint = state.complaints.update(&user.0, id, request).await?;
    Ok(ApiResponse::ok("Update complaint success", complaint))
}

pub async fn recommended_drugs(
    Path(id): Path<Uuid>,
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<impl IntoResponse, HttpAppError> {
    let drugs = state.complaints.recommended_drugs(&user.0, id).await?;
    Ok(ApiResponse::ok("Get recommended drugs success", drugs))
}
