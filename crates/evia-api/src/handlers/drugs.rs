use crate::auth::AuthUser;
use crate::error::{ApiResponse, HttpAppError};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
};
use std::sync::Arc;

pub async fn get_by_id(
    Path(id): Path<i64>,
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
) -> Result<impl IntoResponse, HttpAppError> {
    let drug = state.drugs.get_by_id(id).await?;
    Ok(ApiResponse::ok("Get drug success", drug))
}
