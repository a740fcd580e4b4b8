use axum::extract::FromRequestParts;
use axum::http::{header::AUTHORIZATION, request::Parts};
use evia_core::models::User;
use std::sync::Arc;

use crate::error::HttpAppError;
use crate::state::AppState;

/// The authenticated caller, resolved from the `Authorization` header.
///
/// Handlers take this as an argument and pass the user on to services.
/// It only reads request parts, so it can precede `Multipart`.
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = HttpAppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok());

        let user = state.auth.authenticate(header).await?;
        Ok(AuthUser(user))
    }
}
