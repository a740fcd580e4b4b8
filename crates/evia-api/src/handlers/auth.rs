use crate::auth::AuthUser;
use crate::error::{ApiResponse, HttpAppError, ValidatedJson};
use crate::state::AppState;
use axum::{extract::State, response::IntoResponse};
use evia_core::models::{
    ForgetPasswordRequest, LoginRequest, RegisterRequest, ResetPasswordRequest,
    VerifyForgetPasswordOtpRequest,
};
use std::sync::Arc;

pub async fn register(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<RegisterRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let auth = state.auth.register(request).await?;
    Ok(ApiResponse::ok("Register success", auth))
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<LoginRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let auth = state.auth.login(request).await?;
    Ok(ApiResponse::ok("Login success", auth))
}

#[tracing::instrument(skip(state, user), fields(user_id = user.0.id))]
pub async fn me(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<impl IntoResponse, HttpAppError> {
    Ok(ApiResponse::ok("Get user success", state.auth.me(&user.0)))
}

/// Always answers with success once the body is valid, whether or not the
/// email belongs to an account.
pub async fn forget_password(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<ForgetPasswordRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    state.auth.forget_password(request).await?;
    Ok(ApiResponse::<()>::message("Send otp email success"))
}

pub async fn verify_forget_password_otp(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<VerifyForgetPasswordOtpRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let verified = state.auth.verify_forget_password_otp(request).await?;
    Ok(ApiResponse::ok("Forget password otp verified", verified))
}

pub async fn reset_password(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<ResetPasswordRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let reset = state.auth.reset_password(request).await?;
    Ok(ApiResponse::<()>::message(reset.message))
}
