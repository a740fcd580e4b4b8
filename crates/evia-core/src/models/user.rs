use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Registered account
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Login session. The token is stored raw and only leaves the service encrypted.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Session {
    pub id: i64,
    pub user_id: i64,
    pub token: Uuid,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[serde(default)]
    #[validate(
        length(min = 1, code = "required"),
        email
    )]
    pub email: String,
    #[serde(default)]
    #[validate(length(min = 8, max = 255))]
    pub password: String,
    #[serde(default)]
    #[validate(must_match(other = "password", code = "eqfield"))]
    pub password_confirmation: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[serde(default)]
    #[validate(length(min = 1, code = "required"), email)]
    pub email: String,
    #[serde(default)]
    #[validate(length(min = 8, max = 255))]
    pub password: String,
}

/// Returned by register and login
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthResponse {
    pub id: i64,
    pub email: String,
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MeResponse {
    pub id: i64,
    pub email: String,
}

impl From<&User> for MeResponse {
    fn from(user: &User) -> Self {
        MeResponse {
            id: user.id,
            email: user.email.clone(),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct ForgetPasswordRequest {
    #[serde(default)]
    #[validate(length(min = 1, code = "required"), email)]
    pub email: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct VerifyForgetPasswordOtpRequest {
    #[serde(default)]
    #[validate(length(min = 1, code = "required"), email)]
    pub email: String,
    #[serde(default)]
    #[validate(length(min = 1, code = "required"))]
    pub otp: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VerifyForgetPasswordOtpResponse {
    pub email: String,
    pub reset_password_token: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ResetPasswordRequest {
    #[serde(default)]
    #[validate(length(min = 1, code = "required"), email)]
    pub email: String,
    #[serde(default)]
    #[validate(length(min = 8, max = 255))]
    pub password: String,
    #[serde(default)]
    #[validate(must_match(other = "password", code = "eqfield"))]
    pub password_confirmation: String,
    #[serde(default)]
    #[validate(length(min = 1, code = "required"))]
    pub reset_password_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResetPasswordResponse {
    pub message: String,
}
