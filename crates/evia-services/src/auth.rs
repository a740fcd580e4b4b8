//! Account registration, sessions and the password reset flow
//!
//! Session tokens are random UUIDs stored in the database and handed to
//! clients encrypted with [`EncryptionService`]. Password reset is a two-step
//! flow: an emailed six-digit OTP is exchanged for a reset token, which is then
//! presented together with the new password.

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{Duration, Utc};
use evia_core::models::{
    AuthResponse, ForgetPasswordRequest, LoginRequest, MeResponse, OneTimeCodeKind,
    RegisterRequest, ResetPasswordRequest, ResetPasswordResponse, User,
    VerifyForgetPasswordOtpRequest, VerifyForgetPasswordOtpResponse,
};
use evia_core::{AppError, EncryptionService};
use evia_db::{OneTimeCodeStore, SessionStore, UserStore};
use rand::Rng;
use rand_core::OsRng;
use std::sync::Arc;
use subtle::ConstantTimeEq;
use uuid::Uuid;
use validator::Validate;

use crate::email::OtpMailer;

/// Lifetimes used by the auth flows.
#[derive(Debug, Clone)]
pub struct AuthSettings {
    pub session_ttl: Duration,
    pub otp_ttl: Duration,
    /// Pause before answering a reset request for an unknown email.
    pub unknown_email_delay: std::time::Duration,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            session_ttl: Duration::hours(168),
            otp_ttl: Duration::minutes(5),
            unknown_email_delay: std::time::Duration::from_secs(3),
        }
    }
}

#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserStore>,
    sessions: Arc<dyn SessionStore>,
    codes: Arc<dyn OneTimeCodeStore>,
    encryption: EncryptionService,
    mailer: Arc<dyn OtpMailer>,
    settings: AuthSettings,
}

pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool, AppError> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| AppError::Internal(format!("Invalid hash format: {}", e)))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

fn generate_otp() -> String {
    format!("{:06}", rand::rng().random_range(0..1_000_000u32))
}

fn codes_match(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserStore>,
        sessions: Arc<dyn SessionStore>,
        codes: Arc<dyn OneTimeCodeStore>,
        encryption: EncryptionService,
        mailer: Arc<dyn OtpMailer>,
        settings: AuthSettings,
    ) -> Self {
        Self {
            users,
            sessions,
            codes,
            encryption,
            mailer,
            settings,
        }
    }

    #[tracing::instrument(skip(self, request), fields(email = %request.email))]
    pub async fn register(&self, request: RegisterRequest) -> Result<AuthResponse, AppError> {
        request.validate()?;

        if self.users.find_by_email(&request.email).await?.is_some() {
            return Err(AppError::BadRequest("Email already registered".to_string()));
        }

        let password_hash = hash_password(&request.password)?;
        let token = Uuid::new_v4();
        let (user, _session) = self
            .users
            .create_with_session(
                &request.email,
                &password_hash,
                token,
                Utc::now() + self.settings.session_ttl,
            )
            .await?;

        tracing::info!(user_id = user.id, "User registered");
        self.auth_response(&user, token)
    }

    #[tracing::instrument(skip(self, request), fields(email = %request.email))]
    pub async fn login(&self, request: LoginRequest) -> Result<AuthResponse, AppError> {
        request.validate()?;
        let invalid = || AppError::Conflict("Invalid Credentials".to_string());

        let user = self
            .users
            .find_by_email(&request.email)
            .await?
            .ok_or_else(invalid)?;
        if !verify_password(&request.password, &user.password_hash)? {
            return Err(invalid());
        }

        let token = Uuid::new_v4();
        self.sessions
            .create(user.id, token, Utc::now() + self.settings.session_ttl)
            .await?;

        self.auth_response(&user, token)
    }

    pub fn me(&self, user: &User) -> MeResponse {
        MeResponse::from(user)
    }

    /// Resolve the `Authorization` header value to its user.
    ///
    /// Accepts the bare token or `Bearer <token>`.
    pub async fn authenticate(&self, header: Option<&str>) -> Result<User, AppError> {
        let raw = header
            .map(str::trim)
            .map(|h| match h.strip_prefix("Bearer") {
                Some(rest) if rest.is_empty() || rest.starts_with(char::is_whitespace) => {
                    rest.trim()
                }
                _ => h,
            })
            .filter(|h| !h.is_empty())
            .ok_or_else(|| AppError::BadRequest("Missing access token".to_string()))?;

        let invalid = || AppError::Unauthorized("Invalid token".to_string());
        let token = Uuid::parse_str(&self.encryption.decrypt(raw)?).map_err(|_| invalid())?;

        let session = self
            .sessions
            .find_by_token(token)
            .await?
            .ok_or_else(invalid)?;
        if session.is_expired(Utc::now()) {
            return Err(AppError::Unauthorized("Session expired".to_string()));
        }

        self.users
            .find_by_id(session.user_id)
            .await?
            .ok_or_else(invalid)
    }

    #[tracing::instrument(skip(self, request), fields(email = %request.email))]
    pub async fn forget_password(&self, request: ForgetPasswordRequest) -> Result<(), AppError> {
        request.validate()?;

        if self.users.find_by_email(&request.email).await?.is_none() {
            // Same outcome as a known address, a little later.
            tokio::time::sleep(self.settings.unknown_email_delay).await;
            return Ok(());
        }

        let otp = generate_otp();
        self.codes
            .put(
                &OneTimeCodeKind::Otp.key_for(&request.email),
                &otp,
                self.settings.otp_ttl,
            )
            .await?;
        self.mailer.send_otp(&request.email, &otp).await
    }

    #[tracing::instrument(skip(self, request), fields(email = %request.email))]
    pub async fn verify_forget_password_otp(
        &self,
        request: VerifyForgetPasswordOtpRequest,
    ) -> Result<VerifyForgetPasswordOtpResponse, AppError> {
        request.validate()?;

        let key = OneTimeCodeKind::Otp.key_for(&request.email);
        let stored = self.codes.get(&key).await?;
        match stored {
            Some(otp) if codes_match(&otp, request.otp.trim()) => {}
            _ => return Err(AppError::BadRequest("Invalid OTP".to_string())),
        }
        self.codes.delete(&key).await?;

        let reset_token = Uuid::new_v4().to_string();
        self.codes
            .put(
                &OneTimeCodeKind::ResetPassword.key_for(&request.email),
                &reset_token,
                self.settings.otp_ttl,
            )
            .await?;

        Ok(VerifyForgetPasswordOtpResponse {
            email: request.email,
            reset_password_token: self.encryption.encrypt(&reset_token)?,
        })
    }

    #[tracing::instrument(skip(self, request), fields(email = %request.email))]
    pub async fn reset_password(
        &self,
        request: ResetPasswordRequest,
    ) -> Result<ResetPasswordResponse, AppError> {
        request.validate()?;
        let invalid = || AppError::BadRequest("Invalid reset password token".to_string());

        let presented = self
            .encryption
            .decrypt(&request.reset_password_token)
            .map_err(|_| invalid())?;
        let key = OneTimeCodeKind::ResetPassword.key_for(&request.email);
        match self.codes.get(&key).await? {
            Some(stored) if codes_match(&stored, &presented) => {}
            _ => return Err(invalid()),
        }

        let password_hash = hash_password(&request.password)?;
        if !self
            .users
            .update_password(&request.email, &password_hash)
            .await?
        {
            return Err(AppError::NotFound("User not found".to_string()));
        }
        self.codes.delete(&key).await?;

        tracing::info!("Password reset");
        Ok(ResetPasswordResponse {
            message: "Success Reset Password".to_string(),
        })
    }

    fn auth_response(&self, user: &User, token: Uuid) -> Result<AuthResponse, AppError> {
        Ok(AuthResponse {
            id: user.id,
            email: user.email.clone(),
            token: self.encryption.encrypt(&token.to_string())?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use evia_db::memory::MemoryStore;
    use std::sync::Mutex;

    #[derive(Default)]
    struct CapturingMailer {
        sent: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl OtpMailer for CapturingMailer {
        async fn send_otp(&self, email: &str, otp: &str) -> Result<(), AppError> {
            self.sent
                .lock()
                .unwrap()
                .push((email.to_string(), otp.to_string()));
            Ok(())
        }
    }

    struct Fixture {
        service: AuthService,
        store: MemoryStore,
        mailer: Arc<CapturingMailer>,
    }

    fn fixture() -> Fixture {
        let store = MemoryStore::new();
        let mailer = Arc::new(CapturingMailer::default());
        let service = AuthService::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            EncryptionService::from_key_bytes(&[7u8; 32]).unwrap(),
            mailer.clone(),
            AuthSettings {
                unknown_email_delay: std::time::Duration::from_millis(1),
                ..Default::default()
            },
        );
        Fixture {
            service,
            store,
            mailer,
        }
    }

    fn register_request(email: &str) -> RegisterRequest {
        RegisterRequest {
            email: email.to_string(),
            password: "correct horse".to_string(),
            password_confirmation: "correct horse".to_string(),
        }
    }

    #[tokio::test]
    async fn register_then_authenticate_with_bearer_token() {
        let f = fixture();
        let registered = f
            .service
            .register(register_request("ana@example.com"))
            .await
            .unwrap();
        assert_eq!(registered.email, "ana@example.com");
        assert_eq!(f.store.sessions().len(), 1);

        let user = f
            .service
            .authenticate(Some(&format!("Bearer {}", registered.token)))
            .await
            .unwrap();
        assert_eq!(user.id, registered.id);

        let raw = f
            .service
            .authenticate(Some(&registered.token))
            .await
            .unwrap();
        assert_eq!(raw.id, registered.id);
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let f = fixture();
        f.service
            .register(register_request("ana@example.com"))
            .await
            .unwrap();
        let err = f
            .service
            .register(register_request("ana@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(ref m) if m == "Email already registered"));
    }

    #[tokio::test]
    async fn register_validates_confirmation() {
        let f = fixture();
        let mut request = register_request("ana@example.com");
        request.password_confirmation = "something else".to_string();
        let err = f.service.register(request).await.unwrap_err();
        match err {
            AppError::Validation { errors, .. } => {
                assert_eq!(errors.len(), 1);
                assert_eq!(errors[0].field, "password_confirmation");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn login_with_wrong_password_is_a_conflict() {
        let f = fixture();
        f.service
            .register(register_request("ana@example.com"))
            .await
            .unwrap();

        let ok = f
            .service
            .login(LoginRequest {
                email: "ana@example.com".to_string(),
                password: "correct horse".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(f.store.sessions().len(), 2);
        assert!(!ok.token.is_empty());

        for (email, password) in [
            ("ana@example.com", "wrong password"),
            ("nobody@example.com", "correct horse"),
        ] {
            let err = f
                .service
                .login(LoginRequest {
                    email: email.to_string(),
                    password: password.to_string(),
                })
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::Conflict(ref m) if m == "Invalid Credentials"));
        }
    }

    #[tokio::test]
    async fn missing_garbled_and_expired_tokens_are_rejected() {
        let f = fixture();
        let err = f.service.authenticate(None).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(ref m) if m == "Missing access token"));
        for blank in ["", "   ", "Bearer", "Bearer ", "  Bearer   "] {
            let err = f.service.authenticate(Some(blank)).await.unwrap_err();
            assert!(
                matches!(err, AppError::BadRequest(ref m) if m == "Missing access token"),
                "{:?} -> {:?}",
                blank,
                err
            );
        }

        let err = f.service.authenticate(Some("garbage")).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));

        let user = f.store.add_user("old@example.com", "h");
        let token = Uuid::new_v4();
        f.store
            .add_session(user.id, token, Utc::now() - Duration::minutes(1));
        let encrypted = EncryptionService::from_key_bytes(&[7u8; 32])
            .unwrap()
            .encrypt(&token.to_string())
            .unwrap();
        let err = f.service.authenticate(Some(&encrypted)).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(ref m) if m == "Session expired"));
    }

    #[tokio::test]
    async fn full_password_reset_flow() {
        let f = fixture();
        f.service
            .register(register_request("ana@example.com"))
            .await
            .unwrap();

        f.service
            .forget_password(ForgetPasswordRequest {
                email: "ana@example.com".to_string(),
            })
            .await
            .unwrap();
        let (to, otp) = f.mailer.sent.lock().unwrap()[0].clone();
        assert_eq!(to, "ana@example.com");
        assert_eq!(otp.len(), 6);
        assert!(otp.chars().all(|c| c.is_ascii_digit()));

        let verified = f
            .service
            .verify_forget_password_otp(VerifyForgetPasswordOtpRequest {
                email: "ana@example.com".to_string(),
                otp: otp.clone(),
            })
            .await
            .unwrap();
        assert!(f.store.code("otp:ana@example.com").is_none());

        // The OTP is single use.
        assert!(f
            .service
            .verify_forget_password_otp(VerifyForgetPasswordOtpRequest {
                email: "ana@example.com".to_string(),
                otp,
            })
            .await
            .is_err());

        let response = f
            .service
            .reset_password(ResetPasswordRequest {
                email: "ana@example.com".to_string(),
                password: "battery staple".to_string(),
                password_confirmation: "battery staple".to_string(),
                reset_password_token: verified.reset_password_token.clone(),
            })
            .await
            .unwrap();
        assert_eq!(response.message, "Success Reset Password");
        assert!(f.store.code("reset-password:ana@example.com").is_none());

        f.service
            .login(LoginRequest {
                email: "ana@example.com".to_string(),
                password: "battery staple".to_string(),
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn wrong_or_expired_otp_is_invalid() {
        let f = fixture();
        f.store.add_user("ana@example.com", "h");
        f.service
            .forget_password(ForgetPasswordRequest {
                email: "ana@example.com".to_string(),
            })
            .await
            .unwrap();
        let otp = f.store.code("otp:ana@example.com").unwrap();
        let wrong = if otp == "000000" { "111111" } else { "000000" };

        let err = f
            .service
            .verify_forget_password_otp(VerifyForgetPasswordOtpRequest {
                email: "ana@example.com".to_string(),
                otp: wrong.to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(ref m) if m == "Invalid OTP"));

        f.store.expire_code("otp:ana@example.com");
        assert!(f
            .service
            .verify_forget_password_otp(VerifyForgetPasswordOtpRequest {
                email: "ana@example.com".to_string(),
                otp,
            })
            .await
            .is_err());
    }

    #[tokio::test]
    async fn unknown_email_gets_no_otp() {
        let f = fixture();
        f.service
            .forget_password(ForgetPasswordRequest {
                email: "ghost@example.com".to_string(),
            })
            .await
            .unwrap();
        assert!(f.mailer.sent.lock().unwrap().is_empty());
        assert!(f.store.code("otp:ghost@example.com").is_none());
    }

    #[tokio::test]
    async fn reset_requires_the_issued_token() {
        let f = fixture();
        f.store.add_user("ana@example.com", "h");
        let forged = EncryptionService::from_key_bytes(&[7u8; 32])
            .unwrap()
            .encrypt(&Uuid::new_v4().to_string())
            .unwrap();

        let err = f
            .service
            .reset_password(ResetPasswordRequest {
                email: "ana@example.com".to_string(),
                password: "battery staple".to_string(),
                password_confirmation: "battery staple".to_string(),
                reset_password_token: forged,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
        assert_eq!(f.store.user_by_email("ana@example.com").unwrap().password_hash, "h");
    }

    #[test]
    fn password_hash_round_trip() {
        let hash = hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("correct horse", &hash).unwrap());
        assert!(!verify_password("wrong", &hash).unwrap());
    }
}
