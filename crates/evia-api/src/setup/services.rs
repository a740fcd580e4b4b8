//! Service wiring
//!
//! Builds the repositories, the Gemini client, the upload coordinator and the
//! domain services, and starts the background purge of expired reset codes.

use crate::constants::CODE_PURGE_INTERVAL_SECS;
use crate::state::AppState;
use anyhow::{Context, Result};
use chrono::Duration;
use evia_core::{Config, EncryptionService};
use evia_db::{
    ComplaintRepository, ComplaintStore, DrugRepository, DrugStore, OneTimeCodeRepository,
    OneTimeCodeStore, SessionRepository, SessionStore, UserRepository, UserStore,
};
use evia_services::{
    AiChat, AiFileStore, AiFileUploadTask, AuthService, AuthSettings, ComplaintService,
    DrugService, EmailService, GeminiClient, LogMailer, ObjectStorageUploadTask, OtpMailer,
    UploadCoordinator,
};
use evia_storage::Storage;
use sqlx::PgPool;
use std::sync::Arc;

/// Everything the services talk to.
pub struct Backends {
    pub users: Arc<dyn UserStore>,
    pub sessions: Arc<dyn SessionStore>,
    pub complaints: Arc<dyn ComplaintStore>,
    pub drugs: Arc<dyn DrugStore>,
    pub codes: Arc<dyn OneTimeCodeStore>,
    pub ai_files: Arc<dyn AiFileStore>,
    pub chat: Arc<dyn AiChat>,
    pub storage: Arc<dyn Storage>,
    pub mailer: Arc<dyn OtpMailer>,
}

/// Initialize all services against Postgres, Gemini and the configured storage.
pub fn initialize_services(
    config: &Config,
    pool: PgPool,
    storage: Arc<dyn Storage>,
) -> Result<Arc<AppState>> {
    let gemini = Arc::new(GeminiClient::new(config.ai()).context("Failed to build Gemini client")?);
    tracing::info!(model = %config.ai().model, "Gemini client initialized");

    let mailer: Arc<dyn OtpMailer> = match config.smtp().and_then(EmailService::from_config) {
        Some(email) => {
            tracing::info!("SMTP mailer initialized");
            Arc::new(email)
        }
        None => {
            tracing::warn!("SMTP not configured, password reset codes will only be logged");
            Arc::new(LogMailer)
        }
    };

    let codes = OneTimeCodeRepository::new(pool.clone());
    spawn_code_purge(codes.clone());

    let backends = Backends {
        users: Arc::new(UserRepository::new(pool.clone())),
        sessions: Arc::new(SessionRepository::new(pool.clone())),
        complaints: Arc::new(ComplaintRepository::new(pool.clone())),
        drugs: Arc::new(DrugRepository::new(pool.clone())),
        codes: Arc::new(codes),
        ai_files: gemini.clone(),
        chat: gemini,
        storage,
        mailer,
    };

    build_state(config, pool, backends)
}

/// Assemble the application state from already-built backends.
pub fn build_state(config: &Config, pool: PgPool, backends: Backends) -> Result<Arc<AppState>> {
    let encryption = EncryptionService::from_base64_key(config.app_key())
        .context("APP_KEY must be a base64-encoded 32-byte key")?;

    let settings = AuthSettings {
        session_ttl: Duration::hours(config.session_ttl_hours()),
        otp_ttl: Duration::minutes(config.otp_ttl_minutes()),
        ..AuthSettings::default()
    };
    let auth = AuthService::new(
        backends.users,
        backends.sessions,
        backends.codes,
        encryption,
        backends.mailer,
        settings,
    );

    let uploads = UploadCoordinator::new(
        Arc::new(AiFileUploadTask::new(backends.ai_files)),
        Arc::new(ObjectStorageUploadTask::new(backends.storage)),
    );
    let complaints = ComplaintService::new(
        backends.complaints,
        backends.drugs.clone(),
        backends.chat,
        uploads,
    );
    let drugs = DrugService::new(backends.drugs);

    Ok(Arc::new(AppState {
        config: config.clone(),
        pool,
        auth,
        complaints,
        drugs,
    }))
}

fn spawn_code_purge(codes: OneTimeCodeRepository) {
    tokio::spawn(async move {
        let mut interval =
            tokio::time::interval(std::time::Duration::from_secs(CODE_PURGE_INTERVAL_SECS));
        loop {
            interval.tick().await;
            match codes.purge_expired().await {
                Ok(0) => {}
                Ok(deleted) => tracing::debug!(deleted, "Purged expired one-time codes"),
                Err(e) => tracing::warn!(error = %e, "Failed to purge expired one-time codes"),
            }
        }
    });
}
