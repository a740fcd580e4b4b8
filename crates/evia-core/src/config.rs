//! Configuration module
//!
//! This module provides the configuration structures for the API and its
//! services: server, database, token encryption, the generative AI provider,
//! object storage and outgoing mail.

use std::env;

use crate::storage_types::StorageBackend;

// Common constants
const SERVER_PORT: u16 = 3000;
const MAX_CONNECTIONS: u32 = 20;
const CONNECTION_TIMEOUT_SECS: u64 = 30;
const SESSION_TTL_HOURS: i64 = 24 * 7;
const OTP_TTL_MINUTES: i64 = 5;
const MAX_IMAGE_SIZE_MB: usize = 10;
const GEMINI_MODEL: &str = "gemini-1.5-flash";
const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const AI_TIMEOUT_SECS: u64 = 120;

/// Server-level configuration
#[derive(Clone, Debug)]
pub struct BaseConfig {
    pub server_port: u16,
    pub cors_origins: Vec<String>,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    pub environment: String,
    /// Base64-encoded 32-byte AES key used to encrypt client tokens
    pub app_key: String,
    pub session_ttl_hours: i64,
    pub otp_ttl_minutes: i64,
    pub max_image_size_bytes: usize,
    pub allowed_image_content_types: Vec<String>,
}

/// Generative AI provider configuration
#[derive(Clone, Debug)]
pub struct AiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub timeout_secs: u64,
    pub complaint_system_instruction: String,
    pub simplifier_system_instruction: String,
}

/// Outgoing mail configuration. Absent when `SMTP_HOST` is not set.
#[derive(Clone, Debug)]
pub struct SmtpConfig {
    pub host: String,
    pub port: Option<u16>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub from: String,
    pub tls: bool,
}

/// Full service configuration
#[derive(Clone, Debug)]
pub struct EviaConfig {
    pub base: BaseConfig,
    pub database_url: String,
    pub ai: AiConfig,
    // Storage configuration
    pub storage_backend: StorageBackend,
    pub s3_bucket: Option<String>,
    pub s3_region: Option<String>,
    pub s3_endpoint: Option<String>, // Custom endpoint for S3-compatible providers (MinIO, etc.)
    pub local_storage_path: Option<String>,
    pub local_storage_base_url: Option<String>,
    pub smtp: Option<SmtpConfig>,
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config(pub Box<EviaConfig>);

impl Config {
    fn inner(&self) -> &EviaConfig {
        &self.0
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.inner().base.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        let config = EviaConfig::from_env()?;
        Ok(Config(Box::new(config)))
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.inner().validate()
    }

    // Convenience getters for common fields
    pub fn server_port(&self) -> u16 {
        self.inner().base.server_port
    }

    pub fn cors_origins(&self) -> &[String] {
        &self.inner().base.cors_origins
    }

    pub fn db_max_connections(&self) -> u32 {
        self.inner().base.db_max_connections
    }

    pub fn db_timeout_seconds(&self) -> u64 {
        self.inner().base.db_timeout_seconds
    }

    pub fn database_url(&self) -> &str {
        &self.inner().database_url
    }

    pub fn app_key(&self) -> &str {
        &self.inner().base.app_key
    }

    pub fn session_ttl_hours(&self) -> i64 {
        self.inner().base.session_ttl_hours
    }

    pub fn otp_ttl_minutes(&self) -> i64 {
        self.inner().base.otp_ttl_minutes
    }

    pub fn max_image_size_bytes(&self) -> usize {
        self.inner().base.max_image_size_bytes
    }

    pub fn allowed_image_content_types(&self) -> &[String] {
        &self.inner().base.allowed_image_content_types
    }

    pub fn ai(&self) -> &AiConfig {
        &self.inner().ai
    }

    pub fn storage_backend(&self) -> StorageBackend {
        self.inner().storage_backend
    }

    pub fn s3_bucket(&self) -> Option<&str> {
        self.inner().s3_bucket.as_deref()
    }

    pub fn s3_region(&self) -> Option<&str> {
        self.inner().s3_region.as_deref()
    }

    pub fn s3_endpoint(&self) -> Option<&str> {
        self.inner().s3_endpoint.as_deref()
    }

    pub fn local_storage_path(&self) -> Option<&str> {
        self.inner().local_storage_path.as_deref()
    }

    pub fn local_storage_base_url(&self) -> Option<&str> {
        self.inner().local_storage_base_url.as_deref()
    }

    pub fn smtp(&self) -> Option<&SmtpConfig> {
        self.inner().smtp.as_ref()
    }
}

impl EviaConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(var: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            var(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| anyhow::anyhow!("{} must be set", key))
        };

        let environment = var("ENVIRONMENT")
            .or_else(|| var("APP_ENV"))
            .unwrap_or_else(|| "development".to_string());

        let cors_origins_str = var("CORS_ORIGINS").unwrap_or_else(|| "*".to_string());
        let is_production =
            environment.to_lowercase() == "production" || environment.to_lowercase() == "prod";
        if is_production && cors_origins_str.trim() == "*" {
            return Err(anyhow::anyhow!(
                "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }

        let cors_origins: Vec<String> = cors_origins_str
            .split(',')
            .map(|s| s.trim().to_string())
            .collect();

        let max_image_size_mb = var("MAX_IMAGE_SIZE_MB")
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(MAX_IMAGE_SIZE_MB);

        let allowed_image_content_types = var("ALLOWED_IMAGE_CONTENT_TYPES")
            .unwrap_or_else(|| "image/jpeg,image/png,image/webp,image/heic".to_string())
            .split(',')
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();

        let base = BaseConfig {
            server_port: match var("PORT") {
                Some(port) => port
                    .parse()
                    .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?,
                None => SERVER_PORT,
            },
            cors_origins,
            db_max_connections: var("DB_MAX_CONNECTIONS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(MAX_CONNECTIONS),
            db_timeout_seconds: var("DB_TIMEOUT_SECONDS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(CONNECTION_TIMEOUT_SECS),
            environment,
            app_key: required("APP_KEY")?,
            session_ttl_hours: var("SESSION_TTL_HOURS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(SESSION_TTL_HOURS),
            otp_ttl_minutes: var("OTP_TTL_MINUTES")
                .and_then(|v| v.parse().ok())
                .unwrap_or(OTP_TTL_MINUTES),
            max_image_size_bytes: max_image_size_mb * 1024 * 1024,
            allowed_image_content_types,
        };

        let ai = AiConfig {
            api_key: required("GEMINI_API_KEY")?,
            model: var("GEMINI_MODEL")
                .or_else(|| var("MODEL"))
                .unwrap_or_else(|| GEMINI_MODEL.to_string()),
            base_url: var("GEMINI_BASE_URL").unwrap_or_else(|| GEMINI_BASE_URL.to_string()),
            timeout_secs: var("GEMINI_TIMEOUT_SECONDS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(AI_TIMEOUT_SECS),
            complaint_system_instruction: var("EVIA_SYSTEM_INSTRUCTION").unwrap_or_default(),
            simplifier_system_instruction: var("SIMPLIFIER_SYSTEM_INSTRUCTION")
                .unwrap_or_default(),
        };

        let storage_backend = match var("STORAGE_BACKEND") {
            Some(backend) => backend.parse()?,
            None => StorageBackend::S3,
        };

        let smtp = var("SMTP_HOST")
            .filter(|h| !h.trim().is_empty())
            .map(|host| SmtpConfig {
                host,
                port: var("SMTP_PORT").and_then(|v| v.parse().ok()),
                user: var("SMTP_USER"),
                password: var("SMTP_PASSWORD"),
                from: var("SMTP_FROM").unwrap_or_else(|| "no-reply@evia.app".to_string()),
                tls: var("SMTP_TLS")
                    .map(|v| v.to_lowercase() != "false")
                    .unwrap_or(true),
            });

        Ok(EviaConfig {
            base,
            database_url: required("DATABASE_URL")?,
            ai,
            storage_backend,
            s3_bucket: var("AWS_BUCKET_NAME").or_else(|| var("S3_BUCKET")),
            s3_region: var("AWS_REGION").or_else(|| var("S3_REGION")),
            s3_endpoint: var("S3_ENDPOINT"),
            local_storage_path: var("LOCAL_STORAGE_PATH"),
            local_storage_base_url: var("LOCAL_STORAGE_BASE_URL"),
            smtp,
        })
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if !self.database_url.starts_with("postgres://")
            && !self.database_url.starts_with("postgresql://")
        {
            return Err(anyhow::anyhow!(
                "DATABASE_URL must be a valid PostgreSQL connection string"
            ));
        }

        if self.base.session_ttl_hours <= 0 {
            return Err(anyhow::anyhow!("SESSION_TTL_HOURS must be positive"));
        }

        match self.storage_backend {
            StorageBackend::S3 => {
                if self.s3_bucket.is_none() {
                    return Err(anyhow::anyhow!(
                        "AWS_BUCKET_NAME must be set when using S3 storage backend"
                    ));
                }
                if self.s3_region.is_none() {
                    return Err(anyhow::anyhow!(
                        "AWS_REGION must be set when using S3 storage backend"
                    ));
                }
            }
            StorageBackend::Local => {
                if self.local_storage_path.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_PATH must be set when using local storage backend"
                    ));
                }
            }
        }

        Ok(())
    }
}
