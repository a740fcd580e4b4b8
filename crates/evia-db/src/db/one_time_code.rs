use async_trait::async_trait;
use chrono::{Duration, Utc};
use evia_core::AppError;
use sqlx::{PgPool, Postgres};

/// Short-lived key/value codes (password reset OTPs and reset tokens).
///
/// Expired rows are invisible to `get` and overwritten by the next `put`.
#[async_trait]
pub trait OneTimeCodeStore: Send + Sync {
    /// Insert or replace the value under `key`, valid for `ttl`.
    async fn put(&self, key: &str, value: &str, ttl: Duration) -> Result<(), AppError>;

    async fn get(&self, key: &str) -> Result<Option<String>, AppError>;

    async fn delete(&self, key: &str) -> Result<(), AppError>;
}

/// Repository for the `one_time_codes` table
#[derive(Clone)]
pub struct OneTimeCodeRepository {
    pool: PgPool,
}

impl OneTimeCodeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Remove every expired code. Returns the number of rows deleted.
    #[tracing::instrument(skip(self), fields(db.table = "one_time_codes", db.operation = "delete"))]
    pub async fn purge_expired(&self) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM one_time_codes WHERE expires_at <= NOW()")
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}

#[async_trait]
impl OneTimeCodeStore for OneTimeCodeRepository {
    #[tracing::instrument(skip(self, value), fields(db.table = "one_time_codes", db.operation = "upsert"))]
    async fn put(&self, key: &str, value: &str, ttl: Duration) -> Result<(), AppError> {
        let expires_at = Utc::now() + ttl;

        sqlx::query(
            r#"
            INSERT INTO one_time_codes (key, value, expires_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value, expires_at = EXCLUDED.expires_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    #[tracing::instrument(skip(self), fields(db.table = "one_time_codes", db.operation = "select"))]
    async fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        let value = sqlx::query_scalar::<Postgres, String>(
            "SELECT value FROM one_time_codes WHERE key = $1 AND expires_at > NOW()",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(value)
    }

    #[tracing::instrument(skip(self), fields(db.table = "one_time_codes", db.operation = "delete"))]
    async fn delete(&self, key: &str) -> Result<(), AppError> {
        sqlx::query("DELETE FROM one_time_codes WHERE key = $1")
            .bind(key)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
