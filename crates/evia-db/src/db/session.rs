use async_trait::async_trait;
use chrono::{DateTime, Utc};
use evia_core::{models::Session, AppError};
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

/// Login session persistence. Sessions are never updated once written.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn create(
        &self,
        user_id: i64,
        token: Uuid,
        expires_at: DateTime<Utc>,
    ) -> Result<Session, AppError>;

    async fn find_by_token(&self, token: Uuid) -> Result<Option<Session>, AppError>;
}

/// Repository for the `sessions` table
#[derive(Clone)]
pub struct SessionRepository {
    pool: PgPool,
}

impl SessionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for SessionRepository {
    #[tracing::instrument(skip(self, token), fields(db.table = "sessions", db.operation = "insert"))]
    async fn create(
        &self,
        user_id: i64,
        token: Uuid,
        expires_at: DateTime<Utc>,
    ) -> Result<Session, AppError> {
        let session = sqlx::query_as::<Postgres, Session>(
            r#"
            INSERT INTO sessions (user_id, token, expires_at)
            VALUES ($1, $2, $3)
            RETURNING id, user_id, token, expires_at, created_at
            "#,
        )
        .bind(user_id)
        .bind(token)
        .bind(expires_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(session)
    }

    #[tracing::instrument(skip(self, token), fields(db.table = "sessions", db.operation = "select"))]
    async fn find_by_token(&self, token: Uuid) -> Result<Option<Session>, AppError> {
        let session = sqlx::query_as::<Postgres, Session>(
            "SELECT id, user_id, token, expires_at, created_at FROM sessions WHERE token = $1",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(session)
    }
}
