use async_trait::async_trait;
use chrono::{DateTime, Utc};
use evia_core::{
    models::{Session, User},
    AppError,
};
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

use crate::db::transaction::TransactionGuard;

/// Account persistence
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_id(&self, id: i64) -> Result<Option<User>, AppError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError>;

    /// Insert a user and its first session atomically.
    async fn create_with_session(
        &self,
        email: &str,
        password_hash: &str,
        token: Uuid,
        expires_at: DateTime<Utc>,
    ) -> Result<(User, Session), AppError>;

    /// Returns false when no account has this email.
    async fn update_password(&self, email: &str, password_hash: &str) -> Result<bool, AppError>;
}

/// Repository for the `users` table
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for UserRepository {
    #[tracing::instrument(skip(self), fields(db.table = "users", db.operation = "select", db.record_id = id))]
    async fn find_by_id(&self, id: i64) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<Postgres, User>(
            "SELECT id, email, password_hash, created_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    #[tracing::instrument(skip(self), fields(db.table = "users", db.operation = "select"))]
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<Postgres, User>(
            "SELECT id, email, password_hash, created_at FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    #[tracing::instrument(
        skip(self, password_hash, token),
        fields(db.table = "users", db.operation = "insert")
    )]
    async fn create_with_session(
        &self,
        email: &str,
        password_hash: &str,
        token: Uuid,
        expires_at: DateTime<Utc>,
    ) -> Result<(User, Session), AppError> {
        let mut tx = TransactionGuard::begin(&self.pool).await?;

        let inserted = async {
            let user = sqlx::query_as::<Postgres, User>(
                r#"
                INSERT INTO users (email, password_hash)
                VALUES ($1, $2)
                RETURNING id, email, password_hash, created_at
                "#,
            )
            .bind(email)
            .bind(password_hash)
            .fetch_one(&mut **tx)
            .await?;

            let session = sqlx::query_as::<Postgres, Session>(
                r#"
                INSERT INTO sessions (user_id, token, expires_at)
                VALUES ($1, $2, $3)
                RETURNING id, user_id, token, expires_at, created_at
                "#,
            )
            .bind(user.id)
            .bind(token)
            .bind(expires_at)
            .fetch_one(&mut **tx)
            .await?;

            Ok::<_, sqlx::Error>((user, session))
        }
        .await;

        match inserted {
            Ok(pair) => {
                tx.commit().await?;
                Ok(pair)
            }
            Err(e) => {
                if let Err(rollback_err) = tx.rollback().await {
                    tracing::warn!(error = %rollback_err, "Rollback after failed registration failed");
                }
                Err(e.into())
            }
        }
    }

    #[tracing::instrument(skip(self, password_hash), fields(db.table = "users", db.operation = "update"))]
    async fn update_password(&self, email: &str, password_hash: &str) -> Result<bool, AppError> {
        let result = sqlx::query("UPDATE users SET password_hash = $1 WHERE email = $2")
            .bind(password_hash)
            .bind(email)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
