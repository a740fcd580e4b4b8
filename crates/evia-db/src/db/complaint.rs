use async_trait::async_trait;
use evia_core::{models::Complaint, AppError};
use sqlx::{PgPool, Postgres};
use uuid::Uuid;

use crate::db::transaction::TransactionGuard;

/// Complaint persistence. Complaints are never deleted; only the title changes.
#[async_trait]
pub trait ComplaintStore: Send + Sync {
    /// Insert inside its own transaction, rolled back on any failure.
    async fn insert(&self, complaint: &Complaint) -> Result<(), AppError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Complaint>, AppError>;

    /// All complaints owned by the user, newest first.
    async fn find_by_user(&self, user_id: i64) -> Result<Vec<Complaint>, AppError>;

    async fn update_title(&self, id: Uuid, title: &str) -> Result<Option<Complaint>, AppError>;
}

/// Repository for the `complaints` table
#[derive(Clone)]
pub struct ComplaintRepository {
    pool: PgPool,
}

impl ComplaintRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ComplaintStore for ComplaintRepository {
    #[tracing::instrument(
        skip(self, complaint),
        fields(db.table = "complaints", db.operation = "insert", db.record_id = %complaint.id)
    )]
    async fn insert(&self, complaint: &Complaint) -> Result<(), AppError> {
        let mut tx = TransactionGuard::begin(&self.pool).await?;

        let result = sqlx::query(
            r#"
            INSERT INTO complaints (id, user_id, title, complaint_msg, response, image_url, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(complaint.id)
        .bind(complaint.user_id)
        .bind(&complaint.title)
        .bind(&complaint.complaint_msg)
        .bind(&complaint.response)
        .bind(&complaint.image_url)
        .bind(complaint.created_at)
        .execute(&mut **tx)
        .await;

        match result {
            Ok(_) => {
                tx.commit().await?;
                Ok(())
            }
            Err(e) => {
                if let Err(rollback_err) = tx.rollback().await {
                    tracing::warn!(error = %rollback_err, "Complaint insert rollback failed");
                }
                Err(e.into())
            }
        }
    }

    #[tracing::instrument(skip(self), fields(db.table = "complaints", db.operation = "select", db.record_id = %id))]
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Complaint>, AppError> {
        let complaint = sqlx::query_as::<Postgres, Complaint>(
            "SELECT id, user_id, title, complaint_msg, response, image_url, created_at FROM complaints WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(complaint)
    }

    #[tracing::instrument(skip(self), fields(db.table = "complaints", db.operation = "select"))]
    async fn find_by_user(&self, user_id: i64) -> Result<Vec<Complaint>, AppError> {
        let complaints = sqlx::query_as::<Postgres, Complaint>(
            "SELECT id, user_id, title, complaint_msg, response, image_url, created_at FROM complaints WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(complaints)
    }

    #[tracing::instrument(skip(self), fields(db.table = "complaints", db.operation = "update", db.record_id = %id))]
    async fn update_title(&self, id: Uuid, title: &str) -> Result<Option<Complaint>, AppError> {
        let complaint = sqlx::query_as::<Postgres, Complaint>(
            r#"
            UPDATE complaints SET title = $2
            WHERE id = $1
            RETURNING id, user_id, title, complaint_msg, response, image_url, created_at
            "#,
        )
        .bind(id)
        .bind(title)
        .fetch_optional(&self.pool)
        .await?;

        Ok(complaint)
    }
}
