use async_trait::async_trait;
use evia_core::{models::Drug, AppError};
use sqlx::{PgPool, Postgres};

/// Read-only access to the drug catalogue
#[async_trait]
pub trait DrugStore: Send + Sync {
    async fn find_by_id(&self, id: i64) -> Result<Option<Drug>, AppError>;

    /// Case-insensitive substring match on the generic or brand name.
    async fn search_by_name(&self, name: &str) -> Result<Vec<Drug>, AppError>;
}

/// Repository for the `drugs` table
#[derive(Clone)]
pub struct DrugRepository {
    pool: PgPool,
}

impl DrugRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Escape LIKE wildcards so user-derived text matches literally.
fn like_pattern(name: &str) -> String {
    let escaped = name
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

#[async_trait]
impl DrugStore for DrugRepository {
    #[tracing::instrument(skip(self), fields(db.table = "drugs", db.operation = "select", db.record_id = id))]
    async fn find_by_id(&self, id: i64) -> Result<Option<Drug>, AppError> {
        let drug = sqlx::query_as::<Postgres, Drug>(
            "SELECT id, brand_name, name, price, description, image_url FROM drugs WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(drug)
    }

    #[tracing::instrument(skip(self), fields(db.table = "drugs", db.operation = "select"))]
    async fn search_by_name(&self, name: &str) -> Result<Vec<Drug>, AppError> {
        let drugs = sqlx::query_as::<Postgres, Drug>(
            r#"
            SELECT id, brand_name, name, price, description, image_url
            FROM drugs
            WHERE name ILIKE $1 OR brand_name ILIKE $1
            ORDER BY id ASC
            "#,
        )
        .bind(like_pattern(name))
        .fetch_all(&self.pool)
        .await?;

        Ok(drugs)
    }
}

#[cfg(test)]
mod tests {
    use super::like_pattern;

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("para"), "%para%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
    }
}
