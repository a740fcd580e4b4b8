use evia_core::models::DrugResponse;
use evia_core::AppError;
use evia_db::DrugStore;
use std::sync::Arc;

/// Read access to the drug catalogue
#[derive(Clone)]
pub struct DrugService {
    drugs: Arc<dyn DrugStore>,
}

impl DrugService {
    pub fn new(drugs: Arc<dyn DrugStore>) -> Self {
        Self { drugs }
    }

    pub async fn get_by_id(&self, id: i64) -> Result<DrugResponse, AppError> {
        self.drugs
            .find_by_id(id)
            .await?
            .map(DrugResponse::from)
            .ok_or_else(|| AppError::NotFound("Drug not found".to_string()))
    }
}
