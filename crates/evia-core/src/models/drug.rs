use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Catalogue entry
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Drug {
    pub id: i64,
    pub brand_name: String,
    pub name: String,
    pub price: Decimal,
    pub description: String,
    pub image_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DrugResponse {
    pub id: i64,
    pub brand_name: String,
    pub name: String,
    pub price: Decimal,
    pub description: String,
    pub image_url: String,
}

impl From<Drug> for DrugResponse {
    fn from(drug: Drug) -> Self {
        DrugResponse {
            id: drug.id,
            brand_name: drug.brand_name,
            name: drug.name,
            price: drug.price,
            description: drug.description,
            image_url: drug.image_url,
        }
    }
}
