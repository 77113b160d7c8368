use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use pricewise_core::domain::product::{CatalogRecord, ProductId};
use pricewise_core::errors::ApplicationError;

pub mod catalog;
pub mod memory;

pub use catalog::SqlCatalogRepository;
pub use memory::InMemoryCatalogRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("catalog storage is unavailable: {0}")]
    Unavailable(String),
}

impl From<RepositoryError> for ApplicationError {
    fn from(error: RepositoryError) -> Self {
        ApplicationError::Persistence(error.to_string())
    }
}

/// A listing as it arrives from a scraper export, before it has an id.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NewCatalogRecord {
    pub name: String,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub subcategory: Option<String>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub quantity: Option<f64>,
    pub price: f64,
    #[serde(default)]
    pub discounted_price: Option<f64>,
    pub store_name: String,
    #[serde(default)]
    pub store_url: Option<String>,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub image_url: Option<String>,
}

impl NewCatalogRecord {
    pub(crate) fn into_record(self, id: ProductId) -> CatalogRecord {
        CatalogRecord {
            id,
            name: self.name,
            brand: self.brand,
            category: self.category,
            unit: self.unit,
            quantity: self.quantity,
            price: self.price,
            discounted_price: self.discounted_price,
            store_name: self.store_name,
            url: self.url,
            image_url: self.image_url,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Store {
    pub id: i64,
    pub name: String,
    pub url: Option<String>,
}

#[async_trait]
pub trait CatalogRepository: Send + Sync {
    /// Every listing joined with its store, ordered by id.
    async fn list(&self) -> Result<Vec<CatalogRecord>, RepositoryError>;
    async fn find_by_id(&self, id: ProductId) -> Result<Option<CatalogRecord>, RepositoryError>;
    /// Stores the listing, creating its store on first sight.
    async fn insert(&self, record: NewCatalogRecord) -> Result<ProductId, RepositoryError>;
    async fn list_stores(&self) -> Result<Vec<Store>, RepositoryError>;
    async fn count(&self) -> Result<u64, RepositoryError>;
}
