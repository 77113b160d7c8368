use async_trait::async_trait;

use crate::domain::product::CatalogRecord;
use crate::errors::ApplicationError;

/// Where the search service loads its catalog from on every refresh.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn load_catalog(&self) -> Result<Vec<CatalogRecord>, ApplicationError>;
}
