use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::RwLock;

use pricewise_core::catalog::CatalogSource;
use pricewise_core::domain::product::{CatalogRecord, ProductId};
use pricewise_core::errors::ApplicationError;

use super::{CatalogRepository, NewCatalogRecord, RepositoryError, Store};

/// Catalog kept in process memory. It can be switched unavailable to make
/// every call fail the way a dropped database would.
#[derive(Default)]
pub struct InMemoryCatalogRepository {
    records: RwLock<BTreeMap<i64, CatalogRecord>>,
    unavailable: AtomicBool,
}

impl InMemoryCatalogRepository {
    pub fn with_records(records: Vec<CatalogRecord>) -> Self {
        Self {
            records: RwLock::new(records.into_iter().map(|record| (record.id.0, record)).collect()),
            unavailable: AtomicBool::new(false),
        }
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn ensure_available(&self) -> Result<(), RepositoryError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable("in-memory catalog switched off".to_string()));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl CatalogRepository for InMemoryCatalogRepository {
    async fn list(&self) -> Result<Vec<CatalogRecord>, RepositoryError> {
        self.ensure_available()?;
        let records = self.records.read().await;
        Ok(records.values().cloned().collect())
    }

    async fn find_by_id(&self, id: ProductId) -> Result<Option<CatalogRecord>, RepositoryError> {
        self.ensure_available()?;
        let records = self.records.read().await;
        Ok(records.get(&id.0).cloned())
    }

    async fn insert(&self, record: NewCatalogRecord) -> Result<ProductId, RepositoryError> {
        self.ensure_available()?;
        let mut records = self.records.write().await;
        let id = ProductId(records.keys().next_back().map_or(1, |last| last + 1));
        records.insert(id.0, record.into_record(id));
        Ok(id)
    }

    async fn list_stores(&self) -> Result<Vec<Store>, RepositoryError> {
        self.ensure_available()?;
        let records = self.records.read().await;
        let names: BTreeSet<&str> =
            records.values().map(|record| record.store_name.as_str()).collect();

        Ok(names
            .into_iter()
            .enumerate()
            .map(|(index, name)| Store { id: index as i64 + 1, name: name.to_string(), url: None })
            .collect())
    }

    async fn count(&self) -> Result<u64, RepositoryError> {
        self.ensure_available()?;
        Ok(self.records.read().await.len() as u64)
    }
}

#[async_trait::async_trait]
impl CatalogSource for InMemoryCatalogRepository {
    async fn load_catalog(&self) -> Result<Vec<CatalogRecord>, ApplicationError> {
        Ok(self.list().await?)
    }
}
