use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use tracing::warn;

use pricewise_core::catalog::CatalogSource;
use pricewise_core::domain::product::{CatalogRecord, ProductId};
use pricewise_core::errors::ApplicationError;

use super::{CatalogRepository, NewCatalogRecord, RepositoryError, Store};
use crate::DbPool;

const SELECT_CATALOG: &str = "SELECT p.id, p.name, p.brand, p.category, p.unit, p.quantity,
            p.price, p.discounted_price, p.url, p.image_url, s.name AS store_name
     FROM products p
     JOIN stores s ON s.id = p.store_id";

pub struct SqlCatalogRepository {
    pool: DbPool,
}

impl SqlCatalogRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

/// Decodes a numeric column, treating values of the wrong type as absent.
fn lenient_number(row: &SqliteRow, column: &str, product_id: i64) -> Option<f64> {
    match row.try_get::<Option<f64>, _>(column) {
        Ok(value) => value,
        Err(error) => {
            warn!(
                event_name = "db.catalog.malformed_column",
                product_id,
                column,
                error = %error,
                "catalog column could not be decoded; treating as missing"
            );
            None
        }
    }
}

fn row_to_record(row: &SqliteRow) -> Result<CatalogRecord, RepositoryError> {
    let id: i64 = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let name: String = row.try_get("name").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let store_name: String =
        row.try_get("store_name").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    Ok(CatalogRecord {
        id: ProductId(id),
        name,
        brand: row.try_get("brand").unwrap_or_default(),
        category: row.try_get("category").unwrap_or_default(),
        unit: row.try_get("unit").unwrap_or_default(),
        quantity: lenient_number(row, "quantity", id),
        price: lenient_number(row, "price", id).unwrap_or(0.0),
        discounted_price: lenient_number(row, "discounted_price", id),
        store_name,
        url: row.try_get::<Option<String>, _>("url").unwrap_or_default().unwrap_or_default(),
        image_url: row.try_get("image_url").unwrap_or_default(),
    })
}

#[async_trait]
impl CatalogRepository for SqlCatalogRepository {
    async fn list(&self) -> Result<Vec<CatalogRecord>, RepositoryError> {
        let rows = sqlx::query(&format!("{SELECT_CATALOG} ORDER BY p.id"))
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(row_to_record).collect()
    }

    async fn find_by_id(&self, id: ProductId) -> Result<Option<CatalogRecord>, RepositoryError> {
        let row = sqlx::query(&format!("{SELECT_CATALOG} WHERE p.id = ?"))
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_record).transpose()
    }

    async fn insert(&self, record: NewCatalogRecord) -> Result<ProductId, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let store_id: i64 = sqlx::query_scalar(
            "INSERT INTO stores (name, url) VALUES (?, ?)
             ON CONFLICT(name) DO UPDATE SET url = COALESCE(excluded.url, stores.url)
             RETURNING id",
        )
        .bind(record.store_name.trim())
        .bind(&record.store_url)
        .fetch_one(&mut *tx)
        .await?;

        let id: i64 = sqlx::query_scalar(
            "INSERT INTO products (name, brand, category, subcategory, price, discounted_price,
                                   unit, quantity, url, image_url, last_updated, store_id)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             RETURNING id",
        )
        .bind(&record.name)
        .bind(&record.brand)
        .bind(&record.category)
        .bind(&record.subcategory)
        .bind(record.price)
        .bind(record.discounted_price)
        .bind(&record.unit)
        .bind(record.quantity)
        .bind(&record.url)
        .bind(&record.image_url)
        .bind(Utc::now().to_rfc3339())
        .bind(store_id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(ProductId(id))
    }

    async fn list_stores(&self) -> Result<Vec<Store>, RepositoryError> {
        let rows = sqlx::query("SELECT id, name, url FROM stores ORDER BY name")
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| {
                Ok(Store {
                    id: row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?,
                    name: row.try_get("name").map_err(|e| RepositoryError::Decode(e.to_string()))?,
                    url: row.try_get("url").unwrap_or_default(),
                })
            })
            .collect()
    }

    async fn count(&self) -> Result<u64, RepositoryError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM products").fetch_one(&self.pool).await?;
        Ok(count.max(0) as u64)
    }
}

#[async_trait]
impl CatalogSource for SqlCatalogRepository {
    async fn load_catalog(&self) -> Result<Vec<CatalogRecord>, ApplicationError> {
        Ok(self.list().await?)
    }
}

#[cfg(test)]
mod tests {
    use pricewise_core::catalog::CatalogSource;
    use pricewise_core::domain::product::ProductId;

    use super::SqlCatalogRepository;
    use crate::repositories::{CatalogRepository, NewCatalogRecord};
    use crate::{connect_with_settings, migrations};

    async fn setup() -> sqlx::SqlitePool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        pool
    }

    fn listing(name: &str, price: f64, store: &str) -> NewCatalogRecord {
        NewCatalogRecord {
            name: name.to_string(),
            brand: Some("Olpers".to_string()),
            category: Some("Dairy".to_string()),
            subcategory: None,
            unit: Some("l".to_string()),
            quantity: Some(1.0),
            price,
            discounted_price: None,
            store_name: store.to_string(),
            store_url: Some(format!("https://{}.example", store.to_lowercase())),
            url: format!("https://{}.example/olpers", store.to_lowercase()),
            image_url: None,
        }
    }

    #[tokio::test]
    async fn insert_then_find_round_trips_listing() {
        let repo = SqlCatalogRepository::new(setup().await);

        let id = repo.insert(listing("Olpers Milk 1L", 280.0, "Metro")).await.expect("insert");
        let found = repo.find_by_id(id).await.expect("find").expect("listing exists");

        assert_eq!(found.name, "Olpers Milk 1L");
        assert_eq!(found.store_name, "Metro");
        assert_eq!(found.price, 280.0);
        assert_eq!(found.quantity, Some(1.0));
        assert!(repo.find_by_id(ProductId(999)).await.expect("find").is_none());
    }

    #[tokio::test]
    async fn stores_are_created_once_per_name() {
        let repo = SqlCatalogRepository::new(setup().await);
        repo.insert(listing("Olpers Milk 1L", 280.0, "Metro")).await.expect("insert");
        repo.insert(listing("Olpers Milk 1.5L", 410.0, "Metro")).await.expect("insert");
        repo.insert(listing("Olpers Milk 1L", 275.0, "Imtiaz")).await.expect("insert");

        let stores = repo.list_stores().await.expect("stores");
        let names: Vec<&str> = stores.iter().map(|store| store.name.as_str()).collect();

        assert_eq!(names, vec!["Imtiaz", "Metro"]);
        assert_eq!(repo.count().await.expect("count"), 3);
    }

    #[tokio::test]
    async fn malformed_numeric_columns_are_recovered() {
        let pool = setup().await;
        let repo = SqlCatalogRepository::new(pool.clone());
        repo.insert(listing("Olpers Milk 1L", 280.0, "Metro")).await.expect("insert");

        sqlx::query(
            "INSERT INTO products (name, price, discounted_price, quantity, store_id)
             VALUES ('Loose Milk', 'call for price', 'n/a', 'one', 1)",
        )
        .execute(&pool)
        .await
        .expect("insert malformed row");

        let records = repo.load_catalog().await.expect("catalog loads");
        assert_eq!(records.len(), 2);

        let loose = &records[1];
        assert_eq!(loose.name, "Loose Milk");
        assert_eq!(loose.price, 0.0);
        assert_eq!(loose.discounted_price, None);
        assert_eq!(loose.quantity, None);
        assert_eq!(loose.url, "");
    }

    #[tokio::test]
    async fn catalog_is_ordered_by_id() {
        let repo = SqlCatalogRepository::new(setup().await);
        for (name, store) in [("B", "Metro"), ("A", "Imtiaz"), ("C", "Metro")] {
            repo.insert(listing(name, 100.0, store)).await.expect("insert");
        }

        let ids: Vec<i64> =
            repo.list().await.expect("list").iter().map(|record| record.id.0).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }
}
