use serde::Serialize;

use crate::repositories::{CatalogRepository, NewCatalogRecord, RepositoryError};

/// (name, brand, category, unit, quantity, price, discounted price, store)
type SampleListing =
    (&'static str, &'static str, &'static str, &'static str, f64, f64, Option<f64>, &'static str);

/// Small multi-store grocery catalog used for local demos and smoke checks.
/// Several products appear in more than one store under slightly different
/// names so that cross-store grouping has something to merge.
const SAMPLE_LISTINGS: &[SampleListing] = &[
    ("Olpers Milk 1L", "Olpers", "Dairy", "l", 1.0, 280.0, None, "Metro"),
    ("Olpers Full Cream Milk 1 Ltr", "Olpers", "Dairy", "l", 1.0, 275.0, Some(269.0), "Imtiaz"),
    ("Olpers Milk 1L [Gulberg]", "Olpers", "Dairy", "l", 1.0, 285.0, None, "Carrefour"),
    ("Olpers Milk 250ml", "Olpers", "Dairy", "ml", 250.0, 85.0, None, "Metro"),
    ("Nestle Milkpak 1L", "Nestle", "Dairy", "l", 1.0, 290.0, None, "Metro"),
    ("Nestle Milk Pak UHT 1 Litre", "Nestle", "Dairy", "l", 1.0, 288.0, None, "Naheed"),
    ("Haleeb Milk 1L", "Haleeb", "Dairy", "l", 1.0, 260.0, None, "Imtiaz"),
    ("Dalda Cooking Oil 1L", "Dalda", "Cooking Oil", "l", 1.0, 650.0, None, "Carrefour"),
    ("Dalda Cooking Oil 1 Litre Pouch", "Dalda", "Cooking Oil", "l", 1.0, 640.0, None, "Metro"),
    ("Dalda Cooking Oil 5L", "Dalda", "Cooking Oil", "l", 5.0, 3150.0, Some(2999.0), "Metro"),
    ("Sufi Cooking Oil 1L", "Sufi", "Cooking Oil", "l", 1.0, 610.0, None, "Imtiaz"),
    ("Tapal Danedar Tea 950g", "Tapal", "Tea", "g", 950.0, 1650.0, None, "Metro"),
    ("Tapal Danedar 950 gm", "Tapal", "Tea", "g", 950.0, 1620.0, None, "Naheed"),
    ("Lipton Yellow Label Tea 950g", "Lipton", "Tea", "g", 950.0, 1890.0, None, "Carrefour"),
    ("Guard Basmati Rice 5kg", "Guard", "Rice", "kg", 5.0, 1800.0, None, "Metro"),
    ("Guard Super Basmati Rice 5 KG", "Guard", "Rice", "kg", 5.0, 1850.0, None, "Imtiaz"),
    ("Falak Basmati Rice 5kg", "Falak", "Rice", "kg", 5.0, 1720.0, None, "Naheed"),
    ("Shan Biryani Masala 50g", "Shan", "Spices", "g", 50.0, 120.0, None, "Metro"),
];

pub struct SampleCatalog;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SeedResult {
    pub products: usize,
    pub stores: usize,
}

impl SampleCatalog {
    pub fn listings() -> Vec<NewCatalogRecord> {
        SAMPLE_LISTINGS
            .iter()
            .map(|&(name, brand, category, unit, quantity, price, discounted_price, store)| {
                let slug = name.to_lowercase().replace(|ch: char| !ch.is_alphanumeric(), "-");
                NewCatalogRecord {
                    name: name.to_string(),
                    brand: Some(brand.to_string()),
                    category: Some(category.to_string()),
                    subcategory: None,
                    unit: Some(unit.to_string()),
                    quantity: Some(quantity),
                    price,
                    discounted_price,
                    store_name: store.to_string(),
                    store_url: Some(format!("https://{}.example", store.to_lowercase())),
                    url: format!("https://{}.example/p/{slug}", store.to_lowercase()),
                    image_url: None,
                }
            })
            .collect()
    }

    /// Inserts every sample listing. Not idempotent: loading twice
    /// duplicates the listings.
    pub async fn load(repo: &dyn CatalogRepository) -> Result<SeedResult, RepositoryError> {
        let listings = Self::listings();
        let products = listings.len();
        for listing in listings {
            repo.insert(listing).await?;
        }

        let stores = repo.list_stores().await?.len();
        Ok(SeedResult { products, stores })
    }
}

#[cfg(test)]
mod tests {
    use super::SampleCatalog;
    use crate::repositories::{CatalogRepository, SqlCatalogRepository};
    use crate::{connect_with_settings, migrations};

    #[tokio::test]
    async fn sample_catalog_loads_into_sqlite() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        let repo = SqlCatalogRepository::new(pool);

        let result = SampleCatalog::load(&repo).await.expect("seed");

        assert_eq!(result.products, SampleCatalog::listings().len());
        assert_eq!(result.stores, 4);
        assert_eq!(repo.count().await.expect("count"), result.products as u64);
    }
}
