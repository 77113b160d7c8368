use serde::{Deserialize, Serialize};

use crate::domain::product::{CatalogRecord, ProductId};

/// Cheapest observed offer of one store inside a product group.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StorePrice {
    pub store_name: String,
    pub price: f64,
    pub discounted_price: Option<f64>,
    pub url: String,
}

impl StorePrice {
    pub fn from_record(record: &CatalogRecord) -> Self {
        Self {
            store_name: record.store_name.clone(),
            price: record.price,
            discounted_price: record.discounted_price,
            url: record.url.clone(),
        }
    }
}

/// Listings judged to be the same product across stores. Canonical fields
/// come from the anchor (first merged) record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProductGroup {
    pub id: ProductId,
    pub name: String,
    pub brand: Option<String>,
    pub category: Option<String>,
    pub unit: Option<String>,
    pub quantity: Option<f64>,
    pub store_name: String,
    pub url: String,
    pub image_url: Option<String>,
    pub min_price: f64,
    pub similarity_score: f64,
    pub store_prices: Vec<StorePrice>,
    pub member_ids: Vec<ProductId>,
}

impl ProductGroup {
    /// A group holding exactly one listing.
    pub fn singleton(record: &CatalogRecord, similarity_score: f64) -> Self {
        Self {
            id: record.id,
            name: record.name.clone(),
            brand: record.brand.clone(),
            category: record.category.clone(),
            unit: record.unit.clone(),
            quantity: record.quantity,
            store_name: record.store_name.clone(),
            url: record.url.clone(),
            image_url: record.image_url.clone(),
            min_price: record.price,
            similarity_score,
            store_prices: vec![StorePrice::from_record(record)],
            member_ids: vec![record.id],
        }
    }

    pub fn contains(&self, product_id: ProductId) -> bool {
        self.member_ids.contains(&product_id)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RankedGroup {
    #[serde(flatten)]
    pub group: ProductGroup,
    pub final_ranking_score: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecommendationCandidate {
    #[serde(flatten)]
    pub group: ProductGroup,
    pub final_rec_score: f64,
    pub recommendation_reasons: Vec<String>,
}

/// A listing next to the other groups a name search surfaces for it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PriceComparison {
    pub target: CatalogRecord,
    pub alternatives: Vec<ProductGroup>,
    pub min_price: f64,
    pub max_price: f64,
}
