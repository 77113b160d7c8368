use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(pub i64);

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One store's listing of one product variant, as handed over by the
/// persistence layer at refresh time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CatalogRecord {
    pub id: ProductId,
    pub name: String,
    pub brand: Option<String>,
    pub category: Option<String>,
    pub unit: Option<String>,
    pub quantity: Option<f64>,
    pub price: f64,
    pub discounted_price: Option<f64>,
    pub store_name: String,
    pub url: String,
    pub image_url: Option<String>,
}

impl CatalogRecord {
    /// Repairs numeric fields that cannot be used for ranking: a non-finite or
    /// negative price becomes 0.0, non-finite optional numbers become `None`.
    /// Returns true when anything was changed.
    pub fn sanitize(&mut self) -> bool {
        let mut repaired = false;

        if !self.price.is_finite() || self.price < 0.0 {
            self.price = 0.0;
            repaired = true;
        }
        if self.discounted_price.is_some_and(|value| !value.is_finite() || value < 0.0) {
            self.discounted_price = None;
            repaired = true;
        }
        if self.quantity.is_some_and(|value| !value.is_finite() || value < 0.0) {
            self.quantity = None;
            repaired = true;
        }

        repaired
    }

    /// Lowercased, trimmed brand; empty when the listing carries no brand.
    pub fn brand_key(&self) -> String {
        lowercase_key(self.brand.as_deref())
    }

    pub fn category_key(&self) -> String {
        lowercase_key(self.category.as_deref())
    }
}

pub(crate) fn lowercase_key(value: Option<&str>) -> String {
    value.map(|value| value.trim().to_lowercase()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::{CatalogRecord, ProductId};

    fn record(price: f64) -> CatalogRecord {
        CatalogRecord {
            id: ProductId(1),
            name: "Nestle Milkpak 1L".to_string(),
            brand: Some("  Nestle ".to_string()),
            category: None,
            unit: Some("l".to_string()),
            quantity: Some(1.0),
            price,
            discounted_price: None,
            store_name: "Metro".to_string(),
            url: "https://metro.example/milkpak".to_string(),
            image_url: None,
        }
    }

    #[test]
    fn sanitize_zeroes_unusable_price_and_keeps_row() {
        let mut record = record(f64::NAN);
        record.quantity = Some(f64::INFINITY);

        assert!(record.sanitize());
        assert_eq!(record.price, 0.0);
        assert_eq!(record.quantity, None);
        assert_eq!(record.name, "Nestle Milkpak 1L");
    }

    #[test]
    fn sanitize_leaves_valid_record_untouched() {
        let mut record = record(250.0);
        assert!(!record.sanitize());
        assert_eq!(record.price, 250.0);
    }

    #[test]
    fn keys_are_trimmed_and_lowercased() {
        let record = record(250.0);
        assert_eq!(record.brand_key(), "nestle");
        assert_eq!(record.category_key(), "");
    }
}
