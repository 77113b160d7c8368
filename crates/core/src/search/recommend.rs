//! "Related item" recommendations for one listing.
//!
//! A synthetic query built from the target's brand, category and name
//! retrieves a candidate pool through the lexical index; the pool is grouped
//! like a normal search and every group is scored for relatedness.

use std::collections::HashSet;

use crate::domain::group::{ProductGroup, RecommendationCandidate};
use crate::domain::product::{lowercase_key, CatalogRecord, ProductId};
use crate::errors::DomainError;
use crate::search::grouping::GroupingEngine;
use crate::search::index::LexicalIndex;
use crate::search::normalize::strip_bracketed_suffix;

pub const SIMILAR_PRICE_REASON: &str = "Similar price";
pub const BETTER_VALUE_REASON: &str = "Better value option";
pub const SAME_CATEGORY_REASON: &str = "Same category";

/// Reasons kept per recommendation, in brand, category, price precedence.
const MAX_REASONS: usize = 2;

/// Weights and thresholds for relatedness scoring
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecommendationWeights {
    /// Bonus when brands match (default: 0.4)
    pub brand: f64,
    /// Bonus when categories match (default: 0.3)
    pub category: f64,
    /// Weight of the candidate's textual similarity (default: 0.3)
    pub similarity: f64,
    /// Penalty for much pricier candidates of another brand (default: 0.2)
    pub premium_penalty: f64,
    /// Candidates must score strictly above this (default: 0.2)
    pub min_score: f64,
    /// Listings retrieved before grouping (default: 50)
    pub candidate_pool: usize,
    /// Recommendations returned when the caller does not say (default: 6)
    pub default_top_n: usize,
    /// Lower bound of the "similar price" band (default: 0.8)
    pub similar_price_min: f64,
    /// Upper bound of the "similar price" band (default: 1.2)
    pub similar_price_max: f64,
    /// Ratio above which the premium penalty applies (default: 1.5)
    pub premium_ratio: f64,
}

impl Default for RecommendationWeights {
    fn default() -> Self {
        super::DEFAULT_RECOMMENDATION_WEIGHTS
    }
}

impl RecommendationWeights {
    pub fn validate(&self) -> Result<(), String> {
        let values = [
            self.brand,
            self.category,
            self.similarity,
            self.premium_penalty,
            self.min_score,
            self.similar_price_min,
            self.similar_price_max,
            self.premium_ratio,
        ];
        if values.iter().any(|value| !value.is_finite() || *value < 0.0) {
            return Err(
                "search.recommendation weights must be finite and non-negative".to_string()
            );
        }
        if self.candidate_pool == 0 || self.default_top_n == 0 {
            return Err(
                "search.recommendation candidate_pool and default_top_n must be greater than zero"
                    .to_string(),
            );
        }
        if self.similar_price_min > self.similar_price_max {
            return Err(
                "search.recommendation.similar_price_min must not exceed similar_price_max"
                    .to_string(),
            );
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct RecommendationEngine {
    weights: RecommendationWeights,
    grouping: GroupingEngine,
}

impl RecommendationEngine {
    pub fn new(weights: RecommendationWeights, grouping: GroupingEngine) -> Self {
        Self { weights, grouping }
    }

    pub fn weights(&self) -> &RecommendationWeights {
        &self.weights
    }

    /// Related groups for `product_id`, best first. An unknown id is an
    /// error; a known id without qualifying candidates yields an empty list.
    pub fn recommend(
        &self,
        index: &LexicalIndex,
        product_id: ProductId,
        top_n: usize,
    ) -> Result<Vec<RecommendationCandidate>, DomainError> {
        let target = index.lookup(product_id).ok_or(DomainError::ProductNotFound(product_id))?;

        let candidates = index.query(&synthetic_query(target), self.weights.candidate_pool);
        let groups = self.grouping.group(&candidates);

        let mut seen_names: HashSet<String> =
            HashSet::from([strip_bracketed_suffix(&target.name).to_lowercase()]);
        let mut scored = Vec::new();

        for group in groups {
            if group.contains(target.id) {
                continue;
            }
            let name_key = group.name.to_lowercase();
            if !seen_names.insert(name_key) {
                continue;
            }

            let (score, reasons) = self.score(target, &group);
            if score > self.weights.min_score {
                scored.push(RecommendationCandidate {
                    group,
                    final_rec_score: score,
                    recommendation_reasons: reasons,
                });
            }
        }

        scored.sort_by(|a, b| {
            b.final_rec_score.partial_cmp(&a.final_rec_score).unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(top_n);
        Ok(scored)
    }

    fn score(&self, target: &CatalogRecord, group: &ProductGroup) -> (f64, Vec<String>) {
        let weights = &self.weights;
        let mut score = 0.0;
        let mut reasons = Vec::new();

        let target_brand = target.brand_key();
        let brand_matches =
            !target_brand.is_empty() && lowercase_key(group.brand.as_deref()) == target_brand;
        if brand_matches {
            score += weights.brand;
            let brand = group.brand.as_deref().unwrap_or_default().trim();
            reasons.push(format!("More from {brand}"));
        }

        let target_category = target.category_key();
        if !target_category.is_empty()
            && lowercase_key(group.category.as_deref()) == target_category
        {
            score += weights.category;
            reasons.push(SAME_CATEGORY_REASON.to_string());
        }

        score += group.similarity_score * weights.similarity;

        let ratio = if target.price > 0.0 { group.min_price / target.price } else { 1.0 };
        if (weights.similar_price_min..=weights.similar_price_max).contains(&ratio) {
            reasons.push(SIMILAR_PRICE_REASON.to_string());
        } else if ratio < weights.similar_price_min {
            reasons.push(BETTER_VALUE_REASON.to_string());
        } else if ratio > weights.premium_ratio && !brand_matches {
            score -= weights.premium_penalty;
        }

        reasons.truncate(MAX_REASONS);
        (score, reasons)
    }
}

/// `brand category name`, skipping whatever the listing lacks.
pub fn synthetic_query(target: &CatalogRecord) -> String {
    [target.brand.as_deref(), target.category.as_deref(), Some(target.name.as_str())]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::{
        synthetic_query, RecommendationEngine, BETTER_VALUE_REASON, SAME_CATEGORY_REASON,
        SIMILAR_PRICE_REASON,
    };
    use crate::domain::product::{CatalogRecord, ProductId};
    use crate::errors::DomainError;
    use crate::search::index::LexicalIndex;

    fn record(
        id: i64,
        name: &str,
        brand: Option<&str>,
        category: Option<&str>,
        price: f64,
        store: &str,
    ) -> CatalogRecord {
        CatalogRecord {
            id: ProductId(id),
            name: name.to_string(),
            brand: brand.map(str::to_string),
            category: category.map(str::to_string),
            unit: None,
            quantity: None,
            price,
            discounted_price: None,
            store_name: store.to_string(),
            url: format!("https://{store}.example/{id}"),
            image_url: None,
        }
    }

    fn dairy_catalog() -> Vec<CatalogRecord> {
        vec![
            record(1, "Olpers Milk 1L", Some("Olpers"), Some("Dairy"), 300.0, "Metro"),
            record(2, "Olpers Milk 1L", Some("Olpers"), Some("Dairy"), 290.0, "Alfatah"),
            record(3, "Olpers Cream 200ml", Some("Olpers"), Some("Dairy"), 180.0, "Metro"),
            record(4, "Nestle Milkpak 1L", Some("Nestle"), Some("Dairy"), 310.0, "Metro"),
            record(5, "Haleeb Milk 1L", Some("Haleeb"), Some("Dairy"), 900.0, "Metro"),
            record(6, "Dalda Cooking Oil 1L", Some("Dalda"), Some("Cooking Oil"), 560.0, "Metro"),
        ]
    }

    #[test]
    fn unknown_product_is_not_found() {
        let index = LexicalIndex::build(dairy_catalog(), 5000);
        let result = RecommendationEngine::default().recommend(&index, ProductId(404), 6);

        assert_eq!(result, Err(DomainError::ProductNotFound(ProductId(404))));
    }

    #[test]
    fn known_product_without_candidates_yields_empty_list() {
        let index = LexicalIndex::build(
            vec![record(1, "Lonely Item", None, None, 100.0, "Metro")],
            5000,
        );
        let result = RecommendationEngine::default().recommend(&index, ProductId(1), 6);

        assert_eq!(result, Ok(Vec::new()));
    }

    #[test]
    fn excludes_target_group_and_explains_matches() {
        let index = LexicalIndex::build(dairy_catalog(), 5000);
        let recs = RecommendationEngine::default()
            .recommend(&index, ProductId(1), 6)
            .expect("target exists");

        assert!(!recs.is_empty());
        assert!(recs.iter().all(|rec| !rec.group.contains(ProductId(1))));
        assert!(recs.iter().all(|rec| !rec.group.contains(ProductId(2))));
        for pair in recs.windows(2) {
            assert!(pair[0].final_rec_score >= pair[1].final_rec_score);
        }
        for rec in &recs {
            assert!(rec.final_rec_score > 0.2);
            assert!(rec.recommendation_reasons.len() <= 2);
        }

        let cream = recs.iter().find(|rec| rec.group.contains(ProductId(3))).expect("cream");
        assert_eq!(
            cream.recommendation_reasons,
            vec!["More from Olpers".to_string(), SAME_CATEGORY_REASON.to_string()]
        );
        assert_eq!(recs[0].group.id, ProductId(3));
    }

    #[test]
    fn price_context_reasons_follow_brand_and_category() {
        let index = LexicalIndex::build(dairy_catalog(), 5000);
        let recs = RecommendationEngine::default()
            .recommend(&index, ProductId(1), 6)
            .expect("target exists");

        let milkpak = recs.iter().find(|rec| rec.group.contains(ProductId(4))).expect("milkpak");
        assert_eq!(
            milkpak.recommendation_reasons,
            vec![SAME_CATEGORY_REASON.to_string(), SIMILAR_PRICE_REASON.to_string()]
        );
    }

    #[test]
    fn much_cheaper_listing_is_flagged_as_better_value() {
        let index = LexicalIndex::build(
            vec![
                record(1, "Premium Basmati Rice 5kg", None, Some("Rice"), 2000.0, "Metro"),
                record(2, "Basmati Rice 5kg Sella", None, Some("Rice"), 1100.0, "Metro"),
            ],
            5000,
        );
        let recs = RecommendationEngine::default()
            .recommend(&index, ProductId(1), 6)
            .expect("target exists");

        assert_eq!(recs.len(), 1);
        assert_eq!(
            recs[0].recommendation_reasons,
            vec![SAME_CATEGORY_REASON.to_string(), BETTER_VALUE_REASON.to_string()]
        );
    }

    #[test]
    fn top_n_limits_results() {
        let index = LexicalIndex::build(dairy_catalog(), 5000);
        let recs = RecommendationEngine::default()
            .recommend(&index, ProductId(1), 1)
            .expect("target exists");

        assert!(recs.len() <= 1);
    }

    #[test]
    fn synthetic_query_skips_missing_attributes() {
        let full = record(1, "Olpers Milk 1L", Some("Olpers"), Some("Dairy"), 300.0, "Metro");
        assert_eq!(synthetic_query(&full), "Olpers Dairy Olpers Milk 1L");

        let bare = record(2, " Sugar 1kg ", None, None, 150.0, "Metro");
        assert_eq!(synthetic_query(&bare), "Sugar 1kg");
    }
}
