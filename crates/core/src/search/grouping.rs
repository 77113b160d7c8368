//! Entity resolution of near-duplicate listings into cross-store groups.
//!
//! Candidates are consumed in retrieval order and compared against the groups
//! opened so far, oldest first. The first compatible group absorbs the
//! candidate; otherwise the candidate anchors a new group.

use std::collections::HashSet;

use crate::domain::group::{ProductGroup, StorePrice};
use crate::domain::product::CatalogRecord;
use crate::search::index::SearchCandidate;
use crate::search::normalize::{
    classify_unit, clean_name, extract_quantity_unit, strip_bracketed_suffix,
};

/// Tuning knobs for deciding whether two listings are the same product.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroupingThresholds {
    /// Absolute tolerance when comparing pack quantities (default: 0.001)
    pub quantity_tolerance: f64,
    /// Lowest accepted candidate/group price ratio for unbranded matches (default: 0.6)
    pub price_ratio_min: f64,
    /// Highest accepted candidate/group price ratio for unbranded matches (default: 1.6)
    pub price_ratio_max: f64,
    /// Token overlap that must be exceeded for unbranded matches (default: 0.6)
    pub token_overlap_min: f64,
}

impl Default for GroupingThresholds {
    fn default() -> Self {
        super::DEFAULT_GROUPING_THRESHOLDS
    }
}

impl GroupingThresholds {
    pub fn validate(&self) -> Result<(), String> {
        let values = [
            self.quantity_tolerance,
            self.price_ratio_min,
            self.price_ratio_max,
            self.token_overlap_min,
        ];
        if values.iter().any(|value| !value.is_finite() || *value < 0.0) {
            return Err("search.grouping thresholds must be finite and non-negative".to_string());
        }
        if self.price_ratio_min >= self.price_ratio_max {
            return Err(
                "search.grouping.price_ratio_min must be lower than price_ratio_max".to_string()
            );
        }
        if self.token_overlap_min > 1.0 {
            return Err("search.grouping.token_overlap_min must be within 0..=1".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct GroupingEngine {
    thresholds: GroupingThresholds,
}

/// Matching key of a group while the scan is running.
struct OpenGroup {
    group: ProductGroup,
    unit: &'static str,
    quantity: f64,
    brand: String,
    tokens: HashSet<String>,
}

/// Matching key of the candidate being placed.
struct CandidateKey {
    unit: &'static str,
    quantity: f64,
    brand: String,
    tokens: HashSet<String>,
}

impl GroupingEngine {
    pub fn new(thresholds: GroupingThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &GroupingThresholds {
        &self.thresholds
    }

    /// Merges `candidates` (best match first) into product groups. Each
    /// group's store prices are returned cheapest first.
    pub fn group(&self, candidates: &[SearchCandidate<'_>]) -> Vec<ProductGroup> {
        let mut open: Vec<OpenGroup> = Vec::new();

        for candidate in candidates {
            let key = candidate_key(candidate.record);
            match open.iter_mut().find(|group| self.matches(group, &key, candidate.record)) {
                Some(group) => absorb(&mut group.group, candidate),
                None => {
                    let mut group =
                        ProductGroup::singleton(candidate.record, candidate.similarity_score);
                    group.name = strip_bracketed_suffix(&candidate.record.name).to_string();
                    open.push(OpenGroup {
                        group,
                        unit: key.unit,
                        quantity: key.quantity,
                        brand: key.brand,
                        tokens: key.tokens,
                    });
                }
            }
        }

        open.into_iter()
            .map(|open_group| {
                let mut group = open_group.group;
                group.store_prices.sort_by(|a, b| {
                    a.price.partial_cmp(&b.price).unwrap_or(std::cmp::Ordering::Equal)
                });
                group
            })
            .collect()
    }

    fn matches(&self, group: &OpenGroup, key: &CandidateKey, record: &CatalogRecord) -> bool {
        if group.unit != key.unit
            || (group.quantity - key.quantity).abs() >= self.thresholds.quantity_tolerance
        {
            return false;
        }

        if !key.brand.is_empty() && key.brand == group.brand {
            return key.tokens.intersection(&group.tokens).next().is_some();
        }

        let group_price = group.group.min_price;
        if group_price <= 0.0 {
            return false;
        }
        let ratio = record.price / group_price;
        if ratio < self.thresholds.price_ratio_min || ratio > self.thresholds.price_ratio_max {
            return false;
        }

        token_overlap(&key.tokens, &group.tokens) > self.thresholds.token_overlap_min
    }
}

/// Pack size of a listing: its own unit and quantity when both are usable,
/// otherwise whatever the name states.
pub fn resolve_quantity_unit(record: &CatalogRecord) -> (f64, &'static str) {
    let own_unit = record.unit.as_deref().map(classify_unit).unwrap_or("");
    match record.quantity {
        Some(quantity) if !own_unit.is_empty() && quantity != 0.0 => (quantity, own_unit),
        _ => extract_quantity_unit(&record.name),
    }
}

/// Identity tokens of a listing name.
pub fn name_tokens(name: &str) -> HashSet<String> {
    clean_name(strip_bracketed_suffix(name)).split_whitespace().map(str::to_string).collect()
}

fn candidate_key(record: &CatalogRecord) -> CandidateKey {
    let (quantity, unit) = resolve_quantity_unit(record);
    CandidateKey { unit, quantity, brand: record.brand_key(), tokens: name_tokens(&record.name) }
}

fn token_overlap(left: &HashSet<String>, right: &HashSet<String>) -> f64 {
    let larger = left.len().max(right.len());
    if larger == 0 {
        return 0.0;
    }
    left.intersection(right).count() as f64 / larger as f64
}

fn absorb(group: &mut ProductGroup, candidate: &SearchCandidate<'_>) {
    let record = candidate.record;
    let offer = StorePrice::from_record(record);

    match group.store_prices.iter_mut().find(|existing| existing.store_name == offer.store_name)
    {
        Some(existing) => {
            if offer.price < existing.price {
                *existing = offer;
            }
        }
        None => group.store_prices.push(offer),
    }

    group.min_price = group.min_price.min(record.price);
    group.similarity_score = group.similarity_score.max(candidate.similarity_score);
    group.member_ids.push(record.id);
}
