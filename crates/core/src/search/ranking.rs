//! Final ordering of product groups for a search response.

use crate::domain::group::{ProductGroup, RankedGroup};

/// Weights for the ranking blend
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankingWeights {
    /// Weight of textual similarity (default: 0.5)
    pub similarity: f64,
    /// Weight of relative cheapness (default: 0.3)
    pub price: f64,
    /// Weight of brand presence (default: 0.2)
    pub brand: f64,
    /// Brand score given to groups without a brand (default: 0.5)
    pub unbranded_score: f64,
}

impl Default for RankingWeights {
    fn default() -> Self {
        super::DEFAULT_RANKING_WEIGHTS
    }
}

impl RankingWeights {
    pub fn validate(&self) -> Result<(), String> {
        let values = [self.similarity, self.price, self.brand, self.unbranded_score];
        if values.iter().any(|value| !value.is_finite() || *value < 0.0) {
            return Err("search.ranking weights must be finite and non-negative".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct RankingEngine {
    weights: RankingWeights,
}

impl RankingEngine {
    pub fn new(weights: RankingWeights) -> Self {
        Self { weights }
    }

    /// Scores every group and sorts best first; equal scores keep input
    /// order. When no group has a positive price the input order is kept
    /// as is. Unpriced groups among priced ones score above the cheapest
    /// priced group on price, since the price term is not clamped.
    pub fn rank(&self, groups: Vec<ProductGroup>) -> Vec<RankedGroup> {
        let bounds = price_bounds(&groups);
        let (min_price, price_range) = bounds.unwrap_or((0.0, 1.0));

        let mut ranked: Vec<RankedGroup> = groups
            .into_iter()
            .map(|group| {
                let final_ranking_score = self.score(&group, min_price, price_range);
                RankedGroup { group, final_ranking_score }
            })
            .collect();

        if bounds.is_some() {
            ranked.sort_by(|a, b| {
                b.final_ranking_score
                    .partial_cmp(&a.final_ranking_score)
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
        }
        ranked
    }

    fn score(&self, group: &ProductGroup, min_price: f64, price_range: f64) -> f64 {
        let price_score = 1.0 - (group.min_price - min_price) / price_range;
        let branded = group.brand.as_deref().is_some_and(|brand| !brand.trim().is_empty());
        let brand_score = if branded { 1.0 } else { self.weights.unbranded_score };

        group.similarity_score * self.weights.similarity
            + price_score * self.weights.price
            + brand_score * self.weights.brand
    }
}

/// Lowest positive price and the spread over positive prices, 1.0 when the
/// spread is zero. None when nothing is priced.
fn price_bounds(groups: &[ProductGroup]) -> Option<(f64, f64)> {
    let mut prices = groups.iter().map(|group| group.min_price).filter(|price| *price > 0.0);
    let first = prices.next()?;

    let (min, max) =
        prices.fold((first, first), |(min, max), price| (min.min(price), max.max(price)));
    let range = if max > min { max - min } else { 1.0 };
    Some((min, range))
}
