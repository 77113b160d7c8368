//! Catalog search: normalization, lexical retrieval, cross-store grouping,
//! ranking and related-item recommendations over one live index generation.

mod cache;
pub mod grouping;
pub mod index;
pub mod normalize;
pub mod ranking;
pub mod recommend;
mod service;

pub use grouping::{GroupingEngine, GroupingThresholds};
pub use index::{LexicalIndex, SearchCandidate};
pub use ranking::{RankingEngine, RankingWeights};
pub use recommend::{RecommendationEngine, RecommendationWeights};
pub use service::{IndexGeneration, IndexStats, SearchService};

/// Default grouping thresholds
pub const DEFAULT_GROUPING_THRESHOLDS: GroupingThresholds = GroupingThresholds {
    quantity_tolerance: 0.001,
    price_ratio_min: 0.6,
    price_ratio_max: 1.6,
    token_overlap_min: 0.6,
};

/// Default ranking blend
pub const DEFAULT_RANKING_WEIGHTS: RankingWeights =
    RankingWeights { similarity: 0.5, price: 0.3, brand: 0.2, unbranded_score: 0.5 };

/// Default recommendation scoring
pub const DEFAULT_RECOMMENDATION_WEIGHTS: RecommendationWeights = RecommendationWeights {
    brand: 0.4,
    category: 0.3,
    similarity: 0.3,
    premium_penalty: 0.2,
    min_score: 0.2,
    candidate_pool: 50,
    default_top_n: 6,
    similar_price_min: 0.8,
    similar_price_max: 1.2,
    premium_ratio: 1.5,
};

/// Listings handed to grouping when the caller gives no limit
pub const DEFAULT_TOP_N: usize = 20;

/// Vocabulary cap of the lexical index
pub const DEFAULT_MAX_VOCABULARY: usize = 5000;

/// Cached search responses; zero disables the cache
pub const DEFAULT_CACHE_CAPACITY: usize = 100;

/// Every tuning knob of the search pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchSettings {
    pub default_top_n: usize,
    pub max_vocabulary: usize,
    pub cache_capacity: usize,
    pub grouping: GroupingThresholds,
    pub ranking: RankingWeights,
    pub recommendation: RecommendationWeights,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            default_top_n: DEFAULT_TOP_N,
            max_vocabulary: DEFAULT_MAX_VOCABULARY,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            grouping: DEFAULT_GROUPING_THRESHOLDS,
            ranking: DEFAULT_RANKING_WEIGHTS,
            recommendation: DEFAULT_RECOMMENDATION_WEIGHTS,
        }
    }
}

impl SearchSettings {
    pub fn validate(&self) -> Result<(), String> {
        if self.default_top_n == 0 {
            return Err("search.default_top_n must be greater than zero".to_string());
        }
        if self.max_vocabulary == 0 {
            return Err("search.max_vocabulary must be greater than zero".to_string());
        }
        self.grouping.validate()?;
        self.ranking.validate()?;
        self.recommendation.validate()
    }
}
