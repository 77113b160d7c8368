use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::catalog::CatalogSource;
use crate::domain::group::{PriceComparison, ProductGroup, RankedGroup, RecommendationCandidate};
use crate::domain::product::{CatalogRecord, ProductId};
use crate::errors::{ApplicationError, DomainError};

use super::cache::ResponseCache;
use super::{GroupingEngine, LexicalIndex, RankingEngine, RecommendationEngine, SearchSettings};

/// Listings examined when assembling a product's own group.
const DETAIL_POOL: usize = 10;
/// Listings examined when building a price comparison.
const COMPARE_POOL: usize = 50;

/// One immutable build of the index. Readers hold an `Arc` to the generation
/// they started with, so a refresh never changes results mid-request.
#[derive(Debug)]
pub struct IndexGeneration {
    pub generation: u64,
    pub built_at: DateTime<Utc>,
    pub index: LexicalIndex,
}

impl IndexGeneration {
    fn empty() -> Self {
        Self { generation: 0, built_at: Utc::now(), index: LexicalIndex::default() }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct IndexStats {
    pub generation: u64,
    pub built_at: DateTime<Utc>,
    pub records: usize,
    pub vocabulary: usize,
    pub ready: bool,
}

impl From<&IndexGeneration> for IndexStats {
    fn from(value: &IndexGeneration) -> Self {
        Self {
            generation: value.generation,
            built_at: value.built_at,
            records: value.index.len(),
            vocabulary: value.index.vocabulary_size(),
            ready: value.generation > 0,
        }
    }
}

pub struct SearchService {
    source: Arc<dyn CatalogSource>,
    settings: SearchSettings,
    grouping: GroupingEngine,
    ranking: RankingEngine,
    recommendation: RecommendationEngine,
    live: RwLock<Arc<IndexGeneration>>,
    next_generation: AtomicU64,
    cache: Option<ResponseCache>,
}

impl SearchService {
    /// Starts with an empty generation 0; call [`SearchService::refresh`] to
    /// load the catalog.
    pub fn new(source: Arc<dyn CatalogSource>, settings: SearchSettings) -> Self {
        let grouping = GroupingEngine::new(settings.grouping);
        Self {
            source,
            ranking: RankingEngine::new(settings.ranking),
            recommendation: RecommendationEngine::new(settings.recommendation, grouping.clone()),
            grouping,
            cache: ResponseCache::new(settings.cache_capacity),
            live: RwLock::new(Arc::new(IndexGeneration::empty())),
            next_generation: AtomicU64::new(1),
            settings,
        }
    }

    pub fn settings(&self) -> &SearchSettings {
        &self.settings
    }

    /// Snapshot of the live generation.
    pub fn current(&self) -> Arc<IndexGeneration> {
        Arc::clone(&self.live.read().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn stats(&self) -> IndexStats {
        IndexStats::from(self.current().as_ref())
    }

    /// Reloads the catalog and publishes a new generation. On failure the
    /// previous generation keeps serving.
    pub async fn refresh(&self) -> Result<IndexStats, ApplicationError> {
        let generation = self.next_generation.fetch_add(1, Ordering::SeqCst);
        let records = match self.source.load_catalog().await {
            Ok(records) => records,
            Err(error) => {
                warn!(
                    event_name = "search.refresh.failed",
                    generation,
                    error = %error,
                    "catalog reload failed; keeping previous index generation"
                );
                return Err(error);
            }
        };

        let built = Arc::new(IndexGeneration {
            generation,
            built_at: Utc::now(),
            index: LexicalIndex::build(records, self.settings.max_vocabulary),
        });
        let stats = IndexStats::from(built.as_ref());

        {
            let mut live = self.live.write().unwrap_or_else(PoisonError::into_inner);
            if live.generation > generation {
                debug!(
                    event_name = "search.refresh.superseded",
                    generation,
                    live_generation = live.generation,
                    "newer index generation already published"
                );
                return Ok(IndexStats::from(live.as_ref()));
            }
            *live = built;
        }
        if let Some(cache) = &self.cache {
            cache.clear();
        }

        info!(
            event_name = "search.refresh.completed",
            generation,
            records = stats.records,
            vocabulary = stats.vocabulary,
            "index generation published"
        );
        Ok(stats)
    }

    /// Ranked groups for `query`. Blank or unmatched queries yield an empty list.
    pub fn search(&self, query: &str, top_n: Option<usize>) -> Vec<RankedGroup> {
        let top_n = top_n.unwrap_or(self.settings.default_top_n);
        let live = self.current();

        if let Some(cache) = &self.cache {
            if let Some(hit) = cache.get(live.generation, query, top_n) {
                debug!(event_name = "search.cache.hit", top_n, "served search from cache");
                return hit;
            }
        }

        let candidates = live.index.query(query, top_n);
        let ranked = self.ranking.rank(self.grouping.group(&candidates));

        if let Some(cache) = &self.cache {
            cache.put(live.generation, query, top_n, &ranked);
        }
        ranked
    }

    pub fn recommend(
        &self,
        product_id: ProductId,
        top_n: Option<usize>,
    ) -> Result<Vec<RecommendationCandidate>, ApplicationError> {
        let top_n = top_n.unwrap_or(self.recommendation.weights().default_top_n);
        let live = self.current();
        Ok(self.recommendation.recommend(&live.index, product_id, top_n)?)
    }

    pub fn lookup(&self, product_id: ProductId) -> Result<CatalogRecord, ApplicationError> {
        self.current()
            .index
            .lookup(product_id)
            .cloned()
            .ok_or_else(|| DomainError::ProductNotFound(product_id).into())
    }

    /// The group the product belongs to, with every store's price for it.
    pub fn product_detail(&self, product_id: ProductId) -> Result<ProductGroup, ApplicationError> {
        let live = self.current();
        let target =
            live.index.lookup(product_id).ok_or(DomainError::ProductNotFound(product_id))?;

        let candidates = live.index.query(&target.name, DETAIL_POOL);
        let detail = self
            .grouping
            .group(&candidates)
            .into_iter()
            .find(|group| group.contains(product_id))
            .unwrap_or_else(|| ProductGroup::singleton(target, 0.0));
        Ok(detail)
    }

    /// The listing beside the other groups a search for its name surfaces,
    /// with the price span across every surfaced group.
    pub fn compare(&self, product_id: ProductId) -> Result<PriceComparison, ApplicationError> {
        let live = self.current();
        let target =
            live.index.lookup(product_id).ok_or(DomainError::ProductNotFound(product_id))?;

        let candidates = live.index.query(&target.name, COMPARE_POOL);
        let groups = self.grouping.group(&candidates);

        let (min_price, max_price) = if groups.is_empty() {
            (target.price, target.price)
        } else {
            groups.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(low, high), group| {
                (low.min(group.min_price), high.max(group.min_price))
            })
        };

        let alternatives =
            groups.into_iter().filter(|group| !group.contains(product_id)).collect();

        Ok(PriceComparison {
            target: target.clone(),
            alternatives,
            min_price,
            max_price,
        })
    }

    /// Distinct store names in the live catalog, sorted.
    pub fn stores(&self) -> Vec<String> {
        let live = self.current();
        live.index
            .records()
            .iter()
            .map(|record| record.store_name.trim())
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}
