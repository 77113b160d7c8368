use std::num::NonZeroUsize;
use std::sync::{Mutex, PoisonError};

use lru::LruCache;

use crate::domain::group::RankedGroup;

type CacheKey = (String, usize);

/// Ranked responses keyed by raw query text and limit. Entries remember the
/// index generation they were computed from and never outlive it.
pub(crate) struct ResponseCache {
    entries: Mutex<LruCache<CacheKey, (u64, Vec<RankedGroup>)>>,
}

impl ResponseCache {
    /// `None` when `capacity` is zero.
    pub(crate) fn new(capacity: usize) -> Option<Self> {
        NonZeroUsize::new(capacity)
            .map(|capacity| Self { entries: Mutex::new(LruCache::new(capacity)) })
    }

    pub(crate) fn get(
        &self,
        generation: u64,
        query: &str,
        top_n: usize,
    ) -> Option<Vec<RankedGroup>> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        match entries.get(&(query.to_string(), top_n)) {
            Some((cached_generation, groups)) if *cached_generation == generation => {
                Some(groups.clone())
            }
            _ => None,
        }
    }

    pub(crate) fn put(&self, generation: u64, query: &str, top_n: usize, groups: &[RankedGroup]) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.put((query.to_string(), top_n), (generation, groups.to_vec()));
    }

    pub(crate) fn clear(&self) {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}
