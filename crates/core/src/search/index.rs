//! Weighted term-vector space over one catalog snapshot.
//!
//! Each listing is indexed by the unigrams and bigrams of its normalized
//! `name + brand`. Terms are weighted with smoothed inverse document
//! frequency and every listing vector is scaled to unit length, so a query
//! score is the cosine similarity between the query and the listing.

use std::collections::{BTreeMap, HashMap, HashSet};

use tracing::{debug, warn};

use crate::domain::product::{CatalogRecord, ProductId};
use crate::search::normalize::normalize;

/// A listing retrieved for one query.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SearchCandidate<'a> {
    pub record: &'a CatalogRecord,
    pub similarity_score: f64,
}

#[derive(Debug, Default)]
pub struct LexicalIndex {
    records: Vec<CatalogRecord>,
    positions: HashMap<ProductId, usize>,
    vocabulary: HashMap<String, usize>,
    idf: Vec<f64>,
    /// Per vocabulary term: (record position, unit-normalized weight).
    postings: Vec<Vec<(usize, f64)>>,
}

impl LexicalIndex {
    /// Builds the index, keeping at most `max_vocabulary` terms ranked by
    /// corpus frequency. Records with unusable numeric fields are repaired and
    /// kept.
    pub fn build(records: Vec<CatalogRecord>, max_vocabulary: usize) -> Self {
        let mut records = records;
        let mut repaired = 0usize;
        for record in &mut records {
            if record.sanitize() {
                repaired += 1;
                warn!(
                    event_name = "search.index.malformed_record",
                    product_id = %record.id,
                    "repaired malformed numeric fields on catalog record"
                );
            }
        }

        let documents: Vec<Vec<String>> =
            records.iter().map(document_terms).collect();

        let mut corpus_counts: HashMap<&str, usize> = HashMap::new();
        let mut document_frequency: HashMap<&str, usize> = HashMap::new();
        for terms in &documents {
            let mut seen = HashSet::new();
            for term in terms {
                *corpus_counts.entry(term.as_str()).or_insert(0) += 1;
                if seen.insert(term.as_str()) {
                    *document_frequency.entry(term.as_str()).or_insert(0) += 1;
                }
            }
        }

        let mut ranked_terms: Vec<(&str, usize)> = corpus_counts.into_iter().collect();
        ranked_terms.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        ranked_terms.truncate(max_vocabulary);

        let total = records.len() as f64;
        let mut vocabulary = HashMap::with_capacity(ranked_terms.len());
        let mut idf = Vec::with_capacity(ranked_terms.len());
        for (position, (term, _)) in ranked_terms.iter().enumerate() {
            let df = document_frequency.get(term).copied().unwrap_or(0) as f64;
            vocabulary.insert((*term).to_string(), position);
            idf.push(((1.0 + total) / (1.0 + df)).ln() + 1.0);
        }

        let mut postings = vec![Vec::new(); vocabulary.len()];
        for (position, terms) in documents.iter().enumerate() {
            for (term, weight) in weigh_terms(terms, &vocabulary, &idf) {
                postings[term].push((position, weight));
            }
        }

        let mut positions = HashMap::with_capacity(records.len());
        for (position, record) in records.iter().enumerate() {
            positions.entry(record.id).or_insert(position);
        }

        debug!(
            event_name = "search.index.built",
            records = records.len(),
            vocabulary = vocabulary.len(),
            repaired,
            "lexical index built"
        );

        Self { records, positions, vocabulary, idf, postings }
    }

    /// Listings with positive cosine similarity to `text`, best first, at most
    /// `top_n`. Equal scores keep catalog order. Terms outside the vocabulary
    /// contribute nothing.
    pub fn query(&self, text: &str, top_n: usize) -> Vec<SearchCandidate<'_>> {
        if self.records.is_empty() || top_n == 0 {
            return Vec::new();
        }

        let terms = ngrams(&normalize(text));
        let query_vector = weigh_terms(&terms, &self.vocabulary, &self.idf);
        if query_vector.is_empty() {
            return Vec::new();
        }

        let mut scores = vec![0.0f64; self.records.len()];
        for (term, query_weight) in query_vector {
            for (position, weight) in &self.postings[term] {
                scores[*position] += query_weight * weight;
            }
        }

        let mut ranked: Vec<(usize, f64)> =
            scores.into_iter().enumerate().filter(|(_, score)| *score > 0.0).collect();
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        ranked.truncate(top_n);

        ranked
            .into_iter()
            .map(|(position, score)| SearchCandidate {
                record: &self.records[position],
                similarity_score: score.min(1.0),
            })
            .collect()
    }

    pub fn lookup(&self, product_id: ProductId) -> Option<&CatalogRecord> {
        self.positions.get(&product_id).map(|position| &self.records[*position])
    }

    pub fn records(&self) -> &[CatalogRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn vocabulary_size(&self) -> usize {
        self.vocabulary.len()
    }
}

fn document_terms(record: &CatalogRecord) -> Vec<String> {
    let text = format!("{} {}", record.name, record.brand.as_deref().unwrap_or_default());
    ngrams(&normalize(&text))
}

/// Word unigrams of at least two characters plus their adjacent bigrams.
fn ngrams(normalized: &str) -> Vec<String> {
    let words: Vec<&str> =
        normalized.split_whitespace().filter(|word| word.chars().count() >= 2).collect();

    let mut terms: Vec<String> = words.iter().map(|word| (*word).to_string()).collect();
    terms.extend(words.windows(2).map(|pair| format!("{} {}", pair[0], pair[1])));
    terms
}

/// Unit-length tf-idf weights for the in-vocabulary terms of one document,
/// ordered by vocabulary position so identical documents get bit-identical
/// weights.
fn weigh_terms(
    terms: &[String],
    vocabulary: &HashMap<String, usize>,
    idf: &[f64],
) -> Vec<(usize, f64)> {
    let mut counts: BTreeMap<usize, f64> = BTreeMap::new();
    for term in terms {
        if let Some(position) = vocabulary.get(term) {
            *counts.entry(*position).or_insert(0.0) += 1.0;
        }
    }

    let mut weighted: Vec<(usize, f64)> =
        counts.into_iter().map(|(position, count)| (position, count * idf[position])).collect();
    let norm = weighted.iter().map(|(_, weight)| weight * weight).sum::<f64>().sqrt();
    if norm == 0.0 {
        return Vec::new();
    }

    for (_, weight) in &mut weighted {
        *weight /= norm;
    }
    weighted
}

#[cfg(test)]
mod tests {
    use super::LexicalIndex;
    use crate::domain::product::{CatalogRecord, ProductId};

    fn record(id: i64, name: &str, brand: Option<&str>) -> CatalogRecord {
        CatalogRecord {
            id: ProductId(id),
            name: name.to_string(),
            brand: brand.map(str::to_string),
            category: None,
            unit: None,
            quantity: None,
            price: 100.0,
            discounted_price: None,
            store_name: "Metro".to_string(),
            url: format!("https://metro.example/{id}"),
            image_url: None,
        }
    }

    fn catalog() -> Vec<CatalogRecord> {
        vec![
            record(1, "Olpers Milk 1L", Some("Olpers")),
            record(2, "Tapal Danedar Tea 950g", Some("Tapal")),
            record(3, "Nestle Milkpak 1L", Some("Nestle")),
            record(4, "Dalda Cooking Oil 1L", Some("Dalda")),
        ]
    }

    #[test]
    fn empty_catalog_builds_and_answers_nothing() {
        let index = LexicalIndex::build(Vec::new(), 5000);
        assert!(index.is_empty());
        assert!(index.query("milk", 20).is_empty());
    }

    #[test]
    fn query_returns_matches_best_first() {
        let index = LexicalIndex::build(catalog(), 5000);
        let candidates = index.query("olpers milk", 20);

        assert!(!candidates.is_empty());
        assert_eq!(candidates[0].record.id, ProductId(1));
        for pair in candidates.windows(2) {
            assert!(pair[0].similarity_score >= pair[1].similarity_score);
        }
        for candidate in &candidates {
            assert!(candidate.similarity_score > 0.0 && candidate.similarity_score <= 1.0);
        }
    }

    #[test]
    fn unknown_terms_contribute_nothing() {
        let index = LexicalIndex::build(catalog(), 5000);
        assert!(index.query("quinoa", 20).is_empty());
        assert!(index.query("", 20).is_empty());
    }

    #[test]
    fn ties_keep_catalog_order() {
        let index = LexicalIndex::build(
            vec![record(10, "Sugar 1kg", None), record(11, "Sugar 1kg", None)],
            5000,
        );
        let candidates = index.query("sugar", 20);

        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].record.id, ProductId(10));
        assert_eq!(candidates[1].record.id, ProductId(11));
        assert_eq!(candidates[0].similarity_score, candidates[1].similarity_score);
    }

    #[test]
    fn identical_listings_tie_exactly_and_keep_catalog_order() {
        let mut records = vec![
            record(1, "Nestle Milkpak 1L", Some("Nestle")),
            record(2, "Haleeb Milk 1L", Some("Haleeb")),
            record(3, "Dalda Cooking Oil 1L", Some("Dalda")),
        ];
        records.extend((10..30).map(|id| record(id, "Olpers Full Cream Milk 1 L", None)));

        for _ in 0..25 {
            let index = LexicalIndex::build(records.clone(), 5000);
            let candidates = index.query("milk", 50);
            let duplicates: Vec<&super::SearchCandidate<'_>> =
                candidates.iter().filter(|candidate| candidate.record.id.0 >= 10).collect();

            let ids: Vec<i64> = duplicates.iter().map(|candidate| candidate.record.id.0).collect();
            assert_eq!(ids, (10..30).collect::<Vec<_>>());
            assert!(duplicates
                .windows(2)
                .all(|pair| pair[0].similarity_score == pair[1].similarity_score));
        }
    }

    #[test]
    fn rebuilding_the_same_catalog_scores_identically() {
        let first = LexicalIndex::build(catalog(), 5000);
        let second = LexicalIndex::build(catalog(), 5000);

        let scores = |index: &LexicalIndex| -> Vec<(i64, f64)> {
            index
                .query("olpers milk 1l", 20)
                .iter()
                .map(|candidate| (candidate.record.id.0, candidate.similarity_score))
                .collect()
        };
        assert_eq!(scores(&first), scores(&second));
    }

    #[test]
    fn top_n_bounds_candidates() {
        let index = LexicalIndex::build(catalog(), 5000);
        assert_eq!(index.query("1l", 2).len(), 2);
    }

    #[test]
    fn vocabulary_is_capped() {
        let index = LexicalIndex::build(catalog(), 3);
        assert_eq!(index.vocabulary_size(), 3);
    }

    #[test]
    fn malformed_prices_are_repaired_not_dropped() {
        let mut broken = record(5, "Mystery Item", None);
        broken.price = f64::NAN;
        let index = LexicalIndex::build(vec![broken], 5000);

        let found = index.lookup(ProductId(5)).expect("record should be kept");
        assert_eq!(found.price, 0.0);
    }

    #[test]
    fn lookup_resolves_by_id() {
        let index = LexicalIndex::build(catalog(), 5000);
        assert_eq!(index.lookup(ProductId(3)).map(|r| r.name.as_str()), Some("Nestle Milkpak 1L"));
        assert!(index.lookup(ProductId(99)).is_none());
    }
}
