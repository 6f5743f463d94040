use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, OnceLock};

use crate::error::TaxonomyError;
use crate::index::{IndexedItemGroup, TaxonomyIndex};
use crate::model::Taxonomy;
use crate::score::{self, MAX_SCORE};
use crate::variants::{confusable_variants, normalize_query};

/// Queries shorter than this (after trimming) are never matched.
pub const MIN_QUERY_CHARS: usize = 2;

/// Default acceptance threshold for automatic tagging.
pub const DEFAULT_MIN_CONFIDENCE: f32 = 0.5;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CategoryMatch {
    pub item_group: IndexedItemGroup,
    /// Relative ranking signal in [0, 1], not a calibrated probability.
    pub confidence: f32,
    /// The query form that produced the hit: the normalized text or one of
    /// its confusable-character variants.
    pub matched_variant: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MatchedItem {
    pub index: usize,
    pub text: String,
    pub category_match: CategoryMatch,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UnmatchedItem {
    pub index: usize,
    pub text: String,
    /// The best hit found, if any, even though it fell below the threshold.
    pub best: Option<CategoryMatch>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct MatchSummary {
    pub matched: Vec<MatchedItem>,
    pub unmatched: Vec<UnmatchedItem>,
    /// Mean confidence over `matched` only; 0.0 when nothing matched.
    pub average_confidence: f32,
}

impl TaxonomyIndex {
    /// Best item group for `text` across the normalized query and its
    /// confusable variants. Ties keep the earliest query form, then the
    /// earliest item group in taxonomy order.
    pub fn find_best_match(&self, text: &str) -> Option<CategoryMatch> {
        if text.trim().chars().count() < MIN_QUERY_CHARS {
            return None;
        }
        let normalized = normalize_query(text);
        if normalized.is_empty() {
            return None;
        }

        let mut queries = vec![normalized.clone()];
        queries.extend(confusable_variants(&normalized));

        let mut best: Option<(f64, &IndexedItemGroup, &str)> = None;
        for query in &queries {
            for (group, key) in self.entries() {
                let s = score::score(query, key);
                if s > MAX_SCORE {
                    continue;
                }
                if best.map_or(true, |(b, _, _)| s < b) {
                    best = Some((s, group, query.as_str()));
                }
            }
        }

        best.map(|(s, group, query)| CategoryMatch {
            item_group: group.clone(),
            confidence: score::confidence(s),
            matched_variant: query.to_string(),
        })
    }

    /// Classify each text independently and split at `min_confidence`.
    pub fn match_items<S: AsRef<str>>(&self, texts: &[S], min_confidence: f32) -> MatchSummary {
        let mut summary = MatchSummary::default();
        for (index, text) in texts.iter().enumerate() {
            let text = text.as_ref().to_string();
            match self.find_best_match(&text) {
                Some(m) if m.confidence >= min_confidence => {
                    summary.matched.push(MatchedItem { index, text, category_match: m });
                }
                best => summary.unmatched.push(UnmatchedItem { index, text, best }),
            }
        }
        if !summary.matched.is_empty() {
            let total: f32 = summary.matched.iter().map(|m| m.category_match.confidence).sum();
            summary.average_confidence = total / summary.matched.len() as f32;
        }
        summary
    }
}

/// Owns the current [`TaxonomyIndex`] generation.
///
/// Readers clone an `Arc` to the published generation and work on it
/// without holding the lock, so a concurrent [`rebuild`](Self::rebuild)
/// never exposes a half-built index: a reader sees the old generation or
/// the new one.
#[derive(Debug, Default)]
pub struct CategoryMatcher {
    current: RwLock<Option<Arc<TaxonomyIndex>>>,
}

impl CategoryMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build and publish an index for `taxonomy`. A no-op when a generation
    /// is already published.
    pub fn initialize(&self, taxonomy: &Taxonomy) -> Result<(), TaxonomyError> {
        if self.is_initialized() {
            return Ok(());
        }
        let index = Arc::new(build_logged(taxonomy)?);
        let mut current = self.current.write();
        if current.is_none() {
            tracing::info!(item_groups = index.len(), "taxonomy index published");
            *current = Some(index);
        }
        Ok(())
    }

    /// Build a new generation and swap it in, replacing any existing one.
    /// On failure the previous generation stays published.
    pub fn rebuild(&self, taxonomy: &Taxonomy) -> Result<(), TaxonomyError> {
        let index = Arc::new(build_logged(taxonomy)?);
        tracing::info!(item_groups = index.len(), "taxonomy index rebuilt");
        *self.current.write() = Some(index);
        Ok(())
    }

    /// Drop the published generation; the next `initialize` builds afresh.
    pub fn reset(&self) {
        if self.current.write().take().is_some() {
            tracing::info!("taxonomy index reset");
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.current.read().is_some()
    }

    /// The published generation.
    pub fn snapshot(&self) -> Result<Arc<TaxonomyIndex>, TaxonomyError> {
        self.current.read().clone().ok_or(TaxonomyError::NotInitialized)
    }

    pub fn find_best_match(&self, text: &str) -> Result<Option<CategoryMatch>, TaxonomyError> {
        Ok(self.snapshot()?.find_best_match(text))
    }

    /// Classify every text against one generation.
    pub fn match_receipt_items<S: AsRef<str>>(
        &self,
        texts: &[S],
        min_confidence: f32,
    ) -> Result<MatchSummary, TaxonomyError> {
        Ok(self.snapshot()?.match_items(texts, min_confidence))
    }

    pub fn by_department(&self, department_id: &str) -> Result<Vec<IndexedItemGroup>, TaxonomyError> {
        Ok(self.snapshot()?.by_department(department_id).into_iter().cloned().collect())
    }

    pub fn by_category(&self, category_id: &str) -> Result<Vec<IndexedItemGroup>, TaxonomyError> {
        Ok(self.snapshot()?.by_category(category_id).into_iter().cloned().collect())
    }

    pub fn by_subcategory(&self, subcategory_id: &str) -> Result<Vec<IndexedItemGroup>, TaxonomyError> {
        Ok(self.snapshot()?.by_subcategory(subcategory_id).into_iter().cloned().collect())
    }

    /// Process-wide matcher over the built-in taxonomy, initialized on
    /// first use. Tests and callers with their own taxonomy should own a
    /// `CategoryMatcher` instead.
    pub fn shared() -> Result<&'static CategoryMatcher, TaxonomyError> {
        static SHARED: OnceLock<CategoryMatcher> = OnceLock::new();
        let matcher = SHARED.get_or_init(CategoryMatcher::new);
        if !matcher.is_initialized() {
            matcher.initialize(&Taxonomy::builtin()?)?;
        }
        Ok(matcher)
    }
}

fn build_logged(taxonomy: &Taxonomy) -> Result<TaxonomyIndex, TaxonomyError> {
    TaxonomyIndex::build(taxonomy).inspect_err(|e| tracing::warn!("taxonomy rejected: {e}"))
}
