use thiserror::Error;
use tezgah_taxonomy::{CategoryMatcher, TaxonomyError, DEFAULT_MIN_CONFIDENCE};

use crate::parser::ReceiptParser;
use crate::types::{CategorizedItem, CategorizedReceipt};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Categorization failed: {0}")]
    Taxonomy(#[from] TaxonomyError),
}

/// Orchestrates: parse → classify every item name → merge.
pub struct ReceiptPipeline<'m> {
    parser: ReceiptParser,
    matcher: &'m CategoryMatcher,
    min_confidence: f32,
}

impl<'m> ReceiptPipeline<'m> {
    pub fn new(parser: ReceiptParser, matcher: &'m CategoryMatcher) -> Self {
        Self { parser, matcher, min_confidence: DEFAULT_MIN_CONFIDENCE }
    }

    /// Category matches below this confidence leave the item uncategorized.
    pub fn with_min_confidence(mut self, min_confidence: f32) -> Self {
        self.min_confidence = min_confidence.clamp(0.0, 1.0);
        self
    }

    pub fn parser(&self) -> &ReceiptParser {
        &self.parser
    }

    /// Parse `ocr_text` and categorize its items against one taxonomy
    /// generation. Fails only when the matcher has no taxonomy loaded.
    pub fn process(&self, ocr_text: &str) -> Result<CategorizedReceipt, PipelineError> {
        let index = self.matcher.snapshot()?;
        let receipt = self.parser.parse(ocr_text);

        let names: Vec<&str> = receipt.items.iter().map(|i| i.raw_name.as_str()).collect();
        let summary = index.match_items(&names, self.min_confidence);

        let mut items: Vec<CategorizedItem> = receipt
            .items
            .iter()
            .map(|item| CategorizedItem { item: item.clone(), category: None })
            .collect();
        for matched in summary.matched {
            items[matched.index].category = Some(matched.category_match);
        }

        tracing::debug!(
            items = items.len(),
            uncategorized = summary.unmatched.len(),
            total_confidence = receipt.total.confidence,
            "receipt processed"
        );

        Ok(CategorizedReceipt {
            receipt,
            items,
            average_category_confidence: summary.average_confidence,
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tezgah_core::Money;
    use tezgah_taxonomy::Taxonomy;

    const RECEIPT: &str = "\
MIGROS TICARET A.S.
ATASEHIR / ISTANBUL
TARIH 07.09.2024
AYRAN 12,50 %1
TAM BUGDAY EKMEGI 17,50 %1
XQZVW JJJ 99,00 %20
TOPLAM KDV 10,10
TOPLAM 129,00";

    fn matcher() -> CategoryMatcher {
        let m = CategoryMatcher::new();
        m.initialize(&Taxonomy::builtin().unwrap()).unwrap();
        m
    }

    fn parser() -> ReceiptParser {
        ReceiptParser::builtin()
            .unwrap()
            .with_reference_date(NaiveDate::from_ymd_opt(2026, 1, 1).unwrap())
    }

    #[test]
    fn process_parses_and_categorizes() {
        let m = matcher();
        let pipeline = ReceiptPipeline::new(parser(), &m);
        let result = pipeline.process(RECEIPT).unwrap();

        assert_eq!(result.receipt.merchant.value, "Migros");
        assert_eq!(result.receipt.total.value, Money::from_cents(12900));
        assert_eq!(result.items.len(), 3);

        let ids: Vec<Option<&str>> = result
            .items
            .iter()
            .map(|i| i.category.as_ref().map(|c| c.item_group.id.as_str()))
            .collect();
        assert_eq!(ids, vec![Some("ayran"), Some("tam-bugday-ekmegi"), None]);
        assert_eq!(result.uncategorized().count(), 1);
        assert!(result.average_category_confidence > 0.5);
    }

    #[test]
    fn threshold_splits_exact_from_approximate_hits() {
        let m = matcher();
        let pipeline = ReceiptPipeline::new(parser(), &m).with_min_confidence(0.99);
        let result = pipeline.process(RECEIPT).unwrap();
        // Only the exact "AYRAN" clears 0.99; the diacritic-stripped bread does not.
        assert_eq!(result.uncategorized().count(), 2);
        assert_eq!(result.items[0].category.as_ref().unwrap().confidence, 1.0);
        assert_eq!(result.average_category_confidence, 1.0);
    }

    #[test]
    fn process_without_taxonomy_fails() {
        let m = CategoryMatcher::new();
        let pipeline = ReceiptPipeline::new(parser(), &m);
        assert!(matches!(pipeline.process(RECEIPT), Err(PipelineError::Taxonomy(TaxonomyError::NotInitialized))));
    }

    #[test]
    fn empty_receipt_is_not_an_error() {
        let m = matcher();
        let result = ReceiptPipeline::new(parser(), &m).process("").unwrap();
        assert!(result.items.is_empty());
        assert_eq!(result.receipt.total.confidence, 0.0);
    }
}
