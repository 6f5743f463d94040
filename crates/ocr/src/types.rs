use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tezgah_core::{ExtractedField, Money};
use tezgah_taxonomy::CategoryMatch;

/// Confidence given to every extracted line item.
pub const ITEM_CONFIDENCE: f32 = 0.7;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ParsedLineItem {
    pub raw_name: String,
    /// Always 1 at this layer; `2 x 12,50` style notations are not parsed.
    pub quantity: u32,
    pub unit_price: Money,
    pub confidence: f32,
    pub source_line: usize,
}

impl ParsedLineItem {
    pub fn line_total(&self) -> Money {
        self.unit_price.times(self.quantity)
    }
}

/// The structured, confidence-annotated result of parsing one receipt.
///
/// `total` is whatever the total heuristics found; it is never adjusted to
/// agree with the item sum.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ParsedReceipt {
    pub merchant: ExtractedField<String>,
    /// Catalog key when the merchant came from the catalog.
    pub merchant_key: Option<String>,
    pub date: ExtractedField<NaiveDate>,
    pub total: ExtractedField<Money>,
    pub items: Vec<ParsedLineItem>,
    pub raw_text: String,
}

impl ParsedReceipt {
    pub fn items_total(&self) -> Money {
        self.items.iter().map(ParsedLineItem::line_total).sum()
    }

    /// `total - items_total`. Informational only.
    pub fn total_mismatch(&self) -> Money {
        self.total.value - self.items_total()
    }

    /// Whether any header field is below `threshold` and should be shown
    /// for manual correction.
    pub fn needs_review(&self, threshold: f32) -> bool {
        [self.merchant.confidence, self.date.confidence, self.total.confidence]
            .iter()
            .any(|c| *c < threshold)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CategorizedItem {
    pub item: ParsedLineItem,
    /// `None` leaves the item uncategorized pending manual assignment.
    pub category: Option<CategoryMatch>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CategorizedReceipt {
    pub receipt: ParsedReceipt,
    pub items: Vec<CategorizedItem>,
    /// Mean confidence over categorized items only.
    pub average_category_confidence: f32,
}

impl CategorizedReceipt {
    pub fn uncategorized(&self) -> impl Iterator<Item = &CategorizedItem> {
        self.items.iter().filter(|i| i.category.is_none())
    }
}
