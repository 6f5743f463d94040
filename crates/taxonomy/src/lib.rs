pub mod error;
pub mod index;
pub mod matcher;
pub mod model;
pub mod score;
pub mod variants;

pub use error::TaxonomyError;
pub use index::{IndexedItemGroup, TaxonomyIndex};
pub use matcher::{
    CategoryMatch, CategoryMatcher, MatchSummary, MatchedItem, UnmatchedItem, DEFAULT_MIN_CONFIDENCE,
    MIN_QUERY_CHARS,
};
pub use model::{Category, Department, ItemGroup, Subcategory, Taxonomy};
