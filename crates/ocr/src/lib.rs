pub mod merchant;
pub mod normalize;
pub mod parser;
pub mod pipeline;
pub mod price;
pub mod types;

pub use merchant::{CatalogError, Merchant, MerchantCatalog, MerchantMatch};
pub use normalize::{normalize, normalize_numeric};
pub use parser::ReceiptParser;
pub use pipeline::{PipelineError, ReceiptPipeline};
pub use price::parse_price;
pub use types::{CategorizedItem, CategorizedReceipt, ParsedLineItem, ParsedReceipt};
