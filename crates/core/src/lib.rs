pub mod field;
pub mod money;
pub mod text;

pub use field::ExtractedField;
pub use money::Money;
