use thiserror::Error;

#[derive(Debug, Error)]
pub enum TaxonomyError {
    #[error("Failed to parse taxonomy TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Failed to read taxonomy file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Taxonomy has no item groups")]
    Empty,
    #[error("Duplicate item group id: '{0}'")]
    DuplicateItemGroup(String),
    #[error("Taxonomy node '{0}' has a blank name")]
    BlankName(String),
    #[error("Category matcher used before initialize()")]
    NotInitialized,
}
