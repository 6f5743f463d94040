use serde::{Deserialize, Serialize};
use std::path::Path;
use tezgah_core::text::fold_case;
use thiserror::Error;

const BUILTIN_MERCHANTS: &str = include_str!("../data/merchants.toml");

/// Confidence of a catalog hit: the pattern was found verbatim.
pub const MATCH_CONFIDENCE: f32 = 0.9;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Failed to parse merchant catalog TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Failed to read merchant catalog: {0}")]
    Io(#[from] std::io::Error),
    #[error("Merchant catalog is empty")]
    Empty,
    #[error("Merchant '{0}' has an empty pattern")]
    EmptyPattern(String),
    #[error("Duplicate merchant key: '{0}'")]
    DuplicateKey(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Merchant {
    pub key: String,
    pub display_name: String,
    #[serde(default)]
    pub category: String,
    pub patterns: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(rename = "merchant", default)]
    merchants: Vec<Merchant>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MerchantMatch<'a> {
    pub merchant: &'a Merchant,
    pub confidence: f32,
}

/// Known retailers and the header substrings that identify them.
#[derive(Debug, Clone)]
pub struct MerchantCatalog {
    merchants: Vec<Merchant>,
    /// Case-folded patterns, parallel to `merchants`.
    folded: Vec<Vec<String>>,
}

impl MerchantCatalog {
    pub fn new(merchants: Vec<Merchant>) -> Result<Self, CatalogError> {
        if merchants.is_empty() {
            return Err(CatalogError::Empty);
        }
        let mut folded = Vec::with_capacity(merchants.len());
        for (i, m) in merchants.iter().enumerate() {
            if merchants[..i].iter().any(|prev| prev.key == m.key) {
                return Err(CatalogError::DuplicateKey(m.key.clone()));
            }
            if m.patterns.is_empty() || m.patterns.iter().any(|p| p.trim().is_empty()) {
                return Err(CatalogError::EmptyPattern(m.key.clone()));
            }
            folded.push(m.patterns.iter().map(|p| fold_case(p)).collect());
        }
        Ok(Self { merchants, folded })
    }

    pub fn from_toml(toml_content: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = toml::from_str(toml_content)?;
        Self::new(file.merchants)
    }

    pub fn from_file(path: &Path) -> Result<Self, CatalogError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// The retailer catalog shipped with the crate.
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_toml(BUILTIN_MERCHANTS)
    }

    /// Case-insensitive substring scan in declaration order; the first
    /// merchant with any matching pattern wins.
    pub fn find(&self, text: &str) -> Option<MerchantMatch<'_>> {
        let haystack = fold_case(text);
        self.merchants
            .iter()
            .zip(&self.folded)
            .find(|(_, patterns)| patterns.iter().any(|p| haystack.contains(p.as_str())))
            .map(|(merchant, _)| MerchantMatch { merchant, confidence: MATCH_CONFIDENCE })
    }

    pub fn get(&self, key: &str) -> Option<&Merchant> {
        self.merchants.iter().find(|m| m.key == key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Merchant> {
        self.merchants.iter()
    }

    pub fn len(&self) -> usize {
        self.merchants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.merchants.is_empty()
    }
}
