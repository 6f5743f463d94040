use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::TaxonomyError;

const BUILTIN_TAXONOMY: &str = include_str!("../data/taxonomy.toml");

/// Department → Category → Subcategory → ItemGroup. Nesting is the only way
/// to attach a child, so every non-root node has exactly one parent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Taxonomy {
    #[serde(rename = "department", default)]
    pub departments: Vec<Department>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Department {
    pub id: String,
    pub name: String,
    #[serde(rename = "category", default)]
    pub categories: Vec<Category>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Category {
    pub id: String,
    pub name: String,
    #[serde(rename = "subcategory", default)]
    pub subcategories: Vec<Subcategory>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Subcategory {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub item_groups: Vec<ItemGroup>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ItemGroup {
    pub id: String,
    pub name: String,
}

impl Taxonomy {
    pub fn from_toml(toml_content: &str) -> Result<Self, TaxonomyError> {
        Ok(toml::from_str(toml_content)?)
    }

    pub fn from_file(path: &Path) -> Result<Self, TaxonomyError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// The grocery taxonomy shipped with the crate.
    pub fn builtin() -> Result<Self, TaxonomyError> {
        Self::from_toml(BUILTIN_TAXONOMY)
    }

    pub fn item_group_count(&self) -> usize {
        self.departments
            .iter()
            .flat_map(|d| &d.categories)
            .flat_map(|c| &c.subcategories)
            .map(|s| s.item_groups.len())
            .sum()
    }
}
