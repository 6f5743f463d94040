use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::TaxonomyError;
use crate::model::Taxonomy;
use crate::variants::normalize_query;

/// An item group with its ancestor ids and names denormalized onto it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexedItemGroup {
    pub id: String,
    pub name: String,
    pub subcategory_id: String,
    pub subcategory: String,
    pub category_id: String,
    pub category: String,
    pub department_id: String,
    pub department: String,
}

impl IndexedItemGroup {
    /// `Department > Category > Subcategory > ItemGroup`
    pub fn path(&self) -> String {
        format!("{} > {} > {} > {}", self.department, self.category, self.subcategory, self.name)
    }
}

/// Flattened, search-ready view of a [`Taxonomy`]. Never modified after
/// [`TaxonomyIndex::build`]; a changed taxonomy means a new index.
#[derive(Debug)]
pub struct TaxonomyIndex {
    groups: Vec<IndexedItemGroup>,
    /// Normalized display names, parallel to `groups`.
    keys: Vec<String>,
}

impl TaxonomyIndex {
    pub fn build(taxonomy: &Taxonomy) -> Result<Self, TaxonomyError> {
        let mut groups = Vec::new();
        let mut seen = HashSet::new();

        for dept in &taxonomy.departments {
            require_name(&dept.id, &dept.name)?;
            for cat in &dept.categories {
                require_name(&cat.id, &cat.name)?;
                for sub in &cat.subcategories {
                    require_name(&sub.id, &sub.name)?;
                    for group in &sub.item_groups {
                        require_name(&group.id, &group.name)?;
                        if !seen.insert(group.id.as_str()) {
                            return Err(TaxonomyError::DuplicateItemGroup(group.id.clone()));
                        }
                        groups.push(IndexedItemGroup {
                            id: group.id.clone(),
                            name: group.name.clone(),
                            subcategory_id: sub.id.clone(),
                            subcategory: sub.name.clone(),
                            category_id: cat.id.clone(),
                            category: cat.name.clone(),
                            department_id: dept.id.clone(),
                            department: dept.name.clone(),
                        });
                    }
                }
            }
        }

        if groups.is_empty() {
            return Err(TaxonomyError::Empty);
        }

        let keys = groups.iter().map(|g| normalize_query(&g.name)).collect();
        Ok(Self { groups, keys })
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn groups(&self) -> &[IndexedItemGroup] {
        &self.groups
    }

    /// Item groups paired with their normalized search keys.
    pub(crate) fn entries(&self) -> impl Iterator<Item = (&IndexedItemGroup, &str)> {
        self.groups.iter().zip(self.keys.iter().map(String::as_str))
    }

    pub fn get(&self, id: &str) -> Option<&IndexedItemGroup> {
        self.groups.iter().find(|g| g.id == id)
    }

    pub fn by_department(&self, department_id: &str) -> Vec<&IndexedItemGroup> {
        self.groups.iter().filter(|g| g.department_id == department_id).collect()
    }

    pub fn by_category(&self, category_id: &str) -> Vec<&IndexedItemGroup> {
        self.groups.iter().filter(|g| g.category_id == category_id).collect()
    }

    pub fn by_subcategory(&self, subcategory_id: &str) -> Vec<&IndexedItemGroup> {
        self.groups.iter().filter(|g| g.subcategory_id == subcategory_id).collect()
    }
}

fn require_name(id: &str, name: &str) -> Result<(), TaxonomyError> {
    if name.trim().is_empty() {
        return Err(TaxonomyError::BlankName(id.to_string()));
    }
    Ok(())
}
