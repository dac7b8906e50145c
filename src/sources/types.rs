use crate::filters::SelectedFilters;
use crate::models::{FilterField, FilterState, Selection};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Subgroups of one transaction type
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CategoryGroup {
    #[serde(default)]
    pub subgroup: Vec<Selection>,
}

/// Categories of a property type keyed by transaction slug
pub type CategoryTree = BTreeMap<String, CategoryGroup>;

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct TitleResponse {
    pub title: String,
}

/// Search parameters for the ads endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingQuery {
    pub state: FilterState,
    pub filters: SelectedFilters,
    /// 1-based page number
    pub page: u32,
    pub page_size: u32,
}

impl ListingQuery {
    pub fn new(state: FilterState, filters: SelectedFilters) -> Self {
        Self {
            state,
            filters,
            page: 1,
            page_size: 20,
        }
    }

    pub fn with_page(mut self, page: u32) -> Self {
        self.page = page.max(1);
        self
    }

    /// Query pairs: non-empty filter fields, then attribute filters, then paging
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        let mut pairs: Vec<(String, String)> = FilterField::ALL
            .iter()
            .filter(|field| !self.state.get(**field).is_empty())
            .map(|field| (field.as_str().to_string(), self.state.slug(*field).to_string()))
            .collect();

        pairs.extend(
            self.filters
                .iter()
                .map(|(slug, value)| (slug.clone(), value.encode())),
        );
        pairs.push(("page".to_string(), self.page.to_string()));
        pairs.push(("page_size".to_string(), self.page_size.to_string()));
        pairs
    }
}

impl Default for ListingQuery {
    fn default() -> Self {
        Self::new(FilterState::default(), SelectedFilters::default())
    }
}
