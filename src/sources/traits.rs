use crate::error::Result;
use crate::filters::FilterDefinition;
use crate::models::{FilterField, ListingPage, Selection};
use crate::sources::types::{CategoryTree, ListingQuery};
use async_trait::async_trait;

/// Option lists for dependent dropdowns, each keyed by the parent's slug
#[async_trait]
pub trait ReferenceSource: Send + Sync {
    async fn provinces(&self, country: &str) -> Result<Vec<Selection>>;

    async fn cities(&self, province: &str) -> Result<Vec<Selection>>;

    async fn areas(&self, city: &str) -> Result<Vec<Selection>>;

    /// Subgroups per transaction type for one property type
    async fn categories(&self, property_type: &str) -> Result<CategoryTree>;

    async fn filter_definitions(&self, property_type: &str) -> Result<Vec<FilterDefinition>>;

    /// Get the name of the backing source
    fn source_name(&self) -> &'static str;
}

/// Human-readable title for a bare slug found in a URL
#[async_trait]
pub trait TitleResolver: Send + Sync {
    async fn resolve_title(&self, field: FilterField, slug: &str) -> Result<String>;
}

#[async_trait]
pub trait ListingSource: Send + Sync {
    async fn search_listings(&self, query: &ListingQuery) -> Result<ListingPage>;
}
