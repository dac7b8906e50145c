use crate::error::Result;
use crate::filters::FilterDefinition;
use crate::models::{FilterField, ListingPage, Selection};
use crate::query::QueryCache;
use crate::sources::traits::{ListingSource, ReferenceSource, TitleResolver};
use crate::sources::types::{CategoryTree, ListingQuery};
use async_trait::async_trait;

/// Wraps a source so each `(fetcher, parent slug)` pair is fetched once
pub struct CachedSource<S> {
    inner: S,
    locations: QueryCache<Vec<Selection>>,
    categories: QueryCache<CategoryTree>,
    definitions: QueryCache<Vec<FilterDefinition>>,
    titles: QueryCache<String>,
}

impl<S> CachedSource<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            locations: QueryCache::new(),
            categories: QueryCache::new(),
            definitions: QueryCache::new(),
            titles: QueryCache::new(),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn clear(&self) {
        self.locations.clear();
        self.categories.clear();
        self.definitions.clear();
        self.titles.clear();
    }
}

#[async_trait]
impl<S: ReferenceSource> ReferenceSource for CachedSource<S> {
    async fn provinces(&self, country: &str) -> Result<Vec<Selection>> {
        let query = self
            .locations
            .fetch("provinces", country, true, |p| async move { self.inner.provinces(&p).await })
            .await?;
        Ok(query.data.unwrap_or_default())
    }

    async fn cities(&self, province: &str) -> Result<Vec<Selection>> {
        let query = self
            .locations
            .fetch("cities", province, true, |p| async move { self.inner.cities(&p).await })
            .await?;
        Ok(query.data.unwrap_or_default())
    }

    async fn areas(&self, city: &str) -> Result<Vec<Selection>> {
        let query = self
            .locations
            .fetch("areas", city, true, |p| async move { self.inner.areas(&p).await })
            .await?;
        Ok(query.data.unwrap_or_default())
    }

    async fn categories(&self, property_type: &str) -> Result<CategoryTree> {
        let query = self
            .categories
            .fetch("categories", property_type, true, |p| async move {
                self.inner.categories(&p).await
            })
            .await?;
        Ok(query.data.unwrap_or_default())
    }

    async fn filter_definitions(&self, property_type: &str) -> Result<Vec<FilterDefinition>> {
        let query = self
            .definitions
            .fetch("filters", property_type, true, |p| async move {
                self.inner.filter_definitions(&p).await
            })
            .await?;
        Ok(query.data.unwrap_or_default())
    }

    fn source_name(&self) -> &'static str {
        self.inner.source_name()
    }
}

#[async_trait]
impl<S: TitleResolver> TitleResolver for CachedSource<S> {
    async fn resolve_title(&self, field: FilterField, slug: &str) -> Result<String> {
        let query = self
            .titles
            .fetch(field.as_str(), slug, true, |s| async move {
                self.inner.resolve_title(field, &s).await
            })
            .await?;
        Ok(query.data.unwrap_or_default())
    }
}

/// Search results change too often to cache
#[async_trait]
impl<S: ListingSource> ListingSource for CachedSource<S> {
    async fn search_listings(&self, query: &ListingQuery) -> Result<ListingPage> {
        self.inner.search_listings(query).await
    }
}
