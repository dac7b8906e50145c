#![allow(dead_code)]

use async_trait::async_trait;
use housing_filters::error::{Error, Result};
use housing_filters::filters::FilterDefinition;
use housing_filters::models::{FilterField, Selection};
use housing_filters::navigation::MemoryNavigator;
use housing_filters::sources::{CategoryTree, ReferenceSource, StaticSource, TitleResolver};
use housing_filters::store::Store;
use housing_filters::sync::Synchronizer;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Bundled data plus a log of title lookups and a switch to fail city fetches
#[derive(Default)]
pub struct TestSource {
    inner: StaticSource,
    lookups: Mutex<Vec<(FilterField, String)>>,
    city_failures: AtomicUsize,
}

impl TestSource {
    pub fn failing_cities(times: usize) -> Self {
        let source = Self::default();
        source.city_failures.store(times, Ordering::SeqCst);
        source
    }

    pub fn lookups(&self) -> Vec<(FilterField, String)> {
        self.lookups.lock().unwrap().clone()
    }

    pub fn looked_up(&self, field: FilterField) -> bool {
        self.lookups().iter().any(|(f, _)| *f == field)
    }
}

#[async_trait]
impl ReferenceSource for TestSource {
    async fn provinces(&self, country: &str) -> Result<Vec<Selection>> {
        self.inner.provinces(country).await
    }

    async fn cities(&self, province: &str) -> Result<Vec<Selection>> {
        let remaining = self.city_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.city_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(Error::Status {
                url: format!("/locations/cities?province={}", province),
                status: 503,
            });
        }
        self.inner.cities(province).await
    }

    async fn areas(&self, city: &str) -> Result<Vec<Selection>> {
        self.inner.areas(city).await
    }

    async fn categories(&self, property_type: &str) -> Result<CategoryTree> {
        self.inner.categories(property_type).await
    }

    async fn filter_definitions(&self, property_type: &str) -> Result<Vec<FilterDefinition>> {
        self.inner.filter_definitions(property_type).await
    }

    fn source_name(&self) -> &'static str {
        "test"
    }
}

#[async_trait]
impl TitleResolver for TestSource {
    async fn resolve_title(&self, field: FilterField, slug: &str) -> Result<String> {
        self.lookups.lock().unwrap().push((field, slug.to_string()));
        self.inner.resolve_title(field, slug).await
    }
}

pub fn synchronizer(source: TestSource, url: &str) -> Synchronizer<TestSource, MemoryNavigator> {
    Synchronizer::new(Arc::new(Store::default()), source, MemoryNavigator::new(url))
}

/// Synchronizer already rehydrated from `url`
pub async fn rehydrated(url: &str) -> Synchronizer<TestSource, MemoryNavigator> {
    let mut sync = synchronizer(TestSource::default(), url);
    sync.reconcile_from_url().await.unwrap();
    sync
}
