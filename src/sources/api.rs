use crate::config::ApiConfig;
use crate::error::{Error, Result};
use crate::filters::FilterDefinition;
use crate::models::{FilterField, ListingPage, Selection};
use crate::sources::traits::{ListingSource, ReferenceSource, TitleResolver};
use crate::sources::types::{CategoryTree, ListingQuery, TitleResponse};
use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

/// REST client for the ads backend
pub struct ApiSource {
    client: Client,
    base_url: String,
}

impl ApiSource {
    pub fn new(config: &ApiConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.as_str())
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(String, String)]) -> Result<T> {
        let url = self.url(path);
        debug!("GET {} {:?}", url, query);

        let response = self.client.get(&url).query(query).send().await?;

        if !response.status().is_success() {
            warn!("{} returned status: {}", url, response.status());
            return Err(Error::Status {
                url,
                status: response.status().as_u16(),
            });
        }

        let body = response.text().await?;
        debug!("Downloaded {} bytes from {}", body.len(), url);
        Ok(serde_json::from_str(&body)?)
    }

    async fn locations(&self, level: &str, parent: (&str, &str)) -> Result<Vec<Selection>> {
        let query = [(parent.0.to_string(), parent.1.to_string())];
        self.get_json(&format!("locations/{}", level), &query).await
    }
}

#[async_trait]
impl ReferenceSource for ApiSource {
    async fn provinces(&self, country: &str) -> Result<Vec<Selection>> {
        self.locations("provinces", ("country", country)).await
    }

    async fn cities(&self, province: &str) -> Result<Vec<Selection>> {
        self.locations("cities", ("province", province)).await
    }

    async fn areas(&self, city: &str) -> Result<Vec<Selection>> {
        self.locations("areas", ("city", city)).await
    }

    async fn categories(&self, property_type: &str) -> Result<CategoryTree> {
        let query = [("property_type".to_string(), property_type.to_string())];
        self.get_json("categories", &query).await
    }

    async fn filter_definitions(&self, property_type: &str) -> Result<Vec<FilterDefinition>> {
        let query = [("property_type".to_string(), property_type.to_string())];
        self.get_json("filters", &query).await
    }

    fn source_name(&self) -> &'static str {
        "api"
    }
}

#[async_trait]
impl TitleResolver for ApiSource {
    async fn resolve_title(&self, field: FilterField, slug: &str) -> Result<String> {
        let response: TitleResponse = self
            .get_json(&format!("titles/{}/{}", field.as_str(), slug), &[])
            .await
            .map_err(|e| match e {
                Error::Status { status: 404, .. } => Error::NotFound {
                    field: field.to_string(),
                    slug: slug.to_string(),
                },
                other => other,
            })?;
        Ok(response.title)
    }
}

#[async_trait]
impl ListingSource for ApiSource {
    async fn search_listings(&self, query: &ListingQuery) -> Result<ListingPage> {
        self.get_json("ads", &query.to_pairs()).await
    }
}
