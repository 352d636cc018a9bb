use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

pub const DEFAULT_ENDPOINT: &str = "https://serpapi.com/search.json";

/// One entry of `jobs_results`; every field is optional on the wire.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawJob {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default)]
    pub via: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub apply_options: Vec<ApplyOption>,
    #[serde(default)]
    pub job_link: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApplyOption {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
}

impl RawJob {
    /// First apply option, then `job_link`, then `link`; blanks are skipped.
    pub fn apply_link(&self) -> Option<&str> {
        let first_option = self.apply_options.first().and_then(|o| o.link.as_deref());
        [first_option, self.job_link.as_deref(), self.link.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|link| !link.is_empty())
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    jobs_results: Option<Vec<RawJob>>,
    #[serde(default)]
    error: Option<String>,
}

/// A Google Jobs search for one keyword in one location.
#[async_trait]
pub trait JobSearch: Send + Sync {
    async fn search(&self, keyword: &str, location: &str) -> Result<Vec<RawJob>>;
}

pub struct SerpApiClient {
    http: Client,
    endpoint: String,
    api_key: String,
}

impl SerpApiClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_endpoint(DEFAULT_ENDPOINT, api_key)
    }

    pub fn with_endpoint(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            endpoint: endpoint.into(),
            api_key: api_key.into(),
        }
    }
}

#[async_trait]
impl JobSearch for SerpApiClient {
    async fn search(&self, keyword: &str, location: &str) -> Result<Vec<RawJob>> {
        let body: SearchResponse = self
            .http
            .get(&self.endpoint)
            .query(&[
                ("engine", "google_jobs"),
                ("q", keyword),
                ("location", location),
                ("hl", "en"),
                ("api_key", self.api_key.as_str()),
                ("num", "100"),
            ])
            .send()
            .await
            .context("serpapi request failed")?
            .error_for_status()?
            .json()
            .await
            .context("invalid serpapi response")?;
        if let Some(message) = body.error {
            // SerpAPI reports "no results" this way too.
            if body.jobs_results.is_none() && message.contains("hasn't returned any results") {
                debug!(keyword, location, "no results");
                return Ok(Vec::new());
            }
            return Err(anyhow!("serpapi error: {message}"));
        }
        Ok(body.jobs_results.unwrap_or_default())
    }
}

#[cfg(test)]
#[path = "tests/serpapi_tests.rs"]
mod tests;
