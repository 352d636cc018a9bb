use std::time::Duration;

use anyhow::{anyhow, Result};
use chrono::Utc;
use storage::Storage;
use tracing::{error, info, warn};

pub mod filter;
pub mod serpapi;

pub use serpapi::{JobSearch, RawJob, SerpApiClient};

pub const DEFAULT_KEYWORDS: &str =
    "devops,sre,site reliability,platform engineer,cloud engineer,kubernetes,terraform,ci/cd";
pub const DEFAULT_LOCATION: &str = "United States";
const FETCH_ERROR_PAUSE: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapeSettings {
    pub serpapi_key: Option<String>,
    pub keywords: Vec<String>,
    pub locations: Vec<String>,
    pub fetch_error_pause: Duration,
}

impl ScrapeSettings {
    /// Reads `SERPAPI_KEY`, `KEYWORDS` and `LOCATIONS` (or `LOCATION`) from
    /// the process environment.
    pub fn from_env() -> Self {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Self {
        let keywords = var("KEYWORDS").unwrap_or_else(|| DEFAULT_KEYWORDS.to_string());
        let locations = var("LOCATIONS")
            .filter(|value| !value.is_empty())
            .or_else(|| var("LOCATION"))
            .unwrap_or_else(|| DEFAULT_LOCATION.to_string());
        Self {
            serpapi_key: var("SERPAPI_KEY").filter(|key| !key.trim().is_empty()),
            keywords: split_list(&keywords),
            locations: split_list(&locations),
            fetch_error_pause: FETCH_ERROR_PAUSE,
        }
    }

    pub fn require_api_key(&self) -> Result<&str> {
        self.serpapi_key
            .as_deref()
            .ok_or_else(|| anyhow!("SERPAPI_KEY is required. Put it in .env as SERPAPI_KEY=..."))
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairReport {
    pub keyword: String,
    pub location: String,
    /// Results that passed the filters.
    pub processed: usize,
    pub upserted: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScrapeReport {
    pub pairs: Vec<PairReport>,
    pub failed_fetches: usize,
}

impl ScrapeReport {
    pub fn total_upserted(&self) -> usize {
        self.pairs.iter().map(|pair| pair.upserted).sum()
    }
}

/// Searches every location × keyword pair and upserts the accepted jobs.
///
/// A failed search or a failed write is logged and skipped; the run itself
/// only fails through the caller's setup.
pub async fn run(
    storage: &Storage,
    search: &dyn JobSearch,
    settings: &ScrapeSettings,
) -> ScrapeReport {
    let mut report = ScrapeReport::default();
    for location in &settings.locations {
        for keyword in &settings.keywords {
            let raw_jobs = match search.search(keyword, location).await {
                Ok(raw_jobs) => raw_jobs,
                Err(err) => {
                    error!(keyword = %keyword, location = %location, error = %err, "fetch failed");
                    report.failed_fetches += 1;
                    tokio::time::sleep(settings.fetch_error_pause).await;
                    continue;
                }
            };

            let jobs: Vec<_> = raw_jobs
                .iter()
                .filter_map(|raw| filter::accept(raw, location))
                .collect();
            let mut upserted = 0;
            for job in &jobs {
                match storage.upsert_job(job, Utc::now().date_naive()).await {
                    Ok(_) => upserted += 1,
                    Err(err) => {
                        warn!(link = ?job.link, error = %err, "upsert failed");
                    }
                }
            }

            info!(
                keyword = %keyword,
                location = %location,
                processed = jobs.len(),
                upserted_or_matched = upserted,
                "scraped"
            );
            report.pairs.push(PairReport {
                keyword: keyword.clone(),
                location: location.clone(),
                processed: jobs.len(),
                upserted,
            });
        }
    }
    info!(total_upserted_or_matched = report.total_upserted(), "scrape finished");
    report
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
