use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::{Client, Response};
use shared::{
    domain::JobId,
    error::{ApiError, ApiException},
    protocol::{AddJobResponse, JobFormInput, JobQuery, JobSummary, SetAppliedRequest},
};
use tracing::debug;

pub mod controller;
pub mod surface;

pub use controller::{
    ControllerError, DeleteOutcome, PendingToggle, RowActionController, RowPhase, SubmitOutcome,
    ToggleOutcome,
};
pub use surface::{JobRow, PageSurface};

/// The server operations the row controller depends on.
///
/// Any transport error or non-2xx status surfaces as `Err`; callers treat
/// every failure alike.
#[async_trait]
pub trait JobsApi: Send + Sync {
    async fn list_jobs(&self, query: &JobQuery) -> Result<Vec<JobSummary>>;
    async fn set_applied(&self, job_id: JobId, applied: bool) -> Result<()>;
    async fn delete_job(&self, job_id: JobId) -> Result<()>;
    async fn add_job(&self, form: &JobFormInput) -> Result<()>;
}

pub struct HttpJobsApi {
    http: Client,
    server_url: String,
}

impl HttpJobsApi {
    pub fn new(server_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), server_url)
    }

    pub fn with_client(http: Client, server_url: impl Into<String>) -> Self {
        let server_url = server_url.into().trim_end_matches('/').to_string();
        Self { http, server_url }
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }
}

#[async_trait]
impl JobsApi for HttpJobsApi {
    async fn list_jobs(&self, query: &JobQuery) -> Result<Vec<JobSummary>> {
        let server_url = &self.server_url;
        let res = self
            .http
            .get(format!("{server_url}/api/jobs"))
            .query(&query.to_params())
            .send()
            .await?;
        let jobs: Vec<JobSummary> = ensure_success(res).await?.json().await?;
        debug!(count = jobs.len(), "fetched job listing");
        Ok(jobs)
    }

    async fn set_applied(&self, job_id: JobId, applied: bool) -> Result<()> {
        let server_url = &self.server_url;
        let res = self
            .http
            .post(format!("{server_url}/api/jobs/{}/applied", job_id.0))
            .json(&SetAppliedRequest { applied })
            .send()
            .await?;
        ensure_success(res).await?;
        Ok(())
    }

    async fn delete_job(&self, job_id: JobId) -> Result<()> {
        let server_url = &self.server_url;
        let res = self
            .http
            .delete(format!("{server_url}/api/jobs/{}/delete", job_id.0))
            .send()
            .await?;
        ensure_success(res).await?;
        Ok(())
    }

    async fn add_job(&self, form: &JobFormInput) -> Result<()> {
        let server_url = &self.server_url;
        let res = self
            .http
            .post(format!("{server_url}/add_job"))
            .json(form)
            .send()
            .await?;
        let body: AddJobResponse = ensure_success(res).await?.json().await?;
        debug!(job_id = %body.job_id, "server created job");
        Ok(())
    }
}

/// Turns a non-2xx response into an error, preferring the server's
/// [`ApiError`] body when it sent one.
async fn ensure_success(res: Response) -> Result<Response> {
    let status = res.status();
    if status.is_success() {
        return Ok(res);
    }
    let body = res.text().await.unwrap_or_default();
    match serde_json::from_str::<ApiError>(&body) {
        Ok(api_error) => Err(ApiException::from(api_error).into()),
        Err(_) => Err(anyhow!("server responded with {status}")),
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
