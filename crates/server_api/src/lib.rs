use chrono::Utc;
use shared::{
    domain::{JobId, MANUAL_SOURCE},
    error::{ApiError, ErrorCode},
    protocol::{JobFormInput, JobQuery, JobSummary, SetAppliedResponse},
};
use storage::{NewJob, Storage};
use tracing::info;

#[derive(Clone)]
pub struct ApiContext {
    pub storage: Storage,
}

pub async fn list_jobs(ctx: &ApiContext, query: &JobQuery) -> Result<Vec<JobSummary>, ApiError> {
    let jobs = ctx.storage.list_jobs(query).await.map_err(internal)?;
    Ok(jobs.into_iter().map(JobSummary::from).collect())
}

pub async fn list_sources(ctx: &ApiContext) -> Result<Vec<String>, ApiError> {
    ctx.storage.list_sources().await.map_err(internal)
}

pub async fn set_applied(
    ctx: &ApiContext,
    raw_job_id: &str,
    applied: bool,
) -> Result<SetAppliedResponse, ApiError> {
    let job_id = parse_job_id(raw_job_id)?;
    let matched = ctx
        .storage
        .set_applied(job_id, applied)
        .await
        .map_err(internal)?;
    if !matched {
        return Err(ApiError::new(ErrorCode::NotFound, "Job not found"));
    }
    info!(job_id = job_id.0, applied, "applied flag updated");
    Ok(SetAppliedResponse { ok: true, applied })
}

pub async fn delete_job(ctx: &ApiContext, raw_job_id: &str) -> Result<JobId, ApiError> {
    let job_id = parse_job_id(raw_job_id)?;
    let deleted = ctx.storage.delete_job(job_id).await.map_err(internal)?;
    if !deleted {
        return Err(ApiError::new(ErrorCode::NotFound, "Job not found"));
    }
    info!(job_id = job_id.0, "job deleted");
    Ok(job_id)
}

pub async fn add_job(ctx: &ApiContext, form: &JobFormInput) -> Result<JobId, ApiError> {
    let job = new_job_from_form(form)?;
    let job_id = ctx
        .storage
        .insert_job(&job, Utc::now().date_naive())
        .await
        .map_err(internal)?
        .ok_or_else(|| {
            ApiError::new(ErrorCode::Conflict, "a job with this link already exists")
        })?;
    info!(job_id = job_id.0, title = %job.title, "job added");
    Ok(job_id)
}

/// Maps add-job form fields onto a storable job. Unknown fields are ignored.
pub fn new_job_from_form(form: &JobFormInput) -> Result<NewJob, ApiError> {
    let owned = |field: &str| form.value(field).map(str::to_string);
    let title = owned("title")
        .ok_or_else(|| ApiError::new(ErrorCode::Validation, "title is required"))?;
    Ok(NewJob {
        title,
        company: owned("company"),
        location: owned("location"),
        description: owned("description"),
        link: owned("link"),
        source: owned("source").or_else(|| Some(MANUAL_SOURCE.to_string())),
    })
}

/// Parses a job id taken from a URL path.
///
/// Accepts a bare positive integer, or the same wrapped as `JobId(..)` the way
/// a debug-formatted id renders.
pub fn parse_job_id(raw: &str) -> Result<JobId, ApiError> {
    let trimmed = raw.trim();
    let inner = trimmed
        .strip_prefix("JobId(")
        .and_then(|rest| rest.strip_suffix(')'))
        .unwrap_or(trimmed)
        .trim();
    inner
        .parse::<i64>()
        .ok()
        .filter(|id| *id > 0)
        .map(JobId)
        .ok_or_else(|| ApiError::new(ErrorCode::Validation, format!("Invalid job_id: {raw}")))
}

fn internal(err: anyhow::Error) -> ApiError {
    ApiError::new(ErrorCode::Internal, err.to_string())
}
