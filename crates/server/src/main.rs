use std::{net::SocketAddr, sync::Arc};

use askama::Template;
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse},
    routing::{delete, get, post},
    Json, Router,
};
use server_api::{add_job, delete_job, list_jobs, list_sources, set_applied, ApiContext};
use shared::{
    error::{ApiError, ErrorCode},
    protocol::{
        AddJobResponse, DeleteJobResponse, JobFormInput, JobListParams, JobQuery, JobSummary,
        SetAppliedRequest, SetAppliedResponse,
    },
};
use storage::Storage;
use tower_http::limit::RequestBodyLimitLayer;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod config;
mod index;

use config::{load_settings, prepare_database_url};
use index::IndexPage;

const MAX_REQUEST_BODY_BYTES: usize = 64 * 1024;

/// Row controls for the index page.
const APP_JS: &str = include_str!("../static/app.js");

#[derive(Clone)]
struct AppState {
    api: ApiContext,
}

type ApiResult<T> = Result<T, (StatusCode, Json<ApiError>)>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = load_settings();
    let database_url = prepare_database_url(&settings.database_url)?;
    let storage = Storage::new(&database_url).await.map_err(|error| {
        error!(
            %database_url,
            %error,
            "failed to open SQLite database; verify parent directory exists and permissions are correct"
        );
        error
    })?;
    storage.health_check().await?;

    let state = AppState {
        api: ApiContext { storage },
    };
    let app = build_router(Arc::new(state));

    let addr: SocketAddr = settings.server_bind.parse()?;
    info!(%addr, "server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/healthz", get(healthz))
        .route("/static/app.js", get(app_js))
        .route("/api/jobs", get(http_list_jobs))
        .route("/api/sources", get(http_list_sources))
        .route("/api/jobs/:job_id/applied", post(http_set_applied))
        .route("/api/jobs/:job_id/delete", delete(http_delete_job))
        .route("/add_job", post(http_add_job))
        .layer(RequestBodyLimitLayer::new(MAX_REQUEST_BODY_BYTES))
        .with_state(state)
}

fn error_response(err: ApiError) -> (StatusCode, Json<ApiError>) {
    let status = match err.code {
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::Validation => StatusCode::BAD_REQUEST,
        ErrorCode::Conflict => StatusCode::CONFLICT,
        ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        error!(message = %err.message, "request failed");
    } else {
        warn!(code = ?err.code, message = %err.message, "request rejected");
    }
    (status, Json(err))
}

async fn healthz() -> &'static str {
    "ok"
}

async fn app_js() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/javascript; charset=utf-8")],
        APP_JS,
    )
}

async fn index(
    State(state): State<Arc<AppState>>,
    Query(params): Query<JobListParams>,
) -> ApiResult<Html<String>> {
    let query = JobQuery::from(params);
    let jobs = list_jobs(&state.api, &query).await.map_err(error_response)?;
    let sources = list_sources(&state.api).await.map_err(error_response)?;
    let page = IndexPage::new(&query, jobs, sources);
    let html = page.render().map_err(|e| {
        error_response(ApiError::new(
            ErrorCode::Internal,
            format!("failed to render index: {e}"),
        ))
    })?;
    Ok(Html(html))
}

async fn http_list_jobs(
    State(state): State<Arc<AppState>>,
    Query(params): Query<JobListParams>,
) -> ApiResult<Json<Vec<JobSummary>>> {
    let jobs = list_jobs(&state.api, &JobQuery::from(params))
        .await
        .map_err(error_response)?;
    Ok(Json(jobs))
}

async fn http_list_sources(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<String>>> {
    let sources = list_sources(&state.api).await.map_err(error_response)?;
    Ok(Json(sources))
}

async fn http_set_applied(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<String>,
    body: Bytes,
) -> ApiResult<Json<SetAppliedResponse>> {
    // Content type is not checked; an empty body reads as `{}`.
    let req: SetAppliedRequest = if body.trim_ascii().is_empty() {
        SetAppliedRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| {
            error_response(ApiError::new(
                ErrorCode::Validation,
                format!("invalid JSON body: {e}"),
            ))
        })?
    };
    let response = set_applied(&state.api, &job_id, req.applied)
        .await
        .map_err(error_response)?;
    Ok(Json(response))
}

async fn http_delete_job(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<DeleteJobResponse>> {
    delete_job(&state.api, &job_id)
        .await
        .map_err(error_response)?;
    Ok(Json(DeleteJobResponse { ok: true }))
}

async fn http_add_job(
    State(state): State<Arc<AppState>>,
    Json(form): Json<JobFormInput>,
) -> ApiResult<Json<AddJobResponse>> {
    let job_id = add_job(&state.api, &form).await.map_err(error_response)?;
    Ok(Json(AddJobResponse { ok: true, job_id }))
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
