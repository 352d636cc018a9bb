use super::*;
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;

type SeenQueries = Arc<Mutex<Vec<HashMap<String, String>>>>;

async fn spawn_search(body: Value) -> (String, SeenQueries) {
    let seen: SeenQueries = Arc::default();
    let app = Router::new()
        .route(
            "/search.json",
            get(
                |State((seen, body)): State<(SeenQueries, Value)>,
                 Query(params): Query<HashMap<String, String>>| async move {
                    seen.lock().unwrap().push(params);
                    Json(body)
                },
            ),
        )
        .with_state((seen.clone(), body));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (format!("http://{addr}/search.json"), seen)
}

#[test]
fn apply_link_skips_blank_candidates() {
    let job = RawJob {
        apply_options: vec![ApplyOption {
            title: None,
            link: Some("  ".to_string()),
        }],
        job_link: None,
        link: Some("https://www.indeed.com/2".to_string()),
        ..RawJob::default()
    };
    assert_eq!(job.apply_link(), Some("https://www.indeed.com/2"));
    assert_eq!(RawJob::default().apply_link(), None);
}

#[tokio::test]
async fn search_sends_google_jobs_query() {
    let (endpoint, seen) = spawn_search(json!({
        "jobs_results": [
            {
                "title": "SRE",
                "company_name": "Acme",
                "via": "LinkedIn",
                "apply_options": [{"title": "LinkedIn", "link": "https://www.linkedin.com/jobs/view/1"}],
                "extensions": ["Full-time"]
            }
        ]
    }))
    .await;
    let client = SerpApiClient::with_endpoint(endpoint, "secret");

    let jobs = client.search("sre", "Berlin").await.unwrap();

    assert_eq!(jobs.len(), 1);
    assert_eq!(
        jobs[0].apply_link(),
        Some("https://www.linkedin.com/jobs/view/1")
    );
    let params = seen.lock().unwrap()[0].clone();
    assert_eq!(params["engine"], "google_jobs");
    assert_eq!(params["q"], "sre");
    assert_eq!(params["location"], "Berlin");
    assert_eq!(params["hl"], "en");
    assert_eq!(params["num"], "100");
    assert_eq!(params["api_key"], "secret");
}

#[tokio::test]
async fn error_payload_is_an_error() {
    let (endpoint, _seen) = spawn_search(json!({"error": "Invalid API key."})).await;
    let client = SerpApiClient::with_endpoint(endpoint, "bad");

    let err = client.search("sre", "Berlin").await.unwrap_err();

    assert!(err.to_string().contains("Invalid API key."));
}

#[tokio::test]
async fn empty_result_notice_is_not_an_error() {
    let (endpoint, _seen) = spawn_search(json!({
        "error": "Google hasn't returned any results for this query."
    }))
    .await;
    let client = SerpApiClient::with_endpoint(endpoint, "secret");

    assert!(client.search("cobol", "Antarctica").await.unwrap().is_empty());
}
