use super::*;

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, d).expect("date")
}

fn scraped(title: &str, company: &str, link: &str, source: &str) -> NewJob {
    NewJob {
        title: title.to_string(),
        company: Some(company.to_string()),
        location: Some("Remote".to_string()),
        description: Some("Run the platform".to_string()),
        link: Some(link.to_string()),
        source: Some(source.to_string()),
    }
}

#[tokio::test]
async fn health_check_succeeds_for_live_pool() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    storage.health_check().await.expect("health check");
}

#[tokio::test]
async fn creates_database_file_when_missing() {
    let temp_root = tempfile::tempdir().expect("tempdir");
    let db_path = temp_root.path().join("nested").join("jobs.db");
    let database_url = format!("sqlite://{}", db_path.to_string_lossy().replace('\\', "/"));

    let storage = Storage::new(&database_url).await.expect("db");
    drop(storage);

    assert!(
        db_path.exists(),
        "database file should exist: {}",
        db_path.display()
    );
}

#[tokio::test]
async fn upsert_keeps_applied_and_first_seen_but_refreshes_last_seen() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let job = scraped("SRE", "Acme", "https://www.linkedin.com/jobs/1", "Linkedin");

    let first = storage.upsert_job(&job, day(1)).await.expect("insert");
    storage.set_applied(first, true).await.expect("applied");
    let second = storage.upsert_job(&job, day(5)).await.expect("refresh");
    assert_eq!(first, second);

    let stored = storage.get_job(first).await.expect("get").expect("some");
    assert!(stored.applied);
    assert_eq!(stored.first_seen, day(1));
    assert_eq!(stored.last_seen, day(5));
    assert_eq!(storage.count_jobs().await.expect("count"), 1);
}

#[tokio::test]
async fn insert_job_reports_link_conflict() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let job = scraped("SRE", "Acme", "https://indeed.com/1", "Indeed");

    assert!(storage.insert_job(&job, day(1)).await.expect("insert").is_some());
    assert!(storage.insert_job(&job, day(2)).await.expect("insert").is_none());

    let without_link = NewJob {
        title: "Engineer".into(),
        ..NewJob::default()
    };
    let a = storage.insert_job(&without_link, day(1)).await.expect("a");
    let b = storage.insert_job(&without_link, day(1)).await.expect("b");
    assert!(a.is_some() && b.is_some());
    assert_ne!(a, b);
}

#[tokio::test]
async fn description_is_truncated() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let mut job = scraped("SRE", "Acme", "https://indeed.com/long", "Indeed");
    job.description = Some("x".repeat(MAX_DESCRIPTION_CHARS + 20));

    let id = storage.upsert_job(&job, day(1)).await.expect("insert");
    let stored = storage.get_job(id).await.expect("get").expect("some");
    assert_eq!(
        stored.description.expect("description").chars().count(),
        MAX_DESCRIPTION_CHARS
    );
}

#[tokio::test]
async fn list_jobs_filters_and_orders_newest_first() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let old = storage
        .upsert_job(&scraped("DevOps Engineer", "Acme", "l/1", "Indeed"), day(1))
        .await
        .expect("old");
    let new = storage
        .upsert_job(&scraped("Platform Engineer", "Globex", "l/2", "Linkedin"), day(3))
        .await
        .expect("new");
    let other = storage
        .upsert_job(&scraped("Cook", "Diner", "l/3", "Indeed"), day(2))
        .await
        .expect("other");
    storage.set_applied(old, true).await.expect("applied");

    let all = storage.list_jobs(&JobQuery::default()).await.expect("all");
    let ids: Vec<_> = all.iter().map(|j| j.job_id).collect();
    assert_eq!(ids, vec![new, other, old]);

    let engineers = storage
        .list_jobs(&JobQuery {
            q: "engineer".into(),
            ..JobQuery::default()
        })
        .await
        .expect("search");
    assert_eq!(engineers.len(), 2);

    let indeed_applied = storage
        .list_jobs(&JobQuery {
            source: "Indeed".into(),
            applied: AppliedFilter::Applied,
            ..JobQuery::default()
        })
        .await
        .expect("filtered");
    assert_eq!(indeed_applied.len(), 1);
    assert_eq!(indeed_applied[0].job_id, old);
}

#[tokio::test]
async fn search_treats_wildcards_literally() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    storage
        .upsert_job(&scraped("SRE", "Acme", "l/1", "Indeed"), day(1))
        .await
        .expect("insert");

    let matches = storage
        .list_jobs(&JobQuery {
            q: "%".into(),
            ..JobQuery::default()
        })
        .await
        .expect("search");
    assert!(matches.is_empty());
}

#[tokio::test]
async fn search_ignores_case_beyond_ascii() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    let mut job = scraped("Ingénieur DevOps", "Société Générale", "l/1", "Indeed");
    job.location = Some("Zürich".to_string());
    storage.upsert_job(&job, day(1)).await.expect("insert");

    for q in ["INGÉNIEUR", "zÜrich", "SOCIÉTÉ"] {
        let matches = storage
            .list_jobs(&JobQuery {
                q: q.into(),
                ..JobQuery::default()
            })
            .await
            .expect("search");
        assert_eq!(matches.len(), 1, "query {q:?} should match");
    }
}

#[tokio::test]
async fn set_applied_and_delete_report_missing_rows() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    assert!(!storage.set_applied(JobId(99), true).await.expect("update"));
    assert!(!storage.delete_job(JobId(99)).await.expect("delete"));

    let id = storage
        .upsert_job(&scraped("SRE", "Acme", "l/1", "Indeed"), day(1))
        .await
        .expect("insert");
    assert!(storage.delete_job(id).await.expect("delete"));
    assert!(storage.get_job(id).await.expect("get").is_none());
}

#[tokio::test]
async fn counts_group_by_source() {
    let storage = Storage::new("sqlite::memory:").await.expect("db");
    for (i, source) in ["Indeed", "Linkedin", "Indeed"].iter().enumerate() {
        storage
            .upsert_job(&scraped("SRE", "Acme", &format!("l/{i}"), source), day(1))
            .await
            .expect("insert");
    }

    let counts = storage.counts_by_source().await.expect("counts");
    assert_eq!(
        counts,
        vec![("Indeed".to_string(), 2), ("Linkedin".to_string(), 1)]
    );
    assert_eq!(
        storage.list_sources().await.expect("sources"),
        vec!["Indeed".to_string(), "Linkedin".to_string()]
    );
}

#[test]
fn memory_and_non_sqlite_urls_have_no_path() {
    assert!(sqlite_path("sqlite::memory:").is_none());
    assert!(sqlite_path("postgres://localhost/db").is_none());
    assert_eq!(
        sqlite_path("sqlite://./data/jobs.db?mode=rwc"),
        Some(PathBuf::from("./data/jobs.db"))
    );
}
