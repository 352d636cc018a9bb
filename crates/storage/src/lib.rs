use anyhow::{Context, Result};
use chrono::NaiveDate;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow},
    Pool, QueryBuilder, Row, Sqlite,
};
use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use shared::{
    domain::{AppliedFilter, JobId, UNKNOWN_SOURCE},
    protocol::{JobQuery, JobSummary},
};

/// Longest description kept for a job, in characters.
pub const MAX_DESCRIPTION_CHARS: usize = 1500;

const JOB_COLUMNS: &str =
    "id, title, company, location, description, link, source, applied, first_seen, last_seen";

#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredJob {
    pub job_id: JobId,
    pub title: String,
    pub company: Option<String>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub link: Option<String>,
    pub source: String,
    pub applied: bool,
    pub first_seen: NaiveDate,
    pub last_seen: NaiveDate,
}

impl StoredJob {
    /// Whether title, company or location contains an already-lowercased needle.
    fn mentions(&self, needle: &str) -> bool {
        [Some(&self.title), self.company.as_ref(), self.location.as_ref()]
            .into_iter()
            .flatten()
            .any(|field| field.to_lowercase().contains(needle))
    }
}

impl From<StoredJob> for JobSummary {
    fn from(job: StoredJob) -> Self {
        Self {
            job_id: job.job_id,
            title: job.title,
            company: job.company,
            location: job.location,
            description: job.description,
            link: job.link,
            source: job.source,
            applied: job.applied,
            first_seen: job.first_seen,
            last_seen: job.last_seen,
        }
    }
}

/// A job about to be written; `applied` always starts out false.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewJob {
    pub title: String,
    pub company: Option<String>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub link: Option<String>,
    pub source: Option<String>,
}

impl NewJob {
    fn stored_description(&self) -> Option<String> {
        self.description
            .as_deref()
            .map(|d| d.chars().take(MAX_DESCRIPTION_CHARS).collect())
    }

    fn stored_source(&self) -> &str {
        self.source.as_deref().unwrap_or(UNKNOWN_SOURCE)
    }
}

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(connect_options)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    /// Jobs matching `query`, newest first.
    ///
    /// `q` is matched as a literal substring of title, company or location,
    /// ignoring case for any script.
    pub async fn list_jobs(&self, query: &JobQuery) -> Result<Vec<StoredJob>> {
        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {JOB_COLUMNS} FROM jobs WHERE 1 = 1"));

        if !query.source.is_empty() {
            builder.push(" AND source = ");
            builder.push_bind(query.source.clone());
        }
        if let Some(applied) = query.applied.as_bool() {
            builder.push(" AND applied = ");
            builder.push_bind(applied);
        }
        builder.push(" ORDER BY last_seen DESC, first_seen DESC, id DESC");

        let rows = builder
            .build()
            .fetch_all(&self.pool)
            .await
            .context("failed to list jobs")?;
        // SQLite's LIKE only folds ASCII case.
        let needle = query.q.to_lowercase();
        Ok(rows
            .iter()
            .map(job_from_row)
            .filter(|job| needle.is_empty() || job.mentions(&needle))
            .collect())
    }

    pub async fn list_sources(&self) -> Result<Vec<String>> {
        let rows = sqlx::query("SELECT DISTINCT source FROM jobs ORDER BY source ASC")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(|r| r.get::<String, _>(0)).collect())
    }

    pub async fn get_job(&self, job_id: JobId) -> Result<Option<StoredJob>> {
        let row = sqlx::query(&format!("SELECT {JOB_COLUMNS} FROM jobs WHERE id = ?"))
            .bind(job_id.0)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(job_from_row))
    }

    /// Inserts a new row. Returns `None` when another job already owns `link`.
    pub async fn insert_job(&self, job: &NewJob, today: NaiveDate) -> Result<Option<JobId>> {
        let row = sqlx::query(
            "INSERT INTO jobs (title, company, location, description, link, source, applied, first_seen, last_seen)
             VALUES (?, ?, ?, ?, ?, ?, 0, ?, ?)
             ON CONFLICT(link) DO NOTHING
             RETURNING id",
        )
        .bind(&job.title)
        .bind(job.company.as_deref())
        .bind(job.location.as_deref())
        .bind(job.stored_description())
        .bind(job.link.as_deref())
        .bind(job.stored_source())
        .bind(today)
        .bind(today)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|r| JobId(r.get::<i64, _>(0))))
    }

    /// Inserts or refreshes a job keyed by its link.
    ///
    /// A job seen before keeps every stored field, including `applied`; only
    /// `last_seen` moves forward.
    pub async fn upsert_job(&self, job: &NewJob, today: NaiveDate) -> Result<JobId> {
        let rec = sqlx::query(
            "INSERT INTO jobs (title, company, location, description, link, source, applied, first_seen, last_seen)
             VALUES (?, ?, ?, ?, ?, ?, 0, ?, ?)
             ON CONFLICT(link) DO UPDATE SET last_seen = excluded.last_seen
             RETURNING id",
        )
        .bind(&job.title)
        .bind(job.company.as_deref())
        .bind(job.location.as_deref())
        .bind(job.stored_description())
        .bind(job.link.as_deref())
        .bind(job.stored_source())
        .bind(today)
        .bind(today)
        .fetch_one(&self.pool)
        .await
        .with_context(|| format!("failed to upsert job link={:?}", job.link))?;
        Ok(JobId(rec.get::<i64, _>(0)))
    }

    /// Returns whether a row with `job_id` existed.
    pub async fn set_applied(&self, job_id: JobId, applied: bool) -> Result<bool> {
        let updated = sqlx::query("UPDATE jobs SET applied = ? WHERE id = ?")
            .bind(applied)
            .bind(job_id.0)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(updated > 0)
    }

    /// Returns whether a row with `job_id` existed.
    pub async fn delete_job(&self, job_id: JobId) -> Result<bool> {
        let deleted = sqlx::query("DELETE FROM jobs WHERE id = ?")
            .bind(job_id.0)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(deleted > 0)
    }

    pub async fn count_jobs(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM jobs")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// `(source, count)` pairs, largest count first.
    pub async fn counts_by_source(&self) -> Result<Vec<(String, i64)>> {
        let rows = sqlx::query(
            "SELECT source, COUNT(*) AS n
             FROM jobs
             GROUP BY source
             ORDER BY n DESC, source ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|r| (r.get::<String, _>(0), r.get::<i64, _>(1)))
            .collect())
    }
}

fn job_from_row(r: &SqliteRow) -> StoredJob {
    StoredJob {
        job_id: JobId(r.get::<i64, _>(0)),
        title: r.get::<String, _>(1),
        company: r.get::<Option<String>, _>(2),
        location: r.get::<Option<String>, _>(3),
        description: r.get::<Option<String>, _>(4),
        link: r.get::<Option<String>, _>(5),
        source: r.get::<String, _>(6),
        applied: r.get::<bool, _>(7),
        first_seen: r.get::<NaiveDate, _>(8),
        last_seen: r.get::<NaiveDate, _>(9),
    }
}

/// Creates the directory holding a file-backed SQLite database.
pub fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };
    let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) else {
        return Ok(());
    };
    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })
}

pub fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url.starts_with("sqlite::memory:") || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
