//! Server-rendered job table.

use askama::Template;
use shared::{
    domain::AppliedFilter,
    protocol::{JobQuery, JobSummary},
};

pub struct JobRowView {
    pub id: i64,
    pub title: String,
    pub company: String,
    pub location: String,
    pub link: String,
    pub source: String,
    pub applied: bool,
    pub last_seen: String,
}

impl From<JobSummary> for JobRowView {
    fn from(job: JobSummary) -> Self {
        Self {
            id: job.job_id.0,
            title: job.title,
            company: job.company.unwrap_or_default(),
            location: job.location.unwrap_or_default(),
            link: job.link.unwrap_or_default(),
            source: job.source,
            applied: job.applied,
            last_seen: job.last_seen.to_string(),
        }
    }
}

pub struct SourceOption {
    pub name: String,
    pub selected: bool,
}

#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexPage {
    pub jobs: Vec<JobRowView>,
    pub q: String,
    pub sources: Vec<SourceOption>,
    pub applied_true: bool,
    pub applied_false: bool,
}

impl IndexPage {
    pub fn new(query: &JobQuery, jobs: Vec<JobSummary>, sources: Vec<String>) -> Self {
        Self {
            jobs: jobs.into_iter().map(JobRowView::from).collect(),
            q: query.q.clone(),
            sources: sources
                .into_iter()
                .map(|name| SourceOption {
                    selected: name == query.source,
                    name,
                })
                .collect(),
            applied_true: query.applied == AppliedFilter::Applied,
            applied_false: query.applied == AppliedFilter::NotApplied,
        }
    }
}
