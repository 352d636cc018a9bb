use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::{AppliedFilter, JobId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSummary {
    pub job_id: JobId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    pub source: String,
    pub applied: bool,
    pub first_seen: NaiveDate,
    pub last_seen: NaiveDate,
}

/// Listing filter shared by the index page, `/api/jobs` and the client re-fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobQuery {
    pub q: String,
    pub source: String,
    pub applied: AppliedFilter,
}

impl JobQuery {
    pub fn to_params(&self) -> JobListParams {
        JobListParams {
            q: Some(self.q.clone()).filter(|q| !q.is_empty()),
            source: Some(self.source.clone()).filter(|s| !s.is_empty()),
            applied: self.applied.as_param().map(str::to_string),
        }
    }
}

/// Raw query-string form of [`JobQuery`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobListParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub q: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub applied: Option<String>,
}

impl From<JobListParams> for JobQuery {
    fn from(params: JobListParams) -> Self {
        Self {
            q: params.q.unwrap_or_default().trim().to_string(),
            source: params.source.unwrap_or_default().trim().to_string(),
            applied: AppliedFilter::from_param(params.applied.as_deref()),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SetAppliedRequest {
    #[serde(default)]
    pub applied: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetAppliedResponse {
    pub ok: bool,
    pub applied: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteJobResponse {
    pub ok: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddJobResponse {
    pub ok: bool,
    pub job_id: JobId,
}

/// Field name → value mapping collected from the add-job form at submit time.
///
/// Carried to the server unmodified; interpretation happens server side.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobFormInput(HashMap<String, String>);

impl JobFormInput {
    pub fn raw(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    /// Trimmed value of `field`, `None` when absent or blank.
    pub fn value(&self, field: &str) -> Option<&str> {
        self.raw(field).map(str::trim).filter(|v| !v.is_empty())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for JobFormInput {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}
