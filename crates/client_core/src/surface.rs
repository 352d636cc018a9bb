use async_trait::async_trait;
use shared::{domain::JobId, protocol::JobSummary};

/// One displayed row: the last listing entry plus what the page shows for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRow {
    pub job: JobSummary,
    /// Value shown in the applied checkbox, optimistic while a toggle is pending.
    pub checked: bool,
    /// Whether the row carries the applied highlight.
    pub highlighted: bool,
    pub pending: bool,
}

impl JobRow {
    pub fn from_summary(job: JobSummary) -> Self {
        Self {
            checked: job.applied,
            highlighted: job.applied,
            pending: false,
            job,
        }
    }

    pub fn job_id(&self) -> JobId {
        self.job.job_id
    }
}

/// The page the controller draws on.
///
/// `notify` and `confirm` block the user until dismissed; the remaining calls
/// only change what is displayed.
#[async_trait]
pub trait PageSurface: Send + Sync {
    fn set_checkbox(&self, job_id: JobId, checked: bool);
    fn set_highlight(&self, job_id: JobId, highlighted: bool);
    fn notify(&self, message: &str);
    async fn confirm(&self, prompt: &str) -> bool;
    fn modal_open(&self) -> bool;
    fn close_modal(&self);
    fn reload(&self, rows: &[JobRow]);
}
