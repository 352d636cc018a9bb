use std::{
    collections::{BTreeSet, HashMap},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, MutexGuard,
    },
};

use anyhow::Result;
use shared::{
    domain::JobId,
    protocol::{JobFormInput, JobQuery, JobSummary},
};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::{
    surface::{JobRow, PageSurface},
    JobsApi,
};

pub const TOGGLE_FAILED_MESSAGE: &str = "Failed to update. Please retry.";
pub const DELETE_PROMPT: &str = "Delete this job?";
pub const JOB_DELETED_MESSAGE: &str = "Job deleted.";
pub const DELETE_FAILED_MESSAGE: &str = "Failed to delete job.";
pub const JOB_ADDED_MESSAGE: &str = "Job added.";
pub const ADD_FAILED_MESSAGE: &str = "Failed to add job.";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ControllerError {
    #[error("no displayed row for job {0}")]
    UnknownRow(JobId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowPhase {
    Idle { applied: bool },
    Pending { ticket: u64, desired: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    /// Server accepted the newest toggle; highlight now follows it.
    Confirmed { applied: bool },
    /// Newest toggle failed; the checkbox was restored to the last confirmed value.
    Reverted { checked: bool },
    /// A later toggle on the same row owns the display.
    Superseded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Declined,
    Deleted,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Added,
    Failed,
    AlreadySubmitting,
}

/// Orders the toggle requests of one row by ticket.
///
/// `served` is the highest ticket such that it and every ticket before it
/// have finished or been abandoned.
#[derive(Debug)]
struct Turnstile {
    served: watch::Sender<u64>,
    finished: Mutex<BTreeSet<u64>>,
}

impl Turnstile {
    fn new() -> Self {
        let (served, _) = watch::channel(0);
        Self {
            served,
            finished: Mutex::new(BTreeSet::new()),
        }
    }

    async fn wait_turn(&self, ticket: u64) {
        let mut turn = self.served.subscribe();
        // The sender outlives this borrow, so the wait only ends on our turn.
        let _ = turn.wait_for(|served| *served + 1 >= ticket).await;
    }

    fn release(&self, ticket: u64) {
        let mut finished = self
            .finished
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        finished.insert(ticket);
        self.served.send_modify(|served| {
            while finished.remove(&(*served + 1)) {
                *served += 1;
            }
        });
    }
}

/// A toggle that has updated the checkbox but not yet reached the server.
///
/// Dropping it unsettled gives up its place in the row's queue; later
/// tickets still wait for the earlier ones.
#[derive(Debug)]
pub struct PendingToggle {
    job_id: JobId,
    ticket: u64,
    desired: bool,
    turnstile: Arc<Turnstile>,
}

impl PendingToggle {
    pub fn job_id(&self) -> JobId {
        self.job_id
    }

    pub fn ticket(&self) -> u64 {
        self.ticket
    }

    pub fn desired(&self) -> bool {
        self.desired
    }
}

impl Drop for PendingToggle {
    fn drop(&mut self) {
        self.turnstile.release(self.ticket);
    }
}

struct RowState {
    row: JobRow,
    /// Last `applied` value the server is known to hold.
    confirmed: bool,
    /// Highest ticket handed out for this row.
    issued: u64,
    desired: Option<bool>,
    turnstile: Arc<Turnstile>,
}

impl RowState {
    fn new(job: JobSummary) -> Self {
        Self {
            confirmed: job.applied,
            row: JobRow::from_summary(job),
            issued: 0,
            desired: None,
            turnstile: Arc::new(Turnstile::new()),
        }
    }

    fn phase(&self) -> RowPhase {
        match self.desired {
            Some(desired) => RowPhase::Pending {
                ticket: self.issued,
                desired,
            },
            None => RowPhase::Idle {
                applied: self.confirmed,
            },
        }
    }
}

#[derive(Default)]
struct RowTable {
    query: JobQuery,
    rows: Vec<RowState>,
}

impl RowTable {
    fn find(&self, job_id: JobId) -> Option<&RowState> {
        self.rows.iter().find(|state| state.row.job.job_id == job_id)
    }

    fn find_mut(&mut self, job_id: JobId) -> Option<&mut RowState> {
        self.rows
            .iter_mut()
            .find(|state| state.row.job.job_id == job_id)
    }

    /// The row `pending` was issued for, unless it has been reloaded away.
    fn issuer_of(&mut self, pending: &PendingToggle) -> Option<&mut RowState> {
        self.find_mut(pending.job_id)
            .filter(|state| Arc::ptr_eq(&state.turnstile, &pending.turnstile))
    }

    fn remove(&mut self, job_id: JobId) {
        self.rows.retain(|state| state.row.job.job_id != job_id);
    }

    fn snapshot(&self) -> Vec<JobRow> {
        self.rows.iter().map(|state| state.row.clone()).collect()
    }

    /// Replaces the table with a fresh listing, keeping per-row toggle state
    /// for rows that are still listed.
    fn merge(&mut self, fetched: Vec<JobSummary>) {
        let mut previous: HashMap<JobId, RowState> = self
            .rows
            .drain(..)
            .map(|state| (state.row.job.job_id, state))
            .collect();
        self.rows = fetched
            .into_iter()
            .map(|job| match previous.remove(&job.job_id) {
                Some(mut state) => {
                    if state.desired.is_none() {
                        state.confirmed = job.applied;
                        state.row.checked = job.applied;
                        state.row.highlighted = job.applied;
                    }
                    state.row.job = job;
                    state
                }
                None => RowState::new(job),
            })
            .collect();
    }
}

/// Binds the per-row checkbox, the per-row delete button and the add-job form
/// to the server, keeping displayed rows in line with confirmed server state.
pub struct RowActionController {
    api: Arc<dyn JobsApi>,
    surface: Arc<dyn PageSurface>,
    table: Mutex<RowTable>,
    submitting: AtomicBool,
}

impl RowActionController {
    pub fn new(api: Arc<dyn JobsApi>, surface: Arc<dyn PageSurface>) -> Self {
        Self {
            api,
            surface,
            table: Mutex::new(RowTable::default()),
            submitting: AtomicBool::new(false),
        }
    }

    /// Shows `jobs` as fetched with `query` without contacting the server.
    pub fn show(&self, query: JobQuery, jobs: Vec<JobSummary>) {
        let rows = {
            let mut table = self.lock_table();
            table.query = query;
            table.merge(jobs);
            table.snapshot()
        };
        self.surface.reload(&rows);
    }

    /// Fetches the listing for `query` and displays it.
    pub async fn load(&self, query: JobQuery) -> Result<usize> {
        let jobs = self.api.list_jobs(&query).await?;
        let count = jobs.len();
        self.show(query, jobs);
        Ok(count)
    }

    /// Re-fetches the listing with the current filter and reloads the page once.
    pub async fn refresh(&self) -> Result<()> {
        let query = self.lock_table().query.clone();
        let jobs = self.api.list_jobs(&query).await?;
        let rows = {
            let mut table = self.lock_table();
            table.merge(jobs);
            table.snapshot()
        };
        self.surface.reload(&rows);
        Ok(())
    }

    pub fn rows(&self) -> Vec<JobRow> {
        self.lock_table().snapshot()
    }

    pub fn row(&self, job_id: JobId) -> Option<JobRow> {
        self.lock_table().find(job_id).map(|state| state.row.clone())
    }

    pub fn row_phase(&self, job_id: JobId) -> Option<RowPhase> {
        self.lock_table().find(job_id).map(RowState::phase)
    }

    /// Checkbox gesture: toggle the row and wait for the server's answer.
    pub async fn toggle_applied(
        &self,
        job_id: JobId,
        desired: bool,
    ) -> Result<ToggleOutcome, ControllerError> {
        let pending = self.begin_toggle(job_id, desired)?;
        Ok(self.settle(pending).await)
    }

    /// Shows `desired` in the checkbox and takes the row's next ticket.
    pub fn begin_toggle(
        &self,
        job_id: JobId,
        desired: bool,
    ) -> Result<PendingToggle, ControllerError> {
        let mut table = self.lock_table();
        let state = table
            .find_mut(job_id)
            .ok_or(ControllerError::UnknownRow(job_id))?;
        state.issued += 1;
        state.desired = Some(desired);
        state.row.checked = desired;
        state.row.pending = true;
        // Row drawing happens under the table lock so a settling toggle
        // cannot paint over a newer gesture.
        self.surface.set_checkbox(job_id, desired);
        debug!(job_id = %job_id, ticket = state.issued, desired, "toggle started");
        Ok(PendingToggle {
            job_id,
            ticket: state.issued,
            desired,
            turnstile: Arc::clone(&state.turnstile),
        })
    }

    /// Sends the toggle once every earlier ticket for the row has finished,
    /// then applies the result if no later toggle has been started.
    pub async fn settle(&self, pending: PendingToggle) -> ToggleOutcome {
        pending.turnstile.wait_turn(pending.ticket).await;
        let result = self.api.set_applied(pending.job_id, pending.desired).await;
        self.finish_toggle(&pending, result)
    }

    fn finish_toggle(&self, pending: &PendingToggle, result: Result<()>) -> ToggleOutcome {
        let job_id = pending.job_id;
        let ticket = pending.ticket;
        let desired = pending.desired;

        let mut table = self.lock_table();
        let Some(state) = table.issuer_of(pending) else {
            debug!(job_id = %job_id, ticket, "row left the page before toggle settled");
            return ToggleOutcome::Superseded;
        };
        let err = match result {
            Ok(()) => {
                state.confirmed = desired;
                if state.issued != ticket {
                    return ToggleOutcome::Superseded;
                }
                state.desired = None;
                state.row.pending = false;
                state.row.highlighted = desired;
                state.row.job.applied = desired;
                self.surface.set_highlight(job_id, desired);
                info!(job_id = %job_id, applied = desired, "applied flag updated");
                return ToggleOutcome::Confirmed { applied: desired };
            }
            Err(err) => err,
        };
        if state.issued != ticket {
            warn!(job_id = %job_id, ticket, error = %err, "superseded toggle failed");
            return ToggleOutcome::Superseded;
        }
        drop(table);

        warn!(job_id = %job_id, desired, error = %err, "failed to update applied flag");
        self.surface.notify(TOGGLE_FAILED_MESSAGE);

        // A gesture made while the notification was up owns the checkbox.
        let mut table = self.lock_table();
        match table.issuer_of(pending) {
            Some(state) if state.issued == ticket => {
                state.desired = None;
                state.row.pending = false;
                state.row.checked = state.confirmed;
                self.surface.set_checkbox(job_id, state.confirmed);
                ToggleOutcome::Reverted {
                    checked: state.confirmed,
                }
            }
            _ => ToggleOutcome::Superseded,
        }
    }

    /// Delete-button gesture.
    pub async fn delete_row(&self, job_id: JobId) -> Result<DeleteOutcome, ControllerError> {
        if self.lock_table().find(job_id).is_none() {
            return Err(ControllerError::UnknownRow(job_id));
        }
        if !self.surface.confirm(DELETE_PROMPT).await {
            debug!(job_id = %job_id, "delete declined");
            return Ok(DeleteOutcome::Declined);
        }

        let result = self.api.delete_job(job_id).await;
        if let Err(err) = result {
            warn!(job_id = %job_id, error = %err, "failed to delete job");
            self.surface.notify(DELETE_FAILED_MESSAGE);
            return Ok(DeleteOutcome::Failed);
        }

        info!(job_id = %job_id, "job deleted");
        self.surface.notify(JOB_DELETED_MESSAGE);
        self.lock_table().remove(job_id);
        self.reconcile().await;
        Ok(DeleteOutcome::Deleted)
    }

    /// Add-job form submission. The form is sent exactly as collected.
    pub async fn submit_new_job(&self, form: JobFormInput) -> SubmitOutcome {
        if self.submitting.swap(true, Ordering::AcqRel) {
            debug!("add-job submission already in flight");
            return SubmitOutcome::AlreadySubmitting;
        }
        let _in_flight = SubmitGuard(&self.submitting);

        let result = self.api.add_job(&form).await;
        if let Err(err) = result {
            warn!(title = ?form.value("title"), error = %err, "failed to add job");
            self.surface.notify(ADD_FAILED_MESSAGE);
            return SubmitOutcome::Failed;
        }

        info!(title = ?form.value("title"), "job added");
        self.surface.notify(JOB_ADDED_MESSAGE);
        if self.surface.modal_open() {
            self.surface.close_modal();
        }
        self.reconcile().await;
        SubmitOutcome::Added
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting.load(Ordering::Acquire)
    }

    /// Reloads the page exactly once after a structural change.
    async fn reconcile(&self) {
        if let Err(err) = self.refresh().await {
            warn!(error = %err, "re-fetch failed, reloading local rows");
            let rows = self.rows();
            self.surface.reload(&rows);
        }
    }

    fn lock_table(&self) -> MutexGuard<'_, RowTable> {
        self.table.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

struct SubmitGuard<'a>(&'a AtomicBool);

impl Drop for SubmitGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
