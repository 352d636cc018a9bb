use std::{
    io::{self, BufRead, Write},
    sync::atomic::{AtomicBool, Ordering},
};

use async_trait::async_trait;
use client_core::{JobRow, PageSurface};
use shared::domain::JobId;
use tracing::warn;

/// Draws the job table on stdout and asks questions on stdin.
pub struct TerminalSurface {
    assume_yes: bool,
    form_open: AtomicBool,
}

impl TerminalSurface {
    pub fn new(assume_yes: bool) -> Self {
        Self {
            assume_yes,
            form_open: AtomicBool::new(false),
        }
    }

    pub fn open_form(&self) {
        self.form_open.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl PageSurface for TerminalSurface {
    fn set_checkbox(&self, job_id: JobId, checked: bool) {
        println!("job {job_id}: applied {}", checkbox(checked));
    }

    fn set_highlight(&self, job_id: JobId, highlighted: bool) {
        let marker = if highlighted { "highlighted" } else { "plain" };
        println!("job {job_id}: row {marker}");
    }

    fn notify(&self, message: &str) {
        println!("{message}");
    }

    async fn confirm(&self, prompt: &str) -> bool {
        if self.assume_yes {
            return true;
        }
        let prompt = prompt.to_string();
        let answer = tokio::task::spawn_blocking(move || {
            print!("{prompt} [y/N] ");
            io::stdout().flush()?;
            let mut line = String::new();
            io::stdin().lock().read_line(&mut line)?;
            Ok::<_, io::Error>(line)
        })
        .await;
        match answer {
            Ok(Ok(line)) => is_yes(&line),
            Ok(Err(err)) => {
                warn!(error = %err, "failed to read confirmation");
                false
            }
            Err(err) => {
                warn!(error = %err, "confirmation prompt panicked");
                false
            }
        }
    }

    fn modal_open(&self) -> bool {
        self.form_open.load(Ordering::SeqCst)
    }

    fn close_modal(&self) {
        self.form_open.store(false, Ordering::SeqCst);
    }

    fn reload(&self, rows: &[JobRow]) {
        print!("{}", render_rows(rows));
    }
}

fn checkbox(checked: bool) -> &'static str {
    if checked {
        "[x]"
    } else {
        "[ ]"
    }
}

pub fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

pub fn render_rows(rows: &[JobRow]) -> String {
    if rows.is_empty() {
        return "No jobs found.\n".to_string();
    }
    let mut out = String::new();
    for row in rows {
        let job = &row.job;
        let marker = if row.highlighted { '*' } else { ' ' };
        let pending = if row.pending { " (saving)" } else { "" };
        out.push_str(&format!(
            "{marker} {:>5} {} {} | {} | {} | {} | {}{pending}\n",
            job.job_id.0,
            checkbox(row.checked),
            job.title,
            job.company.as_deref().unwrap_or("-"),
            job.location.as_deref().unwrap_or("-"),
            job.source,
            job.last_seen,
        ));
    }
    out
}

#[cfg(test)]
#[path = "tests/terminal_tests.rs"]
mod tests;
