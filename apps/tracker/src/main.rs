use std::sync::Arc;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use client_core::{HttpJobsApi, RowActionController};
use shared::{
    domain::{AppliedFilter, JobId},
    protocol::{JobFormInput, JobQuery},
};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

mod terminal;

use terminal::TerminalSurface;

#[derive(Parser, Debug)]
struct Args {
    #[arg(long, default_value = "http://127.0.0.1:5003")]
    server_url: String,
    /// Case-insensitive text filter over title, company and location.
    #[arg(long, default_value = "")]
    q: String,
    #[arg(long, default_value = "")]
    source: String,
    /// `true` or `false`; anything else lists every job.
    #[arg(long)]
    applied: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    List,
    /// Set the applied flag of a displayed job.
    Toggle {
        job_id: i64,
        #[arg(action = clap::ArgAction::Set)]
        applied: bool,
    },
    Delete {
        job_id: i64,
        /// Skip the confirmation prompt.
        #[arg(long)]
        yes: bool,
    },
    /// Submit the add-job form; repeat `--field name=value` per field.
    Add {
        #[arg(long = "field", value_parser = parse_field)]
        fields: Vec<(String, String)>,
    },
}

fn parse_field(raw: &str) -> Result<(String, String)> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| anyhow!("expected name=value, got {raw:?}"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(anyhow!("field name is empty in {raw:?}"));
    }
    Ok((name.to_string(), value.to_string()))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let args = Args::parse();

    let assume_yes = matches!(args.command, Command::Delete { yes: true, .. });
    let surface = Arc::new(TerminalSurface::new(assume_yes));
    let api = Arc::new(HttpJobsApi::new(args.server_url));
    let controller = RowActionController::new(api, surface.clone());

    let query = JobQuery {
        q: args.q.trim().to_string(),
        source: args.source.trim().to_string(),
        applied: AppliedFilter::from_param(args.applied.as_deref()),
    };
    let loaded = controller.load(query).await?;
    debug!(rows = loaded, "listing loaded");

    match args.command {
        Command::List => {}
        Command::Toggle { job_id, applied } => {
            let outcome = controller.toggle_applied(JobId(job_id), applied).await?;
            info!(job_id, ?outcome, "toggle finished");
        }
        Command::Delete { job_id, .. } => {
            let outcome = controller.delete_row(JobId(job_id)).await?;
            info!(job_id, ?outcome, "delete finished");
        }
        Command::Add { fields } => {
            let form: JobFormInput = fields.into_iter().collect();
            surface.open_form();
            let outcome = controller.submit_new_job(form).await;
            info!(?outcome, "submit finished");
        }
    }

    Ok(())
}
