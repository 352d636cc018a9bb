use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use scraper::{ScrapeSettings, SerpApiClient};
use storage::Storage;
use tracing_subscriber::EnvFilter;

const DEFAULT_DATABASE_URL: &str = "sqlite://./data/jobtracker.db";

#[derive(Parser, Debug)]
struct Cli {
    /// Falls back to `DATABASE_URL`, then the server's default location.
    #[arg(long)]
    database_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Harvest Google Jobs listings for every configured keyword and location.
    Scrape,
    /// Print the total row count and the count per source.
    Counts,
    /// Show which settings the environment provides.
    CheckEnv,
}

fn resolve_database_url(flag: Option<String>) -> String {
    flag.or_else(|| std::env::var("DATABASE_URL").ok())
        .filter(|url| !url.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let database_url = resolve_database_url(cli.database_url);

    match cli.command {
        Command::Scrape => {
            let settings = ScrapeSettings::from_env();
            let client = SerpApiClient::new(settings.require_api_key()?);
            let storage = Storage::new(&database_url)
                .await
                .with_context(|| format!("failed to open {database_url}"))?;
            let report = scraper::run(&storage, &client, &settings).await;
            for pair in &report.pairs {
                println!(
                    "kw='{}' loc='{}' processed={} upserted_or_matched={}",
                    pair.keyword, pair.location, pair.processed, pair.upserted
                );
            }
            println!("TOTAL upserted_or_matched={}", report.total_upserted());
            if report.failed_fetches > 0 {
                println!("failed searches={}", report.failed_fetches);
            }
        }
        Command::Counts => {
            let storage = Storage::new(&database_url)
                .await
                .with_context(|| format!("failed to open {database_url}"))?;
            println!("Total jobs: {}", storage.count_jobs().await?);
            for (source, count) in storage.counts_by_source().await? {
                println!("{source}: {count}");
            }
        }
        Command::CheckEnv => {
            let settings = ScrapeSettings::from_env();
            println!("DATABASE_URL: {database_url}");
            println!("SERPAPI_KEY present? {}", settings.serpapi_key.is_some());
            println!("KEYWORDS: {}", settings.keywords.join(", "));
            println!("LOCATIONS: {}", settings.locations.join(", "));
        }
    }

    Ok(())
}
