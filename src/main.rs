//! # Media Insights
//!
//! A news ingestion service that collects articles from RSS feeds and scraped
//! front pages, deduplicates and normalizes them into analysis sections, and
//! submits them to an external text-analysis service with a cached
//! client-credentials token.
//!
//! ## Features
//!
//! - RSS 2.0, RDF and Atom feeds plus CSS-selector scraping of front pages
//! - Best-effort full-text extraction for every article
//! - Per-run deduplication by content fingerprint, newest-first ordering
//! - Source groups (one JSON document each) submitted as separate analyses
//! - Exponential-backoff retries around every service call
//! - An HTTP API (`serve`) and one-shot subcommands for scripting
//!
//! ## Usage
//!
//! ```sh
//! media_insights serve --listen 0.0.0.0:3000
//! media_insights ingest | jq '.[0].sections | length'
//! ```
//!
//! ## Architecture
//!
//! 1. **Fetching**: each source yields at most K candidates
//! 2. **Extraction**: every new candidate's page is fetched for its body text
//! 3. **Ingestion**: dedup, index, sort newest first
//! 4. **Dispatch**: sections are posted to the analysis service, one request per group

use clap::Parser;
use reqwest::Client;
use std::error::Error;
use std::time::Duration;
use tracing::{debug, info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod api;
mod cli;
mod config;
mod cycle;
mod error;
mod extractor;
mod identity;
mod models;
mod pipeline;
mod retry;
mod scrapers;
mod sections;
mod server;
mod token;
mod utils;

use api::AnalysisClient;
use cli::{Cli, Command, ServiceArgs};
use config::{ServiceSettings, load_groups};
use cycle::NewsCycle;
use extractor::FullTextExtractor;
use pipeline::IngestionPipeline;
use retry::Backoff;
use scrapers::SourceFetcher;
use server::AppState;

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // A missing .env file is fine; the environment and flags still apply.
    dotenvy::dotenv().ok();

    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .with_writer(std::io::stderr)
        .init();

    let start_time = std::time::Instant::now();
    let args = Cli::parse();
    debug!(?args.service.sources, command = ?args.command, "Parsed CLI arguments");

    let scrape_client = Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(args.service.fetch_timeout_secs))
        .build()?;
    let backoff = Backoff::new(
        args.service.dispatch_retries,
        Duration::from_millis(args.service.retry_delay_ms),
    );

    match args.command {
        Command::Serve { listen } => {
            let state = AppState {
                cycle: news_cycle(&args.service, scrape_client, backoff)?,
                client: analysis_client(&args.service)?,
                backoff,
            };
            server::serve(listen, state).await?;
        }
        Command::Run => {
            let client = analysis_client(&args.service)?;
            let report = news_cycle(&args.service, scrape_client, backoff)?
                .run(&client)
                .await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Ingest => {
            let collected = news_cycle(&args.service, scrape_client, backoff)?
                .collect()
                .await;
            println!("{}", serde_json::to_string_pretty(&collected)?);
        }
        Command::History => {
            let files = analysis_client(&args.service)?
                .previously_analyzed_with_retry(backoff.max_attempts, backoff.initial_delay)
                .await?;
            println!("{}", serde_json::to_string_pretty(&files)?);
        }
        Command::Health => {
            let report = analysis_client(&args.service)?.health_check().await;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    info!(
        elapsed_s = start_time.elapsed().as_secs_f64(),
        "media_insights finished"
    );
    Ok(())
}

fn news_cycle(
    args: &ServiceArgs,
    scrape_client: Client,
    backoff: Backoff,
) -> Result<NewsCycle, Box<dyn Error>> {
    let groups = load_groups(&args.sources)?;
    let pipeline = IngestionPipeline::new(
        SourceFetcher::new(scrape_client.clone(), args.max_items_per_source),
        FullTextExtractor::new(scrape_client),
    );
    Ok(NewsCycle::new(
        pipeline,
        groups,
        args.analytics_type.as_str(),
        args.granularity.as_str(),
        backoff,
    ))
}

fn analysis_client(args: &ServiceArgs) -> Result<AnalysisClient, Box<dyn Error>> {
    let settings = ServiceSettings::from_args(args)?;
    let http = Client::builder().user_agent(USER_AGENT).build()?;
    info!(
        core = %settings.core_base_url,
        manuscript = ?settings.manuscript_base_url,
        token_url = %settings.token_url,
        "Analysis client configured"
    );
    Ok(AnalysisClient::from_settings(http, &settings))
}
