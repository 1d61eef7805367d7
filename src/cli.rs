//! Command-line interface definitions for media_insights.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! Every service setting can be provided via a command-line flag or an
//! environment variable (a `.env` file in the working directory is loaded first).

use clap::{Args, Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;

/// Command-line arguments for the media_insights application.
///
/// # Examples
///
/// ```sh
/// # Serve GET /api/news on port 3000
/// media_insights serve
///
/// # Run one ingest → analyze cycle and print the report
/// media_insights --sources sources/ukraine_media_sources.json run
///
/// # Ingest only, no credentials needed
/// media_insights ingest
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    #[command(flatten)]
    pub service: ServiceArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the HTTP API
    Serve {
        /// Address to listen on
        #[arg(long, env = "LISTEN_ADDR", default_value = "0.0.0.0:3000")]
        listen: SocketAddr,
    },
    /// Run one ingest → sectionize → analyze cycle and print the report
    Run,
    /// Ingest and sectionize without dispatching; prints the sections as JSON
    Ingest,
    /// Print the previously analyzed files known to the manuscript service
    History,
    /// Probe the manuscript service
    Health,
}

/// Settings shared by every subcommand.
#[derive(Args, Debug)]
pub struct ServiceArgs {
    /// Source list documents, one per source group
    #[arg(
        long,
        env = "NEWS_SOURCES",
        value_delimiter = ',',
        default_value = "sources/ukraine_media_sources.json,sources/russian_media_sources.json"
    )]
    pub sources: Vec<PathBuf>,

    /// Maximum number of items taken from each source per run
    #[arg(long, env = "MAX_ITEMS_PER_SOURCE", default_value_t = 10)]
    pub max_items_per_source: usize,

    /// Timeout for feed, page and article fetches, in seconds
    #[arg(long, env = "FETCH_TIMEOUT_SECS", default_value_t = 20)]
    pub fetch_timeout_secs: u64,

    /// Base URL of the analysis service
    #[arg(long, env = "CORE_BASE_URL")]
    pub core_base_url: Option<String>,

    /// Base URL of the manuscript management service
    #[arg(long, env = "MANUSCRIPT_MGMT_BASE")]
    pub manuscript_mgmt_base: Option<String>,

    /// Identity provider domain (or full base URL)
    #[arg(long, env = "AUTH0_DOMAIN")]
    pub auth0_domain: Option<String>,

    #[arg(long, env = "AUTH0_CLIENT_ID")]
    pub auth0_client_id: Option<String>,

    #[arg(long, env = "AUTH0_CLIENT_SECRET", hide_env_values = true)]
    pub auth0_client_secret: Option<String>,

    #[arg(long, env = "AUTH0_AUDIENCE")]
    pub auth0_audience: Option<String>,

    /// Analysis flavor, used as the routing key of the analyze endpoint
    #[arg(long, env = "ANALYTICS_TYPE", default_value = "media-insights")]
    pub analytics_type: String,

    /// Unit of analysis requested from the service
    #[arg(long, env = "GRANULARITY", default_value = "article")]
    pub granularity: String,

    /// Attempts per analysis or history request
    #[arg(long, env = "DISPATCH_RETRIES", default_value_t = 3)]
    pub dispatch_retries: usize,

    /// Delay before the first retry, doubled after every failed attempt
    #[arg(long, env = "RETRY_DELAY_MS", default_value_t = 1000)]
    pub retry_delay_ms: u64,

    /// Timeout for one analysis submission, in seconds
    #[arg(long, env = "ANALYSIS_TIMEOUT_SECS", default_value_t = 120)]
    pub analysis_timeout_secs: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["media_insights", "ingest"]);

        assert!(matches!(cli.command, Command::Ingest));
        assert_eq!(cli.service.max_items_per_source, 10);
        assert_eq!(cli.service.analytics_type, "media-insights");
        assert_eq!(cli.service.granularity, "article");
        assert_eq!(cli.service.dispatch_retries, 3);
    }

    #[test]
    fn test_cli_sources_list() {
        let cli = Cli::parse_from([
            "media_insights",
            "--sources",
            "a.json,b.json",
            "--max-items-per-source",
            "5",
            "run",
        ]);

        assert!(matches!(cli.command, Command::Run));
        assert_eq!(
            cli.service.sources,
            vec![PathBuf::from("a.json"), PathBuf::from("b.json")]
        );
        assert_eq!(cli.service.max_items_per_source, 5);
    }

    #[test]
    fn test_cli_serve_listen() {
        let cli = Cli::parse_from(["media_insights", "serve", "--listen", "127.0.0.1:8080"]);

        match cli.command {
            Command::Serve { listen } => assert_eq!(listen.port(), 8080),
            other => panic!("unexpected command {other:?}"),
        }
    }
}
