use crate::commands::{run_ingest, run_match, IngestArgs, MatchArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use scholar_match::config::AppConfig;
use scholar_match::error::AppError;
use scholar_match::telemetry;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "Scholar Match",
    about = "Run the scholarship portal API or its ingestion and matching tools",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Extract listings from a PDF, text or CSV file and print the ingestion report
    Ingest(IngestArgs),
    /// Rank a catalog against a student profile and print the eligibility breakdown
    Match(MatchArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Preload the catalog from a CSV sheet or JSON listing array
    #[arg(long)]
    pub(crate) seed: Option<PathBuf>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Ingest(args) => {
            let config = tool_config()?;
            run_ingest(&config, args).await
        }
        Command::Match(args) => {
            tool_config()?;
            run_match(args)
        }
    }
}

/// Configuration for the one-shot commands. Their logs go to stderr so the
/// printed report stays alone on stdout.
fn tool_config() -> Result<AppConfig, AppError> {
    let config = AppConfig::load()?;
    telemetry::init_stderr(&config.telemetry)?;
    Ok(config)
}
