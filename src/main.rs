//! Command-line runner for privileged catalog jobs.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use zabytki_lib::application::BulkImporter;
use zabytki_lib::domain::error::{AppError, Result};
use zabytki_lib::infrastructure::config::AppConfig;
use zabytki_lib::infrastructure::db::catalog::CatalogRepository;

#[derive(Parser, Debug)]
#[command(name = "zabytki")]
#[command(about = "Catalog of inscriptions and monuments")]
#[command(version)]
struct Cli {
    /// Configuration file (defaults to ./zabytki.toml when present)
    #[arg(long, global = true, value_name = "FILE", env = "ZABYTKI_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Import catalog entries and photos from a CSV file
    Import {
        #[arg(long, value_name = "FILE")]
        csv: PathBuf,

        /// Directory searched recursively for referenced photo files
        #[arg(long, value_name = "DIR")]
        photos: Option<PathBuf>,

        /// Print the whole report as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match AppConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{}", err);
            return ExitCode::FAILURE;
        }
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_level.as_str())),
        )
        .try_init();

    match run(cli.command, &config).await {
        Ok(code) => code,
        Err(err) => {
            error!(error = %err, "Job failed");
            eprintln!("{}", err);
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Command, config: &AppConfig) -> Result<ExitCode> {
    match command {
        Command::Import { csv, photos, json } => {
            let repo = CatalogRepository::open(&config.database_path).await?;
            let importer = BulkImporter::from_config(repo, config)?;
            let actor = config.job_actor();
            info!(csv = %csv.display(), user = %config.job_user, "Running import job");

            let report = importer.run_as(&actor, &csv, photos.as_deref()).await?;
            if json {
                let rendered = serde_json::to_string_pretty(&report)
                    .map_err(|e| AppError::Internal(format!("Failed to render report: {}", e)))?;
                println!("{}", rendered);
            } else {
                println!("{}", report.summary(config.error_display_limit));
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}
