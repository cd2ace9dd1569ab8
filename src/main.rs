use std::path::PathBuf;

use clap::{Parser, Subcommand};
use pdf_ingest::commands::{delete_files, ingest, list_files, show_status};
use pdf_ingest::config::Config;
use pdf_ingest::{IngestError, Result};

#[derive(Parser)]
#[command(name = "pdf-ingest")]
#[command(about = "Ingests uploaded documents into a vector store with per-chunk status tracking")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest one or more uploaded documents (PDF or convertible office formats)
    Ingest {
        /// Files to ingest
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// List file names known to the metadata store
    List,
    /// Show per-file chunk status counts
    Status,
    /// Delete all records for the given file names from both stores
    Delete {
        /// File names as recorded at ingestion time
        #[arg(required = true)]
        file_names: Vec<String>,
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = Config::from_env().map_err(|e| IngestError::Config(e.to_string()))?;

    match cli.command {
        Commands::Ingest { paths } => {
            ingest(&config, &paths)?;
        }
        Commands::List => {
            list_files(&config)?;
        }
        Commands::Status => {
            show_status(&config)?;
        }
        Commands::Delete { file_names, yes } => {
            delete_files(&config, &file_names, yes)?;
        }
    }

    Ok(())
}
