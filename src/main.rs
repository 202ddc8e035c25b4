use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use doc_chat::commands::{chat, ingest_files, run_pipeline, show_status};
use doc_chat::config::{Config, resolve_config_dir, run_interactive_config, show_config};
use doc_chat::logging::init_logging;
use doc_chat::{RagError, Result};
use tracing::{debug, error};

#[derive(Parser)]
#[command(name = "doc-chat")]
#[command(about = "Ask questions about your PDF and text documents")]
#[command(version)]
struct Cli {
    /// Directory holding config.toml and the default index
    #[arg(long, global = true)]
    config_dir: Option<PathBuf>,
    /// Override where the index is stored
    #[arg(long, global = true)]
    index_dir: Option<PathBuf>,
    /// Also write debug logs to a timestamped file in this directory
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure the model provider and retrieval settings
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
    },
    /// Load, chunk and embed documents into a new index
    Ingest {
        /// PDF or text files, or directories containing them
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        /// Reject unsupported file types instead of skipping them
        #[arg(long)]
        strict: bool,
    },
    /// Ask questions about the ingested documents
    Chat,
    /// Ingest a data directory, then start chatting
    Run {
        /// Directory containing the documents
        #[arg(long, default_value = "data")]
        data_dir: PathBuf,
    },
    /// Show provider and index status
    Status,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match init_logging(cli.log_dir.as_deref()) {
        Ok(Some(path)) => debug!("Writing logs to {}", path.display()),
        Ok(None) => {}
        Err(e) => eprintln!("Failed to initialize logging: {e:#}"),
    }

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            eprintln!("{}", e.user_message());
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let config_dir =
        resolve_config_dir(cli.config_dir.as_deref()).map_err(|e| RagError::Config(e.to_string()))?;

    if let Commands::Config { show } = cli.command {
        return if show {
            show_config(&config_dir)
        } else {
            run_interactive_config(&config_dir)
        }
        .map_err(|e| RagError::Config(format!("{e:#}")));
    }

    let config = load_config(&config_dir, cli.index_dir)?;
    match cli.command {
        Commands::Ingest { paths, strict } => {
            ingest_files(&config, &paths, strict)?;
        }
        Commands::Chat => chat(&config)?,
        Commands::Run { data_dir } => run_pipeline(&config, &data_dir)?,
        Commands::Status => show_status(&config)?,
        Commands::Config { .. } => {}
    }

    Ok(())
}

fn load_config(config_dir: &Path, index_dir: Option<PathBuf>) -> Result<Config> {
    let mut config =
        Config::load(config_dir).map_err(|e| RagError::Config(format!("{e:#}")))?;
    if index_dir.is_some() {
        config.index_dir = index_dir;
    }
    Ok(config)
}
