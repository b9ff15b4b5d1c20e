//! voxtrim CLI: clean up, compress, and transcribe audio files.
//!
//! Usage:
//!   voxtrim compress <INPUT> [-o OUTPUT]   Clean and compress a WAV file to MP3
//!   voxtrim transcribe <INPUT>...          Compress and transcribe up to ten files
//!   voxtrim config [--init]                Show or write the configuration

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use voxtrim_common::config::AppConfig;

mod commands;

#[derive(Parser)]
#[command(
    name = "voxtrim",
    about = "Clean, compress, and transcribe audio recordings",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file to use instead of the standard location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Clean up a WAV file and compress it to MP3
    Compress {
        /// Input WAV file
        input: PathBuf,

        /// Output MP3 path (defaults to the input with an .mp3 extension)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print worker messages as JSON lines
        #[arg(long)]
        json: bool,
    },

    /// Compress and transcribe one or more files
    Transcribe {
        /// Input WAV files
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Print outcomes as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the effective configuration
    Config {
        /// Write the default configuration to the config path
        #[arg(long)]
        init: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        // A missing explicit path is allowed so `config --init` can create it.
        Some(path) if !path.exists() => AppConfig::default(),
        Some(path) => AppConfig::load_from(path)
            .map_err(|e| anyhow::anyhow!("Failed to load config {}: {e}", path.display()))?,
        None => AppConfig::load(),
    };

    let mut logging = config.logging.clone();
    if cli.verbose {
        logging.level = "debug".to_string();
    }
    voxtrim_common::logging::init_logging(&logging);

    match cli.command {
        Commands::Compress {
            input,
            output,
            json,
        } => commands::compress::run(&config, input, output, json),
        Commands::Transcribe { inputs, json } => {
            commands::transcribe::run(&config, inputs, json).await
        }
        Commands::Config { init } => commands::config::run(&config, cli.config, init),
    }
}
