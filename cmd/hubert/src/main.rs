//! HuBERT CLI - extract content units from audio for diff-svc preprocessing.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

use commands::{EncodeCommand, InfoCommand};

/// HuBERT CLI - extract content units from audio.
///
/// Settings are read from a diff-svc hparams file (`--config`); only
/// `use_vec`, `hubert_gpu` and `hubert_path` are consulted, every other
/// key is ignored.
#[derive(Parser)]
#[command(name = "hubert")]
#[command(about = "HuBERT unit extraction tool")]
#[command(version)]
pub struct Cli {
    /// Hparams file (YAML)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Checkpoint file or a file next to it (overrides hubert_path)
    #[arg(long, global = true)]
    pub ckpt: Option<PathBuf>,

    /// Use the vec backend (overrides use_vec); `--use-vec=false` forces soft
    #[arg(
        long = "use-vec",
        global = true,
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true"
    )]
    pub use_vec: Option<bool>,

    /// Never use the GPU (overrides hubert_gpu)
    #[arg(long, global = true)]
    pub cpu: bool,

    /// Output as JSON (for piping)
    #[arg(long, global = true)]
    pub json: bool,

    /// Verbose output
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Extract units from one audio file
    Encode(EncodeCommand),
    /// Show the resolved checkpoint, device and backend
    Info(InfoCommand),
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match &cli.command {
        Commands::Encode(cmd) => cmd.run(&cli),
        Commands::Info(cmd) => cmd.run(&cli),
    }
}
