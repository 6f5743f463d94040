//! `tezgah`: parse Turkish receipt OCR text and categorize its items.

mod commands;
mod config;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use config::Config;

/// Turn OCR text of retail receipts into structured, categorized JSON
#[derive(Parser)]
#[command(name = "tezgah")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to config file (defaults to $TEZGAH_CONFIG)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract merchant, date, total and items from receipt text
    Parse(commands::ParseArgs),

    /// Match free-text product names against the taxonomy
    Categorize(commands::CategorizeArgs),

    /// Parse receipt text and categorize every item
    Process(commands::ParseArgs),
}

fn init_logging(verbose: u8, config: &Config) {
    let default = match verbose {
        0 => config.log.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;
    init_logging(cli.verbose, &config);

    match cli.command {
        Commands::Parse(args) => commands::parse(&args, &config),
        Commands::Categorize(args) => commands::categorize(&args, &config),
        Commands::Process(args) => commands::process(&args, &config),
    }
}
