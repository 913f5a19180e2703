//! Front-office CLI for surgical report billing.

mod backend;
mod commands;

use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use commands::{config, entry, export, ingest, parse};

/// Clinica - turn surgical reports into billing entries
#[derive(Parser)]
#[command(name = "clinica")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to config file
    #[arg(short, long, global = true, env = "CLINICA_CONFIG")]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract fields from a single report
    Parse(parse::ParseArgs),

    /// Ingest reports into the billing sheet
    Ingest(ingest::IngestArgs),

    /// Edit billing sheet entries
    Entry(entry::EntryArgs),

    /// Export the billing sheet as CSV
    Export(export::ExportArgs),

    /// Manage configuration
    Config(config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Parse(args) => parse::run(args, config_path).await,
        Commands::Ingest(args) => ingest::run(args, config_path).await,
        Commands::Entry(args) => entry::run(args, config_path).await,
        Commands::Export(args) => export::run(args, config_path).await,
        Commands::Config(args) => config::run(args, config_path).await,
    }
}
