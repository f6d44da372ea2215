//! CLI application for reading invoice numbers out of scanned ledger PDFs.

mod commands;

use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use commands::{cells, compare, config, pages};

/// Ledger OCR - Extract invoice numbers from scanned ledger PDFs
#[derive(Parser)]
#[command(name = "ksiegi")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// OCR every page of a document and save the records found
    Pages(pages::PagesArgs),

    /// Segment one page into table cells and OCR each cell
    Cells(cells::CellsArgs),

    /// Compare two result files row by row
    Compare(compare::CompareArgs),

    /// Manage configuration
    Config(config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Pages(args) => pages::run(args, config_path).await,
        Commands::Cells(args) => cells::run(args, config_path).await,
        Commands::Compare(args) => compare::run(args, config_path).await,
        Commands::Config(args) => config::run(args, config_path).await,
    }
}
