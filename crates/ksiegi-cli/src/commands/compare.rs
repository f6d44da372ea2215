//! Compare command - compare two result files row by row.

use std::path::PathBuf;

use clap::Args;
use console::style;

use ksiegi_core::{CompareOptions, ComparisonStatus, ResultPersister};

use super::config;

/// Arguments for the compare command.
#[derive(Args)]
pub struct CompareArgs {
    /// First file (A)
    file_a: PathBuf,

    /// Second file (B)
    file_b: PathBuf,

    /// Zero-based column compared in both files
    #[arg(long, default_value_t = 0)]
    column: usize,

    /// Skip the first row of each file
    #[arg(long)]
    skip_header: bool,

    /// Comparison output file (default from config)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

pub async fn run(args: CompareArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = config::load(config_path)?;
    let persister = ResultPersister::new(config.output);

    let options = CompareOptions {
        column: args.column,
        skip_header: args.skip_header,
    };
    let (rows, output_path) =
        persister.compare(&args.file_a, &args.file_b, args.output.as_deref(), &options)?;

    let count = |status: ComparisonStatus| rows.iter().filter(|r| r.status == status).count();
    let identical = count(ComparisonStatus::Identical);

    for row in rows.iter().filter(|r| r.status != ComparisonStatus::Identical) {
        let status = match row.status {
            ComparisonStatus::Different => style(row.status.as_str()).red(),
            _ => style(row.status.as_str()).yellow(),
        };
        println!(
            "  {:>5}  {:<24} {:<24} {}",
            row.row, row.value_a, row.value_b, status
        );
    }

    println!(
        "{} Compared {} rows: {} identical, {} different, {} missing in A, {} missing in B",
        style("✓").green(),
        rows.len(),
        style(identical).green(),
        style(count(ComparisonStatus::Different)).red(),
        style(count(ComparisonStatus::MissingInA)).yellow(),
        style(count(ComparisonStatus::MissingInB)).yellow()
    );
    println!(
        "{} Comparison written to {}",
        style("ℹ").blue(),
        output_path.display()
    );

    Ok(())
}
