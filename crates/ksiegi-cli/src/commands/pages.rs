//! Pages command - OCR every page of a document and save the records.

use std::path::PathBuf;
use std::time::Instant;

use clap::Args;
use console::style;
use tracing::info;

use ksiegi_core::invoice::clean_record_text;
use ksiegi_core::{
    PageOcrCoordinator, PdfRasterizer, RecordValidator, ResultPersister, TaskEvent, TaskRunner,
    extract_records,
};

use super::config;
use super::driver::{self, Outcome};

/// Arguments for the pages command.
#[derive(Args)]
pub struct PagesArgs {
    /// Input document (PDF or image)
    #[arg(required = true)]
    input: PathBuf,

    /// Model directory
    #[arg(short, long)]
    model_dir: Option<PathBuf>,

    /// Output directory (default from config)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Rasterization resolution (default from config)
    #[arg(long)]
    dpi: Option<u32>,

    /// OCR whole pages instead of the configured crop
    #[arg(long)]
    no_crop: bool,
}

pub async fn run(args: PagesArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let mut config = config::load(config_path)?;
    if let Some(dir) = args.output_dir {
        config.output.dir = dir;
    }
    if args.no_crop {
        config.pages.crop = None;
    }

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    let dpi = args.dpi.unwrap_or(config.pdf.page_dpi);
    let engine = driver::load_engine(&config, args.model_dir.as_deref())?;
    let validator = RecordValidator::new(config.validation.page_mode);
    let persister = ResultPersister::new(config.output.clone());

    info!("Processing {} at {} dpi", args.input.display(), dpi);

    let mut runner = TaskRunner::new();
    PageOcrCoordinator::new(engine, &config).spawn_file(
        &mut runner,
        PdfRasterizer::with_max_pages(config.pdf.max_pages),
        &args.input,
        dpi,
    )?;

    let pb = driver::spinner()?;
    let outcome = driver::poll(&mut runner, &pb, |event| {
        if let TaskEvent::PageComplete(result) = event {
            for line in &result.lines {
                let text = clean_record_text(&line.text);
                if validator.is_plausible_record(text) {
                    pb.println(format!("  {} page {}: {}", style("•").cyan(), result.page, text));
                }
            }
        }
    })
    .await?;
    pb.finish_and_clear();

    let (lines, total_lines, total_pages, failed_pages) = match outcome {
        Outcome::Finished(TaskEvent::TaskComplete {
            lines,
            total_lines,
            total_pages,
            failed_pages,
        }) => (lines, total_lines, total_pages, failed_pages),
        Outcome::Finished(other) => {
            anyhow::bail!("Unexpected completion event: {}", other.kind())
        }
        Outcome::Cancelled => {
            println!("{} Cancelled, nothing was saved.", style("✗").yellow());
            return Ok(());
        }
    };

    let records = extract_records(&lines, &validator);
    let records_path = persister.save_records(&records)?;
    let log_path = persister.save_ocr_log(&lines)?;

    println!(
        "{} Read {} lines from {} pages in {:.1}s",
        style("✓").green(),
        total_lines,
        total_pages,
        start.elapsed().as_secs_f64()
    );

    if !failed_pages.is_empty() {
        let failed: Vec<String> = failed_pages.iter().map(ToString::to_string).collect();
        println!(
            "{} OCR failed on pages: {}",
            style("!").yellow(),
            failed.join(", ")
        );
    }

    println!(
        "{} {} records written to {}",
        style("✓").green(),
        style(records.len()).green(),
        records_path.display()
    );
    println!("{} OCR log written to {}", style("ℹ").blue(), log_path.display());

    Ok(())
}
