//! Cells command - segment one page into table cells and OCR each cell.

use std::path::PathBuf;
use std::time::Instant;

use clap::Args;
use console::style;
use tracing::info;

use ksiegi_core::{
    CellOcrBatcher, CellResult, CellSegmenter, PdfRasterizer, RasterSource, ResultPersister,
    TaskEvent, TaskRunner,
};

use super::config;
use super::driver::{self, Outcome};

/// Arguments for the cells command.
#[derive(Args)]
pub struct CellsArgs {
    /// Input document (PDF or image)
    #[arg(required = true)]
    input: PathBuf,

    /// Page to segment (1-based)
    #[arg(short, long, default_value_t = 1)]
    page: u32,

    /// Model directory
    #[arg(short, long)]
    model_dir: Option<PathBuf>,

    /// Output directory (default from config)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Rasterization resolution (default from config)
    #[arg(long)]
    dpi: Option<u32>,
}

pub async fn run(args: CellsArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    let mut config = config::load(config_path)?;
    if let Some(dir) = args.output_dir {
        config.output.dir = dir;
    }

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    let dpi = args.dpi.unwrap_or(config.pdf.table_dpi);
    let engine = driver::load_engine(&config, args.model_dir.as_deref())?;
    let persister = ResultPersister::new(config.output.clone());

    let pb = driver::spinner()?;
    pb.set_message(format!("Rendering page {}...", args.page));

    let raster = PdfRasterizer::with_max_pages(config.pdf.max_pages);
    let input = args.input.clone();
    let page_number = args.page;
    let page = tokio::task::spawn_blocking(move || raster.rasterize_page(&input, page_number, dpi))
        .await??;

    info!(
        "Page {} rendered at {}x{} px",
        args.page,
        page.width(),
        page.height()
    );

    let mut runner = TaskRunner::new();
    CellOcrBatcher::new(engine, &config).spawn_page(
        &mut runner,
        CellSegmenter::with_config(config.segmentation.clone()),
        page,
    )?;

    let mut accepted: Vec<CellResult> = Vec::new();
    let outcome = driver::poll(&mut runner, &pb, |event| {
        if let TaskEvent::CellResult(cell) = event {
            pb.println(format!(
                "  {} x={} y={}: {}",
                style("•").cyan(),
                cell.x(),
                cell.y(),
                cell.text()
            ));
            accepted.push(cell.clone());
        }
    })
    .await?;
    pb.finish_and_clear();

    let processed = match outcome {
        Outcome::Finished(TaskEvent::AllCellsComplete { processed }) => processed,
        Outcome::Finished(other) => {
            anyhow::bail!("Unexpected completion event: {}", other.kind())
        }
        Outcome::Cancelled => {
            println!("{} Cancelled, nothing was saved.", style("✗").yellow());
            return Ok(());
        }
    };

    let dump_path = persister.save_cells(&accepted)?;

    println!(
        "{} Processed {} cells on page {} in {:.1}s",
        style("✓").green(),
        processed,
        args.page,
        start.elapsed().as_secs_f64()
    );
    println!(
        "{} {} cells accepted, written to {}",
        style("✓").green(),
        style(accepted.len()).green(),
        dump_path.display()
    );

    Ok(())
}
