//! Ingest command - run a batch of reports into the billing sheet.

use std::path::PathBuf;
use std::time::Instant;

use clap::Args;
use console::style;
use glob::glob;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use tokio::sync::mpsc;
use tracing::{debug, info};

use clinica_core::export::export_to_path;
use clinica_core::{BatchReport, DocumentTextExtractor, IngestEvent, Ingestor, ReferenceMatcher};

use super::{load_config, print_warning, ReferenceArgs, SheetArgs};

/// Arguments for the ingest command.
#[derive(Args)]
pub struct IngestArgs {
    /// Input files or glob patterns, processed in the given order
    #[arg(required = true)]
    inputs: Vec<String>,

    #[command(flatten)]
    sheet: SheetArgs,

    #[command(flatten)]
    references: ReferenceArgs,

    /// OCR model directory
    #[arg(short, long)]
    model_dir: Option<PathBuf>,

    /// Also write the CSV export to this path
    #[arg(long)]
    export: Option<PathBuf>,
}

pub async fn run(args: IngestArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = load_config(config_path)?;
    let parser = config.build_parser()?;
    let matcher = ReferenceMatcher::new(&config.matching);

    let paths = expand_inputs(&args.inputs)?;
    if paths.is_empty() {
        anyhow::bail!("No matching files found for: {}", args.inputs.join(" "));
    }

    let mut sheet = args.sheet.load()?;
    match args.references.load(&config).await? {
        Some(snapshot) => sheet.refresh_references(snapshot),
        None if sheet.references().doctors.is_empty() && sheet.references().tarifas.is_empty() => {
            print_warning("No reference data; entries will need manual selection");
        }
        None => info!("Using reference data stored in the sheet"),
    }

    println!(
        "{} Found {} files to process",
        style("ℹ").blue(),
        paths.len()
    );

    let (tx, rx) = mpsc::unbounded_channel();
    let references = sheet.references().clone();
    let model_dir = args.model_dir.clone();

    let worker = tokio::task::spawn_blocking(move || {
        // OCR models load here so the engine never leaves the worker thread.
        let extractor = DocumentTextExtractor::from_config(&config, model_dir.as_deref());
        let mut ingestor = Ingestor::new(extractor, parser, matcher);
        ingestor.run(paths, &references, &mut |event| {
            let _ = tx.send(event);
        })
    });

    show_progress(rx).await?;
    let report = worker.await?;

    sheet.extend(report.entries.iter().cloned());
    args.sheet.save(&sheet)?;

    print_summary(&report, start);
    println!(
        "{} Sheet {} now has {} entries",
        style("✓").green(),
        args.sheet.path().display(),
        sheet.entries().len()
    );

    if let Some(path) = &args.export {
        export_to_path(&sheet, path)?;
        println!("{} Export written to {}", style("✓").green(), path.display());
    }

    Ok(())
}

/// Expand globs; plain paths are kept as given so missing files are reported
/// as failed files of the batch.
fn expand_inputs(inputs: &[String]) -> anyhow::Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for input in inputs {
        if input.contains(['*', '?', '[']) {
            let mut matched: Vec<PathBuf> = glob(input)?.filter_map(|r| r.ok()).collect();
            matched.sort();
            debug!("{} matched {} files", input, matched.len());
            paths.extend(matched);
        } else {
            paths.push(PathBuf::from(input));
        }
    }
    Ok(paths)
}

async fn show_progress(mut rx: mpsc::UnboundedReceiver<IngestEvent>) -> anyhow::Result<()> {
    let multi_progress = MultiProgress::new();
    let overall_pb = multi_progress.add(ProgressBar::new(0));
    overall_pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files")?
            .progress_chars("=>-"),
    );
    let file_pb = multi_progress.add(ProgressBar::new(100));
    file_pb.set_style(
        ProgressStyle::default_bar()
            .template("  {bar:40.green/white} {pos:>3}% {msg}")?
            .progress_chars("##-"),
    );

    while let Some(event) = rx.recv().await {
        match event {
            IngestEvent::BatchStarted { total } => overall_pb.set_length(total as u64),
            IngestEvent::FileStarted {
                index,
                total,
                file_name,
            } => {
                file_pb.set_position(0);
                file_pb.set_message(format!("[{}/{}] {}", index, total, file_name));
            }
            IngestEvent::Progress { percent, .. } => file_pb.set_position(u64::from(percent)),
            IngestEvent::FileCompleted { .. } => overall_pb.inc(1),
            IngestEvent::FileFailed {
                file_name, error, ..
            } => {
                overall_pb.inc(1);
                multi_progress.println(format!("{} {}: {}", style("✗").red(), file_name, error))?;
            }
            IngestEvent::BatchFinished { .. } => {
                file_pb.finish_and_clear();
                overall_pb.finish_with_message("Complete");
            }
        }
    }

    Ok(())
}

fn print_summary(report: &BatchReport, start: Instant) {
    println!();
    println!(
        "{} Processed {} files in {:?}",
        style("✓").green(),
        report.entries.len() + report.errors.len(),
        start.elapsed()
    );
    println!(
        "   {} successful, {} failed",
        style(report.entries.len()).green(),
        style(report.errors.len()).red()
    );

    for entry in &report.entries {
        let price = entry
            .precio
            .map(|p| p.to_string())
            .unwrap_or_else(|| style("sin tarifa").yellow().to_string());
        println!(
            "  + {} {} ({})",
            entry.file_name,
            entry.parsed.patient_name,
            price
        );
    }

    if !report.errors.is_empty() {
        println!();
        println!("{}", style("Failed files:").red());
        for error in &report.errors {
            println!("  - {}", error);
        }
    }
}
