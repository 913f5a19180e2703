//! Parse command - extract fields from a single report.

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use clinica_core::{DocumentTextExtractor, ParsedDocument, SourceFile, SourceKind, TextSource};

use super::{load_config, print_warning};

/// Arguments for the parse command.
#[derive(Args)]
pub struct ParseArgs {
    /// Input file (PDF or image, or a text dump with --raw-text)
    #[arg(required = true)]
    input: PathBuf,

    /// Treat the input as already extracted UTF-8 text
    #[arg(long)]
    raw_text: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// OCR model directory
    #[arg(short, long)]
    model_dir: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// One labelled field per line
    Text,
}

pub async fn run(args: ParseArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = load_config(config_path)?;
    let parser = config.build_parser()?;

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    info!("Parsing file: {}", args.input.display());

    let text = if args.raw_text {
        fs::read_to_string(&args.input)?
    } else {
        extract_text(&args, &config)?
    };

    let parsed = parser.parse(&text);

    let output = match args.format {
        OutputFormat::Json => serde_json::to_string_pretty(&parsed)?,
        OutputFormat::Text => format_text(&parsed),
    };
    println!("{}", output);

    let missing = parsed.missing_fields();
    if !missing.is_empty() {
        print_warning(format!("Fields not found: {}", missing.join(", ")));
    }

    debug!("Total processing time: {:?}", start.elapsed());
    Ok(())
}

fn extract_text(args: &ParseArgs, config: &clinica_core::ClinicaConfig) -> anyhow::Result<String> {
    let file = SourceFile::from_path(&args.input)?;
    let kind = SourceKind::detect(&file)?;

    let pb = ProgressBar::new(100);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] {bar:40.cyan/blue} {pos}% {msg}")?
            .progress_chars("##-"),
    );
    pb.set_message(file.name.clone());

    let text = match kind {
        SourceKind::Pdf => {
            pb.set_position(10);
            let extractor = DocumentTextExtractor::from_config(config, None);
            extractor.extract_pdf(&file.bytes)?
        }
        SourceKind::Image => {
            let extractor = DocumentTextExtractor::from_config(config, args.model_dir.as_deref());
            extractor.extract_image(&file.bytes, &mut |p| pb.set_position(u64::from(p)))?
        }
    };

    pb.finish_and_clear();
    debug!("Extracted {} chars from {}", text.len(), file.name);
    Ok(text)
}

fn format_text(parsed: &ParsedDocument) -> String {
    let fields = [
        ("Paciente", &parsed.patient_name),
        ("Obra social", &parsed.insurance),
        ("Edad", &parsed.age),
        ("Cirujano", &parsed.surgeon),
        ("Práctica", &parsed.practice),
        ("Fecha", &parsed.date),
    ];

    let mut out: Vec<String> = fields
        .iter()
        .map(|(label, value)| {
            let value = if value.is_empty() {
                style("-").dim().to_string()
            } else {
                (*value).clone()
            };
            format!("{:<12} {}", format!("{}:", label), value)
        })
        .collect();

    if !parsed.operation_description.is_empty() {
        out.push(String::new());
        out.push(style("Descripción de la operación").bold().to_string());
        out.push(parsed.operation_description.clone());
    }

    out.join("\n")
}
