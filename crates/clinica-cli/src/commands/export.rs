//! Export command - write the billing sheet as CSV.

use std::path::PathBuf;

use clap::Args;
use console::style;

use clinica_core::export::{default_file_name, export_to_path, format_amount};

use super::{load_config, print_warning, refresh_references, ReferenceArgs, SheetArgs};

/// Arguments for the export command.
#[derive(Args)]
pub struct ExportArgs {
    #[command(flatten)]
    sheet: SheetArgs,

    /// Output file (default: facturacion_<date>.csv)
    #[arg(short, long)]
    output: Option<PathBuf>,

    #[command(flatten)]
    references: ReferenceArgs,
}

pub async fn run(args: ExportArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let mut sheet = args.sheet.load()?;

    if sheet.entries().is_empty() {
        anyhow::bail!("The sheet {} has no entries to export", args.sheet.path().display());
    }

    refresh_references(&mut sheet, &args.references, &config).await?;

    let output = args
        .output
        .unwrap_or_else(|| PathBuf::from(default_file_name(chrono::Local::now().date_naive())));

    export_to_path(&sheet, &output)?;
    args.sheet.save(&sheet)?;

    println!(
        "{} Exported {} entries (total {}) to {}",
        style("✓").green(),
        sheet.entries().len(),
        format_amount(sheet.total()),
        output.display()
    );

    let unpriced = sheet.unpriced().count();
    if unpriced > 0 {
        print_warning(format!("{} entries have no tariff (SIN TARIFA)", unpriced));
    }

    Ok(())
}
