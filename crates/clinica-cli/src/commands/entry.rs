//! Entry command - edit the billing sheet by hand.

use clap::{Args, Subcommand};
use console::style;

use clinica_core::export::{format_amount, ExportRow};
use clinica_core::{BillingSheet, DocumentEntry, EntryUpdate, ManualEntry};

use super::{load_config, refresh_references, ReferenceArgs, SheetArgs};

/// Arguments for the entry command.
#[derive(Args)]
pub struct EntryArgs {
    #[command(flatten)]
    sheet: SheetArgs,

    #[command(subcommand)]
    command: EntryCommand,
}

#[derive(Subcommand)]
enum EntryCommand {
    /// Change fields of an entry; an empty value clears an id
    Set(SetArgs),

    /// Add an entry without a source document
    Manual(ManualArgs),

    /// Remove an entry
    Remove {
        /// Entry id
        id: String,
    },

    /// Remove all entries
    Clear,

    /// List entries
    List {
        /// Print the sheet as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args)]
struct SetArgs {
    /// Entry id
    id: String,

    /// Doctor id
    #[arg(long)]
    doctor: Option<String>,

    /// Study id
    #[arg(long)]
    study: Option<String>,

    /// Obra social id
    #[arg(long)]
    insurer: Option<String>,

    /// Patient name
    #[arg(long)]
    patient: Option<String>,

    /// Patient age
    #[arg(long)]
    age: Option<String>,

    /// Date of the procedure
    #[arg(long)]
    date: Option<String>,

    /// Insurer membership number
    #[arg(long)]
    carnet: Option<String>,

    #[command(flatten)]
    references: ReferenceArgs,
}

#[derive(Args)]
struct ManualArgs {
    /// Patient name
    #[arg(long, required = true)]
    patient: String,

    /// Doctor id
    #[arg(long, default_value = "")]
    doctor: String,

    /// Study id
    #[arg(long, default_value = "")]
    study: String,

    /// Obra social id
    #[arg(long, default_value = "")]
    insurer: String,

    /// Patient age
    #[arg(long, default_value = "")]
    age: String,

    /// Date of the procedure
    #[arg(long, default_value = "")]
    date: String,

    /// Insurer membership number
    #[arg(long, default_value = "")]
    carnet: String,

    #[command(flatten)]
    references: ReferenceArgs,
}

pub async fn run(args: EntryArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let mut sheet = args.sheet.load()?;

    match args.command {
        EntryCommand::Set(set) => {
            let config = load_config(config_path)?;
            refresh_references(&mut sheet, &set.references, &config).await?;

            let update = EntryUpdate {
                doctor_id: set.doctor,
                study_id: set.study,
                obra_social_id: set.insurer,
                patient_name: set.patient,
                age: set.age,
                date: set.date,
                carnet: set.carnet,
            };
            sheet.update(&set.id, update)?;
            let entry = sheet_entry(&sheet, &set.id)?;
            println!("{} Updated {}", style("✓").green(), describe(entry, &sheet));
            args.sheet.save(&sheet)?;
        }
        EntryCommand::Manual(manual) => {
            let config = load_config(config_path)?;
            refresh_references(&mut sheet, &manual.references, &config).await?;

            let entry = sheet.add_manual(ManualEntry {
                patient_name: manual.patient,
                obra_social_id: manual.insurer,
                carnet: manual.carnet,
                age: manual.age,
                doctor_id: manual.doctor,
                study_id: manual.study,
                date: manual.date,
            })?;
            let id = entry.id.clone();
            println!("{} Added {}", style("✓").green(), describe(sheet_entry(&sheet, &id)?, &sheet));
            println!("{}", id);
            args.sheet.save(&sheet)?;
        }
        EntryCommand::Remove { id } => {
            let entry = sheet.remove(&id)?;
            println!(
                "{} Removed {} ({})",
                style("✓").green(),
                entry.id,
                entry.parsed.patient_name
            );
            args.sheet.save(&sheet)?;
        }
        EntryCommand::Clear => {
            let count = sheet.entries().len();
            sheet.clear();
            println!("{} Removed {} entries", style("✓").green(), count);
            args.sheet.save(&sheet)?;
        }
        EntryCommand::List { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(&sheet)?);
            } else {
                list(&sheet);
            }
        }
    }

    Ok(())
}

fn sheet_entry<'a>(sheet: &'a BillingSheet, id: &str) -> anyhow::Result<&'a DocumentEntry> {
    sheet
        .get(id)
        .ok_or_else(|| anyhow::anyhow!("entry not found: {}", id))
}

fn describe(entry: &DocumentEntry, sheet: &BillingSheet) -> String {
    let row = ExportRow::from_entry(entry, sheet.references());
    let price = if row.sin_tarifa {
        style("SIN TARIFA").yellow().to_string()
    } else {
        format_amount(row.arancel)
    };
    format!(
        "{} | {} | {} | {} | {} | {}",
        entry.id, row.paciente, row.medico, row.obra_social, row.estudio, price
    )
}

fn list(sheet: &BillingSheet) {
    if sheet.entries().is_empty() {
        println!("{} The sheet is empty.", style("ℹ").blue());
        return;
    }

    for entry in sheet.entries() {
        println!("{}  {}", describe(entry, sheet), style(&entry.file_name).dim());
    }

    println!();
    println!(
        "{} entries, total {}",
        sheet.entries().len(),
        style(format_amount(sheet.total())).green().bold()
    );

    let unpriced = sheet.unpriced().count();
    if unpriced > 0 {
        println!("{} {} without tariff", style("!").yellow(), unpriced);
    }
}
