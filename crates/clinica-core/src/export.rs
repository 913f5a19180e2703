//! CSV export of the billing sheet.

use std::io::Write;
use std::path::Path;

use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};
use tracing::info;

use crate::error::ClinicaError;
use crate::ingest::BillingSheet;
use crate::models::document::DocumentEntry;
use crate::models::reference::ReferenceSnapshot;

/// Column headers, in order.
pub const COLUMNS: [&str; 9] = [
    "FECHA",
    "MEDICO/A",
    "PACIENTE",
    "EDAD",
    "OBRA SOCIAL",
    "NRO AFILIADO",
    "ESTUDIO REALIZADO",
    "ARANCEL",
    "OBSERVACION",
];

/// Flag written next to entries without a configured tariff.
pub const NO_TARIFF: &str = "SIN TARIFA";

const UNASSIGNED_STUDY: &str = "(sin asignar)";

/// One rendered row of the export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportRow {
    pub fecha: String,
    pub medico: String,
    pub paciente: String,
    pub edad: String,
    pub obra_social: String,
    pub nro_afiliado: String,
    pub estudio: String,
    pub arancel: Decimal,
    pub sin_tarifa: bool,
}

impl ExportRow {
    /// Render an entry, preferring reference names over extracted text.
    pub fn from_entry(entry: &DocumentEntry, references: &ReferenceSnapshot) -> Self {
        let parsed = &entry.parsed;
        let estudio = references
            .study_name(&entry.study_id)
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .or_else(|| non_empty(&parsed.practice))
            .unwrap_or_else(|| UNASSIGNED_STUDY.to_string());

        Self {
            fecha: parsed.date.clone(),
            medico: name_or(references.doctor_name(&entry.doctor_id), &parsed.surgeon),
            paciente: parsed.patient_name.clone(),
            edad: parsed.age.clone(),
            obra_social: name_or(
                references.obra_social_name(&entry.obra_social_id),
                &parsed.insurance,
            ),
            nro_afiliado: entry.carnet.clone(),
            estudio,
            arancel: entry.precio.unwrap_or(Decimal::ZERO),
            sin_tarifa: entry.precio.is_none(),
        }
    }

    fn record(&self) -> [String; 9] {
        [
            self.fecha.clone(),
            self.medico.clone(),
            self.paciente.clone(),
            self.edad.clone(),
            self.obra_social.clone(),
            self.nro_afiliado.clone(),
            self.estudio.clone(),
            format_amount(self.arancel),
            if self.sin_tarifa { NO_TARIFF.to_string() } else { String::new() },
        ]
    }
}

fn non_empty(text: &str) -> Option<String> {
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

fn name_or(name: Option<&str>, fallback: &str) -> String {
    name.filter(|n| !n.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| fallback.to_string())
}

/// Two decimals (half away from zero), no thousands separator.
pub fn format_amount(amount: Decimal) -> String {
    format!(
        "{:.2}",
        amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
    )
}

/// `facturacion_<YYYY-MM-DD>.csv`
pub fn default_file_name(date: NaiveDate) -> String {
    format!("facturacion_{}.csv", date.format("%Y-%m-%d"))
}

/// Write the sheet as CSV: header, one row per entry, then the total row.
pub fn write_csv<W: Write>(sheet: &BillingSheet, writer: W) -> Result<(), ClinicaError> {
    let mut wtr = csv::Writer::from_writer(writer);

    wtr.write_record(COLUMNS)?;

    for entry in sheet.entries() {
        let row = ExportRow::from_entry(entry, sheet.references());
        wtr.write_record(row.record())?;
    }

    let mut total_row: [String; 9] = Default::default();
    total_row[6] = "TOTAL".to_string();
    total_row[7] = format_amount(sheet.total());
    wtr.write_record(&total_row)?;

    wtr.flush()?;
    Ok(())
}

/// Write the CSV export to a file.
pub fn export_to_path(sheet: &BillingSheet, path: &Path) -> Result<(), ClinicaError> {
    let file = std::fs::File::create(path)?;
    write_csv(sheet, file)?;
    info!(
        "Exported {} entries (total {}) to {}",
        sheet.entries().len(),
        format_amount(sheet.total()),
        path.display()
    );
    Ok(())
}
