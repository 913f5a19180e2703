//! The editable list of billing entries.
//!
//! Every edit that touches `study_id` or `obra_social_id` recomputes `precio`
//! from the current tarifa table, so a stale price is never kept.

use std::path::Path;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{ClinicaError, SheetError};
use crate::models::document::{DocumentEntry, ManualEntry, ParsedDocument, MANUAL_FILE_NAME};
use crate::models::reference::ReferenceSnapshot;
use crate::pricing;

/// Changes to apply to one entry. `None` leaves a field untouched and an
/// empty string clears it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryUpdate {
    pub doctor_id: Option<String>,
    pub study_id: Option<String>,
    pub obra_social_id: Option<String>,
    pub patient_name: Option<String>,
    pub age: Option<String>,
    pub date: Option<String>,
    pub carnet: Option<String>,
}

/// Billing entries together with the reference data they were resolved against.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BillingSheet {
    entries: Vec<DocumentEntry>,
    references: ReferenceSnapshot,
}

impl BillingSheet {
    pub fn new(references: ReferenceSnapshot) -> Self {
        Self {
            entries: Vec::new(),
            references,
        }
    }

    /// Load a sheet from a JSON file. A missing file is an empty sheet.
    pub fn load(path: &Path) -> Result<Self, ClinicaError> {
        if !path.exists() {
            debug!("No sheet at {}, starting empty", path.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Write the sheet as pretty JSON.
    pub fn save(&self, path: &Path) -> Result<(), ClinicaError> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn entries(&self) -> &[DocumentEntry] {
        &self.entries
    }

    pub fn references(&self) -> &ReferenceSnapshot {
        &self.references
    }

    pub fn get(&self, id: &str) -> Option<&DocumentEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// Append entries produced by a batch.
    pub fn extend(&mut self, entries: impl IntoIterator<Item = DocumentEntry>) {
        let before = self.entries.len();
        self.entries.extend(entries);
        debug!("Appended {} entries", self.entries.len() - before);
    }

    /// Replace the reference data and reprice every entry against it.
    pub fn refresh_references(&mut self, references: ReferenceSnapshot) {
        self.references = references;
        for entry in &mut self.entries {
            entry.precio =
                pricing::resolve(&entry.study_id, &entry.obra_social_id, &self.references.tarifas);
        }
        info!("Repriced {} entries against new reference data", self.entries.len());
    }

    /// Apply `update` to the entry with the given id.
    pub fn update(&mut self, id: &str, update: EntryUpdate) -> Result<&DocumentEntry, SheetError> {
        let tarifas = &self.references.tarifas;
        let entry = self
            .entries
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| SheetError::EntryNotFound(id.to_string()))?;

        let reprice = update.study_id.is_some() || update.obra_social_id.is_some();

        if let Some(v) = update.doctor_id {
            entry.doctor_id = v;
        }
        if let Some(v) = update.study_id {
            entry.study_id = v;
        }
        if let Some(v) = update.obra_social_id {
            entry.obra_social_id = v;
        }
        if let Some(v) = update.patient_name {
            entry.parsed.patient_name = v;
        }
        if let Some(v) = update.age {
            entry.parsed.age = v;
        }
        if let Some(v) = update.date {
            entry.parsed.date = v;
        }
        if let Some(v) = update.carnet {
            entry.carnet = v;
        }

        if reprice {
            entry.precio = pricing::resolve(&entry.study_id, &entry.obra_social_id, tarifas);
            debug!("Entry {} repriced to {:?}", entry.id, entry.precio);
        }

        Ok(entry)
    }

    /// Add an entry typed in by hand. Extraction and matching are skipped.
    pub fn add_manual(&mut self, manual: ManualEntry) -> Result<&DocumentEntry, SheetError> {
        let patient_name = manual.patient_name.trim();
        if patient_name.is_empty() {
            return Err(SheetError::MissingPatientName);
        }

        let surgeon = self
            .references
            .doctor_name(&manual.doctor_id)
            .unwrap_or_default()
            .to_string();

        let parsed = ParsedDocument {
            patient_name: patient_name.to_string(),
            age: manual.age.trim().to_string(),
            surgeon,
            date: manual.date,
            ..Default::default()
        };

        let mut entry = DocumentEntry::new(MANUAL_FILE_NAME, parsed);
        entry.carnet = manual.carnet.trim().to_string();
        entry.precio = pricing::resolve(
            &manual.study_id,
            &manual.obra_social_id,
            &self.references.tarifas,
        );
        entry.doctor_id = manual.doctor_id;
        entry.study_id = manual.study_id;
        entry.obra_social_id = manual.obra_social_id;

        info!("Added manual entry {} for {}", entry.id, entry.parsed.patient_name);
        self.entries.push(entry);
        Ok(&self.entries[self.entries.len() - 1])
    }

    /// Remove one entry.
    pub fn remove(&mut self, id: &str) -> Result<DocumentEntry, SheetError> {
        let pos = self
            .entries
            .iter()
            .position(|e| e.id == id)
            .ok_or_else(|| SheetError::EntryNotFound(id.to_string()))?;
        Ok(self.entries.remove(pos))
    }

    /// Remove every entry. Reference data is kept.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Sum of the resolved prices. Entries without a tariff count as zero.
    pub fn total(&self) -> Decimal {
        self.entries.iter().filter_map(|e| e.precio).sum()
    }

    /// Entries whose price could not be resolved.
    pub fn unpriced(&self) -> impl Iterator<Item = &DocumentEntry> {
        self.entries.iter().filter(|e| e.precio.is_none())
    }
}
