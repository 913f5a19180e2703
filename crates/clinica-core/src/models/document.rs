//! Parsed surgical reports and billing entries.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// File name recorded for entries typed in by hand.
pub const MANUAL_FILE_NAME: &str = "(manual)";

/// Fields recovered from the text of a surgical report.
///
/// Every field is a plain string and an empty string means the field was not
/// found. Produced once by the report parser and never modified afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedDocument {
    pub patient_name: String,
    pub insurance: String,
    pub age: String,
    pub surgeon: String,
    pub practice: String,
    pub date: String,
    pub operation_description: String,
    pub raw_text: String,
}

impl ParsedDocument {
    /// Names of the semantic fields that came out empty.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("patientName", &self.patient_name),
            ("insurance", &self.insurance),
            ("age", &self.age),
            ("surgeon", &self.surgeon),
            ("practice", &self.practice),
            ("date", &self.date),
            ("operationDescription", &self.operation_description),
        ]
        .into_iter()
        .filter(|(_, value)| value.is_empty())
        .map(|(name, _)| name)
        .collect()
    }
}

/// One row of the billing sheet.
///
/// The three reference ids are empty until resolved (automatically or by the
/// user). `precio` is kept in sync with the ids by
/// [`BillingSheet`](crate::ingest::BillingSheet).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentEntry {
    pub id: String,
    pub file_name: String,
    #[serde(flatten)]
    pub parsed: ParsedDocument,
    /// Insurer membership number.
    #[serde(default)]
    pub carnet: String,
    pub doctor_id: String,
    pub study_id: String,
    pub obra_social_id: String,
    pub precio: Option<Decimal>,
}

impl DocumentEntry {
    /// Create an unresolved entry for a parsed file.
    pub fn new(file_name: impl Into<String>, parsed: ParsedDocument) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            file_name: file_name.into(),
            parsed,
            carnet: String::new(),
            doctor_id: String::new(),
            study_id: String::new(),
            obra_social_id: String::new(),
            precio: None,
        }
    }

    /// Whether the entry was typed in rather than extracted from a file.
    pub fn is_manual(&self) -> bool {
        self.file_name == MANUAL_FILE_NAME
    }
}

/// Data for an entry created without a source document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ManualEntry {
    pub patient_name: String,
    pub obra_social_id: String,
    pub carnet: String,
    pub age: String,
    pub doctor_id: String,
    pub study_id: String,
    pub date: String,
}
