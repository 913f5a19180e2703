//! Default field patterns for surgical reports ("partes quirúrgicos").
//!
//! Patterns are plain data so they can be tuned from the config file. They
//! are compiled case-insensitively and capture group 1 is the field value.
//! Order matters: later patterns are fallbacks for OCR damage such as the
//! letter O read as the digit 0 or accents being dropped.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::parser::ReportParser;

/// Letters accepted in person names.
const NAME_CHARS: &str = r"[A-ZÁÉÍÓÚÑa-záéíóúñ\s,.]";

/// Letters accepted in insurer names (plans often carry dashes and slashes).
const INSURER_CHARS: &str = r"[A-ZÁÉÍÓÚÑa-záéíóúñ\s,.\-/]";

/// Where an insurer name stops: next label, membership number ("Carnet",
/// often read as "Camet"/"Caret"), a long digit run, or end of line.
const INSURER_END: &str = r"(?:\n|Edad|C[ao]r?[nm]et|Fecha|\d{5,}|$)";

/// Patterns for each field of a [`ParsedDocument`](crate::ParsedDocument).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternTable {
    pub patient_name: Vec<String>,
    pub insurance: Vec<String>,
    pub age: Vec<String>,
    pub surgeon: Vec<String>,
    pub practice: Vec<String>,
    pub date: Vec<String>,
    pub operation: NarrativeRule,
}

/// Bounds of the free-text operation narrative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NarrativeRule {
    /// Section header; the narrative starts on the following line.
    pub header: String,

    /// Patterns that end the narrative (license number, signature line).
    pub terminators: Vec<String>,

    /// Signer names that end the narrative, matched literally.
    pub signers: Vec<String>,
}

impl Default for PatternTable {
    fn default() -> Self {
        Self {
            patient_name: vec![
                format!(
                    r"Apellido\s*y\s*Nombre/?s?\s*[:\s]+({NAME_CHARS}+?)(?:\n|[O0]\s*\.?\s*Social|Edad|$)"
                ),
                format!(r"Nombre/?s?\s*[:\s]+({NAME_CHARS}+?)(?:\n|[O0]\s*\.?\s*Social|$)"),
            ],
            insurance: vec![
                format!(r"[O0]\s*\.?\s*Social\s*[:\s]+({INSURER_CHARS}+?){INSURER_END}"),
                format!(r"Obra\s*Social\s*[:\s]+({INSURER_CHARS}+?){INSURER_END}"),
                format!(r"[O0]\s*\.?\s*Soc\w*\s*[:\s]+(.+?){INSURER_END}"),
            ],
            age: vec![
                r"Edad\s*[:\s]+(\d{1,3})".to_string(),
                r"Edad\s+(\d{1,3})".to_string(),
            ],
            surgeon: vec![
                format!(r"Cirujano\s*[:\s]+({NAME_CHARS}+?)(?:\n|1\s*[°º]|Anestes|Ayudante|$)"),
                format!(r"Cirujano\s+({NAME_CHARS}+?)(?:\n|1|Anestes|$)"),
            ],
            practice: vec![
                r"PRACTICA\s*[:\s]+(.+?)(?:\n\n|\n[A-Z]{3}|$)".to_string(),
                r"Pr[aá]ctica\s*[:\s]+(.+?)(?:\n\n|\n[A-Z]{3}|$)".to_string(),
            ],
            date: vec![
                r"Fecha\s*[:\s]*(\d{1,2}\s*/\s*\d{1,2}\s*/\s*\d{2,4})".to_string(),
                r"Fecha\s*[:\s]*(\d{4}-\d{2}-\d{2})".to_string(),
                r"(\d{1,2}/\d{1,2}/\d{4})".to_string(),
            ],
            operation: NarrativeRule::default(),
        }
    }
}

impl Default for NarrativeRule {
    fn default() -> Self {
        Self {
            header: r"DESCRIPCI[OÓ]N\s+DE\s+LA\s+OPERACI[OÓ]N\s*\n".to_string(),
            terminators: vec![r"M\.?\s*N\.?\s*[:\s]*\d".to_string(), "firma".to_string()],
            signers: vec!["ALVARRACIN".to_string()],
        }
    }
}

lazy_static! {
    /// Runs of three or more newlines.
    pub static ref EXCESS_BLANK_LINES: Regex = Regex::new(r"\n{3,}").unwrap();

    /// Parser compiled from the built-in [`PatternTable`].
    pub static ref DEFAULT_PARSER: ReportParser =
        ReportParser::from_table(&PatternTable::default()).unwrap();
}
