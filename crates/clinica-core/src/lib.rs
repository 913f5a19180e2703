//! Core library for surgical report ingestion.
//!
//! This crate provides:
//! - Text extraction from PDF text layers and OCR of scanned images
//! - Rule-based field extraction from surgical report text
//! - Matching of extracted names against doctors, studies and insurers
//! - Tariff lookup and the editable billing sheet with CSV export

pub mod error;
pub mod export;
pub mod ingest;
pub mod matching;
pub mod models;
pub mod ocr;
pub mod pdf;
pub mod pricing;
pub mod report;
pub mod source;

pub use error::{ClinicaError, ConfigError, IngestError, Result, SheetError};
pub use ingest::{BatchReport, BillingSheet, EntryUpdate, IngestEvent, IngestState, Ingestor};
pub use matching::{match_best, Prefix, ReferenceMatcher};
pub use models::{
    ClinicaConfig, DocumentEntry, ManualEntry, ParsedDocument, ReferenceSnapshot, MANUAL_FILE_NAME,
};
pub use ocr::{OcrEngine, OcrResult, TextBox};
pub use pdf::{PdfContent, PdfProcessor};
pub use report::{PatternTable, ReportParser};
pub use source::{DocumentTextExtractor, SourceFile, SourceInput, SourceKind, TextSource};
