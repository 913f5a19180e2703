//! Batch ingestion of uploaded reports and the resulting billing sheet.

mod orchestrator;
mod sheet;

pub use orchestrator::{BatchReport, IngestEvent, IngestState, Ingestor};
pub use sheet::{BillingSheet, EntryUpdate};
