//! Data models: configuration, parsed documents and reference data.

pub mod config;
pub mod document;
pub mod reference;

pub use config::ClinicaConfig;
pub use document::{DocumentEntry, ManualEntry, ParsedDocument, MANUAL_FILE_NAME};
pub use reference::{Doctor, ObraSocial, Reference, ReferenceSnapshot, Study, Tarifa};
