//! Error types for the clinica-core library.

use thiserror::Error;

/// Main error type for the clinica library.
#[derive(Error, Debug)]
pub enum ClinicaError {
    /// PDF processing error.
    #[error("PDF error: {0}")]
    Pdf(#[from] PdfError),

    /// OCR processing error.
    #[error("OCR error: {0}")]
    Ocr(#[from] OcrError),

    /// Per-file ingestion error.
    #[error(transparent)]
    Ingest(#[from] IngestError),

    /// Billing sheet edit error.
    #[error("sheet error: {0}")]
    Sheet(#[from] SheetError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// CSV export error.
    #[error("export error: {0}")]
    Export(#[from] csv::Error),

    /// Sheet or reference file is not valid JSON for its schema.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors related to PDF processing.
#[derive(Error, Debug)]
pub enum PdfError {
    /// The binary is not a readable PDF.
    #[error("failed to parse PDF: {0}")]
    Parse(String),

    /// The text layer could not be read.
    #[error("failed to extract text: {0}")]
    TextExtraction(String),

    /// The PDF is encrypted with a non-empty password.
    #[error("PDF is encrypted")]
    Encrypted,

    /// The PDF has no pages.
    #[error("PDF has no pages")]
    NoPages,
}

/// Errors related to OCR processing.
#[derive(Error, Debug)]
pub enum OcrError {
    /// Failed to load OCR models.
    #[error("failed to load model: {0}")]
    ModelLoad(String),

    /// No OCR engine is installed.
    #[error("OCR engine unavailable: {0}")]
    Unavailable(String),

    /// Text recognition failed.
    #[error("text recognition failed: {0}")]
    Recognition(String),

    /// Image could not be decoded.
    #[error("invalid image: {0}")]
    InvalidImage(String),
}

/// Per-file failure recorded by the ingestion orchestrator.
///
/// Both variants abort only the file they describe; the rest of the batch
/// keeps running. The `detail` payload is the underlying diagnostic and is
/// meant for display and logs, not for matching on.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IngestError {
    /// The file is neither a PDF nor a raster image.
    #[error("unsupported file type for \"{file_name}\": {declared_type}")]
    UnsupportedFileType {
        file_name: String,
        declared_type: String,
    },

    /// The document could not be read (corrupt/encrypted PDF, bad image, OCR failure).
    #[error("failed to process \"{file_name}\": {detail}")]
    ExtractionFailure { file_name: String, detail: String },
}

impl IngestError {
    /// Wrap an extraction-stage error for the given file.
    pub fn extraction(file_name: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self::ExtractionFailure {
            file_name: file_name.into(),
            detail: err.to_string(),
        }
    }

    /// Name of the file this error refers to.
    pub fn file_name(&self) -> &str {
        match self {
            Self::UnsupportedFileType { file_name, .. } => file_name,
            Self::ExtractionFailure { file_name, .. } => file_name,
        }
    }
}

/// Errors raised when editing the billing sheet.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SheetError {
    /// No entry with the given id.
    #[error("entry not found: {0}")]
    EntryNotFound(String),

    /// Manual entries need at least a patient name.
    #[error("patient name is required")]
    MissingPatientName,
}

/// Errors related to configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The config file could not be read or written.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The config file is not valid JSON for this schema.
    #[error("invalid configuration: {0}")]
    Parse(#[from] serde_json::Error),

    /// A backend is needed but no base URL was configured.
    #[error("backend base URL is not configured")]
    MissingBackendUrl,

    /// The configured base URL does not parse.
    #[error("invalid backend URL {url}: {reason}")]
    InvalidBackendUrl { url: String, reason: String },

    /// A pattern in the parser table does not compile.
    #[error("invalid pattern for {field}: {pattern}: {reason}")]
    InvalidPattern {
        field: String,
        pattern: String,
        reason: String,
    },
}

/// Result type for the clinica library.
pub type Result<T> = std::result::Result<T, ClinicaError>;
