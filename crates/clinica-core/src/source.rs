//! Uploaded files and their conversion to raw text.

use std::path::{Path, PathBuf};

use image::DynamicImage;
use tracing::{debug, warn};

use crate::error::{ClinicaError, IngestError, OcrError};
use crate::models::config::{ClinicaConfig, PdfConfig};
use crate::ocr::OcrEngine;
use crate::pdf::{PdfExtractor, PdfProcessor};

const PDF_MIME: &str = "application/pdf";

/// An uploaded file: name, declared MIME type and content.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub name: String,
    pub declared_type: String,
    pub bytes: Vec<u8>,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, declared_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            declared_type: declared_type.into(),
            bytes,
        }
    }

    /// Read a file from disk, guessing its type from the extension.
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        let declared_type = mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        let name = display_name(path);

        debug!("Read {} ({}, {} bytes)", name, declared_type, bytes.len());
        Ok(Self::new(name, declared_type, bytes))
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// One item of a batch: content already in memory, or a path that is read
/// only when its turn comes.
#[derive(Debug, Clone)]
pub enum SourceInput {
    File(SourceFile),
    Path(PathBuf),
}

impl SourceInput {
    /// Name used in events and errors.
    pub fn name(&self) -> String {
        match self {
            SourceInput::File(file) => file.name.clone(),
            SourceInput::Path(path) => display_name(path),
        }
    }

    /// Read the content. An unreadable path fails only this file.
    pub fn load(self) -> Result<SourceFile, IngestError> {
        match self {
            SourceInput::File(file) => Ok(file),
            SourceInput::Path(path) => SourceFile::from_path(&path)
                .map_err(|e| IngestError::extraction(display_name(&path), e)),
        }
    }
}

impl From<SourceFile> for SourceInput {
    fn from(file: SourceFile) -> Self {
        SourceInput::File(file)
    }
}

impl From<PathBuf> for SourceInput {
    fn from(path: PathBuf) -> Self {
        SourceInput::Path(path)
    }
}

/// How a file is turned into text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// Embedded text layer.
    Pdf,
    /// OCR.
    Image,
}

impl SourceKind {
    /// Decide from the declared type, falling back to the `.pdf` extension.
    pub fn detect(file: &SourceFile) -> Result<Self, IngestError> {
        let declared = file.declared_type.trim().to_ascii_lowercase();

        if declared == PDF_MIME || file.name.to_ascii_lowercase().ends_with(".pdf") {
            Ok(SourceKind::Pdf)
        } else if declared.starts_with("image/") {
            Ok(SourceKind::Image)
        } else {
            Err(IngestError::UnsupportedFileType {
                file_name: file.name.clone(),
                declared_type: file.declared_type.clone(),
            })
        }
    }
}

/// Converts file content into raw text.
pub trait TextSource {
    /// Text layer of a PDF, one line per page.
    fn extract_pdf(&self, bytes: &[u8]) -> Result<String, ClinicaError>;

    /// OCR text of a raster image. `on_progress` receives non-decreasing
    /// percentages and ends with 100 on success.
    fn extract_image(
        &self,
        bytes: &[u8],
        on_progress: &mut dyn FnMut(u8),
    ) -> Result<String, ClinicaError>;
}

/// The production [`TextSource`]: lopdf/pdf-extract for PDFs and an optional OCR engine.
pub struct DocumentTextExtractor {
    pdf: PdfConfig,
    ocr: Result<Box<dyn OcrEngine>, String>,
}

impl DocumentTextExtractor {
    /// Extractor without OCR; images fail with the given reason.
    pub fn without_ocr(pdf: PdfConfig, reason: impl Into<String>) -> Self {
        Self {
            pdf,
            ocr: Err(reason.into()),
        }
    }

    /// Extractor with an OCR engine.
    pub fn with_ocr(pdf: PdfConfig, engine: Box<dyn OcrEngine>) -> Self {
        Self { pdf, ocr: Ok(engine) }
    }

    /// Build from configuration, loading OCR models from `model_dir` when
    /// given, else from `ocr.model_dir`. Missing models are not an error here;
    /// only image files fail later.
    pub fn from_config(config: &ClinicaConfig, model_dir: Option<&Path>) -> Self {
        let ocr = match model_dir.or(config.ocr.model_dir.as_deref()) {
            Some(dir) => load_ocr(dir, config),
            None => Err("no model directory configured".to_string()),
        };

        if let Err(reason) = &ocr {
            warn!("OCR disabled: {}", reason);
        }

        Self {
            pdf: config.pdf.clone(),
            ocr,
        }
    }

    /// Whether image files can be processed.
    pub fn has_ocr(&self) -> bool {
        self.ocr.is_ok()
    }
}

#[cfg(feature = "native")]
fn load_ocr(dir: &Path, config: &ClinicaConfig) -> Result<Box<dyn OcrEngine>, String> {
    crate::ocr::PureOcrEngine::from_dir(dir, &config.ocr)
        .map(|engine| Box::new(engine) as Box<dyn OcrEngine>)
        .map_err(|e| e.to_string())
}

#[cfg(not(feature = "native"))]
fn load_ocr(_dir: &Path, _config: &ClinicaConfig) -> Result<Box<dyn OcrEngine>, String> {
    Err("built without OCR support".to_string())
}

impl TextSource for DocumentTextExtractor {
    fn extract_pdf(&self, bytes: &[u8]) -> Result<String, ClinicaError> {
        let mut extractor = PdfExtractor::new(self.pdf.clone());
        extractor.load(bytes)?;
        debug!("Reading text layer of {} page(s)", extractor.page_count());
        Ok(extractor.extract_text()?)
    }

    fn extract_image(
        &self,
        bytes: &[u8],
        on_progress: &mut dyn FnMut(u8),
    ) -> Result<String, ClinicaError> {
        let engine = self
            .ocr
            .as_ref()
            .map_err(|reason| OcrError::Unavailable(reason.clone()))?;

        on_progress(0);
        let image: DynamicImage = image::load_from_memory(bytes)
            .map_err(|e| OcrError::InvalidImage(e.to_string()))?;
        on_progress(20);

        let result = engine.recognize(&image)?;
        on_progress(100);

        Ok(result.text)
    }
}
