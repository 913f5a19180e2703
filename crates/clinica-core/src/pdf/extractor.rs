//! PDF text extraction using lopdf and pdf-extract.

use std::panic::{catch_unwind, AssertUnwindSafe};

use lopdf::Document;
use tracing::{debug, trace};

use super::{PdfProcessor, Result};
use crate::error::PdfError;
use crate::models::config::PdfConfig;

/// PDF text layer extractor.
pub struct PdfExtractor {
    config: PdfConfig,
    document: Option<Document>,
    raw_data: Vec<u8>,
}

/// Text layer of a whole PDF.
#[derive(Debug, Clone)]
pub struct PdfContent {
    /// Pages in document order.
    pub pages: Vec<PdfPage>,
    /// Page texts joined with newlines.
    pub text: String,
}

/// Text of a single PDF page.
#[derive(Debug, Clone)]
pub struct PdfPage {
    /// Page number (1-indexed).
    pub number: u32,
    /// Text items of the page joined with single spaces.
    pub text: String,
}

impl PdfContent {
    /// Whether any page carries embedded text. Scanned PDFs usually do not.
    pub fn has_text_layer(&self) -> bool {
        self.pages.iter().any(|p| !p.text.is_empty())
    }
}

impl PdfExtractor {
    /// Create a new PDF extractor.
    pub fn new(config: PdfConfig) -> Self {
        Self {
            config,
            document: None,
            raw_data: Vec::new(),
        }
    }

    /// Extract the text layer of every page.
    pub fn extract_all(&self) -> Result<PdfContent> {
        let page_texts = self.page_texts()?;

        let pages: Vec<PdfPage> = page_texts
            .iter()
            .enumerate()
            .map(|(i, raw)| PdfPage {
                number: i as u32 + 1,
                text: flatten_page(raw),
            })
            .collect();

        let text = pages
            .iter()
            .map(|p| p.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        let content = PdfContent { pages, text };
        debug!(
            "PDF text layer: {} pages, {} chars, has_text={}",
            content.pages.len(),
            content.text.len(),
            content.has_text_layer()
        );
        Ok(content)
    }

    fn page_texts(&self) -> Result<Vec<String>> {
        if self.document.is_none() {
            return Err(PdfError::Parse("No document loaded".to_string()));
        }

        // pdf-extract panics on some malformed content streams.
        let data = &self.raw_data;
        catch_unwind(AssertUnwindSafe(|| pdf_extract::extract_text_from_mem_by_pages(data)))
            .map_err(|_| PdfError::TextExtraction("text extractor panicked".to_string()))?
            .map_err(|e| PdfError::TextExtraction(e.to_string()))
    }
}

impl Default for PdfExtractor {
    fn default() -> Self {
        Self::new(PdfConfig::default())
    }
}

impl PdfProcessor for PdfExtractor {
    fn load(&mut self, data: &[u8]) -> Result<()> {
        let mut doc = Document::load_mem(data).map_err(|e| PdfError::Parse(e.to_string()))?;

        if doc.is_encrypted() {
            if !self.config.decrypt_empty_password || doc.decrypt("").is_err() {
                return Err(PdfError::Encrypted);
            }
            debug!("Decrypted PDF with empty password");

            // pdf-extract reads from bytes, so hand it the decrypted document
            let mut decrypted_data = Vec::new();
            doc.save_to(&mut decrypted_data)
                .map_err(|e| PdfError::Parse(format!("Failed to save decrypted PDF: {}", e)))?;
            self.raw_data = decrypted_data;
        } else {
            self.raw_data = data.to_vec();
        }

        let page_count = doc.get_pages().len();
        if page_count == 0 {
            return Err(PdfError::NoPages);
        }

        debug!("Loaded PDF with {} pages", page_count);
        self.document = Some(doc);
        Ok(())
    }

    fn page_count(&self) -> u32 {
        self.document
            .as_ref()
            .map(|doc| doc.get_pages().len() as u32)
            .unwrap_or(0)
    }

    fn extract_text(&self) -> Result<String> {
        Ok(self.extract_all()?.text)
    }
}

/// Join the text items of a page with single spaces.
fn flatten_page(raw: &str) -> String {
    let text = raw
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    trace!("Flattened page to {} chars", text.len());
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::test_support::make_test_pdf;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_pdf_extractor_new() {
        let extractor = PdfExtractor::default();
        assert!(extractor.document.is_none());
        assert_eq!(extractor.page_count(), 0);
        assert!(extractor.extract_text().is_err());
    }

    #[test]
    fn test_rejects_non_pdf() {
        let mut extractor = PdfExtractor::default();
        assert!(matches!(
            extractor.load(b"definitely not a pdf"),
            Err(PdfError::Parse(_))
        ));
    }

    #[test]
    fn test_extracts_pages_in_order() {
        let data = make_test_pdf(&["Edad 54", "Cirujano PEREZ"]);
        let mut extractor = PdfExtractor::default();
        extractor.load(&data).unwrap();

        assert_eq!(extractor.page_count(), 2);
        let content = extractor.extract_all().unwrap();
        assert_eq!(content.pages.len(), 2);
        assert!(content.pages[0].text.contains("Edad"), "got {:?}", content.pages[0].text);
        assert!(content.pages[1].text.contains("PEREZ"), "got {:?}", content.pages[1].text);

        let first_break = content.text.find('\n').unwrap();
        assert!(content.text[..first_break].contains("54"));
    }

    #[test]
    fn test_page_without_text_layer_is_empty() {
        let data = make_test_pdf(&[""]);
        let mut extractor = PdfExtractor::default();
        extractor.load(&data).unwrap();

        let content = extractor.extract_all().unwrap();
        assert!(!content.has_text_layer());
        assert_eq!(content.text.trim(), "");
    }

    #[test]
    fn test_flatten_page_joins_items() {
        assert_eq!(flatten_page("  Fecha: 1/2/2024 \n\n Edad 54\n"), "Fecha: 1/2/2024 Edad 54");
        assert_eq!(flatten_page(""), "");
    }
}
