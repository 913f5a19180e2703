//! Field extraction for surgical reports.

mod parser;
pub mod patterns;

pub use parser::{normalize, ReportParser};
pub use patterns::{NarrativeRule, PatternTable};

use crate::models::document::ParsedDocument;

/// Parse report text with the built-in pattern table.
pub fn parse(text: &str) -> ParsedDocument {
    patterns::DEFAULT_PARSER.parse(text)
}
