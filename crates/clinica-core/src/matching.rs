//! Reconciliation of extracted text with canonical reference entities.
//!
//! An exact (case-insensitive) name match wins, otherwise the first
//! candidate in list order that overlaps the text is taken. There is no scoring, so with several overlapping candidates the
//! result depends on the order the backend returned them in. An unmatched
//! text is not an error; the entry is left for manual selection.

use tracing::trace;

use crate::models::config::MatchingConfig;
use crate::models::reference::{Doctor, ObraSocial, Reference, Study};

/// How much of the extracted text must appear inside a candidate name for a
/// partial match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prefix {
    /// The first `n` characters.
    Chars(usize),
    /// The first whitespace-delimited token (typically a surname).
    FirstToken,
}

impl Prefix {
    fn apply(self, text: &str) -> &str {
        match self {
            Prefix::Chars(n) => match text.char_indices().nth(n) {
                Some((idx, _)) => &text[..idx],
                None => text,
            },
            Prefix::FirstToken => text.split_whitespace().next().unwrap_or(text),
        }
    }
}

fn normalize(text: &str) -> String {
    text.trim().to_uppercase()
}

/// Find the candidate that best matches `free_text` and return its id.
pub fn match_best<'a, R: Reference>(
    free_text: &str,
    candidates: &'a [R],
    prefix: Prefix,
) -> Option<&'a str> {
    let text = normalize(free_text);
    if text.is_empty() || candidates.is_empty() {
        return None;
    }

    let names: Vec<String> = candidates
        .iter()
        .map(|c| normalize(c.display_name()))
        .collect();

    if let Some(i) = names.iter().position(|name| *name == text) {
        trace!("Exact match for {:?}: {}", text, candidates[i].id());
        return Some(candidates[i].id());
    }

    // An empty head is contained in every name, so it only counts when non-empty.
    let head = prefix.apply(&text);
    let partial = names.iter().position(|name| {
        !name.is_empty()
            && (text.contains(name.as_str()) || (!head.is_empty() && name.contains(head)))
    });

    partial.map(|i| {
        trace!("Partial match for {:?}: {}", text, candidates[i].id());
        candidates[i].id()
    })
}

/// Matches the three free-text fields of a report against their reference lists.
#[derive(Debug, Clone)]
pub struct ReferenceMatcher {
    study_prefix: Prefix,
}

impl ReferenceMatcher {
    pub fn new(config: &MatchingConfig) -> Self {
        Self {
            study_prefix: Prefix::Chars(config.study_prefix_chars),
        }
    }

    /// Match the surgeon text against doctors.
    pub fn doctor<'a>(&self, surgeon: &str, doctors: &'a [Doctor]) -> Option<&'a str> {
        match_best(surgeon, doctors, Prefix::FirstToken)
    }

    /// Match the practice text against studies.
    pub fn study<'a>(&self, practice: &str, studies: &'a [Study]) -> Option<&'a str> {
        match_best(practice, studies, self.study_prefix)
    }

    /// Match the insurance text against insurers.
    pub fn obra_social<'a>(&self, insurance: &str, obras: &'a [ObraSocial]) -> Option<&'a str> {
        match_best(insurance, obras, Prefix::FirstToken)
    }
}

impl Default for ReferenceMatcher {
    fn default() -> Self {
        Self::new(&MatchingConfig::default())
    }
}
