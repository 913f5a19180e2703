//! Sequential batch ingestion: extract, parse, match, price.

use tracing::{debug, info, warn};

use crate::error::IngestError;
use crate::matching::ReferenceMatcher;
use crate::models::document::DocumentEntry;
use crate::models::reference::ReferenceSnapshot;
use crate::pricing;
use crate::report::ReportParser;
use crate::source::{SourceFile, SourceInput, SourceKind, TextSource};

/// Progress reported while a PDF text layer is being read.
const PDF_STARTED_PERCENT: u8 = 10;

/// What the orchestrator is doing right now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestState {
    Idle,
    Processing {
        /// 1-based position in the batch.
        index: usize,
        total: usize,
        file_name: String,
        percent: u8,
    },
}

/// Notifications emitted during a batch, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestEvent {
    BatchStarted {
        total: usize,
    },
    FileStarted {
        index: usize,
        total: usize,
        file_name: String,
    },
    Progress {
        index: usize,
        percent: u8,
    },
    FileCompleted {
        index: usize,
        entry_id: String,
    },
    FileFailed {
        index: usize,
        file_name: String,
        error: IngestError,
    },
    BatchFinished {
        succeeded: usize,
        failed: usize,
    },
}

/// Outcome of a batch: entries in upload order plus one error per failed file.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub entries: Vec<DocumentEntry>,
    pub errors: Vec<IngestError>,
}

/// Drives files through the pipeline one at a time.
pub struct Ingestor<S: TextSource> {
    source: S,
    parser: ReportParser,
    matcher: ReferenceMatcher,
    state: IngestState,
}

impl<S: TextSource> Ingestor<S> {
    pub fn new(source: S, parser: ReportParser, matcher: ReferenceMatcher) -> Self {
        Self {
            source,
            parser,
            matcher,
            state: IngestState::Idle,
        }
    }

    /// Current state.
    pub fn state(&self) -> &IngestState {
        &self.state
    }

    /// Process `files` in order against a fixed reference snapshot.
    ///
    /// Paths are read one at a time as their turn comes. A failing file,
    /// unreadable ones included, is recorded and skipped; the batch always
    /// runs to the end.
    pub fn run<I: Into<SourceInput>>(
        &mut self,
        files: Vec<I>,
        references: &ReferenceSnapshot,
        sink: &mut dyn FnMut(IngestEvent),
    ) -> BatchReport {
        let total = files.len();
        let mut report = BatchReport::default();

        info!("Ingesting {} file(s)", total);
        sink(IngestEvent::BatchStarted { total });

        for (i, input) in files.into_iter().map(Into::<SourceInput>::into).enumerate() {
            let index = i + 1;
            let file_name = input.name();
            self.state = IngestState::Processing {
                index,
                total,
                file_name: file_name.clone(),
                percent: 0,
            };
            sink(IngestEvent::FileStarted {
                index,
                total,
                file_name: file_name.clone(),
            });

            let outcome = match input.load() {
                Ok(file) => self.process_file(&file, index, references, sink),
                Err(error) => Err(error),
            };

            match outcome {
                Ok(entry) => {
                    info!("[{}/{}] {} ingested", index, total, file_name);
                    sink(IngestEvent::FileCompleted {
                        index,
                        entry_id: entry.id.clone(),
                    });
                    report.entries.push(entry);
                }
                Err(error) => {
                    warn!("[{}/{}] {}", index, total, error);
                    sink(IngestEvent::FileFailed {
                        index,
                        file_name,
                        error: error.clone(),
                    });
                    report.errors.push(error);
                }
            }
        }

        self.state = IngestState::Idle;
        sink(IngestEvent::BatchFinished {
            succeeded: report.entries.len(),
            failed: report.errors.len(),
        });

        report
    }

    /// Build a resolved entry from already extracted text.
    pub fn entry_from_text(
        &self,
        file_name: &str,
        text: &str,
        references: &ReferenceSnapshot,
    ) -> DocumentEntry {
        let parsed = self.parser.parse(text);
        let mut entry = DocumentEntry::new(file_name, parsed);

        entry.doctor_id = self
            .matcher
            .doctor(&entry.parsed.surgeon, &references.doctors)
            .unwrap_or_default()
            .to_string();
        entry.study_id = self
            .matcher
            .study(&entry.parsed.practice, &references.studies)
            .unwrap_or_default()
            .to_string();
        entry.obra_social_id = self
            .matcher
            .obra_social(&entry.parsed.insurance, &references.obras_sociales)
            .unwrap_or_default()
            .to_string();
        entry.precio = pricing::resolve(&entry.study_id, &entry.obra_social_id, &references.tarifas);

        debug!(
            "{}: doctor={:?} study={:?} obra_social={:?} precio={:?}",
            file_name, entry.doctor_id, entry.study_id, entry.obra_social_id, entry.precio
        );

        entry
    }

    fn process_file(
        &mut self,
        file: &SourceFile,
        index: usize,
        references: &ReferenceSnapshot,
        sink: &mut dyn FnMut(IngestEvent),
    ) -> Result<DocumentEntry, IngestError> {
        let kind = SourceKind::detect(file)?;

        let text = match kind {
            SourceKind::Pdf => {
                self.report_progress(index, PDF_STARTED_PERCENT, sink);
                let text = self
                    .source
                    .extract_pdf(&file.bytes)
                    .map_err(|e| IngestError::extraction(&file.name, e))?;
                self.report_progress(index, 100, sink);
                text
            }
            SourceKind::Image => {
                let source = &self.source;
                let state = &mut self.state;
                source
                    .extract_image(&file.bytes, &mut |percent| {
                        set_percent(state, percent);
                        sink(IngestEvent::Progress { index, percent });
                    })
                    .map_err(|e| IngestError::extraction(&file.name, e))?
            }
        };

        debug!("{}: extracted {} chars", file.name, text.len());
        Ok(self.entry_from_text(&file.name, &text, references))
    }

    fn report_progress(&mut self, index: usize, percent: u8, sink: &mut dyn FnMut(IngestEvent)) {
        set_percent(&mut self.state, percent);
        sink(IngestEvent::Progress { index, percent });
    }
}

fn set_percent(state: &mut IngestState, value: u8) {
    if let IngestState::Processing { percent, .. } = state {
        *percent = value.min(100);
    }
}
