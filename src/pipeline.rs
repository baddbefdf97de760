//! Routes every result file to its organism and streams it into the model.

use std::path::Path;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::association::{AssociationIndex, AssociationStats};
use crate::config::ResolvedConfig;
use crate::domain::result_file_stem;
use crate::error::PsmError;
use crate::fs_util::{ResultEntry, ResultSource};
use crate::model::{IdentificationModel, Organism};
use crate::parser::{ParseReport, RecordParser};

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    pub elapsed: Option<Duration>,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

/// Sink that drops every event.
pub struct SilentSink;

impl ProgressSink for SilentSink {
    fn event(&self, _event: ProgressEvent) {}
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FileOutcomes {
    pub listed: usize,
    pub ignored: usize,
    pub parsed: usize,
    pub unroutable: usize,
    pub missing: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub started_at: String,
    pub elapsed_ms: u128,
    pub directory: String,
    pub association_file: String,
    pub association: AssociationStats,
    pub files: FileOutcomes,
    pub records: ParseReport,
    pub unroutable_files: Vec<String>,
    pub failed_files: Vec<String>,
}

#[derive(Debug)]
pub struct PipelineOutput {
    pub model: IdentificationModel,
    pub summary: RunSummary,
}

pub struct Pipeline<S: ResultSource> {
    source: S,
    config: ResolvedConfig,
}

enum FileOutcome {
    Ignored,
    Parsed(ParseReport),
    Unroutable,
    Missing,
    Failed,
}

impl<S: ResultSource> Pipeline<S> {
    pub fn new(source: S, config: ResolvedConfig) -> Self {
        Self { source, config }
    }

    pub fn config(&self) -> &ResolvedConfig {
        &self.config
    }

    /// Reads the association file, then every result file in the source.
    /// Only an unreadable association file (or an aborting malformed row)
    /// fails the run.
    pub fn run(
        &self,
        association_path: &Path,
        sink: &dyn ProgressSink,
    ) -> Result<PipelineOutput, PsmError> {
        sink.event(ProgressEvent {
            message: format!("reading associations from {}", association_path.display()),
            elapsed: None,
        });
        let index = AssociationIndex::from_path(association_path, self.config.malformed_row_policy)?;
        self.run_with_index(&index, &association_path.display().to_string(), sink)
    }

    pub fn run_with_index(
        &self,
        index: &AssociationIndex,
        association_label: &str,
        sink: &dyn ProgressSink,
    ) -> Result<PipelineOutput, PsmError> {
        let started_at = chrono::Utc::now().to_rfc3339();
        let started = Instant::now();
        let mut model = IdentificationModel::with_organisms(index.organism_names());
        let mut summary = RunSummary {
            started_at,
            elapsed_ms: 0,
            directory: self.source.location().to_string(),
            association_file: association_label.to_string(),
            association: index.stats(),
            files: FileOutcomes::default(),
            records: ParseReport::default(),
            unroutable_files: Vec::new(),
            failed_files: Vec::new(),
        };

        let entries = self.source.list()?;
        summary.files.listed = entries.len();
        for entry in &entries {
            match self.process_file(entry, index, association_label, &mut model) {
                FileOutcome::Ignored => summary.files.ignored += 1,
                FileOutcome::Parsed(report) => {
                    summary.files.parsed += 1;
                    summary.records.merge(&report);
                    sink.event(ProgressEvent {
                        message: format!(
                            "{}: {} target PSMs, {} decoy PSMs",
                            entry.file_name, report.target_psms, report.decoy_psms
                        ),
                        elapsed: Some(started.elapsed()),
                    });
                }
                FileOutcome::Unroutable => {
                    summary.files.unroutable += 1;
                    summary.unroutable_files.push(entry.file_name.clone());
                }
                FileOutcome::Missing => summary.files.missing += 1,
                FileOutcome::Failed => {
                    summary.files.failed += 1;
                    summary.failed_files.push(entry.file_name.clone());
                }
            }
        }

        summary.elapsed_ms = started.elapsed().as_millis();
        info!(
            "parsed {} of {} files ({} unroutable, {} failed); {} PSMs accepted",
            summary.files.parsed,
            summary.files.listed,
            summary.files.unroutable,
            summary.files.failed,
            summary.records.accepted
        );
        sink.event(ProgressEvent {
            message: "done".to_string(),
            elapsed: Some(started.elapsed()),
        });
        Ok(PipelineOutput { model, summary })
    }

    fn process_file(
        &self,
        entry: &ResultEntry,
        index: &AssociationIndex,
        association_label: &str,
        model: &mut IdentificationModel,
    ) -> FileOutcome {
        let Some(stem) = result_file_stem(&entry.file_name) else {
            return FileOutcome::Ignored;
        };
        let Some(organism_name) = index.organism_for_stem(&stem) else {
            let err = PsmError::UnroutableFile {
                file: entry.file_name.clone(),
                directory: self.source.location().to_string(),
                association: association_label.to_string(),
            };
            warn!("{err}");
            return FileOutcome::Unroutable;
        };
        if !self.source.is_file(entry) {
            debug!("{} is not a regular file; skipping", entry.path);
            return FileOutcome::Missing;
        }

        let reader = match self.source.open(entry) {
            Ok(reader) => reader,
            Err(PsmError::MissingFile(path)) => {
                debug!("{} disappeared before it could be read", path.display());
                return FileOutcome::Missing;
            }
            Err(err) => {
                warn!("{err}");
                return FileOutcome::Failed;
            }
        };

        debug!("parsing {} for {organism_name}", entry.path);
        // Records are staged per file so a stream that fails partway leaves
        // the model untouched.
        let mut staged = Organism::new(organism_name);
        let parser = RecordParser::new(&self.config.parser);
        match parser.parse_stream(reader, &mut staged) {
            Ok(report) => {
                model.organism_entry(organism_name).merge(staged);
                FileOutcome::Parsed(report)
            }
            Err(err) => {
                warn!("{}: {err}; discarding records read from this file", entry.file_name);
                FileOutcome::Failed
            }
        }
    }
}
