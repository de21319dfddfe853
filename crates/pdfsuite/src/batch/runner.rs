//! The batch runner: executes a job item by item, isolating failures,
//! cleaning up temp artifacts on every exit path, and bumping the access
//! counter once per successful item.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use tracing::{info_span, warn};

use crate::config::SuiteConfig;
use crate::counter::{CounterStore, FileCounter};
use crate::error::{ScopeError, ServiceError};
use crate::sanitize::redact_path;
use crate::service::{DocumentService, PdfDocumentService};

use super::job::{
    FailureKind, InputFile, ItemOutcome, ItemOutput, ItemResult, Job, JobReport, JobStatus,
    Operation,
};
use super::progress::{ProgressEvent, ProgressReporter};
use super::scope::{ItemScope, JobWorkspace};

pub struct BatchRunner<S: DocumentService> {
    service: S,
    counter: Arc<dyn CounterStore>,
    temp_root: PathBuf,
}

impl BatchRunner<PdfDocumentService> {
    pub fn from_config(config: &SuiteConfig) -> Self {
        Self::new(
            PdfDocumentService::new(),
            Arc::new(FileCounter::new(&config.counter_file)),
            config.temp_root(),
        )
    }
}

impl<S: DocumentService> BatchRunner<S> {
    pub fn new(
        service: S,
        counter: Arc<dyn CounterStore>,
        temp_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            service,
            counter,
            temp_root: temp_root.into(),
        }
    }

    pub fn counter(&self) -> &Arc<dyn CounterStore> {
        &self.counter
    }

    /// Runs all items of a job to completion. One failing item never stops
    /// the rest; results come back in input order, one per input.
    pub fn run(&self, mut job: Job, progress: &dyn ProgressReporter) -> JobReport {
        let _span = info_span!(
            "job",
            job_id = %job.id,
            operation = job.operation.name(),
            inputs = job.inputs.len()
        )
        .entered();
        let started_at = Utc::now();
        job.status = JobStatus::Running;

        let workspace = match JobWorkspace::create(&self.temp_root, &job.id) {
            Ok(workspace) => workspace,
            Err(e) => return self.fail_all(job, started_at, progress, &e),
        };

        let mut results = Vec::with_capacity(job.inputs.len());
        for (index, input) in job.inputs.iter().enumerate() {
            progress.report(ProgressEvent::ItemStarted {
                index,
                input_name: input.name.clone(),
            });
            let _item_span = info_span!("item", index, input = %redact_path(Path::new(&input.name))).entered();

            let outcome = match self.process_item(&workspace, index, input, &job.operation) {
                Ok(output) => {
                    if let Err(e) = self.counter.increment() {
                        warn!("access counter increment failed: {}", e);
                    }
                    ItemOutcome::Success(output)
                }
                Err(failure) => {
                    warn!("item failed: {}", failure.message);
                    ItemOutcome::Failure {
                        kind: failure.kind,
                        message: failure.message,
                    }
                }
            };

            progress.report(ProgressEvent::ItemFinished {
                index,
                input_name: input.name.clone(),
                success: outcome.is_success(),
                error: match &outcome {
                    ItemOutcome::Failure { message, .. } => Some(message.clone()),
                    ItemOutcome::Success(_) => None,
                },
            });
            results.push(ItemResult {
                index,
                input_name: input.name.clone(),
                outcome,
            });
        }

        let status = JobStatus::from_results(&results);
        if let Err(e) = workspace.close() {
            warn!("failed to remove job workspace: {}", e);
        }
        progress.report(ProgressEvent::JobFinished {
            job_id: job.id.clone(),
            status,
        });

        JobReport {
            job_id: job.id,
            operation: job.operation.name().to_string(),
            status,
            results,
            started_at,
            finished_at: Utc::now(),
        }
    }

    fn process_item(
        &self,
        workspace: &JobWorkspace,
        index: usize,
        input: &InputFile,
        operation: &Operation,
    ) -> Result<ItemOutput, ItemFailure> {
        let scope = workspace.item_scope(index)?;
        let result = self.run_operation(&scope, input, operation);
        // Every path out of run_operation lands here, so the item's temp
        // directory is gone before the outcome is recorded.
        if let Err(e) = scope.close() {
            warn!("failed to remove item temp dir: {}", e);
        }
        result
    }

    fn run_operation(
        &self,
        scope: &ItemScope,
        input: &InputFile,
        operation: &Operation,
    ) -> Result<ItemOutput, ItemFailure> {
        let input_path = scope.materialize(&input.name, &input.bytes)?;

        match operation {
            Operation::ConvertToWord => {
                let output = scope.output_path("docx");
                self.service.convert_to_docx(&input_path, &output)?;
                self.document_output(scope, &output, &input.name, operation, Vec::new())
            }
            Operation::RemoveWatermark { text } => {
                let output = scope.output_path("pdf");
                self.service.strip_watermark(&input_path, text, &output)?;
                self.document_output(scope, &output, &input.name, operation, Vec::new())
            }
            Operation::Compress { quality } => {
                let output = scope.output_path("pdf");
                let warnings = self
                    .service
                    .recompress_images(&input_path, *quality, &output)?;
                self.document_output(scope, &output, &input.name, operation, warnings)
            }
            Operation::ExtractMetadata => Ok(ItemOutput::Metadata(
                self.service.read_metadata(&input_path)?,
            )),
            Operation::ScanSuspicious => Ok(ItemOutput::Findings(
                self.service.scan_heuristics(&input_path)?,
            )),
            Operation::ConvertToEbook { title, author } => {
                let output = scope.output_path("epub");
                self.service
                    .build_ebook(&input_path, title, author, &output)?;
                self.document_output(scope, &output, &input.name, operation, Vec::new())
            }
        }
    }

    fn document_output(
        &self,
        scope: &ItemScope,
        path: &Path,
        input_name: &str,
        operation: &Operation,
        warnings: Vec<String>,
    ) -> Result<ItemOutput, ItemFailure> {
        let bytes = scope.read_output(path)?;
        Ok(ItemOutput::Document {
            file_name: output_file_name(input_name, operation),
            bytes,
            warnings,
        })
    }

    /// Workspace creation failed before any item ran: every item gets the
    /// same I/O failure so results still match inputs one to one.
    fn fail_all(
        &self,
        job: Job,
        started_at: chrono::DateTime<Utc>,
        progress: &dyn ProgressReporter,
        error: &ScopeError,
    ) -> JobReport {
        warn!("workspace creation failed: {}", error);
        let results: Vec<ItemResult> = job
            .inputs
            .iter()
            .enumerate()
            .map(|(index, input)| ItemResult {
                index,
                input_name: input.name.clone(),
                outcome: ItemOutcome::Failure {
                    kind: FailureKind::Io,
                    message: error.to_string(),
                },
            })
            .collect();

        let status = JobStatus::from_results(&results);
        progress.report(ProgressEvent::JobFinished {
            job_id: job.id.clone(),
            status,
        });

        JobReport {
            job_id: job.id,
            operation: job.operation.name().to_string(),
            status,
            results,
            started_at,
            finished_at: Utc::now(),
        }
    }
}

/// Output name derived from the input's display name, e.g. `report.pdf`
/// becomes `report.docx`, `report_clean.pdf`, `report_compressed.pdf`, or
/// `report.epub` depending on the operation.
pub(crate) fn output_file_name(input_name: &str, operation: &Operation) -> String {
    let stem = Path::new(input_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("document");
    match operation {
        Operation::ConvertToWord => format!("{}.docx", stem),
        Operation::RemoveWatermark { .. } => format!("{}_clean.pdf", stem),
        Operation::Compress { .. } => format!("{}_compressed.pdf", stem),
        Operation::ConvertToEbook { .. } => format!("{}.epub", stem),
        // Record-producing operations never reach this path.
        Operation::ExtractMetadata | Operation::ScanSuspicious => format!("{}.out", stem),
    }
}

struct ItemFailure {
    kind: FailureKind,
    message: String,
}

impl From<ScopeError> for ItemFailure {
    fn from(e: ScopeError) -> Self {
        Self {
            kind: FailureKind::Io,
            message: e.to_string(),
        }
    }
}

impl From<ServiceError> for ItemFailure {
    fn from(e: ServiceError) -> Self {
        let kind = match &e {
            ServiceError::Io { .. } => FailureKind::Io,
            ServiceError::UnsupportedInput(_) => FailureKind::UnsupportedInput,
            _ => FailureKind::Operation,
        };
        Self {
            kind,
            message: e.to_string(),
        }
    }
}
