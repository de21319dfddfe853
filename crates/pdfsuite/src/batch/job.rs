use std::path::Path;

use serde::Serialize;
use uuid::Uuid;

use crate::service::{DocumentMetadata, ScanReport};

/// In-memory input document, decoupled from where the bytes came from
/// (upload, disk, test fixture).
#[derive(Debug, Clone)]
pub struct InputFile {
    /// Display name as submitted; may contain path separators, which are
    /// stripped before the bytes touch the filesystem.
    pub name: String,
    pub bytes: Vec<u8>,
    pub mime_type: Option<String>,
}

impl InputFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let name = name.into();
        let mime_type = mime_guess::from_path(&name)
            .first()
            .map(|m| m.essence_str().to_string());
        Self {
            name,
            bytes,
            mime_type,
        }
    }

    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "document.pdf".to_string());
        Ok(Self::new(name, bytes))
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// What to do with each input in a job.
#[derive(Debug, Clone)]
pub enum Operation {
    ConvertToWord,
    RemoveWatermark { text: String },
    Compress { quality: u8 },
    ExtractMetadata,
    ScanSuspicious,
    ConvertToEbook { title: String, author: String },
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::ConvertToWord => "convert-to-word",
            Operation::RemoveWatermark { .. } => "remove-watermark",
            Operation::Compress { .. } => "compress",
            Operation::ExtractMetadata => "extract-metadata",
            Operation::ScanSuspicious => "scan-suspicious",
            Operation::ConvertToEbook { .. } => "convert-to-ebook",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
    PartiallyFailed,
}

impl JobStatus {
    /// Aggregate status over finished item results. An empty job completes.
    pub fn from_results(results: &[ItemResult]) -> JobStatus {
        let successes = results.iter().filter(|r| r.outcome.is_success()).count();
        if successes == results.len() {
            JobStatus::Completed
        } else if successes == 0 {
            JobStatus::Failed
        } else {
            JobStatus::PartiallyFailed
        }
    }
}

#[derive(Debug)]
pub struct Job {
    pub id: String,
    pub operation: Operation,
    pub inputs: Vec<InputFile>,
    pub status: JobStatus,
}

impl Job {
    pub fn new(operation: Operation, inputs: Vec<InputFile>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            operation,
            inputs,
            status: JobStatus::Pending,
        }
    }
}

/// Failure classification carried in item results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Io,
    UnsupportedInput,
    Operation,
}

#[derive(Debug)]
pub struct ItemResult {
    /// Position of the input in the submitted job; results keep input order.
    pub index: usize,
    pub input_name: String,
    pub outcome: ItemOutcome,
}

#[derive(Debug)]
pub enum ItemOutcome {
    Success(ItemOutput),
    Failure { kind: FailureKind, message: String },
}

impl ItemOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ItemOutcome::Success(_))
    }
}

/// Per-item payload of a successful operation.
#[derive(Debug)]
pub enum ItemOutput {
    /// A produced file (DOCX, cleaned/compressed PDF, EPUB) read back out of
    /// the item's temp scope before cleanup.
    Document {
        file_name: String,
        bytes: Vec<u8>,
        warnings: Vec<String>,
    },
    Metadata(DocumentMetadata),
    Findings(ScanReport),
}

#[derive(Debug)]
pub struct JobReport {
    pub job_id: String,
    pub operation: String,
    pub status: JobStatus,
    pub results: Vec<ItemResult>,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub finished_at: chrono::DateTime<chrono::Utc>,
}
