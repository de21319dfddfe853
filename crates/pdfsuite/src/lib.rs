pub mod batch;
pub mod config;
pub mod counter;
pub mod error;
pub mod sanitize;
pub mod service;
pub mod worker;

#[cfg(test)]
pub(crate) mod testpdf;

pub use batch::{
    BatchRunner, ChannelProgress, FailureKind, InputFile, ItemOutcome, ItemOutput, ItemResult,
    Job, JobReport, JobStatus, NoopProgress, Operation, ProgressEvent, ProgressReporter,
};
pub use config::{load_config, SuiteConfig, DEFAULT_COMPRESSION_QUALITY};
pub use counter::{CounterStore, FileCounter, MemoryCounter};
pub use error::{
    ConfigError, CounterError, Result, ScopeError, ServiceError, SuiteError, WorkerError,
};
pub use service::{DocumentMetadata, DocumentService, GeoCandidate, PdfDocumentService, ScanReport};
pub use worker::{spawn, JobHandle};
