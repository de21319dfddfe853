//! Batch job model and runner: per-item isolation, input-order results,
//! scoped temp artifacts, and progress reporting.

pub mod job;
pub mod progress;
pub mod runner;
pub mod scope;

pub use job::{
    FailureKind, InputFile, ItemOutcome, ItemOutput, ItemResult, Job, JobReport, JobStatus,
    Operation,
};
pub use progress::{ChannelProgress, NoopProgress, ProgressEvent, ProgressReporter};
pub use runner::BatchRunner;
