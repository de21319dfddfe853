use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SuiteError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Document service error: {0}")]
    Service(#[from] ServiceError),

    #[error("Counter error: {0}")]
    Counter(#[from] CounterError),

    #[error("Worker error: {0}")]
    Worker(#[from] WorkerError),

    #[error("Temporary workspace error: {0}")]
    Scope(#[from] ScopeError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },
}

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Failed to read document '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unsupported or corrupt input: {0}")]
    UnsupportedInput(String),

    #[error("Failed to process PDF: {0}")]
    Pdf(String),

    #[error("Failed to build DOCX: {0}")]
    Docx(String),

    #[error("Failed to build EPUB: {0}")]
    Epub(String),
}

/// Errors from the job-scoped temporary workspace. Every variant carries the
/// path so per-item failure messages stay actionable.
#[derive(Error, Debug)]
pub enum ScopeError {
    #[error("Failed to create temp directory '{path}': {source}")]
    Create {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write temp file '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read temp file '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to remove temp directory '{path}': {source}")]
    Cleanup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Error, Debug)]
pub enum CounterError {
    #[error("Failed to read counter file '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write counter file '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("Worker channel closed unexpectedly")]
    ChannelClosed,

    #[error("Worker thread panicked")]
    Panicked,
}

pub type Result<T> = std::result::Result<T, SuiteError>;
