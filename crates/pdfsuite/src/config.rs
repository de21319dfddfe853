use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default JPEG quality for the Compress operation (0-100 scale).
pub const DEFAULT_COMPRESSION_QUALITY: u8 = 50;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SuiteConfig {
    /// Root directory for job-scoped temp workspaces. Falls back to the
    /// system temp directory when unset.
    pub temp_directory: Option<PathBuf>,

    /// Path of the persisted access counter file.
    pub counter_file: PathBuf,

    /// JPEG quality applied by the Compress operation.
    pub compression_quality: u8,
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self {
            temp_directory: None,
            counter_file: PathBuf::from("pdfsuite-counter"),
            compression_quality: DEFAULT_COMPRESSION_QUALITY,
        }
    }
}

impl SuiteConfig {
    /// Resolved temp root for job workspaces.
    pub fn temp_root(&self) -> PathBuf {
        self.temp_directory
            .clone()
            .unwrap_or_else(std::env::temp_dir)
    }
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<SuiteConfig, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<SuiteConfig, ConfigError> {
    let config: SuiteConfig = serde_json::from_str(content)?;

    validate_config(&config)?;

    Ok(config)
}

fn validate_config(config: &SuiteConfig) -> Result<(), ConfigError> {
    if config.compression_quality == 0 || config.compression_quality > 100 {
        return Err(ConfigError::Validation {
            message: format!(
                "compression_quality must be in 1..=100, got {}",
                config.compression_quality
            ),
        });
    }

    if config.counter_file.as_os_str().is_empty() {
        return Err(ConfigError::Validation {
            message: "counter_file must not be empty".to_string(),
        });
    }

    Ok(())
}
