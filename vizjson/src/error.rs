use std::path::PathBuf;

use thiserror::Error;

/// The primary error type that can be produced when presenting
/// visualizations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid visualization {0}: {1}")]
    InvalidVisualization(String, String),
    #[error("cache error for key \"{key}\": {reason}")]
    Cache {
        key: String,
        reason: String,
        retryable: bool,
    },
    #[error("failed to decode cached document for key \"{0}\": {1}")]
    CachePayload(String, serde_json::Error),
    #[error("I/O error {0}: {1}")]
    Io(String, std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("cannot determine file type of file: {0}")]
    CannotDetermineDataFileType(PathBuf),
    #[error("unsupported file type: {0}")]
    UnsupportedFileType(String),
    #[error("source files iteration failed: {0}")]
    SourceIter(#[from] glob::GlobError),
    #[error("failed to parse source file pattern \"{0}\": {1}")]
    SourceFilePattern(String, glob::PatternError),
    #[error("failed to parse date/time \"{0}\": {1}")]
    DateTimeParse(String, time::error::Parse),
    #[error("failed to load configuration from {0}")]
    FailedToLoadConfig(PathBuf),
    #[error("failed to load visualization from {0}")]
    FailedToLoadVisualization(PathBuf),
}

impl Error {
    /// Convenience constructor for cache backend failures.
    pub fn cache<K, R>(key: K, reason: R, retryable: bool) -> Self
    where
        K: AsRef<str>,
        R: AsRef<str>,
    {
        Self::Cache {
            key: key.as_ref().to_string(),
            reason: reason.as_ref().to_string(),
            retryable,
        }
    }

    /// Whether the caller may retry the operation that produced this error.
    ///
    /// Only cache backend failures flagged as transient are retryable. Nothing
    /// in this crate retries on its own.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Cache {
                retryable: true,
                ..
            }
        )
    }
}
