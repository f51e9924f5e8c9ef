use std::path::PathBuf;

use thiserror::Error;

/// Failures of the page text provider. Both are fatal for a run.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("source document unavailable at {path:?}: {source}")]
    SourceUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("text extraction failed: {0}")]
    TextExtraction(String),
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("upload {0} not found")]
    UploadNotFound(i64),

    #[error("upload {0} is already being processed")]
    Conflict(i64),

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid setting {key}: {message}")]
    Invalid { key: &'static str, message: String },

    #[error(transparent)]
    Load(#[from] config::ConfigError),
}
