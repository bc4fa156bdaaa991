use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum MashError {
    #[error("I/O Error: {0}")]
    Io(#[from] Arc<std::io::Error>),

    #[error("HTTP Request Error: {0}")]
    Http(#[from] Arc<reqwest::Error>),

    #[error("JSON Parsing Error: {0}")]
    Json(#[from] Arc<serde_json::Error>),

    #[error("Configuration Error: {0}")]
    Config(String),

    #[error("DownloadError: Failed to download '{name}' from '{url}': {cause}")]
    Download {
        name: String,
        url: String,
        cause: String,
    },

    #[error("Checksum mismatch for {path}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    #[error("Build failed (exit code {exit_code:?}): {stderr_tail}")]
    Build {
        exit_code: Option<i32>,
        stderr_tail: String,
    },

    #[error("Install failed copying '{source_path}' to '{dest}': {cause}")]
    Install {
        source_path: PathBuf,
        dest: PathBuf,
        cause: String,
    },

    #[error("Smoke test failed (exit code {exit_code:?}): {output_tail}")]
    SmokeTest {
        exit_code: Option<i32>,
        output_tail: String,
    },

    #[error("Validation Error: {0}")]
    Validation(String),

    #[error("Resource Not Found: {0}")]
    NotFound(String),

    #[error("Parsing Error in {0}: {1}")]
    Parse(&'static str, String),

    #[error("Build environment setup failed: {0}")]
    BuildEnv(String),

    #[error("Failed to execute command: {0}")]
    CommandExec(String),

    #[error("IoError: {0}")]
    IoError(String),

    #[error("Generic Error: {0}")]
    Generic(String),
}

impl From<std::io::Error> for MashError {
    fn from(err: std::io::Error) -> Self {
        MashError::Io(Arc::new(err))
    }
}

impl From<reqwest::Error> for MashError {
    fn from(err: reqwest::Error) -> Self {
        MashError::Http(Arc::new(err))
    }
}

impl From<serde_json::Error> for MashError {
    fn from(err: serde_json::Error) -> Self {
        MashError::Json(Arc::new(err))
    }
}

pub type Result<T> = std::result::Result<T, MashError>;
