use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum UsageError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("No personal access token provided (set VSTS_PAT or pass --token)")]
    MissingToken,

    #[error("Dataset file not found: {}", .0.display())]
    DatasetNotFound(PathBuf),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("API request failed with status {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Malformed dataset {}: {source}", path.display())]
    Dataset {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to replace {}: {source}", path.display())]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl UsageError {
    /// Whether the failure came from talking to the build server rather than
    /// from local configuration or data.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Api { .. } | Self::Network(_))
    }
}

pub type Result<T> = std::result::Result<T, UsageError>;
