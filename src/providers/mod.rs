//! Build servers the usage scan can read from.

pub mod azure;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::dataset::BuildId;
use crate::error::Result;

pub use azure::AzureDevOpsClient;

/// Lifecycle state of a build as reported by the build server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BuildStatus {
    None,
    InProgress,
    Completed,
    Cancelling,
    Postponed,
    NotStarted,
    #[serde(other)]
    Unknown,
}

impl std::fmt::Display for BuildStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::None => "none",
            Self::InProgress => "inProgress",
            Self::Completed => "completed",
            Self::Cancelling => "cancelling",
            Self::Postponed => "postponed",
            Self::NotStarted => "notStarted",
            Self::Unknown => "unknown",
        };
        f.write_str(label)
    }
}

/// A build as listed for a pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildSummary {
    pub id: BuildId,
    pub status: BuildStatus,
    /// Outcome text such as "succeeded" or "failed"; absent while running.
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default)]
    pub finish_time: Option<DateTime<Utc>>,
}

/// A step of a build's execution timeline.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TimelineRecord {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub log: Option<LogReference>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LogReference {
    pub id: u64,
}

impl TimelineRecord {
    pub fn log_id(&self) -> Option<u64> {
        self.log.as_ref().map(|log| log.id)
    }
}

/// Read access to a CI build server.
///
/// Every call may fail with a network/API error or with
/// [`crate::error::UsageError::NotFound`] when the build or log is gone.
#[allow(async_fn_in_trait)]
pub trait BuildSource {
    /// Up to `limit` most recent builds of a pipeline, newest first.
    async fn list_recent_builds(&self, pipeline_id: u64, limit: usize)
        -> Result<Vec<BuildSummary>>;

    async fn fetch_timeline(&self, build_id: BuildId) -> Result<Vec<TimelineRecord>>;

    async fn fetch_log_lines(&self, build_id: BuildId, log_id: u64) -> Result<Vec<String>>;

    /// Deep link to the result page of a build.
    fn build_url(&self, build_id: BuildId) -> String;
}
