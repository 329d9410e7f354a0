use serde::Deserialize;

use crate::providers::TimelineRecord;

/// Envelope Azure DevOps wraps list results in.
#[derive(Debug, Deserialize)]
pub(super) struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    pub value: Vec<T>,
}

#[derive(Debug, Deserialize)]
pub(super) struct TimelineResponse {
    #[serde(default)]
    pub records: Option<Vec<TimelineRecord>>,
}
