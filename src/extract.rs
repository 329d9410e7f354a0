//! Locating `KEY=value` marker lines inside a build's step logs.

use log::debug;

use crate::dataset::BuildId;
use crate::error::Result;
use crate::providers::{BuildSource, TimelineRecord};

/// Which timeline step to read and which key to look for in its log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerSpec {
    record_name: String,
    key_prefix: String,
}

impl MarkerSpec {
    /// A key given without its `=` gets one appended, so `KEY` and `KEY=`
    /// describe the same marker.
    pub fn new(record_name: impl Into<String>, key: impl Into<String>) -> Self {
        let mut key_prefix = key.into();
        if !key_prefix.ends_with('=') {
            key_prefix.push('=');
        }
        Self {
            record_name: record_name.into(),
            key_prefix,
        }
    }

    pub fn record_name(&self) -> &str {
        &self.record_name
    }

    pub fn key_prefix(&self) -> &str {
        &self.key_prefix
    }
}

/// Log id of the first timeline record named `record_name` that has a log.
/// Records with the right name but no log are passed over.
pub fn find_marker_log(timeline: &[TimelineRecord], record_name: &str) -> Option<u64> {
    timeline
        .iter()
        .filter(|record| record.name == record_name)
        .find_map(TimelineRecord::log_id)
}

/// Everything after `key_prefix` on the first line that contains it.
///
/// The value is returned untrimmed so it can be compared exactly.
pub fn find_marker_value<S: AsRef<str>>(lines: &[S], key_prefix: &str) -> Option<String> {
    lines.iter().find_map(|line| {
        let line = line.as_ref();
        line.find(key_prefix)
            .map(|index| line[index + key_prefix.len()..].to_string())
    })
}

/// Reads the marker value of one build.
///
/// Only the log of the first matching timeline record is fetched. Returns
/// `Ok(None)` when the step or the key is missing; fetch failures are
/// propagated.
pub async fn extract<S: BuildSource>(
    source: &S,
    build_id: BuildId,
    timeline: &[TimelineRecord],
    marker: &MarkerSpec,
) -> Result<Option<String>> {
    let Some(log_id) = find_marker_log(timeline, marker.record_name()) else {
        debug!(
            "Build {build_id}: no '{}' step with a log",
            marker.record_name()
        );
        return Ok(None);
    };

    let lines = source.fetch_log_lines(build_id, log_id).await?;
    let value = find_marker_value(lines.as_slice(), marker.key_prefix());

    if value.is_none() {
        debug!(
            "Build {build_id}: '{}' not found in log {log_id}",
            marker.key_prefix()
        );
    }

    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{BuildSummary, LogReference};
    use std::cell::RefCell;
    use std::collections::HashMap;

    fn record(name: &str, log_id: Option<u64>) -> TimelineRecord {
        TimelineRecord {
            name: name.to_string(),
            log: log_id.map(|id| LogReference { id }),
        }
    }

    /// Serves log lines by id and remembers which logs were requested.
    #[derive(Default)]
    struct LogSource {
        logs: HashMap<u64, Vec<String>>,
        requested: RefCell<Vec<u64>>,
    }

    impl LogSource {
        fn with_log(mut self, log_id: u64, lines: &[&str]) -> Self {
            self.logs
                .insert(log_id, lines.iter().map(ToString::to_string).collect());
            self
        }
    }

    impl BuildSource for LogSource {
        async fn list_recent_builds(&self, _: u64, _: usize) -> Result<Vec<BuildSummary>> {
            Ok(vec![])
        }

        async fn fetch_timeline(&self, _: BuildId) -> Result<Vec<TimelineRecord>> {
            Ok(vec![])
        }

        async fn fetch_log_lines(&self, _: BuildId, log_id: u64) -> Result<Vec<String>> {
            self.requested.borrow_mut().push(log_id);
            self.logs
                .get(&log_id)
                .cloned()
                .ok_or_else(|| crate::error::UsageError::NotFound(format!("log {log_id}")))
        }

        fn build_url(&self, build_id: BuildId) -> String {
            format!("build/{build_id}")
        }
    }

    fn underlay_marker() -> MarkerSpec {
        MarkerSpec::new("Set underlay type", "AKS_E2E_UNDERLAY_TYPE=")
    }

    #[test]
    fn test_marker_spec_appends_equals() {
        let marker = MarkerSpec::new("Set cluster", "AKS_E2E_CLUSTER");
        assert_eq!(marker.key_prefix(), "AKS_E2E_CLUSTER=");
        assert_eq!(
            MarkerSpec::new("x", "K=").key_prefix(),
            "K=",
            "an existing '=' is not doubled"
        );
    }

    #[test]
    fn test_find_marker_log_skips_records_without_log() {
        let timeline = vec![
            record("Other", Some(1)),
            record("Set underlay type", None),
            record("Set underlay type", Some(7)),
        ];
        assert_eq!(find_marker_log(&timeline, "Set underlay type"), Some(7));
        assert_eq!(find_marker_log(&timeline, "set underlay type"), None);
        assert_eq!(find_marker_log(&[], "Set underlay type"), None);
    }

    #[test]
    fn test_find_marker_value_takes_rest_of_line() {
        let lines = [
            "2023-01-01T00:00:00Z noise",
            "2023-01-01T00:00:01Z export AKS_E2E_UNDERLAY_TYPE=AKS_CLUSTER ",
            "AKS_E2E_UNDERLAY_TYPE=SECOND",
        ];
        assert_eq!(
            find_marker_value(&lines, "AKS_E2E_UNDERLAY_TYPE="),
            Some("AKS_CLUSTER ".to_string())
        );
    }

    #[test]
    fn test_find_marker_value_absent_or_empty() {
        let no_marker: [&str; 1] = ["no marker here"];
        assert_eq!(find_marker_value(&no_marker, "AKS_E2E_UNDERLAY_TYPE="), None);

        let empty: [&str; 0] = [];
        assert_eq!(find_marker_value(&empty, "AKS_E2E_UNDERLAY_TYPE="), None);

        let blank_value = ["AKS_E2E_UNDERLAY_TYPE="];
        assert_eq!(
            find_marker_value(&blank_value, "AKS_E2E_UNDERLAY_TYPE="),
            Some(String::new())
        );
    }

    #[tokio::test]
    async fn test_extract_reads_marker() {
        let source = LogSource::default().with_log(7, &["noise", "AKS_E2E_UNDERLAY_TYPE=AKS_CLUSTER"]);
        let timeline = vec![record("Other", None), record("Set underlay type", Some(7))];

        let value = extract(&source, 1, &timeline, &underlay_marker()).await.unwrap();
        assert_eq!(value.as_deref(), Some("AKS_CLUSTER"));
    }

    #[tokio::test]
    async fn test_extract_without_marker_line() {
        let source = LogSource::default().with_log(7, &["no marker here"]);
        let timeline = vec![record("Other", None), record("Set underlay type", Some(7))];

        let value = extract(&source, 1, &timeline, &underlay_marker()).await.unwrap();
        assert_eq!(value, None);
    }

    #[tokio::test]
    async fn test_extract_consults_only_first_matching_record() {
        let source = LogSource::default()
            .with_log(3, &["AKS_E2E_UNDERLAY_TYPE=FIRST"])
            .with_log(4, &["AKS_E2E_UNDERLAY_TYPE=SECOND"]);
        let timeline = vec![
            record("Set underlay type", Some(3)),
            record("Set underlay type", Some(4)),
        ];

        let value = extract(&source, 1, &timeline, &underlay_marker()).await.unwrap();
        assert_eq!(value.as_deref(), Some("FIRST"));
        assert_eq!(*source.requested.borrow(), vec![3]);
    }

    #[tokio::test]
    async fn test_extract_without_step_fetches_nothing() {
        let source = LogSource::default();
        let timeline = vec![record("Other", Some(1))];

        let value = extract(&source, 1, &timeline, &underlay_marker()).await.unwrap();
        assert_eq!(value, None);
        assert!(source.requested.borrow().is_empty());
    }

    #[tokio::test]
    async fn test_extract_propagates_fetch_failure() {
        let source = LogSource::default();
        let timeline = vec![record("Set underlay type", Some(9))];

        let result = extract(&source, 1, &timeline, &underlay_marker()).await;
        assert!(result.is_err());
    }
}
