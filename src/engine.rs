//! The usage scan: list recent builds, read their markers, keep the ones that
//! ran on the target underlay.

use chrono::Local;
use futures::{stream, StreamExt, TryStreamExt};
use log::{debug, info};

use crate::dataset::{BuildId, BuildRecord, PipelineRecord};
use crate::error::Result;
use crate::extract::{extract, MarkerSpec};
use crate::providers::{BuildSource, BuildStatus, BuildSummary};
use crate::store::{merge, MergeOutcome};

/// Settings for one scan pass.
#[derive(Debug, Clone)]
pub struct ScanContext {
    /// Underlay type a build must report to be retained.
    pub target_type: String,
    /// How many recent builds to inspect per pipeline.
    pub top: usize,
    pub underlay: MarkerSpec,
    /// Second marker, read only when set.
    pub cluster: Option<MarkerSpec>,
    /// Builds of one pipeline inspected at the same time.
    pub concurrency: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildOutcome {
    /// Not completed yet, logs were not read.
    Skipped,
    /// Completed, but the underlay type is missing or different.
    Rejected,
    Added,
    AlreadyPresent,
}

impl From<MergeOutcome> for BuildOutcome {
    fn from(outcome: MergeOutcome) -> Self {
        match outcome {
            MergeOutcome::Added => Self::Added,
            MergeOutcome::AlreadyPresent => Self::AlreadyPresent,
        }
    }
}

/// What happened to one build during a pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildReport {
    pub pipeline_id: u64,
    pub build_id: BuildId,
    pub status: BuildStatus,
    pub result: String,
    pub underlay_type: Option<String>,
    pub cluster: Option<String>,
    pub outcome: BuildOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineReport {
    pub pipeline_id: u64,
    pub name: String,
    pub builds: Vec<BuildReport>,
}

impl PipelineReport {
    pub fn count(&self, outcome: BuildOutcome) -> usize {
        self.builds.iter().filter(|b| b.outcome == outcome).count()
    }

    /// Distinct underlay types reported by completed builds, in first-seen
    /// order.
    pub fn types_seen(&self) -> Vec<&str> {
        let mut types: Vec<&str> = Vec::new();
        for value in self.builds.iter().filter_map(|b| b.underlay_type.as_deref()) {
            if !types.contains(&value) {
                types.push(value);
            }
        }
        types
    }

    pub fn still_running(&self) -> usize {
        self.builds
            .iter()
            .filter(|b| b.status == BuildStatus::InProgress)
            .count()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassSummary {
    pub pipelines: Vec<PipelineReport>,
}

impl PassSummary {
    pub fn observed(&self) -> usize {
        self.pipelines.iter().map(|p| p.builds.len()).sum()
    }

    pub fn count(&self, outcome: BuildOutcome) -> usize {
        self.pipelines.iter().map(|p| p.count(outcome)).sum()
    }
}

/// A build is retained only when it completed and reported exactly the
/// target underlay type.
pub fn qualifies(status: BuildStatus, extracted: Option<&str>, target: &str) -> bool {
    status == BuildStatus::Completed && extracted == Some(target)
}

/// Marker values read from one build's logs.
struct Observation {
    build: BuildSummary,
    underlay_type: Option<String>,
    cluster: Option<String>,
}

async fn observe<S: BuildSource>(
    source: &S,
    ctx: &ScanContext,
    build: BuildSummary,
) -> Result<Observation> {
    if build.status != BuildStatus::Completed {
        return Ok(Observation {
            build,
            underlay_type: None,
            cluster: None,
        });
    }

    let timeline = source.fetch_timeline(build.id).await?;
    let underlay_type = extract(source, build.id, &timeline, &ctx.underlay).await?;
    let cluster = match &ctx.cluster {
        Some(marker) => extract(source, build.id, &timeline, marker).await?,
        None => None,
    };

    Ok(Observation {
        build,
        underlay_type,
        cluster,
    })
}

fn build_record<S: BuildSource>(source: &S, observation: &Observation, result: &str) -> BuildRecord {
    let build = &observation.build;
    BuildRecord {
        build_id: build.id,
        underlay_type: observation.underlay_type.clone().unwrap_or_default(),
        result: result.to_string(),
        time: build
            .finish_time
            .map(|t| t.with_timezone(&Local).format("%Y-%m-%d").to_string())
            .unwrap_or_default(),
        url: source.build_url(build.id),
        cluster: observation.cluster.clone(),
    }
}

/// Scans the recent builds of one pipeline and merges the qualifying ones.
///
/// Log reads may overlap up to `ctx.concurrency`, but merging happens one
/// build at a time in the order the server listed them.
///
/// # Errors
///
/// Any failure of the build source is returned as is. Builds merged before
/// the failure stay in `record`; callers that want all-or-nothing behaviour
/// should discard it.
pub async fn scan_pipeline<S: BuildSource>(
    source: &S,
    ctx: &ScanContext,
    record: &mut PipelineRecord,
) -> Result<PipelineReport> {
    let builds = source
        .list_recent_builds(record.pipeline_id, ctx.top)
        .await?;

    let observations: Vec<Observation> = stream::iter(builds)
        .map(|build| observe(source, ctx, build))
        .buffered(ctx.concurrency.max(1))
        .try_collect()
        .await?;

    let mut reports = Vec::with_capacity(observations.len());

    for observation in observations {
        let build = &observation.build;
        let result = build.result.clone().unwrap_or_else(|| "none".to_string());

        let outcome = if build.status != BuildStatus::Completed {
            debug!("Build {}: status={}, skipped", build.id, build.status);
            BuildOutcome::Skipped
        } else if qualifies(
            build.status,
            observation.underlay_type.as_deref(),
            &ctx.target_type,
        ) {
            let candidate = build_record(source, &observation, &result);
            let outcome = merge(record, candidate);
            if outcome == MergeOutcome::Added {
                info!(
                    "Build {} added to pipeline {} ({})",
                    build.id, record.pipeline_id, record.name
                );
            }
            outcome.into()
        } else {
            BuildOutcome::Rejected
        };

        if build.status == BuildStatus::Completed {
            debug!(
                "Build {}: status={}, result={}, type={}, pipeline={}, cluster={}",
                build.id,
                build.status,
                result,
                observation.underlay_type.as_deref().unwrap_or(""),
                record.pipeline_id,
                observation.cluster.as_deref().unwrap_or("")
            );
        }

        reports.push(BuildReport {
            pipeline_id: record.pipeline_id,
            build_id: build.id,
            status: build.status,
            result,
            underlay_type: observation.underlay_type,
            cluster: observation.cluster,
            outcome,
        });
    }

    Ok(PipelineReport {
        pipeline_id: record.pipeline_id,
        name: record.name.clone(),
        builds: reports,
    })
}

/// Runs one pass over every pipeline, in order.
///
/// `on_pipeline` is called after each pipeline finishes, which lets the
/// caller report progress. The first failure stops the pass.
pub async fn run_pass<S, F>(
    source: &S,
    ctx: &ScanContext,
    records: &mut [PipelineRecord],
    mut on_pipeline: F,
) -> Result<PassSummary>
where
    S: BuildSource,
    F: FnMut(&PipelineReport),
{
    let mut summary = PassSummary::default();

    for record in records.iter_mut() {
        let report = scan_pipeline(source, ctx, record).await?;
        on_pipeline(&report);
        summary.pipelines.push(report);
    }

    info!(
        "Pass finished: {} builds observed, {} added",
        summary.observed(),
        summary.count(BuildOutcome::Added)
    );

    Ok(summary)
}
