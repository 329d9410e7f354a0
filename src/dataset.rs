//! On-disk dataset of tracked pipelines and the builds retained for them.
//!
//! Two shapes exist on disk. The older one keys builds by id in a JSON
//! object; the current one stores them as an array. Both load into the same
//! in-memory [`PipelineRecord`] and the shape is remembered so `count` can
//! write back what it read.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::error::{Result, UsageError};

pub type BuildId = u64;

/// One retained build outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildRecord {
    pub build_id: BuildId,
    pub underlay_type: String,
    pub result: String,
    /// Completion date as `YYYY-MM-DD`.
    pub time: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster: Option<String>,
}

/// A tracked pipeline together with every build retained for it so far.
///
/// Builds are keyed by id, so an id can only ever appear once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineRecord {
    pub name: String,
    pub pipeline_id: u64,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub builds: IndexMap<BuildId, BuildRecord>,
}

impl PipelineRecord {
    pub fn new(name: impl Into<String>, pipeline_id: u64) -> Self {
        Self {
            name: name.into(),
            pipeline_id,
            builds: IndexMap::new(),
        }
    }

    /// Builds ordered by completion date, ascending. Equal dates keep their
    /// stored order.
    pub fn builds_by_time(&self) -> Vec<&BuildRecord> {
        let mut builds: Vec<&BuildRecord> = self.builds.values().collect();
        builds.sort_by(|a, b| a.time.cmp(&b.time));
        builds
    }
}

/// Pipeline entry of the sequence-shaped file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequencePipeline {
    pub name: String,
    pub pipeline_id: u64,
    #[serde(default)]
    pub builds: Vec<BuildRecord>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetShape {
    Keyed,
    Sequence,
}

/// A dataset exactly as it is laid out on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dataset {
    Keyed(Vec<PipelineRecord>),
    Sequence(Vec<SequencePipeline>),
}

impl Dataset {
    pub fn shape(&self) -> DatasetShape {
        match self {
            Self::Keyed(_) => DatasetShape::Keyed,
            Self::Sequence(_) => DatasetShape::Sequence,
        }
    }

    /// Lifts either shape into the in-memory representation.
    pub fn into_records(self) -> Vec<PipelineRecord> {
        match self {
            Self::Keyed(records) => records,
            Self::Sequence(pipelines) => from_sequence(pipelines),
        }
    }

    /// Lays records out in the requested on-disk shape.
    pub fn from_records(records: Vec<PipelineRecord>, shape: DatasetShape) -> Self {
        match shape {
            DatasetShape::Keyed => Self::Keyed(records),
            DatasetShape::Sequence => Self::Sequence(to_sequence(&records)),
        }
    }

    pub fn parse(contents: &str) -> serde_json::Result<Self> {
        match serde_json::from_str::<Vec<SequencePipeline>>(contents) {
            Ok(pipelines) => Ok(Self::Sequence(pipelines)),
            Err(sequence_err) => serde_json::from_str::<Vec<PipelineRecord>>(contents)
                .map(Self::Keyed)
                // Report the sequence error when neither shape fits, since
                // that is the current format.
                .map_err(|_| sequence_err),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        let mut json = match self {
            Self::Keyed(records) => serde_json::to_string_pretty(records)?,
            Self::Sequence(pipelines) => serde_json::to_string_pretty(pipelines)?,
        };
        json.push('\n');
        Ok(json)
    }

    /// Reads and parses the dataset at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`UsageError::DatasetNotFound`] when the file does not exist and
    /// [`UsageError::Dataset`] when it is not a dataset in either shape.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(UsageError::DatasetNotFound(path.to_path_buf()));
        }

        let contents = fs::read_to_string(path)?;
        let dataset = Self::parse(&contents).map_err(|source| UsageError::Dataset {
            path: path.to_path_buf(),
            source,
        })?;

        debug!(
            "Loaded {:?}-shaped dataset from {}",
            dataset.shape(),
            path.display()
        );

        Ok(dataset)
    }

    /// Writes the dataset to `path`, replacing any existing file in one step.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = self.to_json()?;

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let mut file = NamedTempFile::new_in(&dir)?;
        // The temp file is created private; an existing dataset keeps its mode.
        if let Ok(metadata) = fs::metadata(path) {
            file.as_file().set_permissions(metadata.permissions())?;
        }
        file.write_all(json.as_bytes())?;
        file.as_file().sync_all()?;
        file.persist(path).map_err(|e| UsageError::Persist {
            path: path.to_path_buf(),
            source: e.error,
        })?;

        info!("Dataset written to: {}", path.display());
        Ok(())
    }
}

/// Converts keyed records into the sequence shape, keeping stored order.
pub fn to_sequence(records: &[PipelineRecord]) -> Vec<SequencePipeline> {
    records
        .iter()
        .map(|record| SequencePipeline {
            name: record.name.clone(),
            pipeline_id: record.pipeline_id,
            builds: record.builds.values().cloned().collect(),
        })
        .collect()
}

/// Converts sequence-shaped pipelines into keyed records. If an id repeats,
/// the first occurrence wins.
pub fn from_sequence(pipelines: Vec<SequencePipeline>) -> Vec<PipelineRecord> {
    pipelines
        .into_iter()
        .map(|pipeline| {
            let mut record = PipelineRecord::new(pipeline.name, pipeline.pipeline_id);
            for build in pipeline.builds {
                record.builds.entry(build.build_id).or_insert(build);
            }
            record
        })
        .collect()
}
