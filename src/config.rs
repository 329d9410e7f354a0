use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::UsageError;
use crate::extract::MarkerSpec;

/// Configuration file structure for aks-usage.
///
/// Lets operators pin the server, the markers and the scan window instead of
/// repeating them on every run. Command-line flags still win over file values.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    /// Build server connection
    #[serde(default)]
    pub azure: AzureConfig,

    /// What to look for in build logs
    #[serde(default)]
    pub scan: ScanConfig,

    /// Report preferences
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct AzureConfig {
    /// Azure DevOps base URL
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Organization that owns the pipelines
    #[serde(default = "default_organization")]
    pub organization: String,

    /// Project that owns the pipelines
    #[serde(default = "default_project")]
    pub project: String,

    /// Personal access token; the VSTS_PAT environment variable takes precedence
    pub token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ScanConfig {
    /// Number of recent builds to inspect per pipeline
    #[serde(default = "default_top")]
    pub top: usize,

    /// Underlay type a build must report to be recorded
    #[serde(default = "default_target_underlay_type")]
    pub target_underlay_type: String,

    /// Timeline step whose log carries the underlay marker
    #[serde(default = "default_underlay_record")]
    pub underlay_record: String,

    /// Marker key of the underlay type
    #[serde(default = "default_underlay_key")]
    pub underlay_key: String,

    /// Also record which cluster a build ran on
    #[serde(default)]
    pub extract_cluster: bool,

    /// Timeline step whose log carries the cluster marker
    #[serde(default = "default_cluster_record")]
    pub cluster_record: String,

    /// Marker key of the cluster
    #[serde(default = "default_cluster_key")]
    pub cluster_key: String,

    /// Builds of one pipeline inspected in parallel
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Default report format
    #[serde(default)]
    pub format: OutputFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Csv,
}

impl Default for AzureConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            organization: default_organization(),
            project: default_project(),
            token: None,
        }
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            top: default_top(),
            target_underlay_type: default_target_underlay_type(),
            underlay_record: default_underlay_record(),
            underlay_key: default_underlay_key(),
            extract_cluster: false,
            cluster_record: default_cluster_record(),
            cluster_key: default_cluster_key(),
            concurrency: default_concurrency(),
        }
    }
}

impl ScanConfig {
    /// Rejects values that would make a pass meaningless.
    pub fn validate(&self) -> std::result::Result<(), UsageError> {
        if self.top == 0 {
            return Err(UsageError::Config("top must be at least 1".into()));
        }
        if self.concurrency == 0 {
            return Err(UsageError::Config("concurrency must be at least 1".into()));
        }
        if self.target_underlay_type.is_empty() {
            return Err(UsageError::Config(
                "target-underlay-type must not be empty".into(),
            ));
        }
        if self.underlay_key.trim_end_matches('=').is_empty() {
            return Err(UsageError::Config("underlay-key must not be empty".into()));
        }
        if self.extract_cluster && self.cluster_key.trim_end_matches('=').is_empty() {
            return Err(UsageError::Config("cluster-key must not be empty".into()));
        }
        Ok(())
    }

    pub fn underlay_marker(&self) -> MarkerSpec {
        MarkerSpec::new(&self.underlay_record, &self.underlay_key)
    }

    pub fn cluster_marker(&self) -> Option<MarkerSpec> {
        self.extract_cluster
            .then(|| MarkerSpec::new(&self.cluster_record, &self.cluster_key))
    }
}

fn default_base_url() -> String {
    "https://dev.azure.com".to_string()
}

fn default_organization() -> String {
    "msazure".to_string()
}

fn default_project() -> String {
    "CloudNativeCompute".to_string()
}

fn default_top() -> usize {
    10
}

fn default_target_underlay_type() -> String {
    "AKS_CLUSTER".to_string()
}

fn default_underlay_record() -> String {
    "Set underlay type".to_string()
}

fn default_underlay_key() -> String {
    "AKS_E2E_UNDERLAY_TYPE=".to_string()
}

fn default_cluster_record() -> String {
    "Set cluster".to_string()
}

fn default_cluster_key() -> String {
    "AKS_E2E_CLUSTER=".to_string()
}

fn default_concurrency() -> usize {
    1
}

impl Config {
    /// Load configuration from a file.
    ///
    /// Searches for configuration files in this order:
    /// 1. Specified path
    /// 2. ./aks-usage.toml
    /// 3. ./aks-usage.json
    /// 4. ./aks-usage.yaml
    /// 5. ./aks-usage.yml
    /// 6. `<user config dir>/aks-usage/config.toml`
    ///
    /// Returns default configuration if no file is found.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            if !path.exists() {
                log::warn!(
                    "Config file {} not found, using defaults",
                    path.display()
                );
                return Ok(Self::default());
            }
            return Self::load_from_path(path);
        }

        let candidates = ["aks-usage.toml", "aks-usage.json", "aks-usage.yaml", "aks-usage.yml"];

        for candidate in &candidates {
            let path = Path::new(candidate);
            if path.exists() {
                return Self::load_from_path(path);
            }
        }

        if let Some(path) = user_config_path() {
            if path.exists() {
                return Self::load_from_path(&path);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file path.
    fn load_from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or("");

        let config: Self = match extension {
            "toml" => toml::from_str(&contents)
                .with_context(|| format!("Failed to parse TOML config: {}", path.display()))?,
            "json" => serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display()))?,
            "yaml" | "yml" => serde_yaml::from_str(&contents)
                .with_context(|| format!("Failed to parse YAML config: {}", path.display()))?,
            _ => toml::from_str(&contents)
                .or_else(|_| serde_json::from_str(&contents))
                .or_else(|_| serde_yaml::from_str(&contents))
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?,
        };

        log::debug!("Loaded config from: {}", path.display());
        Ok(config)
    }
}

fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("aks-usage").join("config.toml"))
}
