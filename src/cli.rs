use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{info, warn};
use std::path::{Path, PathBuf};

use crate::auth::Token;
use crate::config::{AzureConfig, Config, OutputFormat};
use crate::dataset::{Dataset, DatasetShape};
use crate::engine::{run_pass, ScanContext};
use crate::error::UsageError;
use crate::output::{export_dataset, print_pass_summary, ScanProgress};
use crate::providers::AzureDevOpsClient;

#[derive(Parser)]
#[command(name = "aks-usage")]
#[command(author, version, about = "Gather how often CI builds ran on a given underlay type", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (defaults to ./aks-usage.{toml,json,yaml,yml})
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan recent builds and record the ones that ran on the target underlay
    Count {
        /// Dataset file to update
        #[arg(short, long)]
        file: PathBuf,

        /// Number of recent builds to inspect per pipeline
        #[arg(short = 'n', long)]
        top: Option<usize>,

        /// Underlay type to record
        #[arg(long)]
        target: Option<String>,

        /// Also record the cluster each build ran on
        #[arg(long, default_value_t = false)]
        cluster: bool,

        #[arg(short, long, env = "VSTS_PAT", hide_env_values = true)]
        token: Option<String>,

        #[arg(long)]
        base_url: Option<String>,

        #[arg(short, long)]
        organization: Option<String>,

        #[arg(short = 'P', long)]
        project: Option<String>,

        /// Builds of one pipeline inspected in parallel
        #[arg(long)]
        concurrency: Option<usize>,
    },

    /// Print the recorded builds of every pipeline
    Output {
        #[arg(short, long)]
        file: PathBuf,

        #[arg(long, value_enum)]
        format: Option<OutputFormat>,
    },

    /// Rewrite a dataset that keys builds by id into the list layout
    Convert {
        #[arg(short, long)]
        file: PathBuf,

        /// Defaults to `<file stem>.list.json` next to the input
        #[arg(long)]
        out_file: Option<PathBuf>,
    },
}

/// Overrides taken from the `count` command line.
#[derive(Debug, Default)]
struct CountArgs {
    top: Option<usize>,
    target: Option<String>,
    cluster: bool,
    token: Option<String>,
    base_url: Option<String>,
    organization: Option<String>,
    project: Option<String>,
    concurrency: Option<usize>,
}

impl CountArgs {
    fn apply(self, config: &mut Config) -> Option<String> {
        let scan = &mut config.scan;
        if let Some(top) = self.top {
            scan.top = top;
        }
        if let Some(target) = self.target {
            scan.target_underlay_type = target;
        }
        if self.cluster {
            scan.extract_cluster = true;
        }
        if let Some(concurrency) = self.concurrency {
            scan.concurrency = concurrency;
        }

        let azure = &mut config.azure;
        if let Some(base_url) = self.base_url {
            azure.base_url = base_url;
        }
        if let Some(organization) = self.organization {
            azure.organization = organization;
        }
        if let Some(project) = self.project {
            azure.project = project;
        }

        self.token
    }
}

/// Picks the command-line/environment token over the configured one.
fn resolve_token(flag: Option<&str>, azure: &AzureConfig) -> Result<Token, UsageError> {
    flag.and_then(Token::non_empty)
        .or_else(|| azure.token.as_deref().and_then(Token::non_empty))
        .ok_or(UsageError::MissingToken)
}

async fn execute_count(mut config: Config, file: &Path, args: CountArgs) -> Result<()> {
    let token_flag = args.apply(&mut config);
    config.scan.validate()?;

    // Everything that can fail locally fails before the first request.
    let dataset = Dataset::load(file)?;
    let token = resolve_token(token_flag.as_deref(), &config.azure)?;

    let client = AzureDevOpsClient::new(
        &config.azure.base_url,
        &config.azure.organization,
        &config.azure.project,
        token,
    )?;

    let ctx = ScanContext {
        target_type: config.scan.target_underlay_type.clone(),
        top: config.scan.top,
        underlay: config.scan.underlay_marker(),
        cluster: config.scan.cluster_marker(),
        concurrency: config.scan.concurrency,
    };

    let shape = dataset.shape();
    let mut records = dataset.into_records();

    info!(
        "Scanning {} pipelines in {}/{} for {}",
        records.len(),
        config.azure.organization,
        config.azure.project,
        ctx.target_type
    );

    let mut progress = ScanProgress::start(records.len(), ctx.top);
    let result = run_pass(&client, &ctx, &mut records, |report| {
        progress.pipeline_done(report);
    })
    .await;

    let summary = match result {
        Ok(summary) => {
            progress.finish();
            summary
        }
        Err(e) => {
            progress.abandon();
            if e.is_transient() {
                warn!("Build server request failed; re-running is safe, recorded builds are never duplicated");
            }
            // Nothing is written, so the file still reflects the last
            // complete pass.
            return Err(e).context("Scan aborted, dataset left unchanged");
        }
    };

    Dataset::from_records(records, shape).save(file)?;
    print_pass_summary(&summary, &ctx.target_type);

    Ok(())
}

fn execute_output(config: &Config, file: &Path, format: Option<OutputFormat>) -> Result<()> {
    let records = Dataset::load(file)?.into_records();
    let format = format.unwrap_or(config.output.format);

    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    export_dataset(&records, format, &mut handle)
}

/// `data.json` becomes `data.list.json`.
fn default_out_file(file: &Path) -> PathBuf {
    file.with_extension("list.json")
}

fn execute_convert(file: &Path, out_file: &Path) -> Result<()> {
    if out_file == file {
        return Err(UsageError::Config(format!(
            "convert writes to a new path, got {} for both input and output",
            file.display()
        ))
        .into());
    }

    let dataset = Dataset::load(file)?;

    if dataset.shape() == DatasetShape::Sequence {
        warn!(
            "{} already lists builds in sequence; rewriting it unchanged",
            file.display()
        );
    }

    let records = dataset.into_records();
    Dataset::from_records(records, DatasetShape::Sequence).save(out_file)?;
    info!("Converted {} -> {}", file.display(), out_file.display());

    Ok(())
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        let config = Config::load(self.config.as_deref())?;

        match self.command {
            Commands::Count {
                file,
                top,
                target,
                cluster,
                token,
                base_url,
                organization,
                project,
                concurrency,
            } => {
                let args = CountArgs {
                    top,
                    target,
                    cluster,
                    token,
                    base_url,
                    organization,
                    project,
                    concurrency,
                };
                execute_count(config, &file, args).await
            }
            Commands::Output { file, format } => execute_output(&config, &file, format),
            Commands::Convert { file, out_file } => {
                let out_file = out_file.unwrap_or_else(|| default_out_file(&file));
                execute_convert(&file, &out_file)
            }
        }
    }
}
