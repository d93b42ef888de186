//! teamdb — keep the team catalog in step with the simulator and the viewer index.

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use teamdb_engine::{ComputationEngine, SubprocessEngine};
use teamdb_pipeline::config::DEFAULT_CONFIG_FILE;
use teamdb_pipeline::{Outcome, Pipeline, RunOptions, RunReport, TeamdbConfig};
use teamdb_remote::{HttpRemoteStore, RemoteStore};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(
    name = "teamdb",
    version = env!("CARGO_PKG_VERSION"),
    about = "Team database maintenance: recompute stale teams and publish them"
)]
struct Cli {
    /// Path to config file (TOML)
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge submissions, recompute the local catalog and publish it
    Refresh {
        /// Recompute every record, not just stale ones
        #[arg(long)]
        force: bool,
        /// Skip artifact and index uploads
        #[arg(long)]
        no_publish: bool,
        /// Exit non-zero and skip publishing if anything failed
        #[arg(long)]
        strict: bool,
        /// Submission list (default: paths.submissions_file if it exists)
        #[arg(long)]
        submissions: Option<PathBuf>,
        /// Write the run report as JSON
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Recompute every record of the remote index
    Resim {
        #[arg(long)]
        force: bool,
        /// Upload artifacts and the index afterwards
        #[arg(long)]
        publish: bool,
        /// Exit non-zero and skip publishing if anything failed
        #[arg(long)]
        strict: bool,
        /// Where recomputed records are written (default: paths.resim_root)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// JSON dump of the full record list
        #[arg(long, default_value = "results.json")]
        results: PathBuf,
        /// Write the run report as JSON
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Print the engine version fingerprint
    Version,
    /// Dump the default config as TOML
    DumpConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "teamdb=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::DumpConfig => {
            print!("{}", TeamdbConfig::default().to_toml());
        }
        Commands::Version => {
            let config = TeamdbConfig::load(&cli.config);
            println!("{}", engine(&config).version().await?);
        }
        Commands::Refresh { force, no_publish, strict, submissions, report: report_path } => {
            let config = TeamdbConfig::load(&cli.config);
            let text = read_submissions(submissions.as_ref(), &config)?;
            let opts = RunOptions { force, publish: !no_publish, strict };
            require_api_key(&config, opts.publish)?;

            let pipeline = Pipeline::new(config.clone(), engine(&config), store(&config))?;
            let report = pipeline.run_local(&opts, text.as_deref()).await;
            finish(&report, report_path.as_deref(), strict)?;
        }
        Commands::Resim { force, publish, strict, output, results, report: report_path } => {
            let config = TeamdbConfig::load(&cli.config);
            let opts = RunOptions { force, publish, strict };
            require_api_key(&config, opts.publish)?;
            let output = output.unwrap_or_else(|| config.paths.resim_root.clone());

            let pipeline = Pipeline::new(config.clone(), engine(&config), store(&config))?;
            let (report, records) = pipeline.run_resim(&opts, &output).await;
            if report.outcome != Outcome::Failure {
                std::fs::write(&results, serde_json::to_string_pretty(&records)?)
                    .with_context(|| format!("writing {}", results.display()))?;
                info!("wrote {} records to {}", records.len(), results.display());
            }
            finish(&report, report_path.as_deref(), strict)?;
        }
    }
    Ok(())
}

fn engine(config: &TeamdbConfig) -> Arc<dyn ComputationEngine> {
    Arc::new(SubprocessEngine::new(&config.engine.binary).with_timeout(config.engine_timeout()))
}

fn store(config: &TeamdbConfig) -> Arc<dyn RemoteStore> {
    let mut store = HttpRemoteStore::new(&config.remote.base_url)
        .with_timeouts(config.remote.timeouts())
        .with_retry(config.remote.retry.policy());
    if let Some(key) = config.api_key() {
        store = store.with_api_key(key);
    }
    Arc::new(store)
}

/// Submission list text: the explicit file, else the configured one if present.
fn read_submissions(explicit: Option<&PathBuf>, config: &TeamdbConfig) -> anyhow::Result<Option<String>> {
    match explicit {
        Some(path) => std::fs::read_to_string(path)
            .map(Some)
            .with_context(|| format!("reading submissions {}", path.display())),
        None => {
            let path = &config.paths.submissions_file;
            if path.is_file() {
                Ok(Some(std::fs::read_to_string(path)?))
            } else {
                Ok(None)
            }
        }
    }
}

fn require_api_key(config: &TeamdbConfig, publish: bool) -> anyhow::Result<()> {
    if publish && config.api_key().is_none() {
        anyhow::bail!(
            "publishing needs an API key in ${} (or pass --no-publish)",
            config.remote.api_key_env
        );
    }
    Ok(())
}

fn finish(report: &RunReport, report_path: Option<&Path>, strict: bool) -> anyhow::Result<()> {
    for line in report.summary_lines() {
        println!("{}", line);
    }
    if let Some(path) = report_path {
        report
            .write_json(path)
            .with_context(|| format!("writing run report {}", path.display()))?;
        info!("wrote run report to {}", path.display());
    }
    if let Some(e) = &report.error {
        anyhow::bail!("{} aborted: {}", report.command, e);
    }
    if let Some(publish) = &report.publish {
        if let Some(failure) = &publish.failure {
            error!("publishing aborted: {}", failure);
            anyhow::bail!("publishing aborted");
        }
    }
    if strict && report.has_failures() {
        anyhow::bail!("run finished with failures");
    }
    Ok(())
}
