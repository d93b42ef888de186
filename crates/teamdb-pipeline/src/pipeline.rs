//! Pipeline — catalog load, freshness gate, recompute, archive, persist, publish.
//!
//! Records are processed one at a time. A record is recomputed on a copy and
//! only replaced once its computation, archive and file write all succeeded,
//! so a failure leaves it exactly as it was loaded.

use crate::catalog;
use crate::config::TeamdbConfig;
use crate::freshness::needs_recompute;
use crate::merger::{parse_submissions, MergeOutcome, Submission, SubmissionMerger};
use crate::publisher::Publisher;
use crate::report::RunReport;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use teamdb_core::{ComputationResult, Error, IdentityRegistry, Record, Result};
use teamdb_engine::{ComputationAdapter, ComputationEngine, ScratchDir};
use teamdb_remote::RemoteStore;
use tracing::{debug, error, info, warn};

/// Flags of one pass.
#[derive(Clone, Debug, Default)]
pub struct RunOptions {
    /// Recompute every record regardless of its fingerprint.
    pub force: bool,
    /// Upload artifacts and the index after processing.
    pub publish: bool,
    /// Any failure skips publishing.
    pub strict: bool,
}

pub struct Pipeline {
    engine: Arc<dyn ComputationEngine>,
    store: Arc<dyn RemoteStore>,
    adapter: ComputationAdapter,
    registry: IdentityRegistry,
    config: TeamdbConfig,
}

impl Pipeline {
    pub fn new(
        config: TeamdbConfig,
        engine: Arc<dyn ComputationEngine>,
        store: Arc<dyn RemoteStore>,
    ) -> Result<Self> {
        let adapter = ComputationAdapter::new(engine.clone(), config.normalizer()?);
        Ok(Self {
            engine,
            store,
            adapter,
            registry: IdentityRegistry::builtin(),
            config,
        })
    }

    /// Version of the engine build, the fingerprint records are compared against.
    pub async fn fingerprint(&self) -> Result<String> {
        let version = self.engine.version().await?;
        info!("engine version {}", version);
        Ok(version)
    }

    // ============================================================
    // Entry points
    // ============================================================

    /// Local pass: merge submissions, refresh the catalog, publish.
    ///
    /// A stage error that stops the pass is recorded in the report, whose
    /// outcome is then [`Outcome::Failure`](crate::report::Outcome::Failure).
    pub async fn run_local(&self, opts: &RunOptions, submissions: Option<&str>) -> RunReport {
        let mut report = RunReport::new("refresh");
        let pass = self.local_pass(opts, submissions, &mut report).await;
        close(&mut report, pass);
        report
    }

    /// Remote-index pass: recompute every indexed record under `output_root`.
    ///
    /// Returns the report and the full record list, empty if the index could
    /// not be loaded.
    pub async fn run_resim(&self, opts: &RunOptions, output_root: &Path) -> (RunReport, Vec<Record>) {
        let mut report = RunReport::new("resim");
        let mut records = Vec::new();
        let pass = self.resim_pass(opts, output_root, &mut records, &mut report).await;
        close(&mut report, pass);
        (report, records)
    }

    async fn local_pass(
        &self,
        opts: &RunOptions,
        submissions: Option<&str>,
        report: &mut RunReport,
    ) -> Result<()> {
        report.fingerprint = self.fingerprint().await?;
        let fingerprint = report.fingerprint.clone();

        if let Some(text) = submissions {
            self.ingest_submissions(text, report).await;
        }

        let root = &self.config.paths.catalog_root;
        let load = catalog::load_catalog(root);
        report.load_failures = load.failures;
        let mut records = load.records;

        self.process(&mut records, &fingerprint, opts, root, report).await?;
        self.maybe_publish(&mut records, opts, report).await;
        Ok(())
    }

    async fn resim_pass(
        &self,
        opts: &RunOptions,
        output_root: &Path,
        records: &mut Vec<Record>,
        report: &mut RunReport,
    ) -> Result<()> {
        report.fingerprint = self.fingerprint().await?;
        let fingerprint = report.fingerprint.clone();

        let entries = self.store.fetch_index().await?;
        info!("remote index holds {} entries", entries.len());
        *records = catalog::from_index(
            entries,
            self.adapter.normalizer(),
            self.config.resim.config_suffix.as_deref(),
        );

        self.process(records, &fingerprint, opts, output_root, report).await?;
        self.maybe_publish(records, opts, report).await;
        Ok(())
    }

    // ============================================================
    // Stages
    // ============================================================

    /// Fetch and merge every submission listed in `text`, one per line.
    pub async fn ingest_submissions(&self, text: &str, report: &mut RunReport) {
        let merger = SubmissionMerger::new(
            &self.config.paths.catalog_root,
            &self.registry,
            self.adapter.normalizer(),
        );
        let (submissions, errors) = parse_submissions(text);
        for (line, e) in errors {
            warn!("submission line {}: {}", line, e);
            report.merge_failed(&format!("line {}", line), &e);
        }

        for submission in &submissions {
            match self.merge_one(&merger, submission).await {
                Ok(outcome) => report.merged(&submission.reference, outcome),
                Err(e) => {
                    warn!("submission {} failed: {}", submission.reference, e);
                    report.merge_failed(&submission.reference, &e);
                }
            }
        }
    }

    async fn merge_one(
        &self,
        merger: &SubmissionMerger<'_>,
        submission: &Submission,
    ) -> Result<MergeOutcome> {
        let data = self.store.fetch_submission(&submission.reference).await?;
        merger.merge(submission, &data).await
    }

    /// Recompute stale records, archive their output and write them back.
    ///
    /// Records without a location are filed under `root` by team.
    pub async fn process(
        &self,
        records: &mut [Record],
        fingerprint: &str,
        opts: &RunOptions,
        root: &Path,
        report: &mut RunReport,
    ) -> Result<()> {
        let scratch = ScratchDir::create(&self.config.paths.scratch_dir)?;
        let mut placed: HashSet<PathBuf> = records.iter().filter_map(|r| r.location.clone()).collect();

        for record in records.iter_mut() {
            let label = record.label();
            if !needs_recompute(record, fingerprint, opts.force) {
                debug!("{} is current", label);
                report.skipped(label);
                continue;
            }

            let mut candidate = record.clone();
            match self.refresh(&mut candidate, fingerprint, &scratch, root, &mut placed).await {
                Ok(()) => {
                    *record = candidate;
                    report.recomputed(label);
                }
                Err(e) => {
                    warn!("{} failed: {}", label, e);
                    report.failed(label, &e);
                }
            }
        }
        Ok(())
    }

    async fn refresh(
        &self,
        record: &mut Record,
        fingerprint: &str,
        scratch: &ScratchDir,
        root: &Path,
        placed: &mut HashSet<PathBuf>,
    ) -> Result<()> {
        let computation = self.adapter.recompute(record, fingerprint, scratch).await?;
        let location = match &record.location {
            Some(path) => path.clone(),
            None => self.relocate(&computation.result, root, placed)?,
        };

        let archive = catalog::write_record_with_archive(record, &location, &computation.raw).await?;
        record.archive = Some(archive);
        record.location = Some(location);
        Ok(())
    }

    /// Storage location for a record that has none: `<root>/<bucket>/<team>.yaml`,
    /// with a numeric suffix if another record took that name this pass.
    fn relocate(
        &self,
        result: &ComputationResult,
        root: &Path,
        placed: &mut HashSet<PathBuf>,
    ) -> Result<PathBuf> {
        let top = result
            .top_contributor()
            .ok_or_else(|| Error::decode("engine result", "no single-target damage to pick a bucket from"))?;
        let dir = root.join(self.registry.bucket_for(&top.name)?);
        let name = self.registry.team_name(&result.character_names())?;

        let mut path = dir.join(format!("{}.yaml", name));
        let mut n = 2;
        while placed.contains(&path) {
            path = dir.join(format!("{}-{}.yaml", name, n));
            n += 1;
        }
        placed.insert(path.clone());
        Ok(path)
    }

    async fn maybe_publish(&self, records: &mut [Record], opts: &RunOptions, report: &mut RunReport) {
        if !opts.publish {
            return;
        }
        if opts.strict && report.has_failures() {
            warn!("strict mode: not publishing after failures");
            return;
        }
        self.publish(records, report).await;
    }

    /// Upload changed records and the index, then persist newly assigned identity keys.
    pub async fn publish(&self, records: &mut [Record], report: &mut RunReport) {
        let before: Vec<String> = records.iter().map(|r| r.viewer_key.clone()).collect();
        let publisher = Publisher::new(self.store.clone(), self.config.publish.description_tag.clone());
        let outcome = publisher.publish(records).await;

        for (record, old_key) in records.iter().zip(before) {
            if record.viewer_key == old_key {
                continue;
            }
            let Some(location) = &record.location else {
                continue;
            };
            if let Err(e) = catalog::write_record(record, location).await {
                warn!("could not persist identity of {}: {}", record.label(), e);
                report.failed(record.label(), &e);
            }
        }
        report.publish = Some(outcome);
    }
}

fn close(report: &mut RunReport, pass: Result<()>) {
    match pass {
        Ok(()) => report.finalize(),
        Err(e) => {
            error!("{} aborted: {}", report.command, e);
            report.abort(&e);
        }
    }
}
