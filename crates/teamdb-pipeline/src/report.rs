//! Run report — structured outcome of every pipeline pass.

use crate::catalog::LoadFailure;
use crate::merger::MergeOutcome;
use crate::publisher::PublishReport;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;
use teamdb_core::{Error, Result};

#[derive(Serialize, Clone, Debug)]
pub struct RunReport {
    pub run_id: String,
    pub command: String,
    pub fingerprint: String,
    pub started: DateTime<Utc>,
    pub ended: Option<DateTime<Utc>>,
    pub outcome: Outcome,
    pub records: Vec<RecordEntry>,
    pub submissions: Vec<SubmissionEntry>,
    pub load_failures: Vec<LoadFailure>,
    pub publish: Option<PublishReport>,
    /// The error that stopped the pass, when it did not run to the end.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub total_wall_ms: u64,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Pending,
    Success,
    Partial,
    Failure,
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Success => write!(f, "success"),
            Self::Partial => write!(f, "partial"),
            Self::Failure => write!(f, "failure"),
        }
    }
}

#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    Skipped,
    Recomputed,
    Failed,
}

#[derive(Serialize, Clone, Debug)]
pub struct RecordEntry {
    pub record: String,
    pub status: RecordStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Serialize, Clone, Debug)]
pub struct SubmissionEntry {
    pub reference: String,
    #[serde(flatten)]
    pub outcome: Option<MergeOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RunReport {
    pub fn new(command: &str) -> Self {
        let started = Utc::now();
        Self {
            run_id: format!("{}-{}", command, started.format("%Y%m%dT%H%M%S")),
            command: command.into(),
            fingerprint: String::new(),
            started,
            ended: None,
            outcome: Outcome::Pending,
            records: Vec::new(),
            submissions: Vec::new(),
            load_failures: Vec::new(),
            publish: None,
            error: None,
            total_wall_ms: 0,
        }
    }

    pub fn skipped(&mut self, label: String) {
        self.records.push(RecordEntry { record: label, status: RecordStatus::Skipped, kind: None, error: None });
    }

    pub fn recomputed(&mut self, label: String) {
        self.records.push(RecordEntry { record: label, status: RecordStatus::Recomputed, kind: None, error: None });
    }

    pub fn failed(&mut self, label: String, error: &Error) {
        self.records.push(RecordEntry {
            record: label,
            status: RecordStatus::Failed,
            kind: Some(error.kind().into()),
            error: Some(error.to_string()),
        });
    }

    pub fn merged(&mut self, reference: &str, outcome: MergeOutcome) {
        self.submissions.push(SubmissionEntry {
            reference: reference.into(),
            outcome: Some(outcome),
            error: None,
        });
    }

    pub fn merge_failed(&mut self, reference: &str, error: &Error) {
        self.submissions.push(SubmissionEntry {
            reference: reference.into(),
            outcome: None,
            error: Some(error.to_string()),
        });
    }

    pub fn count(&self, status: RecordStatus) -> usize {
        self.records.iter().filter(|r| r.status == status).count()
    }

    /// True if the pass aborted or any record, submission, catalog entry or
    /// publish step failed.
    pub fn has_failures(&self) -> bool {
        self.error.is_some()
            || self.count(RecordStatus::Failed) > 0
            || self.submissions.iter().any(|s| s.error.is_some())
            || !self.load_failures.is_empty()
            || self.publish.as_ref().is_some_and(|p| p.failure.is_some())
    }

    /// Close the report; the outcome follows from what was recorded.
    pub fn finalize(&mut self) {
        if self.outcome == Outcome::Pending {
            self.outcome = if self.has_failures() { Outcome::Partial } else { Outcome::Success };
        }
        self.close();
    }

    /// Close the report after a fatal error.
    pub fn abort(&mut self, error: &Error) {
        self.error = Some(error.to_string());
        self.outcome = Outcome::Failure;
        self.close();
    }

    fn close(&mut self) {
        let ended = Utc::now();
        self.total_wall_ms = (ended - self.started).num_milliseconds().max(0) as u64;
        self.ended = Some(ended);
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Human-readable summary, one line per notable event.
    pub fn summary_lines(&self) -> Vec<String> {
        let mut lines = vec![format!(
            "{} [{}] engine {}: {} recomputed, {} skipped, {} failed",
            self.run_id,
            self.outcome,
            if self.fingerprint.is_empty() { "?" } else { self.fingerprint.as_str() },
            self.count(RecordStatus::Recomputed),
            self.count(RecordStatus::Skipped),
            self.count(RecordStatus::Failed),
        )];
        if let Some(e) = &self.error {
            lines.push(format!("aborted: {}", e));
        }
        for s in &self.submissions {
            match (&s.outcome, &s.error) {
                (Some(outcome), _) => lines.push(format!("submission {}: {}", s.reference, outcome)),
                (None, Some(e)) => lines.push(format!("submission {} failed: {}", s.reference, e)),
                (None, None) => {}
            }
        }
        for f in &self.load_failures {
            lines.push(format!("unreadable {}: {}", f.path.display(), f.message));
        }
        for r in self.records.iter().filter(|r| r.status == RecordStatus::Failed) {
            lines.push(format!("failed {}: {}", r.record, r.error.as_deref().unwrap_or_default()));
        }
        if let Some(p) = &self.publish {
            lines.push(format!(
                "published {} artifacts ({} without archive), index {}",
                p.published.len(),
                p.skipped.len(),
                if p.index_uploaded { "uploaded" } else { "not uploaded" },
            ));
            if let Some(f) = &p.failure {
                lines.push(format!("publish aborted: {}", f));
            }
        }
        lines
    }
}
