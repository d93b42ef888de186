//! Submission merger — fold externally submitted configurations into the catalog.
//!
//! A submission names a shared result by reference. Its roster decides the
//! catalog name it matches; an existing record takes the new configuration
//! and accretes the author, a new one is filed under the bucket of the
//! character that dealt the most damage.

use crate::catalog;
use serde::Serialize;
use std::path::{Path, PathBuf};
use teamdb_core::{ConfigNormalizer, Error, IdentityRegistry, Record, Result, SubmissionData};
use tracing::{info, warn};

const FIELD_SEPARATOR: char = '~';
const AUTHOR_SEPARATOR: &str = " and ";

/// One line of the submission list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Submission {
    pub reference: String,
    pub author: String,
    pub description: String,
}

impl Submission {
    /// Parse `reference~author~description`.
    ///
    /// Blank lines yield `None`. With more than three fields the inner ones
    /// are joined back into the author.
    pub fn parse_line(line: &str) -> Result<Option<Self>> {
        let line = line.trim_end_matches(['\r', '\n']);
        if line.trim().is_empty() {
            return Ok(None);
        }
        let fields: Vec<&str> = line.split(FIELD_SEPARATOR).collect();
        if fields.len() < 3 {
            return Err(Error::decode(
                "submission line",
                format!("expected reference~author~description, got {:?}", line),
            ));
        }
        let last = fields.len() - 1;
        Ok(Some(Self {
            reference: fields[0].trim().to_string(),
            author: fields[1..last].concat(),
            description: fields[last].to_string(),
        }))
    }
}

/// Parse a whole submission list. Bad lines come back as errors tagged with
/// their 1-based line number, alongside the good ones.
pub fn parse_submissions(text: &str) -> (Vec<Submission>, Vec<(usize, Error)>) {
    let mut submissions = Vec::new();
    let mut errors = Vec::new();
    for (i, line) in text.lines().enumerate() {
        match Submission::parse_line(line) {
            Ok(Some(s)) => submissions.push(s),
            Ok(None) => {}
            Err(e) => errors.push((i + 1, e)),
        }
    }
    (submissions, errors)
}

/// Add `incoming` to an attribution chain.
///
/// `"A"` + `"B"` is `"A and B"`; `"A and B"` + `"C"` is `"A, B and C"`.
/// An author already in the chain leaves it unchanged.
pub fn merge_author(existing: &str, incoming: &str) -> String {
    let incoming = incoming.trim();
    if incoming.is_empty() || existing.contains(incoming) {
        return existing.to_string();
    }
    if existing.trim().is_empty() {
        return incoming.to_string();
    }
    if !existing.contains(AUTHOR_SEPARATOR) {
        return format!("{}{}{}", existing, AUTHOR_SEPARATOR, incoming);
    }
    format!(
        "{}{}{}",
        existing.replacen(AUTHOR_SEPARATOR, ", ", 1),
        AUTHOR_SEPARATOR,
        incoming
    )
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(tag = "outcome", content = "location", rename_all = "snake_case")]
pub enum MergeOutcome {
    /// No matching record; a new pending one was written.
    Created(PathBuf),
    /// The matching record took the submission and is now pending.
    Updated(PathBuf),
    /// The matching record was already updated this pass; nothing changed.
    AlreadyUpdated(PathBuf),
}

impl MergeOutcome {
    pub fn location(&self) -> &Path {
        match self {
            Self::Created(p) | Self::Updated(p) | Self::AlreadyUpdated(p) => p,
        }
    }
}

impl std::fmt::Display for MergeOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Created(p) => write!(f, "created {}", p.display()),
            Self::Updated(p) => write!(f, "updated {}", p.display()),
            Self::AlreadyUpdated(p) => write!(f, "already updated, skipping {}", p.display()),
        }
    }
}

pub struct SubmissionMerger<'a> {
    root: &'a Path,
    registry: &'a IdentityRegistry,
    normalizer: &'a ConfigNormalizer,
}

impl<'a> SubmissionMerger<'a> {
    pub fn new(
        root: &'a Path,
        registry: &'a IdentityRegistry,
        normalizer: &'a ConfigNormalizer,
    ) -> Self {
        Self { root, registry, normalizer }
    }

    /// Merge one submission whose payload has already been retrieved.
    pub async fn merge(&self, submission: &Submission, data: &SubmissionData) -> Result<MergeOutcome> {
        let name = self.registry.team_name(&data.character_names())?;
        let config = self.normalizer.normalize(&data.config);

        if let Some(path) = catalog::find_location(self.root, &name) {
            let mut record = catalog::read_record(&path)?;
            if record.is_pending() {
                warn!("{} already updated this pass, skipping {}", path.display(), submission.reference);
                return Ok(MergeOutcome::AlreadyUpdated(path));
            }
            apply(&mut record, submission, config);
            catalog::write_record(&record, &path).await?;
            info!("updated {} from {}", path.display(), submission.reference);
            return Ok(MergeOutcome::Updated(path));
        }

        let top = data.top_contributor().ok_or_else(|| {
            Error::decode(
                submission.reference.clone(),
                "no single-target damage breakdown to pick a bucket from",
            )
        })?;
        let bucket = self.registry.bucket_for(&top.name)?;
        let path = self.root.join(bucket).join(format!("{}.yaml", name));

        let record = Record::new(config, submission.author.clone(), submission.description.clone());
        catalog::write_record(&record, &path).await?;
        info!("created {} from {}", path.display(), submission.reference);
        Ok(MergeOutcome::Created(path))
    }
}

/// Take a submission into an existing record and mark it pending.
fn apply(record: &mut Record, submission: &Submission, config: String) {
    record.fingerprint.clear();
    record.config = config;
    if !submission.description.is_empty() {
        record.description = submission.description.clone();
    }
    record.author = merge_author(&record.author, &submission.author);
}
