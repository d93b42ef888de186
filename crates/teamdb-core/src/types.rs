//! Catalog record types

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Talent levels of a team member
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Talents {
    #[serde(default)]
    pub attack: u32,
    #[serde(default)]
    pub skill: u32,
    #[serde(default)]
    pub burst: u32,
}

/// One character of a team, as projected from an engine result
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct TeamMember {
    pub name: String,
    #[serde(default)]
    pub con: u32,
    #[serde(default)]
    pub weapon: String,
    #[serde(default)]
    pub refine: u32,
    /// Energy recharge; the regeneration statistic of the member.
    #[serde(default)]
    pub er: f64,
    #[serde(default)]
    pub talents: Talents,
}

/// A named team configuration plus its cached computed results.
///
/// The persisted field names match the on-disk catalog and the remote index.
/// `location`, `archive` and `changed` are run-local and never serialized.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Record {
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub config: String,
    #[serde(default)]
    pub description: String,
    /// Engine version that produced the cached fields. Empty means pending.
    #[serde(default, rename = "hash")]
    pub fingerprint: String,
    #[serde(default)]
    pub team: Vec<TeamMember>,
    /// Mean damage per second.
    #[serde(default)]
    pub dps: f64,
    #[serde(default)]
    pub mode: String,
    /// Mean simulated duration.
    #[serde(default)]
    pub duration: f64,
    #[serde(default)]
    pub target_count: usize,
    /// Identity key assigned by the remote store.
    #[serde(default)]
    pub viewer_key: String,

    #[serde(skip)]
    pub location: Option<PathBuf>,
    #[serde(skip)]
    pub archive: Option<PathBuf>,
    #[serde(skip)]
    pub changed: bool,
}

impl Record {
    pub fn new(
        config: impl Into<String>,
        author: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            config: config.into(),
            author: author.into(),
            description: description.into(),
            ..Default::default()
        }
    }

    pub fn with_location(mut self, location: impl Into<PathBuf>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// True when the record is waiting for its first (or a forced) recomputation.
    pub fn is_pending(&self) -> bool {
        self.fingerprint.is_empty()
    }

    /// Human-readable identity used in logs and reports.
    pub fn label(&self) -> String {
        match &self.location {
            Some(path) => path.display().to_string(),
            None if !self.viewer_key.is_empty() => format!("viewer:{}", self.viewer_key),
            None => format!("\"{}\"", self.description),
        }
    }

    pub fn to_yaml(&self) -> crate::Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn from_yaml(text: &str) -> crate::Result<Self> {
        Ok(serde_yaml::from_str(text)?)
    }
}

/// An entry of the remote index snapshot (`GET /index`)
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct IndexEntry {
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub hash: String,
    #[serde(default)]
    pub config: String,
    #[serde(default)]
    pub dps: f64,
    #[serde(default)]
    pub viewer_key: String,
}
