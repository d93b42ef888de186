//! Teamdb configuration
//!
//! All tunable parameters in one place. Loaded from TOML at startup,
//! falls back to defaults if no config file exists.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use teamdb_core::{ConfigNormalizer, Result};
use teamdb_remote::{RetryPolicy, Timeouts};

pub const DEFAULT_CONFIG_FILE: &str = "teamdb.toml";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TeamdbConfig {
    pub paths: PathsConfig,
    pub engine: EngineConfig,
    pub remote: RemoteConfig,
    pub publish: PublishConfig,
    pub resim: ResimConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PathsConfig {
    /// Root of the local catalog; one bucket directory per character.
    pub catalog_root: PathBuf,
    /// Scratch directory for engine inputs and outputs. Cleared every pass.
    pub scratch_dir: PathBuf,
    /// Root that records loaded from the remote index are written under.
    pub resim_root: PathBuf,
    /// Submission list, one `reference~author~description` per line.
    pub submissions_file: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    pub binary: PathBuf,
    /// Iteration count pinned into every configuration.
    pub iterations: u32,
    /// Worker count pinned into every configuration.
    pub workers: u32,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RemoteConfig {
    pub base_url: String,
    /// Environment variable holding the store's API key.
    pub api_key_env: String,
    pub submission_timeout_secs: u64,
    pub index_timeout_secs: u64,
    pub upload_timeout_secs: u64,
    pub retry: RetryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts per remote call, including the first.
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub multiplier: f64,
    pub max_delay_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PublishConfig {
    /// Description attached to every uploaded artifact.
    pub description_tag: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ResimConfig {
    /// Text appended to every configuration loaded from the remote index.
    pub config_suffix: Option<String>,
}

// ============================================================
// Defaults
// ============================================================

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            catalog_root: "./db".into(),
            scratch_dir: "./tmp".into(),
            resim_root: "./resim".into(),
            submissions_file: "dbinput.txt".into(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            binary: "./gcsim".into(),
            iterations: teamdb_core::normalize::DEFAULT_ITERATIONS,
            workers: teamdb_core::normalize::DEFAULT_WORKERS,
            timeout_secs: 600,
        }
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: teamdb_remote::http::DEFAULT_BASE_URL.into(),
            api_key_env: "API_KEY".into(),
            submission_timeout_secs: 2,
            index_timeout_secs: 10,
            upload_timeout_secs: 30,
            retry: RetryConfig::default(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self { max_attempts: 3, base_delay_ms: 500, multiplier: 2.0, max_delay_ms: 8_000 }
    }
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self { description_tag: "team database".into() }
    }
}

// ============================================================
// Loading
// ============================================================

impl TeamdbConfig {
    /// Load config from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => {
                    tracing::info!("Loaded config from {}", path.display());
                    config
                }
                Err(e) => {
                    tracing::warn!("Failed to parse {}: {}, using defaults", path.display(), e);
                    Self::default()
                }
            },
            Err(_) => {
                tracing::info!("No config at {}, using defaults", path.display());
                Self::default()
            }
        }
    }

    /// Write the current config as TOML (for generating a default config file).
    pub fn to_toml(&self) -> String {
        toml::to_string_pretty(self).unwrap_or_default()
    }

    pub fn normalizer(&self) -> Result<ConfigNormalizer> {
        ConfigNormalizer::new(self.engine.iterations, self.engine.workers)
    }

    pub fn engine_timeout(&self) -> Duration {
        Duration::from_secs(self.engine.timeout_secs)
    }

    /// API key from the configured environment variable, if set and non-empty.
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.remote.api_key_env)
            .ok()
            .filter(|k| !k.is_empty())
    }
}

impl RemoteConfig {
    pub fn timeouts(&self) -> Timeouts {
        Timeouts {
            submission: Duration::from_secs(self.submission_timeout_secs),
            index: Duration::from_secs(self.index_timeout_secs),
            upload: Duration::from_secs(self.upload_timeout_secs),
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts.max(1),
            base_delay: Duration::from_millis(self.base_delay_ms),
            multiplier: self.multiplier,
            max_delay: Duration::from_millis(self.max_delay_ms),
        }
    }
}
