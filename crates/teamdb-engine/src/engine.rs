//! Computation engine — the external simulator, driven as a subprocess

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

/// Engine error types
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("failed to launch {binary}: {source}")]
    Spawn {
        binary: String,
        #[source]
        source: std::io::Error,
    },

    #[error("engine timed out after {0}s")]
    Timeout(u64),

    #[error("engine exited with code {code}: {output}")]
    Exit { code: i32, output: String },

    #[error("engine produced no output at {path}: {source}")]
    MissingOutput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<EngineError> for teamdb_core::Error {
    fn from(e: EngineError) -> Self {
        Self::computation_failed("engine", e.to_string())
    }
}

/// The versioned computation engine.
#[async_trait::async_trait]
pub trait ComputationEngine: Send + Sync {
    /// Version string identifying the engine build; the freshness fingerprint.
    async fn version(&self) -> EngineResult<String>;

    /// Run `config` and return the raw JSON result document.
    ///
    /// `stem` is a scratch path without extension; the engine may create
    /// `<stem>.txt` and `<stem>.json` next to it.
    async fn run(&self, config: &str, stem: &Path) -> EngineResult<Vec<u8>>;
}

/// Engine backed by an executable: `<binary> -version` and
/// `<binary> -c <config> -out <result>`.
pub struct SubprocessEngine {
    binary: PathBuf,
    timeout: Duration,
}

impl SubprocessEngine {
    pub fn new(binary: impl AsRef<Path>) -> Self {
        Self {
            binary: binary.as_ref().to_path_buf(),
            timeout: Duration::from_secs(600),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn exec<I, S>(&self, args: I) -> EngineResult<std::process::Output>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut command = Command::new(&self.binary);
        command.args(args).kill_on_drop(true);

        match tokio::time::timeout(self.timeout, command.output()).await {
            Ok(Ok(output)) => Ok(output),
            Ok(Err(source)) => Err(EngineError::Spawn {
                binary: self.binary.display().to_string(),
                source,
            }),
            Err(_) => Err(EngineError::Timeout(self.timeout.as_secs())),
        }
    }
}

#[async_trait::async_trait]
impl ComputationEngine for SubprocessEngine {
    async fn version(&self) -> EngineResult<String> {
        let output = self.exec(["-version"]).await?;
        if !output.status.success() {
            return Err(exit_error(&output));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim_end().to_string())
    }

    async fn run(&self, config: &str, stem: &Path) -> EngineResult<Vec<u8>> {
        let config_path = stem.with_extension("txt");
        let result_path = stem.with_extension("json");
        tokio::fs::write(&config_path, config).await?;

        debug!("engine: {} -> {}", config_path.display(), result_path.display());
        let output = self
            .exec([
                OsStr::new("-c"),
                config_path.as_os_str(),
                OsStr::new("-out"),
                result_path.as_os_str(),
            ])
            .await?;
        if !output.status.success() {
            return Err(exit_error(&output));
        }

        tokio::fs::read(&result_path)
            .await
            .map_err(|source| EngineError::MissingOutput {
                path: result_path,
                source,
            })
    }
}

fn exit_error(output: &std::process::Output) -> EngineError {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    let text = match (stdout.trim(), stderr.trim()) {
        (out, "") => out.to_string(),
        ("", err) => err.to_string(),
        (out, err) => format!("{}\n{}", out, err),
    };
    EngineError::Exit {
        code: output.status.code().unwrap_or(-1),
        output: text,
    }
}
