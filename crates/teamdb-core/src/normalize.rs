//! Configuration rewrites applied before every engine run

use crate::error::{Error, Result};
use regex::Regex;

pub const DEFAULT_ITERATIONS: u32 = 1000;
pub const DEFAULT_WORKERS: u32 = 30;

/// Pins the iteration and worker counts of a configuration and reads its mode.
#[derive(Clone, Debug)]
pub struct ConfigNormalizer {
    iterations: u32,
    workers: u32,
    iteration_re: Regex,
    workers_re: Regex,
    mode_re: Regex,
}

impl ConfigNormalizer {
    pub fn new(iterations: u32, workers: u32) -> Result<Self> {
        let compile = |pattern: &str| {
            Regex::new(pattern).map_err(|e| Error::Config(format!("bad pattern {pattern}: {e}")))
        };
        Ok(Self {
            iterations,
            workers,
            iteration_re: compile(r"iteration=\d+")?,
            workers_re: compile(r"workers=\d+")?,
            mode_re: compile(r"mode=(\w+)")?,
        })
    }

    /// Rewrite every `iteration=N` and `workers=N` token; the rest of the text is untouched.
    pub fn normalize(&self, config: &str) -> String {
        let pinned = self
            .iteration_re
            .replace_all(config, format!("iteration={}", self.iterations).as_str())
            .into_owned();
        self.workers_re
            .replace_all(&pinned, format!("workers={}", self.workers).as_str())
            .into_owned()
    }

    /// The word following the first `mode=` clause, if any.
    pub fn mode(&self, config: &str) -> Option<String> {
        self.mode_re
            .captures(config)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
    }
}
