//! Computation adapter — re-derive a record's cached fields from a fresh engine run

use crate::engine::ComputationEngine;
use crate::scratch::ScratchDir;
use std::sync::Arc;
use teamdb_core::{ComputationResult, ConfigNormalizer, Error, Record, Result};
use tracing::info;

/// Output of one successful recomputation.
#[derive(Debug)]
pub struct Computation {
    pub result: ComputationResult,
    /// Raw result document as written by the engine, for archival.
    pub raw: Vec<u8>,
}

pub struct ComputationAdapter {
    engine: Arc<dyn ComputationEngine>,
    normalizer: ConfigNormalizer,
}

impl ComputationAdapter {
    pub fn new(engine: Arc<dyn ComputationEngine>, normalizer: ConfigNormalizer) -> Self {
        Self { engine, normalizer }
    }

    pub fn normalizer(&self) -> &ConfigNormalizer {
        &self.normalizer
    }

    /// Recompute `record` with the engine identified by `fingerprint`.
    ///
    /// The record is only mutated once the engine run and the result decode
    /// have both succeeded; on error it is left exactly as it was.
    pub async fn recompute(
        &self,
        record: &mut Record,
        fingerprint: &str,
        scratch: &ScratchDir,
    ) -> Result<Computation> {
        let config = self.normalizer.normalize(&record.config);
        let stem = scratch.next_stem();

        info!("recomputing {}", record.label());
        let raw = self
            .engine
            .run(&config, &stem)
            .await
            .map_err(|e| Error::computation_failed(record.label(), e.to_string()))?;

        // An unreadable result document means the run itself failed; a
        // well-formed document with a bad field is a decode error.
        let result = ComputationResult::from_slice(&raw).map_err(|e| match e {
            Error::Decode { message, .. } => {
                Error::computation_failed(record.label(), format!("unreadable result: {}", message))
            }
            other => other,
        })?;
        let team = result.team().map_err(|e| match e {
            Error::Decode { context, message } => {
                Error::decode(record.label(), format!("{}: {}", context, message))
            }
            other => other,
        })?;

        record.config = config;
        record.dps = result.dps.mean;
        record.duration = result.duration.mean;
        record.target_count = result.targets.len();
        record.team = team;
        if let Some(mode) = self.normalizer.mode(&record.config) {
            record.mode = mode;
        }
        record.fingerprint = fingerprint.to_string();
        record.changed = true;

        Ok(Computation { result, raw })
    }
}
