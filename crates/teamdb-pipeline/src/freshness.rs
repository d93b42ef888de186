//! Freshness gate

use teamdb_core::Record;

/// Whether `record` must be recomputed against the engine build `fingerprint`.
pub fn needs_recompute(record: &Record, fingerprint: &str, force: bool) -> bool {
    force || record.fingerprint != fingerprint
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(fingerprint: &str) -> Record {
        Record { fingerprint: fingerprint.into(), ..Default::default() }
    }

    #[test]
    fn current_record_is_fresh() {
        assert!(!needs_recompute(&record("v2.18.3"), "v2.18.3", false));
    }

    #[test]
    fn stale_or_pending_record_is_recomputed() {
        assert!(needs_recompute(&record("v2.18.2"), "v2.18.3", false));
        assert!(needs_recompute(&record(""), "v2.18.3", false));
    }

    #[test]
    fn force_overrides() {
        assert!(needs_recompute(&record("v2.18.3"), "v2.18.3", true));
    }
}
