//! Tests for teamdb-core: record serde, result projection, registry, errors

use std::path::PathBuf;
use teamdb_core::*;

fn sample_record() -> Record {
    Record {
        author: "Alice#1234 and Bob#5678".into(),
        config: "options iteration=1000 workers=30 mode=sl;".into(),
        description: "national team".into(),
        fingerprint: "a1b2c3".into(),
        team: vec![
            TeamMember {
                name: "bennett".into(),
                con: 6,
                weapon: "aquilafavonia".into(),
                refine: 1,
                er: 2.1,
                talents: Talents { attack: 1, skill: 9, burst: 13 },
            },
            TeamMember {
                name: "xiangling".into(),
                con: 6,
                weapon: "thecatch".into(),
                refine: 5,
                er: 1.8,
                talents: Talents { attack: 6, skill: 9, burst: 12 },
            },
        ],
        dps: 31234.5,
        mode: "sl".into(),
        duration: 90.0,
        target_count: 1,
        viewer_key: "perm_abc".into(),
        location: Some(PathBuf::from("db/Bennett/bnrdxlxq.yaml")),
        archive: Some(PathBuf::from("db/Bennett/bnrdxlxq.gz")),
        changed: true,
    }
}

fn result_json() -> &'static str {
    r#"{
        "sim_duration": {"min": 88.0, "max": 92.0, "mean": 90.5, "sd": 0.4},
        "dps": {"min": 30000.0, "max": 33000.0, "mean": 31500.25, "sd": 500.0},
        "target_details": [{"level": 100}, {"level": 100}],
        "char_details": [
            {"name": "xiangling", "cons": 6, "weapon": {"name": "thecatch", "refine": 5},
             "stats": [0,0,0,0,0,0,0,1.75], "talents": {"attack": 6, "skill": 9, "burst": 12}},
            {"name": "bennett", "cons": 5, "weapon": {"name": "favoniussword", "refine": 3},
             "stats": [0,0,0,0,0,0,0,2.25,0,0], "talents": {"attack": 1, "skill": 8, "burst": 13}}
        ],
        "damage_by_char_by_targets": [
            {"1": {"mean": 15000.0}}, {"1": {"mean": 4000.0}}
        ]
    }"#
}

// ===========================================================================
// Record
// ===========================================================================

#[test]
fn record_yaml_roundtrip_drops_transient_fields() {
    let record = sample_record();
    let yaml = record.to_yaml().unwrap();
    let back = Record::from_yaml(&yaml).unwrap();

    let expected = Record {
        location: None,
        archive: None,
        changed: false,
        ..record
    };
    assert_eq!(back, expected);
}

#[test]
fn record_yaml_uses_catalog_field_names() {
    let yaml = sample_record().to_yaml().unwrap();
    assert!(yaml.contains("hash: a1b2c3"));
    assert!(yaml.contains("viewer_key: perm_abc"));
    assert!(yaml.contains("target_count: 1"));
    assert!(!yaml.contains("location"));
    assert!(!yaml.contains("changed"));
}

#[test]
fn record_json_omits_transient_fields() {
    let json = serde_json::to_value(sample_record()).unwrap();
    assert_eq!(json["hash"], "a1b2c3");
    assert!(json.get("location").is_none());
    assert!(json.get("archive").is_none());
    assert!(json.get("changed").is_none());
}

#[test]
fn record_missing_fields_default_to_pending() {
    let record = Record::from_yaml("author: carol\nconfig: \"active bennett;\"\n").unwrap();
    assert_eq!(record.author, "carol");
    assert!(record.is_pending());
    assert!(record.team.is_empty());
    assert!(record.viewer_key.is_empty());
}

#[test]
fn record_label_prefers_location() {
    let record = sample_record();
    assert_eq!(record.label(), "db/Bennett/bnrdxlxq.yaml");
    let remote = Record { location: None, ..sample_record() };
    assert_eq!(remote.label(), "viewer:perm_abc");
}

// ===========================================================================
// ComputationResult
// ===========================================================================

#[test]
fn result_parses_engine_document() {
    let result = ComputationResult::from_slice(result_json().as_bytes()).unwrap();
    assert_eq!(result.dps.mean, 31500.25);
    assert_eq!(result.duration.mean, 90.5);
    assert_eq!(result.targets.len(), 2);
    assert_eq!(result.characters.len(), 2);
}

#[test]
fn result_team_is_sorted_and_reads_energy_recharge() {
    let result = ComputationResult::from_slice(result_json().as_bytes()).unwrap();
    let team = result.team().unwrap();
    assert_eq!(team[0].name, "bennett");
    assert_eq!(team[0].er, 2.25);
    assert_eq!(team[0].weapon, "favoniussword");
    assert_eq!(team[0].refine, 3);
    assert_eq!(team[0].con, 5);
    assert_eq!(team[1].name, "xiangling");
    assert_eq!(team[1].talents.burst, 12);
}

#[test]
fn result_top_contributor() {
    let result = ComputationResult::from_slice(result_json().as_bytes()).unwrap();
    assert_eq!(result.top_contributor().unwrap().name, "xiangling");
}

#[test]
fn truncated_result_is_decode_error() {
    let json = result_json();
    let err = ComputationResult::from_slice(&json.as_bytes()[..json.len() / 2]).unwrap_err();
    assert!(matches!(err, Error::Decode { .. }));
    assert_eq!(err.kind(), "decode");
}

#[test]
fn result_without_characters_is_decode_error() {
    let err = ComputationResult::from_slice(br#"{"sim_duration":{},"dps":{}}"#).unwrap_err();
    assert!(err.to_string().contains("char_details"));
}

// ===========================================================================
// SubmissionData
// ===========================================================================

#[test]
fn submission_parses_superset_payload() {
    let json = r#"{
        "config_file": "options iteration=50 workers=4;",
        "char_details": [
            {"name": "xiangling", "level": 90, "max_level": 90, "cons": 6,
             "weapon": {"name": "thecatch", "refine": 5, "level": 90, "max_level": 90},
             "stats": [], "talents": {"attack": 6, "skill": 9, "burst": 12}},
            {"name": "bennett", "level": 80, "max_level": 90, "cons": 5,
             "weapon": {"name": "favoniussword", "refine": 3, "level": 90, "max_level": 90},
             "stats": [], "talents": {"attack": 1, "skill": 8, "burst": 13}}
        ],
        "dps": {"mean": 20000.0},
        "target_count": 1,
        "damage_by_char_by_targets": [
            {"1": {"mean": 3000.0}, "2": {"mean": 5000.0}},
            {"1": {"mean": 9000.0}}
        ]
    }"#;
    let data = SubmissionData::from_slice(json.as_bytes()).unwrap();
    assert_eq!(data.config, "options iteration=50 workers=4;");
    assert_eq!(data.character_names(), vec!["xiangling", "bennett"]);
    assert_eq!(data.characters[1].level, 80);
    assert_eq!(data.top_contributor().unwrap().name, "bennett");
}

// ===========================================================================
// IdentityRegistry + ConfigNormalizer
// ===========================================================================

#[test]
fn registry_scenario_bucket_and_name() {
    let reg = IdentityRegistry::builtin();
    assert_eq!(reg.bucket_for("Bennett").unwrap(), "Bennett");
    assert_eq!(reg.team_name(&["Xiangling", "Bennett"]).unwrap(), "bnpmpmxl");
}

#[test]
fn registry_unknown_member_fails_team_name() {
    let reg = IdentityRegistry::builtin();
    let err = reg.team_name(&["bennett", "nahida"]).unwrap_err();
    assert_eq!(err.kind(), "unknown_entity");
}

#[test]
fn normalizer_scenario() {
    let n = ConfigNormalizer::new(1000, 30).unwrap();
    let mut cfg = "iteration=50 workers=4".to_string();
    for _ in 0..3 {
        cfg = n.normalize(&cfg);
        assert_eq!(cfg, "iteration=1000 workers=30");
    }
}

// ===========================================================================
// Error
// ===========================================================================

#[test]
fn error_display_carries_context() {
    let e = Error::computation_failed("db/Bennett/x.yaml", "exit code 2");
    assert_eq!(e.to_string(), "computation failed for db/Bennett/x.yaml: exit code 2");
    assert_eq!(e.kind(), "computation");

    let e = Error::transport_failed("upload index", "timed out");
    assert_eq!(e.to_string(), "transport failed during upload index: timed out");
}

#[test]
fn error_from_io() {
    let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
    let e: Error = io.into();
    assert_eq!(e.kind(), "io");
}
