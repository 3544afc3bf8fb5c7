use std::fs;

use assert_matches::assert_matches;

use muscope_loader::classify::FileTypeEntry;
use muscope_loader::config::{Config, ConfigLoader, DEFAULT_STATION_COLLECTION};
use muscope_loader::error::LoaderError;
use muscope_loader::matcher::PatternEntry;

#[test]
fn config_file_overrides_defaults() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("muscope-loader.json");
    fs::write(
        &path,
        r#"{
            "attribute_file_pattern": "_seq_attrib.*\\.xls$",
            "sample_name_patterns": [
                { "pattern": "(?P<sample_name>SM\\d+)_R[12]\\.fastq", "label": "MESO-SCOPE" }
            ],
            "known_bad_cruises": ["HOT268", "HOT269"],
            "seed_stations": [
                {
                    "cruise_name": "KM1513",
                    "station_number": 6,
                    "latitude": 24.5,
                    "longitude": -156.5
                }
            ],
            "time_zone": "UTC",
            "scratch_dir": "/tmp/muscope"
        }"#,
    )
    .unwrap();

    let resolved = ConfigLoader::resolve(path.to_str()).unwrap();
    assert!(resolved.attribute_file_pattern.is_match("Chisholm_HOT-BATS_seq_attrib.xls"));
    assert!(!resolved.attribute_file_pattern.is_match("HOT_watercolumn.xlsx"));
    assert_eq!(resolved.sample_names.len(), 1);
    assert_eq!(resolved.sample_names.identify("SM12_R1.fastq").unwrap().sample_name, "SM12");
    assert_eq!(resolved.known_bad_cruises, vec!["HOT268", "HOT269"]);
    assert_eq!(resolved.seed_stations[0].station_number, 6);
    assert_eq!(resolved.time_zone, "UTC");
    assert_eq!(resolved.scratch_dir.as_deref().map(|dir| dir.as_str()), Some("/tmp/muscope"));
    assert_eq!(resolved.station_collection.as_str(), DEFAULT_STATION_COLLECTION);
}

#[test]
fn absent_default_file_falls_back_to_defaults() {
    let resolved = ConfigLoader::resolve(None).unwrap();
    assert_eq!(resolved.station_collection.as_str(), DEFAULT_STATION_COLLECTION);
    assert_eq!(resolved.time_zone, "HST");
}

#[test]
fn explicit_missing_file_is_an_error() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("absent.json");
    let err = ConfigLoader::resolve(path.to_str()).unwrap_err();
    assert_matches!(err, LoaderError::ConfigRead(_));
}

#[test]
fn malformed_file_is_a_parse_error() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("muscope-loader.json");
    fs::write(&path, "{ not json").unwrap();
    let err = ConfigLoader::resolve(path.to_str()).unwrap_err();
    assert_matches!(err, LoaderError::ConfigParse(_));
}

#[test]
fn invalid_patterns_are_rejected() {
    let err = ConfigLoader::resolve_config(Config {
        file_types: Some(vec![FileTypeEntry::new("(", "Broken")]),
        ..Config::default()
    })
    .unwrap_err();
    assert_matches!(err, LoaderError::InvalidPattern { pattern, .. } if pattern == "(");

    let err = ConfigLoader::resolve_config(Config {
        sample_name_patterns: Some(vec![PatternEntry::new(r"SM\d+", "no group")]),
        ..Config::default()
    })
    .unwrap_err();
    assert_matches!(err, LoaderError::InvalidPattern { .. });
}

#[test]
fn attribute_pattern_can_be_replaced() {
    let resolved = ConfigLoader::resolve_config(Config::default())
        .unwrap()
        .with_attribute_file_pattern(r"^Dyhrman_")
        .unwrap();
    assert!(resolved.attribute_file_pattern.is_match("Dyhrman_MS_incubation_assoc_data_v5.xls"));
    assert!(!resolved.attribute_file_pattern.is_match("Caron_HL3_VertProf_seq_attrib_v3.xls"));
}
