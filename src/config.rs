use std::fs;
use std::path::PathBuf;

use camino::Utf8PathBuf;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::classify::{FileClassifier, FileTypeEntry, READS_FILE_TYPE, default_file_types};
use crate::error::LoaderError;
use crate::lookup::StationSeed;
use crate::matcher::{PatternEntry, SampleNameMatcher, default_sample_name_patterns};

pub const DEFAULT_CONFIG_FILE: &str = "muscope-loader.json";
pub const DEFAULT_ATTRIBUTE_FILE_PATTERN: &str = r"\.xlsx?";
pub const DEFAULT_STATION_COLLECTION: &str = "/iplant/home/scope/data/core";
pub const DEFAULT_TIME_ZONE: &str = "HST";

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub schema_version: Option<u32>,
    #[serde(default)]
    pub attribute_file_pattern: Option<String>,
    #[serde(default)]
    pub sample_name_patterns: Option<Vec<PatternEntry>>,
    #[serde(default)]
    pub file_types: Option<Vec<FileTypeEntry>>,
    #[serde(default)]
    pub reads_file_type: Option<String>,
    #[serde(default)]
    pub station_collection: Option<String>,
    #[serde(default)]
    pub known_bad_cruises: Option<Vec<String>>,
    #[serde(default)]
    pub seed_stations: Option<Vec<StationSeed>>,
    #[serde(default)]
    pub time_zone: Option<String>,
    #[serde(default)]
    pub scratch_dir: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub schema_version: u32,
    pub attribute_file_pattern: Regex,
    pub sample_names: SampleNameMatcher,
    pub classifier: FileClassifier,
    pub station_collection: Utf8PathBuf,
    pub known_bad_cruises: Vec<String>,
    pub seed_stations: Vec<StationSeed>,
    pub time_zone: String,
    pub scratch_dir: Option<Utf8PathBuf>,
}

impl ResolvedConfig {
    /// Replaces the attribute spreadsheet pattern, e.g. from the command line.
    pub fn with_attribute_file_pattern(mut self, pattern: &str) -> Result<Self, LoaderError> {
        self.attribute_file_pattern = compile(pattern)?;
        Ok(self)
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Reads the config file; without an explicit path a missing default file
    /// means built-in defaults.
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, LoaderError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        if path.is_none() && !config_path.exists() {
            debug!(path = %config_path.display(), "no config file; using built-in defaults");
            return Self::resolve_config(Config::default());
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| LoaderError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| LoaderError::ConfigParse(err.to_string()))?;

        Self::resolve_config(config)
    }

    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, LoaderError> {
        let schema_version = config.schema_version.unwrap_or(1);

        let attribute_file_pattern = compile(
            config
                .attribute_file_pattern
                .as_deref()
                .unwrap_or(DEFAULT_ATTRIBUTE_FILE_PATTERN),
        )?;

        let sample_names = SampleNameMatcher::new(
            &config
                .sample_name_patterns
                .unwrap_or_else(default_sample_name_patterns),
        )?;

        let classifier = FileClassifier::new(
            &config.file_types.unwrap_or_else(default_file_types),
            config.reads_file_type.as_deref().unwrap_or(READS_FILE_TYPE),
        )?;

        Ok(ResolvedConfig {
            schema_version,
            attribute_file_pattern,
            sample_names,
            classifier,
            station_collection: Utf8PathBuf::from(
                config
                    .station_collection
                    .unwrap_or_else(|| DEFAULT_STATION_COLLECTION.to_string()),
            ),
            known_bad_cruises: config
                .known_bad_cruises
                .unwrap_or_else(default_known_bad_cruises),
            seed_stations: config.seed_stations.unwrap_or_else(default_seed_stations),
            time_zone: config
                .time_zone
                .unwrap_or_else(|| DEFAULT_TIME_ZONE.to_string()),
            scratch_dir: config.scratch_dir.map(Utf8PathBuf::from),
        })
    }
}

/// Cruise names of samples that were inserted against the wrong cruise.
pub fn default_known_bad_cruises() -> Vec<String> {
    vec!["HOT268".to_string()]
}

/// Stations referenced by the Church HOT201-222 spreadsheet that no
/// water-column sheet records.
pub fn default_seed_stations() -> Vec<StationSeed> {
    ["HOT233", "HOT234", "HOT267"]
        .into_iter()
        .map(|cruise_name| StationSeed {
            cruise_name: cruise_name.to_string(),
            station_number: 2,
            latitude: 22.45,
            longitude: -158.0,
        })
        .collect()
}

fn compile(pattern: &str) -> Result<Regex, LoaderError> {
    Regex::new(pattern).map_err(|err| LoaderError::InvalidPattern {
        pattern: pattern.to_string(),
        message: err.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let resolved = ConfigLoader::resolve_config(Config::default()).unwrap();
        assert_eq!(resolved.schema_version, 1);
        assert_eq!(resolved.time_zone, "HST");
        assert_eq!(resolved.known_bad_cruises, vec!["HOT268".to_string()]);
        assert_eq!(resolved.seed_stations.len(), 3);
        assert!(resolved.attribute_file_pattern.is_match("Caron_HL3_VertProf_seq_attrib_v3.xls"));
        assert_eq!(resolved.sample_names.len(), 10);
    }
}
