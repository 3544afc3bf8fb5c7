//! Lookup stores bridging the attribute pass and the data-file pass.
//!
//! Both are rebuilt from the spreadsheets at the start of every run and
//! persisted as JSON in the scratch directory; they are a cache, never a
//! source of truth.

use std::collections::BTreeMap;

use camino::Utf8Path;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::LoaderError;
use crate::store::Workspace;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleIndexEntry {
    pub sample_name: String,
    #[serde(default)]
    pub data_type: Option<String>,
    #[serde(default)]
    pub processed: bool,
}

/// Sample file name to sample name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SampleIndex {
    entries: BTreeMap<String, SampleIndexEntry>,
}

impl SampleIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a mapping unless the file name is already known; the first
    /// spreadsheet row naming a file wins.
    pub fn insert(&mut self, file_name: &str, sample_name: &str, data_type: Option<&str>) -> bool {
        if self.entries.contains_key(file_name) {
            debug!(file_name, sample_name, "sample file name already indexed");
            return false;
        }
        self.entries.insert(
            file_name.to_string(),
            SampleIndexEntry {
                sample_name: sample_name.to_string(),
                data_type: data_type.map(str::to_string),
                processed: false,
            },
        );
        true
    }

    pub fn get(&self, file_name: &str) -> Option<&SampleIndexEntry> {
        self.entries.get(file_name)
    }

    pub fn mark_processed(&mut self, file_name: &str) -> bool {
        match self.entries.get_mut(file_name) {
            Some(entry) => {
                entry.processed = true;
                true
            }
            None => false,
        }
    }

    pub fn unprocessed(&self) -> Vec<(&str, &SampleIndexEntry)> {
        self.entries
            .iter()
            .filter(|(_, entry)| !entry.processed)
            .map(|(name, entry)| (name.as_str(), entry))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn save(&self, path: &Utf8Path) -> Result<(), LoaderError> {
        Workspace::write_json_atomic(path, self)
    }

    pub fn load(path: &Utf8Path) -> Result<Self, LoaderError> {
        Ok(Workspace::read_json(path)?.unwrap_or_default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StationPosition {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationSeed {
    pub cruise_name: String,
    pub station_number: i64,
    pub latitude: f64,
    pub longitude: f64,
}

/// Cruise name and station number to station position.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StationIndex {
    stations: BTreeMap<String, BTreeMap<i64, StationPosition>>,
}

impl StationIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_seeds(seeds: &[StationSeed]) -> Self {
        let mut index = Self::new();
        for seed in seeds {
            index.insert(
                &seed.cruise_name,
                seed.station_number,
                StationPosition {
                    latitude: seed.latitude,
                    longitude: seed.longitude,
                },
            );
        }
        index
    }

    /// First position recorded for a station wins.
    pub fn insert(
        &mut self,
        cruise_name: &str,
        station_number: i64,
        position: StationPosition,
    ) -> bool {
        let stations = self.stations.entry(cruise_name.to_string()).or_default();
        if stations.contains_key(&station_number) {
            return false;
        }
        stations.insert(station_number, position);
        true
    }

    pub fn get(&self, cruise_name: &str, station_number: i64) -> Option<StationPosition> {
        self.stations
            .get(cruise_name)
            .and_then(|stations| stations.get(&station_number))
            .copied()
    }

    pub fn len(&self) -> usize {
        self.stations.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn save(&self, path: &Utf8Path) -> Result<(), LoaderError> {
        Workspace::write_json_atomic(path, self)
    }

    pub fn load(path: &Utf8Path) -> Result<Self, LoaderError> {
        Ok(Workspace::read_json(path)?.unwrap_or_default())
    }
}
