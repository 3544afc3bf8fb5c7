//! Water-column (rosette bottle) spreadsheets from the station reference
//! collection.

use tracing::debug;

use crate::error::LoaderError;
use crate::lookup::{StationIndex, StationPosition};
use crate::normalize::transforms::strip_type_letter;
use crate::table::Table;

pub const CRUISE_COLUMN: &str = "cruise_name";
pub const STATION_COLUMN: &str = "station";
pub const PRESSURE_COLUMN: &str = "pressure";
pub const LATITUDE_COLUMN: &str = "latitude";
pub const LONGITUDE_COLUMN: &str = "longitude";

/// Sensor value meaning "no reading".
pub const MISSING_READING: f64 = -9.0;

const MESO_SCOPE_SHORT_NAME: &str = "MS";
const MESO_SCOPE_CRUISE: &str = "MESO-SCOPE";

/// Rows to skip before the header. The MESO-SCOPE sheet has no title row.
pub fn skip_rows_for(file_name: &str) -> &'static [usize] {
    if file_name.starts_with("MS_") {
        &[1]
    } else {
        &[0, 2]
    }
}

/// Depth in metres of a pressure reading in decibars at a latitude, using the
/// UNESCO polynomial with gravity variation.
pub fn predicted_depth(pressure: f64, latitude: f64) -> f64 {
    let x = (latitude / 57.29578).sin().powi(2);
    let gravity = 9.780318 * (1.0 + (5.2788e-3 + 2.36e-5 * x) * x) + 1.092e-6 * pressure;
    ((((-1.82e-15 * pressure + 2.279e-10) * pressure - 2.2512e-5) * pressure + 9.72659)
        * pressure)
        / gravity
}

fn canonical_cruise_name(raw: &str) -> String {
    if raw == MESO_SCOPE_SHORT_NAME {
        MESO_SCOPE_CRUISE.to_string()
    } else {
        raw.to_string()
    }
}

/// A water-column sheet with its header variants reconciled.
#[derive(Debug, Clone)]
pub struct WaterColumnSheet {
    table: Table,
}

impl WaterColumnSheet {
    /// The first column holds the cruise name whatever its header says.
    pub fn from_table(mut table: Table) -> Result<Self, LoaderError> {
        table.rename_column("Pressure", PRESSURE_COLUMN);
        table.rename_column("Cruise", CRUISE_COLUMN);
        if !table.has_column(CRUISE_COLUMN) {
            table.rename_column_at(0, CRUISE_COLUMN)?;
        }
        for column in [STATION_COLUMN, LATITUDE_COLUMN, LONGITUDE_COLUMN] {
            if !table.has_column(column) {
                return Err(LoaderError::MissingColumn(column.to_string()));
            }
        }
        Ok(Self { table })
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn cruise_name(&self, row: usize) -> Option<String> {
        let cell = self.table.get(row, CRUISE_COLUMN);
        if cell.is_empty() {
            return None;
        }
        Some(canonical_cruise_name(cell.to_string().trim()))
    }

    pub fn station(&self, row: usize) -> Option<i64> {
        strip_type_letter(self.table.get(row, STATION_COLUMN)).map(|value| value as i64)
    }

    pub fn latitude(&self, row: usize) -> Option<f64> {
        self.table.get(row, LATITUDE_COLUMN).as_f64()
    }

    /// Sheets record longitude as degrees west.
    pub fn longitude(&self, row: usize) -> Option<f64> {
        self.table
            .get(row, LONGITUDE_COLUMN)
            .as_f64()
            .map(|value| -value)
    }

    pub fn pressure(&self, row: usize) -> Option<f64> {
        self.table.get(row, PRESSURE_COLUMN).as_f64()
    }

    /// Index of the first attribute column; everything at or to its right is
    /// a sensor reading.
    pub fn first_reading_column(&self) -> Result<usize, LoaderError> {
        self.table
            .column_index(PRESSURE_COLUMN)
            .ok_or_else(|| LoaderError::MissingColumn(PRESSURE_COLUMN.to_string()))
    }

    /// Rows of one cruise station, in sheet order.
    pub fn station_rows(&self, cruise_name: &str, station: i64) -> Vec<usize> {
        (0..self.len())
            .filter(|row| {
                self.cruise_name(*row).as_deref() == Some(cruise_name)
                    && self.station(*row) == Some(station)
            })
            .collect()
    }

    /// Distinct (cruise, station) pairs in order of first appearance.
    pub fn stations(&self) -> Vec<(String, i64)> {
        let mut stations: Vec<(String, i64)> = Vec::new();
        for row in 0..self.len() {
            if let (Some(cruise), Some(station)) = (self.cruise_name(row), self.station(row))
                && !stations.iter().any(|(c, s)| *c == cruise && *s == station)
            {
                stations.push((cruise, station));
            }
        }
        stations
    }

    /// Adds every station position of this sheet; earlier entries win.
    pub fn add_stations_to(&self, index: &mut StationIndex) -> usize {
        let mut added = 0;
        for row in 0..self.len() {
            let (Some(cruise), Some(station), Some(latitude), Some(longitude)) = (
                self.cruise_name(row),
                self.station(row),
                self.latitude(row),
                self.longitude(row),
            ) else {
                continue;
            };
            if index.insert(&cruise, station, StationPosition { latitude, longitude }) {
                debug!(cruise = %cruise, station, latitude, longitude, "indexed station");
                added += 1;
            }
        }
        added
    }
}
