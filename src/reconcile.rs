//! Resolves canonical spreadsheet rows to cruise and sample records.

use chrono::{NaiveDateTime, NaiveTime};
use tracing::info;

use crate::catalog::{Catalog, Cruise, Investigator, Lookup, NewSample, Sample, SampleKey};
use crate::error::LoaderError;
use crate::lookup::{SampleIndex, StationIndex};
use crate::normalize::transforms::strip_type_letter;
use crate::table::{CanonicalTable, Cell, DATA_TYPE_COLUMN};

/// Station number of net tows; their position comes from the row itself.
pub const NET_TOW_STATION: i64 = 0;

pub struct ReconcileContext<'a> {
    pub stations: &'a StationIndex,
    pub sample_index: &'a mut SampleIndex,
    pub time_zone: &'a str,
    pub dry_run: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Resolved {
    pub sample: Sample,
    pub created_sample: bool,
    pub created_cruise: bool,
}

/// Resolves (or creates) the sample a row describes and records the row's
/// file names in the sample index. Rows without a sample name yield `None`.
pub fn resolve_or_create<C: Catalog + ?Sized>(
    catalog: &mut C,
    table: &CanonicalTable,
    row: usize,
    context: &mut ReconcileContext<'_>,
) -> Result<Option<Resolved>, LoaderError> {
    let Some(sample_name) = text_value(table.get(row, "sample_name")) else {
        return Ok(None);
    };

    let investigator = find_investigator(catalog, table.get(row, "pi"))?;

    let cruise_name = text_value(table.get(row, "cruise_name"))
        .ok_or_else(|| invalid(table, row, "cruise_name"))?;
    let (cruise, created_cruise) = match catalog.find_cruise(&cruise_name)? {
        Lookup::Found(cruise) => (cruise, false),
        Lookup::NotFound => {
            info!(
                cruise = %cruise_name,
                dry_run = context.dry_run,
                "inserting cruise; start and end dates need manual entry"
            );
            (catalog.insert_cruise(&cruise_name)?, true)
        }
        Lookup::MultipleFound(_) => {
            return Err(LoaderError::DuplicateRecord {
                entity: "cruise",
                key: cruise_name,
            });
        }
    };

    let station_number = integer_value(table, row, "station")?;
    let cast_number = integer_value(table, row, "cast_num")?;
    let (latitude, longitude) = position(table, row, &cruise, station_number, context.stations)?;

    let key = SampleKey {
        cruise_id: cruise.id,
        station_number,
        cast_number,
        sample_name: sample_name.clone(),
    };

    let (sample, created_sample) = match catalog.find_sample(&key)? {
        Lookup::Found(sample) => (sample, false),
        Lookup::NotFound => {
            let new_sample = NewSample {
                key,
                investigator_id: investigator.id,
                collection_start: collection_start(table, row),
                collection_time_zone: context.time_zone.to_string(),
                depth: table.get(row, "depth").as_f64(),
                latitude_start: latitude,
                longitude_start: longitude,
            };
            info!(
                sample = %sample_name,
                cruise = %cruise.name,
                station = station_number,
                cast = cast_number,
                dry_run = context.dry_run,
                "inserting sample"
            );
            (catalog.insert_sample(&new_sample)?, true)
        }
        Lookup::MultipleFound(samples) => {
            return Err(LoaderError::DuplicateSampleIdentity {
                sample_name,
                count: samples.len(),
            });
        }
    };

    index_file_names(table, row, &sample_name, context.sample_index);

    Ok(Some(Resolved {
        sample,
        created_sample,
        created_cruise,
    }))
}

/// Maps the row's data file, and its continuation row's file, to the sample.
pub fn index_file_names(
    table: &CanonicalTable,
    row: usize,
    sample_name: &str,
    index: &mut SampleIndex,
) {
    let data_type = declared_data_type(table, row);

    if let Some(file_name) = text_value(table.get(row, "seq_name")) {
        index.insert(&file_name, sample_name, data_type.as_deref());
    }

    let next = row + 1;
    if next < table.len()
        && table.get(next, "sample_name").is_empty()
        && let Some(file_name) = text_value(table.get(next, "seq_name"))
    {
        index.insert(&file_name, sample_name, data_type.as_deref());
    }
}

/// Data type written in the spreadsheet, if the sheet has that column.
pub fn declared_data_type(table: &CanonicalTable, row: usize) -> Option<String> {
    if !table.has_data_type() {
        return None;
    }
    text_value(table.get(row, DATA_TYPE_COLUMN))
}

fn find_investigator<C: Catalog + ?Sized>(
    catalog: &C,
    cell: &Cell,
) -> Result<Investigator, LoaderError> {
    let last_name = text_value(cell).unwrap_or_default();
    match catalog.find_investigator(&last_name)? {
        Lookup::Found(investigator) => Ok(investigator),
        Lookup::NotFound => Err(LoaderError::UnknownInvestigator(last_name)),
        Lookup::MultipleFound(_) => Err(LoaderError::DuplicateRecord {
            entity: "investigator",
            key: last_name,
        }),
    }
}

fn position(
    table: &CanonicalTable,
    row: usize,
    cruise: &Cruise,
    station_number: i64,
    stations: &StationIndex,
) -> Result<(Option<f64>, Option<f64>), LoaderError> {
    if station_number == NET_TOW_STATION {
        return Ok((
            table.get(row, "latitude").as_f64(),
            table.get(row, "longitude").as_f64(),
        ));
    }
    let station = stations
        .get(&cruise.name, station_number)
        .ok_or_else(|| LoaderError::UnknownStation {
            cruise: cruise.name.clone(),
            station: station_number,
        })?;
    Ok((Some(station.latitude), Some(station.longitude)))
}

fn collection_start(table: &CanonicalTable, row: usize) -> Option<NaiveDateTime> {
    let date = table.get(row, "collection_date").as_date()?;
    let time = table
        .get(row, "collection_time")
        .as_time()
        .unwrap_or(NaiveTime::MIN);
    Some(date.and_time(time))
}

fn text_value(cell: &Cell) -> Option<String> {
    if cell.is_empty() {
        return None;
    }
    Some(cell.to_string().trim().to_string())
}

fn integer_value(table: &CanonicalTable, row: usize, column: &str) -> Result<i64, LoaderError> {
    strip_type_letter(table.get(row, column))
        .map(|value| value.trunc() as i64)
        .ok_or_else(|| invalid(table, row, column))
}

fn invalid(table: &CanonicalTable, row: usize, column: &str) -> LoaderError {
    LoaderError::InvalidCell {
        column: column.to_string(),
        row,
        value: table.get(row, column).to_string(),
    }
}
