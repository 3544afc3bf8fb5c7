//! Applies rosette sensor readings to the samples taken at each station.
//!
//! Each sample takes the readings of the bottle whose predicted depth is
//! closest to the sample depth. Unlike the spreadsheet attribute pass, this
//! path always overwrites.

use std::collections::BTreeSet;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::attributes::{AttributeTypeIndex, OverwriteOutcome, overwrite_attribute};
use crate::catalog::{Catalog, Sample};
use crate::error::LoaderError;
use crate::water_column::{MISSING_READING, WaterColumnSheet, predicted_depth};

/// Depth mismatch, in metres, reported as a data-quality warning.
pub const DEPTH_WARNING_THRESHOLD: f64 = 1.0;

#[derive(Debug, Clone, Default, Serialize)]
pub struct CtdReport {
    pub samples_matched: usize,
    pub positions_filled: usize,
    pub attributes_inserted: usize,
    pub attributes_updated: usize,
    pub depth_warnings: Vec<DepthWarning>,
    pub samples_without_depth: Vec<String>,
    pub unknown_columns: BTreeSet<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DepthWarning {
    pub cruise_name: String,
    pub station: i64,
    pub sample_name: String,
    pub difference: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bottle {
    pub row: usize,
    pub predicted_depth: f64,
    pub difference: f64,
}

/// Bottle row whose predicted depth is closest to `depth`.
pub fn closest_bottle(sheet: &WaterColumnSheet, rows: &[usize], depth: f64) -> Option<Bottle> {
    rows.iter()
        .filter_map(|row| {
            let pressure = sheet.pressure(*row)?;
            let latitude = sheet.latitude(*row)?;
            let predicted = predicted_depth(pressure, latitude);
            Some(Bottle {
                row: *row,
                predicted_depth: predicted,
                difference: (depth - predicted).abs(),
            })
        })
        .min_by(|a, b| a.difference.total_cmp(&b.difference))
}

pub fn merge_sheet<C: Catalog + ?Sized>(
    catalog: &mut C,
    sheet: &WaterColumnSheet,
    types: &AttributeTypeIndex,
    dry_run: bool,
    report: &mut CtdReport,
) -> Result<(), LoaderError> {
    let first_reading = sheet.first_reading_column()?;

    for (cruise_name, station) in sheet.stations() {
        let rows = sheet.station_rows(&cruise_name, station);
        let samples = catalog.samples_at_station(&cruise_name, station)?;
        info!(
            cruise = %cruise_name,
            station,
            samples = samples.len(),
            bottles = rows.len(),
            "merging station readings"
        );

        for sample in samples {
            let Some(head) = rows.first().copied() else {
                continue;
            };
            fill_position(catalog, sheet, head, &sample, dry_run, report)?;

            let Some(depth) = sample.depth else {
                warn!(sample = %sample.sample_name, "sample has no depth");
                report.samples_without_depth.push(sample.sample_name.clone());
                continue;
            };
            let Some(bottle) = closest_bottle(sheet, &rows, depth) else {
                continue;
            };
            report.samples_matched += 1;
            debug!(
                sample = %sample.sample_name,
                depth,
                bottle_row = bottle.row,
                predicted_depth = bottle.predicted_depth,
                "closest bottle"
            );

            if bottle.difference >= DEPTH_WARNING_THRESHOLD {
                warn!(
                    cruise = %cruise_name,
                    station,
                    sample = %sample.sample_name,
                    difference = bottle.difference,
                    "large depth difference"
                );
                report.depth_warnings.push(DepthWarning {
                    cruise_name: cruise_name.clone(),
                    station,
                    sample_name: sample.sample_name.clone(),
                    difference: bottle.difference,
                });
            }

            apply_readings(
                catalog,
                sheet,
                bottle.row,
                first_reading,
                &sample,
                types,
                dry_run,
                report,
            )?;
        }
    }
    Ok(())
}

fn fill_position<C: Catalog + ?Sized>(
    catalog: &mut C,
    sheet: &WaterColumnSheet,
    head: usize,
    sample: &Sample,
    dry_run: bool,
    report: &mut CtdReport,
) -> Result<(), LoaderError> {
    if sample.latitude_start.is_some() && sample.longitude_start.is_some() {
        return Ok(());
    }
    let (Some(latitude), Some(longitude)) = (
        sample.latitude_start.or(sheet.latitude(head)),
        sample.longitude_start.or(sheet.longitude(head)),
    ) else {
        return Ok(());
    };
    info!(
        sample = %sample.sample_name,
        latitude,
        longitude,
        dry_run,
        "filling sample position from station"
    );
    catalog.update_sample_position(sample.id, latitude, longitude)?;
    report.positions_filled += 1;
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn apply_readings<C: Catalog + ?Sized>(
    catalog: &mut C,
    sheet: &WaterColumnSheet,
    row: usize,
    first_reading: usize,
    sample: &Sample,
    types: &AttributeTypeIndex,
    dry_run: bool,
    report: &mut CtdReport,
) -> Result<(), LoaderError> {
    let table = sheet.table();
    for index in first_reading..table.columns().len() {
        let cell = table.get_at(row, index);
        if cell.is_empty() || cell.as_f64() == Some(MISSING_READING) {
            continue;
        }
        let column = table.columns()[index].trim();
        let Some(attr_type) = types.get(column) else {
            if report.unknown_columns.insert(column.to_string()) {
                warn!(column, "no sample attribute type for reading column");
            }
            continue;
        };
        match overwrite_attribute(catalog, sample, attr_type, &cell.to_string(), dry_run)? {
            OverwriteOutcome::Inserted => report.attributes_inserted += 1,
            OverwriteOutcome::Updated => report.attributes_updated += 1,
            OverwriteOutcome::Unchanged => {}
        }
    }
    Ok(())
}
