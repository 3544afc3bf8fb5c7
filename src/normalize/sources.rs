use crate::error::LoaderError;
use crate::table::{Cell, Table};

use super::transforms::{
    append_suffix, blocks, convert_degree_minutes, fill_empty_from, fill_from_previous_block,
    fill_within_blocks, normalize_clock_time, prefix_cruise_name, prefix_cruise_names,
    require_vocabulary, strip_suffix, strip_type_letters,
};

const HOT_PREFIX: &str = "HOT";
const MESO_SCOPE_CRUISE: &str = "MESO-SCOPE";
const TAR_SUFFIX: &str = ".fastq.tar";
const DEPTH_SENTINEL: f64 = 999.0;
const HOT_ROWS_IN_BATS_SHEET: usize = 132;

/// The header of the tenth column sits on the wrong sheet row.
pub(super) fn caron_18s_diel(table: &mut Table) -> Result<(), LoaderError> {
    table.rename_column_at(9, "seq_name")?;
    strip_type_letters(table, "station")?;
    strip_type_letters(table, "cast_num")
}

pub(super) fn caron_vertical_profile(table: &mut Table) {
    fill_from_previous_block(table, 2, &[]);
}

pub(super) fn caron_hot273(table: &mut Table) -> Result<(), LoaderError> {
    prefix_cruise_names(table, HOT_PREFIX)?;
    table.insert_column("collection_time", Cell::Time(chrono::NaiveTime::MIN));
    Ok(())
}

pub(super) fn caron_hot_quarterly(table: &mut Table) -> Result<(), LoaderError> {
    prefix_cruise_names(table, HOT_PREFIX)
}

/// Rows past the HOT cruises belong to BATS and are dropped.
pub(super) fn chisholm_hot_bats(table: &mut Table) {
    table.rename_column("Unnamed: 9", "seq_name");
    table.truncate(HOT_ROWS_IN_BATS_SHEET);
}

/// Heads are repaired in order so each one can borrow from the repaired head
/// before it. Missing depths get a sentinel that is cleaned up by hand later.
pub(super) fn church_tricho(table: &mut Table) -> Result<(), LoaderError> {
    for head in blocks(table.len(), 2).collect::<Vec<_>>() {
        if table.get(head, "cast_num").as_text() == Some("net tow") {
            table.set(head, "cast_num", Cell::Number(0.0))?;
        }
        prefix_cruise_name(table, head, HOT_PREFIX)?;
        if table.get(head, "depth").is_empty() {
            table.set(head, "depth", Cell::Number(DEPTH_SENTINEL))?;
        }

        if head == 0 {
            if let Some(time) = table.get(0, "collection_date").as_time() {
                table.set(0, "collection_time", Cell::Time(time))?;
            }
        } else {
            fill_empty_from(table, head, head - 2, &["depth"]);
        }
    }
    Ok(())
}

/// Blocks of four rows: an mRNA pair followed by a total RNA pair.
pub(super) fn dyhrman_quad(table: &mut Table, strip_tar: bool) -> Result<(), LoaderError> {
    for head in blocks(table.len(), 4).collect::<Vec<_>>() {
        if strip_tar {
            strip_suffix(table, head, "sample_name", TAR_SUFFIX)?;
        }
        require_rna_vocabulary(table, head)?;
        for row in head..(head + 4).min(table.len()) {
            append_suffix(table, row, "seq_name", ".fastq", ".gz")?;
        }
    }
    fill_within_blocks(table, 4, &[2], &[]);
    Ok(())
}

pub(super) fn dyhrman_hl2a_incubation(table: &mut Table) -> Result<(), LoaderError> {
    for head in blocks(table.len(), 2).collect::<Vec<_>>() {
        strip_suffix(table, head, "sample_name", TAR_SUFFIX)?;
        append_suffix(table, head, "seq_name", ".fastq", ".gz")?;
        append_suffix(table, head + 1, "seq_name", ".fastq", ".gz")?;
        if head > 0 {
            fill_empty_from(table, head, head - 2, &[]);
        }
    }
    Ok(())
}

/// Net tow samples: no station or cast, positions written as degrees and
/// decimal minutes on the head rows only.
pub(super) fn dyhrman_tricho(table: &mut Table) -> Result<(), LoaderError> {
    table.insert_column("station", Cell::Number(0.0));
    table.insert_column("cast_num", Cell::Number(0.0));

    for head in blocks(table.len(), 2).collect::<Vec<_>>() {
        for row in head..(head + 2).min(table.len()) {
            append_suffix(table, row, "seq_name", ".fastq", ".gz")?;
            require_vocabulary(table, row, "data_type", "reads", "Reads")?;
        }
        if head > 0 {
            fill_empty_from(table, head, head - 2, &["latitude", "longitude"]);
        }
    }

    for head in blocks(table.len(), 2).collect::<Vec<_>>() {
        convert_degree_minutes(table, head, "latitude", false)?;
        convert_degree_minutes(table, head, "longitude", true)?;
    }
    Ok(())
}

pub(super) fn dyhrman_meso_scope(table: &mut Table) -> Result<(), LoaderError> {
    for head in blocks(table.len(), 4).collect::<Vec<_>>() {
        table.set(head, "cruise_name", Cell::text(MESO_SCOPE_CRUISE))?;
        require_rna_vocabulary(table, head)?;
        normalize_clock_time(table, head, "collection_time")?;
    }
    fill_within_blocks(table, 4, &[2], &[]);
    Ok(())
}

fn require_rna_vocabulary(table: &mut Table, head: usize) -> Result<(), LoaderError> {
    require_vocabulary(table, head, "data_type", "mRNA reads", "mRNA Reads")?;
    if head + 2 < table.len() {
        require_vocabulary(table, head + 2, "data_type", "total RNA reads", "Total RNA Reads")?;
    }
    Ok(())
}
