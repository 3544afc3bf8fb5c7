//! Reusable table repairs composed by the per-source normalizers.

use std::sync::LazyLock;

use chrono::NaiveTime;
use regex::Regex;

use crate::error::LoaderError;
use crate::table::{Cell, Table};

static CLOCK_TIME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<hour>\d{1,2}):?(?P<minute>\d{2})(:\d{1,2})?$").unwrap()
});

/// Row offsets of each fixed-size block; the trailing block may be short.
pub fn blocks(len: usize, size: usize) -> impl Iterator<Item = usize> {
    (0..len).step_by(size.max(1))
}

/// Numeric value of a cell such as `S47` or `C1`, with the type letter dropped.
pub fn strip_type_letter(cell: &Cell) -> Option<f64> {
    match cell {
        Cell::Number(value) if !value.is_nan() => Some(*value),
        Cell::Text(value) => value
            .trim()
            .trim_start_matches(|ch: char| ch.is_ascii_alphabetic())
            .trim()
            .parse::<f64>()
            .ok(),
        _ => None,
    }
}

pub fn strip_type_letters(table: &mut Table, column: &str) -> Result<(), LoaderError> {
    for row in 0..table.len() {
        let cell = table.get(row, column);
        if cell.is_empty() {
            continue;
        }
        let value = strip_type_letter(cell).ok_or_else(|| LoaderError::InvalidCell {
            column: column.to_string(),
            row,
            value: cell.to_string(),
        })?;
        table.set(row, column, Cell::Number(value))?;
    }
    Ok(())
}

/// Converts `"<degrees> <decimal minutes>"` into signed decimal degrees.
///
/// `negate` marks the western or southern hemisphere.
pub fn degrees_minutes_to_decimal(text: &str, negate: bool) -> Option<f64> {
    let mut parts = text.split_whitespace();
    let degrees = parts.next()?.parse::<f64>().ok()?;
    let minutes = match parts.next() {
        Some(minutes) => minutes.parse::<f64>().ok()?,
        None => 0.0,
    };
    if parts.next().is_some() || !(0.0..60.0).contains(&minutes) {
        return None;
    }
    let magnitude = degrees.abs() + minutes / 60.0;
    if negate || degrees.is_sign_negative() {
        Some(-magnitude)
    } else {
        Some(magnitude)
    }
}

pub fn convert_degree_minutes(
    table: &mut Table,
    row: usize,
    column: &str,
    negate: bool,
) -> Result<(), LoaderError> {
    let cell = table.get(row, column);
    let converted = match cell {
        _ if cell.is_empty() => return Ok(()),
        Cell::Number(value) if negate => -value.abs(),
        Cell::Number(value) => *value,
        Cell::Text(text) => degrees_minutes_to_decimal(text, negate).ok_or_else(|| {
            LoaderError::InvalidCell {
                column: column.to_string(),
                row,
                value: text.clone(),
            }
        })?,
        other => {
            return Err(LoaderError::InvalidCell {
                column: column.to_string(),
                row,
                value: other.to_string(),
            });
        }
    };
    table.set(row, column, Cell::Number(converted))
}

/// Copies every empty cell of `target` from `source`, leaving `exclude` alone.
pub fn fill_empty_from(table: &mut Table, target: usize, source: usize, exclude: &[&str]) {
    if target >= table.len() || source >= table.len() {
        return;
    }
    for index in 0..table.columns().len() {
        if exclude.contains(&table.columns()[index].as_str()) {
            continue;
        }
        if table.get_at(target, index).is_empty() {
            let value = table.get_at(source, index).clone();
            table.set_at(target, index, value);
        }
    }
}

/// Fills the rows at `targets` offsets inside each block from the block's first row.
pub fn fill_within_blocks(table: &mut Table, size: usize, targets: &[usize], exclude: &[&str]) {
    for head in blocks(table.len(), size).collect::<Vec<_>>() {
        for offset in targets {
            fill_empty_from(table, head + offset, head, exclude);
        }
    }
}

/// Fills the first row of each block from the first row of the block before it.
pub fn fill_from_previous_block(table: &mut Table, size: usize, exclude: &[&str]) {
    for head in blocks(table.len(), size).skip(1).collect::<Vec<_>>() {
        fill_empty_from(table, head, head - size, exclude);
    }
}

/// Turns a bare cruise number such as `273` into `HOT273`.
pub fn prefixed_cruise_name(cell: &Cell, prefix: &str) -> Option<String> {
    match cell {
        _ if cell.is_empty() => None,
        Cell::Number(value) => Some(format!("{prefix}{}", value.trunc() as i64)),
        Cell::Text(text) if text.starts_with(prefix) => Some(text.clone()),
        Cell::Text(text) => match text.trim().parse::<f64>() {
            Ok(value) => Some(format!("{prefix}{}", value.trunc() as i64)),
            Err(_) => Some(format!("{prefix}{}", text.trim())),
        },
        other => Some(format!("{prefix}{other}")),
    }
}

pub fn prefix_cruise_name(table: &mut Table, row: usize, prefix: &str) -> Result<(), LoaderError> {
    if let Some(name) = prefixed_cruise_name(table.get(row, "cruise_name"), prefix) {
        table.set(row, "cruise_name", Cell::Text(name))?;
    }
    Ok(())
}

pub fn prefix_cruise_names(table: &mut Table, prefix: &str) -> Result<(), LoaderError> {
    for row in 0..table.len() {
        prefix_cruise_name(table, row, prefix)?;
    }
    Ok(())
}

/// Appends `suffix` to a file name that ends in `extension`.
pub fn append_suffix(
    table: &mut Table,
    row: usize,
    column: &str,
    extension: &str,
    suffix: &str,
) -> Result<(), LoaderError> {
    if let Some(name) = table.get(row, column).as_text()
        && name.ends_with(extension)
    {
        let repaired = format!("{name}{suffix}");
        table.set(row, column, Cell::Text(repaired))?;
    }
    Ok(())
}

pub fn strip_suffix(
    table: &mut Table,
    row: usize,
    column: &str,
    suffix: &str,
) -> Result<(), LoaderError> {
    if let Some(stripped) = table
        .get(row, column)
        .as_text()
        .and_then(|name| name.strip_suffix(suffix))
    {
        let stripped = stripped.to_string();
        table.set(row, column, Cell::Text(stripped))?;
    }
    Ok(())
}

/// Rewrites a controlled-vocabulary cell; any other value is rejected.
pub fn require_vocabulary(
    table: &mut Table,
    row: usize,
    column: &str,
    expected: &str,
    replacement: &str,
) -> Result<(), LoaderError> {
    let cell = table.get(row, column);
    if cell.as_text() != Some(expected) {
        return Err(LoaderError::UnexpectedValue {
            column: column.to_string(),
            row,
            value: cell.to_string(),
            expected: expected.to_string(),
        });
    }
    table.set(row, column, Cell::text(replacement))
}

/// Parses clock times written as `12:45:00`, `12:45` or `1245`.
pub fn parse_clock_time(text: &str) -> Option<NaiveTime> {
    let captures = CLOCK_TIME.captures(text.trim())?;
    let hour = captures.name("hour")?.as_str().parse::<u32>().ok()?;
    let minute = captures.name("minute")?.as_str().parse::<u32>().ok()?;
    NaiveTime::from_hms_opt(hour, minute, 0)
}

pub fn normalize_clock_time(
    table: &mut Table,
    row: usize,
    column: &str,
) -> Result<(), LoaderError> {
    let cell = table.get(row, column);
    let time = match cell {
        _ if cell.is_empty() => return Ok(()),
        Cell::Time(_) => return Ok(()),
        Cell::DateTime(value) => Some(value.time()),
        Cell::Number(value) => parse_clock_time(&format!("{:04}", value.trunc() as i64)),
        Cell::Text(text) => parse_clock_time(text),
        Cell::Empty => None,
    }
    .ok_or_else(|| LoaderError::InvalidCell {
        column: column.to_string(),
        row,
        value: cell.to_string(),
    })?;
    table.set(row, column, Cell::Time(time))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(columns: &[&str], rows: Vec<Vec<Cell>>) -> Table {
        Table::new(columns.iter().map(|c| c.to_string()).collect(), rows)
    }

    #[test]
    fn type_letters_are_stripped() {
        assert_eq!(strip_type_letter(&Cell::text("S47")), Some(47.0));
        assert_eq!(strip_type_letter(&Cell::text("C1")), Some(1.0));
        assert_eq!(strip_type_letter(&Cell::Number(3.0)), Some(3.0));
        assert_eq!(strip_type_letter(&Cell::text("net tow")), None);
    }

    #[test]
    fn degree_minutes_convert() {
        assert_eq!(degrees_minutes_to_decimal("22 30", false), Some(22.5));
        assert_eq!(degrees_minutes_to_decimal("158 15", true), Some(-158.25));
        assert_eq!(degrees_minutes_to_decimal("-158 15", false), Some(-158.25));
        assert_eq!(degrees_minutes_to_decimal("22 75", false), None);
    }

    #[test]
    fn clock_times_parse() {
        assert_eq!(parse_clock_time("1245"), NaiveTime::from_hms_opt(12, 45, 0));
        assert_eq!(parse_clock_time("12:45:00"), NaiveTime::from_hms_opt(12, 45, 0));
        assert_eq!(parse_clock_time("9:05"), NaiveTime::from_hms_opt(9, 5, 0));
        assert_eq!(parse_clock_time("noon"), None);
    }

    #[test]
    fn block_fill_skips_excluded_columns() {
        let mut t = table(
            &["sample_name", "cruise_name", "depth"],
            vec![
                vec![Cell::text("S1"), Cell::text("HOT300"), Cell::Number(10.0)],
                vec![Cell::Empty, Cell::Empty, Cell::Empty],
            ],
        );
        fill_within_blocks(&mut t, 2, &[1], &["depth"]);
        assert_eq!(t.get(1, "sample_name"), &Cell::text("S1"));
        assert_eq!(t.get(1, "cruise_name"), &Cell::text("HOT300"));
        assert!(t.get(1, "depth").is_empty());
    }

    #[test]
    fn previous_block_fill_chains() {
        let mut t = table(
            &["pi", "seq_name"],
            vec![
                vec![Cell::text("Caron"), Cell::text("a_R1")],
                vec![Cell::Empty, Cell::text("a_R2")],
                vec![Cell::Empty, Cell::text("b_R1")],
                vec![Cell::Empty, Cell::text("b_R2")],
                vec![Cell::text("nan"), Cell::text("c_R1")],
            ],
        );
        fill_from_previous_block(&mut t, 2, &[]);
        assert_eq!(t.get(2, "pi"), &Cell::text("Caron"));
        assert_eq!(t.get(4, "pi"), &Cell::text("Caron"));
        assert!(t.get(1, "pi").is_empty());
    }

    #[test]
    fn cruise_numbers_get_prefix() {
        assert_eq!(
            prefixed_cruise_name(&Cell::Number(273.0), "HOT").as_deref(),
            Some("HOT273")
        );
        assert_eq!(
            prefixed_cruise_name(&Cell::text("HOT273"), "HOT").as_deref(),
            Some("HOT273")
        );
        assert_eq!(prefixed_cruise_name(&Cell::Empty, "HOT"), None);
    }
}
