use std::collections::HashMap;

use calamine::{Data, Reader, open_workbook_auto};
use camino::Utf8Path;
use chrono::NaiveDateTime;

use crate::error::LoaderError;
use crate::table::{Cell, Table};

/// Reads one worksheet into a header-addressed table.
///
/// `skip_rows` holds zero-based sheet row numbers to drop before the header
/// row is taken; the first row that is not skipped becomes the header.
pub trait SheetReader {
    fn read_table(
        &self,
        path: &Utf8Path,
        sheet: Option<&str>,
        skip_rows: &[usize],
    ) -> Result<Table, LoaderError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CalamineReader;

impl CalamineReader {
    pub fn new() -> Self {
        Self
    }
}

impl SheetReader for CalamineReader {
    fn read_table(
        &self,
        path: &Utf8Path,
        sheet: Option<&str>,
        skip_rows: &[usize],
    ) -> Result<Table, LoaderError> {
        let mut workbook = open_workbook_auto(path.as_std_path())
            .map_err(|err| LoaderError::Spreadsheet(format!("open {path}: {err}")))?;

        let sheet_name = match sheet {
            Some(name) => name.to_string(),
            None => workbook
                .sheet_names()
                .first()
                .cloned()
                .ok_or_else(|| LoaderError::Spreadsheet(format!("{path} has no sheets")))?,
        };
        let range = workbook
            .worksheet_range(&sheet_name)
            .map_err(|err| LoaderError::Spreadsheet(format!("{path} [{sheet_name}]: {err}")))?;

        let (first_row, first_col) = range
            .start()
            .map(|(row, col)| (row as usize, col as usize))
            .unwrap_or((0, 0));

        // rows are numbered from the top of the sheet, not from the first used cell
        let mut grid: Vec<Vec<Cell>> = (0..first_row).map(|_| Vec::new()).collect();
        for cells in range.rows() {
            let mut row = vec![Cell::Empty; first_col];
            row.extend(cells.iter().map(convert_cell));
            grid.push(row);
        }

        Ok(build_table(grid, skip_rows))
    }
}

/// Turns a raw sheet grid into a table: skipped rows removed, first remaining
/// row used as header, fully blank data rows dropped.
pub fn build_table(grid: Vec<Vec<Cell>>, skip_rows: &[usize]) -> Table {
    let mut remaining = grid
        .into_iter()
        .enumerate()
        .filter(|(index, _)| !skip_rows.contains(index))
        .map(|(_, row)| row);

    let header = remaining.next().unwrap_or_default();
    let rows = remaining
        .filter(|row| !row.iter().all(Cell::is_empty))
        .collect::<Vec<_>>();

    let width = rows
        .iter()
        .map(Vec::len)
        .chain(std::iter::once(header.len()))
        .max()
        .unwrap_or(0);

    let mut seen = HashMap::<String, usize>::new();
    let columns = (0..width)
        .map(|index| {
            let name = match header.get(index) {
                Some(cell) if !cell.is_empty() => cell.to_string(),
                _ => format!("Unnamed: {index}"),
            };
            let count = seen.entry(name.clone()).or_insert(0);
            let unique = if *count == 0 {
                name
            } else {
                format!("{name}.{count}")
            };
            *count += 1;
            unique
        })
        .collect::<Vec<_>>();

    Table::new(columns, rows)
}

fn convert_cell(data: &Data) -> Cell {
    match data {
        Data::Empty | Data::Error(_) => Cell::Empty,
        Data::Int(value) => Cell::Number(*value as f64),
        Data::Float(value) => Cell::Number(*value),
        Data::String(value) => Cell::Text(value.clone()),
        Data::Bool(value) => Cell::Text(if *value { "True" } else { "False" }.to_string()),
        Data::DateTime(value) => match value.as_datetime() {
            // serial values below one day carry only a time of day
            Some(datetime) if value.as_f64() < 1.0 => Cell::Time(datetime.time()),
            Some(datetime) => Cell::DateTime(datetime),
            None => Cell::Number(value.as_f64()),
        },
        Data::DateTimeIso(value) => NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S")
            .map(Cell::DateTime)
            .unwrap_or_else(|_| Cell::Text(value.clone())),
        Data::DurationIso(value) => Cell::Text(value.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(value: &str) -> Cell {
        Cell::text(value)
    }

    #[test]
    fn header_comes_after_skipped_rows() {
        let grid = vec![
            vec![text("core attributes")],
            vec![text("sample_name"), Cell::Empty, text("depth")],
            vec![text("units"), Cell::Empty, text("m")],
            vec![text("S1"), text("f1.fastq"), Cell::Number(10.0)],
            vec![Cell::Empty, Cell::Empty, Cell::Empty],
            vec![Cell::Empty, text("f2.fastq")],
        ];

        let table = build_table(grid, &[0, 2]);
        assert_eq!(table.columns(), ["sample_name", "Unnamed: 1", "depth"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.get(1, "Unnamed: 1"), &text("f2.fastq"));
        assert_eq!(table.get(0, "depth"), &Cell::Number(10.0));
    }

    #[test]
    fn duplicate_headers_are_numbered() {
        let grid = vec![vec![text("depth"), text("depth")], vec![text("1"), text("2")]];
        let table = build_table(grid, &[]);
        assert_eq!(table.columns(), ["depth", "depth.1"]);
    }
}
