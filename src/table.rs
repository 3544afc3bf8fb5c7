use std::fmt;
use std::ops::Deref;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::error::LoaderError;

/// Text forms that the spreadsheet exports use for a missing value.
const MISSING_MARKERS: [&str; 3] = ["", "nan", "NaT"];

/// Columns every normalized attribute table must carry.
pub const REQUIRED_COLUMNS: [&str; 11] = [
    "sample_name",
    "seq_name",
    "pi",
    "cruise_name",
    "station",
    "cast_num",
    "depth",
    "collection_date",
    "collection_time",
    "latitude",
    "longitude",
];

pub const DATA_TYPE_COLUMN: &str = "data_type";

static EMPTY_CELL: Cell = Cell::Empty;

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    DateTime(NaiveDateTime),
    Time(NaiveTime),
}

impl Cell {
    pub fn text(value: impl Into<String>) -> Self {
        Cell::Text(value.into())
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(value) => MISSING_MARKERS.contains(&value.trim()),
            Cell::Number(value) => value.is_nan(),
            Cell::DateTime(_) | Cell::Time(_) => false,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Cell::Text(value) if !self.is_empty() => Some(value.as_str()),
            _ => None,
        }
    }

    /// Numeric view of the cell; numeric text is accepted, missing markers
    /// and non-finite values are not.
    pub fn as_f64(&self) -> Option<f64> {
        if self.is_empty() {
            return None;
        }
        let value = match self {
            Cell::Number(value) => *value,
            Cell::Text(value) => value.trim().parse::<f64>().ok()?,
            _ => return None,
        };
        value.is_finite().then_some(value)
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Cell::DateTime(value) => Some(value.date()),
            Cell::Text(value) => NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
                .ok()
                .or_else(|| {
                    NaiveDateTime::parse_from_str(value.trim(), "%Y-%m-%d %H:%M:%S")
                        .ok()
                        .map(|dt| dt.date())
                }),
            _ => None,
        }
    }

    pub fn as_time(&self) -> Option<NaiveTime> {
        match self {
            Cell::Time(value) => Some(*value),
            Cell::DateTime(value) => Some(value.time()),
            Cell::Text(value) => NaiveTime::parse_from_str(value.trim(), "%H:%M:%S")
                .ok()
                .or_else(|| NaiveTime::parse_from_str(value.trim(), "%H:%M").ok()),
            _ => None,
        }
    }

    /// String stored in a sample attribute row, `None` for missing values.
    pub fn to_attribute_value(&self) -> Option<String> {
        if self.is_empty() {
            return None;
        }
        Some(self.to_string())
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Empty => write!(f, "nan"),
            Cell::Text(value) => write!(f, "{value}"),
            Cell::Number(value) => write!(f, "{value}"),
            Cell::DateTime(value) => write!(f, "{}", value.format("%Y-%m-%d %H:%M:%S")),
            Cell::Time(value) => write!(f, "{}", value.format("%H:%M:%S")),
        }
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::Number(value)
    }
}

/// Header-addressed rows read from one worksheet.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Cell>>) -> Self {
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, Cell::Empty);
                row
            })
            .collect();
        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    fn require_column(&self, name: &str) -> Result<usize, LoaderError> {
        self.column_index(name)
            .ok_or_else(|| LoaderError::MissingColumn(name.to_string()))
    }

    /// Cell at `row`/`column`; absent columns and rows read as empty.
    pub fn get(&self, row: usize, column: &str) -> &Cell {
        self.column_index(column)
            .and_then(|index| self.rows.get(row).and_then(|cells| cells.get(index)))
            .unwrap_or(&EMPTY_CELL)
    }

    pub fn get_at(&self, row: usize, column: usize) -> &Cell {
        self.rows
            .get(row)
            .and_then(|cells| cells.get(column))
            .unwrap_or(&EMPTY_CELL)
    }

    pub fn set(&mut self, row: usize, column: &str, cell: Cell) -> Result<(), LoaderError> {
        let index = self.require_column(column)?;
        let cells = self
            .rows
            .get_mut(row)
            .ok_or_else(|| LoaderError::MissingColumn(format!("{column} (row {row})")))?;
        cells[index] = cell;
        Ok(())
    }

    /// Positional write; out-of-range coordinates are ignored.
    pub fn set_at(&mut self, row: usize, column: usize, cell: Cell) {
        if let Some(slot) = self.rows.get_mut(row).and_then(|cells| cells.get_mut(column)) {
            *slot = cell;
        }
    }

    pub fn rename_column(&mut self, from: &str, to: &str) {
        if let Some(index) = self.column_index(from) {
            self.columns[index] = to.to_string();
        }
    }

    pub fn rename_column_at(&mut self, index: usize, to: &str) -> Result<(), LoaderError> {
        let column = self
            .columns
            .get_mut(index)
            .ok_or_else(|| LoaderError::MissingColumn(format!("column {}", index + 1)))?;
        *column = to.to_string();
        Ok(())
    }

    /// Adds `name` filled with `fill`, or overwrites every cell if it exists.
    pub fn insert_column(&mut self, name: &str, fill: Cell) {
        match self.column_index(name) {
            Some(index) => {
                for row in &mut self.rows {
                    row[index] = fill.clone();
                }
            }
            None => {
                self.columns.push(name.to_string());
                for row in &mut self.rows {
                    row.push(fill.clone());
                }
            }
        }
    }

    pub fn truncate(&mut self, len: usize) {
        self.rows.truncate(len);
    }

    pub fn row(&self, index: usize) -> Option<&[Cell]> {
        self.rows.get(index).map(Vec::as_slice)
    }
}

/// A table whose columns satisfy the normalized attribute row shape.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalTable(Table);

impl CanonicalTable {
    pub fn has_data_type(&self) -> bool {
        self.0.has_column(DATA_TYPE_COLUMN)
    }

    pub fn into_inner(self) -> Table {
        self.0
    }
}

impl TryFrom<Table> for CanonicalTable {
    type Error = LoaderError;

    fn try_from(table: Table) -> Result<Self, Self::Error> {
        for column in REQUIRED_COLUMNS {
            if !table.has_column(column) {
                return Err(LoaderError::MissingColumn(column.to_string()));
            }
        }
        Ok(Self(table))
    }
}

impl Deref for CanonicalTable {
    type Target = Table;

    fn deref(&self) -> &Table {
        &self.0
    }
}
