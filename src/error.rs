use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum LoaderError {
    #[error("failed to parse file path \"{0}\"")]
    UnrecognizedFileName(String),

    #[error("file name \"{name}\" matched too many sample name patterns: {}", .labels.join(", "))]
    #[diagnostic(help("sample name patterns must not overlap"))]
    AmbiguousFileName { name: String, labels: Vec<String> },

    #[error("failed to find file type for \"{0}\"")]
    UnknownFileType(String),

    #[error("found too many file types for \"{name}\": {}", .types.join(", "))]
    AmbiguousFileType { name: String, types: Vec<String> },

    #[error("unexpected value \"{value}\" in column \"{column}\" on row {row} (expected \"{expected}\")")]
    #[diagnostic(help("the spreadsheet uses a convention that has not been reviewed yet"))]
    UnexpectedValue {
        column: String,
        row: usize,
        value: String,
        expected: String,
    },

    #[error("no investigator with last name \"{0}\"")]
    UnknownInvestigator(String),

    #[error("no station {station} for cruise \"{cruise}\"")]
    UnknownStation { cruise: String, station: i64 },

    #[error("sample {sample_id} has more than one \"{attr_type}\" attribute")]
    DuplicateAttribute { sample_id: i64, attr_type: String },

    #[error("found {count} samples with sample name \"{sample_name}\"")]
    DuplicateSampleIdentity { sample_name: String, count: usize },

    #[error("more than one {entity} row for \"{key}\"")]
    DuplicateRecord { entity: &'static str, key: String },

    #[error("missing column: {0}")]
    MissingColumn(String),

    #[error("invalid value \"{value}\" in column \"{column}\" on row {row}")]
    InvalidCell {
        column: String,
        row: usize,
        value: String,
    },

    #[error("no normalizer for attribute spreadsheet \"{0}\"")]
    UnknownSheetFormat(String),

    #[error("sample file type \"{0}\" is not registered in the catalog")]
    UnregisteredFileType(String),

    #[error("spreadsheet error: {0}")]
    Spreadsheet(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("invalid pattern \"{pattern}\": {message}")]
    InvalidPattern { pattern: String, message: String },
}

impl From<rusqlite::Error> for LoaderError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Database(err.to_string())
    }
}
