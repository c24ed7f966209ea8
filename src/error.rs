use std::path::PathBuf;

use thiserror::Error;

/// Application error type
///
/// Every variant is fatal for the run. Cell-level validation failures are
/// reported through `validators::Outcome` instead and never reach this type.
#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Excel error: {0}")]
    Excel(#[from] calamine::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("cannot open {}: {source}", .path.display())]
    FileOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("table has no header row: {}", .path.display())]
    EmptyTable { path: PathBuf },

    #[error("parameter table {} has no '{attribute}' row", .path.display())]
    MissingAttribute {
        attribute: &'static str,
        path: PathBuf,
    },

    #[error("parameter table {} defines the '{attribute}' row more than once", .path.display())]
    DuplicateAttribute {
        attribute: &'static str,
        path: PathBuf,
    },

    #[error("parameter table {} lists column '{column}' more than once", .path.display())]
    DuplicateColumn { column: String, path: PathBuf },

    #[error(
        "parameter table {} has no entry for column(s): {}",
        .path.display(),
        .columns.join(", ")
    )]
    MissingColumnRules { columns: Vec<String>, path: PathBuf },

    #[error("column '{column}' has unrecognized data type '{value}' (expected integer, number, date or string)")]
    UnknownDataType { column: String, value: String },

    #[error("column '{column}' has an invalid {attribute} pattern '{pattern}': {source}")]
    InvalidPattern {
        column: String,
        attribute: &'static str,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("column '{column}' has an invalid {attribute} date format '{format}'")]
    InvalidDateFormat {
        column: String,
        attribute: &'static str,
        format: String,
    },

    #[error("date column '{column}' needs a Base Format")]
    MissingDateFormat { column: String },
}
