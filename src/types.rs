use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Source table used when no path is given on the command line
pub const DEFAULT_SOURCE_FILE: &str = "source.csv";

/// Parameter table used when no path is given on the command line
pub const DEFAULT_PARAMETER_FILE: &str = "parameters.csv";

/// Suffix of the clean sink, appended to the run stamp
pub const CLEAN_SUFFIX: &str = "tidyData.csv";

/// Suffix of the outlier sink, appended to the run stamp
pub const OUTLIER_SUFFIX: &str = "outliers.csv";

/// Run stamp format (minute granularity)
pub const RUN_STAMP_FORMAT: &str = "%Y%m%d%H%M";

/// Default timestamp layout read by the offsets utility
pub const DEFAULT_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Default delimiter of the reorder utility's inputs
pub const DEFAULT_TEMPLATE_DELIMITER: char = ';';

/// Declared data type of a source column
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DType {
    Integer,
    Number,
    Date,
    String,
    /// Only produced when the parameter table is loaded leniently
    Unrecognized(String),
}

impl DType {
    /// Parse a "Data Type" cell against the closed set of known types
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "integer" => Some(DType::Integer),
            "number" => Some(DType::Number),
            "date" => Some(DType::Date),
            "string" => Some(DType::String),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            DType::Integer => "integer",
            DType::Number => "number",
            DType::Date => "date",
            DType::String => "string",
            DType::Unrecognized(raw) => raw.as_str(),
        }
    }
}

/// Attribute rows of the parameter table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Attribute {
    DataType,
    BaseFormat,
    DesiredFormat,
    NewName,
}

impl Attribute {
    pub const ALL: [Attribute; 4] = [
        Attribute::DataType,
        Attribute::BaseFormat,
        Attribute::DesiredFormat,
        Attribute::NewName,
    ];

    /// Row label as written in the parameter table
    pub fn label(self) -> &'static str {
        match self {
            Attribute::DataType => "Data Type",
            Attribute::BaseFormat => "Base Format",
            Attribute::DesiredFormat => "Desired Format",
            Attribute::NewName => "New Name",
        }
    }

    /// Match a row label, ignoring case and surrounding whitespace
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        Self::ALL
            .into_iter()
            .find(|attr| attr.label().eq_ignore_ascii_case(label))
    }
}

/// Supported table formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Csv,
    Tsv,
    Excel,
}

impl FileFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "csv" => Some(FileFormat::Csv),
            "tsv" | "tab" => Some(FileFormat::Tsv),
            "xlsx" | "xls" | "xlsm" | "xlsb" => Some(FileFormat::Excel),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> crate::types::Result<Self> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        FileFormat::from_extension(ext).ok_or_else(|| {
            crate::error::Error::UnsupportedFormat(format!(
                "Unsupported file extension: .{}",
                ext
            ))
        })
    }
}

/// Options for a cleaning run
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Source data table
    pub source: PathBuf,

    /// Parameter table
    pub parameters: PathBuf,

    /// Directory receiving both sinks
    pub output_dir: PathBuf,

    /// Prefix shared by both sink names
    pub run_stamp: String,

    /// Accept unknown data types and reject their cells instead of aborting
    pub lenient_types: bool,

    /// Record a SHA-256 digest of the source in the summary
    pub hash_source: bool,
}

impl RunOptions {
    pub fn new(source: PathBuf, parameters: PathBuf, run_stamp: String) -> Self {
        Self {
            source,
            parameters,
            output_dir: PathBuf::from("."),
            run_stamp,
            lenient_types: false,
            hash_source: true,
        }
    }
}

/// Outcome of a completed cleaning run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_stamp: String,
    pub source: PathBuf,
    pub parameters: PathBuf,

    /// SHA-256 of the source table
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_sha256: Option<String>,

    pub clean_path: PathBuf,

    /// Absent when every row passed and the outlier sink was removed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outlier_path: Option<PathBuf>,

    pub rows_read: u64,
    pub clean_rows: u64,
    pub outlier_rows: u64,

    /// Rejections per reason code
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub rejections: BTreeMap<String, u64>,
}

/// Result type for the application
pub type Result<T> = std::result::Result<T, crate::error::Error>;
