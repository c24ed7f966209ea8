use std::fmt;

use csv::StringRecord;
use tracing::debug;

use crate::parameters::{ColumnRule, ParameterTable};
use crate::types::Result;
use crate::validators::{Outcome, RejectReason};

/// Why a row was diverted to the outlier sink
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    /// A cell failed its column's check
    Cell { column: usize, reason: RejectReason },
    /// The row does not have one field per header column
    FieldCount { expected: usize, found: usize },
}

impl Failure {
    pub fn code(&self) -> &'static str {
        match self {
            Failure::Cell { reason, .. } => reason.code(),
            Failure::FieldCount { .. } => "field-count-mismatch",
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Failure::Cell { column, reason } => write!(f, "column {}: {}", column + 1, reason),
            Failure::FieldCount { expected, found } => {
                write!(f, "expected {} fields, found {}", expected, found)
            }
        }
    }
}

/// A source row after every cell has been checked
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedRow {
    /// Accepted values by position; slots of rejected cells stay empty
    pub transformed: Vec<String>,
    pub failures: Vec<Failure>,
}

impl ProcessedRow {
    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Applies each header column's rule to the cells of a row
pub struct RowProcessor<'a> {
    columns: &'a [String],
    rules: Vec<&'a ColumnRule>,
}

impl<'a> RowProcessor<'a> {
    /// Bind the source header to its rules; fails if any column has no rule
    pub fn new(table: &'a ParameterTable, header: &'a [String]) -> Result<Self> {
        let rules = table.resolve(header)?;
        Ok(Self {
            columns: header,
            rules,
        })
    }

    pub fn width(&self) -> usize {
        self.rules.len()
    }

    /// Check one row; `line` is only used for diagnostics
    pub fn process(&self, line: u64, record: &StringRecord) -> ProcessedRow {
        let mut transformed = vec![String::new(); self.rules.len()];
        let mut failures = Vec::new();

        if record.len() != self.rules.len() {
            let failure = Failure::FieldCount {
                expected: self.rules.len(),
                found: record.len(),
            };
            debug!(line, %failure, "row rejected");
            failures.push(failure);
        }

        for (column, (rule, value)) in self.rules.iter().zip(record.iter()).enumerate() {
            match rule.check().apply(value) {
                Outcome::Accepted(clean) => transformed[column] = clean,
                Outcome::Rejected(reason) => {
                    debug!(
                        line,
                        column = %self.columns[column],
                        reason = %reason,
                        "cell rejected"
                    );
                    failures.push(Failure::Cell { column, reason });
                }
            }
        }

        ProcessedRow {
            transformed,
            failures,
        }
    }
}
