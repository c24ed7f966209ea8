//! Parameter table: the researcher-maintained description of each column.
//!
//! The table is laid out with attribute rows and one column per source
//! column:
//!
//! ```text
//!                 age      visit_date   notes
//! Data Type       integer  date         string
//! Base Format     \d+      %d-%m-%Y
//! Desired Format           %Y/%m/%d
//! New Name        Age      VisitDate
//! ```
//!
//! It is loaded once, validated completely, and never mutated.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::Error;
use crate::readers::{create_reader, Rows};
use crate::types::{Attribute, DType, Result};
use crate::validators::CellCheck;

/// Rule for a single source column
#[derive(Debug, Clone)]
pub struct ColumnRule {
    pub data_type: DType,
    pub base_format: Option<String>,
    pub desired_format: Option<String>,
    pub new_name: Option<String>,
    check: CellCheck,
}

impl ColumnRule {
    /// The compiled validator for this column
    pub fn check(&self) -> &CellCheck {
        &self.check
    }
}

/// Immutable mapping from source column name to its rule
#[derive(Debug, Clone)]
pub struct ParameterTable {
    path: PathBuf,
    rules: HashMap<String, ColumnRule>,
}

impl ParameterTable {
    /// Load and validate a parameter table from CSV, TSV or Excel
    ///
    /// With `lenient_types`, an unknown Data Type is kept and every cell of
    /// that column will be rejected; otherwise it aborts the load.
    pub fn load(path: &Path, lenient_types: bool) -> Result<Self> {
        let rows = create_reader(path)?.read_rows()?;
        Self::from_rows(path, rows, lenient_types)
    }

    /// Build a table from rows already read, header row first
    pub fn from_rows(path: &Path, rows: Rows, lenient_types: bool) -> Result<Self> {
        let mut rows = rows.into_iter();
        let header = rows.next().ok_or_else(|| Error::EmptyTable {
            path: path.to_path_buf(),
        })?;

        // The first header cell labels the attribute column and is not a column name
        let columns: Vec<String> = header.into_iter().skip(1).collect();
        let mut seen = HashSet::new();
        for column in &columns {
            if !seen.insert(column.as_str()) {
                return Err(Error::DuplicateColumn {
                    column: column.clone(),
                    path: path.to_path_buf(),
                });
            }
        }

        let mut attribute_rows: HashMap<Attribute, Vec<String>> = HashMap::new();
        for row in rows {
            let Some(label) = row.first() else {
                continue;
            };
            let Some(attribute) = Attribute::from_label(label) else {
                debug!(label = %label, "ignoring unknown parameter row");
                continue;
            };
            if attribute_rows.contains_key(&attribute) {
                return Err(Error::DuplicateAttribute {
                    attribute: attribute.label(),
                    path: path.to_path_buf(),
                });
            }
            attribute_rows.insert(attribute, row.into_iter().skip(1).collect());
        }

        for attribute in Attribute::ALL {
            if !attribute_rows.contains_key(&attribute) {
                return Err(Error::MissingAttribute {
                    attribute: attribute.label(),
                    path: path.to_path_buf(),
                });
            }
        }

        let cell = |attribute: Attribute, index: usize| -> Option<String> {
            attribute_rows
                .get(&attribute)
                .and_then(|row| row.get(index))
                .filter(|value| !value.trim().is_empty())
                .cloned()
        };

        let mut rules = HashMap::with_capacity(columns.len());
        for (index, column) in columns.iter().enumerate() {
            if column.trim().is_empty() {
                continue;
            }

            let raw_type = cell(Attribute::DataType, index).unwrap_or_default();
            let data_type = match DType::from_name(&raw_type) {
                Some(dtype) => dtype,
                None if lenient_types => {
                    warn!(
                        column = %column,
                        data_type = %raw_type,
                        "unrecognized data type; every value in this column will be an outlier"
                    );
                    DType::Unrecognized(raw_type)
                }
                None => {
                    return Err(Error::UnknownDataType {
                        column: column.clone(),
                        value: raw_type,
                    })
                }
            };

            let base_format = cell(Attribute::BaseFormat, index);
            let desired_format = cell(Attribute::DesiredFormat, index);
            let check = CellCheck::compile(
                column,
                &data_type,
                base_format.as_deref(),
                desired_format.as_deref(),
            )?;

            rules.insert(
                column.clone(),
                ColumnRule {
                    data_type,
                    base_format,
                    desired_format,
                    new_name: cell(Attribute::NewName, index),
                    check,
                },
            );
        }

        debug!(path = %path.display(), columns = rules.len(), "parameter table loaded");
        Ok(Self {
            path: path.to_path_buf(),
            rules,
        })
    }

    /// Look up one attribute of one column
    pub fn lookup(&self, column: &str, attribute: Attribute) -> Option<&str> {
        let rule = self.rules.get(column)?;
        match attribute {
            Attribute::DataType => Some(rule.data_type.as_str()),
            Attribute::BaseFormat => rule.base_format.as_deref(),
            Attribute::DesiredFormat => rule.desired_format.as_deref(),
            Attribute::NewName => rule.new_name.as_deref(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Resolve the rule of every header column, in header order
    ///
    /// Lookups always use the original column name. Every column without an
    /// entry is reported in a single error.
    pub fn resolve(&self, header: &[String]) -> Result<Vec<&ColumnRule>> {
        let mut resolved = Vec::with_capacity(header.len());
        let mut missing = Vec::new();
        for column in header {
            match self.rules.get(column) {
                Some(rule) => resolved.push(rule),
                None => missing.push(column.clone()),
            }
        }

        if !missing.is_empty() {
            return Err(Error::MissingColumnRules {
                columns: missing,
                path: self.path.clone(),
            });
        }
        Ok(resolved)
    }

    /// Header for the clean sink, with New Name substituted where declared
    pub fn output_header(&self, header: &[String]) -> Vec<String> {
        header
            .iter()
            .map(|column| {
                self.lookup(column, Attribute::NewName)
                    .unwrap_or(column)
                    .to_string()
            })
            .collect()
    }
}
