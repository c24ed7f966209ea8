use std::path::Path;

use csv::StringRecord;
use tracing::{debug, info, warn};

use crate::error::Error;
use crate::readers::csv::open_delimited;
use crate::router::create_sink;
use crate::types::Result;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReorderSummary {
    pub rows: u64,
    /// Template columns with no counterpart in the data, written blank
    pub blank_columns: Vec<String>,
    /// Data columns not named by the template, left out
    pub dropped_columns: Vec<String>,
}

/// Read the first row of a template file
pub fn read_template(path: &Path, delimiter: u8) -> Result<Vec<String>> {
    let mut reader = open_delimited(path, delimiter)?;
    let mut header = StringRecord::new();
    if !reader.read_record(&mut header)? {
        return Err(Error::EmptyTable {
            path: path.to_path_buf(),
        });
    }
    Ok(header.iter().map(str::to_string).collect())
}

/// Position of each template column in the data header
pub fn column_plan(template: &[String], data_header: &StringRecord) -> Vec<Option<usize>> {
    template
        .iter()
        .map(|column| data_header.iter().position(|h| h == column))
        .collect()
}

/// Rewrite `data` with the template's columns, in the template's order
///
/// `data` and `template_path` share `delimiter`; the output is comma
/// separated.
pub fn reorder_columns(
    data: &Path,
    template_path: &Path,
    output: &Path,
    delimiter: u8,
) -> Result<ReorderSummary> {
    let template = read_template(template_path, delimiter)?;

    let mut reader = open_delimited(data, delimiter)?;
    let mut data_header = StringRecord::new();
    if !reader.read_record(&mut data_header)? {
        return Err(Error::EmptyTable {
            path: data.to_path_buf(),
        });
    }

    let plan = column_plan(&template, &data_header);
    let mut summary = ReorderSummary {
        blank_columns: template
            .iter()
            .zip(&plan)
            .filter(|(_, index)| index.is_none())
            .map(|(column, _)| column.clone())
            .collect(),
        dropped_columns: data_header
            .iter()
            .filter(|h| !template.iter().any(|t| t == h))
            .map(str::to_string)
            .collect(),
        ..ReorderSummary::default()
    };
    if !summary.blank_columns.is_empty() {
        warn!(columns = ?summary.blank_columns, "template columns missing from data; left blank");
    }
    if !summary.dropped_columns.is_empty() {
        debug!(columns = ?summary.dropped_columns, "data columns not in template");
    }

    let mut writer = create_sink(output)?;
    writer.write_record(&template)?;

    let mut record = StringRecord::new();
    while reader.read_record(&mut record)? {
        writer.write_record(
            plan.iter()
                .map(|index| index.and_then(|i| record.get(i)).unwrap_or("")),
        )?;
        summary.rows += 1;
    }
    writer.flush()?;

    info!(rows = summary.rows, out = %output.display(), "columns reordered");
    Ok(summary)
}
