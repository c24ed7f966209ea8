pub mod csv;
pub mod excel;

use std::path::Path;

use crate::types::{FileFormat, Result};

/// A small table read fully into memory, one `Vec<String>` per row
pub type Rows = Vec<Vec<String>>;

/// Common trait for readers of whole tables
pub trait TableReader {
    /// Read every row, header included
    fn read_rows(&mut self) -> Result<Rows>;
}

/// Create a reader for the given file path
pub fn create_reader(path: &Path) -> Result<Box<dyn TableReader>> {
    match FileFormat::from_path(path)? {
        FileFormat::Csv => Ok(Box::new(csv::CsvReader::new(path)?)),
        FileFormat::Tsv => Ok(Box::new(csv::CsvReader::new_tsv(path)?)),
        FileFormat::Excel => Ok(Box::new(excel::ExcelReader::new(path)?)),
    }
}
