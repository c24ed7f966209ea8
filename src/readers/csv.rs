use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use csv::{Reader, ReaderBuilder};

use crate::error::Error;
use crate::types::Result;

use super::{Rows, TableReader};

/// Open a delimited file for streaming
///
/// Headers are left in the record stream so callers decide how to treat the
/// first row. Records may have differing field counts.
pub fn open_delimited(path: &Path, delimiter: u8) -> Result<Reader<BufReader<File>>> {
    let file = File::open(path).map_err(|source| Error::FileOpen {
        path: path.to_path_buf(),
        source,
    })?;
    let reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(BufReader::new(file));
    Ok(reader)
}

/// Convert a delimiter given on the command line to a single byte
pub fn delimiter_byte(delimiter: char) -> Result<u8> {
    u8::try_from(delimiter)
        .ok()
        .filter(u8::is_ascii)
        .ok_or_else(|| Error::InvalidInput(format!("delimiter must be ASCII: {:?}", delimiter)))
}

/// CSV/TSV file reader
pub struct CsvReader {
    path: PathBuf,
    delimiter: u8,
}

impl CsvReader {
    /// Create a new CSV reader
    pub fn new(path: &Path) -> Result<Self> {
        Ok(Self {
            path: path.to_path_buf(),
            delimiter: b',',
        })
    }

    /// Create a new TSV reader
    pub fn new_tsv(path: &Path) -> Result<Self> {
        Ok(Self {
            path: path.to_path_buf(),
            delimiter: b'\t',
        })
    }
}

impl TableReader for CsvReader {
    fn read_rows(&mut self) -> Result<Rows> {
        let mut reader = open_delimited(&self.path, self.delimiter)?;
        let mut rows = Vec::new();
        for result in reader.records() {
            let record = result?;
            rows.push(record.iter().map(|f| f.to_string()).collect());
        }
        Ok(rows)
    }
}
