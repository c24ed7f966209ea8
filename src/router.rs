use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};

use csv::{StringRecord, Writer, WriterBuilder};
use tracing::{trace, warn};

use crate::error::Error;
use crate::processor::ProcessedRow;
use crate::types::Result;

/// Create a CSV sink, truncating any previous file
pub fn create_sink(path: &Path) -> Result<Writer<BufWriter<File>>> {
    let file = File::create(path).map_err(|source| Error::FileOpen {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(WriterBuilder::new()
        .flexible(true)
        .from_writer(BufWriter::new(file)))
}

/// Rows written by the router
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteCounts {
    pub clean: u64,
    pub outliers: u64,
    /// Failures per reason code
    pub rejections: BTreeMap<String, u64>,
}

/// Where a row ended up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Clean,
    Outlier,
}

/// Sends each processed row to the clean sink or the outlier sink
pub struct OutputRouter {
    clean: Writer<BufWriter<File>>,
    outliers: Writer<BufWriter<File>>,
    clean_path: PathBuf,
    outlier_path: PathBuf,
    counts: RouteCounts,
}

impl OutputRouter {
    /// Create both sinks and write their headers
    ///
    /// The clean sink gets the renamed header, the outlier sink the
    /// original one.
    pub fn create(
        clean_path: &Path,
        outlier_path: &Path,
        output_header: &[String],
        source_header: &StringRecord,
    ) -> Result<Self> {
        let clean = create_sink(clean_path)?;
        let outliers = match create_sink(outlier_path) {
            Ok(writer) => writer,
            Err(e) => {
                drop(clean);
                let _ = fs::remove_file(clean_path);
                return Err(e);
            }
        };

        let mut router = Self {
            clean,
            outliers,
            clean_path: clean_path.to_path_buf(),
            outlier_path: outlier_path.to_path_buf(),
            counts: RouteCounts::default(),
        };
        let headers = router
            .clean
            .write_record(output_header)
            .and_then(|()| router.outliers.write_record(source_header));
        if let Err(e) = headers {
            router.discard();
            return Err(e.into());
        }
        Ok(router)
    }

    /// Commit one row
    ///
    /// A row with any failure is written exactly as read to the outlier
    /// sink; otherwise its transformed values go to the clean sink.
    pub fn route(&mut self, source: &StringRecord, row: &ProcessedRow) -> Result<Route> {
        if row.is_clean() {
            self.clean.write_record(&row.transformed)?;
            self.counts.clean += 1;
            trace!(route = "clean", "row committed");
            Ok(Route::Clean)
        } else {
            self.outliers.write_record(source)?;
            self.counts.outliers += 1;
            for failure in &row.failures {
                *self
                    .counts
                    .rejections
                    .entry(failure.code().to_string())
                    .or_insert(0) += 1;
            }
            trace!(route = "outlier", failures = row.failure_count(), "row committed");
            Ok(Route::Outlier)
        }
    }

    /// Flush both sinks and close them
    ///
    /// Returns the outlier sink's path, or `None` if it received no rows and
    /// was deleted. On any error both sinks are removed.
    pub fn finish(self) -> Result<(RouteCounts, PathBuf, Option<PathBuf>)> {
        let Self {
            mut clean,
            mut outliers,
            clean_path,
            outlier_path,
            counts,
        } = self;

        let flushed = clean.flush().and_then(|()| outliers.flush());
        drop(clean);
        drop(outliers);
        if let Err(e) = flushed {
            remove_sinks(&clean_path, &outlier_path);
            return Err(e.into());
        }

        if counts.outliers > 0 {
            return Ok((counts, clean_path, Some(outlier_path)));
        }
        if let Err(e) = fs::remove_file(&outlier_path) {
            remove_sinks(&clean_path, &outlier_path);
            return Err(e.into());
        }
        Ok((counts, clean_path, None))
    }

    /// Close and delete both sinks after a failed run
    pub fn discard(self) {
        let Self {
            clean,
            outliers,
            clean_path,
            outlier_path,
            ..
        } = self;
        drop(clean);
        drop(outliers);
        remove_sinks(&clean_path, &outlier_path);
    }
}

fn remove_sinks(clean_path: &Path, outlier_path: &Path) {
    for path in [clean_path, outlier_path] {
        if let Err(e) = fs::remove_file(path) {
            if e.kind() != io::ErrorKind::NotFound {
                warn!(path = %path.display(), error = %e, "could not remove output file");
            }
        }
    }
}
