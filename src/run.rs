//! Run manager: wires the parameter table, the source, the processor and the
//! router together for a single streaming pass.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use csv::{Reader, StringRecord};
use sha2::{Digest, Sha256};
use tracing::{debug, info, info_span};

use crate::error::Error;
use crate::parameters::ParameterTable;
use crate::processor::RowProcessor;
use crate::readers::csv::open_delimited;
use crate::router::OutputRouter;
use crate::types::{Result, RunOptions, RunSummary, CLEAN_SUFFIX, OUTLIER_SUFFIX};

/// Paths of the clean and outlier sinks for a run stamp
pub fn sink_paths(output_dir: &Path, run_stamp: &str) -> (PathBuf, PathBuf) {
    (
        output_dir.join(format!("{}{}", run_stamp, CLEAN_SUFFIX)),
        output_dir.join(format!("{}{}", run_stamp, OUTLIER_SUFFIX)),
    )
}

/// Everything a run holds open: the loaded table, the source and its header
pub struct RunContext {
    parameters: ParameterTable,
    source: Reader<BufReader<File>>,
    header: StringRecord,
}

impl RunContext {
    /// Load the parameter table and open the source
    ///
    /// Fails before any output exists if either file is missing or
    /// malformed.
    pub fn open(options: &RunOptions) -> Result<Self> {
        let parameters = ParameterTable::load(&options.parameters, options.lenient_types)?;
        let mut source = open_delimited(&options.source, b',')?;

        debug!(
            parameters = %parameters.path().display(),
            rules = parameters.len(),
            "parameter table ready"
        );

        let mut header = StringRecord::new();
        if !source.read_record(&mut header)? {
            return Err(Error::EmptyTable {
                path: options.source.clone(),
            });
        }

        Ok(Self {
            parameters,
            source,
            header,
        })
    }

    /// Stream every source row through the processor into the sinks
    pub fn execute(mut self, options: &RunOptions) -> Result<RunSummary> {
        let header: Vec<String> = self.header.iter().map(str::to_string).collect();
        let processor = RowProcessor::new(&self.parameters, &header)?;
        let output_header = self.parameters.output_header(&header);

        let (clean_path, outlier_path) = sink_paths(&options.output_dir, &options.run_stamp);
        let mut router =
            OutputRouter::create(&clean_path, &outlier_path, &output_header, &self.header)?;

        info!(
            columns = processor.width(),
            clean = %clean_path.display(),
            "streaming rows"
        );

        let mut rows_read: u64 = 0;
        let mut record = StringRecord::new();
        let streamed = (|| -> Result<()> {
            while self.source.read_record(&mut record)? {
                rows_read += 1;
                // Line 1 is the header
                let row = processor.process(rows_read + 1, &record);
                router.route(&record, &row)?;
            }
            Ok(())
        })();

        if let Err(e) = streamed {
            router.discard();
            return Err(e);
        }

        let (counts, clean_path, outlier_path) = router.finish()?;
        Ok(RunSummary {
            run_stamp: options.run_stamp.clone(),
            source: options.source.clone(),
            parameters: options.parameters.clone(),
            source_sha256: None,
            clean_path,
            outlier_path,
            rows_read,
            clean_rows: counts.clean,
            outlier_rows: counts.outliers,
            rejections: counts.rejections,
        })
    }
}

/// Clean one source table
pub fn run_clean(options: &RunOptions) -> Result<RunSummary> {
    let span = info_span!("clean", stamp = %options.run_stamp);
    let _guard = span.enter();

    let context = RunContext::open(options)?;
    let mut summary = context.execute(options)?;

    if options.hash_source {
        summary.source_sha256 = Some(compute_file_hash(&options.source)?);
    }

    info!(
        rows = summary.rows_read,
        clean = summary.clean_rows,
        outliers = summary.outlier_rows,
        "run complete"
    );
    match &summary.outlier_path {
        Some(path) => info!(path = %path.display(), "outliers written"),
        None => info!("every row passed; no outlier file kept"),
    }

    Ok(summary)
}

/// Compute SHA-256 hash of a file (streaming to handle large files)
fn compute_file_hash(path: &Path) -> Result<String> {
    let file = File::open(path)?;
    let mut reader = BufReader::new(file);
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];

    loop {
        let bytes_read = reader.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    let result = hasher.finalize();
    Ok(format!("{:x}", result))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::{tempdir, TempDir};

    const PARAMETERS: &str = "\
,age,visit_date,notes
Data Type,integer,date,string
Base Format,\\d+,%d-%m-%Y,
Desired Format,,%Y/%m/%d,
New Name,Age,VisitDate,
";

    fn fixture(source: &str, parameters: &str) -> (TempDir, RunOptions) {
        let dir = tempdir().unwrap();
        let source_path = dir.path().join("source.csv");
        let parameter_path = dir.path().join("parameters.csv");
        fs::write(&source_path, source).unwrap();
        fs::write(&parameter_path, parameters).unwrap();

        let mut options =
            RunOptions::new(source_path, parameter_path, "202601011200".to_string());
        options.output_dir = dir.path().to_path_buf();
        (dir, options)
    }

    fn output_files(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|n| n.starts_with("202601011200"))
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_rows_are_partitioned() {
        let source = "age,visit_date,notes\n\
                      12,23-04-2021,first\n\
                      12a,23-04-2021,second\n\
                      40,2021-04-23,\"third, with comma\"\n\
                      7,01-12-2020,\n";
        let (dir, options) = fixture(source, PARAMETERS);

        let summary = run_clean(&options).unwrap();
        assert_eq!(summary.rows_read, 4);
        assert_eq!(summary.clean_rows, 2);
        assert_eq!(summary.outlier_rows, 2);
        assert_eq!(summary.rejections.get("not-a-number"), Some(&1));
        assert_eq!(summary.rejections.get("date-parse-failure"), Some(&1));

        let clean = fs::read_to_string(dir.path().join("202601011200tidyData.csv")).unwrap();
        assert_eq!(
            clean,
            "Age,VisitDate,notes\n12,2021/04/23,first\n7,2020/12/01,\n"
        );

        let outliers = fs::read_to_string(summary.outlier_path.unwrap()).unwrap();
        assert_eq!(
            outliers,
            "age,visit_date,notes\n12a,23-04-2021,second\n40,2021-04-23,\"third, with comma\"\n"
        );
    }

    #[test]
    fn test_no_outlier_file_when_all_rows_pass() {
        let source = "age,visit_date,notes\n12,23-04-2021,anything goes\n";
        let (dir, options) = fixture(source, PARAMETERS);

        let summary = run_clean(&options).unwrap();
        assert_eq!(summary.outlier_rows, 0);
        assert!(summary.outlier_path.is_none());
        assert_eq!(output_files(dir.path()), vec!["202601011200tidyData.csv"]);
    }

    #[test]
    fn test_missing_rule_aborts_before_output() {
        let source = "age,visit_date,notes,weight\n12,23-04-2021,x,80\n";
        let (dir, options) = fixture(source, PARAMETERS);

        let err = run_clean(&options).unwrap_err();
        assert!(matches!(err, Error::MissingColumnRules { .. }));
        assert!(output_files(dir.path()).is_empty());
    }

    #[test]
    fn test_missing_source_aborts() {
        let (dir, mut options) = fixture("", PARAMETERS);
        options.source = dir.path().join("nope.csv");

        assert!(matches!(run_clean(&options).unwrap_err(), Error::FileOpen { .. }));
        assert!(output_files(dir.path()).is_empty());
    }

    #[test]
    fn test_empty_source_aborts() {
        let (dir, options) = fixture("", PARAMETERS);
        assert!(matches!(run_clean(&options).unwrap_err(), Error::EmptyTable { .. }));
        assert!(output_files(dir.path()).is_empty());
    }

    #[test]
    fn test_rerun_is_byte_identical() {
        let source = "age,visit_date,notes\n12,23-04-2021,a\nx,23-04-2021,b\n";
        let (dir, options) = fixture(source, PARAMETERS);

        run_clean(&options).unwrap();
        let clean_first = fs::read(dir.path().join("202601011200tidyData.csv")).unwrap();
        let outliers_first = fs::read(dir.path().join("202601011200outliers.csv")).unwrap();

        run_clean(&options).unwrap();
        assert_eq!(
            fs::read(dir.path().join("202601011200tidyData.csv")).unwrap(),
            clean_first
        );
        assert_eq!(
            fs::read(dir.path().join("202601011200outliers.csv")).unwrap(),
            outliers_first
        );
    }

    #[test]
    fn test_ragged_row_goes_to_outliers() {
        let source = "age,visit_date,notes\n12,23-04-2021\n";
        let (_dir, options) = fixture(source, PARAMETERS);

        let summary = run_clean(&options).unwrap();
        assert_eq!(summary.outlier_rows, 1);
        let outliers = fs::read_to_string(summary.outlier_path.unwrap()).unwrap();
        assert_eq!(outliers, "age,visit_date,notes\n12,23-04-2021\n");
    }

    #[test]
    fn test_source_is_hashed_and_untouched() {
        let source = "age,visit_date,notes\n12,23-04-2021,a\n";
        let (_dir, options) = fixture(source, PARAMETERS);

        let summary = run_clean(&options).unwrap();
        let hash = summary.source_sha256.unwrap();
        assert_eq!(hash.len(), 64);
        assert_eq!(fs::read_to_string(&options.source).unwrap(), source);
    }

    #[test]
    fn test_sink_paths() {
        let (clean, outliers) = sink_paths(Path::new("out"), "202104231530");
        assert_eq!(clean, Path::new("out/202104231530tidyData.csv"));
        assert_eq!(outliers, Path::new("out/202104231530outliers.csv"));
    }
}
