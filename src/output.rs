use crate::types::{Result, RunSummary};
use std::io::Write;
use std::path::Path;

/// Write a run summary to a JSON file
pub fn write_json_file(summary: &RunSummary, path: &Path) -> Result<()> {
    let file = std::fs::File::create(path)?;
    let writer = std::io::BufWriter::new(file);
    serde_json::to_writer_pretty(writer, summary)?;
    Ok(())
}

/// Render a run summary as JSON
pub fn to_json_string(summary: &RunSummary) -> Result<String> {
    Ok(serde_json::to_string_pretty(summary)?)
}

/// Write a run summary to stdout
pub fn write_json_stdout(summary: &RunSummary) -> Result<()> {
    let json = to_json_string(summary)?;
    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    writeln!(handle, "{}", json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    fn summary(outlier_path: Option<PathBuf>) -> RunSummary {
        let mut rejections = BTreeMap::new();
        if outlier_path.is_some() {
            rejections.insert("not-a-number".to_string(), 3);
        }
        RunSummary {
            run_stamp: "202104231530".to_string(),
            source: PathBuf::from("source.csv"),
            parameters: PathBuf::from("parameters.csv"),
            source_sha256: None,
            clean_path: PathBuf::from("202104231530tidyData.csv"),
            outlier_path,
            rows_read: 10,
            clean_rows: 7,
            outlier_rows: 3,
            rejections,
        }
    }

    #[test]
    fn test_json_serialization() {
        let json = to_json_string(&summary(Some(PathBuf::from("202104231530outliers.csv")))).unwrap();
        assert!(json.contains("\"run_stamp\": \"202104231530\""));
        assert!(json.contains("\"outlier_path\": \"202104231530outliers.csv\""));
        assert!(json.contains("\"not-a-number\": 3"));
        assert!(!json.contains("source_sha256"));
    }

    #[test]
    fn test_json_omits_deleted_outlier_sink() {
        let json = to_json_string(&summary(None)).unwrap();
        assert!(!json.contains("outlier_path"));
        assert!(!json.contains("rejections"));
    }

    #[test]
    fn test_write_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("summary.json");
        write_json_file(&summary(None), &path).unwrap();

        let back: RunSummary =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(back.clean_rows, 7);
        assert!(back.outlier_path.is_none());
    }
}
