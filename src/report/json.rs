//! JSON report writer and reader.

use super::AnalysisReport;
use crate::utils::error::OutputError;
use log::{debug, info};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// Write a report value to a JSON file with pretty formatting
///
/// Works for both [`AnalysisReport`] and
/// [`DurationReport`](super::DurationReport). Creates parent
/// directories as needed.
///
/// # Errors
/// * `OutputError::WriteFailed` - I/O error during write
/// * `OutputError::SerializationFailed` - JSON serialization error
/// * `OutputError::InvalidPath` - empty path or existing directory
pub fn write_report<T: serde::Serialize>(
    report: &T,
    output_path: impl AsRef<Path>,
) -> Result<(), OutputError> {
    let output_path = output_path.as_ref();

    info!("Writing report to: {}", output_path.display());
    validate_output_path(output_path)?;

    if let Some(parent) = output_path.parent() {
        if !parent.exists() {
            debug!("Creating parent directories: {}", parent.display());
            std::fs::create_dir_all(parent).map_err(|e| {
                OutputError::InvalidPath(format!(
                    "Cannot create directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }
    }

    let file = File::create(output_path).map_err(OutputError::WriteFailed)?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, report).map_err(OutputError::SerializationFailed)?;

    Ok(())
}

/// Read a report back from a JSON file (used for validation)
pub fn read_report(path: impl AsRef<Path>) -> Result<AnalysisReport, OutputError> {
    let file = File::open(path.as_ref()).map_err(OutputError::WriteFailed)?;
    let reader = BufReader::new(file);
    serde_json::from_reader(reader).map_err(OutputError::SerializationFailed)
}

fn validate_output_path(path: &Path) -> Result<(), OutputError> {
    if path.as_os_str().is_empty() {
        return Err(OutputError::InvalidPath("Path is empty".to_string()));
    }
    if path.exists() && path.is_dir() {
        return Err(OutputError::InvalidPath(format!(
            "Path is a directory: {}",
            path.display()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{ConsolidationSummary, StatsRow};
    use crate::stats::MemoryStats;

    fn sample_report() -> AnalysisReport {
        let totals = StatsRow::from_stats("total", &MemoryStats::default(), 0);
        AnalysisReport::new(
            1234,
            totals,
            vec![],
            vec![],
            ConsolidationSummary {
                frees_resolved: 0,
                unmatched_frees: 0,
                records_retired: 0,
                live_records: 0,
            },
            vec![],
        )
    }

    #[test]
    fn test_write_and_read_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");

        let report = sample_report();
        write_report(&report, &path).unwrap();
        let loaded = read_report(&path).unwrap();

        assert_eq!(loaded, report);
    }

    #[test]
    fn test_directory_path_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = write_report(&sample_report(), dir.path());
        assert!(matches!(err, Err(OutputError::InvalidPath(_))));
    }
}
