use crate::summary::RunSummary;
use crate::utils::errors::MonitorError;
use log::info;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Writes `summary` to `path`, replacing any previous report there.
pub fn write_report(path: &Path, summary: &RunSummary) -> Result<(), MonitorError> {
    let report_error = |source| MonitorError::ReportWriteFailed { path: path.to_path_buf(), source };

    let file = File::create(path).map_err(report_error)?;
    let mut writer = BufWriter::new(file);
    write!(writer, "{}", summary).map_err(report_error)?;
    writer.flush().map_err(report_error)?;

    info!("Wrote run summary to {}", path.display());
    Ok(())
}
