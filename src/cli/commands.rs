use std::path::{Path, PathBuf};
use std::sync::Arc;
use crate::batch::{BatchReport, EventSink};
use crate::core::api::BatchApi;
use crate::error::types::{BatchError, Result};
use crate::extract::locate_archiver;

/// Runs the batch and turns any failed archive into an error.
pub fn extract_archives(
    api: &BatchApi,
    archives: &[PathBuf],
    output_dir: &Path,
    password: Option<&str>,
    sink: Arc<dyn EventSink>,
) -> Result<BatchReport> {
    let report = api.extract_all(archives, output_dir, password, sink)?;
    for outcome in &report.outcomes {
        println!("{} {}", outcome.source.display(), outcome);
    }
    if report.is_success() {
        Ok(report)
    } else {
        Err(BatchError::BatchFailed {
            failed: report.failed(),
            total: report.total(),
        })
    }
}

pub fn show_archiver(archiver: Option<&Path>) -> Result<()> {
    let path = locate_archiver(archiver);
    println!("{}", path.display());
    if path.is_file() {
        Ok(())
    } else {
        Err(BatchError::InvalidPath(path))
    }
}
