use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use chrono::{DateTime, Local};
use log::debug;
use crate::core::constants::DEFAULT_LOG_FILE;
use crate::error::types::{FileSystemError, Result};

/// One finished archive, as written to the result log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub timestamp: DateTime<Local>,
    pub display_name: String,
    pub outcome: String,
}

impl LogRecord {
    pub fn new(display_name: impl Into<String>, outcome: impl Into<String>) -> Self {
        Self {
            timestamp: Local::now(),
            display_name: display_name.into(),
            outcome: outcome.into(),
        }
    }
}

impl fmt::Display for LogRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} {}",
            self.timestamp.format("%Y-%m-%d %H:%M:%S"),
            self.display_name,
            self.outcome
        )
    }
}

/// Persists result records. The engine only hands over data.
pub trait RecordWriter: Send + Sync {
    fn append(&self, destination: &Path, record: &LogRecord) -> Result<()>;
}

/// Appends records to a log file inside each request's destination.
#[derive(Debug, Clone)]
pub struct ResultLog {
    file_name: String,
}

impl ResultLog {
    pub fn new(file_name: impl Into<String>) -> Self {
        Self { file_name: file_name.into() }
    }

    pub fn path_in(&self, destination: &Path) -> PathBuf {
        destination.join(&self.file_name)
    }
}

impl Default for ResultLog {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_FILE)
    }
}

impl RecordWriter for ResultLog {
    fn append(&self, destination: &Path, record: &LogRecord) -> Result<()> {
        let path = self.path_in(destination);
        debug!("Appending to {}: {}", path.display(), record);
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .and_then(|mut file| writeln!(file, "{}", record))
            .map_err(|e| {
                FileSystemError::WriteFile {
                    path: path.clone(),
                    reason: e.to_string(),
                }
                .into()
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::tempdir;

    #[test]
    fn test_record_format() {
        let record = LogRecord {
            timestamp: Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap(),
            display_name: "a.7z".to_string(),
            outcome: "success".to_string(),
        };
        assert_eq!(record.to_string(), "[2024-03-09 14:05:07] a.7z success");
    }

    #[test]
    fn test_appends_lines() {
        let dir = tempdir().unwrap();
        let log = ResultLog::default();
        log.append(dir.path(), &LogRecord::new("a.7z", "success")).unwrap();
        log.append(dir.path(), &LogRecord::new("b.7z", "failure: password")).unwrap();

        let content = std::fs::read_to_string(dir.path().join("log.txt")).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("] a.7z success"));
        assert!(lines[1].ends_with("] b.7z failure: password"));
    }

    #[test]
    fn test_missing_destination_is_error() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope");
        let result = ResultLog::default().append(&missing, &LogRecord::new("a.7z", "success"));
        assert!(result.is_err());
    }
}
