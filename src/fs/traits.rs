use std::fs::create_dir_all;
use std::path::Path;
use log::debug;
use crate::error::types::{BatchError, FileSystemError, Result};

/// Path checks applied before a batch is queued.
pub trait FileOperation {
    fn validate_archive(&self) -> Result<()>;
    fn ensure_directory(&self) -> Result<()>;
    fn is_safe_path(&self) -> bool;
}

impl FileOperation for Path {
    fn validate_archive(&self) -> Result<()> {
        if !self.is_file() || !self.is_safe_path() {
            return Err(BatchError::InvalidPath(self.to_path_buf()));
        }
        Ok(())
    }

    fn ensure_directory(&self) -> Result<()> {
        if !self.is_safe_path() {
            return Err(BatchError::InvalidPath(self.to_path_buf()));
        }
        if !self.exists() {
            create_dir_all(self).map_err(|e| {
                FileSystemError::CreateDir {
                    path: self.to_path_buf(),
                    reason: e.to_string(),
                }
            })?;
        } else if !self.is_dir() {
            return Err(FileSystemError::CreateDir {
                path: self.to_path_buf(),
                reason: "Path exists but is not a directory".to_string(),
            }
            .into());
        }
        Ok(())
    }

    /// Rejects paths the archiver command line cannot carry.
    fn is_safe_path(&self) -> bool {
        let path_str = self.to_string_lossy();
        if path_str.is_empty() {
            debug!("Rejecting empty path");
            return false;
        }
        if path_str.chars().any(|c| c.is_control()) {
            debug!("Rejecting path with control characters");
            return false;
        }
        true
    }
}
