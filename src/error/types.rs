use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, BatchError>;

#[derive(Error, Debug)]
pub enum BatchError {
    #[error("Invalid path: {}", .0.display())]
    InvalidPath(PathBuf),

    #[error("File system error: {0}")]
    FileSystem(#[from] FileSystemError),

    #[error("Extraction error: {0}")]
    Extraction(#[from] ExtractError),

    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("{failed} of {total} archives failed to extract")]
    BatchFailed {
        failed: usize,
        total: usize,
    },
}

/// Reasons a single extraction session ends in failure.
///
/// The `Display` form is the reason text surfaced to the operator and written
/// to the result log, so it stays short.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractError {
    #[error("cannot launch archiver {program}: {reason}")]
    Spawn {
        program: String,
        reason: String,
    },

    #[error("password")]
    PasswordFailure,

    #[error("archiver error: {0}")]
    Archiver(String),

    #[error("no output from archiver for {0} seconds")]
    StreamTimeout(u64),

    #[error("unexpected end of output")]
    UnexpectedStreamEnd,

    #[error("cancelled")]
    Canceled,

    #[error("archiver pipe error: {0}")]
    Pipe(String),
}

#[derive(Error, Debug)]
pub enum FileSystemError {
    #[error("Failed to create directory {}: {reason}", .path.display())]
    CreateDir {
        path: PathBuf,
        reason: String,
    },

    #[error("Failed to write file {}: {reason}", .path.display())]
    WriteFile {
        path: PathBuf,
        reason: String,
    },

    #[error("Invalid file name: {0}")]
    InvalidFileName(String),
}
