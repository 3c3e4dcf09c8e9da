use std::fmt;
use std::path::PathBuf;
use crate::error::types::ExtractError;

/// How one archive's session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOutcome {
    pub index: usize,
    pub source: PathBuf,
    /// Archiver processes spawned for this archive.
    pub attempts: u32,
    pub result: Result<(), ExtractError>,
}

impl SessionOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    pub fn error(&self) -> Option<&ExtractError> {
        self.result.as_ref().err()
    }
}

impl fmt::Display for SessionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.result {
            Ok(()) => write!(f, "success"),
            Err(e) => write!(f, "failure: {}", e),
        }
    }
}
