pub mod batch;
pub mod cli;
pub mod core;
pub mod error;
pub mod extract;
pub mod fs;
pub mod relay;
pub mod test_utils;

pub use crate::batch::{BatchReport, EventSink, ExtractionRequest, Scheduler};
pub use crate::core::api::BatchApi;
pub use crate::core::config::EngineConfig;
pub use crate::error::types::{BatchError, ExtractError, FileSystemError, Result};
pub use crate::relay::{ConflictDecision, ConflictHints, DecisionRelay, PasswordAnswer};

/// Version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
