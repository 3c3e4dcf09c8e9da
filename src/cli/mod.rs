pub mod args;
pub mod commands;
pub mod console;

use std::sync::Arc;
use log::debug;
use crate::core::api::BatchApi;
use crate::core::config::EngineConfig;
use crate::error::types::Result;
use self::args::Commands;
use self::console::ConsoleSink;

pub struct CliProcessor {
    timeout: u32,
}

impl CliProcessor {
    pub fn new(timeout: u32) -> Self {
        debug!("Creating new CliProcessor with timeout: {} seconds", timeout);
        Self { timeout }
    }

    pub fn process_command(&self, command: Commands) -> Result<()> {
        match command {
            Commands::Extract {
                archives,
                output_dir,
                password,
                on_conflict,
                archiver,
                no_log,
            } => {
                debug!("Processing extract command for {} archives", archives.len());
                let mut config = EngineConfig::builder();
                if let Some(archiver) = archiver {
                    config = config.archiver(archiver);
                }
                if no_log {
                    config = config.log_file_name(None);
                }
                let api = BatchApi::builder()
                    .with_config(config.build())
                    .with_timeout(self.timeout)
                    .build();

                let sink = Arc::new(ConsoleSink::new(api.relay(), on_conflict.decision()));
                commands::extract_archives(&api, &archives, &output_dir, password.as_deref(), sink)
                    .map(|_| ())
            }
            Commands::Locate { archiver } => {
                debug!("Processing locate command");
                commands::show_archiver(archiver.as_deref())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::types::BatchError;
    use std::path::PathBuf;
    use tempfile::tempdir;
    use super::args::ConflictPolicy;

    #[test]
    fn test_extract_with_missing_archive() {
        let cli = CliProcessor::new(30);
        let dir = tempdir().unwrap();
        let result = cli.process_command(Commands::Extract {
            archives: vec![dir.path().join("nonexistent.7z")],
            output_dir: dir.path().join("out"),
            password: None,
            on_conflict: ConflictPolicy::Skip,
            archiver: Some(PathBuf::from("/nonexistent/7z")),
            no_log: true,
        });
        assert!(matches!(result, Err(BatchError::InvalidPath(_))));
    }

    #[test]
    fn test_extract_with_missing_archiver_fails_batch() {
        let cli = CliProcessor::new(30);
        let dir = tempdir().unwrap();
        let archive = dir.path().join("a.7z");
        std::fs::write(&archive, b"7z").unwrap();

        let result = cli.process_command(Commands::Extract {
            archives: vec![archive],
            output_dir: dir.path().join("out"),
            password: None,
            on_conflict: ConflictPolicy::Skip,
            archiver: Some(PathBuf::from("/nonexistent/7z")),
            no_log: false,
        });
        assert!(matches!(result, Err(BatchError::BatchFailed { failed: 1, total: 1 })));

        let log = std::fs::read_to_string(dir.path().join("out/log.txt")).unwrap();
        assert!(log.contains("a.7z failure: cannot launch archiver"));
    }

    #[test]
    fn test_locate_missing_archiver() {
        let cli = CliProcessor::new(30);
        let result = cli.process_command(Commands::Locate {
            archiver: Some(PathBuf::from("/nonexistent/7z")),
        });
        assert!(matches!(result, Err(BatchError::InvalidPath(_))));
    }
}
