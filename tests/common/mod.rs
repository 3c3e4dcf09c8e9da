#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use batch_extract::batch::{EventSink, ExtractionRequest, Scheduler};
use batch_extract::core::{BatchApi, EngineConfig};
use batch_extract::test_utils::{emit, ScriptedArchiver, Step};
use tempfile::TempDir;

pub use batch_extract::test_utils::setup;

pub const PASSWORD_PROMPT: &str = "Enter password (will not be echoed):";
pub const CONFLICT_PROMPT: &str = "? (Y)es / (N)o / (A)lways / (S)kip all / A(u)to rename all / (Q)uit? ";
pub const SUCCESS: &str = "\nEverything is Ok\n";

pub struct Fixture {
    pub temp: TempDir,
    pub api: BatchApi,
    pub archiver: ScriptedArchiver,
}

impl Fixture {
    pub fn new(archiver: ScriptedArchiver) -> Self {
        Self::with_config(archiver, EngineConfig::default())
    }

    pub fn with_config(archiver: ScriptedArchiver, config: EngineConfig) -> Self {
        setup();
        let api = BatchApi::builder()
            .with_config(config)
            .with_archiver(Arc::new(archiver.clone()))
            .build();
        Self {
            temp: tempfile::tempdir().expect("Failed to create temp directory"),
            api,
            archiver,
        }
    }

    pub fn destination(&self) -> PathBuf {
        self.temp.path().to_path_buf()
    }

    pub fn request(&self, index: usize, source: &str, password: Option<&str>) -> ExtractionRequest {
        ExtractionRequest::new(index, source, self.destination(), password.map(String::from))
    }

    pub fn scheduler(&self, sink: Arc<dyn EventSink>) -> Arc<Scheduler> {
        self.api.scheduler(sink).expect("Failed to build scheduler")
    }

    pub fn log_contents(&self) -> String {
        std::fs::read_to_string(self.destination().join("log.txt")).unwrap_or_default()
    }
}

/// Output of an archive that extracts cleanly with a few progress updates.
pub fn clean_run() -> Vec<Step> {
    vec![emit(" 10%"), emit("\x08\x08\x08\x08 55%"), emit(SUCCESS)]
}

/// Output of an archive that asks for a password and rejects it.
pub fn wrong_password_run() -> Vec<Step> {
    vec![
        emit(PASSWORD_PROMPT),
        Step::Expect,
        emit("\nERROR: Wrong password : secret.txt\nSub items Errors: 1\n"),
    ]
}

pub fn conflict_block(local: &str, archived: &str) -> String {
    format!(
        "\nWould you like to replace the existing file:\n  Path:     {}\n  Size:     3 bytes\nwith the file from archive:\n  Path:     {}\n  Size:     3 bytes\n{}",
        local, archived, CONFLICT_PROMPT
    )
}

pub fn quick_timeout(read: Duration, decision: Option<Duration>) -> EngineConfig {
    EngineConfig::builder()
        .read_timeout(read)
        .decision_timeout(decision)
        .build()
}

pub fn archive_file(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, b"7z\xbc\xaf\x27\x1c").expect("Failed to write archive");
    path
}

/// Polls `relay` until a session waits on a decision of `kind`.
pub fn wait_for_pending(
    relay: &batch_extract::relay::DecisionRelay,
    kind: batch_extract::relay::DecisionKind,
) -> usize {
    for _ in 0..500 {
        if let Some((index, pending)) = relay.pending() {
            if pending == kind {
                return index;
            }
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    panic!("No session started waiting on {:?}", kind);
}
