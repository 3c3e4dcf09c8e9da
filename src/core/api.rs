use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use log::{debug, info};
use crate::batch::{BatchReport, EventSink, ExtractionRequest, Scheduler};
use crate::error::types::{BatchError, Result};
use crate::extract::{Archiver, SevenZip};
use crate::fs::{FileOperation, ResultLog};
use crate::relay::DecisionRelay;
use super::config::EngineConfig;
use super::constants::DEFAULT_TIMEOUT;

/// Main entry point for batch extraction.
///
/// `BatchApi` turns a list of archives into validated requests and runs them
/// through a [`Scheduler`]. Decisions for suspended sessions go through the
/// relay returned by [`BatchApi::relay`].
///
/// # Examples
///
/// ```no_run
/// use std::path::{Path, PathBuf};
/// use std::sync::Arc;
/// use batch_extract::batch::NullSink;
/// use batch_extract::core::BatchApi;
///
/// let api = BatchApi::new(30);
/// let archives = vec![PathBuf::from("part1.7z"), PathBuf::from("part2.7z")];
/// let report = api
///     .extract_all(&archives, Path::new("out"), Some("secret"), Arc::new(NullSink))
///     .unwrap();
/// println!("{}", report);
/// ```
#[derive(Debug, Clone)]
pub struct BatchApi {
    config: EngineConfig,
    archiver: Arc<dyn Archiver>,
    relay: Arc<DecisionRelay>,
}

impl BatchApi {
    pub fn builder() -> BatchApiBuilder {
        BatchApiBuilder::new()
    }

    pub fn new(timeout_seconds: u32) -> Self {
        Self::builder()
            .with_timeout(timeout_seconds)
            .build()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn archiver(&self) -> &Arc<dyn Archiver> {
        &self.archiver
    }

    /// Relay shared by every session this API starts.
    pub fn relay(&self) -> Arc<DecisionRelay> {
        Arc::clone(&self.relay)
    }

    /// Validates the archives and destination and numbers the requests.
    pub fn prepare<P: AsRef<Path>>(
        &self,
        archives: &[P],
        destination: &Path,
        password: Option<&str>,
    ) -> Result<Vec<ExtractionRequest>> {
        if archives.is_empty() {
            return Err(BatchError::ValidationFailed("No archives given".to_string()));
        }
        for archive in archives {
            archive.as_ref().validate_archive()?;
        }
        destination.ensure_directory()?;
        debug!("Prepared {} requests for {}", archives.len(), destination.display());
        Ok(ExtractionRequest::batch(archives, destination, password))
    }

    /// Builds a scheduler wired to this API's archiver, relay and log settings.
    pub fn scheduler(&self, sink: Arc<dyn EventSink>) -> Result<Arc<Scheduler>> {
        let mut scheduler = Scheduler::new(
            self.config.clone(),
            Arc::clone(&self.archiver),
            Arc::clone(&self.relay),
            sink,
        )?;
        if let Some(name) = self.config.log_file_name() {
            scheduler = scheduler.with_records(Arc::new(ResultLog::new(name)));
        }
        Ok(Arc::new(scheduler))
    }

    /// Extracts every archive in order and waits for the batch to finish.
    pub fn extract_all<P: AsRef<Path>>(
        &self,
        archives: &[P],
        destination: &Path,
        password: Option<&str>,
        sink: Arc<dyn EventSink>,
    ) -> Result<BatchReport> {
        let requests = self.prepare(archives, destination, password)?;
        info!("Extracting {} archives with {}", requests.len(), self.archiver.program());
        let scheduler = self.scheduler(sink)?;
        scheduler.enqueue(requests);
        scheduler
            .run()
            .ok_or_else(|| BatchError::ValidationFailed("Scheduler is already running".to_string()))
    }
}

/// Builder for customized [`BatchApi`] instances.
///
/// ```no_run
/// use batch_extract::core::{BatchApi, EngineConfig};
///
/// let config = EngineConfig::builder()
///     .archiver("/usr/local/bin/7zz")
///     .build();
///
/// let api = BatchApi::builder()
///     .with_config(config)
///     .with_timeout(60)
///     .build();
/// ```
#[derive(Default)]
pub struct BatchApiBuilder {
    config: Option<EngineConfig>,
    timeout: Option<Duration>,
    archiver: Option<Arc<dyn Archiver>>,
    relay: Option<Arc<DecisionRelay>>,
}

impl BatchApiBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Seconds of archiver silence tolerated before a session fails.
    pub fn with_timeout(mut self, seconds: u32) -> Self {
        self.timeout = Some(Duration::from_secs(u64::from(seconds.max(1))));
        self
    }

    /// Replaces the 7z launcher, e.g. with a scripted archiver in tests.
    pub fn with_archiver(mut self, archiver: Arc<dyn Archiver>) -> Self {
        self.archiver = Some(archiver);
        self
    }

    pub fn with_relay(mut self, relay: Arc<DecisionRelay>) -> Self {
        self.relay = Some(relay);
        self
    }

    pub fn build(self) -> BatchApi {
        let mut config = self.config.unwrap_or_default();
        if let Some(timeout) = self.timeout {
            config.set_read_timeout(timeout);
        }
        let archiver = self
            .archiver
            .unwrap_or_else(|| Arc::new(SevenZip::locate(config.archiver())));
        BatchApi {
            config,
            archiver,
            relay: self.relay.unwrap_or_default(),
        }
    }
}
