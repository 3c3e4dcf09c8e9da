use std::path::{Path, PathBuf};
use std::time::Duration;
use super::constants::*;

/// Tunables for the extraction engine.
///
/// Output markers are matched as literals; the prompt patterns are regular
/// expressions. Everything defaults to what `7z` prints.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    archiver: Option<PathBuf>,
    read_timeout: Duration,
    decision_timeout: Option<Duration>,
    retry_wrong_password: bool,
    password_prompt: String,
    conflict_prompt: String,
    success_marker: String,
    wrong_password_marker: String,
    error_markers: Vec<String>,
    max_context_bytes: usize,
    log_file_name: Option<String>,
}

impl EngineConfig {
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::new()
    }

    pub fn archiver(&self) -> Option<&Path> {
        self.archiver.as_deref()
    }

    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    pub fn decision_timeout(&self) -> Option<Duration> {
        self.decision_timeout
    }

    pub fn retry_wrong_password(&self) -> bool {
        self.retry_wrong_password
    }

    /// Attempts allowed per archive. A wrong password buys at most one respawn.
    pub fn max_attempts(&self) -> u32 {
        if self.retry_wrong_password { 2 } else { 1 }
    }

    pub fn password_prompt(&self) -> &str {
        &self.password_prompt
    }

    pub fn conflict_prompt(&self) -> &str {
        &self.conflict_prompt
    }

    pub fn success_marker(&self) -> &str {
        &self.success_marker
    }

    pub fn wrong_password_marker(&self) -> &str {
        &self.wrong_password_marker
    }

    pub fn error_markers(&self) -> &[String] {
        &self.error_markers
    }

    pub fn max_context_bytes(&self) -> usize {
        self.max_context_bytes
    }

    pub fn log_file_name(&self) -> Option<&str> {
        self.log_file_name.as_deref()
    }

    pub(crate) fn set_read_timeout(&mut self, timeout: Duration) {
        self.read_timeout = timeout;
    }
}

pub struct EngineConfigBuilder {
    archiver: Option<PathBuf>,
    read_timeout: Duration,
    decision_timeout: Option<Duration>,
    retry_wrong_password: bool,
    password_prompt: String,
    conflict_prompt: String,
    success_marker: String,
    wrong_password_marker: String,
    error_markers: Vec<String>,
    max_context_bytes: usize,
    log_file_name: Option<String>,
}

impl EngineConfigBuilder {
    pub fn new() -> Self {
        Self {
            archiver: None,
            read_timeout: Duration::from_secs(u64::from(DEFAULT_TIMEOUT)),
            decision_timeout: None,
            retry_wrong_password: true,
            password_prompt: PASSWORD_PROMPT_PATTERN.to_string(),
            conflict_prompt: CONFLICT_PROMPT_PATTERN.to_string(),
            success_marker: SUCCESS_MARKER.to_string(),
            wrong_password_marker: WRONG_PASSWORD_MARKER.to_string(),
            error_markers: ERROR_MARKERS.iter().map(|m| m.to_string()).collect(),
            max_context_bytes: DEFAULT_MAX_CONTEXT_BYTES,
            log_file_name: Some(DEFAULT_LOG_FILE.to_string()),
        }
    }

    pub fn archiver(mut self, program: impl Into<PathBuf>) -> Self {
        self.archiver = Some(program.into());
        self
    }

    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn decision_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.decision_timeout = timeout;
        self
    }

    pub fn retry_wrong_password(mut self, retry: bool) -> Self {
        self.retry_wrong_password = retry;
        self
    }

    pub fn password_prompt(mut self, pattern: impl Into<String>) -> Self {
        self.password_prompt = pattern.into();
        self
    }

    pub fn conflict_prompt(mut self, pattern: impl Into<String>) -> Self {
        self.conflict_prompt = pattern.into();
        self
    }

    pub fn success_marker(mut self, marker: impl Into<String>) -> Self {
        self.success_marker = marker.into();
        self
    }

    pub fn wrong_password_marker(mut self, marker: impl Into<String>) -> Self {
        self.wrong_password_marker = marker.into();
        self
    }

    pub fn add_error_marker(mut self, marker: impl Into<String>) -> Self {
        self.error_markers.push(marker.into());
        self
    }

    pub fn max_context_bytes(mut self, bytes: usize) -> Self {
        self.max_context_bytes = bytes.max(1024);
        self
    }

    pub fn log_file_name(mut self, name: Option<String>) -> Self {
        self.log_file_name = name;
        self
    }

    pub fn build(self) -> EngineConfig {
        EngineConfig {
            archiver: self.archiver,
            read_timeout: self.read_timeout,
            decision_timeout: self.decision_timeout,
            retry_wrong_password: self.retry_wrong_password,
            password_prompt: self.password_prompt,
            conflict_prompt: self.conflict_prompt,
            success_marker: self.success_marker,
            wrong_password_marker: self.wrong_password_marker,
            error_markers: self.error_markers,
            max_context_bytes: self.max_context_bytes,
            log_file_name: self.log_file_name,
        }
    }
}

impl Default for EngineConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert!(config.archiver().is_none());
        assert_eq!(config.read_timeout(), Duration::from_secs(30));
        assert_eq!(config.decision_timeout(), None);
        assert!(config.retry_wrong_password());
        assert_eq!(config.max_attempts(), 2);
        assert_eq!(config.success_marker(), "Everything is Ok");
        assert_eq!(config.error_markers(), &["Errors".to_string()]);
        assert_eq!(config.log_file_name(), Some("log.txt"));
    }

    #[test]
    fn test_retry_can_be_disabled() {
        let config = EngineConfig::builder()
            .retry_wrong_password(false)
            .build();
        assert_eq!(config.max_attempts(), 1);
    }

    #[test]
    fn test_builder_chaining() {
        let config = EngineConfig::builder()
            .archiver("/opt/7zip/7zz")
            .read_timeout(Duration::from_secs(5))
            .decision_timeout(Some(Duration::from_millis(250)))
            .add_error_marker("Can not open the file as archive")
            .log_file_name(None)
            .build();

        assert_eq!(config.archiver(), Some(Path::new("/opt/7zip/7zz")));
        assert_eq!(config.read_timeout(), Duration::from_secs(5));
        assert_eq!(config.decision_timeout(), Some(Duration::from_millis(250)));
        assert_eq!(config.error_markers().len(), 2);
        assert!(config.log_file_name().is_none());
    }

    #[test]
    fn test_context_cap_has_floor() {
        let config = EngineConfig::builder().max_context_bytes(10).build();
        assert_eq!(config.max_context_bytes(), 1024);
    }
}
