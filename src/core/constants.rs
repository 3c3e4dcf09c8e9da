/// Seconds without archiver output before a session is abandoned.
pub const DEFAULT_TIMEOUT: u32 = 30;

pub const DEFAULT_ARCHIVER: &str = "7z";
pub const ARCHIVER_ALIASES: &[&str] = &["7z", "7za", "7zz"];

pub const PROGRESS_PATTERN: &str = r"(\d+)%";
pub const PASSWORD_PROMPT_PATTERN: &str = r"Enter password.*:";
pub const CONFLICT_PROMPT_PATTERN: &str = r"\(Y\)es / \(N\)o / \(A\)lways.*\?";
pub const PATH_LABEL_PATTERN: &str = r"Path:[ \t]+(.+)";

pub const SUCCESS_MARKER: &str = "Everything is Ok";
pub const WRONG_PASSWORD_MARKER: &str = "Wrong password";
pub const ERROR_MARKERS: &[&str] = &["Errors"];

/// Shown in place of a conflict path the archiver did not print.
pub const UNKNOWN_PATH: &str = "unknown";

pub const DEFAULT_LOG_FILE: &str = "log.txt";
pub const DEFAULT_MAX_CONTEXT_BYTES: usize = 64 * 1024;
