use std::fmt;
use std::path::{Path, PathBuf};

/// One archive to extract. Immutable once enqueued.
#[derive(Clone, PartialEq, Eq)]
pub struct ExtractionRequest {
    pub index: usize,
    pub source: PathBuf,
    pub destination: PathBuf,
    password: Option<String>,
}

impl ExtractionRequest {
    pub fn new(
        index: usize,
        source: impl Into<PathBuf>,
        destination: impl Into<PathBuf>,
        password: Option<String>,
    ) -> Self {
        Self {
            index,
            source: source.into(),
            destination: destination.into(),
            password: password.filter(|p| !p.is_empty()),
        }
    }

    /// Numbers `sources` in order, all sharing one destination and password.
    pub fn batch<P: AsRef<Path>>(sources: &[P], destination: &Path, password: Option<&str>) -> Vec<Self> {
        sources
            .iter()
            .enumerate()
            .map(|(index, source)| {
                Self::new(index, source.as_ref(), destination, password.map(String::from))
            })
            .collect()
    }

    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    /// File name of the archive, used in logs and status lines.
    pub fn display_name(&self) -> String {
        self.source
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.source.display().to_string())
    }
}

impl fmt::Debug for ExtractionRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionRequest")
            .field("index", &self.index)
            .field("source", &self.source)
            .field("destination", &self.destination)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_numbers_in_order() {
        let requests = ExtractionRequest::batch(
            &["a.7z", "b.7z", "c.7z"],
            Path::new("/out"),
            Some("pw"),
        );
        let indices: Vec<usize> = requests.iter().map(|r| r.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
        assert!(requests.iter().all(|r| r.password() == Some("pw")));
        assert_eq!(requests[1].source, PathBuf::from("b.7z"));
    }

    #[test]
    fn test_empty_password_is_dropped() {
        let request = ExtractionRequest::new(0, "a.7z", "/out", Some(String::new()));
        assert_eq!(request.password(), None);
    }

    #[test]
    fn test_display_name_and_debug() {
        let request = ExtractionRequest::new(0, "/data/set/part1.7z", "/out", Some("secret".into()));
        assert_eq!(request.display_name(), "part1.7z");
        assert!(!format!("{:?}", request).contains("secret"));
    }
}
