use std::fmt;
use regex::{Captures, Regex};
use crate::core::config::EngineConfig;
use crate::core::constants::{PATH_LABEL_PATTERN, PROGRESS_PATTERN};
use crate::error::types::{BatchError, Result};
use crate::relay::ConflictHints;

/// Something recognised in archiver output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassifiedEvent {
    Progress(u8),
    PasswordRequested,
    ConflictRequested(ConflictHints),
    Succeeded,
    PasswordFailed,
    /// Carries the output line the error marker appeared on.
    GenericError(String),
    StreamEnded,
}

/// A match found in the text handed to [`Classifier::next_match`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classified {
    pub event: ClassifiedEvent,
    pub rule: &'static str,
    pub start: usize,
    /// Byte offset just past the match; everything before it is consumed.
    pub end: usize,
}

/// Builds the event from the rule's captures and the full text scanned.
type Build = fn(&Classifier, &Captures<'_>, &str) -> ClassifiedEvent;

struct Rule {
    name: &'static str,
    matcher: Regex,
    build: Build,
}

/// Ordered rule table over archiver output.
///
/// The earliest match in the text wins; two rules matching at the same
/// position are resolved by table order.
pub struct Classifier {
    rules: Vec<Rule>,
    path_label: Regex,
}

impl Classifier {
    pub fn new(config: &EngineConfig) -> Result<Self> {
        let error_markers = config
            .error_markers()
            .iter()
            .map(|marker| regex::escape(marker))
            .collect::<Vec<_>>()
            .join("|");

        let table: [(&'static str, String, Build); 6] = [
            ("progress", PROGRESS_PATTERN.to_string(), build_progress),
            ("password-prompt", config.password_prompt().to_string(), build_password_request),
            ("conflict-prompt", config.conflict_prompt().to_string(), build_conflict_request),
            ("success", regex::escape(config.success_marker()), build_success),
            ("wrong-password", regex::escape(config.wrong_password_marker()), build_password_failure),
            ("error", format!("(?:{})", error_markers), build_error),
        ];

        let mut rules = Vec::with_capacity(table.len());
        for (name, pattern, build) in table {
            if pattern.is_empty() || pattern == "(?:)" {
                return Err(BatchError::ValidationFailed(format!("Empty pattern for rule {}", name)));
            }
            let matcher = compile(name, &pattern)?;
            rules.push(Rule { name, matcher, build });
        }

        Ok(Self {
            rules,
            path_label: compile("path-label", PATH_LABEL_PATTERN)?,
        })
    }

    /// Finds the first recognisable event in `text`.
    pub fn next_match(&self, text: &str) -> Option<Classified> {
        let mut best: Option<(&Rule, Captures<'_>)> = None;
        for rule in &self.rules {
            let Some(captures) = rule.matcher.captures(text) else {
                continue;
            };
            let start = captures.get(0).map_or(usize::MAX, |m| m.start());
            let earlier = best
                .as_ref()
                .and_then(|(_, held)| held.get(0))
                .map_or(true, |held| start < held.start());
            if earlier {
                best = Some((rule, captures));
            }
        }

        let (rule, captures) = best?;
        let whole = captures.get(0)?;
        Some(Classified {
            event: (rule.build)(self, &captures, text),
            rule: rule.name,
            start: whole.start(),
            end: whole.end(),
        })
    }

    /// Classifies a complete piece of text, in output order.
    pub fn classify_all(&self, text: &str) -> Vec<ClassifiedEvent> {
        let mut events = Vec::new();
        let mut rest = text;
        while let Some(found) = self.next_match(rest) {
            events.push(found.event);
            rest = &rest[found.end..];
        }
        events
    }

    /// Event produced when the archiver closes its output.
    pub fn end_of_stream(&self) -> ClassifiedEvent {
        ClassifiedEvent::StreamEnded
    }

    /// The two most recent `Path:` values in `text`, local file first.
    pub fn path_hints(&self, text: &str) -> ConflictHints {
        let paths: Vec<&str> = self
            .path_label
            .captures_iter(text)
            .filter_map(|caps| caps.get(1))
            .map(|m| m.as_str().trim())
            .collect();

        match paths.as_slice() {
            [.., local, archive] => ConflictHints::new(*local, *archive),
            _ => ConflictHints::unknown(),
        }
    }
}

impl fmt::Debug for Classifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Classifier")
            .field("rules", &self.rules.iter().map(|r| r.name).collect::<Vec<_>>())
            .finish()
    }
}

fn compile(name: &str, pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| {
        BatchError::ValidationFailed(format!("Invalid pattern for rule {}: {}", name, e))
    })
}

fn build_progress(_: &Classifier, captures: &Captures<'_>, _: &str) -> ClassifiedEvent {
    let percent = captures
        .get(1)
        .and_then(|digits| digits.as_str().parse::<u32>().ok())
        .map_or(100, |value| value.min(100));
    ClassifiedEvent::Progress(percent as u8)
}

fn build_password_request(_: &Classifier, _: &Captures<'_>, _: &str) -> ClassifiedEvent {
    ClassifiedEvent::PasswordRequested
}

fn build_conflict_request(classifier: &Classifier, captures: &Captures<'_>, text: &str) -> ClassifiedEvent {
    let end = captures.get(0).map_or(text.len(), |m| m.end());
    ClassifiedEvent::ConflictRequested(classifier.path_hints(&text[..end]))
}

fn build_success(_: &Classifier, _: &Captures<'_>, _: &str) -> ClassifiedEvent {
    ClassifiedEvent::Succeeded
}

fn build_password_failure(_: &Classifier, _: &Captures<'_>, _: &str) -> ClassifiedEvent {
    ClassifiedEvent::PasswordFailed
}

fn build_error(_: &Classifier, captures: &Captures<'_>, text: &str) -> ClassifiedEvent {
    let (start, end) = captures.get(0).map_or((0, 0), |m| (m.start(), m.end()));
    let line_start = text[..start].rfind('\n').map_or(0, |i| i + 1);
    let line_end = text[end..].find('\n').map_or(text.len(), |i| end + i);
    ClassifiedEvent::GenericError(text[line_start..line_end].trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> Classifier {
        Classifier::new(&EngineConfig::default()).unwrap()
    }

    #[test]
    fn test_bare_percent_is_single_progress() {
        assert_eq!(classifier().classify_all("42%"), vec![ClassifiedEvent::Progress(42)]);
    }

    #[test]
    fn test_progress_is_clamped() {
        let events = classifier().classify_all("250% 99999999999999999999%");
        assert_eq!(events, vec![ClassifiedEvent::Progress(100), ClassifiedEvent::Progress(100)]);
    }

    #[test]
    fn test_password_prompt() {
        let events = classifier().classify_all("Enter password (will not be echoed):");
        assert_eq!(events, vec![ClassifiedEvent::PasswordRequested]);
    }

    #[test]
    fn test_password_prompt_needs_colon() {
        assert!(classifier().next_match("Enter password (will not").is_none());
    }

    #[test]
    fn test_conflict_hints_from_path_lines() {
        let text = "Path: /a/b\nPath: archive/c\n(Y)es / (N)o / (A)lways...?";
        let events = classifier().classify_all(text);
        assert_eq!(
            events,
            vec![ClassifiedEvent::ConflictRequested(ConflictHints::new("/a/b", "archive/c"))]
        );
    }

    #[test]
    fn test_conflict_uses_most_recent_paths() {
        let text = "Path: stale\nPath: /out/x.txt\nPath: x.txt\n? (Y)es / (N)o / (A)lways / (S)kip all / A(u)to rename all / (Q)uit? ";
        let found = classifier().next_match(text).unwrap();
        assert_eq!(
            found.event,
            ClassifiedEvent::ConflictRequested(ConflictHints::new("/out/x.txt", "x.txt"))
        );
        assert_eq!(found.rule, "conflict-prompt");
    }

    #[test]
    fn test_conflict_without_paths_is_unknown() {
        let found = classifier().next_match("Path: only\n(Y)es / (N)o / (A)lways?").unwrap();
        assert_eq!(found.event, ClassifiedEvent::ConflictRequested(ConflictHints::unknown()));
    }

    #[test]
    fn test_markers() {
        let c = classifier();
        assert_eq!(c.classify_all("Everything is Ok\n"), vec![ClassifiedEvent::Succeeded]);
        assert_eq!(
            c.classify_all("ERROR: Wrong password : a.txt\n"),
            vec![ClassifiedEvent::PasswordFailed]
        );
        assert_eq!(
            c.classify_all("header\nSub items Errors: 1\n"),
            vec![ClassifiedEvent::GenericError("Sub items Errors: 1".to_string())]
        );
    }

    #[test]
    fn test_earliest_match_wins() {
        let events = classifier().classify_all("ERROR: Wrong password\nSub items Errors: 1\n");
        assert_eq!(events[0], ClassifiedEvent::PasswordFailed);
    }

    #[test]
    fn test_events_keep_output_order() {
        let events = classifier().classify_all(" 10% 55%\nEverything is Ok\n");
        assert_eq!(
            events,
            vec![
                ClassifiedEvent::Progress(10),
                ClassifiedEvent::Progress(55),
                ClassifiedEvent::Succeeded,
            ]
        );
    }

    #[test]
    fn test_unmatched_text_yields_nothing() {
        assert!(classifier().classify_all("7-Zip 23.01 (x64)\nScanning the drive for archives:\n").is_empty());
    }

    #[test]
    fn test_custom_error_marker() {
        let config = EngineConfig::builder()
            .add_error_marker("Can not open the file as archive")
            .build();
        let events = Classifier::new(&config)
            .unwrap()
            .classify_all("ERROR: x.7z\nCan not open the file as archive\n");
        assert_eq!(
            events,
            vec![ClassifiedEvent::GenericError("Can not open the file as archive".to_string())]
        );
    }

    #[test]
    fn test_invalid_prompt_pattern_is_rejected() {
        let config = EngineConfig::builder().password_prompt("Enter (password").build();
        assert!(matches!(Classifier::new(&config), Err(BatchError::ValidationFailed(_))));
    }
}
