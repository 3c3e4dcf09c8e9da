use std::fmt;
use std::str::FromStr;
use crate::core::constants::UNKNOWN_PATH;

/// Operator answer to an overwrite prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConflictDecision {
    Yes,
    No,
    AlwaysYes,
    SkipAll,
    AutoRename,
    Quit,
}

impl ConflictDecision {
    pub const ALL: [ConflictDecision; 6] = [
        ConflictDecision::Yes,
        ConflictDecision::No,
        ConflictDecision::AlwaysYes,
        ConflictDecision::SkipAll,
        ConflictDecision::AutoRename,
        ConflictDecision::Quit,
    ];

    /// Key the archiver expects on its input for this choice.
    pub fn response(&self) -> char {
        match self {
            ConflictDecision::Yes => 'y',
            ConflictDecision::No => 'n',
            ConflictDecision::AlwaysYes => 'a',
            ConflictDecision::SkipAll => 's',
            ConflictDecision::AutoRename => 'u',
            ConflictDecision::Quit => 'q',
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ConflictDecision::Yes => "(Y)es",
            ConflictDecision::No => "(N)o",
            ConflictDecision::AlwaysYes => "(A)lways",
            ConflictDecision::SkipAll => "(S)kip all",
            ConflictDecision::AutoRename => "A(u)to rename",
            ConflictDecision::Quit => "(Q)uit",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ConflictDecision::Yes => "replace the existing file",
            ConflictDecision::No => "skip this file",
            ConflictDecision::AlwaysYes => "replace this and every later conflicting file",
            ConflictDecision::SkipAll => "skip this and every later conflicting file",
            ConflictDecision::AutoRename => "rename extracted files to avoid overwriting",
            ConflictDecision::Quit => "stop extracting this archive",
        }
    }
}

impl fmt::Display for ConflictDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ConflictDecision {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "y" | "yes" => Ok(ConflictDecision::Yes),
            "n" | "no" => Ok(ConflictDecision::No),
            "a" | "always" => Ok(ConflictDecision::AlwaysYes),
            "s" | "skip all" | "skip-all" => Ok(ConflictDecision::SkipAll),
            "u" | "rename" | "auto rename" | "auto-rename" => Ok(ConflictDecision::AutoRename),
            "q" | "quit" => Ok(ConflictDecision::Quit),
            other => Err(format!("unrecognised conflict choice: {}", other)),
        }
    }
}

/// Answer to a password prompt. No answer is sent as the empty password.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct PasswordAnswer(Option<String>);

impl PasswordAnswer {
    pub fn new(text: impl Into<String>) -> Self {
        Self(Some(text.into()))
    }

    pub fn none() -> Self {
        Self(None)
    }

    pub fn is_none(&self) -> bool {
        self.0.is_none()
    }

    pub fn text(&self) -> &str {
        self.0.as_deref().unwrap_or("")
    }
}

impl From<Option<String>> for PasswordAnswer {
    fn from(value: Option<String>) -> Self {
        Self(value.filter(|text| !text.is_empty()))
    }
}

impl From<&str> for PasswordAnswer {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl fmt::Debug for PasswordAnswer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(_) => f.write_str("PasswordAnswer(***)"),
            None => f.write_str("PasswordAnswer(None)"),
        }
    }
}

/// Paths the archiver printed around an overwrite prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictHints {
    pub local_path: String,
    pub archive_path: String,
}

impl ConflictHints {
    pub fn new(local_path: impl Into<String>, archive_path: impl Into<String>) -> Self {
        Self {
            local_path: local_path.into(),
            archive_path: archive_path.into(),
        }
    }

    pub fn unknown() -> Self {
        Self::new(UNKNOWN_PATH, UNKNOWN_PATH)
    }

    /// Operator-facing prompt listing both files and every choice.
    pub fn prompt_text(&self) -> String {
        let mut text = format!(
            "File conflict detected.\n  Existing file:   {}\n  File in archive: {}\n\nChoices:\n",
            self.local_path, self.archive_path
        );
        for decision in ConflictDecision::ALL {
            text.push_str(&format!("  {:<14} - {}\n", decision.label(), decision.description()));
        }
        text
    }
}

impl Default for ConflictHints {
    fn default() -> Self {
        Self::unknown()
    }
}
