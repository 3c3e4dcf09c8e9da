use std::path::PathBuf;
use clap::{Parser, Subcommand, ValueEnum};
use crate::relay::ConflictDecision;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Seconds without archiver output before an archive is abandoned
    #[arg(short, long, default_value = "30")]
    pub timeout: u32,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Extract archives one after another
    Extract {
        /// Archives to extract, in order
        #[arg(required = true)]
        archives: Vec<PathBuf>,
        /// Destination directory
        #[arg(short, long)]
        output_dir: PathBuf,
        /// Password typed into the first password prompt of each archive
        #[arg(short, long)]
        password: Option<String>,
        /// What to do when a file already exists
        #[arg(long, value_enum, default_value_t = ConflictPolicy::Ask)]
        on_conflict: ConflictPolicy,
        /// Path to the 7z executable
        #[arg(long)]
        archiver: Option<PathBuf>,
        /// Do not append results to log.txt in the destination
        #[arg(long)]
        no_log: bool,
    },
    /// Show which archiver executable would be used
    Locate {
        /// Path to the 7z executable
        #[arg(long)]
        archiver: Option<PathBuf>,
    },
}

/// Standing answer to overwrite prompts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ConflictPolicy {
    /// Ask on the terminal each time
    Ask,
    Overwrite,
    Skip,
    Always,
    SkipAll,
    Rename,
    Quit,
}

impl ConflictPolicy {
    /// The decision to send without asking, if any.
    pub fn decision(&self) -> Option<ConflictDecision> {
        match self {
            ConflictPolicy::Ask => None,
            ConflictPolicy::Overwrite => Some(ConflictDecision::Yes),
            ConflictPolicy::Skip => Some(ConflictDecision::No),
            ConflictPolicy::Always => Some(ConflictDecision::AlwaysYes),
            ConflictPolicy::SkipAll => Some(ConflictDecision::SkipAll),
            ConflictPolicy::Rename => Some(ConflictDecision::AutoRename),
            ConflictPolicy::Quit => Some(ConflictDecision::Quit),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_extract() {
        let cli = Cli::try_parse_from([
            "batch_extract",
            "--timeout",
            "5",
            "extract",
            "a.7z",
            "b.7z",
            "-o",
            "out",
            "--on-conflict",
            "skip-all",
        ])
        .unwrap();
        assert_eq!(cli.timeout, 5);
        match cli.command {
            Commands::Extract { archives, output_dir, password, on_conflict, no_log, .. } => {
                assert_eq!(archives, vec![PathBuf::from("a.7z"), PathBuf::from("b.7z")]);
                assert_eq!(output_dir, PathBuf::from("out"));
                assert_eq!(password, None);
                assert_eq!(on_conflict, ConflictPolicy::SkipAll);
                assert!(!no_log);
            }
            other => panic!("Expected Extract, got {:?}", other),
        }
    }

    #[test]
    fn test_extract_requires_archives() {
        assert!(Cli::try_parse_from(["batch_extract", "extract", "-o", "out"]).is_err());
    }

    #[test]
    fn test_policy_decisions() {
        assert_eq!(ConflictPolicy::Ask.decision(), None);
        assert_eq!(ConflictPolicy::Rename.decision(), Some(ConflictDecision::AutoRename));
    }
}
