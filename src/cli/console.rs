use std::collections::HashMap;
use std::io::{self, BufRead, Write};
use std::sync::{Arc, Mutex, MutexGuard};
use console::Term;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use log::warn;
use crate::batch::{BatchReport, EventSink, ExtractionRequest};
use crate::relay::{ConflictDecision, ConflictHints, DecisionRelay, PasswordAnswer};

const PB_STYLE: &str = "{prefix:>24.cyan.bold} [{bar:40.cyan/blue}] {pos:>3}% {wide_msg}";
const PB_CHARS: &str = "█▓▒░  ";

/// Terminal front end: one progress bar per archive, prompts on stdin.
pub struct ConsoleSink {
    relay: Arc<DecisionRelay>,
    conflict_policy: Option<ConflictDecision>,
    multi: MultiProgress,
    bars: Mutex<HashMap<usize, ProgressBar>>,
}

impl ConsoleSink {
    /// `conflict_policy` answers every conflict without asking when set.
    pub fn new(relay: Arc<DecisionRelay>, conflict_policy: Option<ConflictDecision>) -> Self {
        Self {
            relay,
            conflict_policy,
            multi: MultiProgress::new(),
            bars: Mutex::new(HashMap::new()),
        }
    }

    fn bar(&self, index: usize) -> Option<ProgressBar> {
        self.lock().get(&index).cloned()
    }

    /// Runs `f` with the bars hidden so prompts stay readable.
    fn suspended<T>(&self, f: impl FnOnce() -> T) -> T {
        self.multi.suspend(f)
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<usize, ProgressBar>> {
        self.bars.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl EventSink for ConsoleSink {
    fn started(&self, index: usize, request: &ExtractionRequest) {
        let bar = self.multi.add(ProgressBar::new(100));
        if let Ok(style) = ProgressStyle::with_template(PB_STYLE) {
            bar.set_style(style.progress_chars(PB_CHARS));
        }
        bar.set_prefix(request.display_name());
        self.lock().insert(index, bar);
    }

    fn progress(&self, index: usize, percent: u8) {
        if let Some(bar) = self.bar(index) {
            bar.set_position(u64::from(percent));
        }
    }

    fn status(&self, index: usize, outcome: &str) {
        if let Some(bar) = self.lock().remove(&index) {
            bar.finish_with_message(outcome.to_string());
        }
    }

    fn password_needed(&self, index: usize, prompt: &str) {
        let answer = self.suspended(|| ask_secret(&format!("{}: ", prompt)));
        self.relay.provide_password(index, password_answer(answer));
    }

    fn conflict_needed(&self, index: usize, prompt: &str, _hints: &ConflictHints) {
        let decision = match self.conflict_policy {
            Some(decision) => decision,
            None => self.suspended(|| ask_conflict(prompt)),
        };
        self.relay.provide_conflict_decision(index, decision);
    }

    fn batch_complete(&self, report: &BatchReport) {
        let _ = self.multi.println(report.to_string());
    }
}

fn ask(prompt: &str) -> io::Result<String> {
    let mut stdout = io::stdout();
    write!(stdout, "{}", prompt)?;
    stdout.flush()?;
    let mut line = String::new();
    if io::stdin().lock().read_line(&mut line)? == 0 {
        return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "stdin closed"));
    }
    Ok(line.trim_end_matches(&['\r', '\n'][..]).to_string())
}

/// Reads a line without echoing it to the terminal.
fn ask_secret(prompt: &str) -> io::Result<String> {
    let term = Term::stderr();
    term.write_str(prompt)?;
    term.flush()?;
    term.read_secure_line()
}

fn password_answer(read: io::Result<String>) -> PasswordAnswer {
    match read {
        Ok(text) => PasswordAnswer::from(Some(text)),
        Err(e) => {
            warn!("Could not read password: {}", e);
            PasswordAnswer::none()
        }
    }
}

fn ask_conflict(prompt: &str) -> ConflictDecision {
    println!("{}", prompt);
    loop {
        match ask("Choice [y/n/a/s/u/q]: ") {
            Ok(text) => match text.parse::<ConflictDecision>() {
                Ok(decision) => return decision,
                Err(e) => println!("{}", e),
            },
            Err(e) => {
                warn!("Could not read choice, skipping the file: {}", e);
                return ConflictDecision::No;
            }
        }
    }
}
