//! Scripted archiver and recording sink for exercising the engine without 7z.

use std::collections::{HashMap, VecDeque};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, MutexGuard, Once};
use std::thread;
use std::time::Duration;
use log::LevelFilter;
use crate::batch::{BatchReport, EventSink, ExtractionRequest};
use crate::error::types::ExtractError;
use crate::extract::{Archiver, ArchiverChild, ProcessControl};
use crate::relay::{ConflictDecision, ConflictHints, DecisionRelay, PasswordAnswer};

static INIT: Once = Once::new();

pub fn setup() {
    INIT.call_once(|| {
        env_logger::builder()
            .filter_level(LevelFilter::Debug)
            .is_test(true)
            .try_init()
            .ok();
    });
}

/// One step of a scripted archiver run.
#[derive(Debug, Clone)]
pub enum Step {
    /// Writes the text to the output stream as a single chunk.
    Emit(String),
    /// Blocks until the engine writes a full line of input.
    Expect,
    Pause(Duration),
    /// Produces nothing more until killed.
    Hang,
}

pub fn emit(text: &str) -> Step {
    Step::Emit(text.to_string())
}

enum Signal {
    Line,
    Kill,
}

#[derive(Debug, Default)]
struct ScriptState {
    scripts: HashMap<PathBuf, VecDeque<Vec<Step>>>,
    spawns: Vec<PathBuf>,
    inputs: HashMap<PathBuf, Vec<String>>,
    kills: usize,
}

/// Archiver stand-in that plays one script per spawn.
///
/// Scripts are queued per archive path; each spawn for that path consumes the
/// next one. A spawn with no script left fails like a missing program.
#[derive(Debug, Clone, Default)]
pub struct ScriptedArchiver {
    state: Arc<Mutex<ScriptState>>,
}

impl ScriptedArchiver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues the script for the next spawn of `source`.
    pub fn script(self, source: impl Into<PathBuf>, steps: Vec<Step>) -> Self {
        self.lock()
            .scripts
            .entry(source.into())
            .or_default()
            .push_back(steps);
        self
    }

    pub fn spawn_count(&self, source: &Path) -> usize {
        self.lock().spawns.iter().filter(|s| s.as_path() == source).count()
    }

    pub fn spawn_order(&self) -> Vec<PathBuf> {
        self.lock().spawns.clone()
    }

    /// Every line the engine wrote to `source`'s archiver, across attempts.
    pub fn inputs(&self, source: &Path) -> Vec<String> {
        self.lock().inputs.get(source).cloned().unwrap_or_default()
    }

    pub fn kills(&self) -> usize {
        self.lock().kills
    }

    fn lock(&self) -> MutexGuard<'_, ScriptState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Archiver for ScriptedArchiver {
    fn program(&self) -> String {
        "scripted-7z".to_string()
    }

    fn spawn(&self, request: &ExtractionRequest) -> Result<ArchiverChild, ExtractError> {
        let steps = {
            let mut state = self.lock();
            state.spawns.push(request.source.clone());
            state
                .scripts
                .get_mut(&request.source)
                .and_then(|queue| queue.pop_front())
        };
        let steps = steps.ok_or_else(|| ExtractError::Spawn {
            program: self.program(),
            reason: format!("no script for {}", request.source.display()),
        })?;

        let (out_tx, out_rx) = mpsc::channel();
        let (signal_tx, signal_rx) = mpsc::channel();
        thread::spawn(move || play(steps, out_tx, signal_rx));

        Ok(ArchiverChild {
            outputs: vec![Box::new(ChannelReader::new(out_rx))],
            input: Box::new(ScriptInput {
                source: request.source.clone(),
                state: Arc::clone(&self.state),
                line: Vec::new(),
                signals: signal_tx.clone(),
            }),
            process: Box::new(ScriptProcess {
                state: Arc::clone(&self.state),
                signals: signal_tx,
            }),
        })
    }
}

fn play(steps: Vec<Step>, out: Sender<Vec<u8>>, signals: Receiver<Signal>) {
    for step in steps {
        match step {
            Step::Emit(text) => {
                if out.send(text.into_bytes()).is_err() {
                    return;
                }
            }
            Step::Expect => loop {
                match signals.recv() {
                    Ok(Signal::Line) => break,
                    Ok(Signal::Kill) | Err(_) => return,
                }
            },
            Step::Pause(duration) => match signals.recv_timeout(duration) {
                Ok(Signal::Kill) | Err(RecvTimeoutError::Disconnected) => return,
                Ok(Signal::Line) | Err(RecvTimeoutError::Timeout) => {}
            },
            Step::Hang => loop {
                match signals.recv() {
                    Ok(Signal::Line) => continue,
                    Ok(Signal::Kill) | Err(_) => return,
                }
            },
        }
    }
}

struct ChannelReader {
    rx: Receiver<Vec<u8>>,
    buf: Vec<u8>,
    pos: usize,
}

impl ChannelReader {
    fn new(rx: Receiver<Vec<u8>>) -> Self {
        Self { rx, buf: Vec::new(), pos: 0 }
    }
}

impl Read for ChannelReader {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        while self.pos >= self.buf.len() {
            match self.rx.recv() {
                Ok(bytes) => {
                    self.buf = bytes;
                    self.pos = 0;
                }
                Err(_) => return Ok(0),
            }
        }
        let n = out.len().min(self.buf.len() - self.pos);
        out[..n].copy_from_slice(&self.buf[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

struct ScriptInput {
    source: PathBuf,
    state: Arc<Mutex<ScriptState>>,
    line: Vec<u8>,
    signals: Sender<Signal>,
}

impl Write for ScriptInput {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        for &byte in buf {
            if byte != b'\n' {
                self.line.push(byte);
                continue;
            }
            let line = String::from_utf8_lossy(&self.line).into_owned();
            self.line.clear();
            self.state
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .inputs
                .entry(self.source.clone())
                .or_default()
                .push(line);
            if self.signals.send(Signal::Line).is_err() {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "archiver exited"));
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

struct ScriptProcess {
    state: Arc<Mutex<ScriptState>>,
    signals: Sender<Signal>,
}

impl ProcessControl for ScriptProcess {
    fn kill(&mut self) -> io::Result<()> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .kills += 1;
        let _ = self.signals.send(Signal::Kill);
        Ok(())
    }

    fn wait(&mut self) -> io::Result<Option<i32>> {
        Ok(Some(0))
    }
}

/// Everything an [`EventSink`] can be told, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    Started(usize),
    Progress(usize, u8),
    Status(usize, String),
    PasswordNeeded(usize),
    ConflictNeeded(usize, ConflictHints),
    BatchComplete(usize),
}

/// Sink that records notifications and can answer decisions on the spot.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<Notification>>,
    relay: Option<Arc<DecisionRelay>>,
    password: Option<String>,
    conflict: Option<ConflictDecision>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answers every password prompt with `password` through `relay`.
    pub fn answering_passwords(mut self, relay: Arc<DecisionRelay>, password: &str) -> Self {
        self.relay = Some(relay);
        self.password = Some(password.to_string());
        self
    }

    /// Answers every conflict with `decision` through `relay`.
    pub fn answering_conflicts(mut self, relay: Arc<DecisionRelay>, decision: ConflictDecision) -> Self {
        self.relay = Some(relay);
        self.conflict = Some(decision);
        self
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.lock().clone()
    }

    pub fn progress_of(&self, index: usize) -> Vec<u8> {
        self.lock()
            .iter()
            .filter_map(|n| match n {
                Notification::Progress(i, percent) if *i == index => Some(*percent),
                _ => None,
            })
            .collect()
    }

    pub fn statuses(&self) -> Vec<(usize, String)> {
        self.lock()
            .iter()
            .filter_map(|n| match n {
                Notification::Status(i, text) => Some((*i, text.clone())),
                _ => None,
            })
            .collect()
    }

    fn record(&self, notification: Notification) {
        self.lock().push(notification);
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Notification>> {
        self.events.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl EventSink for RecordingSink {
    fn started(&self, index: usize, _request: &ExtractionRequest) {
        self.record(Notification::Started(index));
    }

    fn progress(&self, index: usize, percent: u8) {
        self.record(Notification::Progress(index, percent));
    }

    fn status(&self, index: usize, outcome: &str) {
        self.record(Notification::Status(index, outcome.to_string()));
    }

    fn password_needed(&self, index: usize, _prompt: &str) {
        self.record(Notification::PasswordNeeded(index));
        if let (Some(relay), Some(password)) = (&self.relay, &self.password) {
            relay.provide_password(index, PasswordAnswer::new(password.as_str()));
        }
    }

    fn conflict_needed(&self, index: usize, _prompt: &str, hints: &ConflictHints) {
        self.record(Notification::ConflictNeeded(index, hints.clone()));
        if let (Some(relay), Some(decision)) = (&self.relay, self.conflict) {
            relay.provide_conflict_decision(index, decision);
        }
    }

    fn batch_complete(&self, report: &BatchReport) {
        self.record(Notification::BatchComplete(report.total()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scripted_archiver_plays_and_records() {
        let archiver = ScriptedArchiver::new().script(
            "a.7z",
            vec![emit("Enter password:"), Step::Expect, emit("Everything is Ok\n")],
        );
        let request = ExtractionRequest::new(0, "a.7z", "out", None);
        let mut child = archiver.spawn(&request).unwrap();

        let mut first = [0u8; 64];
        let n = child.outputs[0].read(&mut first).unwrap();
        assert_eq!(&first[..n], b"Enter password:");

        writeln!(child.input, "pw").unwrap();
        let mut rest = String::new();
        child.outputs[0].read_to_string(&mut rest).unwrap();
        assert_eq!(rest, "Everything is Ok\n");
        assert_eq!(archiver.inputs(Path::new("a.7z")), vec!["pw".to_string()]);
        assert_eq!(archiver.spawn_count(Path::new("a.7z")), 1);
    }

    #[test]
    fn test_unscripted_spawn_fails() {
        let archiver = ScriptedArchiver::new();
        let request = ExtractionRequest::new(0, "b.7z", "out", None);
        assert!(matches!(archiver.spawn(&request), Err(ExtractError::Spawn { .. })));
    }

    #[test]
    fn test_kill_ends_hanging_script() {
        let archiver = ScriptedArchiver::new().script("c.7z", vec![emit("1%"), Step::Hang]);
        let request = ExtractionRequest::new(0, "c.7z", "out", None);
        let mut child = archiver.spawn(&request).unwrap();
        child.process.kill().unwrap();

        let mut output = String::new();
        child.outputs[0].read_to_string(&mut output).unwrap();
        assert_eq!(output, "1%");
        assert_eq!(archiver.kills(), 1);
    }
}
