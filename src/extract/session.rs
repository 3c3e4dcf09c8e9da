use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::sync::{Arc, Mutex, MutexGuard};
use log::{debug, info, warn};
use crate::batch::{EventSink, ExtractionRequest};
use crate::core::config::EngineConfig;
use crate::error::types::ExtractError;
use crate::relay::{ConflictDecision, ConflictHints, DecisionKind, DecisionRelay, PasswordAnswer, Waited};
use super::archiver::{Archiver, ProcessControl};
use super::classifier::{ClassifiedEvent, Classifier};
use super::outcome::SessionOutcome;
use super::stream::{spawn_reader, OutputContext, OutputEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Starting,
    Running,
    AwaitingPassword,
    AwaitingConflict,
    Succeeded,
    Failed,
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Succeeded | SessionState::Failed)
    }
}

/// Shared handle used to cancel a running session from another thread.
#[derive(Default)]
pub struct SessionControl {
    index: usize,
    cancelled: AtomicBool,
    process: Mutex<Option<Box<dyn ProcessControl>>>,
}

impl SessionControl {
    pub fn new(index: usize) -> Self {
        Self {
            index,
            ..Default::default()
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Quits a pending conflict through the relay, otherwise kills the archiver.
    pub fn cancel(&self, relay: &DecisionRelay) {
        info!("Cancelling session {}", self.index);
        self.cancelled.store(true, Ordering::SeqCst);
        match relay.cancel(self.index) {
            Some(DecisionKind::Conflict) => debug!("Session {}: quit sent to conflict prompt", self.index),
            _ => self.kill(),
        }
    }

    fn attach(&self, process: Box<dyn ProcessControl>) {
        *self.lock() = Some(process);
        if self.is_cancelled() {
            self.kill();
        }
    }

    fn kill(&self) {
        if let Some(process) = self.lock().as_mut() {
            if let Err(e) = process.kill() {
                debug!("Session {}: kill failed: {}", self.index, e);
            }
        }
    }

    /// Kills the archiver if asked to, then reaps it.
    fn release(&self, kill: bool) {
        let Some(mut process) = self.lock().take() else {
            return;
        };
        if kill {
            let _ = process.kill();
        }
        match process.wait() {
            Ok(code) => debug!("Session {}: archiver exited with {:?}", self.index, code),
            Err(e) => warn!("Session {}: could not reap archiver: {}", self.index, e),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<Box<dyn ProcessControl>>> {
        self.process.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Drives one archive from spawn to a terminal state.
pub struct ExtractionSession<'a> {
    request: ExtractionRequest,
    config: &'a EngineConfig,
    classifier: &'a Classifier,
    archiver: &'a dyn Archiver,
    relay: &'a DecisionRelay,
    sink: &'a dyn EventSink,
    control: Arc<SessionControl>,
    state: SessionState,
    last_percent: Option<u8>,
    attempts: u32,
    enqueued_password_used: bool,
}

impl<'a> ExtractionSession<'a> {
    pub fn new(
        request: ExtractionRequest,
        config: &'a EngineConfig,
        classifier: &'a Classifier,
        archiver: &'a dyn Archiver,
        relay: &'a DecisionRelay,
        sink: &'a dyn EventSink,
        control: Arc<SessionControl>,
    ) -> Self {
        Self {
            request,
            config,
            classifier,
            archiver,
            relay,
            sink,
            control,
            state: SessionState::Starting,
            last_percent: None,
            attempts: 0,
            enqueued_password_used: false,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Runs to completion. Failures end up in the outcome, never as a panic
    /// or an error for the caller.
    pub fn run(mut self) -> SessionOutcome {
        let result = loop {
            let attempt = self.attempt();
            match attempt {
                Err(ExtractError::PasswordFailure) if self.attempts < self.config.max_attempts() => {
                    warn!(
                        "Session {}: wrong password for {}, retrying",
                        self.request.index,
                        self.request.display_name()
                    );
                }
                other => break other,
            }
        };

        self.transition(if result.is_ok() { SessionState::Succeeded } else { SessionState::Failed });
        SessionOutcome {
            index: self.request.index,
            source: self.request.source.clone(),
            attempts: self.attempts,
            result,
        }
    }

    fn attempt(&mut self) -> Result<(), ExtractError> {
        if self.control.is_cancelled() {
            return Err(ExtractError::Canceled);
        }
        self.transition(SessionState::Starting);
        self.attempts += 1;
        debug!(
            "Session {}: attempt {} for {}",
            self.request.index,
            self.attempts,
            self.request.source.display()
        );

        let child = self.archiver.spawn(&self.request)?;
        let (tx, rx) = mpsc::channel();
        let streams = child.outputs.len();
        for (n, output) in child.outputs.into_iter().enumerate() {
            let label = format!("archiver-{}-{}", self.request.index, n);
            if let Err(e) = spawn_reader(label, output, tx.clone()) {
                self.control.attach(child.process);
                self.control.release(true);
                return Err(ExtractError::Pipe(e.to_string()));
            }
        }
        drop(tx);

        self.control.attach(child.process);
        let mut input = child.input;
        self.transition(SessionState::Running);

        let result = self.drive(&rx, streams, &mut input);
        drop(input);
        self.control.release(result.is_err());
        result
    }

    fn drive(
        &mut self,
        rx: &Receiver<OutputEvent>,
        streams: usize,
        input: &mut Box<dyn Write + Send>,
    ) -> Result<(), ExtractError> {
        let mut context = OutputContext::new(self.config.max_context_bytes());
        let mut open = streams;
        loop {
            while let Some(found) = self.classifier.next_match(context.as_str()) {
                if self.control.is_cancelled() {
                    return Err(ExtractError::Canceled);
                }
                context.consume(found.end);
                if self.handle(found.event, input)? {
                    return Ok(());
                }
            }

            if self.control.is_cancelled() {
                return Err(ExtractError::Canceled);
            }
            if open == 0 {
                debug!(
                    "Session {}: output closed with {} bytes unmatched",
                    self.request.index,
                    context.as_str().len()
                );
                let event = self.classifier.end_of_stream();
                return self.handle(event, input).and(Err(ExtractError::UnexpectedStreamEnd));
            }

            match rx.recv_timeout(self.config.read_timeout()) {
                Ok(OutputEvent::Chunk(text)) => context.push(&text),
                Ok(OutputEvent::Closed) => open -= 1,
                Err(RecvTimeoutError::Timeout) => {
                    warn!("Session {}: archiver went silent", self.request.index);
                    return Err(ExtractError::StreamTimeout(self.config.read_timeout().as_secs()));
                }
                Err(RecvTimeoutError::Disconnected) => open = 0,
            }
        }
    }

    /// Applies one event. Returns true once the archive is done.
    fn handle(
        &mut self,
        event: ClassifiedEvent,
        input: &mut Box<dyn Write + Send>,
    ) -> Result<bool, ExtractError> {
        match event {
            ClassifiedEvent::Progress(percent) => {
                self.report_progress(percent);
                Ok(false)
            }
            ClassifiedEvent::PasswordRequested => {
                self.transition(SessionState::AwaitingPassword);
                let answer = self.obtain_password()?;
                write_line(input, answer.text())?;
                self.transition(SessionState::Running);
                Ok(false)
            }
            ClassifiedEvent::ConflictRequested(hints) => {
                self.transition(SessionState::AwaitingConflict);
                let decision = self.obtain_conflict_decision(&hints);
                write_line(input, &decision.response().to_string())?;
                self.transition(SessionState::Running);
                Ok(false)
            }
            ClassifiedEvent::Succeeded => {
                self.report_progress(100);
                Ok(true)
            }
            ClassifiedEvent::PasswordFailed => Err(ExtractError::PasswordFailure),
            ClassifiedEvent::GenericError(line) => Err(ExtractError::Archiver(line)),
            ClassifiedEvent::StreamEnded => Err(ExtractError::UnexpectedStreamEnd),
        }
    }

    fn obtain_password(&mut self) -> Result<PasswordAnswer, ExtractError> {
        let index = self.request.index;
        if !self.enqueued_password_used {
            self.enqueued_password_used = true;
            if let Some(password) = self.request.password() {
                debug!("Session {}: answering prompt with the enqueued password", index);
                return Ok(PasswordAnswer::new(password));
            }
        }

        let rx = self.relay.request_password(index);
        // A cancel that ran before the request was registered found nothing to withdraw.
        if self.control.is_cancelled() {
            self.relay.withdraw(index);
            return Err(ExtractError::Canceled);
        }
        let prompt = format!("Enter the password for {}", self.request.source.display());
        self.sink.password_needed(index, &prompt);
        match DecisionRelay::wait(&rx, self.config.decision_timeout()) {
            Waited::Answered(answer) => Ok(answer),
            Waited::TimedOut => {
                self.relay.withdraw(index);
                warn!("Session {}: no password given in time, sending an empty one", index);
                Ok(PasswordAnswer::none())
            }
            Waited::Withdrawn if self.control.is_cancelled() => Err(ExtractError::Canceled),
            Waited::Withdrawn => Ok(PasswordAnswer::none()),
        }
    }

    fn obtain_conflict_decision(&mut self, hints: &ConflictHints) -> ConflictDecision {
        let index = self.request.index;
        let rx = self.relay.request_conflict(index, hints);
        if self.control.is_cancelled() {
            self.relay.withdraw(index);
            return ConflictDecision::Quit;
        }
        self.sink.conflict_needed(index, &hints.prompt_text(), hints);
        match DecisionRelay::wait(&rx, self.config.decision_timeout()) {
            Waited::Answered(decision) => decision,
            Waited::TimedOut => {
                self.relay.withdraw(index);
                warn!("Session {}: no conflict decision in time, skipping {}", index, hints.archive_path);
                ConflictDecision::No
            }
            Waited::Withdrawn => ConflictDecision::Quit,
        }
    }

    fn report_progress(&mut self, percent: u8) {
        let percent = percent.min(100);
        if self.last_percent.map_or(true, |last| percent > last) {
            self.last_percent = Some(percent);
            self.sink.progress(self.request.index, percent);
        }
    }

    fn transition(&mut self, next: SessionState) {
        if self.state.is_terminal() || self.state == next {
            return;
        }
        debug!("Session {}: {:?} -> {:?}", self.request.index, self.state, next);
        self.state = next;
    }
}

fn write_line(input: &mut Box<dyn Write + Send>, line: &str) -> Result<(), ExtractError> {
    writeln!(input, "{}", line)
        .and_then(|_| input.flush())
        .map_err(|e| ExtractError::Pipe(e.to_string()))
}
