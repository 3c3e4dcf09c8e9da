//! Hand-off point between a suspended session and whoever answers it.
//!
//! A session registers a one-shot channel for the decision it is waiting on,
//! keyed by its request index. Answers carry the index back so a late or
//! misdirected answer is dropped instead of reaching the wrong archive.

mod decision;

pub use decision::{ConflictDecision, ConflictHints, PasswordAnswer};

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender};
use std::sync::Mutex;
use std::time::Duration;
use log::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionKind {
    Password,
    Conflict,
}

#[derive(Debug)]
enum Pending {
    Password(SyncSender<PasswordAnswer>),
    Conflict(SyncSender<ConflictDecision>),
}

impl Pending {
    fn kind(&self) -> DecisionKind {
        match self {
            Pending::Password(_) => DecisionKind::Password,
            Pending::Conflict(_) => DecisionKind::Conflict,
        }
    }
}

/// Result of waiting at a suspension point.
#[derive(Debug, PartialEq, Eq)]
pub enum Waited<T> {
    Answered(T),
    TimedOut,
    /// The request was withdrawn without an answer (cancellation).
    Withdrawn,
}

#[derive(Debug, Default)]
pub struct DecisionRelay {
    pending: Mutex<Option<(usize, Pending)>>,
}

impl DecisionRelay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a password request for `index`, replacing any stale one.
    pub fn request_password(&self, index: usize) -> Receiver<PasswordAnswer> {
        let (tx, rx) = mpsc::sync_channel(1);
        self.register(index, Pending::Password(tx));
        rx
    }

    /// Registers a conflict request for `index`, replacing any stale one.
    pub fn request_conflict(&self, index: usize, hints: &ConflictHints) -> Receiver<ConflictDecision> {
        debug!("Session {} waiting on conflict {} -> {}", index, hints.archive_path, hints.local_path);
        let (tx, rx) = mpsc::sync_channel(1);
        self.register(index, Pending::Conflict(tx));
        rx
    }

    /// Delivers a password. Returns false when session `index` is not waiting on one.
    pub fn provide_password(&self, index: usize, answer: impl Into<PasswordAnswer>) -> bool {
        let answer = answer.into();
        let mut slot = self.lock();
        let taken = slot.take();
        match taken {
            Some((pending_index, Pending::Password(tx))) if pending_index == index => {
                drop(slot);
                tx.send(answer).is_ok()
            }
            other => {
                debug!("Ignoring password for session {}: not waiting on one", index);
                *slot = other;
                false
            }
        }
    }

    /// Delivers a conflict choice. Returns false when session `index` is not waiting on one.
    pub fn provide_conflict_decision(&self, index: usize, decision: ConflictDecision) -> bool {
        let mut slot = self.lock();
        let taken = slot.take();
        match taken {
            Some((pending_index, Pending::Conflict(tx))) if pending_index == index => {
                drop(slot);
                tx.send(decision).is_ok()
            }
            other => {
                debug!("Ignoring {} for session {}: not waiting on a conflict", decision, index);
                *slot = other;
                false
            }
        }
    }

    /// The session index and decision kind currently awaited, if any.
    pub fn pending(&self) -> Option<(usize, DecisionKind)> {
        self.lock().as_ref().map(|(index, pending)| (*index, pending.kind()))
    }

    /// Drops the request of session `index` so later answers are ignored.
    pub fn withdraw(&self, index: usize) {
        let mut slot = self.lock();
        if matches!(slot.as_ref(), Some((pending_index, _)) if *pending_index == index) {
            *slot = None;
        }
    }

    /// Cancels whatever session `index` waits on: a conflict is answered with
    /// `Quit`, a password request is withdrawn. Returns what was pending.
    pub(crate) fn cancel(&self, index: usize) -> Option<DecisionKind> {
        let mut slot = self.lock();
        let taken = slot.take();
        match taken {
            Some((pending_index, pending)) if pending_index == index => {
                drop(slot);
                let kind = pending.kind();
                if let Pending::Conflict(tx) = pending {
                    if tx.send(ConflictDecision::Quit).is_err() {
                        warn!("Session {} stopped waiting before quit was delivered", index);
                    }
                }
                Some(kind)
            }
            other => {
                *slot = other;
                None
            }
        }
    }

    /// Blocks on `rx`, bounded by `timeout` when one is set.
    pub fn wait<T>(rx: &Receiver<T>, timeout: Option<Duration>) -> Waited<T> {
        match timeout {
            Some(timeout) => match rx.recv_timeout(timeout) {
                Ok(value) => Waited::Answered(value),
                Err(RecvTimeoutError::Timeout) => Waited::TimedOut,
                Err(RecvTimeoutError::Disconnected) => Waited::Withdrawn,
            },
            None => match rx.recv() {
                Ok(value) => Waited::Answered(value),
                Err(_) => Waited::Withdrawn,
            },
        }
    }

    fn register(&self, index: usize, pending: Pending) {
        let mut slot = self.lock();
        if let Some((stale, _)) = slot.as_ref() {
            warn!("Replacing unanswered request of session {}", stale);
        }
        *slot = Some((index, pending));
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<(usize, Pending)>> {
        self.pending.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
