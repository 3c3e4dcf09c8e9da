use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use log::{debug, info, warn};
use crate::core::config::EngineConfig;
use crate::error::types::{ExtractError, Result};
use crate::extract::{Archiver, Classifier, ExtractionSession, SessionControl, SessionOutcome};
use crate::fs::{LogRecord, RecordWriter};
use crate::relay::DecisionRelay;
use super::events::EventSink;
use super::report::BatchReport;
use super::request::ExtractionRequest;

#[derive(Default)]
struct QueueState {
    pending: VecDeque<ExtractionRequest>,
    running: bool,
    active: Option<Arc<SessionControl>>,
    outcomes: Vec<SessionOutcome>,
}

enum Next {
    Run(ExtractionRequest, Arc<SessionControl>),
    Done(Vec<SessionOutcome>),
}

/// FIFO queue that runs one extraction session at a time.
pub struct Scheduler {
    state: Mutex<QueueState>,
    config: EngineConfig,
    classifier: Classifier,
    archiver: Arc<dyn Archiver>,
    relay: Arc<DecisionRelay>,
    sink: Arc<dyn EventSink>,
    records: Option<Arc<dyn RecordWriter>>,
}

impl Scheduler {
    pub fn new(
        config: EngineConfig,
        archiver: Arc<dyn Archiver>,
        relay: Arc<DecisionRelay>,
        sink: Arc<dyn EventSink>,
    ) -> Result<Self> {
        Ok(Self {
            state: Mutex::new(QueueState::default()),
            classifier: Classifier::new(&config)?,
            config,
            archiver,
            relay,
            sink,
            records: None,
        })
    }

    /// Hands every finished request to `records` as a log line.
    pub fn with_records(mut self, records: Arc<dyn RecordWriter>) -> Self {
        self.records = Some(records);
        self
    }

    pub fn relay(&self) -> &Arc<DecisionRelay> {
        &self.relay
    }

    /// Appends `requests` behind anything already queued.
    pub fn enqueue<I>(&self, requests: I)
    where
        I: IntoIterator<Item = ExtractionRequest>,
    {
        let mut state = self.lock();
        for request in requests {
            debug!("Queued {} as request {}", request.source.display(), request.index);
            state.pending.push_back(request);
        }
    }

    pub fn is_running(&self) -> bool {
        self.lock().running
    }

    /// Index of the request whose session is running right now.
    pub fn active_index(&self) -> Option<usize> {
        self.lock().active.as_ref().map(|control| control.index())
    }

    /// Indices still waiting, in the order they will run.
    pub fn pending(&self) -> Vec<usize> {
        self.lock().pending.iter().map(|request| request.index).collect()
    }

    /// Starts working through the queue on a background thread.
    ///
    /// Returns `None` when a batch is already running; the queued requests are
    /// picked up by that batch.
    pub fn start(self: &Arc<Self>) -> Result<Option<JoinHandle<BatchReport>>> {
        if !self.begin() {
            debug!("Scheduler already running");
            return Ok(None);
        }
        let scheduler = Arc::clone(self);
        let spawned = thread::Builder::new()
            .name("batch-scheduler".to_string())
            .spawn(move || scheduler.drain());
        match spawned {
            Ok(handle) => Ok(Some(handle)),
            Err(e) => {
                self.lock().running = false;
                Err(ExtractError::Pipe(format!("cannot start scheduler thread: {}", e)).into())
            }
        }
    }

    /// Works through the queue on the calling thread. Returns `None` when a
    /// batch is already running elsewhere.
    pub fn run(&self) -> Option<BatchReport> {
        if !self.begin() {
            debug!("Scheduler already running");
            return None;
        }
        Some(self.drain())
    }

    /// Cancels request `index`: stops its session if it is running, or drops
    /// it from the queue. Returns false when no such request is known.
    pub fn cancel(&self, index: usize) -> bool {
        let mut state = self.lock();
        if let Some(control) = state.active.as_ref().filter(|c| c.index() == index) {
            control.cancel(&self.relay);
            return true;
        }
        let before = state.pending.len();
        state.pending.retain(|request| request.index != index);
        let removed = state.pending.len() != before;
        if removed {
            info!("Removed request {} from the queue", index);
        }
        removed
    }

    fn begin(&self) -> bool {
        let mut state = self.lock();
        if state.running {
            return false;
        }
        state.running = true;
        state.outcomes.clear();
        true
    }

    fn drain(&self) -> BatchReport {
        loop {
            let next = {
                let mut state = self.lock();
                match state.pending.pop_front() {
                    Some(request) => {
                        let control = Arc::new(SessionControl::new(request.index));
                        state.active = Some(Arc::clone(&control));
                        Next::Run(request, control)
                    }
                    None => {
                        state.running = false;
                        state.active = None;
                        Next::Done(std::mem::take(&mut state.outcomes))
                    }
                }
            };

            match next {
                Next::Run(request, control) => {
                    let outcome = self.run_session(request, control);
                    let mut state = self.lock();
                    state.active = None;
                    state.outcomes.push(outcome);
                }
                Next::Done(outcomes) => {
                    let report = BatchReport::new(outcomes);
                    info!("Batch complete: {}", report);
                    self.sink.batch_complete(&report);
                    return report;
                }
            }
        }
    }

    fn run_session(&self, request: ExtractionRequest, control: Arc<SessionControl>) -> SessionOutcome {
        let index = request.index;
        info!("Extracting {} to {}", request.source.display(), request.destination.display());
        self.sink.started(index, &request);

        let outcome = ExtractionSession::new(
            request.clone(),
            &self.config,
            &self.classifier,
            self.archiver.as_ref(),
            &self.relay,
            self.sink.as_ref(),
            control,
        )
        .run();
        self.relay.withdraw(index);

        let status = outcome.to_string();
        if outcome.is_success() {
            info!("{}: {}", request.display_name(), status);
        } else {
            warn!("{}: {}", request.display_name(), status);
        }
        self.sink.status(index, &status);

        if let Some(records) = &self.records {
            let record = LogRecord::new(request.display_name(), status);
            if let Err(e) = records.append(&request.destination, &record) {
                warn!("Could not write result log: {}", e);
            }
        }
        outcome
    }

    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
