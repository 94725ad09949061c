//! Feedback Transport: delivers step states to the LED controller
//!
//! `publish` never blocks. A single background worker owns the network calls;
//! commands are coalesced per step so only the latest desired state is sent.
//! Failed deliveries get a bounded number of immediate retries and are then
//! dropped. A periodic health probe resyncs the controller when its view
//! drifts from the desired one (e.g. after a controller reboot).

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;
use tokio::sync::mpsc::{self, error::TryRecvError, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::core::config::FeedbackConfig;
use crate::types::{HealthReport, SignalRequest, StepEvent, StepId, StepState};
use crate::STEP_COUNT;

/// Delivery failures (never surfaced to the interpreter)
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("feedback endpoint not configured")]
    NoEndpoint,
    #[error("request timed out")]
    Timeout,
    #[error("HTTP error: {0}")]
    Http(reqwest::Error),
    #[error("controller answered {0}")]
    Status(u16),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout
        } else {
            TransportError::Http(err)
        }
    }
}

/// Thin HTTP client for the controller's three endpoints
#[derive(Debug, Clone)]
pub struct LedClient {
    http: reqwest::Client,
    base_url: String,
}

impl LedClient {
    /// Client for `config.endpoint` with `config.timeout_ms` per request
    pub fn new(config: &FeedbackConfig) -> Result<Self, TransportError> {
        let base_url = config.base_url().ok_or(TransportError::NoEndpoint)?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms.max(1)))
            .build()?;
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn signal(&self, step: StepId, state: StepState) -> Result<(), TransportError> {
        let body = SignalRequest { step, state };
        self.post("/signal", Some(&body)).await
    }

    pub async fn reset(&self) -> Result<(), TransportError> {
        self.post::<SignalRequest>("/reset", None).await
    }

    pub async fn health(&self) -> Result<HealthReport, TransportError> {
        let response = self
            .http
            .get(format!("{}/health", self.base_url))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(TransportError::Status(response.status().as_u16()));
        }
        Ok(response.json::<HealthReport>().await?)
    }

    async fn post<T: Serialize>(&self, path: &str, body: Option<&T>) -> Result<(), TransportError> {
        let mut request = self.http.post(format!("{}{}", self.base_url, path));
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request.send().await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(TransportError::Status(response.status().as_u16()))
        }
    }
}

/// Delivery counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransportStats {
    pub delivered: u64,
    pub retried: u64,
    pub dropped: u64,
    pub resyncs: u64,
}

#[derive(Debug, Default)]
struct Counters {
    delivered: AtomicU64,
    retried: AtomicU64,
    dropped: AtomicU64,
    resyncs: AtomicU64,
}

impl Counters {
    fn snapshot(&self) -> TransportStats {
        TransportStats {
            delivered: self.delivered.load(Ordering::Relaxed),
            retried: self.retried.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            resyncs: self.resyncs.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Command {
    Signal(StepId, StepState),
    Reset,
}

/// Handle to the background delivery worker
#[derive(Debug)]
pub struct FeedbackTransport {
    tx: Option<UnboundedSender<Command>>,
    counters: Arc<Counters>,
    worker: Option<JoinHandle<()>>,
}

impl FeedbackTransport {
    /// Transport that accepts and discards everything
    pub fn disabled() -> Self {
        Self {
            tx: None,
            counters: Arc::new(Counters::default()),
            worker: None,
        }
    }

    /// Start the worker. Must be called inside a tokio runtime.
    pub fn spawn(config: &FeedbackConfig) -> Result<Self, TransportError> {
        if !config.enabled {
            info!("LED feedback disabled");
            return Ok(Self::disabled());
        }

        let client = LedClient::new(config)?;
        let (tx, rx) = mpsc::unbounded_channel();
        let counters = Arc::new(Counters::default());
        info!(endpoint = client.base_url(), "LED feedback enabled");

        let worker = Worker {
            client,
            rx,
            pending: Pending::default(),
            desired: [StepState::Idle; STEP_COUNT],
            retries: config.retries,
            last_uptime_ms: None,
            counters: counters.clone(),
        };
        let probe_every = Duration::from_millis(config.health_interval_ms);
        let probe = (config.health_interval_ms > 0).then(|| {
            let mut interval = tokio::time::interval_at(Instant::now() + probe_every, probe_every);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            interval
        });
        let handle = tokio::spawn(worker.run(probe));

        Ok(Self {
            tx: Some(tx),
            counters,
            worker: Some(handle),
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.tx.is_some()
    }

    /// Queue the event's state as the latest desired state for its step
    pub fn publish(&self, event: &StepEvent) {
        self.send(Command::Signal(event.step, event.state));
    }

    pub fn publish_all(&self, events: &[StepEvent]) {
        for event in events {
            self.publish(event);
        }
    }

    /// Queue a controller reset. Supersedes every pending step state, so a
    /// session reset should use this instead of per-step IDLE events.
    pub fn publish_reset(&self) {
        self.send(Command::Reset);
    }

    pub fn stats(&self) -> TransportStats {
        self.counters.snapshot()
    }

    /// Stop accepting commands, let the worker flush what is pending, wait for it.
    pub async fn close(mut self) -> TransportStats {
        self.tx.take();
        if let Some(worker) = self.worker.take() {
            if let Err(err) = worker.await {
                warn!(error = %err, "feedback worker ended abnormally");
            }
        }
        self.counters.snapshot()
    }

    fn send(&self, command: Command) {
        if let Some(tx) = &self.tx {
            if tx.send(command).is_err() {
                debug!("feedback worker gone, command discarded");
            }
        }
    }
}

/// Coalesced work not yet delivered
#[derive(Debug, Default)]
struct Pending {
    reset: bool,
    steps: [Option<StepState>; STEP_COUNT],
}

impl Pending {
    fn is_empty(&self) -> bool {
        !self.reset && self.steps.iter().all(Option::is_none)
    }
}

#[derive(Debug, Clone, Copy)]
enum Delivery {
    Reset,
    Signal(StepId, StepState),
}

struct Worker {
    client: LedClient,
    rx: UnboundedReceiver<Command>,
    pending: Pending,
    /// Latest truth per step, as published
    desired: [StepState; STEP_COUNT],
    retries: u32,
    last_uptime_ms: Option<u64>,
    counters: Arc<Counters>,
}

impl Worker {
    async fn run(mut self, mut probe: Option<Interval>) {
        let mut open = true;
        while open || !self.pending.is_empty() {
            if self.pending.is_empty() {
                tokio::select! {
                    command = self.rx.recv() => match command {
                        Some(command) => self.absorb(command),
                        None => open = false,
                    },
                    _ = next_probe(&mut probe) => self.probe().await,
                }
                continue;
            }

            if open {
                open = self.drain();
            }
            if let Some(delivery) = self.take_next() {
                self.deliver(delivery).await;
            }
        }
        debug!("feedback worker stopped");
    }

    fn absorb(&mut self, command: Command) {
        match command {
            Command::Signal(step, state) => {
                self.desired[step.index()] = state;
                self.pending.steps[step.index()] = Some(state);
            }
            Command::Reset => {
                self.desired = [StepState::Idle; STEP_COUNT];
                self.pending = Pending {
                    reset: true,
                    ..Pending::default()
                };
            }
        }
    }

    /// Absorb everything already queued; false once all senders are gone
    fn drain(&mut self) -> bool {
        loop {
            match self.rx.try_recv() {
                Ok(command) => self.absorb(command),
                Err(TryRecvError::Empty) => return true,
                Err(TryRecvError::Disconnected) => return false,
            }
        }
    }

    fn take_next(&mut self) -> Option<Delivery> {
        if self.pending.reset {
            self.pending.reset = false;
            return Some(Delivery::Reset);
        }
        self.pending
            .steps
            .iter_mut()
            .enumerate()
            .find_map(|(i, slot)| slot.take().map(|state| (i, state)))
            .and_then(|(i, state)| StepId::from_index(i).map(|step| Delivery::Signal(step, state)))
    }

    async fn deliver(&self, delivery: Delivery) {
        for attempt in 0..=self.retries {
            let result = match delivery {
                Delivery::Reset => self.client.reset().await,
                Delivery::Signal(step, state) => self.client.signal(step, state).await,
            };
            match result {
                Ok(()) => {
                    self.counters.delivered.fetch_add(1, Ordering::Relaxed);
                    return;
                }
                Err(err) if attempt < self.retries => {
                    self.counters.retried.fetch_add(1, Ordering::Relaxed);
                    debug!(error = %err, attempt, "LED delivery failed, retrying");
                }
                Err(err) => {
                    self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                    match delivery {
                        Delivery::Reset => warn!(error = %err, "LED reset dropped"),
                        Delivery::Signal(step, state) => {
                            warn!(error = %err, step = step.number(), state = %state, "LED update dropped")
                        }
                    }
                }
            }
        }
    }

    /// Compare the controller's view with the desired one; queue a resync on drift
    async fn probe(&mut self) {
        let report = match self.client.health().await {
            Ok(report) => report,
            Err(err) => {
                debug!(error = %err, "health probe failed");
                return;
            }
        };

        let rebooted = self
            .last_uptime_ms
            .is_some_and(|previous| report.uptime_ms < previous);
        self.last_uptime_ms = Some(report.uptime_ms);

        let expected_current = StepId::ALL
            .into_iter()
            .find(|s| self.desired[s.index()] == StepState::Current);
        let expected_completed: Vec<StepId> = StepId::ALL
            .into_iter()
            .filter(|s| self.desired[s.index()] == StepState::Completed)
            .collect();
        let drifted = report.current != expected_current || report.completed != expected_completed;

        if rebooted || drifted {
            info!(rebooted, drifted, "controller view drifted, resyncing");
            self.counters.resyncs.fetch_add(1, Ordering::Relaxed);
            self.queue_resync();
        }
    }

    /// Reset the controller, then replay every non-IDLE desired state
    fn queue_resync(&mut self) {
        self.pending.reset = true;
        for step in StepId::ALL {
            let state = self.desired[step.index()];
            self.pending.steps[step.index()] = (state != StepState::Idle).then_some(state);
        }
    }
}

async fn next_probe(probe: &mut Option<Interval>) {
    match probe {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}
