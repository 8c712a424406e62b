//! ==============================================================================
//! manager.rs - connection manager (live link / retry / simulation)
//! ==============================================================================
//!
//! purpose:
//!     owns the one live transport, the retry timer and the simulation ticker,
//!     decides which of them runs, and is the only writer of the store.
//!
//! state machine:
//!
//! ```text
//!     ┌────────────┐  opened   ┌───────────┐
//!     │ connecting │──────────>│ connected │
//!     └─────┬──────┘           └─────┬─────┘
//!           │ closed/error           │ closed/error
//!           v                        v
//!     ┌──────────────────────────────────────┐
//!     │             disconnected             │
//!     └─────┬──────────────────────────┬─────┘
//!           │ retry timer, link usable │ retry timer, secure context
//!           v                          │ with insecure endpoint, or
//!      connecting                      │ attempts exhausted
//!                                      v
//!                               ┌────────────┐
//!                               │ simulation │ (stays until reconnect/teardown)
//!                               └────────────┘
//! ```
//!
//! task model:
//!     everything runs on the manager's own task. transports, the retry timer
//!     and the ticker are spawned tasks that only post `ManagerEvent`s onto
//!     one queue. at most ONE of them exists at a time (`self.task`), and each
//!     is stamped with a generation; events from any older generation are
//!     dropped, so a cancelled attempt can never write to the store.
//!
//! relationships:
//!     - uses: transport.rs, simulation.rs, store.rs (StoreWriter)
//!     - used by: main.rs (spawns `run`), api.rs (via ManagerHandle)
//!
//! ==============================================================================

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::domain::{now_ms, ConnectionStatus, SensorReading, Severity};
use crate::error::TransportError;
use crate::simulation::SimulationGenerator;
use crate::store::StoreWriter;
use crate::transport::{Endpoint, Transport, TransportSink};

pub const RECONNECT_INTERVAL: Duration = Duration::from_millis(5000);
pub const SIMULATION_INTERVAL: Duration = Duration::from_millis(3000);

/// everything the manager reacts to
#[derive(Debug)]
pub enum ManagerEvent {
    Opened { generation: u64 },
    Message { generation: u64, text: String },
    Closed { generation: u64 },
    Error { generation: u64, error: TransportError },
    RetryElapsed { generation: u64 },
    SimulationTick { generation: u64 },
    /// leave the current mode and try the live link again
    Reconnect { endpoint: Option<Endpoint> },
    Shutdown,
}

#[derive(Clone, Debug)]
pub struct LinkSettings {
    pub endpoint: Endpoint,
    /// the consuming context is itself encrypted
    pub secure_context: bool,
    pub reconnect_interval: Duration,
    pub simulation_interval: Duration,
    /// consecutive failed attempts before falling back; `None` retries forever
    pub max_reconnect_attempts: Option<u32>,
}

impl LinkSettings {
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            secure_context: false,
            reconnect_interval: RECONNECT_INTERVAL,
            simulation_interval: SIMULATION_INTERVAL,
            max_reconnect_attempts: None,
        }
    }

    /// an encrypted context cannot open an unencrypted link
    pub fn blocked_by_context(&self) -> bool {
        self.secure_context && !self.endpoint.secure
    }
}

/// which kind of task currently runs
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TaskKind {
    Live,
    Retry,
    Simulation,
}

struct ActiveTask {
    kind: TaskKind,
    handle: JoinHandle<()>,
}

/// cloneable control handle for a running manager
#[derive(Clone, Debug)]
pub struct ManagerHandle {
    events: mpsc::UnboundedSender<ManagerEvent>,
}

impl ManagerHandle {
    /// try the live link again, optionally against a different server
    pub fn reconnect(&self, endpoint: Option<Endpoint>) {
        let _ = self.events.send(ManagerEvent::Reconnect { endpoint });
    }

    pub fn shutdown(&self) {
        let _ = self.events.send(ManagerEvent::Shutdown);
    }
}

pub struct ConnectionManager {
    settings: LinkSettings,
    transport: Arc<dyn Transport>,
    store: StoreWriter,
    simulator: SimulationGenerator,
    events_tx: mpsc::UnboundedSender<ManagerEvent>,
    events_rx: mpsc::UnboundedReceiver<ManagerEvent>,
    status: ConnectionStatus,
    task: Option<ActiveTask>,
    generation: u64,
    failed_attempts: u32,
    torn_down: bool,
}

impl ConnectionManager {
    pub fn new(settings: LinkSettings, transport: Arc<dyn Transport>, store: StoreWriter) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            settings,
            transport,
            store,
            simulator: SimulationGenerator::new(),
            events_tx,
            events_rx,
            status: ConnectionStatus::Connecting,
            task: None,
            generation: 0,
            failed_attempts: 0,
            torn_down: false,
        }
    }

    pub fn with_simulator(mut self, simulator: SimulationGenerator) -> Self {
        self.simulator = simulator;
        self
    }

    pub fn handle(&self) -> ManagerHandle {
        ManagerHandle { events: self.events_tx.clone() }
    }

    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    pub fn active_task(&self) -> Option<TaskKind> {
        self.task.as_ref().map(|t| t.kind)
    }

    pub fn settings(&self) -> &LinkSettings {
        &self.settings
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    /// begin the session: connect, or go straight to simulation when the
    /// context rules the endpoint out
    pub fn start(&mut self) {
        if self.torn_down {
            return;
        }
        if self.settings.blocked_by_context() {
            info!(
                "Secure context cannot reach {}; using simulated data",
                self.settings.endpoint.url()
            );
            self.enter_simulation();
        } else {
            self.connect();
        }
    }

    /// start, then process events until shutdown
    pub async fn run(mut self) {
        self.start();
        while self.step().await {}
        self.teardown();
    }

    /// wait for and handle one event. `false` once the manager is done.
    pub async fn step(&mut self) -> bool {
        if self.torn_down {
            return false;
        }
        match self.events_rx.recv().await {
            Some(event) => self.handle_event(event),
            None => false,
        }
    }

    /// handle whatever is already queued without waiting
    pub fn process_pending(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(event) = self.events_rx.try_recv() {
            handled += 1;
            self.handle_event(event);
        }
        handled
    }

    /// apply one event. returns `false` after shutdown.
    pub fn handle_event(&mut self, event: ManagerEvent) -> bool {
        if self.torn_down {
            debug!("Ignoring {:?} after teardown", event);
            return false;
        }

        match event {
            ManagerEvent::Opened { generation } => {
                if self.is_current(generation, TaskKind::Live) {
                    info!("Connected to {}", self.settings.endpoint.url());
                    self.failed_attempts = 0;
                    self.status = ConnectionStatus::Connected;
                    self.store.mark_connected(now_ms());
                }
            }
            ManagerEvent::Message { generation, text } => {
                if self.is_current(generation, TaskKind::Live) {
                    self.on_message(&text);
                }
            }
            ManagerEvent::Closed { generation } => {
                if self.is_current(generation, TaskKind::Live) {
                    info!("Connection closed");
                    self.on_disconnected();
                }
            }
            ManagerEvent::Error { generation, error } => {
                if self.is_current(generation, TaskKind::Live) {
                    warn!("Transport error: {}", error);
                    self.on_disconnected();
                }
            }
            ManagerEvent::RetryElapsed { generation } => {
                if self.is_current(generation, TaskKind::Retry) {
                    self.retry_or_fall_back();
                }
            }
            ManagerEvent::SimulationTick { generation } => {
                if self.is_current(generation, TaskKind::Simulation) {
                    let reading = self.simulator.next_reading();
                    self.apply(reading);
                }
            }
            ManagerEvent::Reconnect { endpoint } => {
                if let Some(endpoint) = endpoint {
                    self.settings.endpoint = endpoint;
                }
                info!("Reconnect requested for {}", self.settings.endpoint.url());
                self.failed_attempts = 0;
                self.start();
            }
            ManagerEvent::Shutdown => {
                self.teardown();
                return false;
            }
        }
        true
    }

    /// stop everything. safe from any state and safe to repeat.
    pub fn teardown(&mut self) {
        if !self.torn_down {
            info!("Tearing down connection manager");
        }
        self.cancel_task();
        self.generation += 1;
        self.torn_down = true;
    }

    // ==========================================================================
    // transitions
    // ==========================================================================

    fn connect(&mut self) {
        let generation = self.begin(ConnectionStatus::Connecting);
        let sink = TransportSink::new(generation, self.events_tx.clone());
        let transport = self.transport.clone();
        let endpoint = self.settings.endpoint.clone();
        let handle = tokio::spawn(async move { transport.run(endpoint, sink).await });
        self.task = Some(ActiveTask { kind: TaskKind::Live, handle });
    }

    fn on_disconnected(&mut self) {
        if self.status == ConnectionStatus::Connecting {
            self.failed_attempts += 1;
        }
        // an errored transport is closed here; a cleanly closed one is a no-op
        let generation = self.begin(ConnectionStatus::Disconnected);

        let events = self.events_tx.clone();
        let delay = self.settings.reconnect_interval;
        debug!("Retrying in {:?}", delay);
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = events.send(ManagerEvent::RetryElapsed { generation });
        });
        self.task = Some(ActiveTask { kind: TaskKind::Retry, handle });
    }

    fn retry_or_fall_back(&mut self) {
        let exhausted = self
            .settings
            .max_reconnect_attempts
            .is_some_and(|max| self.failed_attempts >= max);

        if self.settings.blocked_by_context() {
            info!("Secure context blocks {}; switching to simulation", self.settings.endpoint.url());
            self.enter_simulation();
        } else if exhausted {
            warn!(
                "Giving up on {} after {} failed attempts; switching to simulation",
                self.settings.endpoint.url(),
                self.failed_attempts
            );
            self.enter_simulation();
        } else {
            self.connect();
        }
    }

    fn enter_simulation(&mut self) {
        let generation = self.begin(ConnectionStatus::Simulation);

        let events = self.events_tx.clone();
        let period = self.settings.simulation_interval;
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if events.send(ManagerEvent::SimulationTick { generation }).is_err() {
                    break;
                }
            }
        });
        self.task = Some(ActiveTask { kind: TaskKind::Simulation, handle });
    }

    /// cancel the previous mode, open a new generation and publish `status`
    fn begin(&mut self, status: ConnectionStatus) -> u64 {
        self.cancel_task();
        self.generation += 1;
        if self.status != status {
            debug!("{} -> {}", self.status, status);
        }
        self.status = status;
        self.store.set_status(status, now_ms());
        self.generation
    }

    fn cancel_task(&mut self) {
        if let Some(task) = self.task.take() {
            task.handle.abort();
        }
    }

    fn is_current(&self, generation: u64, kind: TaskKind) -> bool {
        generation == self.generation && self.active_task() == Some(kind)
    }

    // ==========================================================================
    // data path
    // ==========================================================================

    fn on_message(&mut self, text: &str) {
        match SensorReading::from_json(text) {
            Ok(reading) => self.apply(reading),
            Err(e) => warn!("Dropping sensor frame: {} (got: {})", e, text),
        }
    }

    fn apply(&mut self, reading: SensorReading) {
        let before = self.store.snapshot().derived.bin_status.severity();
        let snapshot = self.store.apply_reading(reading, now_ms());
        let status = snapshot.derived.bin_status;
        if status.severity() == Severity::Critical && before != Severity::Critical {
            warn!("Bin is {} ({}% full)", status.as_str(), snapshot.derived.fill_percentage);
        }
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        self.cancel_task();
    }
}
