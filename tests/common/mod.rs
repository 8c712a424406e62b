#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use smartbin_host::manager::{ConnectionManager, LinkSettings};
use smartbin_host::simulation::SimulationGenerator;
use smartbin_host::store::SensorStore;
use smartbin_host::transport::{Endpoint, Transport, TransportSink};
use smartbin_host::Limits;

/// transport that does nothing on its own: each attempt parks forever and
/// hands its sink to the test, which then plays the server.
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    attempts: Arc<Mutex<Vec<(Endpoint, TransportSink)>>>,
    dropped: Arc<AtomicUsize>,
}

struct DropCounter(Arc<AtomicUsize>);

impl Drop for DropCounter {
    fn drop(&mut self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn run(&self, endpoint: Endpoint, sink: TransportSink) {
        let _guard = DropCounter(self.dropped.clone());
        self.attempts.lock().unwrap().push((endpoint, sink));
        std::future::pending::<()>().await;
    }
}

impl ScriptedTransport {
    pub fn attempts(&self) -> usize {
        self.attempts.lock().unwrap().len()
    }

    /// attempts whose future has been dropped (aborted or finished)
    pub fn closed(&self) -> usize {
        self.dropped.load(Ordering::SeqCst)
    }

    pub fn endpoint(&self, n: usize) -> Endpoint {
        self.attempts.lock().unwrap()[n].0.clone()
    }

    /// wait until attempt `n` (0-based) has started and return its sink
    pub async fn attempt(&self, n: usize) -> TransportSink {
        for _ in 0..100 {
            if let Some((_, sink)) = self.attempts.lock().unwrap().get(n) {
                return sink.clone();
            }
            tokio::task::yield_now().await;
        }
        panic!("connection attempt {n} never started");
    }
}

pub async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}

pub fn endpoint() -> Endpoint {
    Endpoint::new("127.0.0.1", 3000, false)
}

pub fn settings() -> LinkSettings {
    LinkSettings {
        endpoint: endpoint(),
        secure_context: false,
        reconnect_interval: Duration::from_millis(5000),
        simulation_interval: Duration::from_millis(3000),
        max_reconnect_attempts: None,
    }
}

pub fn manager(settings: LinkSettings) -> (ConnectionManager, SensorStore, ScriptedTransport) {
    let transport = ScriptedTransport::default();
    let (writer, store) = SensorStore::new(Limits::default());
    let manager = ConnectionManager::new(settings, Arc::new(transport.clone()), writer)
        .with_simulator(SimulationGenerator::seeded(1));
    (manager, store, transport)
}
