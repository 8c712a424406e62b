//! ==============================================================================
//! transport.rs - live data connection to the sensor server
//! ==============================================================================
//!
//! purpose:
//!     a transport runs ONE connection attempt from open to close and reports
//!     what happens through a `TransportSink`. it never retries and never
//!     touches the store; the connection manager decides what happens next.
//!
//! relationships:
//!     - used by: manager.rs (spawns `Transport::run` per attempt)
//!     - implemented here by: WebSocketTransport (tokio-tungstenite)
//!     - implemented in tests by: a scripted transport
//!
//! event order from one attempt:
//!     opened? -> message* -> (closed | error)
//!
//! ==============================================================================

use async_trait::async_trait;
use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message as WsMessage};
use tracing::{debug, info};

use crate::error::TransportError;
use crate::manager::ManagerEvent;

/// where the live data comes from
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Endpoint {
    pub address: String,
    pub port: u16,
    /// `wss://` when set, `ws://` otherwise
    pub secure: bool,
}

impl Endpoint {
    pub fn new(address: impl Into<String>, port: u16, secure: bool) -> Self {
        Self { address: address.into(), port, secure }
    }

    pub fn url(&self) -> String {
        let scheme = if self.secure { "wss" } else { "ws" };
        format!("{}://{}:{}", scheme, self.address, self.port)
    }
}

/// the reporting side of one connection attempt.
///
/// every event is tagged with the attempt's generation so the manager can
/// drop anything a cancelled attempt still manages to send.
#[derive(Clone, Debug)]
pub struct TransportSink {
    generation: u64,
    events: mpsc::UnboundedSender<ManagerEvent>,
}

impl TransportSink {
    pub(crate) fn new(generation: u64, events: mpsc::UnboundedSender<ManagerEvent>) -> Self {
        Self { generation, events }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn opened(&self) {
        self.send(ManagerEvent::Opened { generation: self.generation });
    }

    pub fn message(&self, text: impl Into<String>) {
        self.send(ManagerEvent::Message { generation: self.generation, text: text.into() });
    }

    pub fn closed(&self) {
        self.send(ManagerEvent::Closed { generation: self.generation });
    }

    pub fn error(&self, error: TransportError) {
        self.send(ManagerEvent::Error { generation: self.generation, error });
    }

    fn send(&self, event: ManagerEvent) {
        // the manager is gone once torn down; nothing left to tell
        let _ = self.events.send(event);
    }
}

#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// run one connection attempt to completion.
    ///
    /// the future may be aborted at any await point; aborting must close
    /// the connection.
    async fn run(&self, endpoint: Endpoint, sink: TransportSink);
}

/// json-over-websocket transport
#[derive(Clone, Debug, Default)]
pub struct WebSocketTransport;

#[async_trait]
impl Transport for WebSocketTransport {
    async fn run(&self, endpoint: Endpoint, sink: TransportSink) {
        let url = endpoint.url();
        info!("Connecting to sensor server: {}", url);

        let mut ws = match connect_async(url.as_str()).await {
            Ok((ws, _)) => ws,
            Err(e) => {
                sink.error(TransportError::Connect { url, reason: e.to_string() });
                return;
            }
        };
        sink.opened();

        let mut clean = false;
        while let Some(frame) = ws.next().await {
            match frame {
                Ok(WsMessage::Text(text)) => sink.message(text),
                Ok(WsMessage::Binary(bytes)) => {
                    sink.message(String::from_utf8_lossy(&bytes).into_owned())
                }
                Ok(WsMessage::Close(frame)) => {
                    debug!("Server closed the connection: {:?}", frame);
                    clean = true;
                    break;
                }
                // ping/pong are answered by tungstenite
                Ok(_) => {}
                Err(e) => {
                    sink.error(TransportError::Protocol(e.to_string()));
                    return;
                }
            }
        }
        if clean {
            sink.closed();
        } else {
            sink.error(TransportError::AbruptClose);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_follows_secure_flag() {
        assert_eq!(Endpoint::new("192.168.1.104", 3000, false).url(), "ws://192.168.1.104:3000");
        assert_eq!(Endpoint::new("bins.example", 443, true).url(), "wss://bins.example:443");
    }

    #[test]
    fn sink_tags_events_with_generation() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sink = TransportSink::new(4, tx);
        sink.opened();
        sink.message("{}");
        sink.closed();

        assert!(matches!(rx.try_recv(), Ok(ManagerEvent::Opened { generation: 4 })));
        assert!(matches!(rx.try_recv(), Ok(ManagerEvent::Message { generation: 4, .. })));
        assert!(matches!(rx.try_recv(), Ok(ManagerEvent::Closed { generation: 4 })));
    }

    #[test]
    fn sink_outliving_the_manager_is_harmless() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let sink = TransportSink::new(1, tx);
        sink.error(TransportError::AbruptClose);
    }
}
