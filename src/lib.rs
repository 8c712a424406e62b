//! ==============================================================================
//! smartbin-host - live sensor pipeline for the smart bin dashboard
//! ==============================================================================
//!
//! data flow:
//!
//! ```text
//!     transport frame / simulation tick
//!               │
//!               v
//!     ┌───────────────────┐  derive (fill.rs)
//!     │ ConnectionManager │  append (history.rs)
//!     │  (single writer)  │──────────────────────> StoreWriter ──> Snapshot
//!     └───────────────────┘                                        │
//!                                                                  v
//!                                          SensorStore readers (api.rs, logs)
//! ```
//!
//! ==============================================================================

pub mod api;
pub mod config;
pub mod device;
pub mod domain;
pub mod error;
pub mod fill;
pub mod history;
pub mod manager;
pub mod simulation;
pub mod snapshot;
pub mod store;
pub mod transport;

pub use domain::{BinStatus, ConnectionStatus, DerivedState, HistoryPoint, SensorReading};
pub use manager::{ConnectionManager, LinkSettings, ManagerHandle};
pub use snapshot::{Limits, Snapshot};
pub use store::{SensorStore, StoreWriter, Subscription};
