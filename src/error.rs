//! ==============================================================================
//! error.rs - typed failures of the ingestion pipeline
//! ==============================================================================
//!
//! none of these are fatal to the process. transport errors drive the
//! connection manager toward `disconnected`, payload errors are logged and
//! dropped, device errors are reported back to the caller of the api.
//!
//! ==============================================================================

use thiserror::Error;

/// failure of the live transport
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("connection to {url} failed: {reason}")]
    Connect { url: String, reason: String },

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("connection closed abruptly")]
    AbruptClose,
}

/// an inbound frame that could not be turned into a reading
#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("malformed payload: {0}")]
    MalformedPayload(#[from] serde_json::Error),

    #[error("payload is not a json object")]
    NotAnObject,
}

/// failure while pushing device configuration
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("device id must not be empty")]
    MissingDeviceId,

    #[error("reporting interval must be 1-60 minutes, got {0}")]
    ReportingInterval(u32),

    #[error("alert threshold must be 0-100%, got {0}")]
    AlertThreshold(u8),

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
}
