//! Error types for AT device detection

use at_protocol::AtError;
use thiserror::Error;

/// Errors that can occur during detection
///
/// Only enumeration errors reach callers directly; failures inside a sweep
/// are recorded as the detection result's exception message.
#[derive(Debug, Error)]
pub enum DetectError {
    /// Failed to enumerate serial ports
    #[error("failed to enumerate ports: {0}")]
    EnumerationFailed(String),

    /// Failed to open or configure serial port
    #[error("failed to open port {port}: {reason}")]
    OpenFailed { port: String, reason: String },

    /// Port did not open within the open timeout
    #[error("timed out opening {port} at {baud_rate} baud")]
    OpenTimeout { port: String, baud_rate: u32 },

    /// I/O error during the exchange
    #[error("I/O error on {port}: {reason}")]
    IoError { port: String, reason: String },

    /// Device answered, but not as expected
    #[error("{0}")]
    BadResponse(AtError),

    /// Sweep was cancelled before any device was found
    #[error("detection cancelled")]
    Cancelled,
}

impl DetectError {
    /// Attach the port name to an error from the AT exchange
    pub(crate) fn from_at(port: &str, err: AtError) -> Self {
        match err {
            AtError::Io(e) => DetectError::IoError {
                port: port.to_string(),
                reason: e.to_string(),
            },
            bad @ AtError::BadResponse { .. } => DetectError::BadResponse(bad),
        }
    }
}
