//! Error types for AT command exchanges

use thiserror::Error;

/// Errors that can occur while talking AT to a device
#[derive(Debug, Error)]
pub enum AtError {
    /// The device answered, but not with a final `OK`
    #[error("bad response to {command}: {response}")]
    BadResponse {
        /// Command the response belongs to
        command: String,
        /// Raw response text, kept for diagnostics
        response: String,
    },

    /// I/O error on the underlying stream
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
