//! AT commands used for device identification
//!
//! Only the two commands needed to confirm presence and read back the
//! device serial number are modelled here:
//!
//! - `AT` - attention, a bare presence check
//! - `AT+CGSN` - request product serial number (the IMEI on GSM modems)

use crate::LINE_TERMINATOR;

/// Trait for commands that can be encoded to bytes
pub trait EncodeCommand {
    /// Encode this command to its wire format
    fn encode(&self) -> Vec<u8>;
}

/// Identification command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AtCommand {
    /// Presence check: AT
    Attention,
    /// Serial number query: AT+CGSN
    SerialNumber,
}

impl AtCommand {
    /// Command text as sent on the wire, without terminator
    pub fn as_str(&self) -> &'static str {
        match self {
            AtCommand::Attention => "AT",
            AtCommand::SerialNumber => "AT+CGSN",
        }
    }

    /// Human-readable description used in diagnostics
    pub fn description(&self) -> &'static str {
        match self {
            AtCommand::Attention => "AT",
            AtCommand::SerialNumber => "serial number request",
        }
    }
}

impl EncodeCommand for AtCommand {
    fn encode(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.as_str().len() + LINE_TERMINATOR.len());
        bytes.extend_from_slice(self.as_str().as_bytes());
        bytes.extend_from_slice(LINE_TERMINATOR.as_bytes());
        bytes
    }
}

impl std::fmt::Display for AtCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
