//! Virtual modem for testing
//!
//! Parses carriage-return terminated command lines and queues the bytes a
//! real modem would answer with. Used by the detector tests as the device
//! on the far side of a simulated serial link.

use std::collections::VecDeque;

use at_protocol::{AtCommand, ERROR_TOKEN, OK_TOKEN};
use tracing::debug;

/// Line noise emitted in garbled mode (what a modem at the wrong rate looks like)
const NOISE: &[u8] = b"\xf8\x80~\x1c\xe0x\x00\xfe\r\n";

/// Longest command line accepted before the input buffer is discarded
const MAX_LINE_LEN: usize = 256;

/// Virtual AT-command modem
pub struct VirtualModem {
    /// Identifier for logging
    id: String,
    serial: Option<String>,
    echo: bool,
    garbled: bool,
    /// Rates the modem answers at (`None` = every rate)
    answering_rates: Option<Vec<u32>>,
    baud_rate: u32,
    input: Vec<u8>,
    output: VecDeque<Vec<u8>>,
    /// Commands received (for test verification)
    received_commands: Vec<String>,
}

impl VirtualModem {
    /// Create a modem with echo on, no serial number, answering at every rate
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            serial: None,
            echo: true,
            garbled: false,
            answering_rates: None,
            baud_rate: 0,
            input: Vec::with_capacity(64),
            output: VecDeque::new(),
            received_commands: Vec::new(),
        }
    }

    /// Serial number reported by `AT+CGSN` (without one, `AT+CGSN` fails)
    pub fn with_serial(mut self, serial: impl Into<String>) -> Self {
        self.serial = Some(serial.into());
        self
    }

    /// Enable or disable command echo
    pub fn with_echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    /// Answer every command with line noise
    pub fn garbled(mut self, garbled: bool) -> Self {
        self.garbled = garbled;
        self
    }

    /// Only answer when the line runs at one of these rates
    pub fn answering_at(mut self, rates: impl IntoIterator<Item = u32>) -> Self {
        self.answering_rates = Some(rates.into_iter().collect());
        self
    }

    /// Get the identifier
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Get the configured serial number
    pub fn serial(&self) -> Option<&str> {
        self.serial.as_deref()
    }

    /// Whether echo is currently enabled
    pub fn echo(&self) -> bool {
        self.echo
    }

    /// Set the rate the line is currently running at
    pub fn set_baud_rate(&mut self, baud_rate: u32) {
        self.baud_rate = baud_rate;
    }

    /// Whether the modem answers at the current rate
    pub fn is_answering(&self) -> bool {
        self.answering_rates
            .as_ref()
            .map_or(true, |rates| rates.contains(&self.baud_rate))
    }

    /// Command lines received so far
    pub fn received_commands(&self) -> &[String] {
        &self.received_commands
    }

    /// Feed bytes written by the host
    pub fn push_bytes(&mut self, data: &[u8]) {
        for &byte in data {
            match byte {
                b'\r' => {
                    let line = String::from_utf8_lossy(&self.input).trim().to_string();
                    self.input.clear();
                    if !line.is_empty() {
                        self.process_line(line);
                    }
                }
                b'\n' => {}
                _ => {
                    self.input.push(byte);
                    if self.input.len() > MAX_LINE_LEN {
                        self.input.clear();
                    }
                }
            }
        }
    }

    /// Take the next pending chunk of output
    pub fn take_output(&mut self) -> Option<Vec<u8>> {
        self.output.pop_front()
    }

    fn process_line(&mut self, line: String) {
        debug!("Virtual modem {} received {:?} at {} baud", self.id, line, self.baud_rate);
        self.received_commands.push(line.clone());

        if !self.is_answering() {
            return;
        }
        if self.garbled {
            self.output.push_back(NOISE.to_vec());
            return;
        }

        let mut reply = Vec::new();
        if self.echo {
            reply.extend_from_slice(line.as_bytes());
            reply.push(b'\r');
        }

        let command = line.to_ascii_uppercase();
        let result = if command == AtCommand::Attention.as_str() {
            Ok(None)
        } else if command == AtCommand::SerialNumber.as_str() {
            self.serial.clone().map(Some).ok_or(())
        } else if command == "ATE0" {
            self.echo = false;
            Ok(None)
        } else if command == "ATE1" {
            self.echo = true;
            Ok(None)
        } else {
            Err(())
        };

        match result {
            Ok(payload) => {
                if let Some(payload) = payload {
                    reply.extend_from_slice(format!("\r\n{payload}\r\n").as_bytes());
                }
                reply.extend_from_slice(format!("\r\n{OK_TOKEN}\r\n").as_bytes());
            }
            Err(()) => reply.extend_from_slice(format!("\r\n{ERROR_TOKEN}\r\n").as_bytes()),
        }
        self.output.push_back(reply);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use at_protocol::{is_response_ok, trim_response};

    fn exchange(modem: &mut VirtualModem, command: &[u8]) -> String {
        modem.push_bytes(command);
        let mut out = Vec::new();
        while let Some(chunk) = modem.take_output() {
            out.extend(chunk);
        }
        String::from_utf8_lossy(&out).into_owned()
    }

    #[test]
    fn test_attention() {
        let mut modem = VirtualModem::new("m");
        let response = exchange(&mut modem, b"AT\r");
        assert_eq!(response, "AT\r\r\nOK\r\n");
        assert!(is_response_ok(&response));
    }

    #[test]
    fn test_serial_number() {
        let mut modem = VirtualModem::new("m").with_serial("IMEI123");
        assert_eq!(modem.serial(), Some("IMEI123"));
        let response = exchange(&mut modem, b"AT+CGSN\r");
        assert!(is_response_ok(&response));
        assert_eq!(trim_response("AT+CGSN", &response), "IMEI123");
    }

    #[test]
    fn test_serial_number_unsupported() {
        let mut modem = VirtualModem::new("m");
        assert_eq!(modem.serial(), None);
        let response = exchange(&mut modem, b"AT+CGSN\r");
        assert!(!is_response_ok(&response));
        assert!(response.contains("ERROR"));
    }

    #[test]
    fn test_echo_off() {
        let mut modem = VirtualModem::new("m");
        exchange(&mut modem, b"ATE0\r");
        assert!(!modem.echo());
        assert_eq!(exchange(&mut modem, b"AT\r"), "\r\nOK\r\n");
    }

    #[test]
    fn test_silent_at_other_rates() {
        let mut modem = VirtualModem::new("m").answering_at([115200]);
        modem.set_baud_rate(9600);
        assert!(exchange(&mut modem, b"AT\r").is_empty());
        assert_eq!(modem.received_commands(), ["AT"]);

        modem.set_baud_rate(115200);
        assert!(is_response_ok(&exchange(&mut modem, b"AT\r")));
    }

    #[test]
    fn test_garbled() {
        let mut modem = VirtualModem::new("m").garbled(true);
        let response = exchange(&mut modem, b"AT\r");
        assert!(!response.is_empty());
        assert!(!is_response_ok(&response));
    }

    #[test]
    fn test_command_split_across_writes() {
        let mut modem = VirtualModem::new("m").with_echo(false);
        modem.push_bytes(b"A");
        assert!(modem.take_output().is_none());
        assert_eq!(exchange(&mut modem, b"T\r"), "\r\nOK\r\n");
    }

    #[test]
    fn test_unknown_command() {
        let mut modem = VirtualModem::new("m").with_echo(false);
        assert_eq!(exchange(&mut modem, b"AT+FOO\r"), "\r\nERROR\r\n");
    }
}
