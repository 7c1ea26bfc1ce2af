//! Baud rate sweep for AT device detection
//!
//! A detector is bound to one port. It opens the port at every candidate
//! baud rate in ascending order, runs the identification exchange
//! (`AT`, then `AT+CGSN`), and accumulates the best result seen so far.
//! The sweep never stops early on success: the goal is the *highest*
//! rate the device answers at.
//!
//! Progress is published through a [`watch`] channel, so a caller may
//! peek at a running sweep and wait for it to finish without sharing any
//! mutable state with it.

use std::time::Duration;

use at_protocol::{expect_ok, read_all, trim_response, write_command, AtCommand};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::sync::watch;
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::error::DetectError;
use crate::link::{LinkSettings, SerialLink};

/// Candidate baud rates, tried in this order
pub const BAUD_RATES: [u32; 12] = [
    9600, 14400, 19200, 28800, 33600, 38400, 56000, 57600, 115200, 230400, 460800, 921600,
];

/// Timing and candidate configuration for a sweep
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct DetectorConfig {
    /// Baud rates to try, in order
    pub baud_rates: Vec<u32>,
    /// Maximum time to wait for the port to open
    pub open_timeout_ms: u64,
    /// Receive timeout; a read that sees nothing for this long ends a response
    pub read_timeout_ms: u64,
    /// Delay between sending `AT` and reading the answer
    pub settle_delay_ms: u64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            baud_rates: BAUD_RATES.to_vec(),
            open_timeout_ms: 2000,
            read_timeout_ms: 1000,
            settle_delay_ms: 1000,
        }
    }
}

impl DetectorConfig {
    pub fn open_timeout(&self) -> Duration {
        Duration::from_millis(self.open_timeout_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

/// Final outcome of a sweep
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetectionOutcome {
    /// A device answered at one or more rates
    Detected {
        /// Highest rate identification succeeded at
        max_baud_rate: u32,
        /// Serial number reported at the last successful rate
        serial: String,
    },
    /// No rate produced a complete identification
    NotDetected {
        /// Message from the most recent failed attempt
        last_error: Option<String>,
    },
}

/// Accumulated detection state for one port
///
/// Only the last failure is kept; earlier ones are logged and dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetectionResult {
    max_baud_rate: u32,
    serial: Option<String>,
    finished: bool,
    exception_message: Option<String>,
}

impl DetectionResult {
    /// Whether every candidate has been attempted (or the sweep was cancelled)
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Whether identification succeeded at any rate
    pub fn is_detected(&self) -> bool {
        self.max_baud_rate > 0
    }

    /// Highest successful rate, 0 if none
    pub fn max_baud_rate(&self) -> u32 {
        self.max_baud_rate
    }

    /// Device serial number; `None` unless detected
    pub fn serial(&self) -> Option<&str> {
        if self.is_detected() {
            self.serial.as_deref()
        } else {
            None
        }
    }

    /// Last failure message; `None` once detected
    pub fn exception_message(&self) -> Option<&str> {
        if self.is_detected() {
            None
        } else {
            self.exception_message.as_deref()
        }
    }

    /// Tagged view of the result
    pub fn outcome(&self) -> DetectionOutcome {
        if self.is_detected() {
            DetectionOutcome::Detected {
                max_baud_rate: self.max_baud_rate,
                serial: self.serial.clone().unwrap_or_default(),
            }
        } else {
            DetectionOutcome::NotDetected {
                last_error: self.exception_message.clone(),
            }
        }
    }

    fn record_success(&mut self, baud_rate: u32, serial: String) {
        self.serial = Some(serial);
        self.max_baud_rate = self.max_baud_rate.max(baud_rate);
    }

    fn record_failure(&mut self, err: &DetectError) {
        self.exception_message = Some(err.to_string());
    }
}

/// Detects an AT-command device on one serial port
///
/// Consumed by [`run`](Self::run) or [`spawn`](Self::spawn), so a detector
/// sweeps exactly once.
pub struct AtDeviceDetector<L> {
    port_name: String,
    link: L,
    config: DetectorConfig,
    cancel: CancellationToken,
    state: watch::Sender<DetectionResult>,
}

impl<L: SerialLink> AtDeviceDetector<L> {
    /// Create a detector with the default configuration
    pub fn new(port_name: impl Into<String>, link: L) -> Self {
        let (state, _) = watch::channel(DetectionResult::default());
        Self {
            port_name: port_name.into(),
            link,
            config: DetectorConfig::default(),
            cancel: CancellationToken::new(),
            state,
        }
    }

    /// Use a custom configuration
    pub fn with_config(mut self, config: DetectorConfig) -> Self {
        self.config = config;
        self
    }

    /// Stop the sweep when `token` is cancelled
    ///
    /// One token can be shared by every detector of a discovery run.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Port this detector is bound to
    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    /// Configuration in use
    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Observe progress of the sweep
    pub fn subscribe(&self) -> watch::Receiver<DetectionResult> {
        self.state.subscribe()
    }

    /// Token that cancels this sweep
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Run the sweep on the current task
    pub async fn run(self) -> DetectionResult {
        debug!(
            "Starting detection on {} ({} candidate rates)",
            self.port_name,
            self.config.baud_rates.len()
        );

        for &baud_rate in &self.config.baud_rates {
            if self.cancel.is_cancelled() {
                info!("Detection cancelled on port: {}", self.port_name);
                self.state.send_modify(|s| {
                    if !s.is_detected() {
                        s.record_failure(&DetectError::Cancelled);
                    }
                });
                break;
            }

            trace!("Trying {} at {} baud", self.port_name, baud_rate);
            match self.try_candidate(baud_rate).await {
                Ok(serial) => self.record_serial(baud_rate, serial),
                Err(e) => {
                    info!(
                        "Problem connecting to device on {} at {} baud: {}",
                        self.port_name, baud_rate, e
                    );
                    self.state.send_modify(|s| s.record_failure(&e));
                }
            }
        }

        self.state.send_modify(|s| s.finished = true);
        info!("Detection completed on port: {}", self.port_name);

        let result = self.state.borrow().clone();
        result
    }

    /// Start the sweep as an independent task
    pub fn spawn(self) -> DetectorHandle
    where
        L: 'static,
        L::Port: 'static,
    {
        let handle = DetectorHandle {
            port_name: self.port_name.clone(),
            state: self.state.subscribe(),
            cancel: self.cancel.clone(),
        };
        tokio::spawn(self.run());
        handle
    }

    fn record_serial(&self, baud_rate: u32, serial: String) {
        debug!("Found serial on {} at {} baud: {}", self.port_name, baud_rate, serial);

        let previous = self.state.borrow().serial.clone();
        if let Some(previous) = previous.filter(|p| *p != serial) {
            info!(
                "New serial detected on {}: '{}'. Replacing previous: '{}'",
                self.port_name, serial, previous
            );
        }

        self.state.send_modify(|s| s.record_success(baud_rate, serial));
    }

    /// One identification cycle: open, identify, release
    async fn try_candidate(&self, baud_rate: u32) -> Result<String, DetectError> {
        let settings = LinkSettings::new(baud_rate, self.config.read_timeout());

        let mut port = match timeout(
            self.config.open_timeout(),
            self.link.open(&self.port_name, &settings),
        )
        .await
        {
            Ok(Ok(port)) => port,
            Ok(Err(e)) => {
                return Err(DetectError::OpenFailed {
                    port: self.port_name.clone(),
                    reason: e.to_string(),
                })
            }
            Err(_) => {
                return Err(DetectError::OpenTimeout {
                    port: self.port_name.clone(),
                    baud_rate,
                })
            }
        };

        let result = self.identify(&mut port).await;
        self.release(port).await;
        result
    }

    async fn identify(&self, port: &mut L::Port) -> Result<String, DetectError> {
        let read_timeout = self.config.read_timeout();
        let at_err = |e| DetectError::from_at(&self.port_name, e);

        let stale = read_all(port, read_timeout).await.map_err(at_err)?;
        if !stale.is_empty() {
            trace!("Discarded {} stale bytes", stale.len());
        }

        write_command(port, AtCommand::Attention)
            .await
            .map_err(at_err)?;
        sleep(self.config.settle_delay()).await;
        let response = read_all(port, read_timeout).await.map_err(at_err)?;
        expect_ok(AtCommand::Attention, &response).map_err(at_err)?;

        write_command(port, AtCommand::SerialNumber)
            .await
            .map_err(at_err)?;
        let response = read_all(port, read_timeout).await.map_err(at_err)?;
        expect_ok(AtCommand::SerialNumber, &response).map_err(at_err)?;

        Ok(trim_response(AtCommand::SerialNumber.as_str(), &response))
    }

    /// Release output, then input, then the port; failures are only logged
    async fn release(&self, mut port: L::Port) {
        if let Err(e) = port.shutdown().await {
            warn!("Error closing output stream on {}: {}", self.port_name, e);
        }
        if let Err(e) = self.link.discard_input(&mut port) {
            warn!("Error closing input stream on {}: {}", self.port_name, e);
        }
        if let Err(e) = self.link.close(port).await {
            warn!("Error closing serial port {}: {}", self.port_name, e);
        }
    }
}

/// Caller's view of a spawned detector
#[derive(Debug, Clone)]
pub struct DetectorHandle {
    port_name: String,
    state: watch::Receiver<DetectionResult>,
    cancel: CancellationToken,
}

impl DetectorHandle {
    /// Port the detector is bound to
    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    /// Current state, possibly mid-sweep
    pub fn snapshot(&self) -> DetectionResult {
        self.state.borrow().clone()
    }

    pub fn is_finished(&self) -> bool {
        self.state.borrow().is_finished()
    }

    pub fn is_detected(&self) -> bool {
        self.state.borrow().is_detected()
    }

    pub fn max_baud_rate(&self) -> u32 {
        self.state.borrow().max_baud_rate()
    }

    /// Serial number; `None` unless detected
    pub fn serial(&self) -> Option<String> {
        self.state.borrow().serial().map(str::to_string)
    }

    /// Last failure message; `None` once detected
    pub fn exception_message(&self) -> Option<String> {
        self.state.borrow().exception_message().map(str::to_string)
    }

    /// Final outcome, `None` while still running
    pub fn outcome(&self) -> Option<DetectionOutcome> {
        let state = self.state.borrow();
        state.is_finished().then(|| state.outcome())
    }

    /// Ask the sweep to stop before its next candidate
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Wait for the sweep to finish
    pub async fn wait(&mut self) -> DetectionResult {
        if let Ok(result) = self.state.wait_for(DetectionResult::is_finished).await {
            return result.clone();
        }
        warn!("Detector for {} stopped without finishing", self.port_name);
        self.state.borrow().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = DetectorConfig::default();
        assert_eq!(config.baud_rates, BAUD_RATES);
        assert_eq!(config.open_timeout(), Duration::from_millis(2000));
        assert_eq!(config.read_timeout(), Duration::from_millis(1000));
        assert_eq!(config.settle_delay(), Duration::from_millis(1000));
    }

    #[test]
    fn test_config_partial_json_uses_defaults() {
        let config: DetectorConfig =
            serde_json::from_str(r#"{ "baud_rates": [9600, 115200], "settle_delay_ms": 250 }"#)
                .unwrap();
        assert_eq!(config.baud_rates, [9600, 115200]);
        assert_eq!(config.settle_delay(), Duration::from_millis(250));
        assert_eq!(config.open_timeout_ms, 2000);
    }

    #[test]
    fn test_baud_rates_ascending() {
        assert!(BAUD_RATES.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_result_default_not_detected() {
        let result = DetectionResult::default();
        assert!(!result.is_finished());
        assert!(!result.is_detected());
        assert_eq!(result.max_baud_rate(), 0);
        assert_eq!(result.serial(), None);
        assert_eq!(
            result.outcome(),
            DetectionOutcome::NotDetected { last_error: None }
        );
    }

    #[test]
    fn test_record_success_keeps_max_and_last_serial() {
        let mut result = DetectionResult::default();
        result.record_success(115200, "A".into());
        result.record_success(9600, "B".into());

        assert_eq!(result.max_baud_rate(), 115200);
        assert_eq!(result.serial(), Some("B"));
    }

    #[test]
    fn test_exception_message_hidden_once_detected() {
        let mut result = DetectionResult::default();
        result.record_failure(&DetectError::Cancelled);
        assert_eq!(result.exception_message(), Some("detection cancelled"));

        result.record_success(9600, "IMEI".into());
        assert_eq!(result.exception_message(), None);
        assert_eq!(
            result.outcome(),
            DetectionOutcome::Detected {
                max_baud_rate: 9600,
                serial: "IMEI".into()
            }
        );
    }
}
