//! AT Device Detection Library
//!
//! This crate finds AT-command devices (GSM modems and the like) on serial
//! ports. A detector sweeps one port across a fixed list of baud rates and
//! reports the highest rate the device answered at and its serial number.
//! Many detectors can run side by side, one per port.
//!
//! # Example
//!
//! ```rust,no_run
//! use at_detect::{AtDeviceDetector, NativeLink};
//!
//! # async fn demo() {
//! let mut handle = AtDeviceDetector::new("/dev/ttyUSB0", NativeLink).spawn();
//! let result = handle.wait().await;
//!
//! if let Some(serial) = result.serial() {
//!     println!("Modem {} at {} baud", serial, result.max_baud_rate());
//! }
//! # }
//! ```

pub mod detector;
pub mod error;
pub mod link;
pub mod scanner;

pub use detector::{
    AtDeviceDetector, DetectionOutcome, DetectionResult, DetectorConfig, DetectorHandle,
    BAUD_RATES,
};
pub use error::DetectError;
pub use link::{LinkSettings, NativeLink, SerialLink};
pub use scanner::{PortKind, PortScanner, ScannerConfig, SerialPortInfo};
pub use tokio_util::sync::CancellationToken;
