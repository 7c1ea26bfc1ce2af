//! AT Modem Simulation Library
//!
//! This crate provides a simulated AT-command device for exercising
//! detection logic without a physical modem attached:
//!
//! - **VirtualModem**: answers `AT`, `AT+CGSN` and `ATE0`/`ATE1` with
//!   protocol-accurate framing, optionally only at certain baud rates
//! - **run_virtual_modem_task**: serves a modem over any async byte stream
//!
//! # Example
//!
//! ```rust
//! use at_sim::VirtualModem;
//!
//! let mut modem = VirtualModem::new("sim0")
//!     .with_serial("356938035643809")
//!     .answering_at([115200]);
//!
//! modem.set_baud_rate(115200);
//! modem.push_bytes(b"AT\r");
//!
//! let output = modem.take_output().unwrap();
//! assert_eq!(output, b"AT\r\r\nOK\r\n");
//! ```

pub mod modem;
pub mod modem_task;

pub use modem::VirtualModem;
pub use modem_task::run_virtual_modem_task;
