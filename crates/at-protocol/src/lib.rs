//! AT Protocol Library
//!
//! Helpers for the small AT command exchange used to identify a modem on a
//! serial port:
//!
//! - **Commands**: `AT` (presence check) and `AT+CGSN` (serial number)
//! - **Stream I/O**: write a terminated command, drain a response within a timeout
//! - **Responses**: classify by final result code, strip echo to get the payload
//!
//! # Example
//!
//! ```rust
//! use at_protocol::{is_response_ok, trim_response, AtCommand};
//!
//! let response = "AT+CGSN\r\r\n356938035643809\r\n\r\nOK\r\n";
//! assert!(is_response_ok(response));
//! assert_eq!(
//!     trim_response(AtCommand::SerialNumber.as_str(), response),
//!     "356938035643809"
//! );
//! ```

pub mod command;
pub mod error;
pub mod io;
pub mod response;

pub use command::{AtCommand, EncodeCommand};
pub use error::AtError;
pub use io::{read_all, write_command};
pub use response::{
    classify_response, expect_ok, is_response_ok, trim_response, ResponseStatus,
};

/// Line terminator appended to every command (S3, carriage return)
pub const LINE_TERMINATOR: &str = "\r";

/// Final result code for success
pub const OK_TOKEN: &str = "OK";

/// Final result code for failure
pub const ERROR_TOKEN: &str = "ERROR";

/// Upper bound on a single drained response
pub const MAX_RESPONSE_LEN: usize = 4096;
