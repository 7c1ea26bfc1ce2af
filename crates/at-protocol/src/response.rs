//! Response classification and payload extraction
//!
//! A modem answers a command with, in order: an optional echo of the
//! command line, zero or more information lines, and a final result code
//! (`OK`, `ERROR`, `+CME ERROR: <n>` or `+CMS ERROR: <n>`). Lines are
//! separated by any mix of CR and LF.

use crate::error::AtError;
use crate::{AtCommand, ERROR_TOKEN, OK_TOKEN};

/// Classification of a complete response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseStatus {
    /// Final result code was `OK`
    Ok,
    /// Final result code was an error
    Error,
    /// No final result code (empty, truncated or garbled)
    Unknown,
}

/// Iterate over non-empty lines, trimmed of whitespace and control characters
fn lines(response: &str) -> impl Iterator<Item = &str> {
    response
        .split(['\r', '\n'])
        .map(|line| line.trim_matches(|c: char| c.is_whitespace() || c.is_control()))
        .filter(|line| !line.is_empty())
}

fn is_ok_line(line: &str) -> bool {
    line == OK_TOKEN
}

fn is_error_line(line: &str) -> bool {
    line == ERROR_TOKEN || line.starts_with("+CME ERROR") || line.starts_with("+CMS ERROR")
}

/// Classify a raw response by its final result code
///
/// Any error line makes the response an error, even if an `OK` was also
/// seen; a response is only `Ok` when it has an `OK` line and nothing
/// that looks like an error.
pub fn classify_response(response: &str) -> ResponseStatus {
    let mut status = ResponseStatus::Unknown;
    for line in lines(response) {
        if is_error_line(line) {
            return ResponseStatus::Error;
        }
        if is_ok_line(line) {
            status = ResponseStatus::Ok;
        }
    }
    status
}

/// Whether the response ends in success
pub fn is_response_ok(response: &str) -> bool {
    classify_response(response) == ResponseStatus::Ok
}

/// Fail with [`AtError::BadResponse`] unless the response is OK
pub fn expect_ok(command: AtCommand, response: &str) -> Result<(), AtError> {
    if is_response_ok(response) {
        Ok(())
    } else {
        Err(AtError::BadResponse {
            command: command.description().to_string(),
            response: response.to_string(),
        })
    }
}

/// Extract the payload between the command echo and the final result code
///
/// Echo is optional (devices configured with `ATE0` don't send it).
/// Multiple information lines are joined with `\n`.
pub fn trim_response(command: &str, response: &str) -> String {
    lines(response)
        .filter(|line| *line != command && !is_ok_line(line) && !is_error_line(line))
        .collect::<Vec<_>>()
        .join("\n")
}
