//! Stream helpers for AT command exchanges
//!
//! These operate on any tokio byte stream so the same code drives a real
//! serial port and an in-memory duplex pipe.

use std::io::ErrorKind;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::timeout;
use tracing::trace;

use crate::command::{AtCommand, EncodeCommand};
use crate::error::AtError;
use crate::MAX_RESPONSE_LEN;

/// Write a command followed by the line terminator
pub async fn write_command<S>(stream: &mut S, command: AtCommand) -> Result<(), AtError>
where
    S: AsyncWrite + Unpin,
{
    trace!("Sending {}", command);
    stream.write_all(&command.encode()).await?;
    stream.flush().await?;
    Ok(())
}

/// Read everything the device sends until it goes quiet
///
/// Each read is bounded by `read_timeout`; the first read that times out
/// ends the drain. EOF and [`MAX_RESPONSE_LEN`] also end it. The result is
/// decoded lossily and may be empty.
pub async fn read_all<S>(stream: &mut S, read_timeout: Duration) -> Result<String, AtError>
where
    S: AsyncRead + Unpin,
{
    let mut response = Vec::new();
    let mut buf = [0u8; 256];

    while response.len() < MAX_RESPONSE_LEN {
        match timeout(read_timeout, stream.read(&mut buf)).await {
            Ok(Ok(0)) => break,
            Ok(Ok(n)) => response.extend_from_slice(&buf[..n]),
            Ok(Err(e)) if e.kind() == ErrorKind::TimedOut => break,
            Ok(Err(e)) => return Err(AtError::Io(e)),
            Err(_) => break,
        }
    }

    response.truncate(MAX_RESPONSE_LEN);
    let text = String::from_utf8_lossy(&response).into_owned();
    trace!("Read {} bytes: {:?}", response.len(), text);
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHORT: Duration = Duration::from_millis(20);

    #[tokio::test]
    async fn test_write_command_appends_terminator() {
        let (mut client, mut device) = tokio::io::duplex(64);
        write_command(&mut client, AtCommand::SerialNumber)
            .await
            .unwrap();
        drop(client);

        let mut received = Vec::new();
        device.read_to_end(&mut received).await.unwrap();
        assert_eq!(received, b"AT+CGSN\r");
    }

    #[tokio::test]
    async fn test_read_all_collects_split_writes() {
        let (mut client, mut device) = tokio::io::duplex(64);
        device.write_all(b"AT\r\r\n").await.unwrap();
        device.write_all(b"OK\r\n").await.unwrap();

        let response = read_all(&mut client, SHORT).await.unwrap();
        assert_eq!(response, "AT\r\r\nOK\r\n");
    }

    #[tokio::test]
    async fn test_read_all_empty_on_silence() {
        let (mut client, _device) = tokio::io::duplex(64);
        let response = read_all(&mut client, SHORT).await.unwrap();
        assert!(response.is_empty());
    }

    #[tokio::test]
    async fn test_read_all_stops_at_eof() {
        let (mut client, mut device) = tokio::io::duplex(64);
        device.write_all(b"OK\r\n").await.unwrap();
        drop(device);

        let response = read_all(&mut client, Duration::from_secs(30)).await.unwrap();
        assert_eq!(response, "OK\r\n");
    }

    #[tokio::test]
    async fn test_read_all_is_bounded() {
        let (mut client, mut device) = tokio::io::duplex(MAX_RESPONSE_LEN * 2);
        device
            .write_all(&vec![b'x'; MAX_RESPONSE_LEN + 100])
            .await
            .unwrap();

        let response = read_all(&mut client, SHORT).await.unwrap();
        assert_eq!(response.len(), MAX_RESPONSE_LEN);
    }
}
