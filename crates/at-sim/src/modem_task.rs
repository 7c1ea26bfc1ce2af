//! Virtual modem task
//!
//! Serves a [`VirtualModem`] over an async byte stream: host writes are fed
//! into the modem and its replies are written back, until the host side
//! closes the stream.

use std::io;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, warn};

use crate::VirtualModem;

/// Run a virtual modem on `stream` until EOF
///
/// Returns the modem so tests can inspect what it received.
pub async fn run_virtual_modem_task<S>(mut stream: S, mut modem: VirtualModem) -> io::Result<VirtualModem>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut buf = [0u8; 256];

    loop {
        let n = match stream.read(&mut buf).await {
            Ok(0) => {
                debug!("Virtual modem stream closed for {}", modem.id());
                break;
            }
            Ok(n) => n,
            Err(e) => {
                warn!("Virtual modem {} stream error: {}", modem.id(), e);
                return Err(e);
            }
        };

        modem.push_bytes(&buf[..n]);
        while let Some(reply) = modem.take_output() {
            // The host may already have hung up; that ends the session too
            if stream.write_all(&reply).await.is_err() {
                return Ok(modem);
            }
        }
        let _ = stream.flush().await;
    }

    Ok(modem)
}
