//! Serial transport abstraction
//!
//! The detector only needs to open a port at a given configuration, talk
//! to it as a byte stream, and release it again. [`SerialLink`] captures
//! that, so tests can swap the real serial port for an in-memory pipe.

use std::future::Future;
use std::io;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio_serial::{
    ClearBuffer, DataBits, FlowControl, Parity, SerialPort, SerialPortBuilderExt, SerialStream,
    StopBits,
};
use tracing::trace;

/// Line configuration for one identification cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkSettings {
    pub baud_rate: u32,
    pub data_bits: DataBits,
    pub stop_bits: StopBits,
    pub parity: Parity,
    pub flow_control: FlowControl,
    /// Receive timeout for individual reads
    pub read_timeout: Duration,
}

impl LinkSettings {
    /// 8N1 with RTS/CTS hardware flow control
    pub fn new(baud_rate: u32, read_timeout: Duration) -> Self {
        Self {
            baud_rate,
            data_bits: DataBits::Eight,
            stop_bits: StopBits::One,
            parity: Parity::None,
            flow_control: FlowControl::Hardware,
            read_timeout,
        }
    }
}

/// Capability to open a named serial port as an async byte stream
pub trait SerialLink: Send + Sync {
    /// Open, configured port
    type Port: AsyncRead + AsyncWrite + Unpin + Send;

    /// Open `port_name` and configure it with `settings`
    fn open(
        &self,
        port_name: &str,
        settings: &LinkSettings,
    ) -> impl Future<Output = io::Result<Self::Port>> + Send;

    /// Release the input side, discarding anything still buffered
    fn discard_input(&self, _port: &mut Self::Port) -> io::Result<()> {
        Ok(())
    }

    /// Close the port
    fn close(&self, port: Self::Port) -> impl Future<Output = io::Result<()>> + Send {
        async move {
            drop(port);
            Ok(())
        }
    }
}

/// Operating system serial ports via tokio-serial
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeLink;

impl SerialLink for NativeLink {
    type Port = SerialStream;

    fn open(
        &self,
        port_name: &str,
        settings: &LinkSettings,
    ) -> impl Future<Output = io::Result<SerialStream>> + Send {
        let builder = tokio_serial::new(port_name, settings.baud_rate)
            .data_bits(settings.data_bits)
            .stop_bits(settings.stop_bits)
            .parity(settings.parity)
            .flow_control(settings.flow_control)
            .timeout(settings.read_timeout);

        async move {
            // Opening can block on some drivers; keep it off the async workers
            // so the caller's open timeout still fires. A timed-out open keeps
            // running on the blocking pool and holds the port until it returns;
            // the stream is dropped (and closed) as soon as it does, since the
            // join handle is gone. The next candidate's open may fail as busy
            // in that window.
            tokio::task::spawn_blocking(move || builder.open_native_async())
                .await
                .map_err(io::Error::other)?
                .map_err(io::Error::from)
        }
    }

    fn discard_input(&self, port: &mut SerialStream) -> io::Result<()> {
        trace!("Clearing input buffer");
        port.clear(ClearBuffer::Input).map_err(io::Error::from)
    }
}
