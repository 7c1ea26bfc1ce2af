//! AT Modem Discovery
//!
//! Probes serial ports for AT-command devices and prints, per port, the
//! device serial number and the highest baud rate it answered at.
//!
//! Ports are taken from the command line; with no arguments every
//! enumerated port is probed. Ctrl-C stops all sweeps after their current
//! baud rate.

mod discovery;
mod settings;

use at_detect::{CancellationToken, NativeLink, PortScanner};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use settings::Settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "at_scan=info,at_detect=info,at_protocol=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let settings = Settings::load();

    let mut ports: Vec<String> = std::env::args().skip(1).collect();
    if ports.is_empty() {
        ports = PortScanner::with_config(settings.scanner.clone())
            .enumerate_ports()?
            .into_iter()
            .map(|p| p.port)
            .collect();
    }
    if ports.is_empty() {
        tracing::info!("Nothing to probe");
        return Ok(());
    }

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupted, finishing current baud rates");
            on_interrupt.cancel();
        }
    });

    let reports = discovery::discover(ports, NativeLink, &settings.detector, &cancel).await;
    for report in &reports {
        println!("{report}");
    }

    Ok(())
}
