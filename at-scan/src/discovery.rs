//! Concurrent discovery across ports
//!
//! Starts one detector per port and collects their outcomes once every
//! sweep has finished or been cancelled.

use std::fmt;

use at_detect::{
    AtDeviceDetector, CancellationToken, DetectionOutcome, DetectorConfig, SerialLink,
};
use tracing::info;

/// Outcome of probing one port
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortReport {
    pub port: String,
    pub outcome: DetectionOutcome,
}

impl fmt::Display for PortReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.outcome {
            DetectionOutcome::Detected {
                max_baud_rate,
                serial,
            } => write!(f, "{}: device {} at up to {} baud", self.port, serial, max_baud_rate),
            DetectionOutcome::NotDetected { last_error: Some(e) } => {
                write!(f, "{}: no device ({})", self.port, e)
            }
            DetectionOutcome::NotDetected { last_error: None } => {
                write!(f, "{}: no device", self.port)
            }
        }
    }
}

/// Probe every port in parallel and wait for all of them
pub async fn discover<L>(
    ports: Vec<String>,
    link: L,
    config: &DetectorConfig,
    cancel: &CancellationToken,
) -> Vec<PortReport>
where
    L: SerialLink + Clone + 'static,
    L::Port: 'static,
{
    info!("Probing {} port(s)", ports.len());

    let mut handles: Vec<_> = ports
        .into_iter()
        .map(|port| {
            AtDeviceDetector::new(port, link.clone())
                .with_config(config.clone())
                .with_cancellation(cancel.child_token())
                .spawn()
        })
        .collect();

    let mut reports = Vec::with_capacity(handles.len());
    for handle in &mut handles {
        let result = handle.wait().await;
        reports.push(PortReport {
            port: handle.port_name().to_string(),
            outcome: result.outcome(),
        });
    }
    reports
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::future::Future;
    use std::io;

    use at_detect::LinkSettings;
    use at_sim::{run_virtual_modem_task, VirtualModem};
    use tokio::io::DuplexStream;

    /// Ports named "modem*" have a device; anything else fails to open
    #[derive(Clone)]
    struct NamedLink;

    impl SerialLink for NamedLink {
        type Port = DuplexStream;

        fn open(
            &self,
            port_name: &str,
            settings: &LinkSettings,
        ) -> impl Future<Output = io::Result<DuplexStream>> + Send {
            let port_name = port_name.to_string();
            let baud_rate = settings.baud_rate;
            async move {
                if !port_name.starts_with("modem") {
                    return Err(io::Error::new(io::ErrorKind::NotFound, "no such port"));
                }
                let mut modem = VirtualModem::new(&port_name).with_serial(format!("SN-{port_name}"));
                modem.set_baud_rate(baud_rate);
                let (host, device) = tokio::io::duplex(1024);
                tokio::spawn(run_virtual_modem_task(device, modem));
                Ok(host)
            }
        }
    }

    fn fast_config() -> DetectorConfig {
        DetectorConfig {
            baud_rates: vec![9600, 19200],
            open_timeout_ms: 500,
            read_timeout_ms: 20,
            settle_delay_ms: 0,
        }
    }

    #[tokio::test]
    async fn test_discover_reports_each_port() {
        let ports = vec!["modem0".to_string(), "ttyS0".to_string()];
        let reports = discover(ports, NamedLink, &fast_config(), &CancellationToken::new()).await;

        assert_eq!(reports.len(), 2);
        assert_eq!(
            reports[0].outcome,
            DetectionOutcome::Detected {
                max_baud_rate: 19200,
                serial: "SN-modem0".into()
            }
        );
        assert_eq!(
            reports[1].to_string(),
            "ttyS0: no device (failed to open port ttyS0: no such port)"
        );
    }

    #[tokio::test]
    async fn test_discover_cancelled() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let reports = discover(vec!["modem0".to_string()], NamedLink, &fast_config(), &cancel).await;

        assert_eq!(reports[0].to_string(), "modem0: no device (detection cancelled)");
    }

    #[test]
    fn test_report_display_detected() {
        let report = PortReport {
            port: "/dev/ttyUSB0".into(),
            outcome: DetectionOutcome::Detected {
                max_baud_rate: 115200,
                serial: "356938035643809".into(),
            },
        };
        assert_eq!(
            report.to_string(),
            "/dev/ttyUSB0: device 356938035643809 at up to 115200 baud"
        );
    }
}
