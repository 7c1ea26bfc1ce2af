//! Serial port scanner
//!
//! Lists the ports a discovery run may hand to detectors.

use serde::{Deserialize, Serialize};
use serialport::{available_ports, SerialPortType};
use tracing::info;

use crate::error::DetectError;

/// How a port is attached to the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortKind {
    Usb,
    Pci,
    Bluetooth,
    Unknown,
}

/// Information about a serial port
#[derive(Debug, Clone)]
pub struct SerialPortInfo {
    /// Port name (e.g., /dev/ttyUSB0, COM3)
    pub port: String,
    pub kind: PortKind,
    /// USB Vendor ID (if USB)
    pub vid: Option<u16>,
    /// USB Product ID (if USB)
    pub pid: Option<u16>,
    /// USB manufacturer string
    pub manufacturer: Option<String>,
    /// USB product string
    pub product: Option<String>,
}

impl SerialPortInfo {
    fn from_serialport(name: String, port_type: &SerialPortType) -> Self {
        let mut info = Self {
            port: name,
            kind: PortKind::Unknown,
            vid: None,
            pid: None,
            manufacturer: None,
            product: None,
        };
        match port_type {
            SerialPortType::UsbPort(usb) => {
                info.kind = PortKind::Usb;
                info.vid = Some(usb.vid);
                info.pid = Some(usb.pid);
                info.manufacturer = usb.manufacturer.clone();
                info.product = usb.product.clone();
            }
            SerialPortType::PciPort => info.kind = PortKind::Pci,
            SerialPortType::BluetoothPort => info.kind = PortKind::Bluetooth,
            SerialPortType::Unknown => {}
        }
        info
    }

    /// Label for listings: "ttyUSB0 (Product Name)" or just the port name
    pub fn display_label(&self) -> String {
        match &self.product {
            Some(product) => format!("{} ({})", self.port, product),
            None => self.port.clone(),
        }
    }
}

/// Serial port scanner configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ScannerConfig {
    /// Skip ports whose name contains any of these
    pub skip_patterns: Vec<String>,
    /// Skip Bluetooth serial ports
    pub skip_bluetooth: bool,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            skip_patterns: vec![
                // Bluetooth ports on macOS
                "Bluetooth".to_string(),
                // Debug/logging ports
                "debug".to_string(),
            ],
            skip_bluetooth: true,
        }
    }
}

/// Serial port scanner
#[derive(Debug, Clone, Default)]
pub struct PortScanner {
    config: ScannerConfig,
}

impl PortScanner {
    /// Create a new scanner with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a scanner with custom configuration
    pub fn with_config(config: ScannerConfig) -> Self {
        Self { config }
    }

    /// Enumerate all available serial ports
    pub fn enumerate_ports(&self) -> Result<Vec<SerialPortInfo>, DetectError> {
        info!("Enumerating serial ports...");
        let ports = available_ports().map_err(|e| DetectError::EnumerationFailed(e.to_string()))?;

        let result = self.filter_ports(
            ports
                .into_iter()
                .map(|p| SerialPortInfo::from_serialport(p.port_name, &p.port_type)),
        );

        if result.is_empty() {
            info!("No serial ports found");
        } else {
            info!("Found {} serial port(s)", result.len());
            for port in &result {
                info!("  {}", port.display_label());
            }
        }

        Ok(result)
    }

    /// Drop ports this scanner is configured to skip
    pub fn filter_ports(&self, ports: impl IntoIterator<Item = SerialPortInfo>) -> Vec<SerialPortInfo> {
        ports.into_iter().filter(|p| !self.should_skip_port(p)).collect()
    }

    fn should_skip_port(&self, port: &SerialPortInfo) -> bool {
        if self.config.skip_bluetooth && port.kind == PortKind::Bluetooth {
            return true;
        }
        self.config
            .skip_patterns
            .iter()
            .any(|pattern| port.port.contains(pattern.as_str()))
    }
}
