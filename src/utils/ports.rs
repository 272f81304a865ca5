use serde::Serialize;
use serialport::{SerialPortInfo, SerialPortType};
use std::collections::HashSet;

/// One serial port as shown by `--list-ports`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PortListing {
    #[serde(rename = "path")]
    pub port_name: String,
    pub port_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vid: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pid: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serial: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product: Option<String>,
}

impl From<SerialPortInfo> for PortListing {
    fn from(info: SerialPortInfo) -> Self {
        let mut listing = Self {
            port_name: info.port_name,
            port_type: "unknown",
            vid: None,
            pid: None,
            serial: None,
            manufacturer: None,
            product: None,
        };
        match info.port_type {
            SerialPortType::UsbPort(usb) => {
                listing.port_type = "usb";
                listing.vid = Some(usb.vid);
                listing.pid = Some(usb.pid);
                listing.serial = usb.serial_number;
                listing.manufacturer = usb.manufacturer;
                listing.product = usb.product;
            }
            SerialPortType::PciPort => listing.port_type = "pci",
            SerialPortType::BluetoothPort => listing.port_type = "bluetooth",
            SerialPortType::Unknown => {}
        }
        listing
    }
}

/// Available serial ports, deduplicated and sorted with USB adapters first.
pub fn enumerate_ports() -> Vec<PortListing> {
    match serialport::available_ports() {
        Ok(ports) => sort_and_dedup(ports.into_iter().map(PortListing::from).collect()),
        Err(err) => {
            log::warn!("Failed to enumerate serial ports: {err}");
            Vec::new()
        }
    }
}

fn sort_and_dedup(ports: Vec<PortListing>) -> Vec<PortListing> {
    let mut seen = HashSet::new();
    let mut unique: Vec<PortListing> = ports
        .into_iter()
        .filter(|port| seen.insert(port.port_name.to_lowercase()))
        .collect();

    fn priority(name: &str) -> i32 {
        let n = name.to_lowercase();
        if n.contains("ttyusb") || n.contains("usb") {
            0
        } else if n.contains("acm") {
            1
        } else if n.contains("ttys") || n.contains("serial") || n.starts_with("com") {
            2
        } else {
            10
        }
    }

    unique.sort_by(|a, b| {
        priority(&a.port_name)
            .cmp(&priority(&b.port_name))
            .then_with(|| a.port_name.cmp(&b.port_name))
    });
    unique
}
