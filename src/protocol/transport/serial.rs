use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::{
    io::{Read, Write},
    time::Duration,
};

use serialport::{ClearBuffer, DataBits, Parity, SerialPort, StopBits};

use super::Transport;

/// Delay after each written byte so simple firmware ISRs keep up.
pub const DEFAULT_POST_WRITE_DELAY: Duration = Duration::from_millis(15);
/// Time given to virtual COM bridges to settle after opening.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(50);
/// Write timeout; reads never wait because they check the input queue first.
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    pub baud: u32,
    pub data_bits: u8,
    pub stop_bits: u8,
    #[serde(with = "parity_name")]
    pub parity: Parity,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            baud: 9600,
            data_bits: 8,
            stop_bits: 1,
            parity: Parity::None,
        }
    }
}

impl SerialConfig {
    pub fn with_baud(baud: u32) -> Self {
        Self {
            baud,
            ..Self::default()
        }
    }

    pub fn apply_builder(&self, b: serialport::SerialPortBuilder) -> serialport::SerialPortBuilder {
        let b = b.data_bits(match self.data_bits {
            5 => DataBits::Five,
            6 => DataBits::Six,
            7 => DataBits::Seven,
            _ => DataBits::Eight,
        });
        let b = b.stop_bits(match self.stop_bits {
            2 => StopBits::Two,
            _ => StopBits::One,
        });
        b.parity(self.parity)
    }
}

mod parity_name {
    use serde::{Deserialize, Deserializer, Serializer};
    use serialport::Parity;

    pub fn serialize<S: Serializer>(parity: &Parity, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(match parity {
            Parity::None => "none",
            Parity::Odd => "odd",
            Parity::Even => "even",
        })
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Parity, D::Error> {
        let name = String::deserialize(d)?;
        match name.to_ascii_lowercase().as_str() {
            "none" => Ok(Parity::None),
            "odd" => Ok(Parity::Odd),
            "even" => Ok(Parity::Even),
            other => Err(serde::de::Error::custom(format!(
                "unknown parity '{other}', expected none, odd or even"
            ))),
        }
    }
}

/// Serial port transport.
///
/// Port name and baud rate are fixed while the port is open; changes made
/// while connected are ignored.
pub struct SerialTransport {
    port_name: String,
    config: SerialConfig,
    handle: Option<Box<dyn SerialPort>>,
    post_write_delay: Duration,
    settle_delay: Duration,
}

impl std::fmt::Debug for SerialTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialTransport")
            .field("port_name", &self.port_name)
            .field("config", &self.config)
            .field("open", &self.handle.is_some())
            .finish_non_exhaustive()
    }
}

impl SerialTransport {
    pub fn new(port_name: impl Into<String>, config: SerialConfig) -> Self {
        Self {
            port_name: port_name.into(),
            config,
            handle: None,
            post_write_delay: DEFAULT_POST_WRITE_DELAY,
            settle_delay: DEFAULT_SETTLE_DELAY,
        }
    }

    pub fn with_post_write_delay(mut self, delay: Duration) -> Self {
        self.post_write_delay = delay;
        self
    }

    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    pub fn post_write_delay(&self) -> Duration {
        self.post_write_delay
    }

    pub fn settle_delay(&self) -> Duration {
        self.settle_delay
    }

    pub fn port_name(&self) -> &str {
        &self.port_name
    }

    pub fn config(&self) -> &SerialConfig {
        &self.config
    }

    pub fn set_port_name(&mut self, port_name: impl Into<String>) {
        if self.handle.is_some() {
            log::warn!("Ignoring port change on open port {}", self.port_name);
            return;
        }
        self.port_name = port_name.into();
    }

    pub fn set_baud_rate(&mut self, baud: u32) {
        if self.handle.is_some() {
            log::warn!("Ignoring baud rate change on open port {}", self.port_name);
            return;
        }
        self.config.baud = baud;
    }
}

/// Open a serial port with exclusive access on Unix systems.
fn open_serial_port(port: &str, config: &SerialConfig) -> Result<Box<dyn SerialPort>> {
    let builder = config.apply_builder(serialport::new(port, config.baud).timeout(DEFAULT_WRITE_TIMEOUT));

    #[cfg(unix)]
    {
        let mut handle = builder
            .open_native()
            .map_err(|err| anyhow!("Failed to open port {port}: {err}"))?;
        handle
            .set_exclusive(true)
            .map_err(|err| anyhow!("Failed to acquire exclusive access to {port}: {err}"))?;
        Ok(Box::new(handle))
    }

    #[cfg(not(unix))]
    {
        builder
            .open()
            .map_err(|err| anyhow!("Failed to open port {port}: {err}"))
    }
}

impl Transport for SerialTransport {
    fn open(&mut self) -> Result<()> {
        if self.handle.is_some() {
            return Ok(());
        }
        let handle = open_serial_port(&self.port_name, &self.config)?;
        std::thread::sleep(self.settle_delay);
        if let Err(err) = handle.clear(ClearBuffer::All) {
            log::debug!("Clearing buffers after open of {} failed: {err}", self.port_name);
        }
        self.handle = Some(handle);
        log::info!("Opened {} at {} baud", self.port_name, self.config.baud);
        Ok(())
    }

    fn close(&mut self) -> bool {
        match self.handle.take() {
            Some(_) => {
                log::info!("Closed {}", self.port_name);
                true
            }
            None => false,
        }
    }

    fn is_open(&self) -> bool {
        self.handle.is_some()
    }

    fn write_byte(&mut self, byte: u8) -> bool {
        let Some(handle) = self.handle.as_mut() else {
            return false;
        };
        if let Err(err) = handle.write_all(&[byte]).and_then(|_| handle.flush()) {
            log::debug!("Write of {byte:#04x} to {} failed: {err}", self.port_name);
            return false;
        }
        if !self.post_write_delay.is_zero() {
            std::thread::sleep(self.post_write_delay);
        }
        true
    }

    fn flush_input(&mut self) {
        if let Some(handle) = self.handle.as_mut() {
            if let Err(err) = handle.clear(ClearBuffer::Input) {
                log::debug!("Input flush on {} failed: {err}", self.port_name);
            }
        }
    }

    fn read_byte_now(&mut self) -> Option<u8> {
        let handle = self.handle.as_mut()?;
        match handle.bytes_to_read() {
            Ok(0) => None,
            Ok(_) => {
                let mut buf = [0u8; 1];
                match handle.read(&mut buf) {
                    Ok(1) => Some(buf[0]),
                    Ok(_) => None,
                    Err(err) => {
                        log::debug!("Read from {} failed: {err}", self.port_name);
                        None
                    }
                }
            }
            Err(err) => {
                log::debug!("Querying input queue of {} failed: {err}", self.port_name);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closed_transport_degrades_quietly() {
        let mut transport = SerialTransport::new("/dev/null-homelink", SerialConfig::default());
        assert!(!transport.is_open());
        assert!(!transport.write_byte(0x01));
        assert_eq!(transport.read_byte_now(), None);
        assert_eq!(transport.read_byte_deadline(Duration::from_millis(5)), None);
        transport.flush_input();
        assert!(!transport.close());
    }

    #[test]
    fn settings_change_while_closed() {
        let mut transport = SerialTransport::new("COM1", SerialConfig::default());
        transport.set_port_name("COM8");
        transport.set_baud_rate(19200);
        assert_eq!(transport.port_name(), "COM8");
        assert_eq!(transport.config().baud, 19200);
    }

    #[test]
    fn parity_round_trips_through_json() {
        let config = SerialConfig {
            parity: Parity::Even,
            ..SerialConfig::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"even\""));
        let parsed: SerialConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, config);
    }
}
