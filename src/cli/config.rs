use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::{path::Path, time::Duration};

use crate::core::{BoardKind, LinkTiming};

fn default_baud_rate() -> u32 {
    9600
}

/// Timing overrides in milliseconds. Missing fields keep their defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub poll_interval_ms: Option<u64>,
    pub response_timeout_ms: Option<u64>,
    pub get_timeout_ms: Option<u64>,
    pub verify_timeout_ms: Option<u64>,
    pub verify_retries: Option<u32>,
    pub verify_tolerance: Option<f64>,
    pub inter_frame_delay_ms: Option<u64>,
    /// Serial only: pause after every written byte.
    pub post_write_delay_ms: Option<u64>,
    /// Serial only: wait after opening before the buffers are cleared.
    pub settle_delay_ms: Option<u64>,
}

impl TimingConfig {
    /// Apply the overrides on top of `base`.
    pub fn apply(&self, base: LinkTiming) -> LinkTiming {
        let ms = |value: Option<u64>, fallback: Duration| {
            value.map(Duration::from_millis).unwrap_or(fallback)
        };
        LinkTiming {
            poll_interval: ms(self.poll_interval_ms, base.poll_interval),
            response_timeout: ms(self.response_timeout_ms, base.response_timeout),
            get_timeout: ms(self.get_timeout_ms, base.get_timeout),
            verify_timeout: ms(self.verify_timeout_ms, base.verify_timeout),
            verify_retries: self.verify_retries.unwrap_or(base.verify_retries),
            verify_tolerance: self.verify_tolerance.unwrap_or(base.verify_tolerance),
            inter_frame_delay: ms(self.inter_frame_delay_ms, base.inter_frame_delay),
        }
    }

    pub fn post_write_delay(&self) -> Option<Duration> {
        self.post_write_delay_ms.map(Duration::from_millis)
    }

    pub fn settle_delay(&self) -> Option<Duration> {
        self.settle_delay_ms.map(Duration::from_millis)
    }
}

/// Root configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkBootConfig {
    /// Port name
    pub port_name: String,
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    pub board: BoardKind,
    #[serde(default)]
    pub timing: TimingConfig,
}

impl LinkBootConfig {
    pub fn link_timing(&self) -> LinkTiming {
        self.timing.apply(LinkTiming::default())
    }

    /// Parse configuration from a JSON string
    pub fn from_json(json_str: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json_str)
    }

    /// Parse configuration from a TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(toml_str)
    }

    /// Read configuration from a file; `.toml` files are parsed as TOML,
    /// everything else as JSON.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let is_toml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
        if is_toml {
            Self::from_toml(&content)
                .map_err(|err| anyhow!("Invalid TOML config {}: {err}", path.display()))
        } else {
            Self::from_json(&content)
                .map_err(|err| anyhow!("Invalid JSON config {}: {err}", path.display()))
        }
    }

    /// Convert to a JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_config() {
        let config = LinkBootConfig::from_json(
            r#"{
                "port_name": "/dev/ttyUSB0",
                "board": "curtain",
                "timing": { "verify_retries": 5, "get_timeout_ms": 120 }
            }"#,
        )
        .unwrap();
        assert_eq!(config.port_name, "/dev/ttyUSB0");
        assert_eq!(config.baud_rate, 9600);
        assert_eq!(config.board, BoardKind::Curtain);

        let timing = config.link_timing();
        assert_eq!(timing.verify_retries, 5);
        assert_eq!(timing.get_timeout, Duration::from_millis(120));
        assert_eq!(timing.poll_interval, Duration::from_millis(40));
        assert_eq!(timing.verify_tolerance, 0.11);

        let reparsed = LinkBootConfig::from_json(&config.to_json().unwrap()).unwrap();
        assert_eq!(reparsed, config);
    }

    #[test]
    fn test_toml_config() {
        let config = LinkBootConfig::from_toml(
            r#"
                port_name = "COM4"
                baud_rate = 19200
                board = "air_conditioner"

                [timing]
                poll_interval_ms = 25
                post_write_delay_ms = 0
            "#,
        )
        .unwrap();
        assert_eq!(config.baud_rate, 19200);
        assert_eq!(config.board, BoardKind::AirConditioner);
        assert_eq!(config.link_timing().poll_interval, Duration::from_millis(25));
        assert_eq!(config.timing.post_write_delay(), Some(Duration::ZERO));
        assert_eq!(config.timing.settle_delay(), None);
    }

    #[test]
    fn test_unknown_board_is_rejected() {
        assert!(LinkBootConfig::from_json(r#"{"port_name": "x", "board": "garage"}"#).is_err());
    }

    #[test]
    fn test_from_file_picks_format_by_extension() {
        let dir = std::env::temp_dir();
        let path = dir.join(format!("homelink_config_{}.toml", std::process::id()));
        std::fs::write(&path, "port_name = \"/dev/ttyS1\"\nboard = \"curtain\"\n").unwrap();
        let config = LinkBootConfig::from_file(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(config.port_name, "/dev/ttyS1");
        assert!(LinkBootConfig::from_file(dir.join("homelink_missing.json")).is_err());
    }
}
