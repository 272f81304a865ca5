use serde::{Deserialize, Serialize};
use std::fmt;
use strum::{Display, EnumIter, EnumString};

use crate::protocol::{
    codec::{combine_int_frac, combine_pressure, signed_high},
    commands::{AirConditionerGet as Ac, CurtainGet as Cur},
};

/// A physical quantity tracked over the link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    DesiredTemperature,
    AmbientTemperature,
    FanSpeed,
    CurtainStatus,
    OutdoorTemperature,
    OutdoorPressure,
    LightIntensity,
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::DesiredTemperature => write!(f, "desired_temperature"),
            Channel::AmbientTemperature => write!(f, "ambient_temperature"),
            Channel::FanSpeed => write!(f, "fan_speed"),
            Channel::CurtainStatus => write!(f, "curtain_status"),
            Channel::OutdoorTemperature => write!(f, "outdoor_temperature"),
            Channel::OutdoorPressure => write!(f, "outdoor_pressure"),
            Channel::LightIntensity => write!(f, "light_intensity"),
        }
    }
}

/// How a channel's raw bytes become a physical value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// `high + fraction(low)` with an unsigned high byte.
    FixedPoint,
    /// `high + fraction(low)` with a two's complement high byte.
    SignedFixedPoint,
    /// Fixed-point or raw 16-bit, decided by the pressure heuristic.
    DualPressure,
    /// One byte, taken as-is.
    Byte,
}

impl Encoding {
    /// Combine two halves according to this encoding.
    ///
    /// For [`Encoding::Byte`] only `high` is meaningful.
    pub fn combine(self, high: u8, low: u8) -> f64 {
        match self {
            Encoding::FixedPoint => combine_int_frac(i16::from(high), low),
            Encoding::SignedFixedPoint => combine_int_frac(signed_high(high), low),
            Encoding::DualPressure => combine_pressure(high, low),
            Encoding::Byte => f64::from(high),
        }
    }
}

/// GET codes that read a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelCodes {
    Pair { high: u8, low: u8 },
    Single(u8),
}

/// Order in which the blocking getter requests the two halves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOrder {
    HighFirst,
    /// Kept for the temperature channels to match deployed firmware.
    LowFirst,
}

/// Which byte of a channel a GET code answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Half {
    High,
    Low,
    Single,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelSpec {
    pub channel: Channel,
    pub encoding: Encoding,
    pub codes: ChannelCodes,
    pub read_order: ReadOrder,
}

impl ChannelSpec {
    const fn pair(channel: Channel, encoding: Encoding, high: u8, low: u8, read_order: ReadOrder) -> Self {
        Self {
            channel,
            encoding,
            codes: ChannelCodes::Pair { high, low },
            read_order,
        }
    }

    const fn single(channel: Channel, code: u8) -> Self {
        Self {
            channel,
            encoding: Encoding::Byte,
            codes: ChannelCodes::Single(code),
            read_order: ReadOrder::HighFirst,
        }
    }

    /// Which half `command` reads for this channel, if any.
    pub fn half_for(&self, command: u8) -> Option<Half> {
        match self.codes {
            ChannelCodes::Pair { high, .. } if high == command => Some(Half::High),
            ChannelCodes::Pair { low, .. } if low == command => Some(Half::Low),
            ChannelCodes::Single(code) if code == command => Some(Half::Single),
            _ => None,
        }
    }
}

/// How a board's setpoint is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteDiscipline {
    /// Write both frames and trust the device.
    Optimistic,
    /// Write both frames, read the channel back, retry on mismatch.
    Verified,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Setpoint {
    pub channel: Channel,
    pub discipline: WriteDiscipline,
    pub min: f64,
    pub max: f64,
}

impl Setpoint {
    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum BoardKind {
    #[serde(alias = "ac")]
    #[strum(to_string = "air_conditioner", serialize = "ac", serialize = "air-conditioner")]
    AirConditioner,
    #[strum(to_string = "curtain", serialize = "curtain_control")]
    Curtain,
}

impl BoardKind {
    pub fn profile(self) -> &'static BoardProfile {
        match self {
            BoardKind::AirConditioner => &AIR_CONDITIONER,
            BoardKind::Curtain => &CURTAIN,
        }
    }
}

/// Everything that distinguishes one board from another.
#[derive(Debug, PartialEq)]
pub struct BoardProfile {
    pub kind: BoardKind,
    pub channels: &'static [ChannelSpec],
    /// GET commands sent by one poll round, in order.
    pub poll_sequence: &'static [u8],
    pub setpoint: Setpoint,
}

impl BoardProfile {
    pub fn spec(&self, channel: Channel) -> Option<&ChannelSpec> {
        self.channels.iter().find(|spec| spec.channel == channel)
    }

    /// Slot index of `channel` in this board's table.
    pub fn index_of(&self, channel: Channel) -> Option<usize> {
        self.channels.iter().position(|spec| spec.channel == channel)
    }

    /// Resolve a GET code to the slot and half it answers.
    pub fn resolve(&self, command: u8) -> Option<(usize, Half)> {
        self.channels
            .iter()
            .enumerate()
            .find_map(|(index, spec)| spec.half_for(command).map(|half| (index, half)))
    }

    pub fn has_channel(&self, channel: Channel) -> bool {
        self.index_of(channel).is_some()
    }
}

pub static AIR_CONDITIONER: BoardProfile = BoardProfile {
    kind: BoardKind::AirConditioner,
    channels: &[
        ChannelSpec::pair(
            Channel::DesiredTemperature,
            Encoding::FixedPoint,
            Ac::DesiredTemperatureHigh as u8,
            Ac::DesiredTemperatureLow as u8,
            ReadOrder::HighFirst,
        ),
        ChannelSpec::pair(
            Channel::AmbientTemperature,
            Encoding::FixedPoint,
            Ac::AmbientTemperatureHigh as u8,
            Ac::AmbientTemperatureLow as u8,
            ReadOrder::LowFirst,
        ),
        ChannelSpec::single(Channel::FanSpeed, Ac::FanSpeed as u8),
    ],
    poll_sequence: &[
        Ac::DesiredTemperatureHigh as u8,
        Ac::DesiredTemperatureLow as u8,
        Ac::AmbientTemperatureHigh as u8,
        Ac::AmbientTemperatureLow as u8,
        Ac::FanSpeed as u8,
    ],
    // 6-bit integer plus one fraction digit.
    setpoint: Setpoint {
        channel: Channel::DesiredTemperature,
        discipline: WriteDiscipline::Optimistic,
        min: 0.0,
        max: 63.9,
    },
};

pub static CURTAIN: BoardProfile = BoardProfile {
    kind: BoardKind::Curtain,
    channels: &[
        ChannelSpec::pair(
            Channel::CurtainStatus,
            Encoding::FixedPoint,
            Cur::DesiredCurtainHigh as u8,
            Cur::DesiredCurtainLow as u8,
            ReadOrder::HighFirst,
        ),
        ChannelSpec::pair(
            Channel::OutdoorTemperature,
            Encoding::SignedFixedPoint,
            Cur::OutdoorTemperatureHigh as u8,
            Cur::OutdoorTemperatureLow as u8,
            ReadOrder::LowFirst,
        ),
        ChannelSpec::pair(
            Channel::OutdoorPressure,
            Encoding::DualPressure,
            Cur::OutdoorPressureHigh as u8,
            Cur::OutdoorPressureLow as u8,
            ReadOrder::HighFirst,
        ),
        ChannelSpec::pair(
            Channel::LightIntensity,
            Encoding::FixedPoint,
            Cur::LightIntensityHigh as u8,
            Cur::LightIntensityLow as u8,
            ReadOrder::HighFirst,
        ),
    ],
    poll_sequence: &[
        Cur::DesiredCurtainHigh as u8,
        Cur::DesiredCurtainLow as u8,
        Cur::OutdoorTemperatureHigh as u8,
        Cur::OutdoorTemperatureLow as u8,
        Cur::OutdoorPressureHigh as u8,
        Cur::OutdoorPressureLow as u8,
        Cur::LightIntensityHigh as u8,
        Cur::LightIntensityLow as u8,
    ],
    setpoint: Setpoint {
        channel: Channel::CurtainStatus,
        discipline: WriteDiscipline::Verified,
        min: 0.0,
        max: 100.0,
    },
};

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn every_polled_code_resolves() {
        for kind in BoardKind::iter() {
            let profile = kind.profile();
            for &code in profile.poll_sequence {
                assert!(profile.resolve(code).is_some(), "{kind}: code {code}");
            }
            assert!(profile.has_channel(profile.setpoint.channel));
        }
    }

    #[test]
    fn same_code_means_different_channels() {
        let (ac_slot, ac_half) = AIR_CONDITIONER.resolve(0b0000_0101).unwrap();
        assert_eq!(AIR_CONDITIONER.channels[ac_slot].channel, Channel::FanSpeed);
        assert_eq!(ac_half, Half::Single);

        let (cur_slot, cur_half) = CURTAIN.resolve(0b0000_0101).unwrap();
        assert_eq!(CURTAIN.channels[cur_slot].channel, Channel::OutdoorPressure);
        assert_eq!(cur_half, Half::Low);

        assert!(AIR_CONDITIONER.resolve(0b0000_0111).is_none());
    }

    #[test]
    fn temperature_halves_read_low_first() {
        assert_eq!(
            AIR_CONDITIONER.spec(Channel::AmbientTemperature).unwrap().read_order,
            ReadOrder::LowFirst
        );
        assert_eq!(
            CURTAIN.spec(Channel::OutdoorTemperature).unwrap().read_order,
            ReadOrder::LowFirst
        );
        assert_eq!(
            CURTAIN.spec(Channel::CurtainStatus).unwrap().read_order,
            ReadOrder::HighFirst
        );
    }

    #[test]
    fn board_names_parse() {
        assert_eq!("ac".parse(), Ok(BoardKind::AirConditioner));
        assert_eq!("Air-Conditioner".parse(), Ok(BoardKind::AirConditioner));
        assert_eq!("curtain".parse(), Ok(BoardKind::Curtain));
        assert_eq!(
            "garage".parse::<BoardKind>(),
            Err(strum::ParseError::VariantNotFound)
        );
        assert_eq!(BoardKind::AirConditioner.to_string(), "air_conditioner");
        assert_eq!(BoardKind::Curtain.to_string(), "curtain");
        assert_eq!(
            serde_json::from_str::<BoardKind>("\"ac\"").unwrap(),
            BoardKind::AirConditioner
        );
    }

    #[test]
    fn encodings_combine() {
        assert!((Encoding::SignedFixedPoint.combine(251, 3) - -4.7).abs() < 1e-9);
        assert!((Encoding::FixedPoint.combine(251, 3) - 251.3).abs() < 1e-9);
        assert_eq!(Encoding::Byte.combine(7, 200), 7.0);
        assert_eq!(Encoding::DualPressure.combine(3, 245), 1013.0);
    }
}
