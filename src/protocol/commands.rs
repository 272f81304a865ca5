//! Command codes for both boards.
//!
//! GET codes live in per-board namespaces that reuse the same numbers: code
//! `0b0000_0010` is the desired temperature HIGH half on the air conditioner
//! board and the desired curtain HIGH half on the curtain board. Only the
//! session's board decides what a code means.

use num_enum::{IntoPrimitive, TryFromPrimitive};

/// Tag of a SET fraction frame (`10dddddd`).
pub const SET_FRACTION_TAG: u8 = 0b1000_0000;
/// Tag of a SET integer frame (`11dddddd`).
pub const SET_INTEGER_TAG: u8 = 0b1100_0000;
/// Payload mask shared by both SET frames.
pub const DATA_6BIT_MASK: u8 = 0b0011_1111;

/// Highest GET code used by either board.
pub const MAX_GET_CODE: u8 = 0b0000_1000;

/// GET commands understood by the air conditioner board.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
pub enum AirConditionerGet {
    DesiredTemperatureLow = 0b0000_0001,
    DesiredTemperatureHigh = 0b0000_0010,
    AmbientTemperatureLow = 0b0000_0011,
    AmbientTemperatureHigh = 0b0000_0100,
    FanSpeed = 0b0000_0101,
}

/// GET commands understood by the curtain board.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
pub enum CurtainGet {
    DesiredCurtainLow = 0b0000_0001,
    DesiredCurtainHigh = 0b0000_0010,
    OutdoorTemperatureLow = 0b0000_0011,
    OutdoorTemperatureHigh = 0b0000_0100,
    OutdoorPressureLow = 0b0000_0101,
    OutdoorPressureHigh = 0b0000_0110,
    LightIntensityLow = 0b0000_0111,
    LightIntensityHigh = 0b0000_1000,
}
