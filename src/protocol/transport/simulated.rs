use anyhow::Result;
use std::collections::VecDeque;

use super::Transport;
use crate::core::channel::{BoardKind, BoardProfile, Channel, ChannelCodes, Encoding};
use crate::protocol::{
    codec::{encode_fraction, FrameClass, PRESSURE_FIXED_POINT_MAX_HIGH},
    commands::MAX_GET_CODE,
};

const REGISTER_COUNT: usize = MAX_GET_CODE as usize + 1;

/// Number of primitive calls the transport has served.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IoCounters {
    pub reads: usize,
    pub writes: usize,
    pub flushes: usize,
}

/// In-process emulation of the board firmware.
///
/// One register per GET code answers each GET. A SET integer frame followed by
/// a SET fraction frame updates the two setpoint registers.
#[derive(Debug, Clone)]
pub struct SimulatedBoard {
    profile: &'static BoardProfile,
    open: bool,
    registers: [u8; REGISTER_COUNT],
    overrides: [Option<u8>; REGISTER_COUNT],
    muted: [bool; REGISTER_COUNT],
    pending_integer: Option<u8>,
    rx: VecDeque<u8>,
    hold_responses: bool,
    held: Option<u8>,
    fail_writes: bool,
    frames: Vec<u8>,
    counters: IoCounters,
}

impl SimulatedBoard {
    /// A closed board with every register at zero.
    pub fn new(kind: BoardKind) -> Self {
        Self {
            profile: kind.profile(),
            open: false,
            registers: [0; REGISTER_COUNT],
            overrides: [None; REGISTER_COUNT],
            muted: [false; REGISTER_COUNT],
            pending_integer: None,
            rx: VecDeque::new(),
            hold_responses: false,
            held: None,
            fail_writes: false,
            frames: Vec::new(),
            counters: IoCounters::default(),
        }
    }

    /// A board preloaded with plausible sensor readings.
    pub fn with_sample_readings(kind: BoardKind) -> Self {
        let mut board = Self::new(kind);
        match kind {
            BoardKind::AirConditioner => {
                board.load(Channel::DesiredTemperature, 22.5);
                board.load(Channel::AmbientTemperature, 24.3);
                board.load(Channel::FanSpeed, 3.0);
            }
            BoardKind::Curtain => {
                board.load(Channel::CurtainStatus, 40.0);
                board.load(Channel::OutdoorTemperature, -4.7);
                board.load(Channel::OutdoorPressure, 1013.0);
                board.load(Channel::LightIntensity, 75.5);
            }
        }
        board
    }

    pub fn set_register(&mut self, code: u8, value: u8) {
        if let Some(slot) = self.registers.get_mut(usize::from(code)) {
            *slot = value;
        }
    }

    pub fn register(&self, code: u8) -> Option<u8> {
        self.registers.get(usize::from(code)).copied()
    }

    /// Encode `value` into the registers of `channel` the way firmware would.
    ///
    /// Channels the board does not have are ignored.
    pub fn load(&mut self, channel: Channel, value: f64) {
        let Some(spec) = self.profile.spec(channel) else {
            return;
        };
        match (spec.codes, spec.encoding) {
            (ChannelCodes::Single(code), _) => {
                self.set_register(code, value.clamp(0.0, 255.0) as u8);
            }
            (ChannelCodes::Pair { high, low }, encoding) => {
                let (h, l) = encode_reading(encoding, value);
                self.set_register(high, h);
                self.set_register(low, l);
            }
        }
    }

    /// The value currently held in the setpoint registers.
    pub fn setpoint(&self) -> f64 {
        let setpoint = self.profile.setpoint;
        match self.profile.spec(setpoint.channel).map(|spec| (spec.codes, spec.encoding)) {
            Some((ChannelCodes::Pair { high, low }, encoding)) => encoding.combine(
                self.registers[usize::from(high)],
                self.registers[usize::from(low)],
            ),
            Some((ChannelCodes::Single(code), _)) => f64::from(self.registers[usize::from(code)]),
            None => 0.0,
        }
    }

    /// Stop answering `code`.
    pub fn mute(&mut self, code: u8) {
        if let Some(slot) = self.muted.get_mut(usize::from(code)) {
            *slot = true;
        }
    }

    pub fn unmute(&mut self, code: u8) {
        if let Some(slot) = self.muted.get_mut(usize::from(code)) {
            *slot = false;
        }
    }

    /// Answer `code` with `value` regardless of the register contents.
    pub fn override_response(&mut self, code: u8, value: u8) {
        if let Some(slot) = self.overrides.get_mut(usize::from(code)) {
            *slot = Some(value);
        }
    }

    pub fn clear_overrides(&mut self) {
        self.overrides = [None; REGISTER_COUNT];
    }

    /// Keep answers back until [`SimulatedBoard::release`]. Only the answer to
    /// the most recent GET is kept.
    pub fn hold_responses(&mut self, hold: bool) {
        self.hold_responses = hold;
    }

    /// Deliver the held answer, if any.
    pub fn release(&mut self) {
        if let Some(byte) = self.held.take() {
            self.rx.push_back(byte);
        }
    }

    pub fn fail_writes(&mut self, fail: bool) {
        self.fail_writes = fail;
    }

    /// Put an unsolicited byte on the line.
    pub fn inject_noise(&mut self, byte: u8) {
        self.rx.push_back(byte);
    }

    /// Every frame the board accepted, in arrival order.
    pub fn frames_received(&self) -> &[u8] {
        &self.frames
    }

    pub fn clear_frames(&mut self) {
        self.frames.clear();
    }

    pub fn counters(&self) -> IoCounters {
        self.counters
    }

    fn respond(&mut self, code: u8) {
        let index = usize::from(code);
        if index >= REGISTER_COUNT || self.muted[index] || self.profile.resolve(code).is_none() {
            return;
        }
        let byte = self.overrides[index].unwrap_or(self.registers[index]);
        if self.hold_responses {
            self.held = Some(byte);
        } else {
            self.rx.push_back(byte);
        }
    }

    fn apply_setpoint(&mut self, integer: u8, fraction: u8) {
        let spec = self.profile.spec(self.profile.setpoint.channel);
        if let Some(ChannelCodes::Pair { high, low }) = spec.map(|spec| spec.codes) {
            self.set_register(high, integer);
            self.set_register(low, fraction);
            log::debug!(
                "simulated {}: setpoint now {integer}.{fraction}",
                self.profile.kind
            );
        }
    }
}

fn encode_reading(encoding: Encoding, value: f64) -> (u8, u8) {
    match encoding {
        Encoding::SignedFixedPoint => {
            let whole = value.floor();
            let digit = ((value - whole) * 10.0).round().clamp(0.0, 9.0) as u8;
            ((whole.clamp(-128.0, 127.0) as i8) as u8, digit)
        }
        Encoding::DualPressure
            if value >= 0.0 && value < f64::from(PRESSURE_FIXED_POINT_MAX_HIGH) + 1.0 =>
        {
            (value.trunc() as u8, encode_fraction(value))
        }
        Encoding::DualPressure => {
            let raw = value.clamp(0.0, f64::from(u16::MAX)) as u16;
            ((raw >> 8) as u8, (raw & 0xFF) as u8)
        }
        Encoding::FixedPoint | Encoding::Byte => {
            (value.clamp(0.0, 255.0) as u8, encode_fraction(value))
        }
    }
}

impl Transport for SimulatedBoard {
    fn open(&mut self) -> Result<()> {
        self.open = true;
        self.rx.clear();
        Ok(())
    }

    fn close(&mut self) -> bool {
        std::mem::replace(&mut self.open, false)
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn write_byte(&mut self, byte: u8) -> bool {
        self.counters.writes += 1;
        if !self.open || self.fail_writes {
            return false;
        }
        self.frames.push(byte);
        match FrameClass::classify(byte) {
            FrameClass::Get(code) => self.respond(code),
            FrameClass::SetInteger(payload) => self.pending_integer = Some(payload),
            FrameClass::SetFraction(payload) => {
                if let Some(integer) = self.pending_integer.take() {
                    self.apply_setpoint(integer, payload);
                }
            }
        }
        true
    }

    fn flush_input(&mut self) {
        self.counters.flushes += 1;
        self.rx.clear();
    }

    fn read_byte_now(&mut self) -> Option<u8> {
        self.counters.reads += 1;
        if !self.open {
            return None;
        }
        self.rx.pop_front()
    }
}
