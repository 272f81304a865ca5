use serde::Serialize;

use super::channel::{BoardProfile, Channel, Encoding, Half};

/// Raw bytes read for one channel by a blocking getter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawReading {
    Pair { high: u8, low: u8 },
    Single(u8),
}

/// One channel's cached state. Single-byte channels keep their byte in `high`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ChannelSlot {
    pub high: Option<u8>,
    pub low: Option<u8>,
    pub value: f64,
}

impl ChannelSlot {
    fn recompute(&mut self, encoding: Encoding) -> bool {
        match (encoding, self.high, self.low) {
            (Encoding::Byte, Some(byte), _) => {
                self.value = f64::from(byte);
                true
            }
            (_, Some(high), Some(low)) => {
                self.value = encoding.combine(high, low);
                true
            }
            _ => false,
        }
    }
}

/// Latest raw halves and combined values for one board. Values survive
/// disconnects.
#[derive(Debug, Clone)]
pub struct ChannelCache {
    profile: &'static BoardProfile,
    slots: Vec<ChannelSlot>,
}

impl ChannelCache {
    pub fn new(profile: &'static BoardProfile) -> Self {
        Self {
            profile,
            slots: vec![ChannelSlot::default(); profile.channels.len()],
        }
    }

    pub fn profile(&self) -> &'static BoardProfile {
        self.profile
    }

    /// Store the answer to GET `command`.
    ///
    /// Returns the channel whose combined value was recomputed, if both halves
    /// are now present. Bytes for codes this board does not know are dropped.
    pub fn handle_response(&mut self, command: u8, byte: u8) -> Option<Channel> {
        let Some((index, half)) = self.profile.resolve(command) else {
            log::debug!(
                "{}: dropping byte {byte:#04x} for unknown command {command:#04x}",
                self.profile.kind
            );
            return None;
        };
        let spec = &self.profile.channels[index];
        let slot = &mut self.slots[index];
        match half {
            Half::High | Half::Single => slot.high = Some(byte),
            Half::Low => slot.low = Some(byte),
        }
        slot.recompute(spec.encoding).then_some(spec.channel)
    }

    /// Store a complete reading from a blocking getter and return the new value.
    pub fn store(&mut self, channel: Channel, reading: RawReading) -> Option<f64> {
        let index = self.profile.index_of(channel)?;
        let encoding = self.profile.channels[index].encoding;
        let slot = &mut self.slots[index];
        match reading {
            RawReading::Pair { high, low } => {
                slot.high = Some(high);
                slot.low = Some(low);
            }
            RawReading::Single(byte) => slot.high = Some(byte),
        }
        slot.recompute(encoding);
        Some(slot.value)
    }

    /// Latest combined value; `None` only when the board has no such channel.
    pub fn peek(&self, channel: Channel) -> Option<f64> {
        self.slot(channel).map(|slot| slot.value)
    }

    pub fn slot(&self, channel: Channel) -> Option<&ChannelSlot> {
        self.profile.index_of(channel).map(|index| &self.slots[index])
    }

    /// Channels of this board with their slots, in table order.
    pub fn iter(&self) -> impl Iterator<Item = (Channel, &ChannelSlot)> + '_ {
        self.profile
            .channels
            .iter()
            .zip(self.slots.iter())
            .map(|(spec, slot)| (spec.channel, slot))
    }
}
