use std::time::Duration;

use super::{
    cache::RawReading,
    channel::{ChannelCodes, ChannelSpec, ReadOrder},
    error::{LinkError, LinkResult},
};
use crate::protocol::transport::Transport;

/// Send one GET and wait for its single response byte.
///
/// Input is flushed first: responses carry no IDs, so a stale byte would
/// otherwise be taken as the answer. Spins until `timeout`; only call while the
/// poller is suspended.
pub fn get_byte<T: Transport + ?Sized>(
    transport: &mut T,
    command: u8,
    timeout: Duration,
) -> LinkResult<u8> {
    if !transport.is_open() {
        return Err(LinkError::TransportClosed);
    }
    transport.flush_input();
    if !transport.write_byte(command) {
        return Err(LinkError::WriteFailure { frame: command });
    }
    match transport.read_byte_deadline(timeout) {
        Some(byte) => {
            log::debug!("GET {command:#04x} -> {byte:#04x}");
            Ok(byte)
        }
        None => {
            log::debug!("GET {command:#04x} timed out after {timeout:?}");
            Err(LinkError::ResponseTimeout { command })
        }
    }
}

/// Read every byte of one channel in the channel's read order.
pub fn read_channel<T: Transport + ?Sized>(
    transport: &mut T,
    spec: &ChannelSpec,
    timeout: Duration,
) -> LinkResult<RawReading> {
    match spec.codes {
        ChannelCodes::Single(code) => get_byte(transport, code, timeout).map(RawReading::Single),
        ChannelCodes::Pair { high, low } => match spec.read_order {
            ReadOrder::HighFirst => {
                let high = get_byte(transport, high, timeout)?;
                let low = get_byte(transport, low, timeout)?;
                Ok(RawReading::Pair { high, low })
            }
            ReadOrder::LowFirst => {
                let low = get_byte(transport, low, timeout)?;
                let high = get_byte(transport, high, timeout)?;
                Ok(RawReading::Pair { high, low })
            }
        },
    }
}
