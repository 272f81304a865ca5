use std::time::Duration;

use super::{
    cache::{ChannelCache, RawReading},
    channel::{ChannelCodes, ChannelSpec, Setpoint},
    config::LinkTiming,
    error::{LinkError, LinkResult},
    exchange::get_byte,
};
use crate::protocol::{codec::SetFrames, transport::Transport};

/// Clamp, write the integer frame then the fraction frame, and trust the
/// device.
///
/// On success the encoded halves are stored in the cache and the encoded value
/// is returned. On failure the cache is untouched.
pub fn optimistic_write<T: Transport + ?Sized>(
    transport: &mut T,
    cache: &mut ChannelCache,
    setpoint: &Setpoint,
    value: f64,
) -> LinkResult<f64> {
    if !transport.is_open() {
        return Err(LinkError::TransportClosed);
    }
    let frames = SetFrames::encode(setpoint.clamp(value));
    for frame in [frames.integer, frames.fraction] {
        if !transport.write_byte(frame) {
            log::warn!("{}: SET frame {frame:#04x} not written", setpoint.channel);
            return Err(LinkError::WriteFailure { frame });
        }
    }

    let reading = RawReading::Pair {
        high: frames.integer_payload(),
        low: frames.fraction_payload(),
    };
    let stored = cache
        .store(setpoint.channel, reading)
        .unwrap_or_else(|| frames.encoded_value());
    log::info!("{}: set to {stored}", setpoint.channel);
    Ok(stored)
}

/// Clamp, write, read the channel back, and retry until the read-back lands
/// within tolerance or the retry budget runs out.
///
/// Only an accepted read-back reaches the cache. The error of the last attempt
/// is returned when every attempt fails.
pub fn verified_write<T: Transport + ?Sized>(
    transport: &mut T,
    cache: &mut ChannelCache,
    spec: &ChannelSpec,
    setpoint: &Setpoint,
    value: f64,
    timing: &LinkTiming,
) -> LinkResult<f64> {
    if !transport.is_open() {
        return Err(LinkError::TransportClosed);
    }
    let requested = setpoint.clamp(value);
    let frames = SetFrames::encode(requested);
    let attempts = timing.verify_retries.max(1);
    let mut last_error = LinkError::TransportClosed;

    for attempt in 1..=attempts {
        match attempt_once(transport, spec, frames, requested, timing) {
            Ok(reading) => {
                let accepted = cache
                    .store(spec.channel, reading)
                    .unwrap_or_else(|| combine(spec, reading));
                log::info!(
                    "{}: set to {accepted} (attempt {attempt}/{attempts})",
                    spec.channel
                );
                return Ok(accepted);
            }
            Err(err) => {
                log::debug!(
                    "{}: attempt {attempt}/{attempts} failed: {err}",
                    spec.channel
                );
                last_error = err;
            }
        }
    }

    log::warn!(
        "{}: giving up on {requested} after {attempts} attempts: {last_error}",
        spec.channel
    );
    Err(last_error)
}

fn attempt_once<T: Transport + ?Sized>(
    transport: &mut T,
    spec: &ChannelSpec,
    frames: SetFrames,
    requested: f64,
    timing: &LinkTiming,
) -> LinkResult<RawReading> {
    transport.flush_input();
    for frame in [frames.integer, frames.fraction] {
        if !transport.write_byte(frame) {
            return Err(LinkError::WriteFailure { frame });
        }
        pause(timing.inter_frame_delay);
    }

    let reading = read_back(transport, spec, timing.verify_timeout)?;
    let received = combine(spec, reading);
    if (received - requested).abs() <= timing.verify_tolerance {
        Ok(reading)
    } else {
        Err(LinkError::VerificationMismatch {
            requested,
            received,
        })
    }
}

/// Read-back is always HIGH then LOW, whatever the channel's getter order.
fn read_back<T: Transport + ?Sized>(
    transport: &mut T,
    spec: &ChannelSpec,
    timeout: Duration,
) -> LinkResult<RawReading> {
    match spec.codes {
        ChannelCodes::Pair { high, low } => {
            let high = get_byte(transport, high, timeout)?;
            let low = get_byte(transport, low, timeout)?;
            Ok(RawReading::Pair { high, low })
        }
        ChannelCodes::Single(code) => get_byte(transport, code, timeout).map(RawReading::Single),
    }
}

fn combine(spec: &ChannelSpec, reading: RawReading) -> f64 {
    match reading {
        RawReading::Pair { high, low } => spec.encoding.combine(high, low),
        RawReading::Single(byte) => f64::from(byte),
    }
}

fn pause(delay: Duration) {
    if !delay.is_zero() {
        std::thread::sleep(delay);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::channel::{BoardKind, Channel, AIR_CONDITIONER, CURTAIN};
    use crate::protocol::commands::{AirConditionerGet as Ac, CurtainGet as Cur};
    use crate::protocol::transport::SimulatedBoard;

    fn curtain() -> (SimulatedBoard, ChannelCache) {
        let mut board = SimulatedBoard::new(BoardKind::Curtain);
        board.open().unwrap();
        (board, ChannelCache::new(&CURTAIN))
    }

    fn curtain_spec() -> &'static ChannelSpec {
        CURTAIN.spec(Channel::CurtainStatus).unwrap()
    }

    #[test]
    fn optimistic_write_sends_integer_then_fraction() {
        let mut board = SimulatedBoard::new(BoardKind::AirConditioner);
        board.open().unwrap();
        let mut cache = ChannelCache::new(&AIR_CONDITIONER);

        let stored =
            optimistic_write(&mut board, &mut cache, &AIR_CONDITIONER.setpoint, 23.5).unwrap();
        assert_eq!(stored, 23.5);
        assert_eq!(board.frames_received(), &[0xC0 | 23, 0x80 | 5]);
        assert_eq!(board.counters().reads, 0);

        let slot = cache.slot(Channel::DesiredTemperature).unwrap();
        assert_eq!((slot.high, slot.low), (Some(23), Some(5)));
    }

    #[test]
    fn optimistic_write_clamps_to_six_bits() {
        let mut board = SimulatedBoard::new(BoardKind::AirConditioner);
        board.open().unwrap();
        let mut cache = ChannelCache::new(&AIR_CONDITIONER);
        let stored =
            optimistic_write(&mut board, &mut cache, &AIR_CONDITIONER.setpoint, 80.0).unwrap();
        assert!((stored - 63.9).abs() < 1e-9);
    }

    #[test]
    fn failed_optimistic_write_leaves_cache() {
        let mut board = SimulatedBoard::new(BoardKind::AirConditioner);
        board.open().unwrap();
        board.fail_writes(true);
        let mut cache = ChannelCache::new(&AIR_CONDITIONER);
        cache.handle_response(Ac::DesiredTemperatureHigh.into(), 20);
        cache.handle_response(Ac::DesiredTemperatureLow.into(), 0);

        let result = optimistic_write(&mut board, &mut cache, &AIR_CONDITIONER.setpoint, 25.0);
        assert_eq!(result, Err(LinkError::WriteFailure { frame: 0xC0 | 25 }));
        assert_eq!(cache.peek(Channel::DesiredTemperature), Some(20.0));
    }

    #[test]
    fn verified_write_accepts_matching_read_back() {
        let (mut board, mut cache) = curtain();
        let timing = LinkTiming::immediate();
        let accepted = verified_write(
            &mut board,
            &mut cache,
            curtain_spec(),
            &CURTAIN.setpoint,
            37.4,
            &timing,
        )
        .unwrap();
        assert!((accepted - 37.4).abs() < 1e-9);
        assert_eq!(
            board.frames_received(),
            &[
                0xC0 | 37,
                0x80 | 4,
                u8::from(Cur::DesiredCurtainHigh),
                u8::from(Cur::DesiredCurtainLow)
            ]
        );
    }

    #[test]
    fn verified_write_clamps_request() {
        let (mut board, mut cache) = curtain();
        let timing = LinkTiming::immediate();
        // 100 aliases to 36 in six bits, so the read-back cannot match.
        let result = verified_write(
            &mut board,
            &mut cache,
            curtain_spec(),
            &CURTAIN.setpoint,
            250.0,
            &timing,
        );
        assert_eq!(
            result,
            Err(LinkError::VerificationMismatch {
                requested: 100.0,
                received: 36.0
            })
        );
    }

    #[test]
    fn silent_read_back_is_retried_then_reported() {
        let (mut board, mut cache) = curtain();
        board.mute(Cur::DesiredCurtainLow.into());
        let timing = LinkTiming::immediate();
        let result = verified_write(
            &mut board,
            &mut cache,
            curtain_spec(),
            &CURTAIN.setpoint,
            10.0,
            &timing,
        );
        assert_eq!(
            result,
            Err(LinkError::ResponseTimeout {
                command: Cur::DesiredCurtainLow.into()
            })
        );
        let sets = board
            .frames_received()
            .iter()
            .filter(|frame| **frame >= 0xC0)
            .count();
        assert_eq!(sets, 3);
        assert_eq!(cache.slot(Channel::CurtainStatus).unwrap().high, None);
    }

    #[test]
    fn closed_transport_is_rejected_without_io() {
        let mut board = SimulatedBoard::new(BoardKind::Curtain);
        let mut cache = ChannelCache::new(&CURTAIN);
        let timing = LinkTiming::immediate();
        let result = verified_write(
            &mut board,
            &mut cache,
            curtain_spec(),
            &CURTAIN.setpoint,
            10.0,
            &timing,
        );
        assert_eq!(result, Err(LinkError::TransportClosed));
        assert_eq!(board.counters().writes, 0);
    }
}
