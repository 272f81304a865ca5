//! One open transport plus the channel table of one board.
//!
//! The session owns the two execution modes that share the transport: the
//! non-blocking poll tick and the blocking round-trips (getters, refresh and
//! setpoint writes). Every blocking operation runs through [`ExclusiveAccess`],
//! which suspends the poller for its lifetime, so the two modes can never
//! interleave on the byte stream.

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use serde::Serialize;
use std::time::Instant;

use super::{
    cache::ChannelCache,
    channel::{BoardKind, BoardProfile, Channel, WriteDiscipline},
    config::LinkTiming,
    error::{LinkError, LinkResult},
    exchange::read_channel,
    poller::{PollState, Poller, TickOutcome},
    write::{optimistic_write, verified_write},
};
use crate::protocol::transport::Transport;

pub struct Session<T: Transport> {
    profile: &'static BoardProfile,
    transport: T,
    cache: ChannelCache,
    poller: Poller,
    timing: LinkTiming,
}

/// Token for exclusive use of the transport.
///
/// Creating it drops any outstanding poll request and suspends polling;
/// dropping it resumes polling unless the caller had suspended it already.
struct ExclusiveAccess<'a, T: Transport> {
    transport: &'a mut T,
    cache: &'a mut ChannelCache,
    poller: &'a mut Poller,
    resume: bool,
}

impl<T: Transport> Drop for ExclusiveAccess<'_, T> {
    fn drop(&mut self) {
        if self.resume {
            self.poller.resume();
        }
    }
}

/// Serializable view of one channel.
#[derive(Debug, Clone, Serialize)]
pub struct ChannelSnapshot {
    pub channel: Channel,
    pub value: f64,
    pub high: Option<u8>,
    pub low: Option<u8>,
}

/// Serializable view of a session at one instant.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub board: BoardKind,
    pub connected: bool,
    pub polling_suspended: bool,
    pub captured_at: DateTime<Local>,
    pub channels: Vec<ChannelSnapshot>,
}

impl<T: Transport> Session<T> {
    pub fn new(kind: BoardKind, transport: T, timing: LinkTiming) -> Self {
        let profile = kind.profile();
        Self {
            profile,
            transport,
            cache: ChannelCache::new(profile),
            poller: Poller::new(profile.poll_sequence, timing.response_timeout),
            timing,
        }
    }

    pub fn board(&self) -> BoardKind {
        self.profile.kind
    }

    pub fn profile(&self) -> &'static BoardProfile {
        self.profile
    }

    pub fn timing(&self) -> &LinkTiming {
        &self.timing
    }

    pub fn set_timing(&mut self, timing: LinkTiming) {
        self.poller.set_response_timeout(timing.response_timeout);
        self.timing = timing;
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn cache(&self) -> &ChannelCache {
        &self.cache
    }

    /// Open the transport and restart the poll round.
    pub fn connect(&mut self) -> Result<()> {
        self.transport
            .open()
            .with_context(|| format!("failed to connect {} board", self.profile.kind))?;
        self.poller.reset();
        log::info!("{} board connected", self.profile.kind);
        Ok(())
    }

    /// Close the transport. Cached values are kept.
    pub fn disconnect(&mut self) -> bool {
        self.poller.reset();
        let was_open = self.transport.close();
        if was_open {
            log::info!("{} board disconnected", self.profile.kind);
        }
        was_open
    }

    pub fn is_open(&self) -> bool {
        self.transport.is_open()
    }

    /// Latest cached value. Never touches the transport.
    pub fn peek(&self, channel: Channel) -> Option<f64> {
        self.cache.peek(channel)
    }

    /// Blocking read of one channel; the cache is updated on success.
    pub fn read(&mut self, channel: Channel) -> LinkResult<f64> {
        let spec = *self
            .profile
            .spec(channel)
            .ok_or(LinkError::NoSuchChannel { channel })?;
        if !self.transport.is_open() {
            return Err(LinkError::TransportClosed);
        }
        let get_timeout = self.timing.get_timeout;
        let mut access = self.exclusive();
        let reading = read_channel(&mut *access.transport, &spec, get_timeout)?;
        access
            .cache
            .store(channel, reading)
            .ok_or(LinkError::NoSuchChannel { channel })
    }

    /// Blocking read of one channel, falling back to the cached value on any
    /// failure.
    pub fn get(&mut self, channel: Channel) -> f64 {
        match self.read(channel) {
            Ok(value) => value,
            Err(err) => {
                log::debug!("{channel}: using cached value: {err}");
                self.peek(channel).unwrap_or_default()
            }
        }
    }

    /// Blocking refresh of every channel, in table order. Channels that fail
    /// keep their cached value. Returns how many were refreshed.
    pub fn refresh(&mut self) -> usize {
        if !self.transport.is_open() {
            return 0;
        }
        let profile = self.profile;
        let get_timeout = self.timing.get_timeout;
        let mut access = self.exclusive();
        let mut refreshed = 0;
        for spec in profile.channels {
            match read_channel(&mut *access.transport, spec, get_timeout) {
                Ok(reading) => {
                    access.cache.store(spec.channel, reading);
                    refreshed += 1;
                }
                Err(err) => log::debug!("{}: refresh skipped: {err}", spec.channel),
            }
        }
        refreshed
    }

    /// Write the board's setpoint using its write discipline.
    ///
    /// Returns the value the device now holds.
    pub fn write_setpoint(&mut self, value: f64) -> LinkResult<f64> {
        let setpoint = self.profile.setpoint;
        let spec = *self.profile.spec(setpoint.channel).ok_or(LinkError::NoSuchChannel {
            channel: setpoint.channel,
        })?;
        if !self.transport.is_open() {
            return Err(LinkError::TransportClosed);
        }
        let timing = self.timing.clone();
        let mut access = self.exclusive();
        match setpoint.discipline {
            WriteDiscipline::Optimistic => {
                optimistic_write(&mut *access.transport, &mut *access.cache, &setpoint, value)
            }
            WriteDiscipline::Verified => verified_write(
                &mut *access.transport,
                &mut *access.cache,
                &spec,
                &setpoint,
                value,
                &timing,
            ),
        }
    }

    pub fn set_setpoint(&mut self, value: f64) -> bool {
        self.write_setpoint(value).is_ok()
    }

    pub fn poll_tick(&mut self) -> TickOutcome {
        self.poll_tick_at(Instant::now())
    }

    /// Advance the poller with an explicit clock reading.
    pub fn poll_tick_at(&mut self, now: Instant) -> TickOutcome {
        self.poller.tick(&mut self.transport, &mut self.cache, now)
    }

    /// Drop the outstanding request and start the GET round from the top.
    pub fn reset_poll_cycle(&mut self) {
        self.poller.reset();
    }

    /// Hold polling off until [`Session::resume_polling`].
    pub fn suspend_polling(&mut self) {
        self.poller.suspend();
    }

    pub fn resume_polling(&mut self) {
        self.poller.resume();
    }

    pub fn is_polling_suspended(&self) -> bool {
        self.poller.is_suspended()
    }

    pub fn poll_state(&self) -> PollState {
        self.poller.state()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            board: self.profile.kind,
            connected: self.transport.is_open(),
            polling_suspended: self.poller.is_suspended(),
            captured_at: Local::now(),
            channels: self
                .cache
                .iter()
                .map(|(channel, slot)| ChannelSnapshot {
                    channel,
                    value: slot.value,
                    high: slot.high,
                    low: slot.low,
                })
                .collect(),
        }
    }

    fn exclusive(&mut self) -> ExclusiveAccess<'_, T> {
        let resume = !self.poller.is_suspended();
        self.poller.suspend();
        ExclusiveAccess {
            transport: &mut self.transport,
            cache: &mut self.cache,
            poller: &mut self.poller,
            resume,
        }
    }
}
