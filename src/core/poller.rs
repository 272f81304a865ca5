//! Tick-driven, non-blocking GET scheduler.
//!
//! The poller is either idle or awaiting exactly one response. Each tick does
//! at most one read and at most one write, and only uses the non-blocking
//! transport primitives, so a tick never stalls its caller. Input is flushed
//! ahead of every GET.

use std::{
    collections::VecDeque,
    time::{Duration, Instant},
};

use super::cache::ChannelCache;
use super::channel::Channel;
use crate::protocol::transport::Transport;

/// The one outstanding GET.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingRequest {
    pub command: u8,
    pub sent_at: Instant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Idle,
    Awaiting(PendingRequest),
}

/// Why a tick did not touch the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Skipped {
    Disconnected,
    /// Polling is suspended for an exclusive operation.
    Suspended,
}

/// A response byte stored during a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Response {
    pub command: u8,
    pub byte: u8,
    /// Set when the byte completed a channel value.
    pub updated: Option<Channel>,
}

/// What one tick did. Informational only; timeouts and failed sends are
/// expected steady-state events, not errors.
///
/// A tick with nothing set was spent waiting on the outstanding request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickOutcome {
    pub skipped: Option<Skipped>,
    pub response: Option<Response>,
    /// Command whose request expired this tick.
    pub timed_out: Option<u8>,
    /// Command written this tick and still outstanding.
    pub sent: Option<u8>,
    /// Command that could not be written; it is dropped from this round.
    pub send_failed: Option<u8>,
}

impl TickOutcome {
    fn skipped(reason: Skipped) -> Self {
        Self {
            skipped: Some(reason),
            ..Self::default()
        }
    }

    pub fn is_disconnected(&self) -> bool {
        self.skipped == Some(Skipped::Disconnected)
    }

    pub fn is_suspended(&self) -> bool {
        self.skipped == Some(Skipped::Suspended)
    }
}

#[derive(Debug, Clone)]
pub struct Poller {
    sequence: &'static [u8],
    queue: VecDeque<u8>,
    pending: Option<PendingRequest>,
    response_timeout: Duration,
    suspended: bool,
}

impl Poller {
    pub fn new(sequence: &'static [u8], response_timeout: Duration) -> Self {
        Self {
            sequence,
            queue: VecDeque::with_capacity(sequence.len()),
            pending: None,
            response_timeout,
            suspended: false,
        }
    }

    pub fn state(&self) -> PollState {
        match self.pending {
            Some(pending) => PollState::Awaiting(pending),
            None => PollState::Idle,
        }
    }

    pub fn pending(&self) -> Option<&PendingRequest> {
        self.pending.as_ref()
    }

    /// Commands still to be sent in the current round.
    pub fn queued(&self) -> impl Iterator<Item = u8> + '_ {
        self.queue.iter().copied()
    }

    pub fn is_suspended(&self) -> bool {
        self.suspended
    }

    pub fn set_response_timeout(&mut self, timeout: Duration) {
        self.response_timeout = timeout;
    }

    /// Forget the outstanding request and the rest of the round.
    pub fn reset(&mut self) {
        self.pending = None;
        self.queue.clear();
    }

    /// Reset and stop ticking until [`Poller::resume`].
    pub fn suspend(&mut self) {
        self.reset();
        self.suspended = true;
    }

    pub fn resume(&mut self) {
        self.suspended = false;
    }

    /// Advance the state machine by one step at time `now`.
    pub fn tick<T: Transport + ?Sized>(
        &mut self,
        transport: &mut T,
        cache: &mut ChannelCache,
        now: Instant,
    ) -> TickOutcome {
        if self.suspended {
            return TickOutcome::skipped(Skipped::Suspended);
        }
        if !transport.is_open() {
            return TickOutcome::skipped(Skipped::Disconnected);
        }

        let mut outcome = TickOutcome::default();
        let mut read_this_tick = false;

        if let Some(pending) = self.pending {
            read_this_tick = true;
            if let Some(byte) = transport.read_byte_now() {
                self.pending = None;
                outcome.response = Some(Self::deliver(cache, pending.command, byte));
            } else if now.saturating_duration_since(pending.sent_at) > self.response_timeout {
                log::debug!(
                    "poll: no response to {:#04x} within {:?}",
                    pending.command,
                    self.response_timeout
                );
                transport.flush_input();
                self.pending = None;
                outcome.timed_out = Some(pending.command);
            } else {
                return outcome;
            }
        }

        if self.queue.is_empty() {
            self.queue.extend(self.sequence.iter().copied());
        }
        let Some(command) = self.queue.pop_front() else {
            return outcome;
        };

        // Responses carry no command id; anything already buffered is stale.
        transport.flush_input();
        if !transport.write_byte(command) {
            log::debug!("poll: write of {command:#04x} failed");
            outcome.send_failed = Some(command);
            return outcome;
        }
        self.pending = Some(PendingRequest {
            command,
            sent_at: now,
        });

        if !read_this_tick {
            if let Some(byte) = transport.read_byte_now() {
                self.pending = None;
                outcome.response = Some(Self::deliver(cache, command, byte));
                return outcome;
            }
        }

        outcome.sent = Some(command);
        outcome
    }

    fn deliver(cache: &mut ChannelCache, command: u8, byte: u8) -> Response {
        log::debug!("poll: {command:#04x} -> {byte:#04x}");
        Response {
            command,
            byte,
            updated: cache.handle_response(command, byte),
        }
    }
}
