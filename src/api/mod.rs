pub mod air_conditioner;
pub mod curtain;

use anyhow::Result;

use crate::core::{LinkTiming, PollState, Session, SessionSnapshot, TickOutcome};
use crate::protocol::transport::Transport;

pub use air_conditioner::AirConditionerLink;
pub use curtain::CurtainLink;

/// Capabilities shared by every board link
///
/// A board link is a thin typed view over one [`Session`]. Implementors only
/// provide access to the session; lifecycle, polling and bulk refresh come
/// from the default methods.
pub trait BoardLink {
    type Transport: Transport;

    fn session(&self) -> &Session<Self::Transport>;

    fn session_mut(&mut self) -> &mut Session<Self::Transport>;

    fn connect(&mut self) -> Result<()> {
        self.session_mut().connect()
    }

    /// Close the transport; cached values stay readable through `peek_*`.
    fn disconnect(&mut self) -> bool {
        self.session_mut().disconnect()
    }

    fn is_open(&self) -> bool {
        self.session().is_open()
    }

    /// One non-blocking poll step. Call on a fixed cadence, see
    /// [`LinkTiming::poll_interval`].
    fn poll_tick(&mut self) -> TickOutcome {
        self.session_mut().poll_tick()
    }

    fn reset_poll_cycle(&mut self) {
        self.session_mut().reset_poll_cycle()
    }

    fn suspend_polling(&mut self) {
        self.session_mut().suspend_polling()
    }

    fn resume_polling(&mut self) {
        self.session_mut().resume_polling()
    }

    fn poll_state(&self) -> PollState {
        self.session().poll_state()
    }

    /// Blocking refresh of every channel. No-op while disconnected.
    fn update(&mut self) {
        let refreshed = self.session_mut().refresh();
        log::debug!("{}: refreshed {refreshed} channel(s)", self.session().board());
    }

    fn timing(&self) -> &LinkTiming {
        self.session().timing()
    }

    fn snapshot(&self) -> SessionSnapshot {
        self.session().snapshot()
    }
}
