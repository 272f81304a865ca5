use crate::core::{BoardKind, Channel, LinkTiming, Session};
use crate::protocol::transport::Transport;

use super::BoardLink;

/// Curtain board: curtain position plus the outdoor weather sensors.
///
/// Curtain position writes are verified by reading the position back.
pub struct CurtainLink<T: Transport> {
    session: Session<T>,
}

impl<T: Transport> CurtainLink<T> {
    pub fn new(transport: T) -> Self {
        Self::with_timing(transport, LinkTiming::default())
    }

    pub fn with_timing(transport: T, timing: LinkTiming) -> Self {
        Self {
            session: Session::new(BoardKind::Curtain, transport, timing),
        }
    }

    pub fn peek_curtain_status(&self) -> f64 {
        self.peek(Channel::CurtainStatus)
    }

    pub fn get_curtain_status(&mut self) -> f64 {
        self.session.get(Channel::CurtainStatus)
    }

    /// Clamped to `0.0..=100.0`. Succeeds only once the board echoes a value
    /// within tolerance; the cache is left alone otherwise.
    pub fn set_curtain_status(&mut self, value: f64) -> bool {
        self.session.set_setpoint(value)
    }

    pub fn peek_outdoor_temperature(&self) -> f64 {
        self.peek(Channel::OutdoorTemperature)
    }

    pub fn get_outdoor_temperature(&mut self) -> f64 {
        self.session.get(Channel::OutdoorTemperature)
    }

    pub fn peek_outdoor_pressure(&self) -> f64 {
        self.peek(Channel::OutdoorPressure)
    }

    pub fn get_outdoor_pressure(&mut self) -> f64 {
        self.session.get(Channel::OutdoorPressure)
    }

    pub fn peek_light_intensity(&self) -> f64 {
        self.peek(Channel::LightIntensity)
    }

    pub fn get_light_intensity(&mut self) -> f64 {
        self.session.get(Channel::LightIntensity)
    }

    fn peek(&self, channel: Channel) -> f64 {
        self.session.peek(channel).unwrap_or_default()
    }
}

impl<T: Transport> BoardLink for CurtainLink<T> {
    type Transport = T;

    fn session(&self) -> &Session<T> {
        &self.session
    }

    fn session_mut(&mut self) -> &mut Session<T> {
        &mut self.session
    }
}
