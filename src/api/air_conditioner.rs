use crate::core::{BoardKind, Channel, LinkTiming, Session};
use crate::protocol::transport::Transport;

use super::BoardLink;

/// Air conditioner board: desired and ambient temperature plus fan speed.
///
/// The desired temperature is written optimistically.
pub struct AirConditionerLink<T: Transport> {
    session: Session<T>,
}

impl<T: Transport> AirConditionerLink<T> {
    pub fn new(transport: T) -> Self {
        Self::with_timing(transport, LinkTiming::default())
    }

    pub fn with_timing(transport: T, timing: LinkTiming) -> Self {
        Self {
            session: Session::new(BoardKind::AirConditioner, transport, timing),
        }
    }

    pub fn peek_desired_temperature(&self) -> f64 {
        self.peek(Channel::DesiredTemperature)
    }

    pub fn get_desired_temperature(&mut self) -> f64 {
        self.session.get(Channel::DesiredTemperature)
    }

    /// Clamped to `0.0..=63.9`. The cache holds the encoded value on success.
    pub fn set_desired_temperature(&mut self, value: f64) -> bool {
        self.session.set_setpoint(value)
    }

    pub fn peek_ambient_temperature(&self) -> f64 {
        self.peek(Channel::AmbientTemperature)
    }

    pub fn get_ambient_temperature(&mut self) -> f64 {
        self.session.get(Channel::AmbientTemperature)
    }

    pub fn peek_fan_speed(&self) -> u8 {
        self.peek(Channel::FanSpeed) as u8
    }

    pub fn get_fan_speed(&mut self) -> u8 {
        self.session.get(Channel::FanSpeed) as u8
    }

    fn peek(&self, channel: Channel) -> f64 {
        self.session.peek(channel).unwrap_or_default()
    }
}

impl<T: Transport> BoardLink for AirConditionerLink<T> {
    type Transport = T;

    fn session(&self) -> &Session<T> {
        &self.session
    }

    fn session_mut(&mut self) -> &mut Session<T> {
        &mut self.session
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::transport::SimulatedBoard;

    fn link() -> AirConditionerLink<SimulatedBoard> {
        let board = SimulatedBoard::with_sample_readings(BoardKind::AirConditioner);
        let mut link = AirConditionerLink::with_timing(board, LinkTiming::immediate());
        link.connect().unwrap();
        link
    }

    #[test]
    fn getters_read_the_board() {
        let mut link = link();
        assert_eq!(link.get_desired_temperature(), 22.5);
        assert!((link.get_ambient_temperature() - 24.3).abs() < 1e-9);
        assert_eq!(link.get_fan_speed(), 3);
        assert_eq!(link.peek_fan_speed(), 3);
    }

    #[test]
    fn set_updates_board_and_cache() {
        let mut link = link();
        assert!(link.set_desired_temperature(19.0));
        assert_eq!(link.peek_desired_temperature(), 19.0);
        assert_eq!(link.session().transport().setpoint(), 19.0);
    }

    #[test]
    fn disconnected_link_reports_failure_and_cached_values() {
        let mut link = link();
        link.update();
        link.disconnect();
        assert!(!link.set_desired_temperature(30.0));
        assert_eq!(link.get_desired_temperature(), 22.5);
        assert_eq!(link.get_fan_speed(), 3);
    }
}
