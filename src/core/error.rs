use derive_more::{Display, Error};

use super::channel::Channel;

/// Failure modes of one link operation.
///
/// None of these are fatal; the next poll tick or call recovers.
#[derive(Debug, Clone, Copy, PartialEq, Display, Error)]
pub enum LinkError {
    #[display("transport is not open")]
    TransportClosed,
    #[display("failed to write frame {frame:#04x}")]
    WriteFailure { frame: u8 },
    #[display("no response to command {command:#04x}")]
    ResponseTimeout { command: u8 },
    #[display("read back {received} after requesting {requested}")]
    VerificationMismatch { requested: f64, received: f64 },
    #[display("board has no {channel} channel")]
    NoSuchChannel { channel: Channel },
}

pub type LinkResult<T> = Result<T, LinkError>;
