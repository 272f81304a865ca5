/// Board-independent link logic
///
/// This module contains everything between the byte transport and the
/// board-typed API:
/// - Channel tables describing each board
/// - The channel cache of latest raw halves and values
/// - The non-blocking poll engine
/// - Blocking GET round-trips and the setpoint write disciplines
/// - The session tying one transport to one board
///
/// Nothing here knows about the CLI or the serial device in use.
pub mod cache;
pub mod channel;
pub mod config;
pub mod error;
pub mod exchange;
pub mod poller;
pub mod session;
pub mod write;

// Re-export commonly used types
pub use cache::{ChannelCache, ChannelSlot, RawReading};
pub use channel::{BoardKind, BoardProfile, Channel, AIR_CONDITIONER, CURTAIN};
pub use config::LinkTiming;
pub use error::{LinkError, LinkResult};
pub use poller::{PollState, Poller, TickOutcome};
pub use session::{ChannelSnapshot, Session, SessionSnapshot};
