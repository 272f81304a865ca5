//! Byte-level transport consumed by the link core.
//!
//! A transport moves single frames. None of the primitives may panic or
//! return errors to the caller: failures collapse to `false` / `None`, and the
//! session decides what that means.

pub mod serial;
pub mod simulated;

use anyhow::Result;
use std::time::{Duration, Instant};

pub use serial::{SerialConfig, SerialTransport};
pub use simulated::SimulatedBoard;

/// Granularity of the spin loop in [`Transport::read_byte_deadline`].
pub const DEADLINE_POLL_STEP: Duration = Duration::from_millis(1);

pub trait Transport {
    /// Open the underlying device. Opening an already open transport is a no-op.
    fn open(&mut self) -> Result<()>;

    /// Close the device, returning whether anything was open.
    fn close(&mut self) -> bool;

    fn is_open(&self) -> bool;

    /// Write exactly one byte. Returns `false` on any failure.
    fn write_byte(&mut self, byte: u8) -> bool;

    /// Drop unread input so a stale byte cannot answer the next GET.
    fn flush_input(&mut self);

    /// Non-blocking read of one byte.
    fn read_byte_now(&mut self) -> Option<u8>;

    /// Spin on [`Transport::read_byte_now`] until a byte arrives or `timeout`
    /// elapses on the monotonic clock. Only blocking callers use this.
    fn read_byte_deadline(&mut self, timeout: Duration) -> Option<u8> {
        if !self.is_open() {
            return None;
        }
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(byte) = self.read_byte_now() {
                return Some(byte);
            }
            if Instant::now() >= deadline {
                return None;
            }
            std::thread::sleep(DEADLINE_POLL_STEP);
        }
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn open(&mut self) -> Result<()> {
        (**self).open()
    }

    fn close(&mut self) -> bool {
        (**self).close()
    }

    fn is_open(&self) -> bool {
        (**self).is_open()
    }

    fn write_byte(&mut self, byte: u8) -> bool {
        (**self).write_byte(byte)
    }

    fn flush_input(&mut self) {
        (**self).flush_input()
    }

    fn read_byte_now(&mut self) -> Option<u8> {
        (**self).read_byte_now()
    }

    fn read_byte_deadline(&mut self, timeout: Duration) -> Option<u8> {
        (**self).read_byte_deadline(timeout)
    }
}
