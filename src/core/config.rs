use std::time::Duration;

/// Timing and retry tunables for one session.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkTiming {
    /// Cadence at which a driver should call `poll_tick`.
    pub poll_interval: Duration,
    /// How long the poller waits for the answer to one GET.
    pub response_timeout: Duration,
    /// Per-byte deadline of the blocking getters.
    pub get_timeout: Duration,
    /// Per-byte deadline of the verified-write read-back.
    pub verify_timeout: Duration,
    pub verify_retries: u32,
    /// Largest accepted distance between requested and read-back value.
    pub verify_tolerance: f64,
    /// Gap after each SET frame of a verified write.
    pub inter_frame_delay: Duration,
}

impl Default for LinkTiming {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(40),
            response_timeout: Duration::from_millis(150),
            get_timeout: Duration::from_millis(80),
            verify_timeout: Duration::from_millis(150),
            verify_retries: 3,
            verify_tolerance: 0.11,
            inter_frame_delay: Duration::from_millis(10),
        }
    }
}

impl LinkTiming {
    /// Zero delays and short deadlines, for simulated devices that answer
    /// instantly.
    pub fn immediate() -> Self {
        Self {
            poll_interval: Duration::ZERO,
            response_timeout: Duration::from_millis(150),
            get_timeout: Duration::from_millis(5),
            verify_timeout: Duration::from_millis(5),
            inter_frame_delay: Duration::ZERO,
            ..Self::default()
        }
    }
}
