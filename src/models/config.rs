use std::time::Duration;

/// Tuning for a recording session.
#[derive(Debug, Clone)]
pub struct RecorderConfig {
    /// Width of one amplitude tick in milliseconds (default: 50).
    pub amplitude_window_ms: u64,

    /// Drop-oldest capacity of the visualization queue, in ticks
    /// (default: 256).
    pub amplitude_feed_capacity: usize,

    /// Capacity of the bounded raw-frame write queue, in frames
    /// (default: 64). The producer blocks when it fills up.
    pub raw_queue_frames: usize,

    /// How long to wait for the first frame before failing the session
    /// with `DeviceUnavailable` (default: 2s).
    pub first_frame_timeout: Duration,
}

impl RecorderConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.amplitude_window_ms == 0 {
            return Err("amplitude window must be positive".into());
        }
        if self.amplitude_feed_capacity == 0 {
            return Err("amplitude feed capacity must be positive".into());
        }
        if self.raw_queue_frames == 0 {
            return Err("raw queue capacity must be positive".into());
        }
        if self.first_frame_timeout.is_zero() {
            return Err("first-frame timeout must be positive".into());
        }
        Ok(())
    }
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            amplitude_window_ms: 50,
            amplitude_feed_capacity: 256,
            raw_queue_frames: 64,
            first_frame_timeout: Duration::from_secs(2),
        }
    }
}
