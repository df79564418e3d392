use std::collections::VecDeque;

use crate::models::frame::{AmplitudeSample, AudioFormat, AudioFrame};

/// Reduces frames to RMS amplitude ticks at a fixed decimation window.
///
/// Pure per-frame math: each call consumes one frame and emits zero or
/// more ticks, carrying the partial window across frame boundaries so
/// tick width is independent of frame size.
#[derive(Debug)]
pub struct AmplitudeReducer {
    /// Interleaved samples per tick.
    window: usize,
    sum_squares: f64,
    filled: usize,
    next_tick: u64,
}

impl AmplitudeReducer {
    pub fn new(format: AudioFormat, window_ms: u64) -> Self {
        let per_sec = format.sample_rate as u64 * format.channels as u64;
        let window = (per_sec * window_ms / 1000).max(1) as usize;
        Self {
            window,
            sum_squares: 0.0,
            filled: 0,
            next_tick: 0,
        }
    }

    /// Fold one frame into the running window, emitting completed ticks.
    pub fn reduce(&mut self, frame: &AudioFrame) -> Vec<AmplitudeSample> {
        let mut out = Vec::new();
        for &sample in &frame.samples {
            self.sum_squares += (sample as f64) * (sample as f64);
            self.filled += 1;
            if self.filled == self.window {
                out.push(self.emit(self.window));
            }
        }
        out
    }

    /// Emit the trailing partial window, if any. Called when capture stops.
    pub fn flush(&mut self) -> Option<AmplitudeSample> {
        if self.filled == 0 {
            return None;
        }
        let filled = self.filled;
        Some(self.emit(filled))
    }

    fn emit(&mut self, count: usize) -> AmplitudeSample {
        let rms = (self.sum_squares / count as f64).sqrt() as f32;
        let tick = self.next_tick;
        self.next_tick += 1;
        self.sum_squares = 0.0;
        self.filled = 0;
        AmplitudeSample::new(tick, rms)
    }

    pub fn window_len(&self) -> usize {
        self.window
    }
}

/// Bounded drop-oldest queue between the reducer and the visualization
/// consumer.
///
/// The producer never blocks here: when the consumer falls behind, the
/// oldest unread ticks are discarded and the newest win. Tick indices
/// stay monotone, so a consumer that subscribes late (or resumes after
/// drops) can line its rendering up from the first tick it drains.
#[derive(Debug)]
pub struct AmplitudeFeed {
    samples: VecDeque<AmplitudeSample>,
    capacity: usize,
    dropped: u64,
}

impl AmplitudeFeed {
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
            dropped: 0,
        }
    }

    pub fn push(&mut self, sample: AmplitudeSample) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
            self.dropped += 1;
        }
        self.samples.push_back(sample);
    }

    /// Remove and return all unread ticks, oldest first.
    pub fn drain(&mut self) -> Vec<AmplitudeSample> {
        self.samples.drain(..).collect()
    }

    pub fn latest(&self) -> Option<AmplitudeSample> {
        self.samples.back().copied()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Ticks discarded because the consumer fell behind.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    pub fn clear(&mut self) {
        self.samples.clear();
        self.dropped = 0;
    }
}
