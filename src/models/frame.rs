use serde::{Deserialize, Serialize};

use super::error::EngineError;

/// Sample rate and channel layout shared by frames and artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AudioFormat {
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Interleaved channel count (1 = mono, 2 = stereo).
    pub channels: u16,
}

impl AudioFormat {
    pub fn new(sample_rate: u32, channels: u16) -> Self {
        Self {
            sample_rate,
            channels,
        }
    }

    pub fn mono(sample_rate: u32) -> Self {
        Self::new(sample_rate, 1)
    }

    pub fn stereo(sample_rate: u32) -> Self {
        Self::new(sample_rate, 2)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.sample_rate == 0 {
            return Err(EngineError::ParameterOutOfRange(
                "sample rate must be positive".into(),
            ));
        }
        if ![1, 2].contains(&self.channels) {
            return Err(EngineError::ParameterOutOfRange(format!(
                "unsupported channel count: {}",
                self.channels
            )));
        }
        Ok(())
    }

    /// Duration in seconds of `sample_count` interleaved samples.
    pub fn samples_to_secs(&self, sample_count: usize) -> f64 {
        sample_count as f64 / self.channels as f64 / self.sample_rate as f64
    }

    /// Frame-aligned interleaved sample offset for a time position.
    pub fn sample_offset(&self, secs: f64) -> usize {
        let frame = (secs * self.sample_rate as f64).round() as usize;
        frame * self.channels as usize
    }

    /// Duration in seconds of a 16-bit PCM buffer of `byte_len` bytes.
    pub fn pcm16_duration_secs(&self, byte_len: u64) -> f64 {
        self.samples_to_secs((byte_len / 2) as usize)
    }
}

/// One fixed-size chunk of interleaved samples from a frame source.
///
/// Frames carry a monotonically increasing sequence number and are moved
/// between stages, never shared-mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioFrame {
    pub seq: u64,
    pub samples: Vec<f32>,
}

impl AudioFrame {
    pub fn new(seq: u64, samples: Vec<f32>) -> Self {
        Self { seq, samples }
    }

    pub fn duration_secs(&self, format: &AudioFormat) -> f64 {
        format.samples_to_secs(self.samples.len())
    }
}

/// One visualization tick: peak-or-RMS magnitude in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AmplitudeSample {
    /// Monotone tick index in the visualization timeline.
    pub tick: u64,
    pub value: f32,
}

impl AmplitudeSample {
    pub fn new(tick: u64, value: f32) -> Self {
        Self {
            tick,
            value: value.clamp(0.0, 1.0),
        }
    }
}
