//! Pure buffer math backing the transform pipeline.
//!
//! Every function here is deterministic over `&[f32]` input with no
//! platform dependencies; the pipeline composes them and owns error
//! handling and ordering.

use crate::models::frame::AudioFormat;

/// Envelope level below which the noise gate engages.
pub const NOISE_GATE_THRESHOLD: f32 = 0.02;
const NOISE_GATE_FLOOR: f32 = 0.1;
const NOISE_GATE_ALPHA: f32 = 0.05;

/// Keep only the interleaved samples inside `[start_secs, end_secs)`.
///
/// Offsets are frame-aligned and clamped to the buffer; range validity
/// is the pipeline's job.
pub fn trim(samples: &[f32], format: &AudioFormat, start_secs: f64, end_secs: f64) -> Vec<f32> {
    let start = format.sample_offset(start_secs).min(samples.len());
    let end = format.sample_offset(end_secs).clamp(start, samples.len());
    samples[start..end].to_vec()
}

/// Linear-interpolation resampling for interleaved audio of any channel
/// count, from `source_rate` to `target_rate`.
pub fn resample(samples: &[f32], channels: u16, source_rate: f64, target_rate: f64) -> Vec<f32> {
    if (source_rate - target_rate).abs() < 1e-9 || samples.is_empty() {
        return samples.to_vec();
    }

    let channels = channels.max(1) as usize;
    let frame_count = samples.len() / channels;
    let ratio = target_rate / source_rate;
    let output_frames = (frame_count as f64 * ratio) as usize;
    if output_frames == 0 {
        return Vec::new();
    }

    let mut output = vec![0.0f32; output_frames * channels];
    for i in 0..output_frames {
        let source_index = i as f64 / ratio;
        let index = source_index as usize;
        let fraction = (source_index - index as f64) as f32;

        for ch in 0..channels {
            if index + 1 < frame_count {
                output[i * channels + ch] = samples[index * channels + ch] * (1.0 - fraction)
                    + samples[(index + 1) * channels + ch] * fraction;
            } else if index < frame_count {
                output[i * channels + ch] = samples[index * channels + ch];
            }
        }
    }
    output
}

/// Naive pitch shift: resample by `ratio` and play back at the original
/// rate. `ratio > 1` raises pitch and shortens the buffer by the same
/// factor.
pub fn repitch(samples: &[f32], channels: u16, ratio: f64) -> Vec<f32> {
    resample(samples, channels, ratio, 1.0)
}

/// Sum `secondary` (scaled by `gain`) on top of `primary`.
///
/// The shorter buffer is padded with silence; clipping is handled at
/// encode time.
pub fn mix(primary: &[f32], secondary: &[f32], gain: f32) -> Vec<f32> {
    let len = primary.len().max(secondary.len());
    let mut out = vec![0.0f32; len];
    for (i, slot) in out.iter_mut().enumerate() {
        let p = primary.get(i).copied().unwrap_or(0.0);
        let s = secondary.get(i).copied().unwrap_or(0.0);
        *slot = p + s * gain;
    }
    out
}

/// Downmix interleaved multi-channel audio to mono by averaging channels.
pub fn downmix_to_mono(samples: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return samples.to_vec();
    }
    let frame_count = samples.len() / channels;
    let scale = 1.0 / channels as f32;
    let mut mono = Vec::with_capacity(frame_count);
    for frame in 0..frame_count {
        let mut sum = 0.0f32;
        for ch in 0..channels {
            sum += samples[frame * channels + ch];
        }
        mono.push(sum * scale);
    }
    mono
}

/// Duplicate mono samples into interleaved stereo.
pub fn spread_to_stereo(samples: &[f32]) -> Vec<f32> {
    let mut stereo = Vec::with_capacity(samples.len() * 2);
    for &s in samples {
        stereo.push(s);
        stereo.push(s);
    }
    stereo
}

/// Convert a buffer from one format to another (channel layout first,
/// then sample rate).
pub fn adapt_format(samples: Vec<f32>, from: AudioFormat, to: AudioFormat) -> Vec<f32> {
    let samples = if from.channels == to.channels {
        samples
    } else if to.channels == 1 {
        downmix_to_mono(&samples, from.channels as usize)
    } else {
        spread_to_stereo(&downmix_to_mono(&samples, from.channels as usize))
    };

    if from.sample_rate == to.sample_rate {
        samples
    } else {
        resample(
            &samples,
            to.channels,
            from.sample_rate as f64,
            to.sample_rate as f64,
        )
    }
}

/// Named voice-tone profile: a one-pole split into low and high bands,
/// remixed with per-band gains.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToneProfile {
    pub name: &'static str,
    alpha: f32,
    low_gain: f32,
    high_gain: f32,
}

/// Look up a tone profile by identifier.
pub fn tone_profile(name: &str) -> Option<ToneProfile> {
    match name {
        "warm" => Some(ToneProfile {
            name: "warm",
            alpha: 0.2,
            low_gain: 1.0,
            high_gain: 0.55,
        }),
        "bright" => Some(ToneProfile {
            name: "bright",
            alpha: 0.2,
            low_gain: 0.75,
            high_gain: 1.35,
        }),
        "telephone" => Some(ToneProfile {
            name: "telephone",
            alpha: 0.35,
            low_gain: 1.0,
            high_gain: 0.0,
        }),
        _ => None,
    }
}

/// Apply a tone profile to interleaved audio, filtering each channel
/// independently.
pub fn apply_tone(samples: &[f32], channels: u16, profile: &ToneProfile) -> Vec<f32> {
    let channels = channels.max(1) as usize;
    let mut out = vec![0.0f32; samples.len()];
    for ch in 0..channels {
        let mut lp = 0.0f32;
        let mut i = ch;
        while i < samples.len() {
            let x = samples[i];
            lp += profile.alpha * (x - lp);
            out[i] = profile.low_gain * lp + profile.high_gain * (x - lp);
            i += channels;
        }
    }
    out
}

/// Parameterless noise gate: attenuate samples while the per-channel
/// envelope sits under the threshold.
pub fn noise_gate(samples: &[f32], channels: u16) -> Vec<f32> {
    let channels = channels.max(1) as usize;
    let mut out = vec![0.0f32; samples.len()];
    for ch in 0..channels {
        let mut env = 0.0f32;
        let mut i = ch;
        while i < samples.len() {
            let x = samples[i];
            env += NOISE_GATE_ALPHA * (x.abs() - env);
            out[i] = if env < NOISE_GATE_THRESHOLD {
                x * NOISE_GATE_FLOOR
            } else {
                x
            };
            i += channels;
        }
    }
    out
}

/// RMS level of a buffer (0.0–1.0 for normalized audio).
pub fn rms_level(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f32 = samples.iter().map(|s| s * s).sum();
    (sum_sq / samples.len() as f32).sqrt()
}

/// Peak absolute level of a buffer.
pub fn peak_level(samples: &[f32]) -> f32 {
    samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max)
}
