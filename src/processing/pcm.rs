use crate::traits::codec::AudioCodec;

/// Built-in 16-bit little-endian PCM codec.
///
/// Out-of-range samples are clamped at encode time; both directions are
/// deterministic, which the render cache relies on.
#[derive(Debug, Clone, Copy, Default)]
pub struct PcmCodec;

impl AudioCodec for PcmCodec {
    fn decode(&self, bytes: &[u8]) -> Vec<f32> {
        bytes
            .chunks_exact(2)
            .map(|pair| {
                let v = i16::from_le_bytes([pair[0], pair[1]]);
                v as f32 / i16::MAX as f32
            })
            .collect()
    }

    fn encode(&self, samples: &[f32]) -> Vec<u8> {
        let mut data = Vec::with_capacity(samples.len() * 2);
        for &sample in samples {
            let clamped = sample.clamp(-1.0, 1.0);
            let value = (clamped * i16::MAX as f32) as i16;
            data.extend_from_slice(&value.to_le_bytes());
        }
        data
    }
}
