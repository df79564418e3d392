/// Sample codec used at the artifact boundary.
///
/// The pipeline treats encode/decode as a black box; artifacts hold
/// whatever bytes the codec produces. The built-in
/// [`crate::processing::pcm::PcmCodec`] stores 16-bit little-endian PCM;
/// real container formats live behind the same seam.
pub trait AudioCodec: Send + Sync {
    /// Decode artifact bytes to normalized interleaved samples.
    fn decode(&self, bytes: &[u8]) -> Vec<f32>;

    /// Encode normalized interleaved samples to artifact bytes.
    ///
    /// Must be deterministic: equal input always produces equal bytes.
    fn encode(&self, samples: &[f32]) -> Vec<u8>;
}
