pub mod amplitude;
pub mod dsp;
pub mod pcm;

pub use amplitude::{AmplitudeFeed, AmplitudeReducer};
pub use pcm::PcmCodec;
