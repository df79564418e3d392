pub mod codec;
pub mod delegate;
pub mod frame_source;

pub use codec::AudioCodec;
pub use delegate::RecorderDelegate;
pub use frame_source::{FrameSink, FrameSource, SourceEvent};
