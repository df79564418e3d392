use std::sync::Arc;

use crate::models::error::EngineError;
use crate::models::frame::{AudioFormat, AudioFrame};

/// Event pushed by a frame source into the recording controller.
#[derive(Debug, Clone)]
pub enum SourceEvent {
    /// A sequenced chunk of interleaved samples.
    Frame(AudioFrame),
    /// The source ended normally and will push no further frames.
    Closed,
    /// The source failed; the session moves to `Failed`.
    Fault(EngineError),
}

/// Callback a frame source delivers events through.
///
/// Fires on the source's own thread — implementations must keep work
/// minimal and must not block on visualization consumers.
pub type FrameSink = Arc<dyn Fn(SourceEvent) + Send + Sync + 'static>;

/// Interface for hardware/OS audio inputs.
///
/// Implemented by platform backends (WASAPI, Core Audio, ALSA) outside
/// this crate; tests use scripted sources.
pub trait FrameSource: Send {
    /// Whether the underlying device can currently supply frames.
    fn is_available(&self) -> bool;

    /// Fixed format of the frames this source produces.
    fn format(&self) -> AudioFormat;

    /// Begin delivering events through `sink`.
    ///
    /// Fails with `DeviceUnavailable` or `PermissionDenied` when the
    /// device cannot be acquired.
    fn start(&mut self, sink: FrameSink) -> Result<(), EngineError>;

    /// Stop delivering events and release the sink.
    ///
    /// The sink (and everything it captured) must be dropped before this
    /// returns; the controller relies on that to drain its write queue.
    fn stop(&mut self) -> Result<(), EngineError>;
}
