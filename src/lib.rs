//! # audio-edit-core
//!
//! Audio capture and non-destructive editing engine.
//!
//! Captures live audio behind a recording state machine, reduces frames
//! to a bounded amplitude feed for visualization, and records edits
//! (trim, pitch shift, tone change, noise reduction, mixing) in a
//! reversible history that is replayed deterministically over the raw
//! capture. Platform audio backends implement the `FrameSource` trait;
//! on-disk artifact storage implements `ArtifactStore`.
//!
//! ## Architecture
//!
//! ```text
//! audio-edit-core (this crate)
//! ├── traits/       ← FrameSource, RecorderDelegate, AudioCodec
//! ├── models/       ← EngineError, RecorderState, EditCommand, AudioFrame, etc.
//! ├── processing/   ← AmplitudeReducer, DSP operations, PCM codec
//! ├── history/      ← EditHistory (generic reversible command log)
//! ├── pipeline/     ← TransformPipeline (deterministic replay + cache)
//! ├── session/      ← RecordingController, AudioProject (orchestrators)
//! └── storage/      ← ArtifactStore contract, MemoryArtifactStore
//! ```
//!
//! ## Data flow
//!
//! ```text
//! [FrameSource] → [RecordingController] ─┬→ [AmplitudeFeed] → UI (best effort)
//!                                        └→ [ArtifactStore]   (raw capture)
//! edits → [EditHistory] → [TransformPipeline] → [ArtifactStore] → export
//! ```

pub mod history;
pub mod models;
pub mod pipeline;
pub mod processing;
pub mod session;
pub mod storage;
pub mod traits;

// Re-export key types at crate root for convenience.
pub use history::EditHistory;
pub use models::command::{EditCommand, MAX_PITCH_RATIO, MIN_PITCH_RATIO};
pub use models::config::RecorderConfig;
pub use models::error::EngineError;
pub use models::frame::{AmplitudeSample, AudioFormat, AudioFrame};
pub use models::outcome::CaptureOutcome;
pub use models::state::RecorderState;
pub use pipeline::{CancelToken, TransformPipeline};
pub use processing::amplitude::{AmplitudeFeed, AmplitudeReducer};
pub use processing::pcm::PcmCodec;
pub use session::project::AudioProject;
pub use session::recorder::RecordingController;
pub use storage::{ArtifactId, ArtifactStore, MemoryArtifactStore, SealedArtifact, SharedStore};
pub use traits::codec::AudioCodec;
pub use traits::delegate::RecorderDelegate;
pub use traits::frame_source::{FrameSink, FrameSource, SourceEvent};
