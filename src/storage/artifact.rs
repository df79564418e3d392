use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::error::EngineError;
use crate::models::frame::AudioFormat;

/// Opaque handle to an audio artifact held by an [`ArtifactStore`].
///
/// Components pass handles around instead of raw buffers, so undo and
/// history rewrites only rebind handles and never deep-copy audio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactId(u64);

impl ArtifactId {
    /// Build a handle from a raw store-assigned value.
    ///
    /// Intended for store implementations; other components should treat
    /// handles as opaque.
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ArtifactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "artifact-{}", self.0)
    }
}

/// Receipt returned when an artifact is sealed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedArtifact {
    /// Handle the sealed content is bound to. May differ from the handle
    /// passed to `seal` when the store dedupes identical content.
    pub id: ArtifactId,
    /// SHA-256 hex digest of the artifact bytes (the content address).
    pub checksum: String,
    pub byte_len: u64,
}

/// Contract for artifact storage.
///
/// The engine defines addressing and lifetime; on-disk layout, compression
/// and container formats belong to the implementation. Lifecycle of one
/// artifact:
///
/// ```text
/// allocate → append* → seal → read* → release
/// ```
///
/// Appending to a sealed artifact and reading an unsealed one are errors.
/// Sealing is idempotent: sealing an already sealed artifact returns its
/// existing receipt.
pub trait ArtifactStore: Send {
    /// Open a new, empty, writable artifact.
    fn allocate(&mut self, format: AudioFormat) -> ArtifactId;

    /// Append bytes to an open artifact.
    fn append(&mut self, id: ArtifactId, bytes: &[u8]) -> Result<(), EngineError>;

    /// Freeze an artifact and compute its content address.
    fn seal(&mut self, id: ArtifactId) -> Result<SealedArtifact, EngineError>;

    /// Read the full contents of a sealed artifact.
    fn read(&self, id: ArtifactId) -> Result<std::sync::Arc<[u8]>, EngineError>;

    /// Audio format the artifact was allocated with.
    fn format(&self, id: ArtifactId) -> Result<AudioFormat, EngineError>;

    fn contains(&self, id: ArtifactId) -> bool;

    fn is_sealed(&self, id: ArtifactId) -> bool;

    /// Drop an artifact. Releasing an unknown handle is an error.
    fn release(&mut self, id: ArtifactId) -> Result<(), EngineError>;

    /// Store a complete buffer as a sealed artifact in one call.
    fn import(&mut self, format: AudioFormat, bytes: &[u8]) -> Result<SealedArtifact, EngineError> {
        let id = self.allocate(format);
        self.append(id, bytes)?;
        self.seal(id)
    }
}
