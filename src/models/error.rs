use thiserror::Error;

use crate::storage::ArtifactId;

/// Errors that can occur in the capture and editing engine.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EngineError {
    #[error("audio device not available")]
    DeviceUnavailable,

    #[error("permission denied")]
    PermissionDenied,

    /// Fatal capture integrity error: a frame arrived out of order or
    /// duplicated. The session fails and must be reset.
    #[error("frame sequence violation: expected seq > {expected_after}, got {got}")]
    FrameSequenceViolation { expected_after: u64, got: u64 },

    /// A state-machine operation was called from the wrong state.
    #[error("cannot {action} while {from}")]
    InvalidTransition {
        action: &'static str,
        from: &'static str,
    },

    #[error("nothing to undo")]
    NothingToUndo,

    #[error("nothing to redo")]
    NothingToRedo,

    #[error("invalid trim range: {0}")]
    InvalidRange(String),

    #[error("parameter out of range: {0}")]
    ParameterOutOfRange(String),

    #[error("unknown tone profile: {0:?}")]
    UnknownProfile(String),

    #[error("missing reference: {0} does not resolve")]
    MissingReference(ArtifactId),

    /// A recomputation was superseded by a newer history mutation.
    /// Expected during editing, never surfaced as a user error.
    #[error("recompute cancelled")]
    RecomputeCancelled,

    #[error("storage error: {0}")]
    Storage(String),
}

impl EngineError {
    /// Whether the error aborts the owning recording session.
    pub fn is_fatal_capture_error(&self) -> bool {
        matches!(
            self,
            Self::DeviceUnavailable
                | Self::PermissionDenied
                | Self::FrameSequenceViolation { .. }
        )
    }
}
