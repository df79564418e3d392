use serde::{Deserialize, Serialize};

use super::frame::AudioFormat;
use crate::storage::{ArtifactId, SealedArtifact};

/// Result returned when a recording session stops successfully.
///
/// Serializable for hand-off to project-level persistence; the audio
/// itself stays in the artifact store and is referenced by handle only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureOutcome {
    pub id: String,
    /// Sealed raw capture artifact.
    pub artifact: ArtifactId,
    /// Content address of the raw capture.
    pub checksum: String,
    /// Duration derived from the samples actually written, not wall time.
    pub duration_secs: f64,
    pub frames: u64,
    pub format: AudioFormat,
    pub created_at: String,
}

impl CaptureOutcome {
    pub fn new(sealed: &SealedArtifact, format: AudioFormat, frames: u64, samples: u64) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            artifact: sealed.id,
            checksum: sealed.checksum.clone(),
            duration_secs: format.samples_to_secs(samples as usize),
            frames,
            format,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}
