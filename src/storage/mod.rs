pub mod artifact;
pub mod memory;

use std::sync::Arc;

use parking_lot::Mutex;

pub use artifact::{ArtifactId, ArtifactStore, SealedArtifact};
pub use memory::MemoryArtifactStore;

/// Store handle shared between the recording side and the editing side.
pub type SharedStore = Arc<Mutex<dyn ArtifactStore>>;
