use std::collections::HashMap;
use std::sync::Arc;

use sha2::{Digest, Sha256};

use crate::models::error::EngineError;
use crate::models::frame::AudioFormat;

use super::artifact::{ArtifactId, ArtifactStore, SealedArtifact};

enum Slot {
    Open {
        format: AudioFormat,
        bytes: Vec<u8>,
    },
    Sealed {
        format: AudioFormat,
        bytes: Arc<[u8]>,
        checksum: String,
    },
}

/// In-process reference implementation of [`ArtifactStore`].
///
/// Used by tests and preview rendering; production stores back the same
/// contract with files. Sealing dedupes by content address: sealing bytes
/// that hash to an existing sealed artifact rebinds to that artifact and
/// drops the duplicate.
#[derive(Default)]
pub struct MemoryArtifactStore {
    slots: HashMap<ArtifactId, Slot>,
    by_checksum: HashMap<String, ArtifactId>,
    next_id: u64,
}

impl MemoryArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl ArtifactStore for MemoryArtifactStore {
    fn allocate(&mut self, format: AudioFormat) -> ArtifactId {
        self.next_id += 1;
        let id = ArtifactId::from_raw(self.next_id);
        self.slots.insert(
            id,
            Slot::Open {
                format,
                bytes: Vec::new(),
            },
        );
        log::debug!("allocated {id}");
        id
    }

    fn append(&mut self, id: ArtifactId, data: &[u8]) -> Result<(), EngineError> {
        match self.slots.get_mut(&id) {
            Some(Slot::Open { bytes, .. }) => {
                bytes.extend_from_slice(data);
                Ok(())
            }
            Some(Slot::Sealed { .. }) => Err(EngineError::Storage(format!(
                "{id} is sealed and immutable"
            ))),
            None => Err(EngineError::MissingReference(id)),
        }
    }

    fn seal(&mut self, id: ArtifactId) -> Result<SealedArtifact, EngineError> {
        match self.slots.get(&id) {
            Some(Slot::Sealed {
                bytes, checksum, ..
            }) => Ok(SealedArtifact {
                id,
                checksum: checksum.clone(),
                byte_len: bytes.len() as u64,
            }),
            Some(Slot::Open { .. }) => {
                let Some(Slot::Open { format, bytes }) = self.slots.remove(&id) else {
                    unreachable!()
                };
                let checksum = hex_digest(&bytes);

                // Content-address dedupe: rebind to an existing sealed twin.
                if let Some(&existing) = self.by_checksum.get(&checksum) {
                    if let Some(Slot::Sealed {
                        bytes: existing_bytes,
                        ..
                    }) = self.slots.get(&existing)
                    {
                        log::debug!("{id} deduped to {existing}");
                        return Ok(SealedArtifact {
                            id: existing,
                            checksum,
                            byte_len: existing_bytes.len() as u64,
                        });
                    }
                }

                let byte_len = bytes.len() as u64;
                self.by_checksum.insert(checksum.clone(), id);
                self.slots.insert(
                    id,
                    Slot::Sealed {
                        format,
                        bytes: Arc::from(bytes),
                        checksum: checksum.clone(),
                    },
                );
                log::debug!("sealed {id} ({byte_len} bytes, {checksum})");
                Ok(SealedArtifact {
                    id,
                    checksum,
                    byte_len,
                })
            }
            None => Err(EngineError::MissingReference(id)),
        }
    }

    fn read(&self, id: ArtifactId) -> Result<Arc<[u8]>, EngineError> {
        match self.slots.get(&id) {
            Some(Slot::Sealed { bytes, .. }) => Ok(Arc::clone(bytes)),
            Some(Slot::Open { .. }) => {
                Err(EngineError::Storage(format!("{id} is not sealed")))
            }
            None => Err(EngineError::MissingReference(id)),
        }
    }

    fn format(&self, id: ArtifactId) -> Result<AudioFormat, EngineError> {
        match self.slots.get(&id) {
            Some(Slot::Open { format, .. }) | Some(Slot::Sealed { format, .. }) => Ok(*format),
            None => Err(EngineError::MissingReference(id)),
        }
    }

    fn contains(&self, id: ArtifactId) -> bool {
        self.slots.contains_key(&id)
    }

    fn is_sealed(&self, id: ArtifactId) -> bool {
        matches!(self.slots.get(&id), Some(Slot::Sealed { .. }))
    }

    fn release(&mut self, id: ArtifactId) -> Result<(), EngineError> {
        match self.slots.remove(&id) {
            Some(Slot::Sealed { checksum, .. }) => {
                if self.by_checksum.get(&checksum) == Some(&id) {
                    self.by_checksum.remove(&checksum);
                }
                Ok(())
            }
            Some(Slot::Open { .. }) => Ok(()),
            None => Err(EngineError::MissingReference(id)),
        }
    }
}

fn hex_digest(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}
