use crate::history::EditHistory;
use crate::models::command::EditCommand;
use crate::models::error::EngineError;
use crate::models::frame::AudioFormat;
use crate::pipeline::{CancelToken, TransformPipeline};
use crate::processing::pcm::PcmCodec;
use crate::storage::{ArtifactId, SealedArtifact, SharedStore};

/// Editing surface over one sealed raw capture.
///
/// Owns the project's single [`EditHistory`] and replays it through the
/// transform pipeline: the current artifact is always a pure function of
/// (raw capture, active commands), never hand-edited state. History
/// mutations are serialized by `&mut self`; each one supersedes any
/// in-flight recomputation by cancelling its token.
pub struct AudioProject {
    store: SharedStore,
    raw: SealedArtifact,
    format: AudioFormat,
    history: EditHistory<EditCommand>,
    pipeline: TransformPipeline,
    /// Rendered artifact for a history revision, if fresh.
    current: Option<(u64, ArtifactId)>,
    cancel: CancelToken,
}

impl AudioProject {
    /// Open a project over a sealed raw artifact.
    pub fn new(store: SharedStore, raw: ArtifactId) -> Result<Self, EngineError> {
        let (raw, format) = {
            let mut guard = store.lock();
            // Seal is idempotent; this both verifies the handle resolves
            // and yields the content address.
            let sealed = guard.seal(raw)?;
            let format = guard.format(sealed.id)?;
            (sealed, format)
        };
        Ok(Self {
            store,
            raw,
            format,
            history: EditHistory::new(),
            pipeline: TransformPipeline::new(Box::new(PcmCodec)),
            current: None,
            cancel: CancelToken::new(),
        })
    }

    pub fn raw_artifact(&self) -> ArtifactId {
        self.raw.id
    }

    pub fn format(&self) -> AudioFormat {
        self.format
    }

    pub fn history(&self) -> &EditHistory<EditCommand> {
        &self.history
    }

    /// Token observed by any externally driven render of this project.
    /// It is cancelled (and replaced) by the next history mutation.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Record an edit. Validation runs first; a rejected command leaves
    /// the history and the current artifact exactly as they were.
    pub fn apply_edit(&mut self, command: EditCommand) -> Result<(), EngineError> {
        if command.is_redundant_after(self.history.active().last()) {
            log::debug!("coalescing redundant {} command", command.kind());
            return Ok(());
        }

        let duration = self.duration_secs()?;
        {
            let store = self.store.lock();
            TransformPipeline::validate(&*store, duration, &command)?;
        }

        log::debug!("applying {} (revision {})", command.kind(), self.history.revision() + 1);
        self.history.apply(command);
        self.supersede();
        Ok(())
    }

    /// Move the last command to the redo buffer.
    pub fn undo(&mut self) -> Result<(), EngineError> {
        self.history.undo()?;
        self.supersede();
        Ok(())
    }

    /// Re-apply the most recently undone command.
    pub fn redo(&mut self) -> Result<(), EngineError> {
        self.history.redo()?;
        self.supersede();
        Ok(())
    }

    /// Handle to the current audio artifact, recomputing it if the
    /// history changed since the last render.
    pub fn current_artifact(&mut self) -> Result<ArtifactId, EngineError> {
        let revision = self.history.revision();
        if let Some((cached_revision, id)) = self.current {
            if cached_revision == revision && self.store.lock().is_sealed(id) {
                return Ok(id);
            }
        }

        let token = self.cancel.clone();
        let id = {
            let mut store = self.store.lock();
            self.pipeline
                .render(&mut *store, self.raw.id, self.history.active(), &token)?
        };
        self.current = Some((revision, id));
        Ok(id)
    }

    /// Duration of the current artifact in seconds.
    pub fn duration_secs(&mut self) -> Result<f64, EngineError> {
        let id = self.current_artifact()?;
        let store = self.store.lock();
        let bytes = store.read(id)?;
        Ok(self.format.pcm16_duration_secs(bytes.len() as u64))
    }

    /// Cancel any in-flight recomputation and hand out a fresh token for
    /// the next one.
    fn supersede(&mut self) {
        self.cancel.cancel();
        self.cancel = CancelToken::new();
        self.current = None;
    }
}
