use crate::models::error::EngineError;

/// Generic reversible command log with branch-discarding redo.
///
/// Parameterized over the command type so edits stay plain data. The
/// active slice is replay-stable: the transform pipeline can walk it
/// any number of times and get the same result.
#[derive(Debug, Clone)]
pub struct EditHistory<C> {
    applied: Vec<C>,
    undone: Vec<C>,
    revision: u64,
}

impl<C> Default for EditHistory<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> EditHistory<C> {
    pub fn new() -> Self {
        Self {
            applied: Vec::new(),
            undone: Vec::new(),
            revision: 0,
        }
    }

    /// Append a command and discard any redoable branch.
    pub fn apply(&mut self, command: C) {
        self.applied.push(command);
        self.undone.clear();
        self.revision += 1;
    }

    /// Move the most recent command to the redo buffer.
    pub fn undo(&mut self) -> Result<(), EngineError> {
        let command = self.applied.pop().ok_or(EngineError::NothingToUndo)?;
        self.undone.push(command);
        self.revision += 1;
        Ok(())
    }

    /// Re-apply the most recently undone command.
    pub fn redo(&mut self) -> Result<(), EngineError> {
        let command = self.undone.pop().ok_or(EngineError::NothingToRedo)?;
        self.applied.push(command);
        self.revision += 1;
        Ok(())
    }

    /// Ordered commands currently in effect.
    pub fn active(&self) -> &[C] {
        &self.applied
    }

    pub fn can_undo(&self) -> bool {
        !self.applied.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.undone.is_empty()
    }

    /// Counter bumped on every successful mutation. Consumers holding a
    /// derived result compare revisions to detect staleness.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn is_empty(&self) -> bool {
        self.applied.is_empty() && self.undone.is_empty()
    }
}
