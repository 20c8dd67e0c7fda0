//! Linear undo/redo over adjustment snapshots.
//!
//! The undo stack always holds at least one entry; its top is the current
//! state. Committing a state equal to the current one is ignored, so
//! repeated slider releases at the same value do not pile up.

use tracing::trace;

use crate::adjustments::Adjustments;

/// Edit history.
#[derive(Debug, Clone, PartialEq)]
pub struct History {
    undo_stack: Vec<Adjustments>,
    redo_stack: Vec<Adjustments>,
}

impl Default for History {
    fn default() -> Self {
        Self::new(Adjustments::default())
    }
}

impl History {
    /// Starts a history at `initial`.
    pub fn new(initial: Adjustments) -> Self {
        Self {
            undo_stack: vec![initial],
            redo_stack: Vec::new(),
        }
    }

    /// Current state.
    pub fn current(&self) -> &Adjustments {
        // never empty: constructed with one entry and undo keeps the last
        &self.undo_stack[self.undo_stack.len() - 1]
    }

    /// Records `state`. Returns `false` if it equals the current state.
    ///
    /// A successful commit clears the redo stack.
    pub fn commit(&mut self, state: Adjustments) -> bool {
        if *self.current() == state {
            return false;
        }
        self.undo_stack.push(state);
        self.redo_stack.clear();
        trace!(depth = self.undo_stack.len(), "history commit");
        true
    }

    /// Steps back one state and returns it.
    pub fn undo(&mut self) -> Option<&Adjustments> {
        if !self.can_undo() {
            return None;
        }
        let top = self.undo_stack.pop()?;
        self.redo_stack.push(top);
        Some(self.current())
    }

    /// Re-applies the most recently undone state and returns it.
    pub fn redo(&mut self) -> Option<&Adjustments> {
        let state = self.redo_stack.pop()?;
        self.undo_stack.push(state);
        Some(self.current())
    }

    /// Returns `true` if there is a state to go back to.
    pub fn can_undo(&self) -> bool {
        self.undo_stack.len() > 1
    }

    /// Returns `true` if an undone state can be re-applied.
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Number of states on the undo stack, current included.
    pub fn depth(&self) -> usize {
        self.undo_stack.len()
    }

    /// Drops all history and starts over at `initial`.
    pub fn reset(&mut self, initial: Adjustments) {
        self.undo_stack.clear();
        self.undo_stack.push(initial);
        self.redo_stack.clear();
    }
}
