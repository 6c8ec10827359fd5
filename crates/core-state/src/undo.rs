use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::trace;

/// Default number of checkpoints retained in undo history.
pub const UNDO_HISTORY_MAX: usize = 200;

/// One undo checkpoint: the text and where the cursor was.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Checkpoint {
    pub text: String,
    pub cursor_position: usize,
    hash: u64,
}

impl Checkpoint {
    fn new(text: &str, cursor_position: usize) -> Self {
        Self {
            text: text.to_string(),
            cursor_position,
            hash: text_hash(text),
        }
    }

    fn same_text(&self, text: &str) -> bool {
        self.hash == text_hash(text) && self.text == text
    }
}

/// Undo and redo stacks of `(text, cursor)` checkpoints.
///
/// Checkpoints are saved *before* an edit, so the top of the undo stack
/// usually equals the current text; `undo` therefore pops until it finds a
/// checkpoint whose text differs.
pub struct UndoStack {
    undo_stack: Vec<Checkpoint>,
    redo_stack: Vec<Checkpoint>,
    max_depth: usize,
    /// Count of saves folded into the previous checkpoint because the text was unchanged.
    snapshots_skipped: AtomicU64,
}

impl Default for UndoStack {
    fn default() -> Self {
        Self::new(UNDO_HISTORY_MAX)
    }
}

impl UndoStack {
    pub fn new(max_depth: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_depth: max_depth.max(1),
            snapshots_skipped: AtomicU64::new(0),
        }
    }

    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }
    pub fn redo_depth(&self) -> usize {
        self.redo_stack.len()
    }
    pub fn snapshots_skipped(&self) -> u64 {
        self.snapshots_skipped.load(Ordering::Relaxed)
    }

    /// Save a checkpoint. An unchanged text only refreshes the cursor of the
    /// top checkpoint.
    pub fn save(&mut self, text: &str, cursor_position: usize, clear_redo: bool) {
        if let Some(last) = self.undo_stack.last_mut()
            && last.same_text(text)
        {
            last.cursor_position = cursor_position;
            self.snapshots_skipped.fetch_add(1, Ordering::Relaxed);
            trace!(target: "state.undo", undo_depth = self.undo_stack.len(), redo_depth = self.redo_stack.len(), "snapshot_dedupe_skip");
        } else {
            self.undo_stack.push(Checkpoint::new(text, cursor_position));
            trace!(target: "state.undo", undo_depth = self.undo_stack.len(), redo_depth = self.redo_stack.len(), "push_snapshot");
            if self.undo_stack.len() > self.max_depth {
                self.undo_stack.remove(0);
                trace!(target: "state.undo", "undo_stack_trimmed");
            }
        }
        if clear_redo && !self.redo_stack.is_empty() {
            self.redo_stack.clear();
            trace!(target: "state.undo", "redo_stack_cleared_on_new_edit");
        }
    }

    /// Pop to the newest checkpoint whose text differs from `current_text`,
    /// pushing the current state onto the redo stack.
    pub fn undo(&mut self, current_text: &str, current_cursor: usize) -> Option<(String, usize)> {
        while let Some(last) = self.undo_stack.pop() {
            trace!(target: "state.undo", undo_depth = self.undo_stack.len(), redo_depth = self.redo_stack.len(), "undo_pop");
            if !last.same_text(current_text) {
                self.redo_stack
                    .push(Checkpoint::new(current_text, current_cursor));
                return Some((last.text, last.cursor_position));
            }
        }
        None
    }

    /// Re-apply the most recently undone state, saving the current one for undo.
    pub fn redo(&mut self, current_text: &str, current_cursor: usize) -> Option<(String, usize)> {
        let next = self.redo_stack.pop()?;
        trace!(target: "state.undo", redo_depth = self.redo_stack.len(), undo_depth = self.undo_stack.len(), "redo_pop");
        self.save(current_text, current_cursor, false);
        Some((next.text, next.cursor_position))
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}

fn text_hash(text: &str) -> u64 {
    let mut h = DefaultHasher::new();
    text.hash(&mut h);
    h.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn undo_skips_checkpoint_equal_to_current_text() {
        let mut stack = UndoStack::default();
        stack.save("", 0, true);
        stack.save("a", 1, true);
        // Current text equals the top checkpoint; undo must go one further.
        assert_eq!(stack.undo("a", 1), Some((String::new(), 0)));
        assert_eq!(stack.undo("", 0), None);
        assert_eq!(stack.redo_depth(), 1);
    }

    #[test]
    fn dedupe_updates_cursor_only() {
        let mut stack = UndoStack::default();
        stack.save("abc", 0, true);
        stack.save("abc", 2, true);
        assert_eq!(stack.undo_depth(), 1);
        assert_eq!(stack.snapshots_skipped(), 1);
        assert_eq!(stack.undo("abcd", 4), Some(("abc".to_string(), 2)));
    }

    #[test]
    fn redo_round_trip_and_clear_on_new_edit() {
        let mut stack = UndoStack::default();
        stack.save("one", 3, true);
        let (text, cursor) = stack.undo("two", 3).unwrap();
        assert_eq!((text.as_str(), cursor), ("one", 3));
        assert_eq!(stack.redo("one", 3), Some(("two".to_string(), 3)));
        assert_eq!(stack.undo_depth(), 1);
        stack.undo("two", 3);
        stack.save("three", 5, true);
        assert_eq!(stack.redo_depth(), 0);
    }

    #[test]
    fn depth_is_bounded() {
        let mut stack = UndoStack::new(3);
        for i in 0..10 {
            stack.save(&i.to_string(), 0, true);
        }
        assert_eq!(stack.undo_depth(), 3);
    }
}
