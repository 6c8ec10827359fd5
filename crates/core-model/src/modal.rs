//! Explicit result channel for sub-dialogs.
//!
//! Opening a dialog pushes a pending slot holding the node to refocus and a
//! callback. Whoever produces the result calls [`ModalStack::complete`] from
//! the event loop; the callback then resumes the parent's work with the
//! context passed in. Only the innermost dialog can complete.

use tracing::debug;

use crate::layout::NodeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModalId(u64);

type Callback<Ctx, T> = Box<dyn FnOnce(&mut Ctx, T)>;

struct Pending<Ctx, T> {
    id: ModalId,
    return_focus: Option<NodeId>,
    on_complete: Callback<Ctx, T>,
}

pub struct ModalStack<Ctx, T> {
    pending: Vec<Pending<Ctx, T>>,
    next_id: u64,
}

impl<Ctx, T> Default for ModalStack<Ctx, T> {
    fn default() -> Self {
        Self {
            pending: Vec::new(),
            next_id: 0,
        }
    }
}

impl<Ctx, T> std::fmt::Debug for ModalStack<Ctx, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModalStack")
            .field("depth", &self.pending.len())
            .finish()
    }
}

impl<Ctx, T> ModalStack<Ctx, T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, return_focus: Option<NodeId>, on_complete: impl FnOnce(&mut Ctx, T) + 'static) -> ModalId {
        let id = ModalId(self.next_id);
        self.next_id += 1;
        self.pending.push(Pending {
            id,
            return_focus,
            on_complete: Box::new(on_complete),
        });
        debug!(target: "model.layout", depth = self.pending.len(), "modal_push");
        id
    }

    /// Deliver `result` to the innermost dialog. Returns the node to
    /// refocus, or `None` when nothing was pending.
    pub fn complete(&mut self, ctx: &mut Ctx, result: T) -> Option<Option<NodeId>> {
        let pending = self.pending.pop()?;
        debug!(target: "model.layout", depth = self.pending.len(), "modal_complete");
        (pending.on_complete)(ctx, result);
        Some(pending.return_focus)
    }

    /// Drop the innermost dialog without running its callback.
    pub fn cancel(&mut self) -> Option<Option<NodeId>> {
        let pending = self.pending.pop()?;
        debug!(target: "model.layout", depth = self.pending.len(), "modal_cancel");
        Some(pending.return_focus)
    }

    pub fn top(&self) -> Option<ModalId> {
        self.pending.last().map(|p| p.id)
    }

    pub fn depth(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{Layout, Window};
    use crate::control::{Control, TextControl};

    #[test]
    fn innermost_completes_first() {
        let mut layout = Layout::new();
        let node = layout.add_window(Window::new(Control::Text(TextControl::default())));
        let mut stack: ModalStack<Vec<String>, String> = ModalStack::new();
        let outer = stack.push(None, |log: &mut Vec<String>, r| log.push(format!("outer:{r}")));
        let inner = stack.push(Some(node), |log: &mut Vec<String>, r| log.push(format!("inner:{r}")));
        assert_ne!(outer, inner);
        assert_eq!(stack.top(), Some(inner));

        let mut log = Vec::new();
        assert_eq!(stack.complete(&mut log, "a".into()), Some(Some(node)));
        assert_eq!(stack.complete(&mut log, "b".into()), Some(None));
        assert_eq!(stack.complete(&mut log, "c".into()), None);
        assert_eq!(log, vec!["inner:a", "outer:b"]);
    }

    #[test]
    fn cancel_skips_callback() {
        let mut stack: ModalStack<u32, u32> = ModalStack::new();
        stack.push(None, |total, n| *total += n);
        assert_eq!(stack.depth(), 1);
        assert_eq!(stack.cancel(), Some(None));
        let mut total = 0;
        assert_eq!(stack.complete(&mut total, 5), None);
        assert_eq!(total, 0);
        assert!(stack.is_empty());
    }
}
