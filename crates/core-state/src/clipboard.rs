//! Kill ring and Vi named registers.
//!
//! The unnamed register is the head of the kill ring. Emacs yank-pop rotates
//! the ring; Vi `"a`..`"z` registers hold their own copies, uppercase names
//! append to the lowercase slot. Every write to a named register also lands
//! in the ring so a bare `p` pastes it.

use std::collections::VecDeque;

use core_text::{ClipboardData, SelectionKind};
use tracing::trace;

/// Kill ring capacity.
pub const KILL_RING_MAX: usize = 60;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ClipboardMetrics {
    pub writes: u64,
    pub ring_rotations: u64,
    pub ring_evictions: u64,
}

#[derive(Debug, Clone)]
pub struct Clipboard {
    ring: VecDeque<ClipboardData>,
    named: [Option<ClipboardData>; 26],
    metrics: ClipboardMetrics,
}

impl Default for Clipboard {
    fn default() -> Self {
        Self {
            ring: VecDeque::new(),
            named: std::array::from_fn(|_| None),
            metrics: ClipboardMetrics::default(),
        }
    }
}

fn named_index(c: char) -> Option<usize> {
    c.is_ascii_alphabetic()
        .then(|| (c.to_ascii_lowercase() as u8 - b'a') as usize)
}

impl Clipboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push onto the ring, making it the unnamed register.
    pub fn set_data(&mut self, data: ClipboardData) {
        self.ring.push_front(data);
        if self.ring.len() > KILL_RING_MAX {
            self.ring.pop_back();
            self.metrics.ring_evictions += 1;
        }
        self.metrics.writes += 1;
        trace!(target: "state.clipboard", ring = self.ring.len(), "set_data");
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.set_data(ClipboardData::characters(text));
    }

    /// Head of the ring; empty characters data when nothing was killed yet.
    pub fn get_data(&self) -> ClipboardData {
        self.ring.front().cloned().unwrap_or_default()
    }

    /// Move the head to the back (Emacs yank-pop).
    pub fn rotate(&mut self) {
        if let Some(head) = self.ring.pop_front() {
            self.ring.push_back(head);
            self.metrics.ring_rotations += 1;
            trace!(target: "state.clipboard", "rotate");
        }
    }

    /// Write register `name`. Uppercase appends to the existing content.
    pub fn set_register(&mut self, name: char, data: ClipboardData) {
        let Some(idx) = named_index(name) else {
            self.set_data(data);
            return;
        };
        let stored = match (&self.named[idx], name.is_ascii_uppercase()) {
            (Some(existing), true) => {
                let sep = if existing.kind == SelectionKind::Lines { "\n" } else { "" };
                ClipboardData::new(format!("{}{sep}{}", existing.text, data.text), existing.kind)
            }
            _ => data,
        };
        self.named[idx] = Some(stored.clone());
        trace!(target: "state.clipboard", register = %name.to_ascii_lowercase(), "set_register");
        self.set_data(stored);
    }

    pub fn get_register(&self, name: char) -> Option<&ClipboardData> {
        named_index(name).and_then(|idx| self.named[idx].as_ref())
    }

    /// Register content if `name` is given, the ring head otherwise.
    pub fn read(&self, name: Option<char>) -> ClipboardData {
        match name {
            Some(name) => self.get_register(name).cloned().unwrap_or_default(),
            None => self.get_data(),
        }
    }

    /// Write to register `name` if given, the ring otherwise.
    pub fn write(&mut self, name: Option<char>, data: ClipboardData) {
        match name {
            Some(name) => self.set_register(name, data),
            None => self.set_data(data),
        }
    }

    pub fn ring_len(&self) -> usize {
        self.ring.len()
    }

    pub fn metrics(&self) -> ClipboardMetrics {
        self.metrics
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ring_rotation_cycles_entries() {
        let mut clip = Clipboard::new();
        clip.set_text("one");
        clip.set_text("two");
        assert_eq!(clip.get_data().text, "two");
        clip.rotate();
        assert_eq!(clip.get_data().text, "one");
        clip.rotate();
        assert_eq!(clip.get_data().text, "two");
        assert_eq!(clip.metrics().ring_rotations, 2);
    }

    #[test]
    fn ring_is_bounded() {
        let mut clip = Clipboard::new();
        for i in 0..(KILL_RING_MAX + 5) {
            clip.set_text(i.to_string());
        }
        assert_eq!(clip.ring_len(), KILL_RING_MAX);
        assert_eq!(clip.metrics().ring_evictions, 5);
    }

    #[test]
    fn uppercase_register_appends() {
        let mut clip = Clipboard::new();
        clip.set_register('a', ClipboardData::characters("foo"));
        clip.set_register('A', ClipboardData::characters("bar"));
        assert_eq!(clip.get_register('a').unwrap().text, "foobar");
        assert_eq!(clip.get_data().text, "foobar");
        assert_eq!(clip.read(Some('z')), ClipboardData::default());
    }

    #[test]
    fn linewise_append_joins_with_newline() {
        let mut clip = Clipboard::new();
        clip.set_register('b', ClipboardData::new("x", SelectionKind::Lines));
        clip.set_register('B', ClipboardData::new("y", SelectionKind::Lines));
        assert_eq!(clip.get_register('b').unwrap().text, "x\ny");
    }
}
