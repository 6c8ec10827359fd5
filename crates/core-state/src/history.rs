//! Accepted-input history.

use tracing::trace;

/// Ordered, oldest-first list of accepted inputs.
///
/// The buffer only reads entries and appends to them; persistence is up to
/// the implementation.
pub trait History {
    fn append(&mut self, entry: &str);
    fn entries(&self) -> &[String];
}

#[derive(Debug, Default, Clone)]
pub struct InMemoryHistory {
    entries: Vec<String>,
    max_entries: Option<usize>,
}

impl InMemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep at most `max` entries, dropping the oldest.
    pub fn with_max_entries(max: usize) -> Self {
        Self {
            entries: Vec::new(),
            max_entries: Some(max.max(1)),
        }
    }

    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            entries: entries.into_iter().map(Into::into).collect(),
            max_entries: None,
        }
    }
}

impl History for InMemoryHistory {
    fn append(&mut self, entry: &str) {
        self.entries.push(entry.to_string());
        if let Some(max) = self.max_entries
            && self.entries.len() > max
        {
            let excess = self.entries.len() - max;
            self.entries.drain(..excess);
        }
        trace!(target: "state.history", len = self.entries.len(), "append");
    }

    fn entries(&self) -> &[String] {
        &self.entries
    }
}
