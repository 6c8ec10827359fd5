//! Completion values, the completer capability and the cycling state.

use core_text::Document;

/// A candidate replacing `-start_position` chars before the cursor with `text`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Completion {
    pub text: String,
    /// Zero or negative.
    pub start_position: isize,
    pub display: Option<String>,
    pub display_meta: Option<String>,
}

impl Completion {
    /// `start_position` is clamped to be non-positive.
    pub fn new(text: impl Into<String>, start_position: isize) -> Self {
        Self {
            text: text.into(),
            start_position: start_position.min(0),
            display: None,
            display_meta: None,
        }
    }

    pub fn with_display(mut self, display: impl Into<String>) -> Self {
        self.display = Some(display.into());
        self
    }

    pub fn with_meta(mut self, meta: impl Into<String>) -> Self {
        self.display_meta = Some(meta.into());
        self
    }

    /// Text shown in the menu.
    pub fn display_text(&self) -> &str {
        self.display.as_deref().unwrap_or(&self.text)
    }
}

/// Why completions are being requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CompleteEvent {
    /// Triggered by typing (complete-while-typing).
    pub text_inserted: bool,
    /// Explicitly requested (Tab, C-Space).
    pub completion_requested: bool,
}

impl CompleteEvent {
    pub fn requested() -> Self {
        Self {
            text_inserted: false,
            completion_requested: true,
        }
    }

    pub fn typed() -> Self {
        Self {
            text_inserted: true,
            completion_requested: false,
        }
    }
}

/// Source of completions. Must be a pure function of the document so it can
/// run on the background worker.
pub trait Completer: Send + Sync {
    fn get_completions(&self, document: &Document, event: &CompleteEvent) -> Vec<Completion>;
}

impl<F> Completer for F
where
    F: Fn(&Document, &CompleteEvent) -> Vec<Completion> + Send + Sync,
{
    fn get_completions(&self, document: &Document, event: &CompleteEvent) -> Vec<Completion> {
        self(document, event)
    }
}

/// Active completion menu: candidates computed for `original_document` and
/// the selected index (`None` shows the original text).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionState {
    pub original_document: Document,
    pub completions: Vec<Completion>,
    pub complete_index: Option<usize>,
}

impl CompletionState {
    pub fn new(original_document: Document, completions: Vec<Completion>) -> Self {
        Self {
            original_document,
            completions,
            complete_index: None,
        }
    }

    pub fn go_to_index(&mut self, index: Option<usize>) {
        self.complete_index = index.filter(|i| *i < self.completions.len());
    }

    pub fn current_completion(&self) -> Option<&Completion> {
        self.complete_index.and_then(|i| self.completions.get(i))
    }

    /// Text and cursor for the selected candidate applied to the original document.
    pub fn new_text_and_position(&self) -> (String, usize) {
        let doc = &self.original_document;
        let Some(c) = self.current_completion() else {
            return (doc.text().to_string(), doc.cursor_position());
        };
        let cursor = doc.cursor_position();
        let keep = cursor.saturating_sub(c.start_position.unsigned_abs());
        let before = doc.slice(0, keep);
        let after = doc.text_after_cursor();
        let text = format!("{before}{}{after}", c.text);
        (text, keep + c.text.chars().count())
    }
}

/// Longest prefix shared by every completion once the typed part is removed.
pub fn common_suffix_to_insert(document: &Document, completions: &[Completion]) -> String {
    let typed_tail = |c: &Completion| -> Option<String> {
        let replaced = c.start_position.unsigned_abs();
        let before = document.text_before_cursor();
        let replaced_text: String = before
            .chars()
            .skip(before.chars().count().saturating_sub(replaced))
            .collect();
        c.text
            .strip_prefix(replaced_text.as_str())
            .map(str::to_string)
    };
    let mut tails = completions.iter().map(typed_tail);
    let Some(Some(first)) = tails.next() else {
        return String::new();
    };
    let mut common: Vec<char> = first.chars().collect();
    for tail in tails {
        let Some(tail) = tail else {
            return String::new();
        };
        let shared = common
            .iter()
            .zip(tail.chars())
            .take_while(|(a, b)| **a == *b)
            .count();
        common.truncate(shared);
    }
    common.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn applying_candidate_replaces_word_before_cursor() {
        let doc = Document::new("print(fo) x", 8);
        let mut state = CompletionState::new(
            doc,
            vec![Completion::new("foo", -2), Completion::new("format", -2)],
        );
        state.go_to_index(Some(1));
        assert_eq!(state.new_text_and_position(), ("print(format) x".to_string(), 12));
        state.go_to_index(None);
        assert_eq!(state.new_text_and_position(), ("print(fo) x".to_string(), 8));
    }

    #[test]
    fn out_of_range_index_deselects() {
        let mut state = CompletionState::new(Document::default(), vec![Completion::new("a", 0)]);
        state.go_to_index(Some(5));
        assert_eq!(state.complete_index, None);
    }

    #[test]
    fn common_part() {
        let doc = Document::at_end("im");
        let completions = vec![
            Completion::new("import", -2),
            Completion::new("imports", -2),
            Completion::new("impossible", -2),
        ];
        assert_eq!(common_suffix_to_insert(&doc, &completions), "p");
    }
}
