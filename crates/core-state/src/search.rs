//! Incremental search across the buffer and its history.
//!
//! Search walks `working_lines`: when the current entry has no further match
//! the next (or previous) entry is tried, wrapping around. A failed query
//! length is remembered so typing more characters does not rescan.

use core_text::Document;
use tracing::{debug, trace};

use crate::buffer::Buffer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchDirection {
    #[default]
    Forward,
    Backward,
}

impl SearchDirection {
    pub fn reversed(self) -> Self {
        match self {
            SearchDirection::Forward => SearchDirection::Backward,
            SearchDirection::Backward => SearchDirection::Forward,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SearchState {
    pub text: String,
    pub direction: SearchDirection,
    pub ignore_case: bool,
}

impl SearchState {
    pub fn new(text: impl Into<String>, direction: SearchDirection) -> Self {
        Self {
            text: text.into(),
            direction,
            ignore_case: false,
        }
    }

    /// Same query, opposite direction (`N`).
    pub fn invert(&self) -> Self {
        Self {
            direction: self.direction.reversed(),
            ..self.clone()
        }
    }
}

/// An incremental search in progress.
#[derive(Debug, Clone)]
pub struct IsearchState {
    pub state: SearchState,
    /// Where the search started, restored on abort.
    pub origin_working_index: usize,
    pub origin_document: Document,
    /// Query length from which nothing matches.
    pub no_match_from_index: Option<usize>,
}

impl IsearchState {
    pub fn failing(&self) -> bool {
        self.no_match_from_index.is_some()
    }
}

/// Find `state.text` starting at `(working_index, document)`, hopping across
/// `working_lines` with wrap-around. Returns the new working index and cursor.
fn search_lines(
    working_lines: &[String],
    working_index: usize,
    document: &Document,
    state: &SearchState,
    include_current_position: bool,
    count: usize,
) -> Option<(usize, usize)> {
    if state.text.is_empty() || working_lines.is_empty() {
        return None;
    }
    let total = working_lines.len();
    let search_once = |index: usize, doc: &Document, include_current: bool| -> Option<(usize, usize)> {
        match state.direction {
            SearchDirection::Forward => {
                if let Some(delta) = doc.find(&state.text, false, include_current, state.ignore_case, 1) {
                    return Some((index, doc.offset_cursor(delta)));
                }
                (1..=total).find_map(|step| {
                    let i = (index + step) % total;
                    let candidate = Document::new(working_lines[i].clone(), 0);
                    candidate
                        .find(&state.text, false, true, state.ignore_case, 1)
                        .map(|delta| (i, candidate.offset_cursor(delta)))
                })
            }
            SearchDirection::Backward => {
                if let Some(delta) = doc.find_backwards(&state.text, false, state.ignore_case, 1) {
                    return Some((index, doc.offset_cursor(delta)));
                }
                (1..=total).find_map(|step| {
                    let i = (index + total - step) % total;
                    let candidate = Document::at_end(working_lines[i].clone());
                    candidate
                        .find_backwards(&state.text, false, state.ignore_case, 1)
                        .map(|delta| (i, candidate.offset_cursor(delta)))
                })
            }
        }
    };

    let mut position = search_once(working_index, document, include_current_position)?;
    for _ in 1..count.max(1) {
        let doc = Document::new(working_lines[position.0].clone(), position.1);
        match search_once(position.0, &doc, false) {
            Some(next) => position = next,
            None => break,
        }
    }
    Some(position)
}

impl Buffer {
    pub fn isearch(&self) -> Option<&IsearchState> {
        self.isearch.as_ref()
    }

    pub fn last_search(&self) -> Option<&SearchState> {
        self.last_search.as_ref()
    }

    /// Begin an incremental search from the current position.
    pub fn start_isearch(&mut self, direction: SearchDirection, ignore_case: bool) {
        debug!(target: "state.search", ?direction, "start");
        self.isearch = Some(IsearchState {
            state: SearchState {
                text: String::new(),
                direction,
                ignore_case,
            },
            origin_working_index: self.working_index(),
            origin_document: self.document().clone(),
            no_match_from_index: None,
        });
    }

    /// Move to `(index, cursor)` without dropping the search session.
    fn jump_to_match(&mut self, index: usize, cursor: usize) {
        let isearch = self.isearch.take();
        if index != self.working_index() {
            self.go_to_history(index);
        }
        self.set_cursor_position(cursor);
        self.isearch = isearch;
    }

    /// Replace the query and search for it from the current match.
    pub fn set_search_text(&mut self, text: &str) {
        let Some(mut isearch) = self.isearch.take() else {
            return;
        };
        let previous_len = isearch.state.text.chars().count();
        let len = text.chars().count();
        let failed_prefix = isearch
            .no_match_from_index
            .map(|failed_at| isearch_prefix(&isearch.state.text, failed_at));
        isearch.state.text = text.to_string();
        if let Some(failed_prefix) = failed_prefix {
            if text.starts_with(&failed_prefix) {
                trace!(target: "state.search", query_len = len, "no_match_skip");
                self.isearch = Some(isearch);
                return;
            }
            isearch.no_match_from_index = None;
        }
        if text.is_empty() {
            self.isearch = Some(isearch);
            return;
        }
        // Backward: start after the current match so it can still be extended.
        let cursor = match isearch.state.direction {
            SearchDirection::Forward => self.cursor_position(),
            SearchDirection::Backward => self.cursor_position() + previous_len,
        };
        let doc = Document::new(self.text().to_string(), cursor);
        let found = search_lines(
            self.working_lines(),
            self.working_index(),
            &doc,
            &isearch.state,
            true,
            1,
        );
        match found {
            Some((index, pos)) => {
                self.isearch = Some(isearch);
                self.jump_to_match(index, pos);
            }
            None => {
                debug!(target: "state.search", query_len = len, "no_match");
                isearch.no_match_from_index = Some(len);
                self.isearch = Some(isearch);
            }
        }
    }

    /// Append typed text to the query.
    pub fn extend_search_text(&mut self, data: &str) {
        if let Some(text) = self.isearch.as_ref().map(|s| format!("{}{data}", s.state.text)) {
            self.set_search_text(&text);
        }
    }

    /// Drop the last char of the query.
    pub fn shrink_search_text(&mut self) {
        if let Some(mut text) = self.isearch.as_ref().map(|s| s.state.text.clone()) {
            text.pop();
            self.set_search_text(&text);
        }
    }

    /// Jump to the next match in `direction` (repeated `C-r`/`C-s`). An empty
    /// query reuses the last accepted one.
    pub fn search_next(&mut self, direction: SearchDirection, count: usize) {
        let Some(mut isearch) = self.isearch.take() else {
            return;
        };
        isearch.state.direction = direction;
        if isearch.state.text.is_empty()
            && let Some(last) = &self.last_search
        {
            isearch.state.text = last.text.clone();
        }
        let found = search_lines(
            self.working_lines(),
            self.working_index(),
            self.document(),
            &isearch.state,
            false,
            count,
        );
        match found {
            Some((index, pos)) => {
                isearch.no_match_from_index = None;
                self.isearch = Some(isearch);
                self.jump_to_match(index, pos);
            }
            None => {
                isearch.no_match_from_index = Some(isearch.state.text.chars().count());
                self.isearch = Some(isearch);
            }
        }
    }

    /// Finish the search. Accepting keeps the position and remembers the
    /// query for `n`/`N`; aborting restores where the search began.
    pub fn exit_isearch(&mut self, accept: bool) {
        let Some(isearch) = self.isearch.take() else {
            return;
        };
        if accept {
            debug!(target: "state.search", query_len = isearch.state.text.chars().count(), "accept");
            if !isearch.state.text.is_empty() {
                self.last_search = Some(isearch.state);
            }
        } else {
            debug!(target: "state.search", "abort");
            self.go_to_history(isearch.origin_working_index);
            self.replace_document(isearch.origin_document);
        }
    }

    /// Search with `state` outside an isearch session (`n`, `N`, `/` accept).
    pub fn apply_search(&mut self, state: &SearchState, include_current_position: bool, count: usize) -> bool {
        let found = search_lines(
            self.working_lines(),
            self.working_index(),
            self.document(),
            state,
            include_current_position,
            count,
        );
        match found {
            Some((index, pos)) => {
                if index != self.working_index() {
                    self.go_to_history(index);
                }
                self.set_cursor_position(pos);
                true
            }
            None => false,
        }
    }

    pub fn set_last_search(&mut self, state: SearchState) {
        self.last_search = Some(state);
    }
}

fn isearch_prefix(text: &str, len: usize) -> String {
    text.chars().take(len).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::InMemoryHistory;
    use pretty_assertions::assert_eq;

    fn buffer(history: &[&str], text: &str) -> Buffer {
        let mut b = Buffer::new(Box::new(InMemoryHistory::from_entries(history.iter().copied())));
        b.insert_text(text, false, true).unwrap();
        b
    }

    #[test]
    fn backward_search_reaches_into_history() {
        let mut b = buffer(&["git status", "ls", "git commit"], "");
        b.start_isearch(SearchDirection::Backward, false);
        b.extend_search_text("git");
        assert_eq!(b.text(), "git commit");
        assert_eq!(b.cursor_position(), 0);
        b.search_next(SearchDirection::Backward, 1);
        assert_eq!(b.text(), "git status");
        b.exit_isearch(true);
        assert_eq!(b.last_search().map(|s| s.text.as_str()), Some("git"));
    }

    #[test]
    fn extending_query_keeps_current_match() {
        let mut b = buffer(&["echo hello", "echo help"], "");
        b.start_isearch(SearchDirection::Backward, false);
        b.extend_search_text("hel");
        assert_eq!(b.text(), "echo help");
        b.extend_search_text("l");
        assert_eq!(b.text(), "echo hello");
        assert_eq!(b.cursor_position(), 5);
    }

    #[test]
    fn failing_query_sets_marker_and_shrinking_clears_it() {
        let mut b = buffer(&["alpha"], "");
        b.start_isearch(SearchDirection::Backward, false);
        b.extend_search_text("al");
        b.extend_search_text("x");
        let marker = b.isearch().and_then(|s| s.no_match_from_index);
        assert_eq!(marker, Some(3));
        b.extend_search_text("y");
        assert!(b.isearch().unwrap().failing());
        b.shrink_search_text();
        b.shrink_search_text();
        assert!(!b.isearch().unwrap().failing());
        assert_eq!(b.text(), "alpha");
    }

    #[test]
    fn abort_restores_origin() {
        let mut b = buffer(&["first"], "draft");
        b.start_isearch(SearchDirection::Backward, false);
        b.extend_search_text("fir");
        assert_eq!(b.text(), "first");
        b.exit_isearch(false);
        assert_eq!(b.text(), "draft");
        assert_eq!(b.cursor_position(), 5);
        assert!(b.isearch().is_none());
    }

    #[test]
    fn forward_search_and_invert() {
        let mut b = buffer(&[], "abc abc abc");
        b.set_cursor_position(0);
        let state = SearchState::new("abc", SearchDirection::Forward);
        assert!(b.apply_search(&state, false, 1));
        assert_eq!(b.cursor_position(), 4);
        assert!(b.apply_search(&state, false, 1));
        assert_eq!(b.cursor_position(), 8);
        assert!(b.apply_search(&state.invert(), false, 1));
        assert_eq!(b.cursor_position(), 4);
    }

    #[test]
    fn forward_search_wraps_within_single_line() {
        let mut b = buffer(&[], "xa ya");
        let state = SearchState::new("a", SearchDirection::Forward);
        assert!(b.apply_search(&state, false, 1));
        assert_eq!(b.cursor_position(), 1);
    }
}
