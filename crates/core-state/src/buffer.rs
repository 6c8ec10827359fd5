//! The editable buffer: a `Document` plus undo, history, completion,
//! search and validation state.
//!
//! Every mutation builds a fresh `Document`. Changing the text drops the
//! completion menu, validation result, yank state and preferred column;
//! operations that manage one of those themselves (completion cycling,
//! history navigation, incremental search) restore it afterwards.
//! `working_lines[working_index]` always mirrors the current text.

use std::sync::{Arc, LazyLock};

use core_text::{ClipboardData, Document, PasteMode, Selection, SelectionKind};
use regex::Regex;
use thiserror::Error;
use tracing::{debug, trace};

use crate::completion::{
    CompleteEvent, Completer, Completion, CompletionState, common_suffix_to_insert,
};
use crate::history::{History, InMemoryHistory};
use crate::search::{IsearchState, SearchState};
use crate::undo::UndoStack;
use crate::validation::{ValidationError, Validator};
use crate::worker::{CompletionRequest, CompletionResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("attempt to edit a read-only buffer")]
pub struct EditReadOnlyBuffer;

/// What changed in the last `Document` swap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferChange {
    Text,
    Cursor,
}

pub type Listener = Box<dyn FnMut(BufferChange, &Document)>;

/// Outcome of offering a background completion result to the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AsyncApply {
    Applied,
    /// The document changed since the computation started.
    Stale,
}

/// Which candidate to select when a completion menu opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompletionSelect {
    #[default]
    None,
    First,
    Last,
}

#[derive(Debug, Clone)]
struct YankArgState {
    history_position: isize,
    n: isize,
    previous_inserted_word: String,
}

static QUOTED_WORDS: LazyLock<Regex> = LazyLock::new(|| match Regex::new(r#""[^"]*"|'[^']*'|\S+"#) {
    Ok(re) => re,
    Err(err) => unreachable!("word pattern: {err}"),
});

pub struct Buffer {
    document: Document,
    working_lines: Vec<String>,
    working_index: usize,
    history: Box<dyn History>,
    undo: UndoStack,
    complete_state: Option<CompletionState>,
    completer: Option<Arc<dyn Completer>>,
    validator: Option<Box<dyn Validator>>,
    validation_error: Option<ValidationError>,
    /// `Some(valid)` once validated for the current text.
    validation_state: Option<bool>,
    pub(crate) isearch: Option<IsearchState>,
    pub(crate) last_search: Option<SearchState>,
    read_only: bool,
    multiline: bool,
    preferred_column: Option<usize>,
    document_before_paste: Option<Document>,
    yank_arg_state: Option<YankArgState>,
    history_search_text: Option<String>,
    enable_history_search: bool,
    /// Explicit completion requests wait here for the background worker
    /// instead of running the completer inline.
    background_completion: bool,
    pending_completion: Option<CompletionRequest>,
    /// Extra cursors for `InputMode::InsertMultiple`.
    pub multiple_cursor_positions: Vec<usize>,
    listeners: Vec<Listener>,
}

impl Default for Buffer {
    fn default() -> Self {
        Self::new(Box::new(InMemoryHistory::new()))
    }
}

impl Buffer {
    pub fn new(history: Box<dyn History>) -> Self {
        let mut buffer = Self {
            document: Document::default(),
            working_lines: vec![String::new()],
            working_index: 0,
            history,
            undo: UndoStack::default(),
            complete_state: None,
            completer: None,
            validator: None,
            validation_error: None,
            validation_state: None,
            isearch: None,
            last_search: None,
            read_only: false,
            multiline: false,
            preferred_column: None,
            document_before_paste: None,
            yank_arg_state: None,
            history_search_text: None,
            enable_history_search: false,
            background_completion: false,
            pending_completion: None,
            multiple_cursor_positions: Vec::new(),
            listeners: Vec::new(),
        };
        buffer.reset(None, false);
        buffer
    }

    pub fn with_completer(mut self, completer: Arc<dyn Completer>) -> Self {
        self.completer = Some(completer);
        self
    }

    pub fn with_validator(mut self, validator: Box<dyn Validator>) -> Self {
        self.validator = Some(validator);
        self
    }

    pub fn with_read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    pub fn with_multiline(mut self, multiline: bool) -> Self {
        self.multiline = multiline;
        self
    }

    /// Up/Down only visit history entries starting with the text before the cursor.
    pub fn with_history_search(mut self, enable: bool) -> Self {
        self.enable_history_search = enable;
        self
    }

    pub fn with_undo_depth(mut self, depth: usize) -> Self {
        self.undo = UndoStack::new(depth);
        self
    }

    /// Hand explicit completion requests to the event loop's worker.
    pub fn set_background_completion(&mut self, enable: bool) {
        self.background_completion = enable;
        if !enable {
            self.pending_completion = None;
        }
    }

    // ---------------------------------------------------------------------
    // Accessors
    // ---------------------------------------------------------------------

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn text(&self) -> &str {
        self.document.text()
    }

    pub fn cursor_position(&self) -> usize {
        self.document.cursor_position()
    }

    pub fn selection(&self) -> Option<Selection> {
        self.document.selection()
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn set_read_only(&mut self, read_only: bool) {
        self.read_only = read_only;
    }

    pub fn is_multiline(&self) -> bool {
        self.multiline
    }

    pub fn working_index(&self) -> usize {
        self.working_index
    }

    pub fn working_lines(&self) -> &[String] {
        &self.working_lines
    }

    pub fn history(&self) -> &dyn History {
        self.history.as_ref()
    }

    pub fn complete_state(&self) -> Option<&CompletionState> {
        self.complete_state.as_ref()
    }

    pub fn completer(&self) -> Option<&Arc<dyn Completer>> {
        self.completer.as_ref()
    }

    pub fn validation_error(&self) -> Option<&ValidationError> {
        self.validation_error.as_ref()
    }

    pub fn preferred_column(&self) -> Option<usize> {
        self.preferred_column
    }

    /// Restore the column kept for vertical movement after a cursor fix-up.
    pub fn set_preferred_column(&mut self, column: Option<usize>) {
        self.preferred_column = column;
    }

    pub fn document_before_paste(&self) -> Option<&Document> {
        self.document_before_paste.as_ref()
    }

    pub fn undo_stack(&self) -> &UndoStack {
        &self.undo
    }

    /// Register a listener called after every document change.
    pub fn subscribe(&mut self, listener: impl FnMut(BufferChange, &Document) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    // ---------------------------------------------------------------------
    // Document replacement
    // ---------------------------------------------------------------------

    fn check_writable(&self) -> Result<(), EditReadOnlyBuffer> {
        if self.read_only {
            debug!(target: "state.buffer", "read_only_edit_rejected");
            return Err(EditReadOnlyBuffer);
        }
        Ok(())
    }

    pub(crate) fn replace_document(&mut self, document: Document) {
        let text_changed = document.text() != self.document.text();
        let cursor_changed = document.cursor_position() != self.document.cursor_position();
        self.document = document;
        if text_changed {
            self.working_lines[self.working_index] = self.document.text().to_string();
            self.on_text_changed();
        } else if cursor_changed {
            self.on_cursor_changed();
        }
    }

    fn on_text_changed(&mut self) {
        self.clear_transient();
        trace!(target: "state.buffer", len = self.document.len(), cursor = self.document.cursor_position(), "text_changed");
        for listener in &mut self.listeners {
            listener(BufferChange::Text, &self.document);
        }
    }

    fn on_cursor_changed(&mut self) {
        self.clear_transient();
        for listener in &mut self.listeners {
            listener(BufferChange::Cursor, &self.document);
        }
    }

    fn clear_transient(&mut self) {
        self.validation_error = None;
        self.validation_state = None;
        self.complete_state = None;
        self.yank_arg_state = None;
        self.document_before_paste = None;
        self.preferred_column = None;
        self.history_search_text = None;
        self.isearch = None;
    }

    /// Replace the document. Fails on a read-only buffer when the text would change.
    pub fn set_document(
        &mut self,
        document: Document,
        bypass_readonly: bool,
    ) -> Result<(), EditReadOnlyBuffer> {
        if !bypass_readonly && document.text() != self.text() {
            self.check_writable()?;
        }
        self.replace_document(document);
        Ok(())
    }

    /// Replace the text, keeping the cursor where it was (clamped).
    pub fn set_text(&mut self, text: impl Into<String>) -> Result<(), EditReadOnlyBuffer> {
        let text: String = text.into();
        if text != self.text() {
            self.check_writable()?;
        }
        let doc = Document::new(text, self.cursor_position());
        self.replace_document(doc);
        Ok(())
    }

    pub fn set_cursor_position(&mut self, position: usize) {
        let doc = self.document.with_cursor(position);
        self.replace_document(doc);
    }

    /// Move the cursor by a relative offset as returned by `Document` queries.
    pub fn move_cursor(&mut self, delta: isize) {
        let pos = self.document.offset_cursor(delta);
        self.set_cursor_position(pos);
    }

    fn set_working_index(&mut self, index: usize) {
        if self.working_index != index && index < self.working_lines.len() {
            self.working_index = index;
            self.document = Document::new(self.working_lines[index].clone(), 0);
            self.on_text_changed();
        }
    }

    /// Start over with `document`, optionally saving the current text to history first.
    pub fn reset(&mut self, document: Option<Document>, append_to_history: bool) {
        if append_to_history {
            self.append_to_history();
        }
        let document = document.unwrap_or_default();
        self.clear_transient();
        self.last_search = None;
        self.pending_completion = None;
        self.multiple_cursor_positions.clear();
        self.undo.clear();
        self.working_lines = self.history.entries().to_vec();
        self.working_lines.push(document.text().to_string());
        self.working_index = self.working_lines.len() - 1;
        self.document = document;
        debug!(target: "state.buffer", history = self.working_lines.len() - 1, "reset");
        for listener in &mut self.listeners {
            listener(BufferChange::Text, &self.document);
        }
    }

    // ---------------------------------------------------------------------
    // Undo
    // ---------------------------------------------------------------------

    pub fn save_to_undo_stack(&mut self, clear_redo: bool) {
        let (text, cursor) = (self.document.text(), self.document.cursor_position());
        self.undo.save(text, cursor, clear_redo);
    }

    /// Restore the newest checkpoint whose text differs from the current one.
    /// Returns whether anything changed.
    pub fn undo(&mut self) -> Result<bool, EditReadOnlyBuffer> {
        self.check_writable()?;
        let (text, cursor) = (self.text().to_string(), self.cursor_position());
        match self.undo.undo(&text, cursor) {
            Some((text, cursor)) => {
                self.replace_document(Document::new(text, cursor));
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn redo(&mut self) -> Result<bool, EditReadOnlyBuffer> {
        self.check_writable()?;
        let (text, cursor) = (self.text().to_string(), self.cursor_position());
        match self.undo.redo(&text, cursor) {
            Some((text, cursor)) => {
                self.replace_document(Document::new(text, cursor));
                Ok(true)
            }
            None => Ok(false),
        }
    }

    // ---------------------------------------------------------------------
    // Editing
    // ---------------------------------------------------------------------

    /// Insert `data` at the cursor. Overwrite mode never overwrites past the
    /// end of the current line.
    pub fn insert_text(
        &mut self,
        data: &str,
        overwrite: bool,
        move_cursor: bool,
    ) -> Result<(), EditReadOnlyBuffer> {
        self.check_writable()?;
        let doc = &self.document;
        let cpos = doc.cursor_position();
        let data_len = data.chars().count();
        let resume = if overwrite {
            let overwritten = doc.slice(cpos, cpos + data_len);
            let kept = match overwritten.find('\n') {
                Some(nl) => overwritten[..nl].chars().count(),
                None => overwritten.chars().count(),
            };
            cpos + kept
        } else {
            cpos
        };
        let text = format!("{}{data}{}", doc.slice(0, cpos), doc.slice(resume, doc.len()));
        let cursor = if move_cursor { cpos + data_len } else { cpos };
        self.replace_document(Document::new(text, cursor));
        Ok(())
    }

    /// Delete up to `count` chars after the cursor, returning them.
    pub fn delete(&mut self, count: usize) -> Result<String, EditReadOnlyBuffer> {
        let doc = &self.document;
        let cpos = doc.cursor_position();
        if cpos >= doc.len() || count == 0 {
            return Ok(String::new());
        }
        self.check_writable()?;
        let deleted = doc.slice(cpos, cpos + count).to_string();
        let end = cpos + deleted.chars().count();
        let text = format!("{}{}", doc.slice(0, cpos), doc.slice(end, doc.len()));
        self.replace_document(Document::new(text, cpos));
        Ok(deleted)
    }

    /// Delete up to `count` chars before the cursor, returning them.
    pub fn delete_before_cursor(&mut self, count: usize) -> Result<String, EditReadOnlyBuffer> {
        let doc = &self.document;
        let cpos = doc.cursor_position();
        if cpos == 0 || count == 0 {
            return Ok(String::new());
        }
        self.check_writable()?;
        let start = cpos.saturating_sub(count);
        let deleted = doc.slice(start, cpos).to_string();
        let text = format!("{}{}", doc.slice(0, start), doc.slice(cpos, doc.len()));
        self.replace_document(Document::new(text, start));
        Ok(deleted)
    }

    /// Join the next line onto the current one, stripping its leading spaces.
    pub fn join_next_line(&mut self, separator: &str) -> Result<(), EditReadOnlyBuffer> {
        if self.document.on_last_line() {
            return Ok(());
        }
        self.check_writable()?;
        let eol = self.document.get_end_of_line_position();
        self.move_cursor(eol);
        self.delete(1)?;
        let before = self.document.text_before_cursor().to_string();
        let after = self.document.text_after_cursor().trim_start_matches(' ');
        let text = format!("{before}{separator}{after}");
        let cursor = self.cursor_position();
        self.replace_document(Document::new(text, cursor));
        Ok(())
    }

    /// Join every line touched by the selection.
    pub fn join_selected_lines(&mut self, separator: &str) -> Result<(), EditReadOnlyBuffer> {
        let Some(sel) = self.selection() else {
            return Ok(());
        };
        self.check_writable()?;
        let doc = &self.document;
        let from = doc.cursor_position().min(sel.anchor);
        let to = doc.cursor_position().max(sel.anchor);
        let before = doc.slice(0, from);
        let after = doc.slice(to, doc.len());
        let lines: Vec<String> = doc
            .slice(from, to)
            .lines()
            .map(|l| format!("{}{separator}", l.trim_start_matches(' ')))
            .collect();
        let joined: String = lines.concat();
        let head_len: usize = lines[..lines.len().saturating_sub(1)]
            .iter()
            .map(|l| l.chars().count())
            .sum();
        let cursor = (before.chars().count() + head_len).saturating_sub(1);
        let text = format!("{before}{joined}{after}");
        self.replace_document(Document::new(text, cursor));
        Ok(())
    }

    /// Swap the two characters before the cursor.
    pub fn swap_characters_before_cursor(&mut self) -> Result<(), EditReadOnlyBuffer> {
        let pos = self.cursor_position();
        if pos < 2 {
            return Ok(());
        }
        self.swap_characters(pos - 2, pos)
    }

    /// Swap the chars at `index` and `index + 1`, leaving the cursor at `cursor`.
    pub fn swap_characters(&mut self, index: usize, cursor: usize) -> Result<(), EditReadOnlyBuffer> {
        let mut chars: Vec<char> = self.text().chars().collect();
        if index + 1 >= chars.len() {
            return Ok(());
        }
        self.check_writable()?;
        chars.swap(index, index + 1);
        let text: String = chars.into_iter().collect();
        self.replace_document(Document::new(text, cursor));
        Ok(())
    }

    pub fn newline(&mut self, copy_margin: bool) -> Result<(), EditReadOnlyBuffer> {
        let margin = if copy_margin {
            self.document.leading_whitespace_in_current_line().to_string()
        } else {
            String::new()
        };
        self.insert_text(&format!("\n{margin}"), false, true)
    }

    pub fn insert_line_above(&mut self, copy_margin: bool) -> Result<(), EditReadOnlyBuffer> {
        self.check_writable()?;
        let margin = if copy_margin {
            self.document.leading_whitespace_in_current_line().to_string()
        } else {
            String::new()
        };
        let start = self.document.get_start_of_line_position(false);
        self.move_cursor(start);
        self.insert_text(&format!("{margin}\n"), false, true)?;
        self.move_cursor(-1);
        Ok(())
    }

    pub fn insert_line_below(&mut self, copy_margin: bool) -> Result<(), EditReadOnlyBuffer> {
        self.check_writable()?;
        let margin = if copy_margin {
            self.document.leading_whitespace_in_current_line().to_string()
        } else {
            String::new()
        };
        let end = self.document.get_end_of_line_position();
        self.move_cursor(end);
        self.insert_text(&format!("\n{margin}"), false, true)
    }

    /// Text with `f` applied to the given line indices (out-of-range ones are skipped).
    pub fn transform_lines<I, F>(&self, rows: I, mut f: F) -> String
    where
        I: IntoIterator<Item = usize>,
        F: FnMut(&str) -> String,
    {
        let mut lines: Vec<String> = self.text().split('\n').map(str::to_owned).collect();
        for row in rows {
            if let Some(line) = lines.get_mut(row) {
                *line = f(line);
            }
        }
        lines.join("\n")
    }

    pub fn transform_current_line<F>(&mut self, f: F) -> Result<(), EditReadOnlyBuffer>
    where
        F: FnOnce(&str) -> String,
    {
        let doc = &self.document;
        let a = doc.offset_cursor(doc.get_start_of_line_position(false));
        let b = doc.offset_cursor(doc.get_end_of_line_position());
        self.transform_region(a, b, f)
    }

    /// Replace the chars in `[from, to)` with `f` of them; the cursor stays put.
    pub fn transform_region<F>(&mut self, from: usize, to: usize, f: F) -> Result<(), EditReadOnlyBuffer>
    where
        F: FnOnce(&str) -> String,
    {
        if from >= to {
            return Ok(());
        }
        self.check_writable()?;
        let doc = &self.document;
        let text = format!(
            "{}{}{}",
            doc.slice(0, from),
            f(doc.slice(from, to)),
            doc.slice(to, doc.len())
        );
        let doc = Document::new(text, doc.cursor_position());
        self.replace_document(doc);
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Cursor movement
    // ---------------------------------------------------------------------

    pub fn cursor_left(&mut self, count: usize) {
        let delta = self.document.get_cursor_left_position(count);
        self.move_cursor(delta);
    }

    pub fn cursor_right(&mut self, count: usize) {
        let delta = self.document.get_cursor_right_position(count);
        self.move_cursor(delta);
    }

    pub fn cursor_up(&mut self, count: usize) {
        let column = self
            .preferred_column
            .unwrap_or_else(|| self.document.cursor_position_col());
        let delta = self.document.get_cursor_up_position(count, Some(column));
        self.move_cursor(delta);
        self.preferred_column = Some(column);
    }

    pub fn cursor_down(&mut self, count: usize) {
        let column = self
            .preferred_column
            .unwrap_or_else(|| self.document.cursor_position_col());
        let delta = self.document.get_cursor_down_position(count, Some(column));
        self.move_cursor(delta);
        self.preferred_column = Some(column);
    }

    /// Up: previous completion, previous line, or older history entry.
    pub fn auto_up(&mut self, count: usize, go_to_start_of_line: bool) -> Result<(), EditReadOnlyBuffer> {
        if self.complete_state.is_some() {
            self.complete_previous(count, false)?;
        } else if self.document.cursor_position_row() > 0 {
            self.cursor_up(count);
        } else if self.selection().is_none() {
            self.history_backward(count);
            if go_to_start_of_line {
                let start = self.document.get_start_of_line_position(false);
                self.move_cursor(start);
            }
        }
        Ok(())
    }

    /// Down: next completion, next line, or newer history entry.
    pub fn auto_down(&mut self, count: usize, go_to_start_of_line: bool) -> Result<(), EditReadOnlyBuffer> {
        if self.complete_state.is_some() {
            self.complete_next(count, false)?;
        } else if self.document.cursor_position_row() + 1 < self.document.line_count() {
            self.cursor_down(count);
        } else if self.selection().is_none() {
            self.history_forward(count);
            if go_to_start_of_line {
                let start = self.document.get_start_of_line_position(false);
                self.move_cursor(start);
            }
        }
        Ok(())
    }

    // ---------------------------------------------------------------------
    // History
    // ---------------------------------------------------------------------

    /// Append the current text unless empty or equal to the newest entry.
    pub fn append_to_history(&mut self) {
        let text = self.text();
        if text.is_empty() {
            return;
        }
        if self.history.entries().last().map(String::as_str) != Some(text) {
            let text = text.to_string();
            self.history.append(&text);
            debug!(target: "state.history", entries = self.history.entries().len(), "appended");
        }
    }

    fn history_prefix(&mut self) -> Option<String> {
        if self.enable_history_search {
            if self.history_search_text.is_none() {
                self.history_search_text = Some(self.document.text_before_cursor().to_string());
            }
        } else {
            self.history_search_text = None;
        }
        self.history_search_text.clone()
    }

    fn history_matches(&self, prefix: Option<&str>, index: usize) -> bool {
        prefix.is_none_or(|p| self.working_lines[index].starts_with(p))
    }

    pub fn history_forward(&mut self, count: usize) {
        let prefix = self.history_prefix();
        let mut remaining = count.max(1);
        let mut target = None;
        for i in self.working_index + 1..self.working_lines.len() {
            if self.history_matches(prefix.as_deref(), i) {
                target = Some(i);
                remaining -= 1;
            }
            if remaining == 0 {
                break;
            }
        }
        if let Some(index) = target {
            self.set_working_index(index);
            let eol = self.document.get_end_of_line_position();
            self.move_cursor(eol);
            trace!(target: "state.history", index, "forward");
        }
        self.history_search_text = prefix;
    }

    pub fn history_backward(&mut self, count: usize) {
        let prefix = self.history_prefix();
        let mut remaining = count.max(1);
        let mut target = None;
        for i in (0..self.working_index).rev() {
            if self.history_matches(prefix.as_deref(), i) {
                target = Some(i);
                remaining -= 1;
            }
            if remaining == 0 {
                break;
            }
        }
        if let Some(index) = target {
            self.set_working_index(index);
            let end = self.document.len();
            self.set_cursor_position(end);
            trace!(target: "state.history", index, "backward");
        }
        self.history_search_text = prefix;
    }

    pub fn go_to_history(&mut self, index: usize) {
        if index < self.working_lines.len() {
            self.set_working_index(index);
            let end = self.document.len();
            self.set_cursor_position(end);
        }
    }

    /// Insert the `n`-th word of the previous history entry; repeating walks
    /// further back, replacing the previously inserted word.
    pub fn yank_nth_arg(&mut self, n: Option<isize>) -> Result<(), EditReadOnlyBuffer> {
        self.yank_arg(n, false)
    }

    /// Like `yank_nth_arg` but defaults to the last word.
    pub fn yank_last_arg(&mut self, n: Option<isize>) -> Result<(), EditReadOnlyBuffer> {
        self.yank_arg(n, true)
    }

    fn yank_arg(&mut self, n: Option<isize>, last: bool) -> Result<(), EditReadOnlyBuffer> {
        let entries_len = self.history.entries().len() as isize;
        if entries_len == 0 {
            return Ok(());
        }
        let mut state = self.yank_arg_state.take().unwrap_or(YankArgState {
            history_position: 0,
            n: if last { -1 } else { 1 },
            previous_inserted_word: String::new(),
        });
        if let Some(n) = n {
            state.n = n;
        }
        let mut new_pos = state.history_position - 1;
        if -new_pos > entries_len {
            new_pos = -1;
        }
        let line = self.history.entries()[(entries_len + new_pos) as usize].clone();
        let words: Vec<&str> = QUOTED_WORDS.find_iter(&line).map(|m| m.as_str()).collect();
        let index = if state.n < 0 {
            words.len() as isize + state.n
        } else {
            state.n
        };
        let word = usize::try_from(index)
            .ok()
            .and_then(|i| words.get(i))
            .copied()
            .unwrap_or("")
            .to_string();
        if !state.previous_inserted_word.is_empty() {
            self.delete_before_cursor(state.previous_inserted_word.chars().count())?;
        }
        self.insert_text(&word, false, true)?;
        state.previous_inserted_word = word;
        state.history_position = new_pos;
        self.yank_arg_state = Some(state);
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Completion
    // ---------------------------------------------------------------------

    /// Show `completions` for the current document without selecting one.
    pub fn set_completions(&mut self, completions: Vec<Completion>) {
        debug!(target: "state.completion", count = completions.len(), "menu_open");
        self.complete_state = Some(CompletionState::new(self.document.clone(), completions));
    }

    /// Select `index` (`None` = original text) and apply it to the text.
    pub fn go_to_completion(&mut self, index: Option<usize>) -> Result<(), EditReadOnlyBuffer> {
        let Some(mut state) = self.complete_state.take() else {
            return Ok(());
        };
        state.go_to_index(index);
        let (text, cursor) = state.new_text_and_position();
        if let Err(err) = self.set_document(Document::new(text, cursor), false) {
            self.complete_state = Some(state);
            return Err(err);
        }
        trace!(target: "state.completion", index = ?state.complete_index, "select");
        self.complete_state = Some(state);
        Ok(())
    }

    fn ensure_completions(&mut self) {
        if self.complete_state.is_none()
            && let Some(completer) = self.completer.clone()
        {
            let completions = completer.get_completions(&self.document, &CompleteEvent::requested());
            self.set_completions(completions);
        }
    }

    /// Select the next candidate, computing the list first if needed.
    /// Wraps from the last candidate back to the original text.
    pub fn complete_next(&mut self, count: usize, disable_wrap_around: bool) -> Result<(), EditReadOnlyBuffer> {
        self.ensure_completions();
        let Some(state) = &self.complete_state else {
            return Ok(());
        };
        let total = state.completions.len();
        if total == 0 {
            return Ok(());
        }
        let index = match state.complete_index {
            None => Some(0),
            Some(i) if i == total - 1 => {
                if disable_wrap_around {
                    return Ok(());
                }
                None
            }
            Some(i) => Some((i + count.max(1)).min(total - 1)),
        };
        self.go_to_completion(index)
    }

    /// Select the previous candidate; wraps from the original text to the last one.
    pub fn complete_previous(&mut self, count: usize, disable_wrap_around: bool) -> Result<(), EditReadOnlyBuffer> {
        self.ensure_completions();
        let Some(state) = &self.complete_state else {
            return Ok(());
        };
        let total = state.completions.len();
        if total == 0 {
            return Ok(());
        }
        let index = match state.complete_index {
            Some(0) => {
                if disable_wrap_around {
                    return Ok(());
                }
                None
            }
            None => Some(total - 1),
            Some(i) => Some(i.saturating_sub(count.max(1))),
        };
        self.go_to_completion(index)
    }

    /// Restore the original text and close the menu.
    pub fn cancel_completion(&mut self) -> Result<(), EditReadOnlyBuffer> {
        if self.complete_state.is_some() {
            self.go_to_completion(None)?;
            self.complete_state = None;
            debug!(target: "state.completion", "menu_cancel");
        }
        Ok(())
    }

    /// Close the menu keeping whatever candidate is applied.
    pub fn close_completion(&mut self) {
        self.complete_state = None;
    }

    /// Insert `completion` directly, replacing the word it covers.
    pub fn apply_completion(&mut self, completion: &Completion) -> Result<(), EditReadOnlyBuffer> {
        if self.complete_state.is_some() {
            self.go_to_completion(None)?;
        }
        self.complete_state = None;
        self.delete_before_cursor(completion.start_position.unsigned_abs())?;
        self.insert_text(&completion.text, false, true)
    }

    /// Run the completer synchronously and open the menu.
    pub fn start_completion(
        &mut self,
        select: CompletionSelect,
        insert_common_part: bool,
        event: CompleteEvent,
    ) -> Result<usize, EditReadOnlyBuffer> {
        let Some(completer) = self.completer.clone() else {
            return Ok(0);
        };
        if self.background_completion {
            trace!(target: "state.completion", "completion_deferred");
            self.pending_completion = Some(CompletionRequest {
                document: self.document.clone(),
                event,
                select,
                insert_common_part,
            });
            return Ok(0);
        }
        let completions = completer.get_completions(&self.document, &event);
        self.open_completions(completions, select, insert_common_part)
    }

    /// Completion deferred by `start_completion` for the background worker.
    pub fn take_completion_request(&mut self) -> Option<CompletionRequest> {
        self.pending_completion.take()
    }

    fn open_completions(
        &mut self,
        completions: Vec<Completion>,
        select: CompletionSelect,
        insert_common_part: bool,
    ) -> Result<usize, EditReadOnlyBuffer> {
        let mut completions = completions;
        if insert_common_part {
            let common = common_suffix_to_insert(&self.document, &completions);
            if !common.is_empty() {
                self.insert_text(&common, false, true)?;
                if completions.len() == 1 {
                    return Ok(1);
                }
                let shift = common.chars().count() as isize;
                for c in &mut completions {
                    c.start_position -= shift;
                }
            }
        }
        let count = completions.len();
        self.set_completions(completions);
        match select {
            CompletionSelect::None => {}
            CompletionSelect::First => self.go_to_completion(Some(0))?,
            CompletionSelect::Last => self.go_to_completion(count.checked_sub(1))?,
        }
        Ok(count)
    }

    /// Snapshot to hand to the background worker.
    pub fn completion_request(&self) -> Option<CompletionRequest> {
        self.completer
            .as_ref()
            .map(|_| CompletionRequest::typed(self.document.clone()))
    }

    /// Apply a background result if the document is unchanged since it was requested.
    pub fn try_apply_async_result(&mut self, result: CompletionResult) -> Result<AsyncApply, EditReadOnlyBuffer> {
        if result.request.document != self.document {
            debug!(target: "state.completion", generation = result.generation, "async_result_stale");
            return Ok(AsyncApply::Stale);
        }
        let CompletionRequest {
            select,
            insert_common_part,
            ..
        } = result.request;
        self.open_completions(result.completions, select, insert_common_part)?;
        Ok(AsyncApply::Applied)
    }

    /// Complete the current line from every line of every history entry and
    /// of the buffer itself, newest first.
    pub fn start_history_lines_completion(&mut self) -> Result<(), EditReadOnlyBuffer> {
        let current = self
            .document
            .current_line_before_cursor()
            .trim_start()
            .to_string();
        let start_position = -(current.chars().count() as isize);
        let mut seen = ahash::AHashSet::new();
        let mut completions = Vec::new();
        for (i, entry) in self.working_lines.iter().enumerate() {
            for (j, line) in entry.split('\n').enumerate() {
                let line = line.trim();
                if line.is_empty()
                    || !line.starts_with(current.as_str())
                    || !seen.insert(line.to_string())
                {
                    continue;
                }
                let meta = if i == self.working_index {
                    format!("Current, line {}", j + 1)
                } else {
                    format!("History {}, line {}", i + 1, j + 1)
                };
                completions.push(Completion::new(line, start_position).with_meta(meta));
            }
        }
        completions.reverse();
        self.set_completions(completions);
        self.go_to_completion(Some(0))
    }

    // ---------------------------------------------------------------------
    // Selection and clipboard
    // ---------------------------------------------------------------------

    pub fn start_selection(&mut self, kind: SelectionKind) {
        let anchor = self.cursor_position();
        self.document = self
            .document
            .clone()
            .with_selection(Some(Selection::new(anchor, kind)));
    }

    /// Change the kind of the active selection, keeping its anchor.
    pub fn set_selection_kind(&mut self, kind: SelectionKind) {
        if let Some(sel) = self.selection() {
            self.document = self
                .document
                .clone()
                .with_selection(Some(Selection::new(sel.anchor, kind)));
        }
    }

    /// Swap anchor and cursor (Vi visual `o`).
    pub fn swap_selection_ends(&mut self) {
        if let Some(sel) = self.selection() {
            let cursor = self.cursor_position();
            self.document = Document::new(self.text().to_string(), sel.anchor)
                .with_selection(Some(Selection::new(cursor, sel.kind)));
        }
    }

    pub fn exit_selection(&mut self) {
        if self.selection().is_some() {
            self.document = self.document.clone().with_selection(None);
        }
    }

    /// Copy the selection to clipboard data and clear it.
    pub fn copy_selection(&mut self, inclusive: bool) -> ClipboardData {
        let (_, data) = self.document.cut_selection(inclusive);
        let start = self.document.selection_range().0;
        self.exit_selection();
        self.set_cursor_position(start);
        data
    }

    /// Remove the selected text and return it.
    pub fn cut_selection(&mut self, inclusive: bool) -> Result<ClipboardData, EditReadOnlyBuffer> {
        self.check_writable()?;
        let (doc, data) = self.document.cut_selection(inclusive);
        self.replace_document(doc);
        Ok(data)
    }

    /// Paste `data`; remembers the previous document for yank-pop.
    pub fn paste_clipboard_data(
        &mut self,
        data: &ClipboardData,
        mode: PasteMode,
        count: usize,
    ) -> Result<(), EditReadOnlyBuffer> {
        self.check_writable()?;
        let original = self.document.clone();
        let doc = self.document.paste_clipboard_data(data, mode, count);
        self.replace_document(doc);
        self.document_before_paste = Some(original);
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Validation
    // ---------------------------------------------------------------------

    /// Run the validator once per text. On failure the error is kept and,
    /// with `set_cursor`, the cursor moves to the offending offset.
    pub fn validate(&mut self, set_cursor: bool) -> bool {
        if let Some(valid) = self.validation_state {
            return valid;
        }
        if let Some(validator) = &self.validator
            && let Err(err) = validator.validate(&self.document)
        {
            debug!(target: "state.buffer", message = %err.message, position = err.cursor_position, "validation_failed");
            if set_cursor {
                let pos = err.cursor_position.min(self.document.len());
                self.set_cursor_position(pos);
            }
            self.validation_error = Some(err);
            self.validation_state = Some(false);
            return false;
        }
        self.validation_error = None;
        self.validation_state = Some(true);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn buffer_with(text: &str) -> Buffer {
        let mut b = Buffer::default();
        b.insert_text(text, false, true).unwrap();
        b
    }

    fn words_completer() -> Arc<dyn Completer> {
        Arc::new(|doc: &Document, _: &CompleteEvent| {
            let word = doc.get_word_before_cursor(false).to_string();
            ["apple", "apricot", "banana"]
                .iter()
                .filter(|w| w.starts_with(word.as_str()))
                .map(|w| Completion::new(*w, -(word.chars().count() as isize)))
                .collect::<Vec<_>>()
        })
    }

    #[test]
    fn insert_and_delete_return_removed_text() {
        let mut b = buffer_with("hello");
        b.set_cursor_position(2);
        assert_eq!(b.delete(2).unwrap(), "ll");
        assert_eq!(b.text(), "heo");
        assert_eq!(b.delete_before_cursor(5).unwrap(), "he");
        assert_eq!((b.text(), b.cursor_position()), ("o", 0));
        assert_eq!(b.delete_before_cursor(1).unwrap(), "");
        b.set_cursor_position(1);
        assert_eq!(b.delete(1).unwrap(), "");
    }

    #[test]
    fn overwrite_stops_at_newline() {
        let mut b = buffer_with("ab\ncd");
        b.set_cursor_position(1);
        b.insert_text("XYZ", true, true).unwrap();
        assert_eq!(b.text(), "aXYZ\ncd");
        assert_eq!(b.cursor_position(), 4);
    }

    #[test]
    fn working_line_mirrors_text() {
        let mut b = buffer_with("abc");
        assert_eq!(b.working_lines()[b.working_index()], "abc");
        b.delete_before_cursor(1).unwrap();
        assert_eq!(b.working_lines()[b.working_index()], "ab");
    }

    #[test]
    fn read_only_rejects_edits_but_allows_movement() {
        let mut b = buffer_with("abc").with_read_only(true);
        assert_eq!(b.insert_text("x", false, true), Err(EditReadOnlyBuffer));
        assert_eq!(b.delete_before_cursor(1), Err(EditReadOnlyBuffer));
        b.cursor_left(1);
        assert_eq!(b.cursor_position(), 2);
        assert_eq!(b.text(), "abc");
    }

    #[test]
    fn undo_and_redo() {
        let mut b = Buffer::default();
        b.save_to_undo_stack(true);
        b.insert_text("one", false, true).unwrap();
        b.save_to_undo_stack(true);
        b.insert_text(" two", false, true).unwrap();
        assert!(b.undo().unwrap());
        assert_eq!(b.text(), "one");
        assert!(b.undo().unwrap());
        assert_eq!(b.text(), "");
        assert!(!b.undo().unwrap());
        assert!(b.redo().unwrap());
        assert_eq!(b.text(), "one");
    }

    #[test]
    fn history_navigation_with_prefix_search() {
        let history = InMemoryHistory::from_entries(["ls -l", "cd /tmp", "ls -a"]);
        let mut b = Buffer::new(Box::new(history)).with_history_search(true);
        b.insert_text("ls", false, true).unwrap();
        b.history_backward(1);
        assert_eq!(b.text(), "ls -a");
        b.history_backward(1);
        assert_eq!(b.text(), "ls -l");
        b.history_forward(1);
        assert_eq!(b.text(), "ls -a");
        b.history_forward(1);
        assert_eq!(b.text(), "ls");
        assert_eq!(b.cursor_position(), 2);
    }

    #[test]
    fn history_edits_are_kept_per_working_line() {
        let history = InMemoryHistory::from_entries(["first"]);
        let mut b = Buffer::new(Box::new(history));
        b.insert_text("draft", false, true).unwrap();
        b.history_backward(1);
        b.insert_text("!", false, true).unwrap();
        b.history_forward(1);
        assert_eq!(b.text(), "draft");
        b.go_to_history(0);
        assert_eq!(b.text(), "first!");
    }

    #[test]
    fn append_to_history_skips_duplicates_and_empty() {
        let mut b = buffer_with("cmd");
        b.append_to_history();
        b.append_to_history();
        b.reset(None, true);
        assert_eq!(b.history().entries(), ["cmd"]);
        assert_eq!(b.working_lines(), ["cmd", ""]);
    }

    #[test]
    fn yank_last_arg_walks_history() {
        let history = InMemoryHistory::from_entries(["echo one", "cp \"a b\" dest"]);
        let mut b = Buffer::new(Box::new(history));
        b.yank_last_arg(None).unwrap();
        assert_eq!(b.text(), "dest");
        b.yank_last_arg(None).unwrap();
        assert_eq!(b.text(), "one");
        b.reset(None, false);
        b.yank_nth_arg(None).unwrap();
        assert_eq!(b.text(), "\"a b\"");
    }

    #[test]
    fn completion_cycles_through_original() {
        let mut b = buffer_with("ap").with_completer(words_completer());
        b.complete_next(1, false).unwrap();
        assert_eq!(b.text(), "apple");
        b.complete_next(1, false).unwrap();
        assert_eq!(b.text(), "apricot");
        b.complete_next(1, false).unwrap();
        assert_eq!(b.text(), "ap");
        b.complete_previous(1, false).unwrap();
        assert_eq!(b.text(), "apricot");
        b.cancel_completion().unwrap();
        assert_eq!(b.text(), "ap");
        assert!(b.complete_state().is_none());
    }

    #[test]
    fn typing_closes_completion_menu() {
        let mut b = buffer_with("ap").with_completer(words_completer());
        b.complete_next(1, false).unwrap();
        assert!(b.complete_state().is_some());
        b.insert_text("x", false, true).unwrap();
        assert!(b.complete_state().is_none());
    }

    #[test]
    fn insert_common_part_then_menu() {
        let mut b = buffer_with("a").with_completer(words_completer());
        let count = b
            .start_completion(CompletionSelect::None, true, CompleteEvent::requested())
            .unwrap();
        assert_eq!(count, 2);
        assert_eq!(b.text(), "ap");
        b.complete_next(1, false).unwrap();
        assert_eq!(b.text(), "apple");
    }

    #[test]
    fn stale_async_result_is_rejected() {
        let mut b = buffer_with("ap").with_completer(words_completer());
        let request = b.completion_request().unwrap();
        let result = CompletionResult {
            generation: 1,
            request,
            completions: vec![Completion::new("apple", -2)],
        };
        b.insert_text("r", false, true).unwrap();
        assert_eq!(b.try_apply_async_result(result.clone()), Ok(AsyncApply::Stale));
        b.delete_before_cursor(1).unwrap();
        assert_eq!(b.try_apply_async_result(result), Ok(AsyncApply::Applied));
        assert_eq!(b.complete_state().map(|s| s.completions.len()), Some(1));
    }

    #[test]
    fn background_mode_defers_explicit_completion() {
        let mut b = buffer_with("a").with_completer(words_completer());
        b.set_background_completion(true);
        let count = b
            .start_completion(CompletionSelect::None, true, CompleteEvent::requested())
            .unwrap();
        assert_eq!(count, 0);
        assert_eq!(b.text(), "a");
        assert!(b.complete_state().is_none());

        let request = b.take_completion_request().unwrap();
        assert!(request.insert_common_part);
        assert_eq!(request.event, CompleteEvent::requested());
        assert!(b.take_completion_request().is_none());

        // The worker's answer opens the menu the way Tab would have.
        let completions = words_completer().get_completions(&request.document, &request.event);
        let result = CompletionResult {
            generation: 1,
            request,
            completions,
        };
        assert_eq!(b.try_apply_async_result(result), Ok(AsyncApply::Applied));
        assert_eq!(b.text(), "ap");
        assert_eq!(b.complete_state().map(|s| s.completions.len()), Some(2));
    }

    #[test]
    fn history_lines_completion_newest_first_and_deduplicated() {
        let history = InMemoryHistory::from_entries(["print(1)\nprint(2)", "print(1)", "pass"]);
        let mut b = Buffer::new(Box::new(history));
        b.insert_text("pr", false, true).unwrap();
        b.start_history_lines_completion().unwrap();
        let texts: Vec<String> = b
            .complete_state()
            .unwrap()
            .completions
            .iter()
            .map(|c| c.text.clone())
            .collect();
        assert_eq!(texts, vec!["pr", "print(2)", "print(1)"]);
        b.complete_next(1, false).unwrap();
        assert_eq!(b.text(), "print(2)");
    }

    #[test]
    fn validation_moves_cursor_and_clears_on_edit() {
        let validator = |doc: &Document| {
            if doc.text().contains('!') {
                let pos = doc.text().chars().position(|c| c == '!').unwrap_or(0);
                Err(ValidationError::new("no bangs", pos))
            } else {
                Ok(())
            }
        };
        let mut b = Buffer::default().with_validator(Box::new(validator));
        b.insert_text("hi! there", false, true).unwrap();
        assert!(!b.validate(true));
        assert_eq!(b.cursor_position(), 2);
        assert_eq!(b.validation_error().map(|e| e.message.as_str()), Some("no bangs"));
        b.delete(1).unwrap();
        assert!(b.validation_error().is_none());
        assert!(b.validate(true));
    }

    #[test]
    fn paste_remembers_previous_document() {
        let mut b = buffer_with("ab");
        b.paste_clipboard_data(&ClipboardData::characters("XY"), PasteMode::Emacs, 1)
            .unwrap();
        assert_eq!(b.text(), "abXY");
        assert_eq!(b.document_before_paste().map(Document::text), Some("ab"));
        b.insert_text("z", false, true).unwrap();
        assert!(b.document_before_paste().is_none());
    }

    #[test]
    fn join_lines_and_swap() {
        let mut b = buffer_with("one\n   two");
        b.set_cursor_position(1);
        b.join_next_line(" ").unwrap();
        assert_eq!(b.text(), "one two");
        b.set_cursor_position(2);
        b.swap_characters_before_cursor().unwrap();
        assert_eq!(b.text(), "noe two");
    }

    #[test]
    fn up_down_keep_preferred_column() {
        let mut b = buffer_with("abcdef\nx\nabcdef");
        b.set_cursor_position(5);
        b.cursor_down(1);
        assert_eq!(b.document().cursor_position_row(), 1);
        b.cursor_down(1);
        assert_eq!(b.document().cursor_position_col(), 5);
    }

    #[test]
    fn listeners_see_each_change() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let mut b = Buffer::default();
        b.subscribe(move |change, doc| sink.borrow_mut().push((change, doc.text().to_string())));
        b.insert_text("a", false, true).unwrap();
        b.cursor_left(1);
        assert_eq!(
            *seen.borrow(),
            vec![
                (BufferChange::Text, "a".to_string()),
                (BufferChange::Cursor, "a".to_string())
            ]
        );
    }
}
