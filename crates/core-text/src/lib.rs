//! Immutable text snapshots with cursor and selection.
//!
//! A `Document` is a value: every edit produces a new one. Offsets are
//! measured in `char`s (Unicode scalar values), never bytes, so callers can do
//! cursor arithmetic without caring about UTF-8 boundaries. Query methods that
//! answer "where is X" return offsets *relative* to the cursor (`isize`), which
//! lets motions be composed by adding them to `cursor_position`.
//!
//! Invariants:
//! - `0 <= cursor_position <= len()` (constructors clamp).
//! - Lines are split on `'\n'` only; a trailing newline yields a final empty line.
//! - Selection anchors are clamped the same way as the cursor.

use std::sync::{Arc, OnceLock};

mod search;
mod selection;
pub mod width;

pub use selection::{ClipboardData, PasteMode, Selection, SelectionKind};
pub use width::{char_width, egc_width, str_width};

/// Text + cursor + optional selection.
#[derive(Clone, Debug)]
pub struct Document {
    text: Arc<str>,
    cursor_position: usize,
    selection: Option<Selection>,
    char_len: usize,
    line_starts: OnceLock<Arc<[usize]>>,
}

impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        self.cursor_position == other.cursor_position
            && self.selection == other.selection
            && self.text == other.text
    }
}

impl Eq for Document {}

impl Default for Document {
    fn default() -> Self {
        Self::new("", 0)
    }
}

impl Document {
    /// Build a document; `cursor_position` is clamped to the text length.
    pub fn new(text: impl Into<String>, cursor_position: usize) -> Self {
        let text: String = text.into();
        let char_len = text.chars().count();
        Self {
            text: Arc::from(text),
            cursor_position: cursor_position.min(char_len),
            selection: None,
            char_len,
            line_starts: OnceLock::new(),
        }
    }

    /// Document with the cursor placed after the last character.
    pub fn at_end(text: impl Into<String>) -> Self {
        Self::new(text, usize::MAX)
    }

    pub fn with_selection(mut self, selection: Option<Selection>) -> Self {
        self.selection = selection.map(|s| Selection {
            anchor: s.anchor.min(self.char_len),
            ..s
        });
        self
    }

    /// Same text, new cursor. Shares the text allocation.
    pub fn with_cursor(&self, cursor_position: usize) -> Self {
        Self {
            text: Arc::clone(&self.text),
            cursor_position: cursor_position.min(self.char_len),
            selection: self.selection,
            char_len: self.char_len,
            line_starts: self.line_starts.clone(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn cursor_position(&self) -> usize {
        self.cursor_position
    }

    pub fn selection(&self) -> Option<Selection> {
        self.selection
    }

    /// Length in chars.
    pub fn len(&self) -> usize {
        self.char_len
    }

    pub fn is_empty(&self) -> bool {
        self.char_len == 0
    }

    /// Byte offset of char index `index` (clamped to the end).
    pub(crate) fn byte_index(&self, index: usize) -> usize {
        if index >= self.char_len {
            return self.text.len();
        }
        self.text
            .char_indices()
            .nth(index)
            .map(|(b, _)| b)
            .unwrap_or(self.text.len())
    }

    /// Slice by char range `[from, to)`, both clamped.
    pub fn slice(&self, from: usize, to: usize) -> &str {
        if from >= to {
            return "";
        }
        let start = self.byte_index(from);
        let end = self.byte_index(to);
        &self.text[start..end]
    }

    pub fn text_before_cursor(&self) -> &str {
        &self.text[..self.byte_index(self.cursor_position)]
    }

    pub fn text_after_cursor(&self) -> &str {
        &self.text[self.byte_index(self.cursor_position)..]
    }

    pub fn char_at(&self, index: usize) -> Option<char> {
        self.text.chars().nth(index)
    }

    /// Character under the cursor, `None` at the end of the text.
    pub fn current_char(&self) -> Option<char> {
        self.text_after_cursor().chars().next()
    }

    pub fn char_before_cursor(&self) -> Option<char> {
        self.text_before_cursor().chars().next_back()
    }

    // ---------------------------------------------------------------------------------------------
    // Lines
    // ---------------------------------------------------------------------------------------------

    fn line_starts(&self) -> &[usize] {
        self.line_starts.get_or_init(|| {
            let mut starts = vec![0];
            for (i, c) in self.text.chars().enumerate() {
                if c == '\n' {
                    starts.push(i + 1);
                }
            }
            Arc::from(starts)
        })
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.text.split('\n')
    }

    pub fn line_count(&self) -> usize {
        self.line_starts().len()
    }

    pub fn line(&self, row: usize) -> Option<&str> {
        self.lines().nth(row)
    }

    /// Char length of line `row` (0 for rows past the end).
    pub fn line_len(&self, row: usize) -> usize {
        let starts = self.line_starts();
        match starts.get(row) {
            Some(&start) => {
                let end = starts
                    .get(row + 1)
                    .map(|next| next - 1)
                    .unwrap_or(self.char_len);
                end - start
            }
            None => 0,
        }
    }

    /// Char index where line `row` begins (clamped to the last line).
    pub fn line_start_index(&self, row: usize) -> usize {
        let starts = self.line_starts();
        starts[row.min(starts.len() - 1)]
    }

    pub fn cursor_position_row(&self) -> usize {
        self.translate_index_to_position(self.cursor_position).0
    }

    pub fn cursor_position_col(&self) -> usize {
        self.translate_index_to_position(self.cursor_position).1
    }

    /// `(row, col)` of a char index; both zero-based.
    pub fn translate_index_to_position(&self, index: usize) -> (usize, usize) {
        let index = index.min(self.char_len);
        let starts = self.line_starts();
        let row = match starts.binary_search(&index) {
            Ok(row) => row,
            Err(insert_at) => insert_at - 1,
        };
        (row, index - starts[row])
    }

    /// Char index of `(row, col)`; the row and column are clamped into the text.
    pub fn translate_row_col_to_index(&self, row: usize, col: usize) -> usize {
        let row = row.min(self.line_count() - 1);
        self.line_start_index(row) + col.min(self.line_len(row))
    }

    pub fn current_line(&self) -> &str {
        self.line(self.cursor_position_row()).unwrap_or("")
    }

    pub fn current_line_before_cursor(&self) -> &str {
        let before = self.text_before_cursor();
        match before.rfind('\n') {
            Some(nl) => &before[nl + 1..],
            None => before,
        }
    }

    pub fn current_line_after_cursor(&self) -> &str {
        let after = self.text_after_cursor();
        match after.find('\n') {
            Some(nl) => &after[..nl],
            None => after,
        }
    }

    pub fn leading_whitespace_in_current_line(&self) -> &str {
        let line = self.current_line();
        let trimmed = line.trim_start();
        &line[..line.len() - trimmed.len()]
    }

    pub fn is_cursor_at_the_end(&self) -> bool {
        self.cursor_position == self.char_len
    }

    pub fn is_cursor_at_the_end_of_line(&self) -> bool {
        matches!(self.current_char(), None | Some('\n'))
    }

    pub fn on_first_line(&self) -> bool {
        self.cursor_position_row() == 0
    }

    pub fn on_last_line(&self) -> bool {
        self.cursor_position_row() + 1 == self.line_count()
    }

    /// Number of trailing lines that are blank.
    pub fn empty_line_count_at_the_end(&self) -> usize {
        let mut count = 0;
        for line in self.text.split('\n').rev() {
            if !line.trim().is_empty() {
                break;
            }
            count += 1;
        }
        count
    }

    // ---------------------------------------------------------------------------------------------
    // Relative cursor motions
    // ---------------------------------------------------------------------------------------------

    /// Relative offset for moving left within the current line (never crosses a line start).
    pub fn get_cursor_left_position(&self, count: usize) -> isize {
        -(count.min(self.cursor_position_col()) as isize)
    }

    /// Relative offset for moving right within the current line.
    pub fn get_cursor_right_position(&self, count: usize) -> isize {
        count.min(self.current_line_after_cursor().chars().count()) as isize
    }

    /// Relative offset for moving `count` rows up, landing on `preferred_column`
    /// (or the current column) clamped to the target line length.
    pub fn get_cursor_up_position(&self, count: usize, preferred_column: Option<usize>) -> isize {
        let (row, col) = self.translate_index_to_position(self.cursor_position);
        let column = preferred_column.unwrap_or(col);
        let target = self.translate_row_col_to_index(row.saturating_sub(count), column);
        target as isize - self.cursor_position as isize
    }

    pub fn get_cursor_down_position(&self, count: usize, preferred_column: Option<usize>) -> isize {
        let (row, col) = self.translate_index_to_position(self.cursor_position);
        let column = preferred_column.unwrap_or(col);
        let target = self.translate_row_col_to_index(row.saturating_add(count), column);
        target as isize - self.cursor_position as isize
    }

    pub fn get_start_of_line_position(&self, after_whitespace: bool) -> isize {
        let before = self.current_line_before_cursor().chars().count() as isize;
        if after_whitespace {
            let ws = self.leading_whitespace_in_current_line().chars().count() as isize;
            ws - before
        } else {
            -before
        }
    }

    pub fn get_end_of_line_position(&self) -> isize {
        self.current_line_after_cursor().chars().count() as isize
    }

    pub fn get_start_of_document_position(&self) -> isize {
        -(self.cursor_position as isize)
    }

    pub fn get_end_of_document_position(&self) -> isize {
        (self.char_len - self.cursor_position) as isize
    }

    /// Relative offset to `column` on the current line (clamped to its length).
    pub fn get_column_cursor_position(&self, column: usize) -> isize {
        let (row, col) = self.translate_index_to_position(self.cursor_position);
        let column = column.min(self.line_len(row));
        column as isize - col as isize
    }

    /// Apply a relative offset to the cursor, clamping to the text.
    pub fn offset_cursor(&self, delta: isize) -> usize {
        (self.cursor_position as isize + delta).clamp(0, self.char_len as isize) as usize
    }

    /// New document with `text` inserted before the current text (cursor shifts along).
    pub fn insert_before(&self, text: &str) -> Document {
        let shift = text.chars().count();
        let selection = self.selection.map(|s| Selection {
            anchor: s.anchor + shift,
            ..s
        });
        Document::new(format!("{text}{}", self.text), self.cursor_position + shift)
            .with_selection(selection)
    }

    /// New document with `text` appended; cursor and selection unchanged.
    pub fn insert_after(&self, text: &str) -> Document {
        Document::new(format!("{}{text}", self.text), self.cursor_position)
            .with_selection(self.selection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn cursor_clamped_on_construction() {
        let d = Document::new("abc", 99);
        assert_eq!(d.cursor_position(), 3);
        assert!(d.is_cursor_at_the_end());
    }

    #[test]
    fn split_around_cursor_with_multibyte_text() {
        let d = Document::new("héllo wörld", 7);
        assert_eq!(d.text_before_cursor(), "héllo w");
        assert_eq!(d.text_after_cursor(), "örld");
        assert_eq!(d.current_char(), Some('ö'));
        assert_eq!(d.char_before_cursor(), Some('w'));
    }

    #[test]
    fn row_col_translation() {
        let d = Document::new("line1\nline22\n\nx", 9);
        assert_eq!(d.line_count(), 4);
        assert_eq!(d.translate_index_to_position(9), (1, 3));
        assert_eq!(d.translate_index_to_position(13), (2, 0));
        assert_eq!(d.translate_row_col_to_index(1, 100), 12);
        assert_eq!(d.translate_row_col_to_index(9, 0), 14);
        assert_eq!(d.current_line(), "line22");
        assert_eq!(d.current_line_before_cursor(), "lin");
        assert_eq!(d.current_line_after_cursor(), "e22");
    }

    #[test]
    fn trailing_newline_yields_empty_last_line() {
        let d = Document::at_end("a\n");
        assert_eq!(d.line_count(), 2);
        assert_eq!(d.cursor_position_row(), 1);
        assert_eq!(d.current_line(), "");
        assert_eq!(d.empty_line_count_at_the_end(), 1);
    }

    #[test]
    fn left_right_stay_on_line() {
        let d = Document::new("ab\ncd", 3);
        assert_eq!(d.get_cursor_left_position(5), 0);
        assert_eq!(d.get_cursor_right_position(5), 2);
        let d = Document::new("ab\ncd", 1);
        assert_eq!(d.get_cursor_right_position(5), 1);
    }

    #[test]
    fn up_down_respect_preferred_column() {
        let d = Document::new("abcdef\nab\nabcdef", 5);
        let down = d.get_cursor_down_position(1, None);
        assert_eq!(d.offset_cursor(down), 9); // clamped to end of "ab"
        let moved = d.with_cursor(d.offset_cursor(down));
        let down2 = moved.get_cursor_down_position(1, Some(5));
        assert_eq!(moved.offset_cursor(down2), 15);
        let up = moved.get_cursor_up_position(3, Some(1));
        assert_eq!(moved.offset_cursor(up), 1);
    }

    #[test]
    fn start_of_line_after_whitespace() {
        let d = Document::new("   indented", 8);
        assert_eq!(d.get_start_of_line_position(true), -5);
        assert_eq!(d.get_start_of_line_position(false), -8);
        assert_eq!(d.get_end_of_line_position(), 3);
        assert_eq!(d.leading_whitespace_in_current_line(), "   ");
    }

    #[test]
    fn insert_before_shifts_cursor_and_selection() {
        let d = Document::new("world", 2).with_selection(Some(Selection::new(0, SelectionKind::Characters)));
        let d2 = d.insert_before("hi ");
        assert_eq!(d2.text(), "hi world");
        assert_eq!(d2.cursor_position(), 5);
        assert_eq!(d2.selection().map(|s| s.anchor), Some(3));
    }
}
