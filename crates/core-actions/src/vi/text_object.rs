//! Regions produced by Vi motions, and how operators see them.

use core_state::Buffer;
use core_text::{ClipboardData, Document, Selection, SelectionKind};

/// How the end of a region is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextObjectKind {
    /// The end position is not part of the region (`w`, `h`, `b`).
    Exclusive,
    /// The char at the end position is part of the region (`e`, `f`, `%`).
    Inclusive,
    /// Whole lines, whatever the columns (`j`, `gg`, `dd`).
    Linewise,
    /// Visual block.
    Block,
}

/// A region relative to the cursor: `start` and `end` are offsets that may
/// be negative. A plain motion only has a `start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextObject {
    pub start: isize,
    pub end: isize,
    pub kind: TextObjectKind,
}

impl TextObject {
    pub fn new(start: isize) -> Self {
        Self {
            start,
            end: 0,
            kind: TextObjectKind::Exclusive,
        }
    }

    pub fn span(start: isize, end: isize) -> Self {
        Self {
            start,
            end,
            kind: TextObjectKind::Exclusive,
        }
    }

    pub fn inclusive(start: isize) -> Self {
        Self::new(start).with_kind(TextObjectKind::Inclusive)
    }

    pub fn linewise(start: isize) -> Self {
        Self::new(start).with_kind(TextObjectKind::Linewise)
    }

    pub fn with_kind(mut self, kind: TextObjectKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn selection_kind(&self) -> SelectionKind {
        match self.kind {
            TextObjectKind::Linewise => SelectionKind::Lines,
            TextObjectKind::Block => SelectionKind::Block,
            TextObjectKind::Exclusive | TextObjectKind::Inclusive => SelectionKind::Characters,
        }
    }

    pub fn sorted(&self) -> (isize, isize) {
        (self.start.min(self.end), self.start.max(self.end))
    }

    /// Relative `[start, end)` an operator acts on.
    ///
    /// An exclusive region ending in column 0 of a later line stops at the
    /// end of the previous line. Linewise regions cover whole lines.
    pub fn operator_range(&self, doc: &Document) -> (isize, isize) {
        let (mut start, mut end) = self.sorted();
        let cursor = doc.cursor_position() as isize;
        match self.kind {
            TextObjectKind::Exclusive => {
                let (start_row, _) = doc.translate_index_to_position(absolute(doc, start));
                let (end_row, end_col) = doc.translate_index_to_position(absolute(doc, end));
                if end > start && end_col == 0 && end_row > start_row {
                    end -= 1;
                }
            }
            TextObjectKind::Inclusive | TextObjectKind::Block => end += 1,
            TextObjectKind::Linewise => {
                let (row, _) = doc.translate_index_to_position(absolute(doc, start));
                start = doc.translate_row_col_to_index(row, 0) as isize - cursor;
                let (row, _) = doc.translate_index_to_position(absolute(doc, end));
                end = doc.translate_row_col_to_index(row, doc.line_len(row)) as isize - cursor;
            }
        }
        (start, end)
    }

    /// First and last row touched by the region.
    pub fn line_numbers(&self, doc: &Document) -> (usize, usize) {
        let (start, end) = self.sorted();
        let from = doc.translate_index_to_position(absolute(doc, start)).0;
        let to = doc.translate_index_to_position(absolute(doc, end)).0;
        (from, to)
    }

    /// The region as a Vi selection (upper end included) over `doc`.
    fn as_selection(&self, doc: &Document) -> Option<Document> {
        let (start, end) = self.operator_range(doc);
        let from = absolute(doc, start);
        let to = absolute(doc, end);
        let to = match self.kind {
            TextObjectKind::Linewise => to,
            _ if to <= from => return None,
            _ => to - 1,
        };
        Some(
            Document::new(doc.text().to_string(), to)
                .with_selection(Some(Selection::new(from, self.selection_kind()))),
        )
    }

    /// Absolute char ranges covered by the region, one per line for blocks.
    pub fn ranges(&self, doc: &Document) -> Vec<(usize, usize)> {
        self.as_selection(doc)
            .map(|sel| sel.selection_ranges(true))
            .unwrap_or_default()
    }

    /// Document with the region removed plus what was removed. `None` when
    /// the region is empty.
    pub fn cut(&self, buffer: &Buffer) -> Option<(Document, ClipboardData)> {
        self.as_selection(buffer.document())
            .map(|sel| sel.cut_selection(true))
    }

    /// Like [`cut`](Self::cut), but a linewise region keeps its last newline
    /// so an empty line remains (`cj`, `c}`).
    pub fn cut_keeping_line(&self, buffer: &Buffer) -> Option<(Document, ClipboardData)> {
        if self.kind != TextObjectKind::Linewise {
            return self.cut(buffer);
        }
        let doc = buffer.document();
        let (start, end) = self.operator_range(doc);
        let (from, to) = (absolute(doc, start), absolute(doc, end));
        let removed = doc.slice(from, to).to_string();
        let text = format!("{}{}", doc.slice(0, from), doc.slice(to, doc.len()));
        Some((
            Document::new(text, from),
            ClipboardData::new(removed, SelectionKind::Lines),
        ))
    }
}

fn absolute(doc: &Document, relative: isize) -> usize {
    doc.offset_cursor(relative)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn buffer(text: &str, cursor: usize) -> Buffer {
        let mut b = Buffer::default();
        b.set_document(Document::new(text, cursor), false).unwrap();
        b
    }

    #[test]
    fn exclusive_end_in_column_zero_stops_at_previous_line() {
        let doc = Document::new("ab cd\nef", 3);
        // `w` from "cd" lands at the start of the next line.
        let obj = TextObject::new(3);
        assert_eq!(obj.operator_range(&doc), (0, 2));
    }

    #[test]
    fn inclusive_extends_by_one() {
        let doc = Document::new("hello", 0);
        assert_eq!(TextObject::inclusive(4).operator_range(&doc), (0, 5));
    }

    #[test]
    fn linewise_covers_whole_lines() {
        let doc = Document::new("one\ntwo\nthree", 5);
        let obj = TextObject::linewise(4);
        assert_eq!(obj.operator_range(&doc), (-1, 8));
        assert_eq!(obj.line_numbers(&doc), (1, 2));
    }

    #[test]
    fn cut_exclusive_word() {
        let b = buffer("foo bar", 0);
        let (doc, data) = TextObject::new(4).cut(&b).unwrap();
        assert_eq!(doc.text(), "bar");
        assert_eq!(data.text, "foo ");
    }

    #[test]
    fn cut_linewise_removes_line_and_newline() {
        let b = buffer("a\nb\nc", 2);
        let (doc, data) = TextObject::linewise(2).cut(&b).unwrap();
        assert_eq!(doc.text(), "a");
        assert_eq!(data, ClipboardData::new("b\nc", SelectionKind::Lines));
    }

    #[test]
    fn change_keeps_an_empty_line() {
        let b = buffer("a\nb\nc", 2);
        let (doc, data) = TextObject::linewise(2).cut_keeping_line(&b).unwrap();
        assert_eq!(doc.text(), "a\n");
        assert_eq!(doc.cursor_position(), 2);
        assert_eq!(data.text, "b\nc");
    }

    #[test]
    fn empty_region_cuts_nothing() {
        let b = buffer("abc", 0);
        assert!(TextObject::new(0).cut(&b).is_none());
    }
}
