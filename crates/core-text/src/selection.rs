//! Selection ranges, cut and paste on `Document`.

use crate::Document;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionKind {
    #[default]
    Characters,
    Lines,
    Block,
}

/// Selection anchored at `anchor`; the other end is always the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub anchor: usize,
    pub kind: SelectionKind,
}

impl Selection {
    pub fn new(anchor: usize, kind: SelectionKind) -> Self {
        Self { anchor, kind }
    }
}

/// Text moved through the clipboard, tagged with how it was selected.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ClipboardData {
    pub text: String,
    pub kind: SelectionKind,
}

impl ClipboardData {
    pub fn new(text: impl Into<String>, kind: SelectionKind) -> Self {
        Self {
            text: text.into(),
            kind,
        }
    }

    pub fn characters(text: impl Into<String>) -> Self {
        Self::new(text, SelectionKind::Characters)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasteMode {
    /// Insert at the cursor.
    Emacs,
    /// After the cursor character (or below the current line).
    ViAfter,
    /// Before the cursor (or above the current line).
    ViBefore,
}

impl Document {
    /// Sorted `(from, to)` of the selection; `(cursor, cursor)` without one.
    pub fn selection_range(&self) -> (usize, usize) {
        match self.selection() {
            Some(sel) => {
                let (a, b) = (self.cursor_position(), sel.anchor);
                (a.min(b), a.max(b))
            }
            None => (self.cursor_position(), self.cursor_position()),
        }
    }

    /// Half-open char ranges covered by the selection. Block selections yield
    /// one range per line. `inclusive` includes the char under the upper end
    /// (Vi semantics).
    pub fn selection_ranges(&self, inclusive: bool) -> Vec<(usize, usize)> {
        let Some(sel) = self.selection() else {
            return Vec::new();
        };
        let (from, to) = self.selection_range();
        match sel.kind {
            SelectionKind::Block => {
                let (from_row, from_col) = self.translate_index_to_position(from);
                let (to_row, to_col) = self.translate_index_to_position(to);
                let (left, mut right) = (from_col.min(to_col), from_col.max(to_col));
                if inclusive {
                    right += 1;
                }
                (from_row..=to_row)
                    .filter(|&row| left <= self.line_len(row))
                    .map(|row| {
                        let len = self.line_len(row);
                        (
                            self.translate_row_col_to_index(row, left),
                            self.translate_row_col_to_index(row, right.min(len)),
                        )
                    })
                    .collect()
            }
            SelectionKind::Lines => {
                let from_row = self.translate_index_to_position(from).0;
                let to_row = self.translate_index_to_position(to).0;
                let start = self.line_start_index(from_row);
                let mut end = self.line_start_index(to_row) + self.line_len(to_row);
                if inclusive && end < self.len() {
                    // Swallow the newline terminating the last selected line.
                    end += 1;
                }
                vec![(start, end)]
            }
            SelectionKind::Characters => {
                let end = if inclusive { (to + 1).min(self.len()) } else { to };
                vec![(from, end)]
            }
        }
    }

    /// Range of the selection on `row`, used to highlight it while rendering.
    pub fn selection_range_at_line(&self, row: usize, inclusive: bool) -> Option<(usize, usize)> {
        let sel = self.selection()?;
        let (from, to) = self.selection_range();
        let (from_row, from_col) = self.translate_index_to_position(from);
        let (to_row, to_col) = self.translate_index_to_position(to);
        if row < from_row || row > to_row {
            return None;
        }
        let len = self.line_len(row);
        let extra = usize::from(inclusive);
        let (start, end) = match sel.kind {
            SelectionKind::Lines => (0, len),
            SelectionKind::Block => {
                let (l, r) = (from_col.min(to_col), from_col.max(to_col));
                (l.min(len), (r + extra).min(len))
            }
            SelectionKind::Characters => {
                let start = if row == from_row { from_col } else { 0 };
                let end = if row == to_row { (to_col + extra).min(len) } else { len };
                (start, end)
            }
        };
        (start <= end).then_some((start, end))
    }

    /// Remove the selected text. Returns the new document (selection cleared)
    /// and what was cut.
    pub fn cut_selection(&self, inclusive: bool) -> (Document, ClipboardData) {
        let Some(sel) = self.selection() else {
            return (self.clone(), ClipboardData::default());
        };
        let chars: Vec<char> = self.text().chars().collect();
        let mut ranges = self.selection_ranges(inclusive);
        if sel.kind == SelectionKind::Lines
            && let Some(last) = ranges.last_mut()
            && last.1 == chars.len()
            && last.0 > 0
            && inclusive
        {
            // Deleting through the last line: take the newline above instead.
            last.0 -= 1;
        }
        let mut remaining = String::new();
        let mut cut_parts: Vec<String> = Vec::new();
        let mut last_to = 0;
        let mut new_cursor = self.cursor_position();
        for (i, &(from, to)) in ranges.iter().enumerate() {
            if i == 0 {
                new_cursor = from;
            }
            remaining.extend(&chars[last_to..from]);
            cut_parts.push(chars[from..to].iter().collect());
            last_to = to;
        }
        remaining.extend(&chars[last_to..]);
        let mut cut = cut_parts.join("\n");
        if sel.kind == SelectionKind::Lines {
            if cut.ends_with('\n') {
                cut.pop();
            } else if cut.starts_with('\n') {
                cut.remove(0);
            }
        }
        (
            Document::new(remaining, new_cursor),
            ClipboardData::new(cut, sel.kind),
        )
    }

    /// Insert clipboard data `count` times according to `mode`.
    pub fn paste_clipboard_data(&self, data: &ClipboardData, mode: PasteMode, count: usize) -> Document {
        let count = count.max(1);
        let before = mode == PasteMode::ViBefore;
        let after = mode == PasteMode::ViAfter;
        match data.kind {
            SelectionKind::Characters => {
                let repeated = data.text.repeat(count);
                let split = if after && !self.is_cursor_at_the_end_of_line() {
                    self.cursor_position() + 1
                } else {
                    self.cursor_position()
                };
                let text = format!("{}{}{}", self.slice(0, split), repeated, self.slice(split, self.len()));
                let mut cursor = split + repeated.chars().count();
                if mode != PasteMode::Emacs {
                    cursor = cursor.saturating_sub(1);
                }
                Document::new(text, cursor)
            }
            SelectionKind::Lines => {
                let row = self.cursor_position_row();
                let mut lines: Vec<String> = self.lines().map(str::to_owned).collect();
                let at = if before { row } else { row + 1 };
                for _ in 0..count {
                    lines.insert(at, data.text.clone());
                }
                let cursor = lines[..at].iter().map(|l| l.chars().count() + 1).sum();
                Document::new(lines.join("\n"), cursor)
            }
            SelectionKind::Block => {
                let mut lines: Vec<String> = self.lines().map(str::to_owned).collect();
                let start_row = self.cursor_position_row();
                let start_col = self.cursor_position_col() + usize::from(!before);
                for (i, piece) in data.text.split('\n').enumerate() {
                    let row = start_row + i;
                    if row >= lines.len() {
                        lines.push(String::new());
                    }
                    let mut chars: Vec<char> = lines[row].chars().collect();
                    while chars.len() < start_col {
                        chars.push(' ');
                    }
                    let tail: String = chars[start_col..].iter().collect();
                    let head: String = chars[..start_col].iter().collect();
                    lines[row] = format!("{head}{}{tail}", piece.repeat(count));
                }
                let cursor = self.cursor_position() + usize::from(!before);
                Document::new(lines.join("\n"), cursor)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sel(doc: Document, anchor: usize, kind: SelectionKind) -> Document {
        doc.with_selection(Some(Selection::new(anchor, kind)))
    }

    #[test]
    fn character_cut_exclusive_and_inclusive() {
        let d = sel(Document::new("hello world", 4), 0, SelectionKind::Characters);
        let (doc, data) = d.cut_selection(false);
        assert_eq!(data.text, "hell");
        assert_eq!(doc.text(), "o world");
        let (doc, data) = d.cut_selection(true);
        assert_eq!(data.text, "hello");
        assert_eq!(doc.text(), " world");
        assert_eq!(doc.cursor_position(), 0);
    }

    #[test]
    fn line_cut_drops_the_newline() {
        let d = sel(Document::new("one\ntwo\nthree", 5), 5, SelectionKind::Lines);
        let (doc, data) = d.cut_selection(true);
        assert_eq!(data, ClipboardData::new("two", SelectionKind::Lines));
        assert_eq!(doc.text(), "one\nthree");
        let d = sel(Document::new("one\ntwo", 5), 5, SelectionKind::Lines);
        let (doc, data) = d.cut_selection(true);
        assert_eq!(data.text, "two");
        assert_eq!(doc.text(), "one");
    }

    #[test]
    fn block_cut_spans_columns() {
        let d = sel(Document::new("abcd\nefgh\nij", 11), 1, SelectionKind::Block);
        let (doc, data) = d.cut_selection(true);
        assert_eq!(data.text, "b\nf\nj");
        assert_eq!(doc.text(), "acd\negh\ni");
    }

    #[test]
    fn paste_modes() {
        let d = Document::new("abc", 1);
        let chars = ClipboardData::characters("XY");
        assert_eq!(d.paste_clipboard_data(&chars, PasteMode::Emacs, 1).text(), "aXYbc");
        let after = d.paste_clipboard_data(&chars, PasteMode::ViAfter, 2);
        assert_eq!(after.text(), "abXYXYc");
        assert_eq!(after.cursor_position(), 5);
        let lines = ClipboardData::new("new", SelectionKind::Lines);
        let d = Document::new("one\ntwo", 5);
        let below = d.paste_clipboard_data(&lines, PasteMode::ViAfter, 1);
        assert_eq!(below.text(), "one\ntwo\nnew");
        assert_eq!(below.cursor_position(), 8);
        let above = d.paste_clipboard_data(&lines, PasteMode::ViBefore, 1);
        assert_eq!(above.text(), "one\nnew\ntwo");
        assert_eq!(above.cursor_position(), 4);
    }

    #[test]
    fn selection_range_per_line() {
        let d = sel(Document::new("abc\ndef", 5), 1, SelectionKind::Characters);
        assert_eq!(d.selection_range_at_line(0, true), Some((1, 3)));
        assert_eq!(d.selection_range_at_line(1, true), Some((0, 2)));
        assert_eq!(d.selection_range_at_line(2, true), None);
    }
}
