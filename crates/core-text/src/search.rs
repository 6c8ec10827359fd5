//! Word, bracket, paragraph and substring queries on `Document`.
//!
//! All results are relative to the cursor. A "word" is a run of word chars
//! (alphanumeric or `_`) or a run of punctuation; a "WORD" (`big = true`) is
//! any run of non-whitespace.

use crate::Document;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CharClass {
    Space,
    Word,
    Punct,
}

fn classify(c: char, big: bool) -> CharClass {
    if c.is_whitespace() {
        CharClass::Space
    } else if big || c == '_' || c.is_alphanumeric() {
        CharClass::Word
    } else {
        CharClass::Punct
    }
}

/// Non-whitespace runs as `(start, end)` char offsets, in order.
fn word_runs(chars: &[char], big: bool) -> Vec<(usize, usize)> {
    let mut runs = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let class = classify(chars[i], big);
        if class == CharClass::Space {
            i += 1;
            continue;
        }
        let start = i;
        while i < chars.len() && classify(chars[i], big) == class {
            i += 1;
        }
        runs.push((start, i));
    }
    runs
}

/// Length of the leading run of one class (whitespace counts as a class here),
/// optionally followed by whitespace.
fn leading_run(chars: &[char], big: bool, include_whitespace: bool) -> usize {
    let Some(&first) = chars.first() else {
        return 0;
    };
    let class = classify(first, big);
    let mut end = chars
        .iter()
        .position(|&c| classify(c, big) != class)
        .unwrap_or(chars.len());
    if include_whitespace && class != CharClass::Space {
        while end < chars.len() && chars[end].is_whitespace() {
            end += 1;
        }
    }
    end
}

fn fold(c: char, ignore_case: bool) -> char {
    if ignore_case {
        c.to_lowercase().next().unwrap_or(c)
    } else {
        c
    }
}

/// Start offsets of non-overlapping occurrences of `needle` in `haystack`.
fn match_starts(haystack: &[char], needle: &[char], ignore_case: bool) -> Vec<usize> {
    let mut out = Vec::new();
    if needle.is_empty() || needle.len() > haystack.len() {
        return out;
    }
    let mut i = 0;
    while i + needle.len() <= haystack.len() {
        let hit = haystack[i..i + needle.len()]
            .iter()
            .zip(needle)
            .all(|(&a, &b)| fold(a, ignore_case) == fold(b, ignore_case));
        if hit {
            out.push(i);
            i += needle.len();
        } else {
            i += 1;
        }
    }
    out
}

impl Document {
    /// Offset of the `count`-th occurrence of `sub` after the cursor.
    pub fn find(
        &self,
        sub: &str,
        in_current_line: bool,
        include_current_position: bool,
        ignore_case: bool,
        count: usize,
    ) -> Option<isize> {
        let text = if in_current_line {
            self.current_line_after_cursor()
        } else {
            self.text_after_cursor()
        };
        let mut chars: Vec<char> = text.chars().collect();
        if !include_current_position {
            if chars.is_empty() {
                return None;
            }
            chars.remove(0);
        }
        let needle: Vec<char> = sub.chars().collect();
        let start = *match_starts(&chars, &needle, ignore_case).get(count.max(1) - 1)?;
        let shift = if include_current_position { 0 } else { 1 };
        Some((start + shift) as isize)
    }

    /// Absolute offsets of every occurrence of `sub`.
    pub fn find_all(&self, sub: &str, ignore_case: bool) -> Vec<usize> {
        let chars: Vec<char> = self.text().chars().collect();
        let needle: Vec<char> = sub.chars().collect();
        match_starts(&chars, &needle, ignore_case)
    }

    /// Negative offset of the `count`-th occurrence of `sub` before the cursor.
    pub fn find_backwards(
        &self,
        sub: &str,
        in_current_line: bool,
        ignore_case: bool,
        count: usize,
    ) -> Option<isize> {
        let text = if in_current_line {
            self.current_line_before_cursor()
        } else {
            self.text_before_cursor()
        };
        let reversed: Vec<char> = text.chars().rev().collect();
        let needle: Vec<char> = sub.chars().rev().collect();
        let start = *match_starts(&reversed, &needle, ignore_case).get(count.max(1) - 1)?;
        Some(-((start + needle.len()) as isize))
    }

    /// The word immediately before the cursor, empty if the cursor follows whitespace.
    pub fn get_word_before_cursor(&self, big: bool) -> &str {
        let before = self.text_before_cursor();
        if before.chars().next_back().is_none_or(char::is_whitespace) {
            return "";
        }
        match self.find_start_of_previous_word(1, big) {
            Some(start) => {
                let from = self.offset_cursor(start);
                self.slice(from, self.cursor_position())
            }
            None => "",
        }
    }

    /// Start of the `count`-th word before the cursor (Emacs `M-b`).
    pub fn find_start_of_previous_word(&self, count: usize, big: bool) -> Option<isize> {
        let reversed: Vec<char> = self.text_before_cursor().chars().rev().collect();
        let (_, end) = *word_runs(&reversed, big).get(count.max(1) - 1)?;
        Some(-(end as isize))
    }

    /// Beginning of the `count`-th next word (Vi `w`). The word under the cursor doesn't count.
    pub fn find_next_word_beginning(&self, count: usize, big: bool) -> Option<isize> {
        let chars: Vec<char> = self.text_after_cursor().chars().collect();
        let runs = word_runs(&chars, big);
        let mut count = count.max(1);
        if runs.first().is_some_and(|&(start, _)| start == 0) {
            count += 1;
        }
        runs.get(count - 1).map(|&(start, _)| start as isize)
    }

    /// End (exclusive) of the `count`-th next word (Emacs `M-f`), or the last
    /// char of it when used as Vi `e` (`include_current_position = false`).
    pub fn find_next_word_ending(
        &self,
        include_current_position: bool,
        count: usize,
        big: bool,
    ) -> Option<isize> {
        let mut chars: Vec<char> = self.text_after_cursor().chars().collect();
        if !include_current_position {
            if chars.is_empty() {
                return None;
            }
            chars.remove(0);
        }
        let (_, end) = *word_runs(&chars, big).get(count.max(1) - 1)?;
        Some(if include_current_position {
            end as isize
        } else {
            end as isize + 1
        })
    }

    /// Beginning of the `count`-th previous word (Vi `b`).
    pub fn find_previous_word_beginning(&self, count: usize, big: bool) -> Option<isize> {
        self.find_start_of_previous_word(count, big)
    }

    /// Last char of the `count`-th previous word (Vi `ge`).
    pub fn find_previous_word_ending(&self, count: usize, big: bool) -> Option<isize> {
        let mut chars: Vec<char> = self.text_after_cursor().chars().take(1).collect();
        chars.extend(self.text_before_cursor().chars().rev());
        let runs = word_runs(&chars, big);
        let mut count = count.max(1);
        if runs.first().is_some_and(|&(start, _)| start == 0) {
            count += 1;
        }
        runs.get(count - 1).map(|&(start, _)| 1 - start as isize)
    }

    /// Relative `(start, end)` of the word (or whitespace run) around the cursor
    /// on the current line.
    pub fn find_boundaries_of_current_word(
        &self,
        big: bool,
        include_leading_whitespace: bool,
        include_trailing_whitespace: bool,
    ) -> (isize, isize) {
        let before: Vec<char> = self.current_line_before_cursor().chars().rev().collect();
        let after: Vec<char> = self.current_line_after_cursor().chars().collect();
        let mut start = leading_run(&before, big, include_leading_whitespace);
        let end = leading_run(&after, big, include_trailing_whitespace);
        if !big
            && start > 0
            && end > 0
            && let (Some(&c1), Some(&c2)) = (before.first(), after.first())
            && (classify(c1, false) == CharClass::Word) != (classify(c2, false) == CharClass::Word)
        {
            start = 0;
        }
        (-(start as isize), end as isize)
    }

    /// Word (or WORD) under the cursor.
    pub fn get_word_under_cursor(&self, big: bool) -> &str {
        let (start, end) = self.find_boundaries_of_current_word(big, false, false);
        self.slice(self.offset_cursor(start), self.offset_cursor(end))
    }

    /// Offset of the bracket matching the one under the cursor, or 0.
    pub fn find_matching_bracket_position(
        &self,
        start_pos: Option<usize>,
        end_pos: Option<usize>,
    ) -> isize {
        let Some(current) = self.current_char() else {
            return 0;
        };
        for (left, right) in [('(', ')'), ('[', ']'), ('{', '}'), ('<', '>')] {
            if current == left {
                return self.find_enclosing_bracket_right(left, right, end_pos).unwrap_or(0);
            }
            if current == right {
                return self.find_enclosing_bracket_left(left, right, start_pos).unwrap_or(0);
            }
        }
        0
    }

    /// Offset of the closing bracket enclosing the cursor.
    pub fn find_enclosing_bracket_right(
        &self,
        left: char,
        right: char,
        end_pos: Option<usize>,
    ) -> Option<isize> {
        if self.current_char() == Some(right) {
            return Some(0);
        }
        let end = end_pos.unwrap_or(self.len()).min(self.len());
        let mut depth = 1usize;
        for (i, c) in self
            .text()
            .chars()
            .enumerate()
            .skip(self.cursor_position() + 1)
            .take_while(|(i, _)| *i < end)
        {
            if c == left {
                depth += 1;
            } else if c == right {
                depth -= 1;
            }
            if depth == 0 {
                return Some(i as isize - self.cursor_position() as isize);
            }
        }
        None
    }

    /// Offset of the opening bracket enclosing the cursor.
    pub fn find_enclosing_bracket_left(
        &self,
        left: char,
        right: char,
        start_pos: Option<usize>,
    ) -> Option<isize> {
        if self.current_char() == Some(left) {
            return Some(0);
        }
        let start = start_pos.unwrap_or(0);
        let before: Vec<char> = self.text_before_cursor().chars().collect();
        let mut depth = 1usize;
        for i in (start..before.len()).rev() {
            let c = before[i];
            if c == right {
                depth += 1;
            } else if c == left {
                depth -= 1;
            }
            if depth == 0 {
                return Some(i as isize - self.cursor_position() as isize);
            }
        }
        None
    }

    /// Rows below the cursor of the `count`-th line satisfying `pred`.
    pub fn find_next_matching_line<F>(&self, pred: F, count: usize) -> Option<isize>
    where
        F: Fn(&str) -> bool,
    {
        let row = self.cursor_position_row();
        self.lines()
            .enumerate()
            .skip(row + 1)
            .filter(|(_, line)| pred(line))
            .nth(count.max(1) - 1)
            .map(|(i, _)| (i - row) as isize)
    }

    /// Rows above the cursor (negative) of the `count`-th line satisfying `pred`.
    pub fn find_previous_matching_line<F>(&self, pred: F, count: usize) -> Option<isize>
    where
        F: Fn(&str) -> bool,
    {
        let row = self.cursor_position_row();
        let lines: Vec<&str> = self.lines().take(row).collect();
        lines
            .iter()
            .enumerate()
            .rev()
            .filter(|(_, line)| pred(line))
            .nth(count.max(1) - 1)
            .map(|(i, _)| i as isize - row as isize)
    }

    /// Vi `{`: offset to the blank line above (or its successor when `before` is false).
    pub fn start_of_paragraph(&self, count: usize, before: bool) -> isize {
        let blank = |line: &str| line.trim().is_empty();
        match self.find_previous_matching_line(blank, count) {
            Some(rows) => {
                let up = self.get_cursor_up_position(rows.unsigned_abs(), Some(0));
                let add = if before { 0 } else { 1 };
                (up + add).min(0)
            }
            None => self.get_start_of_document_position(),
        }
    }

    /// Vi `}`: offset to the blank line below.
    pub fn end_of_paragraph(&self, count: usize, after: bool) -> isize {
        let blank = |line: &str| line.trim().is_empty();
        match self.find_next_matching_line(blank, count) {
            Some(rows) => {
                let down = self.get_cursor_down_position(rows as usize, Some(0));
                let sub = if after { 0 } else { 1 };
                (down - sub).max(0)
            }
            None => self.get_end_of_document_position(),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::Document;

    #[test]
    fn find_forward_and_backward() {
        let d = Document::new("abc abc ABC", 0);
        assert_eq!(d.find("abc", false, true, false, 1), Some(0));
        assert_eq!(d.find("abc", false, false, false, 1), Some(4));
        assert_eq!(d.find("abc", false, false, true, 2), Some(8));
        assert_eq!(d.find("zzz", false, true, false, 1), None);
        let d = Document::at_end("abc abc");
        assert_eq!(d.find_backwards("abc", false, false, 1), Some(-3));
        assert_eq!(d.find_backwards("abc", false, false, 2), Some(-7));
    }

    #[test]
    fn next_word_beginning_skips_current_word() {
        let d = Document::new("foo bar.baz", 0);
        assert_eq!(d.find_next_word_beginning(1, false), Some(4));
        assert_eq!(d.find_next_word_beginning(2, false), Some(7));
        assert_eq!(d.find_next_word_beginning(2, true), None);
        let d = Document::new("foo  bar", 3);
        assert_eq!(d.find_next_word_beginning(1, false), Some(2));
    }

    #[test]
    fn next_word_ending_vi_and_emacs() {
        let d = Document::new("foo bar", 0);
        // Emacs M-f: end of "foo".
        assert_eq!(d.find_next_word_ending(true, 1, false), Some(3));
        // Vi e: last char of "foo" is reached from inside the word by skipping the current char.
        assert_eq!(d.find_next_word_ending(false, 1, false), Some(3));
        let d = Document::new("foo bar", 2);
        assert_eq!(d.find_next_word_ending(false, 1, false), Some(5));
    }

    #[test]
    fn previous_word_positions() {
        let d = Document::at_end("foo bar  ");
        assert_eq!(d.find_start_of_previous_word(1, false), Some(-5));
        assert_eq!(d.find_start_of_previous_word(2, false), Some(-9));
        assert_eq!(d.get_word_before_cursor(false), "");
        let d = Document::at_end("echo foo.bar");
        assert_eq!(d.get_word_before_cursor(false), "bar");
        assert_eq!(d.get_word_before_cursor(true), "foo.bar");
    }

    #[test]
    fn current_word_boundaries() {
        let d = Document::new("hello world", 2);
        assert_eq!(d.find_boundaries_of_current_word(false, false, false), (-2, 3));
        assert_eq!(d.find_boundaries_of_current_word(false, false, true), (-2, 4));
        assert_eq!(d.get_word_under_cursor(false), "hello");
        let d = Document::new("ab.cd", 2);
        assert_eq!(d.find_boundaries_of_current_word(false, false, false), (0, 1));
    }

    #[test]
    fn matching_brackets() {
        let d = Document::new("f(a, (b))", 1);
        assert_eq!(d.find_matching_bracket_position(None, None), 7);
        let d = Document::new("f(a, (b))", 8);
        assert_eq!(d.find_matching_bracket_position(None, None), -7);
        let d = Document::new("f(a, (b))", 3);
        assert_eq!(d.find_enclosing_bracket_left('(', ')', None), Some(-2));
        assert_eq!(d.find_enclosing_bracket_right('(', ')', None), Some(5));
    }

    #[test]
    fn paragraphs() {
        let d = Document::new("a\nb\n\nc\nd", 6);
        assert_eq!(d.start_of_paragraph(1, false), -1);
        assert_eq!(d.start_of_paragraph(1, true), -2);
        let d = Document::new("a\nb\n\nc", 0);
        assert_eq!(d.end_of_paragraph(1, true), 4);
    }
}
