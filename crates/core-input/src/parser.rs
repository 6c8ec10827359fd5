//! Incremental escape-sequence parser.
//!
//! Bytes arrive in arbitrary chunks. The parser keeps a pending prefix and
//! only commits to a key once the prefix can no longer grow into a longer
//! known sequence (or the caller flushes after the escape timeout). When a
//! prefix stops matching anything, the longest known shorter prefix is
//! emitted and the remainder re-examined; failing that the first char is
//! emitted literally. Splitting the input at any byte boundary therefore
//! yields the same key stream as feeding it whole.

use std::sync::atomic::Ordering;

use core_events::{KEYPRESS_TOTAL, Key, KeyPress, PASTE_BYTES, PASTE_SESSIONS};
use tracing::{debug, trace};

use crate::ansi::{PASTE_END, get_match, is_prefix_of_longer_match};
use crate::log_paste_flush;

#[derive(Debug, Default)]
pub struct KeyParser {
    /// Chars buffered while they may still be the start of a sequence.
    pending: String,
    /// Trailing bytes of an incomplete UTF-8 encoding.
    utf8_tail: Vec<u8>,
    /// Accumulated paste text while inside `ESC[200~ .. ESC[201~`.
    paste: Option<String>,
}

impl KeyParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed raw terminal bytes. Invalid UTF-8 is replaced with U+FFFD, an
    /// incomplete trailing encoding is kept for the next call.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<KeyPress> {
        self.utf8_tail.extend_from_slice(bytes);
        let mut text = String::new();
        let mut rest: &[u8] = &self.utf8_tail;
        loop {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    text.push_str(valid);
                    rest = &[];
                    break;
                }
                Err(err) => {
                    let (valid, after) = rest.split_at(err.valid_up_to());
                    // `valid_up_to` guarantees the head is well-formed.
                    text.push_str(&String::from_utf8_lossy(valid));
                    match err.error_len() {
                        Some(bad) => {
                            text.push(char::REPLACEMENT_CHARACTER);
                            rest = &after[bad..];
                        }
                        None => {
                            rest = after;
                            break;
                        }
                    }
                }
            }
        }
        self.utf8_tail = rest.to_vec();
        self.feed_str(&text)
    }

    /// Feed already decoded text.
    pub fn feed_str(&mut self, data: &str) -> Vec<KeyPress> {
        let mut out = Vec::new();
        self.feed_into(data, &mut out);
        out
    }

    /// Commit whatever is pending, e.g. a lone `ESC` after the escape timeout.
    /// An unterminated paste stays open.
    pub fn flush(&mut self) -> Vec<KeyPress> {
        let mut out = Vec::new();
        if self.paste.is_none() {
            self.process(&mut out, true);
        }
        if !out.is_empty() {
            trace!(target: "input.parser", keys = out.len(), "flush");
        }
        out
    }

    /// Whether keys are held back waiting for more input or a flush.
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn in_paste(&self) -> bool {
        self.paste.is_some()
    }

    fn feed_into(&mut self, data: &str, out: &mut Vec<KeyPress>) {
        if let Some(buf) = self.paste.as_mut() {
            buf.push_str(data);
            let Some(end) = buf.find(PASTE_END) else {
                return;
            };
            let remaining = buf[end + PASTE_END.len()..].to_string();
            buf.truncate(end);
            let content = normalize_newlines(buf);
            self.paste = None;
            log_paste_flush(&content);
            PASTE_SESSIONS.fetch_add(1, Ordering::Relaxed);
            PASTE_BYTES.fetch_add(content.len() as u64, Ordering::Relaxed);
            self.emit(out, Key::BracketedPaste, content);
            self.feed_into(&remaining, out);
            return;
        }
        for (idx, c) in data.char_indices() {
            self.pending.push(c);
            self.process(out, false);
            if self.paste.is_some() {
                let rest = &data[idx + c.len_utf8()..];
                self.feed_into(rest, out);
                return;
            }
        }
    }

    fn process(&mut self, out: &mut Vec<KeyPress>, flush: bool) {
        let mut flush = flush;
        while !self.pending.is_empty() {
            let longer = is_prefix_of_longer_match(&self.pending);
            if longer && !flush {
                return;
            }
            flush = false;
            if let Some(keys) = get_match(&self.pending) {
                let data = std::mem::take(&mut self.pending);
                self.emit_keys(out, keys, &data);
                continue;
            }
            // Longest shorter prefix that is a known sequence.
            let boundaries: Vec<usize> = self
                .pending
                .char_indices()
                .map(|(i, _)| i)
                .skip(1)
                .collect();
            let mut found = false;
            for &cut in boundaries.iter().rev() {
                if let Some(keys) = get_match(&self.pending[..cut]) {
                    let rest = self.pending.split_off(cut);
                    let data = std::mem::replace(&mut self.pending, rest);
                    self.emit_keys(out, keys, &data);
                    found = true;
                    break;
                }
            }
            if !found {
                let first_len = self.pending.chars().next().map_or(0, char::len_utf8);
                let rest = self.pending.split_off(first_len);
                let data = std::mem::replace(&mut self.pending, rest);
                if let Some(c) = data.chars().next() {
                    trace!(target: "input.parser", ch = ?c, "literal");
                    self.emit(out, Key::Char(c), data);
                }
            }
            if self.paste.is_some() {
                // Anything left behind the paste marker belongs to the paste body.
                let rest = std::mem::take(&mut self.pending);
                if let Some(buf) = self.paste.as_mut() {
                    buf.push_str(&rest);
                }
                return;
            }
        }
    }

    fn emit_keys(&mut self, out: &mut Vec<KeyPress>, keys: &[Key], data: &str) {
        for &key in keys {
            if key == Key::BracketedPaste {
                debug!(target: "input.paste", "start");
                self.paste = Some(String::new());
                continue;
            }
            self.emit(out, key, data.to_string());
        }
    }

    fn emit(&mut self, out: &mut Vec<KeyPress>, key: Key, data: String) {
        KEYPRESS_TOTAL.fetch_add(1, Ordering::Relaxed);
        out.push(KeyPress { key, data });
    }
}

fn normalize_newlines(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}
