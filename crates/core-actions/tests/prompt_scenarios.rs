//! End-to-end key scenarios: raw bytes through the parser and dispatcher.

mod common;

use std::sync::Arc;

use common::Harness;
use core_state::{CompleteEvent, Completion, EditingMode, SessionError};
use core_text::Document;
use pretty_assertions::assert_eq;

#[test]
fn emacs_home_then_insert() {
    let mut h = Harness::new(EditingMode::Emacs);
    h.type_str("hello\x01X\r");
    assert_eq!(h.accepted(), Some("Xhello"));
}

#[test]
fn vi_count_motion_then_delete_to_end() {
    let mut h = Harness::new(EditingMode::Vi);
    h.type_str("hello\x1b2hD\r");
    assert_eq!(h.accepted(), Some("he"));
}

#[test]
fn emacs_keyboard_macro_replays_twice() {
    let mut h = Harness::new(EditingMode::Emacs);
    h.type_str("\x18(hello\x18)\x18e\x18e\r");
    assert_eq!(h.accepted(), Some("hellohellohello"));
}

#[test]
fn transpose_chars_after_arrow_keys() {
    let mut h = Harness::new(EditingMode::Emacs);
    h.type_str("hello\x1b[D\x1b[D\x14\r");
    assert_eq!(h.accepted(), Some("helol"));
}

#[test]
fn read_only_buffer_refuses_vi_insert() {
    let mut h = Harness::new(EditingMode::Vi).with_text("fixed").navigation().read_only();
    h.type_str("ixyz");
    assert_eq!(h.text(), "fixed");
    assert!(h.state.take_bell());
    assert!(h.dispatcher.metrics().read_only_refusals > 0);
}

#[test]
fn ctrl_c_aborts_prompt() {
    let mut h = Harness::new(EditingMode::Emacs);
    h.type_str("abc\x03");
    assert_eq!(h.result(), Some(&Err(SessionError::UserAbort)));
}

#[test]
fn ctrl_d_on_empty_line_exits() {
    let mut h = Harness::new(EditingMode::Emacs);
    h.type_str("\x04");
    assert_eq!(h.result(), Some(&Err(SessionError::UserExit)));
}

#[test]
fn bytes_split_across_reads_give_same_keys() {
    let mut h = Harness::new(EditingMode::Emacs);
    h.type_str("ab");
    h.feed_bytes(b"\x1b[");
    assert_eq!(h.text(), "ab");
    h.feed_bytes(b"D");
    h.type_str("X\r");
    assert_eq!(h.accepted(), Some("aXb"));
}

#[test]
fn bracketed_paste_inserts_text_verbatim() {
    let mut h = Harness::new(EditingMode::Emacs);
    h.type_str("\x1b[200~one\ntwo\x1b[201~");
    assert_eq!(h.text(), "one\ntwo");
    assert!(h.result().is_none());
}

#[test]
fn reverse_search_then_edit() {
    let mut h = Harness::new(EditingMode::Emacs).with_text("git commit; git push");
    h.type_str("\x12git\x12\x05!\r");
    assert_eq!(h.accepted(), Some("git commit; git push!"));
}

#[test]
fn reverse_search_abort_keeps_text() {
    let mut h = Harness::new(EditingMode::Emacs).with_text("abc");
    h.type_str("\x12a\x07");
    assert_eq!(h.cursor(), 3);
    assert!(h.state.buffer.isearch().is_none());
}

#[test]
fn tab_completion_then_accept() {
    let words = |doc: &Document, _: &CompleteEvent| -> Vec<Completion> {
        let word = doc.get_word_before_cursor(false);
        let start = -(word.chars().count() as isize);
        ["select", "session", "set"]
            .into_iter()
            .filter(|w| w.starts_with(word))
            .map(|w| Completion::new(w, start))
            .collect()
    };
    let mut h = Harness::with_completer(EditingMode::Emacs, Arc::new(words));
    h.type_str("sel\t\r");
    assert_eq!(h.accepted(), Some("select"));
}

#[test]
fn vi_change_inner_word() {
    let mut h = Harness::new(EditingMode::Vi);
    h.type_str("one two three\x1b0wciwTWO\x1b\r");
    assert_eq!(h.accepted(), Some("one TWO three"));
}
