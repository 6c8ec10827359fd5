//! Vi operator and motion scenarios fed as raw bytes, starting in
//! navigation mode with the cursor on the first character.

mod common;

use common::Harness;
use core_state::{EditingMode, InputMode};
use pretty_assertions::assert_eq;

struct Scenario {
    initial: &'static str,
    keys: &'static str,
    text: &'static str,
}

fn run(s: &Scenario) -> Harness {
    let mut h = Harness::new(EditingMode::Vi).with_text(s.initial).navigation();
    h.state.buffer.set_cursor_position(0);
    h.type_str(s.keys);
    h
}

fn check(cases: &[Scenario]) {
    for s in cases {
        let h = run(s);
        assert_eq!(h.text(), s.text, "{:?} on {:?}", s.keys, s.initial);
    }
}

#[test]
fn operators_with_motions() {
    check(&[
        Scenario { initial: "hello world", keys: "dw", text: "world" },
        Scenario { initial: "hello world", keys: "wD", text: "hello " },
        Scenario { initial: "hello world", keys: "x", text: "ello world" },
        Scenario { initial: "hello world", keys: "dtw", text: "world" },
        Scenario { initial: "one two three", keys: "d2w", text: "three" },
        Scenario { initial: "one two three", keys: "2dw", text: "three" },
        Scenario { initial: "hello world", keys: "dd", text: "" },
    ]);
}

#[test]
fn change_and_case_operators() {
    check(&[
        Scenario { initial: "hello world", keys: "ceHEY\x1b", text: "HEY world" },
        Scenario { initial: "hello world", keys: "gUiw", text: "HELLO world" },
        Scenario { initial: "hello world", keys: "~~~", text: "HELlo world" },
        Scenario { initial: "f(a, b)", keys: "f,di(", text: "f()" },
    ]);
}

#[test]
fn undo_and_redo() {
    check(&[
        Scenario { initial: "hello world", keys: "dwu", text: "hello world" },
        Scenario { initial: "hello world", keys: "dwu\x12", text: "world" },
    ]);
}

#[test]
fn registers_and_put() {
    check(&[
        Scenario { initial: "hello world", keys: "\"ayw$\"ap", text: "hello worldhello " },
        Scenario { initial: "a\nb", keys: "J", text: "a b" },
    ]);
}

#[test]
fn arrow_keys_move_in_insert_mode() {
    let mut h = Harness::new(EditingMode::Vi);
    h.type_str("abc\x1b[D\x1b[DX");
    assert_eq!(h.text(), "aXbc");
    assert_eq!(h.state.vi.input_mode, InputMode::Insert);
}

#[test]
fn escape_then_insert_at_line_start() {
    let mut h = Harness::new(EditingMode::Vi);
    h.type_str("world\x1bIhello \x1b\r");
    assert_eq!(h.accepted(), Some("hello world"));
}
