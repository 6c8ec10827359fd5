//! Readline commands, reachable by name from `[keys]` in the config.
//!
//! Each command is a plain function over a [`KeyEvent`]; [`get`] wraps it in
//! a shareable [`Handler`]. The Emacs table binds most of them directly.

use std::rc::Rc;

use core_events::{Key, KeyPress};
use core_state::{
    CompleteEvent, CompletionSelect, EditingMode, SearchDirection, SessionRequest,
};
use core_text::{Document, PasteMode};
use tracing::debug;

use crate::{Handler, HandlerResult, KeyEvent};

type Command = fn(&mut KeyEvent<'_>) -> HandlerResult;

const COMMANDS: &[(&str, Command)] = &[
    // Movement
    ("beginning-of-buffer", beginning_of_buffer),
    ("end-of-buffer", end_of_buffer),
    ("beginning-of-line", beginning_of_line),
    ("end-of-line", end_of_line),
    ("forward-char", forward_char),
    ("backward-char", backward_char),
    ("forward-word", forward_word),
    ("backward-word", backward_word),
    ("clear-screen", clear_screen),
    ("redraw-current-line", redraw_current_line),
    // History
    ("accept-line", accept_line),
    ("previous-history", previous_history),
    ("next-history", next_history),
    ("beginning-of-history", beginning_of_history),
    ("end-of-history", end_of_history),
    ("reverse-search-history", reverse_search_history),
    ("forward-search-history", forward_search_history),
    // Text
    ("end-of-file", end_of_file),
    ("delete-char", delete_char),
    ("backward-delete-char", backward_delete_char),
    ("self-insert", self_insert),
    ("transpose-chars", transpose_chars),
    ("uppercase-word", uppercase_word),
    ("downcase-word", downcase_word),
    ("capitalize-word", capitalize_word),
    ("quoted-insert", quoted_insert),
    // Killing and yanking
    ("kill-line", kill_line),
    ("kill-word", kill_word),
    ("unix-word-rubout", unix_word_rubout),
    ("backward-kill-word", backward_kill_word),
    ("delete-horizontal-space", delete_horizontal_space),
    ("unix-line-discard", unix_line_discard),
    ("yank", yank),
    ("yank-nth-arg", yank_nth_arg),
    ("yank-last-arg", yank_last_arg),
    ("yank-pop", yank_pop),
    // Completion
    ("complete", complete),
    ("menu-complete", complete),
    ("menu-complete-backward", menu_complete_backward),
    // Macros
    ("start-kbd-macro", start_kbd_macro),
    ("end-kbd-macro", end_kbd_macro),
    ("call-last-kbd-macro", call_last_kbd_macro),
    // Misc
    ("undo", undo),
    ("insert-comment", insert_comment),
    ("vi-editing-mode", vi_editing_mode),
    ("emacs-editing-mode", emacs_editing_mode),
    ("prefix-meta", prefix_meta),
    ("edit-and-execute-command", edit_and_execute_command),
];

/// Handler for the readline command `name`.
pub fn get(name: &str) -> Option<Handler> {
    COMMANDS
        .iter()
        .find(|(n, _)| *n == name)
        .map(|&(_, command)| Rc::new(command) as Handler)
}

/// Every command name, in table order.
pub fn names() -> impl Iterator<Item = &'static str> {
    COMMANDS.iter().map(|(n, _)| *n)
}

// -------------------------------------------------------------------------
// Movement
// -------------------------------------------------------------------------

pub fn beginning_of_buffer(event: &mut KeyEvent<'_>) -> HandlerResult {
    event.buffer().set_cursor_position(0);
    Ok(())
}

pub fn end_of_buffer(event: &mut KeyEvent<'_>) -> HandlerResult {
    let buffer = event.buffer();
    let end = buffer.document().len();
    buffer.set_cursor_position(end);
    Ok(())
}

pub fn beginning_of_line(event: &mut KeyEvent<'_>) -> HandlerResult {
    let buffer = event.buffer();
    let delta = buffer.document().get_start_of_line_position(false);
    buffer.move_cursor(delta);
    Ok(())
}

pub fn end_of_line(event: &mut KeyEvent<'_>) -> HandlerResult {
    let buffer = event.buffer();
    let delta = buffer.document().get_end_of_line_position();
    buffer.move_cursor(delta);
    Ok(())
}

pub fn forward_char(event: &mut KeyEvent<'_>) -> HandlerResult {
    let count = event.count();
    event.buffer().cursor_right(count);
    Ok(())
}

pub fn backward_char(event: &mut KeyEvent<'_>) -> HandlerResult {
    let count = event.count();
    event.buffer().cursor_left(count);
    Ok(())
}

/// To the end of the next word.
pub fn forward_word(event: &mut KeyEvent<'_>) -> HandlerResult {
    let count = event.count();
    let buffer = event.buffer();
    if let Some(delta) = buffer.document().find_next_word_ending(false, count, false) {
        buffer.move_cursor(delta);
    }
    Ok(())
}

pub fn backward_word(event: &mut KeyEvent<'_>) -> HandlerResult {
    let count = event.count();
    let buffer = event.buffer();
    if let Some(delta) = buffer.document().find_previous_word_beginning(count, false) {
        buffer.move_cursor(delta);
    }
    Ok(())
}

pub fn clear_screen(event: &mut KeyEvent<'_>) -> HandlerResult {
    event.state.request(SessionRequest::ClearScreen);
    Ok(())
}

/// Every frame is redrawn after a key press already.
pub fn redraw_current_line(_event: &mut KeyEvent<'_>) -> HandlerResult {
    Ok(())
}

// -------------------------------------------------------------------------
// History
// -------------------------------------------------------------------------

pub fn accept_line(event: &mut KeyEvent<'_>) -> HandlerResult {
    event.state.accept_input();
    Ok(())
}

pub fn previous_history(event: &mut KeyEvent<'_>) -> HandlerResult {
    let count = event.count();
    event.buffer().history_backward(count);
    Ok(())
}

pub fn next_history(event: &mut KeyEvent<'_>) -> HandlerResult {
    let count = event.count();
    event.buffer().history_forward(count);
    Ok(())
}

pub fn beginning_of_history(event: &mut KeyEvent<'_>) -> HandlerResult {
    event.buffer().go_to_history(0);
    Ok(())
}

/// Back to the line being edited.
pub fn end_of_history(event: &mut KeyEvent<'_>) -> HandlerResult {
    let buffer = event.buffer();
    let last = buffer.working_lines().len().saturating_sub(1);
    buffer.go_to_history(last);
    Ok(())
}

pub fn reverse_search_history(event: &mut KeyEvent<'_>) -> HandlerResult {
    event.buffer().start_isearch(SearchDirection::Backward, false);
    Ok(())
}

pub fn forward_search_history(event: &mut KeyEvent<'_>) -> HandlerResult {
    event.buffer().start_isearch(SearchDirection::Forward, false);
    Ok(())
}

// -------------------------------------------------------------------------
// Text
// -------------------------------------------------------------------------

pub fn end_of_file(event: &mut KeyEvent<'_>) -> HandlerResult {
    event.state.exit();
    Ok(())
}

pub fn delete_char(event: &mut KeyEvent<'_>) -> HandlerResult {
    let count = event.count();
    let deleted = event.buffer().delete(count)?;
    if deleted.is_empty() {
        event.state.ring_bell();
    }
    Ok(())
}

/// A negative argument deletes forward.
pub fn backward_delete_char(event: &mut KeyEvent<'_>) -> HandlerResult {
    let (arg, count) = (event.arg(), event.count());
    let deleted = if arg < 0 {
        event.buffer().delete(count)?
    } else {
        event.buffer().delete_before_cursor(count)?
    };
    if deleted.is_empty() {
        event.state.ring_bell();
    }
    Ok(())
}

pub fn self_insert(event: &mut KeyEvent<'_>) -> HandlerResult {
    let data = event.data().repeat(event.count());
    if data.chars().any(char::is_control) {
        return Ok(());
    }
    event.buffer().insert_text(&data, false, true)
}

/// Swap the char under the cursor with the next one on the line and step
/// past both. At the end of a line the two chars before the cursor swap.
pub fn transpose_chars(event: &mut KeyEvent<'_>) -> HandlerResult {
    let buffer = event.buffer();
    let doc = buffer.document();
    let p = doc.cursor_position();
    let has_next = doc.current_char().is_some_and(|c| c != '\n')
        && doc.char_at(p + 1).is_some_and(|c| c != '\n');
    if has_next {
        buffer.swap_characters(p, p + 2)
    } else if doc.cursor_position_col() >= 2 {
        buffer.swap_characters_before_cursor()
    } else {
        Ok(())
    }
}

fn change_word_case(event: &mut KeyEvent<'_>, f: fn(&str) -> String) -> HandlerResult {
    for _ in 0..event.count() {
        let buffer = event.buffer();
        let Some(end) = buffer.document().find_next_word_ending(false, 1, false) else {
            break;
        };
        let words = buffer.document().slice(
            buffer.cursor_position(),
            buffer.document().offset_cursor(end),
        );
        let changed = f(words);
        buffer.insert_text(&changed, true, true)?;
    }
    Ok(())
}

pub fn uppercase_word(event: &mut KeyEvent<'_>) -> HandlerResult {
    change_word_case(event, str::to_uppercase)
}

pub fn downcase_word(event: &mut KeyEvent<'_>) -> HandlerResult {
    change_word_case(event, str::to_lowercase)
}

pub fn capitalize_word(event: &mut KeyEvent<'_>) -> HandlerResult {
    change_word_case(event, title_case)
}

/// Uppercase the first letter of every word, lowercase the rest.
pub fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_word = false;
    for c in text.chars() {
        if c.is_alphanumeric() {
            if in_word {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(c);
            in_word = false;
        }
    }
    out
}

pub fn quoted_insert(event: &mut KeyEvent<'_>) -> HandlerResult {
    event.state.quoted_insert = true;
    Ok(())
}

// -------------------------------------------------------------------------
// Killing and yanking
// -------------------------------------------------------------------------

/// Kill to the end of the line; at the end, kill the newline. A negative
/// argument kills backwards to the start of the line.
pub fn kill_line(event: &mut KeyEvent<'_>) -> HandlerResult {
    let arg = event.arg();
    let buffer = event.buffer();
    let deleted = if arg < 0 {
        let start = buffer.document().get_start_of_line_position(false);
        buffer.delete_before_cursor(start.unsigned_abs())?
    } else if buffer.document().current_char() == Some('\n') {
        buffer.delete(1)?
    } else {
        let end = buffer.document().get_end_of_line_position();
        buffer.delete(end.unsigned_abs())?
    };
    event.state.clipboard.set_text(deleted);
    Ok(())
}

/// Kill to the end of the word; consecutive kills accumulate.
pub fn kill_word(event: &mut KeyEvent<'_>) -> HandlerResult {
    let count = event.count();
    let buffer = event.buffer();
    let Some(end) = buffer.document().find_next_word_ending(false, count, false) else {
        return Ok(());
    };
    let mut deleted = buffer.delete(end.unsigned_abs())?;
    if event.is_repeat {
        deleted = format!("{}{deleted}", event.state.clipboard.get_data().text);
    }
    event.state.clipboard.set_text(deleted);
    Ok(())
}

fn rubout(event: &mut KeyEvent<'_>, big: bool) -> HandlerResult {
    let count = event.count();
    let buffer = event.buffer();
    let start = buffer
        .document()
        .find_start_of_previous_word(count, big)
        .unwrap_or(-(buffer.cursor_position() as isize));
    if start == 0 {
        event.state.ring_bell();
        return Ok(());
    }
    let mut deleted = buffer.delete_before_cursor(start.unsigned_abs())?;
    if event.is_repeat {
        deleted.push_str(&event.state.clipboard.get_data().text);
    }
    event.state.clipboard.set_text(deleted);
    Ok(())
}

/// Kill the WORD (whitespace-delimited) behind the cursor.
pub fn unix_word_rubout(event: &mut KeyEvent<'_>) -> HandlerResult {
    rubout(event, true)
}

pub fn backward_kill_word(event: &mut KeyEvent<'_>) -> HandlerResult {
    rubout(event, false)
}

pub fn delete_horizontal_space(event: &mut KeyEvent<'_>) -> HandlerResult {
    let buffer = event.buffer();
    let before = buffer.document().text_before_cursor();
    let after = buffer.document().text_after_cursor();
    let back = before.chars().count() - before.trim_end_matches([' ', '\t']).chars().count();
    let forward = after.chars().count() - after.trim_start_matches([' ', '\t']).chars().count();
    buffer.delete_before_cursor(back)?;
    buffer.delete(forward)?;
    Ok(())
}

/// Kill back to the start of the line; at column 0, join with the line above.
pub fn unix_line_discard(event: &mut KeyEvent<'_>) -> HandlerResult {
    let buffer = event.buffer();
    if buffer.document().cursor_position_col() == 0 {
        buffer.delete_before_cursor(1)?;
        return Ok(());
    }
    let start = buffer.document().get_start_of_line_position(false);
    let deleted = buffer.delete_before_cursor(start.unsigned_abs())?;
    event.state.clipboard.set_text(deleted);
    Ok(())
}

pub fn yank(event: &mut KeyEvent<'_>) -> HandlerResult {
    let count = event.count();
    let data = event.state.clipboard.get_data();
    event.buffer().paste_clipboard_data(&data, PasteMode::Emacs, count)
}

pub fn yank_nth_arg(event: &mut KeyEvent<'_>) -> HandlerResult {
    let n = event.arg_present().then(|| event.arg());
    event.buffer().yank_nth_arg(n)
}

pub fn yank_last_arg(event: &mut KeyEvent<'_>) -> HandlerResult {
    let n = event.arg_present().then(|| event.arg());
    event.buffer().yank_last_arg(n)
}

/// Replace the text just yanked with the next kill-ring entry.
pub fn yank_pop(event: &mut KeyEvent<'_>) -> HandlerResult {
    let Some(before) = event.buffer().document_before_paste().cloned() else {
        return Ok(());
    };
    event.buffer().set_document(before, false)?;
    event.state.clipboard.rotate();
    let data = event.state.clipboard.get_data();
    event.buffer().paste_clipboard_data(&data, PasteMode::Emacs, 1)
}

// -------------------------------------------------------------------------
// Completion
// -------------------------------------------------------------------------

/// Tab: cycle an open menu, otherwise insert the common part and open it.
pub fn complete(event: &mut KeyEvent<'_>) -> HandlerResult {
    let buffer = event.buffer();
    if buffer.complete_state().is_some() {
        buffer.complete_next(1, false)
    } else {
        buffer
            .start_completion(CompletionSelect::None, true, CompleteEvent::requested())
            .map(|_| ())
    }
}

pub fn menu_complete_backward(event: &mut KeyEvent<'_>) -> HandlerResult {
    event.buffer().complete_previous(1, false)
}

// -------------------------------------------------------------------------
// Macros
// -------------------------------------------------------------------------

pub fn start_kbd_macro(event: &mut KeyEvent<'_>) -> HandlerResult {
    event.state.emacs.start_macro();
    Ok(())
}

pub fn end_kbd_macro(event: &mut KeyEvent<'_>) -> HandlerResult {
    event.state.emacs.end_macro();
    Ok(())
}

/// Queue the last recorded macro ahead of further input.
pub fn call_last_kbd_macro(event: &mut KeyEvent<'_>) -> HandlerResult {
    if let Some(keys) = event.state.emacs.last_macro.clone() {
        event.state.pending_feed.extend(keys);
    }
    Ok(())
}

// -------------------------------------------------------------------------
// Misc
// -------------------------------------------------------------------------

pub fn undo(event: &mut KeyEvent<'_>) -> HandlerResult {
    event.buffer().undo().map(|_| ())
}

/// Comment out every line and accept. With an argument other than 1,
/// uncomment instead.
pub fn insert_comment(event: &mut KeyEvent<'_>) -> HandlerResult {
    let uncomment = event.arg() != 1;
    let buffer = event.buffer();
    let text = buffer
        .text()
        .lines()
        .map(|line| {
            if uncomment {
                line.strip_prefix('#').unwrap_or(line).to_string()
            } else {
                format!("#{line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n");
    buffer.set_document(Document::new(text, 0), false)?;
    event.state.accept_input();
    Ok(())
}

pub fn vi_editing_mode(event: &mut KeyEvent<'_>) -> HandlerResult {
    event.state.set_editing_mode(EditingMode::Vi);
    Ok(())
}

pub fn emacs_editing_mode(event: &mut KeyEvent<'_>) -> HandlerResult {
    event.state.set_editing_mode(EditingMode::Emacs);
    Ok(())
}

/// Act as if Escape was pressed.
pub fn prefix_meta(event: &mut KeyEvent<'_>) -> HandlerResult {
    event.keep_arg();
    event.state.pending_feed.push_front(KeyPress::key(Key::Escape));
    Ok(())
}

/// Open the buffer in `$EDITOR`; the runtime accepts the edited text.
pub fn edit_and_execute_command(event: &mut KeyEvent<'_>) -> HandlerResult {
    debug!(target: "actions.emacs", "edit_externally");
    event.state.request(SessionRequest::EditExternally);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_state::{Buffer, SessionState};
    use pretty_assertions::assert_eq;

    fn run(command: Command, text: &str, cursor: usize) -> SessionState {
        let mut buffer = Buffer::default();
        buffer.set_document(Document::new(text, cursor), false).unwrap();
        let mut state = SessionState::new(buffer, EditingMode::Emacs);
        let keys = [KeyPress::key(Key::Control('t'))];
        let mut event = KeyEvent::new(&mut state, &keys, None, false);
        command(&mut event).unwrap();
        state
    }

    #[test]
    fn every_name_resolves() {
        for name in names() {
            assert!(get(name).is_some(), "{name}");
        }
        assert!(get("no-such-command").is_none());
    }

    #[test]
    fn transpose_in_the_middle_and_at_the_end() {
        let s = run(transpose_chars, "hello", 3);
        assert_eq!(s.buffer.text(), "helol");
        assert_eq!(s.buffer.cursor_position(), 5);
        let s = run(transpose_chars, "abc", 3);
        assert_eq!(s.buffer.text(), "acb");
        let s = run(transpose_chars, "a", 1);
        assert_eq!(s.buffer.text(), "a");
    }

    #[test]
    fn kill_line_kills_newline_at_eol() {
        let s = run(kill_line, "ab\ncd", 1);
        assert_eq!(s.buffer.text(), "a\ncd");
        assert_eq!(s.clipboard.get_data().text, "b");
        let s = run(kill_line, "ab\ncd", 2);
        assert_eq!(s.buffer.text(), "abcd");
    }

    #[test]
    fn word_case_commands() {
        let s = run(uppercase_word, "foo bar", 0);
        assert_eq!(s.buffer.text(), "FOO bar");
        assert_eq!(s.buffer.cursor_position(), 3);
        let s = run(capitalize_word, "hELLO world", 0);
        assert_eq!(s.buffer.text(), "Hello world");
        assert_eq!(title_case("ab cD-ef"), "Ab Cd-Ef");
    }

    #[test]
    fn rubout_and_horizontal_space() {
        let s = run(unix_word_rubout, "echo foo.bar", 12);
        assert_eq!(s.buffer.text(), "echo ");
        assert_eq!(s.clipboard.get_data().text, "foo.bar");
        let s = run(backward_kill_word, "echo foo.bar", 12);
        assert_eq!(s.buffer.text(), "echo foo.");
        let s = run(delete_horizontal_space, "a  \t  b", 3);
        assert_eq!(s.buffer.text(), "ab");
    }

    #[test]
    fn insert_comment_accepts() {
        let s = run(insert_comment, "a\nb", 0);
        assert_eq!(s.result(), Some(&Ok("#a\n#b".to_string())));
    }
}
