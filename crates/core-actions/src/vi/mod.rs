//! Vi bindings.
//!
//! Input mode lives in [`ViState`](core_state::ViState); visual modes are
//! navigation plus a document selection. An operator key (`d`, `c`, `y`,
//! `>`, `g~`, ...) only records itself as pending; the next motion or text
//! object, registered in [`motions`], applies it. Counts typed before the
//! operator and before the motion multiply.

mod digraphs;
mod motions;
mod operators;
pub mod text_object;

use core_events::Key;
use core_keymap::{Filter, RegistryError};
use core_state::{
    Buffer, CompleteEvent, CompletionSelect, EditReadOnlyBuffer, InputMode, SearchDirection,
    SearchState, SessionState,
};
use core_text::{Document, PasteMode, SelectionKind};
use tracing::{debug, trace};

use crate::filters::{
    Cond, buffer_empty, has_arg, read_only, vi_digraph_mode, vi_insert_mode,
    vi_insert_multiple_mode, vi_navigation_mode, vi_recording_macro, vi_replace_mode,
    vi_selection_mode, vi_waiting_for_text_object,
};
use crate::named_commands as nc;
use crate::{BindingSet, Bindings, HandlerResult, KeyEvent, binding};

use motions::char_arg;
pub use operators::swap_case;

const INDENT: &str = "    ";

/// Indent (`right`) or dedent rows `from_row..=to_row` by `count` levels of
/// four spaces. Dedenting a line without a full level strips its leading
/// whitespace. The cursor keeps its column relative to the text.
pub fn shift_lines(
    buffer: &mut Buffer,
    from_row: usize,
    to_row: usize,
    count: usize,
    right: bool,
) -> Result<(), EditReadOnlyBuffer> {
    let doc = buffer.document();
    let (row, col) = (doc.cursor_position_row(), doc.cursor_position_col());
    let pad = INDENT.repeat(count.max(1));
    let text = buffer.transform_lines(from_row..=to_row, |line| {
        if right {
            format!("{pad}{line}")
        } else if let Some(rest) = line.strip_prefix(pad.as_str()) {
            rest.to_string()
        } else {
            line.trim_start().to_string()
        }
    });
    let shifted = Document::new(text, 0);
    let pad_len = pad.chars().count();
    let col = if (from_row..=to_row).contains(&row) {
        if right { col + pad_len } else { col.saturating_sub(pad_len) }
    } else {
        col
    };
    let cursor = shifted.translate_row_col_to_index(row, col.min(shifted.line_len(row)));
    let text = shifted.text().to_string();
    buffer.set_document(Document::new(text, cursor), false)
}

fn enter_mode(e: &mut KeyEvent<'_>, mode: InputMode) {
    e.state.vi.set_input_mode(mode);
}

fn back_to_navigation(e: &mut KeyEvent<'_>) -> HandlerResult {
    let mode = e.state.vi.input_mode;
    let buffer = e.buffer();
    if matches!(mode, InputMode::Insert | InputMode::Replace) {
        buffer.cursor_left(1);
    }
    buffer.multiple_cursor_positions.clear();
    buffer.exit_selection();
    enter_mode(e, InputMode::Navigation);
    Ok(())
}

fn toggle_selection(e: &mut KeyEvent<'_>, kind: SelectionKind) -> HandlerResult {
    let buffer = e.buffer();
    match buffer.selection() {
        Some(sel) if sel.kind == kind => buffer.exit_selection(),
        Some(_) => buffer.set_selection_kind(kind),
        None => buffer.start_selection(kind),
    }
    Ok(())
}

/// Visual block `I`/`A`: one cursor per selected line, then insert at all.
fn block_insert(e: &mut KeyEvent<'_>, after: bool) -> HandlerResult {
    let buffer = e.buffer();
    let positions: Vec<usize> = buffer
        .document()
        .selection_ranges(true)
        .into_iter()
        .map(|(from, to)| if after { to } else { from })
        .collect();
    if let Some(&first) = positions.first() {
        buffer.set_cursor_position(first);
    }
    buffer.exit_selection();
    buffer.multiple_cursor_positions = positions;
    enter_mode(e, InputMode::InsertMultiple);
    Ok(())
}

fn insert_multiple(e: &mut KeyEvent<'_>) -> HandlerResult {
    if !e.key().is_some_and(Key::is_printable) {
        return Ok(());
    }
    let data = e.data().to_string();
    let n = data.chars().count();
    let buffer = e.buffer();
    let positions = buffer.multiple_cursor_positions.clone();
    let doc = buffer.document();
    let mut text = String::new();
    let mut p = 0;
    for &p2 in &positions {
        text.push_str(doc.slice(p, p2));
        text.push_str(&data);
        p = p2;
    }
    text.push_str(doc.slice(p, doc.len()));
    let cursor = doc.cursor_position() + n;
    buffer.set_document(Document::new(text, cursor), false)?;
    buffer.multiple_cursor_positions = positions
        .iter()
        .enumerate()
        .map(|(i, &p)| p + (i + 1) * n)
        .collect();
    Ok(())
}

/// Rebuild the text from `parts`, placing one cursor after each part but the last.
fn set_multiple(buffer: &mut Buffer, parts: Vec<String>, cursor: usize) -> HandlerResult {
    let mut positions = Vec::with_capacity(parts.len().saturating_sub(1));
    let mut acc = 0;
    for part in &parts[..parts.len().saturating_sub(1)] {
        acc += part.chars().count();
        positions.push(acc);
    }
    buffer.set_document(Document::new(parts.concat(), cursor), false)?;
    buffer.multiple_cursor_positions = positions;
    Ok(())
}

fn backspace_multiple(e: &mut KeyEvent<'_>) -> HandlerResult {
    let buffer = e.buffer();
    let doc = buffer.document();
    let mut parts = Vec::new();
    let mut deleted = false;
    let mut p = 0;
    for &p2 in &buffer.multiple_cursor_positions {
        // Never join lines.
        if p2 > 0 && doc.char_at(p2 - 1) != Some('\n') {
            parts.push(doc.slice(p, (p2 - 1).max(p)).to_string());
            deleted = true;
        } else {
            parts.push(doc.slice(p, p2).to_string());
        }
        p = p2;
    }
    parts.push(doc.slice(p, doc.len()).to_string());
    if !deleted {
        e.state.ring_bell();
        return Ok(());
    }
    let cursor = doc.cursor_position().saturating_sub(1);
    set_multiple(buffer, parts, cursor)
}

fn delete_multiple(e: &mut KeyEvent<'_>) -> HandlerResult {
    let buffer = e.buffer();
    let doc = buffer.document();
    let mut parts = Vec::new();
    let mut deleted = false;
    let mut p = 0;
    for &p2 in &buffer.multiple_cursor_positions {
        parts.push(doc.slice(p, p2).to_string());
        p = p2;
        if doc.char_at(p2).is_some_and(|c| c != '\n') {
            p += 1;
            deleted = true;
        }
    }
    parts.push(doc.slice(p, doc.len()).to_string());
    if !deleted {
        e.state.ring_bell();
        return Ok(());
    }
    let cursor = doc.cursor_position();
    set_multiple(buffer, parts, cursor)
}

fn move_multiple(e: &mut KeyEvent<'_>, right: bool) -> HandlerResult {
    let buffer = e.buffer();
    let doc = buffer.document();
    let can_move = buffer.multiple_cursor_positions.iter().all(|&p| {
        if right {
            doc.char_at(p).is_some_and(|c| c != '\n')
        } else {
            p > 0 && doc.char_at(p - 1) != Some('\n')
        }
    });
    if !can_move {
        return Ok(());
    }
    let positions: Vec<usize> = buffer
        .multiple_cursor_positions
        .iter()
        .map(|&p| if right { p + 1 } else { p - 1 })
        .collect();
    if right {
        buffer.cursor_right(1);
    } else {
        buffer.cursor_left(1);
    }
    buffer.multiple_cursor_positions = positions;
    Ok(())
}

fn paste(e: &mut KeyEvent<'_>, mode: PasteMode) -> HandlerResult {
    let register = e.state.vi.register.take();
    let data = e.state.clipboard.read(register);
    let count = e.count();
    e.buffer().paste_clipboard_data(&data, mode, count)
}

/// Delete `count` chars at (or before) the cursor into the register.
fn delete_chars(e: &mut KeyEvent<'_>, before: bool) -> HandlerResult {
    let doc = e.state.buffer.document();
    let available = if before {
        doc.current_line_before_cursor().chars().count()
    } else {
        doc.current_line_after_cursor().chars().count()
    };
    let count = e.count().min(available);
    if count == 0 {
        return Ok(());
    }
    let register = e.state.vi.register.take();
    let text = if before {
        e.buffer().delete_before_cursor(count)?
    } else {
        e.buffer().delete(count)?
    };
    e.state
        .clipboard
        .write(register, core_text::ClipboardData::characters(text));
    Ok(())
}

fn delete_to_end_of_line(e: &mut KeyEvent<'_>) -> HandlerResult {
    let register = e.state.vi.register.take();
    let buffer = e.buffer();
    let end = buffer.document().get_end_of_line_position();
    let text = buffer.delete(end.unsigned_abs())?;
    if !text.is_empty() {
        e.state
            .clipboard
            .write(register, core_text::ClipboardData::characters(text));
    }
    Ok(())
}

fn search_word_under_cursor(e: &mut KeyEvent<'_>, direction: SearchDirection) -> HandlerResult {
    let count = e.count();
    let buffer = e.buffer();
    let word = buffer.document().get_word_under_cursor(false).to_string();
    if word.is_empty() {
        return Ok(());
    }
    let state = SearchState::new(word, direction);
    buffer.set_last_search(state.clone());
    if !buffer.apply_search(&state, false, count) {
        e.state.ring_bell();
    }
    Ok(())
}

fn search_again(e: &mut KeyEvent<'_>, reverse: bool) -> HandlerResult {
    let count = e.count();
    let Some(last) = e.state.buffer.last_search().cloned() else {
        return Ok(());
    };
    let state = if reverse { last.invert() } else { last };
    if !e.buffer().apply_search(&state, false, count) {
        e.state.ring_bell();
    }
    Ok(())
}

fn replay_macro(e: &mut KeyEvent<'_>) -> HandlerResult {
    let Some(register) = char_arg(e) else {
        return Ok(());
    };
    let Some(keys) = e.state.vi.macros.get(&register).cloned() else {
        e.state.ring_bell();
        return Ok(());
    };
    if register != '@' {
        e.state.vi.macros.insert('@', keys.clone());
    }
    debug!(target: "actions.macro", register = %register, keys = keys.len(), count = e.count(), "vi_replay");
    for _ in 0..e.count() {
        e.state.pending_feed.extend(keys.iter().cloned());
    }
    Ok(())
}

fn digraph_first_pending() -> Cond {
    Filter::new(|s: &SessionState| s.vi.digraph_symbol1.is_none())
}

fn in_block_selection() -> Cond {
    Filter::new(|s: &SessionState| {
        s.buffer
            .selection()
            .is_some_and(|sel| sel.kind == SelectionKind::Block)
    })
}

pub fn bindings() -> Result<Bindings, RegistryError> {
    let mut set = BindingSet::new();
    let writable = read_only().not();
    let nav = vi_navigation_mode();
    let nav_rw = nav.clone().and(writable.clone());
    let selection = vi_selection_mode();
    let insert = vi_insert_mode();
    let insert_or_replace = vi_insert_mode().or(vi_replace_mode());

    set.add(binding("escape", back_to_navigation));

    // Entering insert mode.
    set.add(
        binding("i", |e| {
            enter_mode(e, InputMode::Insert);
            Ok(())
        })
        .filter(nav_rw.clone()),
    );
    set.add(
        binding("a", |e| {
            let right = e.state.buffer.document().get_cursor_right_position(1);
            e.buffer().move_cursor(right);
            enter_mode(e, InputMode::Insert);
            Ok(())
        })
        .filter(nav_rw.clone()),
    );
    set.add(
        binding("I", |e| {
            let start = e.state.buffer.document().get_start_of_line_position(true);
            e.buffer().move_cursor(start);
            enter_mode(e, InputMode::Insert);
            Ok(())
        })
        .filter(nav_rw.clone()),
    );
    set.add(
        binding("A", |e| {
            let end = e.state.buffer.document().get_end_of_line_position();
            e.buffer().move_cursor(end);
            enter_mode(e, InputMode::Insert);
            Ok(())
        })
        .filter(nav_rw.clone()),
    );
    set.add(
        binding("o", |e| {
            e.buffer().insert_line_below(true)?;
            enter_mode(e, InputMode::Insert);
            Ok(())
        })
        .filter(nav_rw.clone()),
    );
    set.add(
        binding("O", |e| {
            e.buffer().insert_line_above(true)?;
            enter_mode(e, InputMode::Insert);
            Ok(())
        })
        .filter(nav_rw.clone()),
    );
    set.add(
        binding("s", |e| {
            let register = e.state.vi.register.take();
            let count = e.count();
            let text = e.buffer().delete(count)?;
            e.state
                .clipboard
                .write(register, core_text::ClipboardData::characters(text));
            enter_mode(e, InputMode::Insert);
            Ok(())
        })
        .filter(nav_rw.clone()),
    );
    set.add(
        binding("C", |e| {
            delete_to_end_of_line(e)?;
            enter_mode(e, InputMode::Insert);
            Ok(())
        })
        .filter(nav_rw.clone()),
    );
    set.add(
        binding("R", |e| {
            enter_mode(e, InputMode::Replace);
            Ok(())
        })
        .filter(nav_rw.clone()),
    );
    set.add(
        binding("insert", |e| {
            enter_mode(e, InputMode::Insert);
            Ok(())
        })
        .filter(nav_rw.clone()),
    );
    set.add(
        binding("insert", |e| {
            enter_mode(e, InputMode::Replace);
            Ok(())
        })
        .filter(insert.clone()),
    );
    set.add(
        binding("insert", |e| {
            enter_mode(e, InputMode::Insert);
            Ok(())
        })
        .filter(vi_replace_mode()),
    );

    // Editing in navigation mode.
    set.add(binding("D", delete_to_end_of_line).filter(nav_rw.clone()));
    set.add(binding("x", |e| delete_chars(e, false)).filter(nav_rw.clone()));
    set.add(binding("X", |e| delete_chars(e, true)).filter(nav_rw.clone()));
    set.add(binding("p", |e| paste(e, PasteMode::ViAfter)).filter(nav_rw.clone()));
    set.add(binding("P", |e| paste(e, PasteMode::ViBefore)).filter(nav_rw.clone()));
    set.add(
        binding("r <any>", |e| {
            if !e.key().is_some_and(Key::is_printable) {
                return Ok(());
            }
            let data = e.data().repeat(e.count());
            let buffer = e.buffer();
            buffer.insert_text(&data, true, true)?;
            buffer.cursor_left(1);
            Ok(())
        })
        .filter(nav_rw.clone()),
    );
    set.add(
        binding("J", |e| {
            for _ in 0..e.count() {
                e.buffer().join_next_line(" ")?;
            }
            Ok(())
        })
        .filter(nav_rw.clone()),
    );
    set.add(
        binding("g J", |e| {
            for _ in 0..e.count() {
                e.buffer().join_next_line("")?;
            }
            Ok(())
        })
        .filter(nav_rw.clone()),
    );
    set.add(
        binding("~", |e| {
            for _ in 0..e.count() {
                let buffer = e.buffer();
                match buffer.document().current_char() {
                    Some(c) if c != '\n' => {
                        buffer.insert_text(&swap_case(&c.to_string()), true, true)?;
                    }
                    _ => break,
                }
            }
            Ok(())
        })
        .filter(nav_rw.clone()),
    );
    set.add(
        binding("u", |e| {
            for _ in 0..e.count() {
                e.buffer().undo()?;
            }
            Ok(())
        })
        .filter(nav.clone())
        .save_before(false.into()),
    );
    set.add(
        binding("c-r", |e| {
            for _ in 0..e.count() {
                e.buffer().redo()?;
            }
            Ok(())
        })
        .filter(nav.clone())
        .save_before(false.into()),
    );

    // Line-wise cursor movement. `j`/`k` walk history past the first/last line.
    set.add(
        binding("j", |e| {
            let count = e.count();
            e.buffer().auto_down(count, true)
        })
        .filter(nav.clone()),
    );
    set.add(
        binding("k", |e| {
            let count = e.count();
            e.buffer().auto_up(count, true)
        })
        .filter(nav.clone()),
    );
    set.add(
        binding("j", |e| {
            let count = e.count();
            e.buffer().cursor_down(count);
            Ok(())
        })
        .filter(selection.clone()),
    );
    set.add(
        binding("k", |e| {
            let count = e.count();
            e.buffer().cursor_up(count);
            Ok(())
        })
        .filter(selection.clone()),
    );
    set.add(binding("enter", nc::accept_line).filter(nav.clone()));

    // Visual modes.
    for (keys, kind) in [
        ("v", SelectionKind::Characters),
        ("V", SelectionKind::Lines),
        ("c-v", SelectionKind::Block),
    ] {
        set.add(binding(keys, move |e| toggle_selection(e, kind)).filter(nav.clone().or(selection.clone())));
    }
    set.add(
        binding("o", |e| {
            e.buffer().swap_selection_ends();
            Ok(())
        })
        .filter(selection.clone()),
    );
    set.add(
        binding("J", |e| e.buffer().join_selected_lines(" "))
            .filter(selection.clone().and(writable.clone())),
    );
    set.add(
        binding("g J", |e| e.buffer().join_selected_lines(""))
            .filter(selection.clone().and(writable.clone())),
    );
    let block = selection.clone().and(in_block_selection()).and(writable.clone());
    set.add(binding("I", |e| block_insert(e, false)).filter(block.clone()));
    set.add(binding("A", |e| block_insert(e, true)).filter(block));

    // Registers and macros.
    set.add(
        binding("\" <any>", |e| {
            if let Some(c) = char_arg(e).filter(char::is_ascii_alphabetic) {
                e.state.vi.register = Some(c);
            }
            e.keep_arg();
            Ok(())
        })
        .filter(nav.clone().or(selection.clone())),
    );
    set.add(
        binding("q <any>", |e| {
            if let Some(c) = char_arg(e).filter(char::is_ascii_alphanumeric) {
                e.state.vi.start_recording(c);
            }
            Ok(())
        })
        .filter(nav.clone().and(vi_recording_macro().not())),
    );
    set.add(
        binding("q", |e| {
            e.state.vi.stop_recording();
            Ok(())
        })
        .filter(nav.clone().and(vi_recording_macro())),
    );
    set.add(
        binding("@ <any>", replay_macro).filter(nav.clone()));

    // Search.
    set.add(
        binding("/", |e| {
            e.buffer().start_isearch(SearchDirection::Forward, false);
            Ok(())
        })
        .filter(nav.clone()),
    );
    set.add(
        binding("?", |e| {
            e.buffer().start_isearch(SearchDirection::Backward, false);
            Ok(())
        })
        .filter(nav.clone()),
    );
    let nav_or_selection = nav.clone().or(selection.clone());
    set.add(binding("n", |e| search_again(e, false)).filter(nav_or_selection.clone()));
    set.add(binding("N", |e| search_again(e, true)).filter(nav_or_selection.clone()));
    set.add(
        binding("*", |e| search_word_under_cursor(e, SearchDirection::Forward))
            .filter(nav.clone()),
    );
    set.add(
        binding("#", |e| search_word_under_cursor(e, SearchDirection::Backward))
            .filter(nav.clone()),
    );

    // Insert mode.
    set.add(
        binding("c-o", |e| {
            e.state.vi.temporary_navigation_mode = true;
            trace!(target: "actions.vi", "temporary_navigation");
            Ok(())
        })
        .filter(insert_or_replace.clone()),
    );
    set.add(
        binding("c-n", |e| {
            let count = e.count();
            let buffer = e.buffer();
            if buffer.complete_state().is_some() {
                buffer.complete_next(count, false)
            } else {
                buffer
                    .start_completion(CompletionSelect::First, false, CompleteEvent::requested())
                    .map(|_| ())
            }
        })
        .filter(insert.clone()),
    );
    set.add(
        binding("c-p", |e| {
            let count = e.count();
            let buffer = e.buffer();
            if buffer.complete_state().is_some() {
                buffer.complete_previous(count, false)
            } else {
                buffer
                    .start_completion(CompletionSelect::Last, false, CompleteEvent::requested())
                    .map(|_| ())
            }
        })
        .filter(insert.clone()),
    );
    set.add(
        binding("c-t", |e| {
            let buffer = e.buffer();
            let row = buffer.document().cursor_position_row();
            shift_lines(buffer, row, row, 1, true)
        })
        .filter(insert.clone()),
    );
    set.add(
        binding("c-d", |e| {
            let buffer = e.buffer();
            let row = buffer.document().cursor_position_row();
            shift_lines(buffer, row, row, 1, false)
        })
        .filter(insert.clone().and(buffer_empty().not())),
    );
    set.add(
        binding("c-x c-l", |e| e.buffer().start_history_lines_completion())
            .filter(insert.clone()),
    );
    set.add(binding("c-v", nc::quoted_insert).filter(insert_or_replace.clone()));

    // Replace mode.
    set.add(
        binding("<any>", |e| {
            if !e.key().is_some_and(Key::is_printable) {
                return Ok(());
            }
            let data = e.data().to_string();
            e.buffer().insert_text(&data, true, true)
        })
        .filter(vi_replace_mode())
        .save_before(crate::filters::is_repeat().not()),
    );
    set.add(
        binding("backspace", |e| {
            let count = e.count();
            e.buffer().cursor_left(count);
            Ok(())
        })
        .filter(vi_replace_mode()),
    );

    // Visual block insert.
    let multiple = vi_insert_multiple_mode();
    set.add(
        binding("<any>", insert_multiple)
            .filter(multiple.clone())
            .save_before(crate::filters::is_repeat().not()),
    );
    set.add(binding("backspace", backspace_multiple).filter(multiple.clone()));
    set.add(binding("delete", delete_multiple).filter(multiple.clone()));
    set.add(binding("left", |e| move_multiple(e, false)).filter(multiple.clone()));
    set.add(binding("right", |e| move_multiple(e, true)).filter(multiple));

    // Digraphs: `C-k` then two symbols.
    set.add(
        binding("c-k", |e| {
            e.state.vi.waiting_for_digraph = true;
            e.state.vi.digraph_symbol1 = None;
            Ok(())
        })
        .filter(insert_or_replace),
    );
    set.add(
        binding("<any>", |e| {
            match char_arg(e) {
                Some(c) => e.state.vi.digraph_symbol1 = Some(c),
                None => e.state.vi.waiting_for_digraph = false,
            }
            Ok(())
        })
        .filter(vi_digraph_mode().and(digraph_first_pending())),
    );
    set.add(
        binding("<any>", |e| {
            let first = e.state.vi.digraph_symbol1.take();
            e.state.vi.waiting_for_digraph = false;
            let found = first.zip(char_arg(e)).and_then(|(a, b)| digraphs::lookup(a, b));
            let Some(c) = found else {
                e.state.ring_bell();
                return Ok(());
            };
            let overwrite = e.state.vi.input_mode == InputMode::Replace;
            e.buffer().insert_text(&c.to_string(), overwrite, true)
        })
        .filter(vi_digraph_mode().and(digraph_first_pending().not())),
    );

    motions::register(&mut set);
    operators::register(&mut set);

    // Counts. `0` is a motion unless a count is already being typed.
    let counting = nav.or(selection).or(vi_waiting_for_text_object());
    for digit in '1'..='9' {
        set.add(
            binding(&digit.to_string(), |e| {
                let data = e.data().to_string();
                e.append_to_arg_count(&data);
                Ok(())
            })
            .filter(counting.clone()),
        );
    }
    set.add(
        binding("0", |e| {
            e.append_to_arg_count("0");
            Ok(())
        })
        .filter(counting.and(has_arg())),
    );
    set.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Dispatcher, default_bindings};
    use core_events::KeyPress;
    use core_state::EditingMode;
    use pretty_assertions::assert_eq;

    fn session(text: &str, cursor: usize) -> SessionState {
        let mut buffer = Buffer::default();
        buffer.set_document(Document::new(text, cursor), false).unwrap();
        let mut s = SessionState::new(buffer, EditingMode::Vi);
        s.vi.set_input_mode(InputMode::Navigation);
        s
    }

    fn press(c: char) -> KeyPress {
        match c {
            '\x1b' => KeyPress::key(Key::Escape),
            '\r' => KeyPress::key(Key::ENTER),
            '\x08' => KeyPress::key(Key::BACKSPACE),
            '\x0b' => KeyPress::key(Key::Control('k')),
            '\x16' => KeyPress::key(Key::Control('v')),
            other => KeyPress::char(other),
        }
    }

    fn run(s: &mut SessionState, keys: &str) {
        let mut d = Dispatcher::new(default_bindings().unwrap());
        d.feed_all(keys.chars().map(press), s);
    }

    #[test]
    fn count_then_motion_then_delete_to_end() {
        let mut s = SessionState::new(Buffer::default(), EditingMode::Vi);
        run(&mut s, "hello\x1b2hD");
        assert_eq!(s.buffer.text(), "he");
        assert_eq!(s.vi.input_mode, InputMode::Navigation);
    }

    #[test]
    fn delete_word_fills_clipboard() {
        let mut s = session("foo bar baz", 0);
        run(&mut s, "dw");
        assert_eq!(s.buffer.text(), "bar baz");
        assert_eq!(s.clipboard.get_data().text, "foo ");
    }

    #[test]
    fn operator_and_motion_counts_multiply() {
        let mut s = session("a b c d e f", 0);
        run(&mut s, "2d2w");
        assert_eq!(s.buffer.text(), "e f");
    }

    #[test]
    fn delete_lines_with_count() {
        let mut s = session("a\nb\nc", 0);
        run(&mut s, "2dd");
        assert_eq!(s.buffer.text(), "c");
        assert_eq!(s.clipboard.get_data().kind, SelectionKind::Lines);
    }

    #[test]
    fn change_inner_word() {
        let mut s = session("foo bar", 5);
        run(&mut s, "ciwxyz\x1b");
        assert_eq!(s.buffer.text(), "foo xyz");
        assert_eq!(s.vi.input_mode, InputMode::Navigation);
    }

    #[test]
    fn delete_inside_parens() {
        let mut s = session("f(abc)", 3);
        run(&mut s, "di(");
        assert_eq!(s.buffer.text(), "f()");
    }

    #[test]
    fn delete_to_matching_bracket() {
        let mut s = session("(a)b", 0);
        run(&mut s, "d%");
        assert_eq!(s.buffer.text(), "b");
    }

    #[test]
    fn named_register_yank_and_put() {
        let mut s = session("foo bar", 0);
        run(&mut s, "\"ayw$\"ap");
        assert_eq!(s.buffer.text(), "foo barfoo ");
        assert_eq!(s.clipboard.get_register('a').map(|d| d.text.as_str()), Some("foo "));
    }

    #[test]
    fn yank_line_and_put_below() {
        let mut s = session("a\nb", 0);
        run(&mut s, "yyp");
        assert_eq!(s.buffer.text(), "a\na\nb");
    }

    #[test]
    fn find_and_repeat() {
        let mut s = session("a,b,c,d", 0);
        run(&mut s, "f,;");
        assert_eq!(s.buffer.cursor_position(), 3);
        run(&mut s, ",");
        assert_eq!(s.buffer.cursor_position(), 1);
    }

    #[test]
    fn delete_till_char() {
        let mut s = session("abc,def", 0);
        run(&mut s, "dt,");
        assert_eq!(s.buffer.text(), ",def");
    }

    #[test]
    fn visual_delete() {
        let mut s = session("abcdef", 0);
        run(&mut s, "vlld");
        assert_eq!(s.buffer.text(), "def");
        assert!(s.buffer.selection().is_none());
    }

    #[test]
    fn visual_block_insert() {
        let mut s = session("ab\ncd", 0);
        run(&mut s, "\x16jIX\x1b");
        assert_eq!(s.buffer.text(), "Xab\nXcd");
    }

    #[test]
    fn uppercase_word_operator() {
        let mut s = session("foo bar", 0);
        run(&mut s, "gUiw");
        assert_eq!(s.buffer.text(), "FOO bar");
    }

    #[test]
    fn indent_and_dedent_line() {
        let mut s = session("a", 0);
        run(&mut s, ">>");
        assert_eq!(s.buffer.text(), "    a");
        run(&mut s, "<<");
        assert_eq!(s.buffer.text(), "a");
    }

    #[test]
    fn replace_char_and_swap_case() {
        let mut s = session("abc", 0);
        run(&mut s, "rX");
        assert_eq!(s.buffer.text(), "Xbc");
        run(&mut s, "l~");
        assert_eq!(s.buffer.text(), "XBc");
    }

    #[test]
    fn x_respects_count_and_line_end() {
        let mut s = session("abc\ndef", 1);
        run(&mut s, "5x");
        assert_eq!(s.buffer.text(), "a\ndef");
    }

    #[test]
    fn replace_mode_overwrites() {
        let mut s = session("abcd", 0);
        run(&mut s, "Rxy\x1b");
        assert_eq!(s.buffer.text(), "xycd");
    }

    #[test]
    fn digraph_inserts_composed_char() {
        let mut s = SessionState::new(Buffer::default(), EditingMode::Vi);
        run(&mut s, "\x0be:");
        assert_eq!(s.buffer.text(), "ë");
        assert!(!s.vi.waiting_for_digraph);
    }

    #[test]
    fn macro_record_and_replay() {
        let mut s = session("a\nb\nc", 0);
        run(&mut s, "qaA!\x1bjq@a@@");
        assert_eq!(s.buffer.text(), "a!\nb!\nc!");
    }

    #[test]
    fn recording_stores_nested_replay_as_its_invocation() {
        let mut s = session("a\nb\nc", 0);
        run(&mut s, "qaA!\x1bjq");
        run(&mut s, "qb@aq");
        assert_eq!(s.buffer.text(), "a!\nb!\nc");
        let keys: Vec<Key> = s.vi.macros[&'b'].iter().map(|k| k.key).collect();
        assert_eq!(keys, vec![Key::Char('@'), Key::Char('a')]);

        // `b` follows later edits to `a`.
        run(&mut s, "qaA?\x1bq@b");
        assert_eq!(s.buffer.text(), "a!\nb!\nc??");
    }

    #[test]
    fn undo_restores_deleted_word() {
        let mut s = session("foo bar", 0);
        run(&mut s, "dwu");
        assert_eq!(s.buffer.text(), "foo bar");
    }

    #[test]
    fn join_lines() {
        let mut s = session("a\n  b", 0);
        run(&mut s, "J");
        assert_eq!(s.buffer.text(), "a b");
    }

    #[test]
    fn go_to_last_and_first_line() {
        let mut s = session("one\ntwo\nthree", 0);
        run(&mut s, "G");
        assert_eq!(s.buffer.document().cursor_position_row(), 2);
        run(&mut s, "gg");
        assert_eq!(s.buffer.cursor_position(), 0);
    }

    #[test]
    fn star_searches_word_under_cursor() {
        let mut s = session("foo bar foo", 0);
        run(&mut s, "*");
        assert_eq!(s.buffer.cursor_position(), 8);
        run(&mut s, "N");
        assert_eq!(s.buffer.cursor_position(), 0);
    }

    #[test]
    fn read_only_blocks_insert_mode() {
        let mut s = SessionState::new(Buffer::default().with_read_only(true), EditingMode::Vi);
        run(&mut s, "i");
        assert_eq!(s.vi.input_mode, InputMode::Insert);
        assert_eq!(s.buffer.text(), "");
    }

    #[test]
    fn unknown_motion_cancels_operator() {
        let mut s = session("abc", 0);
        run(&mut s, "dz");
        assert_eq!(s.vi.operator, None);
        run(&mut s, "x");
        assert_eq!(s.buffer.text(), "bc");
    }

    #[test]
    fn shift_lines_keeps_cursor_column() {
        let mut b = Buffer::default();
        b.set_document(Document::new("ab\ncd", 4), false).unwrap();
        shift_lines(&mut b, 0, 1, 1, true).unwrap();
        assert_eq!(b.text(), "    ab\n    cd");
        assert_eq!(b.document().cursor_position_col(), 5);
    }
}
