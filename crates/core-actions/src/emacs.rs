//! Emacs (readline) bindings.
//!
//! Escape and `C-x` are one-shot prefixes: they set `meta_pressed` /
//! `ctrl_x_pressed` and the next key picks its variant through the
//! [`meta`] / [`ctrl_x`] filters. The dispatcher clears both flags after
//! the next command, matched or not.

use core_keymap::RegistryError;
use core_state::{CompleteEvent, CompletionSelect};
use core_text::SelectionKind;
use tracing::trace;

use crate::basic::cut_to_clipboard;
use crate::filters::{
    Cond, ctrl_x_pressed, emacs_insert_mode, has_arg, has_selection, meta_pressed, no_prefix,
};
use crate::named_commands as nc;
use crate::vi::shift_lines;
use crate::{BindingSet, Bindings, HandlerResult, KeyEvent, binding};

fn meta() -> Cond {
    meta_pressed()
}

fn ctrl_x() -> Cond {
    ctrl_x_pressed()
}

fn insert() -> Cond {
    emacs_insert_mode()
}

fn set_meta(e: &mut KeyEvent<'_>) -> HandlerResult {
    e.keep_arg();
    let keys = e.keys.to_vec();
    e.state.emacs.meta_pressed = true;
    e.state.emacs.prefix_keys.extend(keys);
    trace!(target: "actions.emacs", "meta_prefix");
    Ok(())
}

fn set_ctrl_x(e: &mut KeyEvent<'_>) -> HandlerResult {
    e.keep_arg();
    let keys = e.keys.to_vec();
    e.state.emacs.ctrl_x_pressed = true;
    e.state.emacs.prefix_keys.extend(keys);
    trace!(target: "actions.emacs", "ctrl_x_prefix");
    Ok(())
}

/// Move to the `count`-th occurrence of `c` on the current line; a negative
/// count searches backwards.
fn character_search(e: &mut KeyEvent<'_>, backwards: bool) -> HandlerResult {
    let Some(c) = e.data().chars().next() else {
        return Ok(());
    };
    let needle = c.to_string();
    let (arg, count) = (e.arg(), e.count());
    let backwards = backwards != (arg < 0);
    let buffer = e.buffer();
    let doc = buffer.document();
    let found = if backwards {
        doc.find_backwards(&needle, true, false, count)
    } else {
        doc.find(&needle, true, false, false, count)
    };
    if let Some(delta) = found {
        buffer.move_cursor(delta);
    }
    Ok(())
}

/// `C-x C-x`: with a selection swap its ends, otherwise jump between the
/// start and the end of the line.
fn exchange_point_and_mark(e: &mut KeyEvent<'_>) -> HandlerResult {
    let buffer = e.buffer();
    if buffer.selection().is_some() {
        buffer.swap_selection_ends();
    } else if buffer.document().is_cursor_at_the_end_of_line() {
        let delta = buffer.document().get_start_of_line_position(false);
        buffer.move_cursor(delta);
    } else {
        let delta = buffer.document().get_end_of_line_position();
        buffer.move_cursor(delta);
    }
    Ok(())
}

fn shift_selection(e: &mut KeyEvent<'_>, right: bool) -> HandlerResult {
    let count = e.count();
    let buffer = e.buffer();
    let doc = buffer.document();
    let (from, to) = doc.selection_range();
    let from_row = doc.translate_index_to_position(from).0;
    let to_row = doc.translate_index_to_position(to).0;
    shift_lines(buffer, from_row, to_row, count, right)?;
    buffer.exit_selection();
    Ok(())
}

pub fn bindings() -> Result<Bindings, RegistryError> {
    let mut set = BindingSet::new();

    // Plain keys.
    set.add(binding("escape", set_meta).save_before(false.into()).record_in_macro(false));
    set.add(binding("c-x", set_ctrl_x).save_before(false.into()).record_in_macro(false));
    set.add(binding("c-a", nc::beginning_of_line).filter(no_prefix()));
    set.add(binding("c-b", nc::backward_char).filter(no_prefix()));
    set.add(binding("c-e", nc::end_of_line).filter(no_prefix()));
    set.add(binding("c-f", nc::forward_char).filter(no_prefix()));
    set.add(binding("c-left", nc::backward_word).filter(no_prefix()));
    set.add(binding("c-right", nc::forward_word).filter(no_prefix()));
    set.add(binding("c-home", nc::beginning_of_buffer));
    set.add(binding("c-end", nc::end_of_buffer));
    set.add(binding("c-delete", nc::kill_word).filter(insert()));
    set.add(binding("c-y", nc::yank).filter(insert().and(no_prefix())));
    set.add(
        binding("c-_", nc::undo)
            .filter(insert())
            .save_before(false.into()),
    );
    set.add(binding("c-q", nc::quoted_insert).filter(has_selection().not()));
    set.add(binding("c-n", |e| {
        let count = e.count();
        e.buffer().auto_down(count, false)
    }));
    set.add(
        binding("c-p", |e| {
            let count = e.count();
            e.buffer().auto_up(count, false)
        })
        .filter(no_prefix()),
    );
    set.add(binding("c-r", nc::reverse_search_history).filter(no_prefix()));
    set.add(binding("c-s", nc::forward_search_history).filter(no_prefix()));
    set.add(binding("c-] <any>", |e| character_search(e, false)).filter(no_prefix()));

    // Numeric argument: digits extend an argument that is already started.
    for d in '0'..='9' {
        let digit = d.to_string();
        set.add(
            binding(&digit, move |e| {
                e.append_to_arg_count(&d.to_string());
                Ok(())
            })
            .filter(has_arg().and(no_prefix()))
            .save_before(false.into()),
        );
    }
    set.add(
        binding("-", |e| {
            e.keep_arg();
            Ok(())
        })
        .filter(Cond::new(|s| s.arg.as_deref() == Some("-")).and(no_prefix())),
    );

    // Mark and region.
    set.add(
        binding("c-space", |e| {
            if !e.buffer().text().is_empty() {
                e.buffer().start_selection(SelectionKind::Characters);
            }
            Ok(())
        })
        .filter(no_prefix()),
    );
    set.add(
        binding("c-g", |e| {
            e.buffer().close_completion();
            Ok(())
        })
        .filter(has_selection().not()),
    );
    set.add(
        binding("c-g", |e| {
            e.buffer().exit_selection();
            Ok(())
        })
        .filter(has_selection()),
    );
    set.add(
        binding("c-w", |e| cut_to_clipboard(e, false).map(|_| ()))
            .filter(has_selection().and(no_prefix())),
    );
    set.add(binding("c-c >", |e| shift_selection(e, true)).filter(has_selection()));
    set.add(binding("c-c <", |e| shift_selection(e, false)).filter(has_selection()));

    // Meta variants. Registered after the plain keys so they win.
    let m = |keys: &str, f: fn(&mut KeyEvent<'_>) -> HandlerResult| {
        binding(keys, f).filter(meta())
    };
    set.add(m("b", nc::backward_word));
    set.add(m("f", nc::forward_word));
    set.add(m("c", nc::capitalize_word).filter(meta().and(insert())));
    set.add(m("d", nc::kill_word).filter(meta().and(insert())));
    set.add(m("l", nc::downcase_word).filter(meta().and(insert())));
    set.add(m("u", nc::uppercase_word).filter(meta().and(insert())));
    set.add(m("y", nc::yank_pop).filter(meta().and(insert())));
    set.add(m("backspace", nc::backward_kill_word).filter(meta().and(insert())));
    set.add(m("\\", nc::delete_horizontal_space).filter(meta().and(insert())));
    set.add(m("<", nc::beginning_of_history).filter(meta().and(has_selection().not())));
    set.add(m(">", nc::end_of_history).filter(meta().and(has_selection().not())));
    set.add(m(".", nc::yank_last_arg).filter(meta().and(insert())));
    set.add(m("_", nc::yank_last_arg).filter(meta().and(insert())));
    set.add(m("c-y", nc::yank_nth_arg).filter(meta().and(insert())));
    set.add(m("#", nc::insert_comment).filter(meta().and(insert())));
    set.add(m("enter", nc::accept_line).filter(meta().and(insert())));
    set.add(m("c-] <any>", |e| character_search(e, true)));
    set.add(m("left", |e| {
        let count = e.count();
        let buffer = e.buffer();
        if let Some(delta) = buffer.document().find_previous_word_beginning(count, false) {
            buffer.move_cursor(delta);
        }
        Ok(())
    }));
    set.add(m("right", |e| {
        let count = e.count();
        let buffer = e.buffer();
        let doc = buffer.document();
        let delta = doc
            .find_next_word_beginning(count, false)
            .unwrap_or_else(|| doc.get_end_of_document_position());
        buffer.move_cursor(delta);
        Ok(())
    }));
    set.add(
        m("/", |e| {
            let buffer = e.buffer();
            if buffer.complete_state().is_some() {
                buffer.complete_previous(1, false)
            } else {
                buffer
                    .start_completion(CompletionSelect::None, false, CompleteEvent::requested())
                    .map(|_| ())
            }
        })
        .filter(meta().and(insert())),
    );
    set.add(
        m("w", |e| {
            let data = e.buffer().copy_selection(false);
            e.state.clipboard.set_data(data);
            Ok(())
        })
        .filter(meta().and(has_selection())),
    );
    for d in '0'..='9' {
        set.add(
            binding(&d.to_string(), move |e| {
                e.append_to_arg_count(&d.to_string());
                Ok(())
            })
            .filter(meta())
            .save_before(false.into()),
        );
    }
    set.add(
        binding("-", |e| {
            e.append_to_arg_count("-");
            Ok(())
        })
        .filter(meta().and(has_arg().not()))
        .save_before(false.into()),
    );

    // C-x variants.
    let x = |keys: &str, f: fn(&mut KeyEvent<'_>) -> HandlerResult| {
        binding(keys, f).filter(ctrl_x())
    };
    set.add(x("(", nc::start_kbd_macro));
    set.add(x(")", nc::end_kbd_macro));
    set.add(x("e", nc::call_last_kbd_macro).record_in_macro(false));
    set.add(x("c-u", nc::undo).filter(ctrl_x().and(insert())).save_before(false.into()));
    set.add(x("c-e", nc::edit_and_execute_command));
    set.add(x("c-x", exchange_point_and_mark));
    set.add(
        x("c-l", |e| e.buffer().start_history_lines_completion())
            .filter(ctrl_x().and(insert())),
    );
    set.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Dispatcher;
    use core_events::{Key, KeyPress};
    use core_state::{Buffer, EditingMode, SessionState};
    use pretty_assertions::assert_eq;

    fn setup(text: &str) -> (Dispatcher, SessionState) {
        let d = Dispatcher::with_defaults().unwrap();
        let mut buffer = Buffer::default();
        buffer.insert_text(text, false, true).unwrap();
        (d, SessionState::new(buffer, EditingMode::Emacs))
    }

    fn keys(spec: &[Key]) -> Vec<KeyPress> {
        spec.iter().copied().map(KeyPress::key).collect()
    }

    #[test]
    fn meta_b_and_meta_f_move_by_words() {
        let (mut d, mut s) = setup("one two three");
        d.feed_all(keys(&[Key::Escape, Key::Char('b')]), &mut s);
        assert_eq!(s.buffer.cursor_position(), 8);
        d.feed_all(keys(&[Key::Escape, Key::Char('b'), Key::Escape, Key::Char('f')]), &mut s);
        assert_eq!(s.buffer.cursor_position(), 7);
        assert!(!s.emacs.has_prefix());
    }

    #[test]
    fn meta_digit_argument_repeats_command() {
        let (mut d, mut s) = setup("abcdef");
        d.feed_all(
            keys(&[Key::Escape, Key::Char('3'), Key::Control('b')]),
            &mut s,
        );
        assert_eq!(s.buffer.cursor_position(), 3);
        assert_eq!(s.arg, None);
    }

    #[test]
    fn unbound_meta_key_falls_through_to_self_insert() {
        let (mut d, mut s) = setup("");
        d.feed_all(keys(&[Key::Escape, Key::Char('z')]), &mut s);
        assert_eq!(s.buffer.text(), "z");
    }

    #[test]
    fn repeated_kill_word_accumulates() {
        let (mut d, mut s) = setup("foo bar baz");
        s.buffer.set_cursor_position(0);
        d.feed_all(
            keys(&[Key::Escape, Key::Char('d'), Key::Escape, Key::Char('d')]),
            &mut s,
        );
        assert_eq!(s.buffer.text(), " baz");
        assert_eq!(s.clipboard.get_data().text, "foo bar");
    }

    #[test]
    fn yank_and_yank_pop_cycle_the_ring() {
        let (mut d, mut s) = setup("");
        s.clipboard.set_text("first");
        s.clipboard.set_text("second");
        d.feed_all(keys(&[Key::Control('y')]), &mut s);
        assert_eq!(s.buffer.text(), "second");
        d.feed_all(keys(&[Key::Escape, Key::Char('y')]), &mut s);
        assert_eq!(s.buffer.text(), "first");
    }

    #[test]
    fn mark_and_cut_region() {
        let (mut d, mut s) = setup("hello world");
        s.buffer.set_cursor_position(0);
        d.feed_all(keys(&[Key::Control('@'), Key::Escape, Key::Char('f')]), &mut s);
        assert!(s.buffer.selection().is_some());
        d.feed_all(keys(&[Key::Control('w')]), &mut s);
        assert_eq!(s.buffer.text(), " world");
        assert_eq!(s.clipboard.get_data().text, "hello");
        d.feed_all(keys(&[Key::Control('y')]), &mut s);
        assert_eq!(s.buffer.text(), "hello world");
    }

    #[test]
    fn ctrl_x_ctrl_e_requests_external_editor() {
        let (mut d, mut s) = setup("ls");
        d.feed_all(keys(&[Key::Control('x'), Key::Control('e')]), &mut s);
        assert_eq!(
            s.take_requests(),
            vec![core_state::SessionRequest::EditExternally]
        );
        assert_eq!(s.buffer.text(), "ls");
    }

    #[test]
    fn character_search_jumps_on_line() {
        let (mut d, mut s) = setup("a.b.c");
        s.buffer.set_cursor_position(0);
        d.feed_all(keys(&[Key::Control(']'), Key::Char('.')]), &mut s);
        assert_eq!(s.buffer.cursor_position(), 1);
    }
}
