//! Motions and text objects.
//!
//! Each one is registered up to three times from a single function: applied
//! to the pending operator, as a cursor move in navigation mode, and as a
//! selection change in visual mode.

use std::rc::Rc;

use core_state::{Buffer, CharacterFind, PendingOperator};
use core_text::{Document, Selection, SelectionKind};
use tracing::trace;

use super::operators;
use super::text_object::{TextObject, TextObjectKind};
use crate::filters::{Cond, vi_navigation_mode, vi_selection_mode, vi_waiting_for_text_object};
use crate::{BindingSet, HandlerResult, KeyEvent, binding};

type ObjectFn = dyn Fn(&mut KeyEvent<'_>) -> TextObject;

#[derive(Clone)]
struct Opts {
    filter: Cond,
    move_handler: bool,
    selection_handler: bool,
}

impl Default for Opts {
    fn default() -> Self {
        Self {
            filter: Cond::from_bool(true),
            move_handler: true,
            selection_handler: true,
        }
    }
}

impl Opts {
    /// `iw`, `a(`: only meaningful after an operator or in visual mode.
    fn object() -> Self {
        Self {
            move_handler: false,
            ..Self::default()
        }
    }

    /// `j`/`k`: navigation and visual mode have their own bindings.
    fn operator_only() -> Self {
        Self {
            move_handler: false,
            selection_handler: false,
            ..Self::default()
        }
    }
}

fn text_object<F>(set: &mut BindingSet, keys: &str, opts: Opts, f: F)
where
    F: Fn(&mut KeyEvent<'_>) -> TextObject + 'static,
{
    let f: Rc<ObjectFn> = Rc::new(f);
    let waiting = vi_waiting_for_text_object();

    let run = Rc::clone(&f);
    set.add(
        binding(keys, move |e| {
            let operator_arg = e.state.vi.operator_arg.take();
            if operator_arg.is_some() || e.arg_present() {
                let count = operator_arg.unwrap_or(1) * e.count();
                e.set_arg(Some(count.to_string()));
            }
            let obj = run(e);
            let op = e.state.vi.operator.take();
            trace!(target: "actions.vi", ?obj, operator = op.map(PendingOperator::name), "text_object");
            match op {
                Some(op) => operators::apply(e, op, obj),
                None => Ok(()),
            }
        })
        .filter(waiting.clone().and(opts.filter.clone())),
    );

    if opts.move_handler {
        let run = Rc::clone(&f);
        set.add(
            binding(keys, move |e| {
                let obj = run(e);
                e.buffer().move_cursor(obj.start);
                Ok(())
            })
            .filter(
                waiting
                    .clone()
                    .not()
                    .and(opts.filter.clone())
                    .and(vi_navigation_mode()),
            ),
        );
    }

    if opts.selection_handler {
        set.add(
            binding(keys, move |e| {
                let obj = f(e);
                select_object(e.buffer(), obj)
            })
            .filter(waiting.not().and(opts.filter).and(vi_selection_mode())),
        );
    }
}

/// Objects with both ends (`iw`) replace the selection; plain motions move
/// its free end.
fn select_object(buffer: &mut Buffer, obj: TextObject) -> HandlerResult {
    if buffer.selection().is_none() {
        return Ok(());
    }
    if obj.end == 0 {
        buffer.move_cursor(obj.start);
        return Ok(());
    }
    let doc = buffer.document();
    let (start, end) = obj.operator_range(doc);
    let anchor = doc.offset_cursor(start);
    let end = doc.offset_cursor(end);
    let (cursor, kind) = match obj.kind {
        TextObjectKind::Linewise => (end, SelectionKind::Lines),
        _ => (end.saturating_sub(1).max(anchor), SelectionKind::Characters),
    };
    let selected = Document::new(doc.text().to_string(), cursor)
        .with_selection(Some(Selection::new(anchor, kind)));
    buffer.set_document(selected, true)
}

fn doc<'e>(e: &'e KeyEvent<'_>) -> &'e Document {
    e.state.buffer.document()
}

/// Printable char typed after `f`, `r`, `q` and friends.
pub(super) fn char_arg(e: &KeyEvent<'_>) -> Option<char> {
    e.data().chars().next().filter(|c| !c.is_control())
}

fn find_char(e: &KeyEvent<'_>, find: CharacterFind, repeat: bool) -> TextObject {
    let doc = doc(e);
    let needle = find.character.to_string();
    let count = e.count();
    if find.backwards {
        let search = |n| doc.find_backwards(&needle, true, false, n);
        let found = match search(count) {
            Some(-1) if find.till && repeat => search(count + 1),
            other => other,
        };
        match found {
            Some(pos) if find.till => TextObject::new(pos + 1),
            Some(pos) => TextObject::new(pos),
            None => TextObject::new(0),
        }
    } else {
        let search = |n| doc.find(&needle, true, false, false, n);
        let found = match search(count) {
            Some(1) if find.till && repeat => search(count + 1),
            other => other,
        };
        match found {
            Some(pos) if find.till => TextObject::inclusive(pos - 1),
            Some(pos) => TextObject::inclusive(pos),
            None => TextObject::new(0),
        }
    }
}

fn enclosing(e: &KeyEvent<'_>, open: char, close: char, inner: bool) -> TextObject {
    let doc = doc(e);
    let (start, end) = if open == close {
        let quote = open.to_string();
        (
            doc.find_backwards(&quote, false, false, 1),
            doc.find(&quote, false, false, false, 1),
        )
    } else {
        (
            doc.find_enclosing_bracket_left(open, close, None),
            doc.find_enclosing_bracket_right(open, close, None),
        )
    };
    match (start, end) {
        (Some(start), Some(end)) => {
            let offset = if inner { 0 } else { 1 };
            TextObject::span(start + 1 - offset, end + offset)
        }
        _ => TextObject::new(0),
    }
}

fn line_start(e: &KeyEvent<'_>, row: usize) -> TextObject {
    let doc = doc(e);
    let row = row.min(doc.line_count().saturating_sub(1));
    TextObject::linewise(doc.translate_row_col_to_index(row, 0) as isize - doc.cursor_position() as isize)
}

pub(super) fn register(set: &mut BindingSet) {
    let left = |e: &mut KeyEvent<'_>| TextObject::new(doc(e).get_cursor_left_position(e.count()));
    let right = |e: &mut KeyEvent<'_>| TextObject::new(doc(e).get_cursor_right_position(e.count()));
    for keys in ["h", "left", "backspace"] {
        text_object(set, keys, Opts::default(), left);
    }
    for keys in ["l", "right", "space"] {
        text_object(set, keys, Opts::default(), right);
    }
    text_object(set, "j", Opts::operator_only(), |e| {
        TextObject::linewise(doc(e).get_cursor_down_position(e.count(), None))
    });
    text_object(set, "k", Opts::operator_only(), |e| {
        TextObject::linewise(doc(e).get_cursor_up_position(e.count(), None))
    });

    for (keys, big) in [("w", false), ("W", true)] {
        text_object(set, keys, Opts::default(), move |e| {
            let doc = doc(e);
            TextObject::new(
                doc.find_next_word_beginning(e.count(), big)
                    .unwrap_or_else(|| doc.get_end_of_document_position()),
            )
        });
    }
    for (keys, big) in [("e", false), ("E", true)] {
        text_object(set, keys, Opts::default(), move |e| {
            match doc(e).find_next_word_ending(false, e.count(), big) {
                Some(end) => TextObject::inclusive(end - 1),
                None => TextObject::new(0),
            }
        });
    }
    for (keys, big) in [("b", false), ("B", true)] {
        text_object(set, keys, Opts::default(), move |e| {
            TextObject::new(doc(e).find_previous_word_beginning(e.count(), big).unwrap_or(0))
        });
    }
    for (keys, big) in [("g e", false), ("g E", true)] {
        text_object(set, keys, Opts::default(), move |e| {
            match doc(e).find_previous_word_ending(e.count(), big) {
                Some(end) => TextObject::inclusive(end - 1),
                None => TextObject::new(0),
            }
        });
    }

    text_object(set, "0", Opts::default(), |e| {
        TextObject::new(doc(e).get_start_of_line_position(false))
    });
    text_object(set, "^", Opts::default(), |e| {
        TextObject::new(doc(e).get_start_of_line_position(true))
    });
    text_object(set, "$", Opts::default(), |e| {
        TextObject::new(doc(e).get_end_of_line_position())
    });
    text_object(set, "g _", Opts::default(), |e| {
        let doc = doc(e);
        let last = doc.current_line().trim_end().chars().count().saturating_sub(1);
        TextObject::inclusive(last as isize - doc.cursor_position_col() as isize)
    });
    text_object(set, "|", Opts::default(), |e| {
        TextObject::new(doc(e).get_column_cursor_position(e.count() - 1))
    });

    text_object(set, "g g", Opts::default(), |e| {
        if e.arg_present() {
            line_start(e, e.count() - 1)
        } else {
            TextObject::linewise(doc(e).get_start_of_document_position())
        }
    });
    text_object(set, "G", Opts::default(), |e| {
        let row = if e.arg_present() {
            e.count() - 1
        } else {
            doc(e).line_count().saturating_sub(1)
        };
        line_start(e, row)
    });
    text_object(set, "H", Opts::default(), |e| line_start(e, 0));
    text_object(set, "M", Opts::default(), |e| {
        line_start(e, doc(e).line_count().saturating_sub(1) / 2)
    });
    text_object(set, "L", Opts::default(), |e| {
        line_start(e, doc(e).line_count().saturating_sub(1))
    });

    text_object(set, "%", Opts::default(), |e| {
        if e.arg_present() {
            // `N%` goes to the line N percent into the text.
            let count = e.count();
            if count > 100 {
                return TextObject::new(0);
            }
            let row = (count * doc(e).line_count()).saturating_sub(1) / 100;
            return line_start(e, row);
        }
        match doc(e).find_matching_bracket_position(None, None) {
            0 => TextObject::new(0),
            pos => TextObject::inclusive(pos),
        }
    });
    text_object(set, "{", Opts::default(), |e| {
        TextObject::new(doc(e).start_of_paragraph(e.count(), true))
    });
    text_object(set, "}", Opts::default(), |e| {
        TextObject::new(doc(e).end_of_paragraph(e.count(), true))
    });

    for (keys, backwards, till) in [
        ("f <any>", false, false),
        ("F <any>", true, false),
        ("t <any>", false, true),
        ("T <any>", true, true),
    ] {
        text_object(set, keys, Opts::default(), move |e| {
            let Some(character) = char_arg(e) else {
                return TextObject::new(0);
            };
            let find = CharacterFind {
                character,
                backwards,
                till,
            };
            e.state.vi.last_character_find = Some(find);
            find_char(e, find, false)
        });
    }
    for (keys, reverse) in [(";", false), (",", true)] {
        text_object(set, keys, Opts::default(), move |e| {
            let Some(mut find) = e.state.vi.last_character_find else {
                return TextObject::new(0);
            };
            find.backwards ^= reverse;
            find_char(e, find, true)
        });
    }

    for (prefix, inner) in [("a", false), ("i", true)] {
        for (word, big) in [("w", false), ("W", true)] {
            text_object(set, &format!("{prefix} {word}"), Opts::object(), move |e| {
                let (start, end) = doc(e).find_boundaries_of_current_word(big, false, !inner);
                TextObject::span(start, end)
            });
        }
        for (open, close) in [
            ('"', '"'),
            ('\'', '\''),
            ('`', '`'),
            ('[', ']'),
            ('<', '>'),
            ('{', '}'),
            ('(', ')'),
        ] {
            let mut keys = vec![open.to_string()];
            if open != close {
                keys.push(close.to_string());
            }
            if open == '(' {
                keys.push("b".to_string());
            }
            if open == '{' {
                keys.push("B".to_string());
            }
            for key in keys {
                text_object(set, &format!("{prefix} {key}"), Opts::object(), move |e| {
                    enclosing(e, open, close, inner)
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_state::{EditingMode, InputMode, SessionState};
    use pretty_assertions::assert_eq;

    fn event_doc(text: &str, cursor: usize) -> SessionState {
        let mut buffer = Buffer::default();
        buffer.set_document(Document::new(text, cursor), false).unwrap();
        let mut s = SessionState::new(buffer, EditingMode::Vi);
        s.vi.set_input_mode(InputMode::Navigation);
        s
    }

    #[test]
    fn enclosing_brackets_inner_and_around() {
        let mut s = event_doc("f(abc)", 3);
        let e = KeyEvent::new(&mut s, &[], None, false);
        assert_eq!(enclosing(&e, '(', ')', true), TextObject::span(-1, 2));
        assert_eq!(enclosing(&e, '(', ')', false), TextObject::span(-2, 3));
    }

    #[test]
    fn find_char_forward_and_till() {
        let mut s = event_doc("a,b,c", 0);
        let e = KeyEvent::new(&mut s, &[], None, false);
        let f = CharacterFind {
            character: ',',
            backwards: false,
            till: false,
        };
        assert_eq!(find_char(&e, f, false), TextObject::inclusive(1));
        let t = CharacterFind { till: true, ..f };
        assert_eq!(find_char(&e, t, false), TextObject::inclusive(0));
    }

    #[test]
    fn missing_char_is_a_no_op() {
        let mut s = event_doc("abc", 0);
        let e = KeyEvent::new(&mut s, &[], None, false);
        let f = CharacterFind {
            character: 'z',
            backwards: false,
            till: false,
        };
        assert_eq!(find_char(&e, f, false), TextObject::new(0));
    }
}
