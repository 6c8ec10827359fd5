//! Operators and their doubled line forms (`dd`, `yy`, `>>`, `guu`).

use core_state::{InputMode, PendingOperator};
use core_text::{ClipboardData, Document, SelectionKind};
use tracing::{debug, trace};

use super::shift_lines;
use super::text_object::{TextObject, TextObjectKind};
use crate::filters::{
    Cond, read_only, vi_navigation_mode, vi_selection_mode, vi_waiting_for_text_object,
};
use crate::{BindingSet, HandlerResult, KeyEvent, binding};

/// Run `op` over `obj`. The register chosen with `"x` is consumed.
pub(crate) fn apply(e: &mut KeyEvent<'_>, op: PendingOperator, obj: TextObject) -> HandlerResult {
    debug!(target: "actions.vi", operator = op.name(), kind = ?obj.kind, "apply_operator");
    match op {
        PendingOperator::Delete | PendingOperator::Change | PendingOperator::Yank => {
            let register = e.state.vi.register.take();
            let cut = if op == PendingOperator::Change {
                obj.cut_keeping_line(&e.state.buffer)
            } else {
                obj.cut(&e.state.buffer)
            };
            if let Some((doc, data)) = cut {
                if op == PendingOperator::Yank {
                    let (start, _) = obj.operator_range(e.state.buffer.document());
                    if obj.kind != TextObjectKind::Linewise && start < 0 {
                        e.buffer().move_cursor(start);
                    }
                } else {
                    e.buffer().set_document(doc, false)?;
                }
                if !data.text.is_empty() {
                    e.state.clipboard.write(register, data);
                }
            }
            if op == PendingOperator::Change {
                e.state.vi.set_input_mode(InputMode::Insert);
            }
        }
        PendingOperator::ShiftRight | PendingOperator::ShiftLeft => {
            let (from, to) = obj.line_numbers(e.state.buffer.document());
            shift_lines(e.buffer(), from, to, 1, op == PendingOperator::ShiftRight)?;
        }
        PendingOperator::SwapCase | PendingOperator::Lowercase | PendingOperator::Uppercase => {
            let f: fn(&str) -> String = match op {
                PendingOperator::SwapCase => swap_case,
                PendingOperator::Lowercase => str::to_lowercase,
                _ => str::to_uppercase,
            };
            let ranges = obj.ranges(e.state.buffer.document());
            let Some(&(first, _)) = ranges.first() else {
                return Ok(());
            };
            let buffer = e.buffer();
            for &(from, to) in ranges.iter().rev() {
                buffer.transform_region(from, to, f)?;
            }
            buffer.set_cursor_position(first);
        }
    }
    Ok(())
}

pub fn swap_case(text: &str) -> String {
    text.chars()
        .flat_map(|c| {
            let swapped: Vec<char> = if c.is_uppercase() {
                c.to_lowercase().collect()
            } else {
                c.to_uppercase().collect()
            };
            swapped
        })
        .collect()
}

fn operator(set: &mut BindingSet, keys: &str, filter: Cond, op: PendingOperator) {
    set.add(
        binding(keys, move |e| {
            e.state.vi.operator = Some(op);
            e.state.vi.operator_arg = e.arg_present().then(|| e.count());
            trace!(target: "actions.vi", operator = op.name(), "operator_pending");
            Ok(())
        })
        .filter(
            vi_waiting_for_text_object()
                .not()
                .and(filter.clone())
                .and(vi_navigation_mode()),
        ),
    );
    selection_operator(set, keys, filter, op);
}

/// In visual mode the operator runs at once on the selection.
fn selection_operator(set: &mut BindingSet, keys: &str, filter: Cond, op: PendingOperator) {
    set.add(
        binding(keys, move |e| {
            let Some(sel) = e.state.buffer.selection() else {
                return Ok(());
            };
            let kind = match sel.kind {
                SelectionKind::Lines => TextObjectKind::Linewise,
                SelectionKind::Block => TextObjectKind::Block,
                SelectionKind::Characters => TextObjectKind::Inclusive,
            };
            let cursor = e.state.buffer.cursor_position() as isize;
            let obj = TextObject::new(sel.anchor as isize - cursor).with_kind(kind);
            apply(e, op, obj)?;
            e.buffer().exit_selection();
            Ok(())
        })
        .filter(
            vi_waiting_for_text_object()
                .not()
                .and(filter)
                .and(vi_selection_mode()),
        ),
    );
}

/// Rows `[row, row + count)` of the current line downwards, clamped.
fn line_span(e: &KeyEvent<'_>) -> (usize, usize) {
    let doc = e.state.buffer.document();
    let row = doc.cursor_position_row();
    (row, (row + e.count()).min(doc.line_count()))
}

fn delete_lines(e: &mut KeyEvent<'_>) -> HandlerResult {
    let (row, end) = line_span(e);
    let doc = e.state.buffer.document();
    let lines: Vec<&str> = doc.lines().collect();
    let mut before = lines[..row].join("\n");
    let deleted = lines[row..end].join("\n");
    let after = lines[end..].join("\n");
    if !before.is_empty() && !after.is_empty() {
        before.push('\n');
    }
    // Cursor lands on the first non-blank of the line that moved up.
    let indent = after.chars().take_while(|&c| c == ' ').count();
    let cursor = before.chars().count() + indent;
    let text = format!("{before}{after}");
    let register = e.state.vi.register.take();
    e.buffer().set_document(Document::new(text, cursor), false)?;
    e.state
        .clipboard
        .write(register, ClipboardData::new(deleted, SelectionKind::Lines));
    Ok(())
}

fn yank_lines(e: &mut KeyEvent<'_>) -> HandlerResult {
    let (row, end) = line_span(e);
    let text = e
        .state
        .buffer
        .document()
        .lines()
        .skip(row)
        .take(end - row)
        .collect::<Vec<_>>()
        .join("\n");
    let register = e.state.vi.register.take();
    e.state
        .clipboard
        .write(register, ClipboardData::new(text, SelectionKind::Lines));
    Ok(())
}

/// `cc`/`S`: the whole line goes to the register, the indent stays.
fn change_line(e: &mut KeyEvent<'_>) -> HandlerResult {
    let line = e.state.buffer.document().current_line().to_string();
    let register = e.state.vi.register.take();
    let buffer = e.buffer();
    let start = buffer.document().get_start_of_line_position(true);
    buffer.move_cursor(start);
    let end = buffer.document().get_end_of_line_position();
    buffer.delete(end.unsigned_abs())?;
    e.state
        .clipboard
        .write(register, ClipboardData::new(line, SelectionKind::Lines));
    e.state.vi.set_input_mode(InputMode::Insert);
    Ok(())
}

fn shift_current_lines(e: &mut KeyEvent<'_>, right: bool) -> HandlerResult {
    let (row, end) = line_span(e);
    shift_lines(e.buffer(), row, end.saturating_sub(1).max(row), 1, right)
}

pub(super) fn register(set: &mut BindingSet) {
    let writable = read_only().not();
    let always = Cond::from_bool(true);

    operator(set, "d", writable.clone(), PendingOperator::Delete);
    operator(set, "c", writable.clone(), PendingOperator::Change);
    operator(set, "y", always.clone(), PendingOperator::Yank);
    operator(set, ">", writable.clone(), PendingOperator::ShiftRight);
    operator(set, "<", writable.clone(), PendingOperator::ShiftLeft);
    operator(set, "g ~", writable.clone(), PendingOperator::SwapCase);
    operator(set, "g u", writable.clone(), PendingOperator::Lowercase);
    operator(set, "g U", writable.clone(), PendingOperator::Uppercase);

    selection_operator(set, "x", writable.clone(), PendingOperator::Delete);
    selection_operator(set, "s", writable.clone(), PendingOperator::Change);
    selection_operator(set, "~", writable.clone(), PendingOperator::SwapCase);
    selection_operator(set, "u", writable.clone(), PendingOperator::Lowercase);
    selection_operator(set, "U", writable.clone(), PendingOperator::Uppercase);

    let nav = vi_navigation_mode();
    let nav_rw = nav.clone().and(writable);
    set.add(binding("d d", delete_lines).filter(nav_rw.clone()));
    for keys in ["c c", "S"] {
        set.add(binding(keys, change_line).filter(nav_rw.clone()));
    }
    for keys in ["y y", "Y"] {
        set.add(binding(keys, yank_lines).filter(nav.clone()));
    }
    set.add(binding("> >", |e| shift_current_lines(e, true)).filter(nav_rw.clone()));
    set.add(binding("< <", |e| shift_current_lines(e, false)).filter(nav_rw.clone()));

    let line_transforms: [(&str, fn(&str) -> String); 3] = [
        ("g ~ ~", swap_case),
        ("g u u", str::to_lowercase),
        ("g U U", str::to_uppercase),
    ];
    for (keys, f) in line_transforms {
        set.add(binding(keys, move |e| e.buffer().transform_current_line(f)).filter(nav_rw.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn swap_case_flips_each_char() {
        assert_eq!(swap_case("Hello World"), "hELLO wORLD");
        assert_eq!(swap_case("ß"), "SS");
    }
}
