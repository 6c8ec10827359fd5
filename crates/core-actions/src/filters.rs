//! Conditions over `SessionState` used to activate bindings.

use core_keymap::Filter;
use core_state::{InputMode, SessionState};

pub type Cond = Filter<SessionState>;

pub fn emacs_mode() -> Cond {
    Filter::new(SessionState::is_emacs)
}

pub fn vi_mode() -> Cond {
    Filter::new(SessionState::is_vi)
}

pub fn has_selection() -> Cond {
    Filter::new(|s: &SessionState| s.buffer.selection().is_some())
}

pub fn read_only() -> Cond {
    Filter::new(|s: &SessionState| s.buffer.is_read_only())
}

pub fn is_multiline() -> Cond {
    Filter::new(|s: &SessionState| s.buffer.is_multiline())
}

pub fn buffer_empty() -> Cond {
    Filter::new(|s: &SessionState| s.buffer.text().is_empty())
}

pub fn has_arg() -> Cond {
    Filter::new(|s: &SessionState| s.arg.is_some())
}

pub fn is_searching() -> Cond {
    Filter::new(|s: &SessionState| s.buffer.isearch().is_some())
}

pub fn has_completions() -> Cond {
    Filter::new(|s: &SessionState| {
        s.buffer
            .complete_state()
            .is_some_and(|c| !c.completions.is_empty())
    })
}

pub fn completion_selected() -> Cond {
    Filter::new(|s: &SessionState| {
        s.buffer
            .complete_state()
            .is_some_and(|c| c.complete_index.is_some())
    })
}

pub fn quoted_insert() -> Cond {
    Filter::new(|s: &SessionState| s.quoted_insert)
}

/// The binding being dispatched is the same as the previous one.
pub fn is_repeat() -> Cond {
    Filter::new(|s: &SessionState| s.dispatch.is_repeat)
}

pub fn emacs_insert_mode() -> Cond {
    Filter::new(|s: &SessionState| {
        s.is_emacs() && s.buffer.selection().is_none() && !s.buffer.is_read_only()
    })
}

pub fn emacs_selection_mode() -> Cond {
    Filter::new(|s: &SessionState| s.is_emacs() && s.buffer.selection().is_some())
}

pub fn meta_pressed() -> Cond {
    Filter::new(|s: &SessionState| s.emacs.meta_pressed)
}

pub fn ctrl_x_pressed() -> Cond {
    Filter::new(|s: &SessionState| s.emacs.ctrl_x_pressed)
}

pub fn no_prefix() -> Cond {
    Filter::new(|s: &SessionState| !s.emacs.has_prefix())
}

fn vi_pending(s: &SessionState) -> bool {
    s.vi.operator.is_some() || s.vi.waiting_for_digraph || s.buffer.selection().is_some()
}

/// Vi navigation: no operator, digraph or selection pending. Read-only
/// buffers are always in navigation mode.
pub fn vi_navigation_mode() -> Cond {
    Filter::new(|s: &SessionState| {
        s.is_vi()
            && !vi_pending(s)
            && (s.vi.input_mode == InputMode::Navigation
                || s.vi.temporary_navigation_mode
                || s.buffer.is_read_only())
    })
}

fn vi_plain_mode(mode: InputMode) -> Cond {
    Filter::new(move |s: &SessionState| {
        s.is_vi()
            && !vi_pending(s)
            && !s.vi.temporary_navigation_mode
            && !s.buffer.is_read_only()
            && s.vi.input_mode == mode
    })
}

pub fn vi_insert_mode() -> Cond {
    vi_plain_mode(InputMode::Insert)
}

pub fn vi_insert_multiple_mode() -> Cond {
    vi_plain_mode(InputMode::InsertMultiple)
}

pub fn vi_replace_mode() -> Cond {
    vi_plain_mode(InputMode::Replace)
}

pub fn vi_selection_mode() -> Cond {
    Filter::new(|s: &SessionState| s.is_vi() && s.buffer.selection().is_some())
}

pub fn vi_waiting_for_text_object() -> Cond {
    Filter::new(|s: &SessionState| s.is_vi() && s.vi.operator.is_some())
}

pub fn vi_digraph_mode() -> Cond {
    Filter::new(|s: &SessionState| s.is_vi() && s.vi.waiting_for_digraph)
}

pub fn vi_recording_macro() -> Cond {
    Filter::new(|s: &SessionState| s.is_vi() && s.vi.is_recording())
}

/// Typing inserts text: Emacs without selection, or Vi insert mode.
pub fn insert_mode() -> Cond {
    emacs_insert_mode().or(vi_insert_mode())
}
