//! Editing-mode state for Vi and Emacs key bindings.

use ahash::AHashMap;
use core_events::KeyPress;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EditingMode {
    #[default]
    Emacs,
    Vi,
}

/// Vi input mode. Visual modes are `Navigation` plus a document selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputMode {
    #[default]
    Insert,
    Navigation,
    Replace,
    /// Insert at several cursor positions at once (visual block `I`/`A`).
    InsertMultiple,
}

/// Operator waiting for a text object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PendingOperator {
    Delete,
    Change,
    Yank,
    ShiftRight,
    ShiftLeft,
    SwapCase,
    Lowercase,
    Uppercase,
}

impl PendingOperator {
    pub fn name(self) -> &'static str {
        match self {
            PendingOperator::Delete => "delete",
            PendingOperator::Change => "change",
            PendingOperator::Yank => "yank",
            PendingOperator::ShiftRight => "shift_right",
            PendingOperator::ShiftLeft => "shift_left",
            PendingOperator::SwapCase => "swap_case",
            PendingOperator::Lowercase => "lowercase",
            PendingOperator::Uppercase => "uppercase",
        }
    }
}

/// Last `f`/`F`/`t`/`T` target for `;` and `,`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CharacterFind {
    pub character: char,
    pub backwards: bool,
    /// `t`/`T`: stop before the character.
    pub till: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ViState {
    pub input_mode: InputMode,
    pub operator: Option<PendingOperator>,
    /// Count typed before the operator (`3dw`).
    pub operator_arg: Option<usize>,
    /// Register selected with `"x` for the next yank/delete/paste.
    pub register: Option<char>,
    pub last_character_find: Option<CharacterFind>,
    pub recording_register: Option<char>,
    pub current_recording: Vec<KeyPress>,
    pub macros: AHashMap<char, Vec<KeyPress>>,
    pub waiting_for_digraph: bool,
    pub digraph_symbol1: Option<char>,
    /// `C-o` in insert mode: run one navigation command, then return.
    pub temporary_navigation_mode: bool,
}

impl ViState {
    /// Leave pending sub-states; macros and the last character find survive.
    pub fn reset(&mut self) {
        self.input_mode = InputMode::Insert;
        self.clear_pending();
        self.temporary_navigation_mode = false;
    }

    pub fn clear_pending(&mut self) {
        self.operator = None;
        self.operator_arg = None;
        self.register = None;
        self.waiting_for_digraph = false;
        self.digraph_symbol1 = None;
    }

    pub fn set_input_mode(&mut self, mode: InputMode) {
        if mode == InputMode::Navigation {
            self.clear_pending();
            self.temporary_navigation_mode = false;
        }
        if self.input_mode != mode {
            debug!(target: "actions.vi", from = ?self.input_mode, to = ?mode, "input_mode");
        }
        self.input_mode = mode;
    }

    pub fn is_recording(&self) -> bool {
        self.recording_register.is_some()
    }

    pub fn start_recording(&mut self, register: char) {
        self.recording_register = Some(register);
        self.current_recording.clear();
        debug!(target: "actions.macro", register = %register, "vi_record_start");
    }

    /// Stop recording and store the keys under the register.
    pub fn stop_recording(&mut self) {
        if let Some(register) = self.recording_register.take() {
            let keys = std::mem::take(&mut self.current_recording);
            debug!(target: "actions.macro", register = %register, keys = keys.len(), "vi_record_stop");
            self.macros.insert(register, keys);
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct EmacsState {
    /// Escape was pressed: the next command is its `meta_` variant.
    pub meta_pressed: bool,
    /// `C-x` was pressed: the next command is its `ctrl_x_` variant.
    pub ctrl_x_pressed: bool,
    /// Keys of the pending prefix, recorded together with the next command.
    pub prefix_keys: Vec<KeyPress>,
    pub current_recording: Option<Vec<KeyPress>>,
    pub last_macro: Option<Vec<KeyPress>>,
}

impl EmacsState {
    pub fn reset(&mut self) {
        self.clear_prefix();
        self.current_recording = None;
    }

    pub fn clear_prefix(&mut self) {
        self.meta_pressed = false;
        self.ctrl_x_pressed = false;
        self.prefix_keys.clear();
    }

    pub fn has_prefix(&self) -> bool {
        self.meta_pressed || self.ctrl_x_pressed
    }

    pub fn is_recording(&self) -> bool {
        self.current_recording.is_some()
    }

    pub fn start_macro(&mut self) {
        self.current_recording = Some(Vec::new());
        debug!(target: "actions.macro", "emacs_record_start");
    }

    pub fn end_macro(&mut self) {
        if let Some(keys) = self.current_recording.take() {
            debug!(target: "actions.macro", keys = keys.len(), "emacs_record_stop");
            self.last_macro = Some(keys);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_events::Key;

    #[test]
    fn navigation_reset_keeps_macros_and_find() {
        let mut vi = ViState::default();
        vi.operator = Some(PendingOperator::Delete);
        vi.waiting_for_digraph = true;
        vi.last_character_find = Some(CharacterFind {
            character: 'x',
            backwards: false,
            till: false,
        });
        vi.start_recording('q');
        vi.current_recording.push(KeyPress::char('a'));
        vi.stop_recording();
        vi.set_input_mode(InputMode::Navigation);
        assert_eq!(vi.operator, None);
        assert!(!vi.waiting_for_digraph);
        assert!(vi.last_character_find.is_some());
        assert_eq!(vi.macros[&'q'], vec![KeyPress::new(Key::Char('a'), "a")]);
    }

    #[test]
    fn emacs_macro_lifecycle() {
        let mut emacs = EmacsState::default();
        emacs.start_macro();
        assert!(emacs.is_recording());
        if let Some(rec) = emacs.current_recording.as_mut() {
            rec.push(KeyPress::char('h'));
        }
        emacs.end_macro();
        assert!(!emacs.is_recording());
        assert_eq!(emacs.last_macro.as_ref().map(Vec::len), Some(1));
    }
}
