use core_events::{Key, KeyPress};
use core_state::session::{extend_arg, parse_arg};
use core_state::{Buffer, SessionState};

/// What a handler sees: the session, the keys that triggered it and the
/// numeric argument typed before them.
pub struct KeyEvent<'a> {
    pub state: &'a mut SessionState,
    pub keys: &'a [KeyPress],
    arg: Option<String>,
    /// Same binding as the previous key press.
    pub is_repeat: bool,
}

impl<'a> KeyEvent<'a> {
    pub fn new(
        state: &'a mut SessionState,
        keys: &'a [KeyPress],
        arg: Option<String>,
        is_repeat: bool,
    ) -> Self {
        Self {
            state,
            keys,
            arg,
            is_repeat,
        }
    }

    pub fn buffer(&mut self) -> &mut Buffer {
        &mut self.state.buffer
    }

    /// Data of the last key press.
    pub fn data(&self) -> &str {
        self.keys.last().map_or("", |k| k.data.as_str())
    }

    pub fn key(&self) -> Option<Key> {
        self.keys.last().map(|k| k.key)
    }

    /// Numeric argument, 1 when none was typed.
    pub fn arg(&self) -> isize {
        parse_arg(self.arg.as_deref())
    }

    pub fn arg_present(&self) -> bool {
        self.arg.is_some()
    }

    /// Repeat count: the absolute argument, at least 1.
    pub fn count(&self) -> usize {
        self.arg().unsigned_abs().max(1)
    }

    /// Override the argument (Vi multiplies operator and motion counts).
    pub fn set_arg(&mut self, arg: Option<String>) {
        self.arg = arg;
    }

    /// Hand the argument on to the next command (prefix keys).
    pub fn keep_arg(&mut self) {
        if self.arg.is_some() {
            self.state.arg = self.arg.clone();
        }
    }

    /// Add a digit (or `-`) to the argument for the next command.
    pub fn append_to_arg_count(&mut self, data: &str) {
        self.state.arg = Some(extend_arg(self.arg.as_deref(), data));
    }
}
