//! Per-prompt session: the buffer plus everything key handlers share.

use std::collections::VecDeque;

use core_events::KeyPress;
use thiserror::Error;
use tracing::debug;

use crate::buffer::Buffer;
use crate::clipboard::Clipboard;
use crate::modes::{EditingMode, EmacsState, InputMode, ViState};

/// How a prompt ended without accepting input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("input aborted")]
    UserAbort,
    #[error("end of input")]
    UserExit,
}

/// Reaction to Ctrl-C / Ctrl-D on an empty line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AbortPolicy {
    Ignore,
    /// Clear the line and keep reading.
    Retry,
    /// Finish the session with an error.
    #[default]
    Raise,
}

/// Work a handler asks the event loop to do outside the key dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionRequest {
    ClearScreen,
    /// Open the buffer text in `$EDITOR` and accept the result.
    EditExternally,
}

/// Facts about the binding currently being dispatched, for filters.
#[derive(Debug, Clone, Copy, Default)]
pub struct DispatchInfo {
    /// Same binding as the previous key press.
    pub is_repeat: bool,
    /// Keys come from a macro replay.
    pub replaying: bool,
}

pub struct SessionState {
    pub buffer: Buffer,
    pub editing_mode: EditingMode,
    pub vi: ViState,
    pub emacs: EmacsState,
    pub clipboard: Clipboard,
    /// Numeric argument being typed (`M-3`, `3` in Vi, `-` for negative).
    pub arg: Option<String>,
    pub abort_policy: AbortPolicy,
    pub exit_policy: AbortPolicy,
    pub dispatch: DispatchInfo,
    /// Next key is inserted literally (`C-q`, `C-v`).
    pub quoted_insert: bool,
    /// Keys queued for the dispatcher ahead of new input (macro replay).
    pub pending_feed: VecDeque<KeyPress>,
    result: Option<Result<String, SessionError>>,
    bell: u32,
    requests: Vec<SessionRequest>,
}

impl SessionState {
    pub fn new(buffer: Buffer, editing_mode: EditingMode) -> Self {
        let mut state = Self {
            buffer,
            editing_mode,
            vi: ViState::default(),
            emacs: EmacsState::default(),
            clipboard: Clipboard::new(),
            arg: None,
            abort_policy: AbortPolicy::default(),
            exit_policy: AbortPolicy::default(),
            dispatch: DispatchInfo::default(),
            quoted_insert: false,
            pending_feed: VecDeque::new(),
            result: None,
            bell: 0,
            requests: Vec::new(),
        };
        state.reset_modes();
        state
    }

    pub fn with_policies(mut self, abort: AbortPolicy, exit: AbortPolicy) -> Self {
        self.abort_policy = abort;
        self.exit_policy = exit;
        self
    }

    pub fn set_editing_mode(&mut self, mode: EditingMode) {
        if self.editing_mode != mode {
            debug!(target: "actions.dispatch", ?mode, "editing_mode");
            self.editing_mode = mode;
            self.reset_modes();
        }
    }

    fn reset_modes(&mut self) {
        self.vi.reset();
        self.vi.set_input_mode(InputMode::Insert);
        self.emacs.reset();
        self.arg = None;
        self.quoted_insert = false;
    }

    pub fn is_vi(&self) -> bool {
        self.editing_mode == EditingMode::Vi
    }

    pub fn is_emacs(&self) -> bool {
        self.editing_mode == EditingMode::Emacs
    }

    /// Current Vi input mode, `None` in Emacs mode.
    pub fn vi_input_mode(&self) -> Option<InputMode> {
        self.is_vi().then_some(self.vi.input_mode)
    }

    // ---------------------------------------------------------------------
    // Result
    // ---------------------------------------------------------------------

    /// Validate and accept the buffer. Returns false when validation fails;
    /// the error stays on the buffer for the toolbar.
    pub fn accept_input(&mut self) -> bool {
        if !self.buffer.validate(true) {
            self.ring_bell();
            return false;
        }
        let text = self.buffer.text().to_string();
        self.buffer.append_to_history();
        debug!(target: "runtime", len = text.chars().count(), "accept");
        self.result = Some(Ok(text));
        true
    }

    /// Ctrl-C.
    pub fn abort(&mut self) {
        self.apply_policy(self.abort_policy, SessionError::UserAbort);
    }

    /// Ctrl-D on an empty buffer.
    pub fn exit(&mut self) {
        self.apply_policy(self.exit_policy, SessionError::UserExit);
    }

    fn apply_policy(&mut self, policy: AbortPolicy, error: SessionError) {
        debug!(target: "runtime", ?policy, %error, "session_interrupt");
        match policy {
            AbortPolicy::Ignore => {}
            AbortPolicy::Retry => {
                self.buffer.reset(None, false);
                self.reset_modes();
            }
            AbortPolicy::Raise => self.result = Some(Err(error)),
        }
    }

    pub fn is_done(&self) -> bool {
        self.result.is_some()
    }

    pub fn result(&self) -> Option<&Result<String, SessionError>> {
        self.result.as_ref()
    }

    pub fn take_result(&mut self) -> Option<Result<String, SessionError>> {
        self.result.take()
    }

    /// Prepare for the next prompt; history keeps the accepted entry.
    pub fn start_next(&mut self) {
        self.result = None;
        self.buffer.reset(None, false);
        self.reset_modes();
        self.pending_feed.clear();
        self.requests.clear();
    }

    // ---------------------------------------------------------------------
    // Side channels
    // ---------------------------------------------------------------------

    pub fn ring_bell(&mut self) {
        self.bell += 1;
    }

    /// Whether the bell rang since the last call.
    pub fn take_bell(&mut self) -> bool {
        std::mem::take(&mut self.bell) > 0
    }

    pub fn request(&mut self, request: SessionRequest) {
        self.requests.push(request);
    }

    pub fn take_requests(&mut self) -> Vec<SessionRequest> {
        std::mem::take(&mut self.requests)
    }
}

/// Value of a typed numeric argument: `-` alone is -1, missing is 1, and
/// absurdly large values fall back to 1.
pub fn parse_arg(arg: Option<&str>) -> isize {
    match arg {
        None | Some("") => 1,
        Some("-") => -1,
        Some(text) => match text.parse::<isize>() {
            Ok(n) if n.unsigned_abs() < 1_000_000 => n,
            _ => 1,
        },
    }
}

/// Extend an argument with a typed digit or `-`.
pub fn extend_arg(current: Option<&str>, data: &str) -> String {
    match current {
        _ if data == "-" => "-".to_string(),
        None => data.to_string(),
        Some(cur) => format!("{cur}{data}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::ValidationError;
    use core_text::Document;

    fn session(text: &str) -> SessionState {
        let mut buffer = Buffer::default();
        buffer.insert_text(text, false, true).unwrap();
        SessionState::new(buffer, EditingMode::Emacs)
    }

    #[test]
    fn accept_records_history() {
        let mut s = session("ls");
        assert!(s.accept_input());
        assert_eq!(s.result(), Some(&Ok("ls".to_string())));
        assert_eq!(s.buffer.history().entries(), ["ls"]);
        s.start_next();
        assert!(!s.is_done());
        assert_eq!(s.buffer.text(), "");
    }

    #[test]
    fn failed_validation_blocks_accept() {
        let validator = |doc: &Document| {
            if doc.text().is_empty() {
                Err(ValidationError::new("empty", 0))
            } else {
                Ok(())
            }
        };
        let buffer = Buffer::default().with_validator(Box::new(validator));
        let mut s = SessionState::new(buffer, EditingMode::Emacs);
        assert!(!s.accept_input());
        assert!(!s.is_done());
        assert!(s.take_bell());
        assert!(!s.take_bell());
    }

    #[test]
    fn abort_policies() {
        let mut s = session("text").with_policies(AbortPolicy::Retry, AbortPolicy::Ignore);
        s.abort();
        assert!(!s.is_done());
        assert_eq!(s.buffer.text(), "");
        s.exit();
        assert!(!s.is_done());
        s.abort_policy = AbortPolicy::Raise;
        s.abort();
        assert_eq!(s.take_result(), Some(Err(SessionError::UserAbort)));
    }

    #[test]
    fn argument_parsing() {
        assert_eq!(parse_arg(None), 1);
        assert_eq!(parse_arg(Some("-")), -1);
        assert_eq!(parse_arg(Some("-3")), -3);
        assert_eq!(parse_arg(Some("42")), 42);
        assert_eq!(parse_arg(Some("99999999")), 1);
        let arg = extend_arg(None, "4");
        assert_eq!(extend_arg(Some(&arg), "2"), "42");
        assert_eq!(extend_arg(Some("-"), "3"), "-3");
    }
}
