#![allow(dead_code)]

use std::sync::Arc;

use core_actions::Dispatcher;
use core_input::KeyParser;
use core_state::{Buffer, Completer, EditingMode, InputMode, SessionError, SessionState};
use core_text::Document;

/// A prompt session driven by raw terminal bytes.
pub struct Harness {
    pub state: SessionState,
    pub dispatcher: Dispatcher,
    parser: KeyParser,
}

impl Harness {
    pub fn new(mode: EditingMode) -> Self {
        Self::with_buffer(Buffer::default(), mode)
    }

    pub fn with_buffer(buffer: Buffer, mode: EditingMode) -> Self {
        Self {
            state: SessionState::new(buffer, mode),
            dispatcher: Dispatcher::with_defaults().expect("default bindings"),
            parser: KeyParser::new(),
        }
    }

    pub fn with_text(mut self, text: &str) -> Self {
        self.state
            .buffer
            .set_document(Document::at_end(text), false)
            .expect("writable buffer");
        self
    }

    pub fn with_completer(mode: EditingMode, completer: Arc<dyn Completer>) -> Self {
        Self::with_buffer(Buffer::default().with_completer(completer), mode)
    }

    pub fn read_only(mut self) -> Self {
        self.state.buffer.set_read_only(true);
        self
    }

    pub fn navigation(mut self) -> Self {
        self.state.vi.set_input_mode(InputMode::Navigation);
        self
    }

    /// Feed one read's worth of bytes; ambiguous prefixes stay pending.
    pub fn feed_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        let keys = self.parser.feed(bytes);
        self.dispatcher.feed_all(keys, &mut self.state);
        self
    }

    /// Feed bytes as if typed, then resolve everything held back.
    pub fn type_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.feed_bytes(bytes);
        let keys = self.parser.flush();
        self.dispatcher.feed_all(keys, &mut self.state);
        self.dispatcher.flush(&mut self.state);
        self
    }

    pub fn type_str(&mut self, s: &str) -> &mut Self {
        self.type_bytes(s.as_bytes())
    }

    pub fn text(&self) -> &str {
        self.state.buffer.text()
    }

    pub fn cursor(&self) -> usize {
        self.state.buffer.cursor_position()
    }

    pub fn result(&self) -> Option<&Result<String, SessionError>> {
        self.state.result()
    }

    pub fn accepted(&self) -> Option<&str> {
        match self.state.result() {
            Some(Ok(text)) => Some(text.as_str()),
            _ => None,
        }
    }
}
