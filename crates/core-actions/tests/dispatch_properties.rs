mod common;

use std::io::Write;
use std::sync::{Arc, Mutex};

use common::Harness;
use core_state::EditingMode;
use proptest::prelude::*;

proptest! {
    #[test]
    fn printable_text_is_accepted_verbatim(text in "[a-zA-Z0-9 .,_-]{0,24}") {
        let mut h = Harness::new(EditingMode::Emacs);
        h.type_str(&text);
        h.type_str("\r");
        prop_assert_eq!(h.accepted(), Some(text.as_str()));
    }

    #[test]
    fn vi_insert_then_escape_keeps_text(text in "[a-z ]{1,16}") {
        let mut h = Harness::new(EditingMode::Vi);
        h.type_str(&text);
        h.type_str("\x1b\r");
        prop_assert_eq!(h.accepted(), Some(text.as_str()));
    }
}

#[derive(Clone, Default)]
struct Captured(Arc<Mutex<Vec<u8>>>);

impl Write for Captured {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[test]
fn read_only_edit_is_logged_not_raised() {
    let captured = Captured::default();
    let writer = captured.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();

    let mut h = Harness::new(EditingMode::Emacs).with_text("fixed").read_only();
    tracing::subscriber::with_default(subscriber, || {
        h.type_str("x");
    });

    assert_eq!(h.text(), "fixed");
    assert!(h.state.take_bell());
    let logs = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
    assert!(logs.contains("actions.dispatch"), "logs: {logs}");
    assert!(logs.contains("read_only_refused"), "logs: {logs}");
}
