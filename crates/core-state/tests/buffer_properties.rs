use std::sync::Arc;

use core_state::{Buffer, CompleteEvent, Completer, Completion};
use core_text::Document;
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Edit {
    Insert(String),
    Backspace(usize),
    Delete(usize),
    Left(usize),
}

fn edit() -> impl Strategy<Value = Edit> {
    prop_oneof![
        "[a-z \n]{1,4}".prop_map(Edit::Insert),
        (1usize..4).prop_map(Edit::Backspace),
        (1usize..4).prop_map(Edit::Delete),
        (1usize..4).prop_map(Edit::Left),
    ]
}

fn apply(buffer: &mut Buffer, edit: &Edit) {
    match edit {
        Edit::Insert(text) => buffer.insert_text(text, false, true).map(|_| ()),
        Edit::Backspace(n) => buffer.delete_before_cursor(*n).map(|_| ()),
        Edit::Delete(n) => buffer.delete(*n).map(|_| ()),
        Edit::Left(n) => {
            buffer.cursor_left(*n);
            Ok(())
        }
    }
    .expect("buffer is writable");
}

fn words() -> Arc<dyn Completer> {
    Arc::new(|doc: &Document, _: &CompleteEvent| {
        let word = doc.get_word_before_cursor(false).to_string();
        ["alpha", "alps", "beta", "bet", "gamma"]
            .iter()
            .filter(|w| w.starts_with(word.as_str()))
            .map(|w| Completion::new(*w, -(word.chars().count() as isize)))
            .collect::<Vec<_>>()
    })
}

proptest! {
    #[test]
    fn undo_returns_to_first_snapshot(initial in "[a-z]{0,6}", edits in prop::collection::vec(edit(), 0..20)) {
        let mut buffer = Buffer::default();
        buffer.insert_text(&initial, false, true).unwrap();
        for e in &edits {
            buffer.save_to_undo_stack(true);
            apply(&mut buffer, e);
        }
        let mut steps = 0;
        while buffer.undo().unwrap() {
            steps += 1;
            prop_assert!(steps <= edits.len());
        }
        prop_assert_eq!(buffer.text(), initial.as_str());
    }

    #[test]
    fn complete_next_then_previous_restores(prefix in "(al|be|ga|x)?", tail in "[ a-z]{0,3}") {
        let mut buffer = Buffer::default().with_completer(words());
        buffer.insert_text(&format!("{tail}{prefix}"), false, true).unwrap();
        let before = buffer.document().clone();
        buffer.complete_next(1, false).unwrap();
        buffer.complete_previous(1, false).unwrap();
        prop_assert_eq!(buffer.text(), before.text());
        prop_assert_eq!(buffer.cursor_position(), before.cursor_position());
    }
}
