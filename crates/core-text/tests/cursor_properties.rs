use core_text::Document;
use proptest::prelude::*;

fn text_strategy() -> impl Strategy<Value = String> {
    proptest::collection::vec(
        prop_oneof![
            Just('a'),
            Just('Z'),
            Just(' '),
            Just('\n'),
            Just('é'),
            Just('中'),
            Just('_'),
            Just('.'),
        ],
        0..40,
    )
    .prop_map(|chars| chars.into_iter().collect())
}

proptest! {
    // Moving left then right by the same count lands back where we started,
    // unless the left move was clamped at the start of the line.
    #[test]
    fn left_then_right_round_trips(text in text_strategy(), pos in 0usize..41, count in 0usize..10) {
        let doc = Document::new(text, pos);
        let start = doc.cursor_position();
        let left = doc.get_cursor_left_position(count);
        let moved = doc.with_cursor(doc.offset_cursor(left));
        let right = moved.get_cursor_right_position(left.unsigned_abs());
        let back = moved.offset_cursor(right);
        prop_assert_eq!(back, start);
        if (left.unsigned_abs()) < count {
            prop_assert_eq!(moved.cursor_position_col(), 0);
        }
    }

    #[test]
    fn right_then_left_round_trips(text in text_strategy(), pos in 0usize..41, count in 0usize..10) {
        let doc = Document::new(text, pos);
        let start = doc.cursor_position();
        let right = doc.get_cursor_right_position(count);
        let moved = doc.with_cursor(doc.offset_cursor(right));
        let left = moved.get_cursor_left_position(right as usize);
        prop_assert_eq!(moved.offset_cursor(left), start);
        if (right as usize) < count {
            prop_assert!(moved.is_cursor_at_the_end_of_line());
        }
    }

    #[test]
    fn index_position_translation_is_consistent(text in text_strategy(), pos in 0usize..41) {
        let doc = Document::new(text, pos);
        let (row, col) = doc.translate_index_to_position(doc.cursor_position());
        prop_assert_eq!(doc.translate_row_col_to_index(row, col), doc.cursor_position());
    }
}
