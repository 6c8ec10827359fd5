//! Completer and validator used by the demo REPL.

use core_state::{CompleteEvent, Completion, ValidationError};
use core_text::Document;

const WORDS: &[(&str, &str)] = &[
    ("select", "keyword"),
    ("from", "keyword"),
    ("where", "keyword"),
    ("group", "keyword"),
    ("order", "keyword"),
    ("insert", "keyword"),
    ("update", "keyword"),
    ("delete", "keyword"),
    ("count", "function"),
    ("coalesce", "function"),
    ("lower", "function"),
    ("upper", "function"),
];

/// Keywords starting with the word before the cursor. Typing only triggers
/// a menu once two characters are in.
pub fn keyword_completer(document: &Document, event: &CompleteEvent) -> Vec<Completion> {
    let word = document.get_word_before_cursor(false);
    if event.text_inserted && word.chars().count() < 2 {
        return Vec::new();
    }
    let lower = word.to_lowercase();
    let start = -(word.chars().count() as isize);
    WORDS
        .iter()
        .filter(|(w, _)| w.starts_with(&lower) && *w != lower)
        .map(|(w, meta)| {
            let mut c = Completion::new(*w, start);
            c.display_meta = Some((*meta).to_string());
            c
        })
        .collect()
}

/// Rejects input with an unterminated quote, pointing at the opening one.
pub fn quotes_balanced(document: &Document) -> Result<(), ValidationError> {
    let mut open: Option<(char, usize)> = None;
    for (i, c) in document.text().chars().enumerate() {
        match (open, c) {
            (None, '\'' | '"') => open = Some((c, i)),
            (Some((q, _)), c) if c == q => open = None,
            _ => {}
        }
    }
    match open {
        Some((q, at)) => Err(ValidationError::new(format!("unterminated {q} quote"), at)),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn texts(doc: &Document, event: CompleteEvent) -> Vec<String> {
        keyword_completer(doc, &event).into_iter().map(|c| c.text).collect()
    }

    #[test]
    fn completes_word_before_cursor() {
        let doc = Document::at_end("sel");
        assert_eq!(texts(&doc, CompleteEvent::requested()), vec!["select"]);
        let doc = Document::at_end("select co");
        assert_eq!(texts(&doc, CompleteEvent::requested()), vec!["count", "coalesce"]);
        let c = keyword_completer(&doc, &CompleteEvent::requested());
        assert_eq!(c[0].start_position, -2);
        assert_eq!(c[0].display_meta.as_deref(), Some("function"));
    }

    #[test]
    fn typing_waits_for_two_chars() {
        let doc = Document::at_end("s");
        assert!(texts(&doc, CompleteEvent::typed()).is_empty());
        assert_eq!(texts(&doc, CompleteEvent::requested()), vec!["select"]);
    }

    #[test]
    fn validator_points_at_open_quote() {
        assert!(quotes_balanced(&Document::at_end("say 'hi'")).is_ok());
        let err = quotes_balanced(&Document::at_end("say \"hi")).unwrap_err();
        assert_eq!(err.cursor_position, 4);
        assert_eq!(err.message, "unterminated \" quote");
    }
}
