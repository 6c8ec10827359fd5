use core_text::Document;
use thiserror::Error;

/// Rejection raised by a `Validator`; the buffer keeps it until the next edit.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ValidationError {
    pub message: String,
    /// Offset the cursor is moved to when validation fails.
    pub cursor_position: usize,
}

impl ValidationError {
    pub fn new(message: impl Into<String>, cursor_position: usize) -> Self {
        Self {
            message: message.into(),
            cursor_position,
        }
    }
}

pub trait Validator {
    fn validate(&self, document: &Document) -> Result<(), ValidationError>;
}

impl<F> Validator for F
where
    F: Fn(&Document) -> Result<(), ValidationError>,
{
    fn validate(&self, document: &Document) -> Result<(), ValidationError> {
        self(document)
    }
}
