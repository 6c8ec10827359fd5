//! Terminal input decoding: raw bytes to logical key presses.
//!
//! `KeyParser` is synchronous and owns no I/O; `source` provides the tokio
//! tasks that feed raw bytes and resize notifications into the runtime
//! channel.

mod ansi;
mod parser;
pub mod source;

pub use parser::KeyParser;

/// Log a completed paste without its content.
#[inline]
pub(crate) fn log_paste_flush(content: &str) {
    tracing::debug!(
        target: "input.paste",
        paste_len = content.len(),
        lines = content.lines().count(),
        "end"
    );
}
