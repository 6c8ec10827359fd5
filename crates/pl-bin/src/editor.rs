//! Editing the input in an external editor.

use std::process::Command;

use anyhow::{Context, Result, bail};
use std::io::Write;
use tracing::{debug, info};

/// `$VISUAL`, then `$EDITOR`, then `vi`.
pub fn editor_command() -> String {
    ["VISUAL", "EDITOR"]
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .find(|v| !v.trim().is_empty())
        .unwrap_or_else(|| "vi".to_string())
}

/// Write `text` to a temp file, run `command` on it and return the edited
/// text without its trailing newline. `command` may carry arguments
/// (`"code --wait"`); the file path is appended.
pub fn edit_text(command: &str, text: &str) -> Result<String> {
    let mut file = tempfile::Builder::new()
        .prefix("promptline-")
        .suffix(".txt")
        .tempfile()
        .context("creating temp file")?;
    file.write_all(text.as_bytes())?;
    file.flush()?;

    let mut parts = command.split_whitespace();
    let Some(program) = parts.next() else {
        bail!("empty editor command");
    };
    info!(target: "runtime", program, "external_editor");
    let status = Command::new(program)
        .args(parts)
        .arg(file.path())
        .status()
        .with_context(|| format!("running {program}"))?;
    if !status.success() {
        bail!("{program} exited with {status}");
    }

    let edited = std::fs::read_to_string(file.path())?;
    debug!(target: "runtime", len = edited.len(), "external_editor_done");
    Ok(edited.strip_suffix('\n').unwrap_or(&edited).to_string())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn edited_text_is_read_back() {
        let out = edit_text("sed -i s/hello/bye/", "hello world").unwrap();
        assert_eq!(out, "bye world");
    }

    #[test]
    fn untouched_file_keeps_text() {
        assert_eq!(edit_text("true", "same").unwrap(), "same");
    }

    #[test]
    fn failing_editor_is_an_error() {
        assert!(edit_text("false", "x").is_err());
        assert!(edit_text("   ", "x").is_err());
    }
}
