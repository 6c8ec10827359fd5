//! Configuration loading and parsing.
//!
//! `promptline.toml` is looked up in the working directory first, then under
//! the platform config dir (`dirs::config_dir()/promptline/`). Every section
//! defaults independently, so a file may set a single key. A missing file or
//! one that fails to parse yields the defaults; parse failures are logged.
//!
//! Values that depend on the terminal (the scroll margins) are kept raw and
//! clamped by `Config::apply_context` whenever the viewport changes.

use std::collections::BTreeMap;
use std::{fs, path::PathBuf};

use anyhow::Result;
use serde::Deserialize;
use tracing::{info, warn};

pub const FILE_NAME: &str = "promptline.toml";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigContext {
    pub viewport_columns: u16,
    pub viewport_rows: u16,
    /// Rows taken by toolbars under the input.
    pub status_rows: u16,
}

impl ConfigContext {
    pub fn new(viewport_columns: u16, viewport_rows: u16, status_rows: u16) -> Self {
        Self {
            viewport_columns,
            viewport_rows,
            status_rows,
        }
    }

    pub fn text_rows(&self) -> u16 {
        self.viewport_rows.saturating_sub(self.status_rows)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModeSetting {
    #[default]
    Emacs,
    Vi,
}

/// What Ctrl-C / Ctrl-D on an empty line do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicySetting {
    Ignore,
    Retry,
    #[default]
    Raise,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EditingConfig {
    pub mode: ModeSetting,
    pub multiline: bool,
    pub prompt: String,
}

impl Default for EditingConfig {
    fn default() -> Self {
        Self {
            mode: ModeSetting::Emacs,
            multiline: false,
            prompt: "> ".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Escape-sequence flush timeout in ms.
    pub ttimeoutlen: u32,
    pub timeout: bool,
    /// Key-binding prefix flush timeout in ms.
    pub timeoutlen: u32,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            ttimeoutlen: 500,
            timeout: true,
            timeoutlen: 1000,
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct MarginConfig {
    pub vertical: u16,
    pub horizontal: u16,
}

#[derive(Debug, Deserialize, Default, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ScrollConfig {
    pub margin: MarginConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    pub max_entries: usize,
    /// Up/Down only visit entries starting with the text before the cursor.
    pub search_prefix: bool,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_entries: 1000,
            search_prefix: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CompletionConfig {
    pub background: bool,
    pub while_typing: bool,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            background: true,
            while_typing: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    pub abort: PolicySetting,
    pub exit: PolicySetting,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct UndoConfig {
    pub max_depth: usize,
}

impl Default for UndoConfig {
    fn default() -> Self {
        Self { max_depth: 200 }
    }
}

#[derive(Debug, Deserialize, Default, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ConfigFile {
    pub editing: EditingConfig,
    pub input: InputConfig,
    pub scroll: ScrollConfig,
    pub history: HistoryConfig,
    pub completion: CompletionConfig,
    pub policy: PolicyConfig,
    pub undo: UndoConfig,
    /// Key sequence (`"c-x c-e"`) to named command.
    pub keys: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub path: Option<PathBuf>,
    pub file: ConfigFile,
    pub effective_vertical_margin: u16,
    pub effective_horizontal_margin: u16,
}

/// First existing candidate: `./promptline.toml`, then the platform config
/// dir. Falls back to the local name when neither exists.
pub fn discover() -> PathBuf {
    let local = PathBuf::from(FILE_NAME);
    if local.exists() {
        return local;
    }
    if let Some(dir) = dirs::config_dir() {
        return dir.join("promptline").join(FILE_NAME);
    }
    local
}

pub fn parse(content: &str) -> Result<ConfigFile> {
    Ok(toml::from_str::<ConfigFile>(content)?)
}

pub fn load_from(path: Option<PathBuf>) -> Result<Config> {
    let path = path.unwrap_or_else(discover);
    let Ok(content) = fs::read_to_string(&path) else {
        info!(target: "config", path = %path.display(), "config_missing_using_defaults");
        return Ok(Config::default());
    };
    match parse(&content) {
        Ok(file) => {
            info!(target: "config", path = %path.display(), keys = file.keys.len(), "config_loaded");
            Ok(Config {
                path: Some(path),
                file,
                ..Config::default()
            })
        }
        Err(e) => {
            warn!(target: "config", path = %path.display(), error = %e, "config_parse_failed");
            Ok(Config::default())
        }
    }
}

impl Config {
    /// Clamp the scroll margins to the viewport: at most `(rows - 2) / 2`
    /// vertically and `(columns - 2) / 2` horizontally. Returns the
    /// effective vertical margin.
    pub fn apply_context(&mut self, ctx: ConfigContext) -> u16 {
        let raw = &self.file.scroll.margin;
        let text_rows = ctx.text_rows();
        let vertical = clamp_margin(raw.vertical, text_rows);
        let horizontal = clamp_margin(raw.horizontal, ctx.viewport_columns);

        if vertical != raw.vertical || horizontal != raw.horizontal {
            info!(
                target: "config",
                raw_vertical = raw.vertical,
                vertical,
                raw_horizontal = raw.horizontal,
                horizontal,
                text_rows,
                viewport_rows = ctx.viewport_rows,
                status_rows = ctx.status_rows,
                "scroll_margin_clamped"
            );
        }
        self.effective_vertical_margin = vertical;
        self.effective_horizontal_margin = horizontal;
        vertical
    }

    /// Re-clamp after a resize. `Some(margin)` when the vertical margin
    /// changed.
    pub fn recompute_with_context(&mut self, ctx: ConfigContext) -> Option<u16> {
        let prev = self.effective_vertical_margin;
        let current = self.apply_context(ctx);
        if current != prev { Some(current) } else { None }
    }

    /// `[keys]` entries as borrowed pairs, in key order.
    pub fn key_overrides(&self) -> impl Iterator<Item = (&str, &str)> {
        self.file.keys.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

fn clamp_margin(raw: u16, extent: u16) -> u16 {
    if extent <= 3 {
        return 0;
    }
    raw.min(extent.saturating_sub(2) / 2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;
    use std::sync::{Arc, Mutex, MutexGuard};
    use tracing::Level;
    use tracing::subscriber::with_default;
    use tracing_subscriber::fmt::MakeWriter;

    #[derive(Clone)]
    struct BufferWriter {
        inner: Arc<Mutex<Vec<u8>>>,
    }

    impl BufferWriter {
        fn new() -> (Self, Arc<Mutex<Vec<u8>>>) {
            let buf = Arc::new(Mutex::new(Vec::new()));
            (Self { inner: buf.clone() }, buf)
        }
    }

    struct LockedWriter<'a> {
        guard: MutexGuard<'a, Vec<u8>>,
    }

    impl Write for LockedWriter<'_> {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.guard.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for BufferWriter {
        type Writer = LockedWriter<'a>;

        fn make_writer(&'a self) -> Self::Writer {
            LockedWriter {
                guard: self.inner.lock().expect("log buffer poisoned"),
            }
        }
    }

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(tmp.path(), content).unwrap();
        tmp
    }

    #[test]
    fn defaults_when_file_missing() {
        let cfg = load_from(Some(PathBuf::from("__nonexistent_hopefully__.toml"))).unwrap();
        assert_eq!(cfg.file, ConfigFile::default());
        assert!(cfg.path.is_none());
        assert_eq!(cfg.file.editing.mode, ModeSetting::Emacs);
        assert_eq!(cfg.file.editing.prompt, "> ");
        assert_eq!(cfg.file.input.ttimeoutlen, 500);
        assert!(cfg.file.input.timeout);
        assert_eq!(cfg.file.input.timeoutlen, 1000);
        assert_eq!(cfg.file.undo.max_depth, 200);
        assert_eq!(cfg.file.policy.abort, PolicySetting::Raise);
    }

    #[test]
    fn parses_every_section() {
        let tmp = write_config(
            r#"
[editing]
mode = "vi"
multiline = true
prompt = "$ "

[input]
ttimeoutlen = 50
timeout = false
timeoutlen = 250

[scroll.margin]
vertical = 3
horizontal = 2

[history]
max_entries = 10
search_prefix = true

[completion]
background = false
while_typing = true

[policy]
abort = "retry"
exit = "ignore"

[undo]
max_depth = 5

[keys]
"c-t" = "transpose-chars"
"escape f" = "forward-word"
"#,
        );
        let cfg = load_from(Some(tmp.path().to_path_buf())).unwrap();
        let f = &cfg.file;
        assert_eq!(f.editing.mode, ModeSetting::Vi);
        assert!(f.editing.multiline);
        assert_eq!(f.editing.prompt, "$ ");
        assert_eq!(f.input, InputConfig { ttimeoutlen: 50, timeout: false, timeoutlen: 250 });
        assert_eq!(f.scroll.margin, MarginConfig { vertical: 3, horizontal: 2 });
        assert_eq!(f.history.max_entries, 10);
        assert!(f.history.search_prefix);
        assert!(!f.completion.background);
        assert!(f.completion.while_typing);
        assert_eq!(f.policy.abort, PolicySetting::Retry);
        assert_eq!(f.policy.exit, PolicySetting::Ignore);
        assert_eq!(f.undo.max_depth, 5);
        assert_eq!(
            cfg.key_overrides().collect::<Vec<_>>(),
            vec![("c-t", "transpose-chars"), ("escape f", "forward-word")]
        );
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let tmp = write_config("[input]\ntimeoutlen = 300\n");
        let cfg = load_from(Some(tmp.path().to_path_buf())).unwrap();
        assert_eq!(cfg.file.input.timeoutlen, 300);
        assert_eq!(cfg.file.input.ttimeoutlen, 500);
        assert_eq!(cfg.file.editing, EditingConfig::default());
    }

    #[test]
    fn unparsable_file_falls_back_to_defaults() {
        let tmp = write_config("[editing]\nmode = \"nano\"\n");
        let cfg = load_from(Some(tmp.path().to_path_buf())).unwrap();
        assert_eq!(cfg.file, ConfigFile::default());
        assert!(parse("[editing]\nmode = \"nano\"\n").is_err());
    }

    #[test]
    fn clamps_margins_to_viewport() {
        let tmp = write_config("[scroll.margin]\nvertical = 50\nhorizontal = 50\n");
        let mut cfg = load_from(Some(tmp.path().to_path_buf())).unwrap();
        // (20 - 2) / 2 = 9; (12 - 2) / 2 = 5
        assert_eq!(cfg.apply_context(ConfigContext::new(12, 20, 0)), 9);
        assert_eq!(cfg.effective_horizontal_margin, 5);
        assert_eq!(cfg.apply_context(ConfigContext::new(80, 3, 0)), 0);
    }

    #[test]
    fn recompute_reports_changes_only() {
        let tmp = write_config("[scroll.margin]\nvertical = 10\n");
        let mut cfg = load_from(Some(tmp.path().to_path_buf())).unwrap();
        cfg.apply_context(ConfigContext::new(80, 50, 0));
        assert_eq!(cfg.effective_vertical_margin, 10);
        assert_eq!(cfg.recompute_with_context(ConfigContext::new(80, 10, 0)), Some(4));
        assert_eq!(cfg.recompute_with_context(ConfigContext::new(80, 11, 0)), None);
    }

    #[test]
    fn clamp_logging_uses_config_target() {
        let tmp = write_config("[scroll.margin]\nvertical = 8\n");
        let mut cfg = load_from(Some(tmp.path().to_path_buf())).unwrap();
        let (writer, buffer) = BufferWriter::new();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(Level::INFO)
            .with_target(true)
            .with_ansi(false)
            .without_time()
            .with_writer(writer)
            .finish();

        with_default(subscriber, || {
            // text rows 6 -> max (6 - 2) / 2 = 2
            cfg.apply_context(ConfigContext::new(80, 7, 1));
        });

        let log_output = String::from_utf8(buffer.lock().unwrap().clone()).unwrap();
        assert!(log_output.contains("INFO config:"));
        assert!(log_output.contains("scroll_margin_clamped"));
        assert_eq!(cfg.effective_vertical_margin, 2);
    }
}
