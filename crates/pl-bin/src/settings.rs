//! Runtime settings: the loaded config with command-line overrides applied.

use std::time::Duration;

use core_config::{Config, ConfigContext, ModeSetting, PolicySetting};
use core_render::ScrollMargins;
use core_state::{AbortPolicy, EditingMode};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub mode: EditingMode,
    pub prompt: String,
    pub multiline: bool,
    /// Escape-sequence flush delay for the key parser.
    pub ttimeout: Duration,
    /// Prefix flush delay for the dispatcher; `None` waits forever.
    pub key_timeout: Option<Duration>,
    pub margins: ScrollMargins,
    pub history_max: usize,
    pub history_search_prefix: bool,
    pub background_completion: bool,
    pub complete_while_typing: bool,
    pub abort_policy: AbortPolicy,
    pub exit_policy: AbortPolicy,
    pub undo_depth: usize,
    pub full_screen: bool,
    pub mouse: bool,
}

/// Command-line switches that override the config file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub vi: bool,
    pub emacs: bool,
    pub prompt: Option<String>,
    pub multiline: bool,
    pub full_screen: bool,
    pub mouse: bool,
}

pub fn editing_mode(mode: ModeSetting) -> EditingMode {
    match mode {
        ModeSetting::Emacs => EditingMode::Emacs,
        ModeSetting::Vi => EditingMode::Vi,
    }
}

pub fn policy(setting: PolicySetting) -> AbortPolicy {
    match setting {
        PolicySetting::Ignore => AbortPolicy::Ignore,
        PolicySetting::Retry => AbortPolicy::Retry,
        PolicySetting::Raise => AbortPolicy::Raise,
    }
}

impl Settings {
    /// `config` must already have `apply_context` run so the margins are
    /// clamped to the terminal.
    pub fn resolve(config: &Config, overrides: &Overrides) -> Self {
        let f = &config.file;
        let mode = if overrides.vi {
            EditingMode::Vi
        } else if overrides.emacs {
            EditingMode::Emacs
        } else {
            editing_mode(f.editing.mode)
        };
        Self {
            mode,
            prompt: overrides.prompt.clone().unwrap_or_else(|| f.editing.prompt.clone()),
            multiline: overrides.multiline || f.editing.multiline,
            ttimeout: Duration::from_millis(u64::from(f.input.ttimeoutlen)),
            key_timeout: f
                .input
                .timeout
                .then(|| Duration::from_millis(u64::from(f.input.timeoutlen))),
            margins: ScrollMargins::new(
                usize::from(config.effective_vertical_margin),
                usize::from(config.effective_horizontal_margin),
            ),
            history_max: f.history.max_entries,
            history_search_prefix: f.history.search_prefix,
            background_completion: f.completion.background,
            complete_while_typing: f.completion.while_typing,
            abort_policy: policy(f.policy.abort),
            exit_policy: policy(f.policy.exit),
            undo_depth: f.undo.max_depth,
            full_screen: overrides.full_screen,
            mouse: overrides.mouse,
        }
    }
}

/// Rows the toolbar may take under the input.
pub const STATUS_ROWS: u16 = 1;

pub fn context_for(columns: u16, rows: u16) -> ConfigContext {
    ConfigContext::new(columns, rows, STATUS_ROWS)
}
