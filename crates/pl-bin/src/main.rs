//! promptline entrypoint: read lines with the editor and echo them back.
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use core_actions::{Dispatcher, install_key_overrides};
use core_config::{Config, load_from};
use core_events::{EVENT_CHANNEL_CAP, Event, InputStats};
use core_input::source::{spawn_size_watcher, spawn_stdin_reader};
use core_model::EditorModel;
use core_render::{Output, Renderer, StyledText};
use core_state::{Buffer, CompletionWorker, InMemoryHistory, SessionError, SessionState};
use core_terminal::{CrosstermBackend, CrosstermOutput};
use promptline::demo::{keyword_completer, quotes_balanced};
use promptline::editor::{edit_text, editor_command};
use promptline::logging::{configure_logging, install_panic_hook};
use promptline::settings::context_for;
use promptline::{LoopOptions, Overrides, Prompt, Settings};
use tracing::{error, info, warn};

const SIZE_POLL: Duration = Duration::from_millis(250);
/// Grace period for runtime shutdown; the stdin reader may be parked in a
/// read that never returns.
const SHUTDOWN_GRACE: Duration = Duration::from_millis(100);

/// CLI arguments.
#[derive(Parser, Debug)]
#[command(name = "promptline", version, about = "Line editor REPL")]
struct Args {
    /// Configuration file (overrides discovery of `promptline.toml`).
    #[arg(long = "config")]
    pub config: Option<PathBuf>,
    /// Vi key bindings.
    #[arg(long, conflicts_with = "emacs")]
    pub vi: bool,
    /// Emacs key bindings.
    #[arg(long)]
    pub emacs: bool,
    #[arg(long)]
    pub prompt: Option<String>,
    /// Enter inserts a newline; Escape Enter accepts.
    #[arg(long)]
    pub multiline: bool,
    /// Draw on the alternate screen.
    #[arg(long)]
    pub full_screen: bool,
    /// Capture mouse clicks and wheel.
    #[arg(long)]
    pub mouse: bool,
}

impl Args {
    fn overrides(&self) -> Overrides {
        Overrides {
            vi: self.vi,
            emacs: self.emacs,
            prompt: self.prompt.clone(),
            multiline: self.multiline,
            full_screen: self.full_screen,
            mouse: self.mouse,
        }
    }
}

fn load_config(args: &Args, size: (u16, u16)) -> Config {
    let mut config = match load_from(args.config.clone()) {
        Ok(config) => config,
        Err(err) => {
            warn!(target: "config", %err, "config_load_failed");
            Config::default()
        }
    };
    config.apply_context(context_for(size.0, size.1));
    config
}

fn build_session(settings: &Settings) -> SessionState {
    let buffer = Buffer::new(Box::new(InMemoryHistory::with_max_entries(settings.history_max)))
        .with_completer(Arc::new(keyword_completer))
        .with_validator(Box::new(quotes_balanced))
        .with_multiline(settings.multiline)
        .with_history_search(settings.history_search_prefix)
        .with_undo_depth(settings.undo_depth);
    SessionState::new(buffer, settings.mode).with_policies(settings.abort_policy, settings.exit_policy)
}

fn build_dispatcher(config: &Config) -> Result<Dispatcher> {
    let mut dispatcher = Dispatcher::with_defaults().context("default key bindings")?;
    match install_key_overrides(dispatcher.registry_mut(), config.key_overrides()) {
        Ok(0) => {}
        Ok(installed) => info!(target: "keymap.registry", installed, "key_overrides"),
        // A bad [keys] entry should not keep the REPL from starting.
        Err(err) => warn!(target: "keymap.registry", %err, "key_overrides_failed"),
    }
    Ok(dispatcher)
}

async fn run(args: Args) -> Result<()> {
    let out = CrosstermOutput::stdout();
    let size = out.size();
    let config = load_config(&args, size);
    let settings = Settings::resolve(&config, &args.overrides());
    info!(target: "runtime", mode = ?settings.mode, columns = size.0, rows = size.1, "startup");

    let session = build_session(&settings);
    let dispatcher = build_dispatcher(&config)?;
    let model = EditorModel::new(vec![StyledText::plain(&settings.prompt)], settings.margins);
    let renderer = Renderer::new(settings.full_screen).with_mouse(settings.mouse);
    let command = editor_command();
    let editor: promptline::ExternalEditor = Box::new(move |text| edit_text(&command, text));
    let options = LoopOptions {
        ttimeout: settings.ttimeout,
        key_timeout: settings.key_timeout,
        complete_while_typing: settings.complete_while_typing,
    };

    let mut prompt = Prompt::new(
        session,
        dispatcher,
        model,
        renderer,
        out,
        CrosstermBackend::new(),
        editor,
        options,
    )
    .with_config(config);
    if settings.background_completion {
        prompt = prompt.with_worker(CompletionWorker::spawn(Arc::new(keyword_completer)));
    }

    let (tx, mut rx) = tokio::sync::mpsc::channel::<Event>(EVENT_CHANNEL_CAP);
    let reader = spawn_stdin_reader(tx.clone());
    let watcher = spawn_size_watcher(SIZE_POLL, size, || crossterm::terminal::size().ok(), tx);

    loop {
        match prompt.prompt(&mut rx).await? {
            Ok(line) => println!("{line}"),
            Err(SessionError::UserAbort) => continue,
            Err(SessionError::UserExit) => break,
        }
    }
    watcher.abort();
    reader.abort();

    let render = prompt.renderer().stats();
    let input = InputStats::snapshot();
    info!(
        target: "runtime",
        frames = render.frames,
        commands = render.commands,
        rows_repainted = render.rows_repainted,
        keypresses = input.keypresses,
        paste_sessions = input.paste_sessions,
        paste_bytes = input.paste_bytes,
        send_failures = input.send_failures,
        "shutdown"
    );
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    let _log_guard = configure_logging(Path::new("."))?;
    install_panic_hook();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("promptline-rt")
        .build()
        .context("tokio runtime")?;
    let result = runtime.block_on(run(args));
    runtime.shutdown_timeout(SHUTDOWN_GRACE);
    if let Err(err) = &result {
        error!(target: "runtime", ?err, "fatal");
    }
    result
}
