//! The prompt event loop.
//!
//! One task owns all editor state. Raw input, resize notifications and
//! ticks arrive on a tokio channel; background completion results come from
//! the worker task. Each wakeup parses bytes into keys, dispatches them,
//! serves handler requests (clear screen, external editor, deferred
//! completion) and renders a frame.

use std::future::pending;
use std::time::Duration;

use anyhow::Result;
use core_actions::Dispatcher;
use core_config::Config;
use core_events::{Event, Key, KeyPress, MouseEvent};
use core_input::KeyParser;
use core_model::{EditorModel, ModalStack};
use core_render::{Command, Output, Renderer, ScrollMargins};
use core_state::{
    AsyncApply, CompleteEvent, CompletionResult, CompletionSelect, CompletionWorker, InputMode, SessionError,
    SessionRequest, SessionState,
};
use core_terminal::{TerminalBackend, run_in_terminal};
use tokio::sync::mpsc::Receiver;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, info, trace, warn};

use crate::settings::context_for;

/// How long to wait for a cursor position report before giving up on it.
pub const CPR_TIMEOUT: Duration = Duration::from_secs(2);

/// Runs `$EDITOR` (or a stand-in) on the buffer text.
pub type ExternalEditor = Box<dyn FnMut(&str) -> Result<String>>;

#[derive(Debug, Clone, Copy)]
pub struct LoopOptions {
    pub ttimeout: Duration,
    pub key_timeout: Option<Duration>,
    pub complete_while_typing: bool,
}

impl Default for LoopOptions {
    fn default() -> Self {
        Self {
            ttimeout: Duration::from_millis(500),
            key_timeout: Some(Duration::from_millis(1000)),
            complete_while_typing: false,
        }
    }
}

#[derive(Default)]
struct Deadlines {
    parser: Option<Instant>,
    keys: Option<Instant>,
    cpr: Option<Instant>,
}

impl Deadlines {
    fn next(&self) -> Option<Instant> {
        [self.parser, self.keys, self.cpr].into_iter().flatten().min()
    }
}

/// What woke the loop up.
enum Wake {
    Event(Option<Event>),
    Completion(Option<CompletionResult>),
    Timer,
}

async fn until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => pending().await,
    }
}

async fn next_completion(worker: Option<&mut CompletionWorker>) -> Option<CompletionResult> {
    match worker {
        Some(worker) => worker.next_result().await,
        None => pending().await,
    }
}

pub struct Prompt<O: Output, B: TerminalBackend> {
    session: SessionState,
    dispatcher: Dispatcher,
    parser: KeyParser,
    model: EditorModel,
    renderer: Renderer,
    out: O,
    backend: B,
    worker: Option<CompletionWorker>,
    modals: ModalStack<SessionState, Option<String>>,
    editor: ExternalEditor,
    options: LoopOptions,
    deadlines: Deadlines,
    config: Option<Config>,
    closed: bool,
}

impl<O: Output, B: TerminalBackend> Prompt<O, B> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        session: SessionState,
        dispatcher: Dispatcher,
        model: EditorModel,
        renderer: Renderer,
        out: O,
        backend: B,
        editor: ExternalEditor,
        options: LoopOptions,
    ) -> Self {
        Self {
            session,
            dispatcher,
            parser: KeyParser::new(),
            model,
            renderer,
            out,
            backend,
            worker: None,
            modals: ModalStack::new(),
            editor,
            options,
            deadlines: Deadlines::default(),
            config: None,
            closed: false,
        }
    }

    /// Compute every completion (Tab as well as while typing) on `worker`
    /// instead of the loop task.
    pub fn with_worker(mut self, worker: CompletionWorker) -> Self {
        self.session.buffer.set_background_completion(true);
        self.worker = Some(worker);
        self
    }

    /// Config whose scroll margins follow the terminal size on resize.
    pub fn with_config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut SessionState {
        &mut self.session
    }

    pub fn output(&self) -> &O {
        &self.out
    }

    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }

    /// Read one input. Typeahead left over from the previous prompt is
    /// processed first.
    pub async fn prompt(&mut self, events: &mut Receiver<Event>) -> Result<Result<String, SessionError>> {
        self.session.start_next();
        self.backend.enter()?;
        self.renderer.request_cursor_position(&mut self.out)?;
        if self.renderer.waiting_for_cpr() {
            self.deadlines.cpr = Some(Instant::now() + CPR_TIMEOUT);
        }
        self.dispatcher.process(&mut self.session);
        self.after_dispatch()?;

        while !self.session.is_done() {
            if self.closed {
                self.finish_input();
                if !self.session.is_done() {
                    info!(target: "runtime", "input_closed");
                    self.render_done()?;
                    return Ok(Err(SessionError::UserExit));
                }
                break;
            }
            self.render()?;
            let deadline = self.deadlines.next();
            // Queued input wins over timers so typeahead is never split by a flush.
            let wake = tokio::select! {
                biased;
                event = events.recv() => Wake::Event(event),
                result = next_completion(self.worker.as_mut()) => Wake::Completion(result),
                () = until(deadline) => Wake::Timer,
            };
            match wake {
                Wake::Event(Some(event)) => self.handle_event(event)?,
                Wake::Event(None) => self.closed = true,
                Wake::Completion(Some(result)) => self.apply_completion(result),
                Wake::Completion(None) => {
                    warn!(target: "runtime", "completion_worker_gone");
                    self.worker = None;
                    self.session.buffer.set_background_completion(false);
                }
                Wake::Timer => self.expire(Instant::now())?,
            }
        }

        self.render()?;
        self.render_done()?;
        let result = self.session.take_result().unwrap_or(Err(SessionError::UserExit));
        debug!(target: "runtime", ok = result.is_ok(), "prompt_done");
        Ok(result)
    }

    fn render_done(&mut self) -> Result<()> {
        if let Some(worker) = self.worker.as_mut() {
            worker.cancel();
        }
        self.renderer.render_done(&mut self.out)?;
        self.backend.leave()
    }

    pub fn handle_event(&mut self, event: Event) -> Result<()> {
        match event {
            Event::Input(bytes) => {
                let keys = self.parser.feed(&bytes);
                self.handle_keys(keys)?;
            }
            Event::Resize(columns, rows) => self.resize(columns, rows)?,
            Event::Tick => self.expire(Instant::now())?,
            Event::Shutdown => self.closed = true,
        }
        Ok(())
    }

    fn handle_keys(&mut self, keys: Vec<KeyPress>) -> Result<()> {
        let before = self.session.buffer.text().to_string();
        for press in keys {
            match press.key {
                Key::CprResponse => self.cursor_position_report(&press.data),
                Key::Mouse => self.mouse(&press.data),
                Key::ScrollUp => self.session.buffer.cursor_up(1),
                Key::ScrollDown => self.session.buffer.cursor_down(1),
                Key::Ignore => {}
                _ => self.dispatcher.feed(press, &mut self.session),
            }
        }
        self.after_dispatch()?;
        self.complete_while_typing(&before);
        Ok(())
    }

    fn after_dispatch(&mut self) -> Result<()> {
        let now = Instant::now();
        self.deadlines.parser = self.parser.has_pending().then(|| now + self.options.ttimeout);
        self.deadlines.keys = match self.options.key_timeout {
            Some(timeout) if self.dispatcher.has_pending() && !self.session.is_done() => Some(now + timeout),
            _ => None,
        };
        for request in self.session.take_requests() {
            match request {
                SessionRequest::ClearScreen => self.renderer.clear(&mut self.out)?,
                SessionRequest::EditExternally => self.edit_externally()?,
            }
        }
        if let Some(request) = self.session.buffer.take_completion_request()
            && let Some(worker) = self.worker.as_mut()
        {
            let generation = worker.request(request);
            trace!(target: "runtime", generation, "completion_requested");
        }
        if self.session.take_bell() {
            self.out.write(Command::Bell);
        }
        Ok(())
    }

    fn expire(&mut self, now: Instant) -> Result<()> {
        if self.deadlines.cpr.is_some_and(|d| d <= now) {
            self.deadlines.cpr = None;
            if self.renderer.waiting_for_cpr() {
                self.renderer.cpr_not_supported();
            }
        }
        let parser_due = self.deadlines.parser.is_some_and(|d| d <= now);
        let keys_due = self.deadlines.keys.is_some_and(|d| d <= now);
        if parser_due {
            trace!(target: "runtime", "parser_timeout");
            let keys = self.parser.flush();
            self.handle_keys(keys)?;
        }
        if keys_due && !self.session.is_done() {
            trace!(target: "runtime", "key_timeout");
            let before = self.session.buffer.text().to_string();
            self.dispatcher.flush(&mut self.session);
            self.after_dispatch()?;
            self.complete_while_typing(&before);
        }
        Ok(())
    }

    /// Input ended: resolve everything still buffered.
    fn finish_input(&mut self) {
        let keys = self.parser.flush();
        for press in keys {
            self.dispatcher.feed(press, &mut self.session);
        }
        self.dispatcher.flush(&mut self.session);
        self.deadlines = Deadlines::default();
    }

    fn cursor_position_report(&mut self, data: &str) {
        let row = data
            .strip_prefix("\x1b[")
            .and_then(|s| s.strip_suffix('R'))
            .and_then(|s| s.split(';').next())
            .and_then(|r| r.parse::<u16>().ok());
        match row {
            Some(row) => {
                let (_, rows) = self.out.size();
                self.renderer.report_cursor_position(row, rows);
                self.deadlines.cpr = None;
            }
            None => debug!(target: "runtime", data = %data.escape_debug(), "cpr_malformed"),
        }
    }

    fn mouse(&mut self, data: &str) {
        let Some(event) = MouseEvent::parse(data) else {
            debug!(target: "runtime", "mouse_malformed");
            return;
        };
        let (_, rows) = self.out.size();
        let Some(rows_above) = self.renderer.rows_above_layout(rows) else {
            trace!(target: "runtime", "mouse_before_cpr");
            return;
        };
        self.model.handle_mouse(&mut self.session, event, rows_above);
    }

    fn resize(&mut self, columns: u16, rows: u16) -> Result<()> {
        debug!(target: "runtime", columns, rows, "resize");
        self.out.set_size(columns, rows);
        if let Some(config) = self.config.as_mut()
            && config.recompute_with_context(context_for(columns, rows)).is_some()
        {
            self.model.set_scroll_margins(ScrollMargins::new(
                usize::from(config.effective_vertical_margin),
                usize::from(config.effective_horizontal_margin),
            ));
        }
        self.renderer.erase(&mut self.out)?;
        self.renderer.request_cursor_position(&mut self.out)?;
        if self.renderer.waiting_for_cpr() {
            self.deadlines.cpr = Some(Instant::now() + CPR_TIMEOUT);
        }
        Ok(())
    }

    fn edit_externally(&mut self) -> Result<()> {
        let focus = self.model.layout().focus();
        self.modals.push(focus, |session: &mut SessionState, edited: Option<String>| {
            if let Some(text) = edited
                && session.buffer.set_text(text).is_ok()
            {
                session.accept_input();
            }
        });
        let text = self.session.buffer.text().to_string();
        let editor = &mut self.editor;
        let edited = run_in_terminal(&mut self.backend, &mut self.renderer, &mut self.out, || editor(&text))?;
        let edited = match edited {
            Ok(text) => Some(text),
            Err(err) => {
                warn!(target: "runtime", %err, "external_editor_failed");
                self.session.ring_bell();
                None
            }
        };
        if let Some(Some(node)) = self.modals.complete(&mut self.session, edited) {
            self.model.focus(node);
        }
        Ok(())
    }

    fn complete_while_typing(&mut self, before: &str) {
        if !self.options.complete_while_typing || self.session.is_done() {
            return;
        }
        if !matches!(self.session.vi_input_mode(), None | Some(InputMode::Insert)) {
            return;
        }
        let buffer = &self.session.buffer;
        if buffer.text() == before || buffer.selection().is_some() || buffer.isearch().is_some() {
            return;
        }
        if buffer.complete_state().is_some_and(|s| s.complete_index.is_some()) {
            return;
        }
        match self.worker.as_mut() {
            Some(worker) => {
                if let Some(request) = self.session.buffer.completion_request() {
                    worker.request(request);
                }
            }
            None => {
                let _ = self
                    .session
                    .buffer
                    .start_completion(CompletionSelect::None, false, CompleteEvent::typed());
            }
        }
    }

    fn apply_completion(&mut self, result: CompletionResult) {
        let Some(worker) = self.worker.as_mut() else {
            return;
        };
        if !worker.is_current(&result) || self.session.is_done() {
            trace!(target: "state.completion", generation = result.generation, "result_superseded");
            return;
        }
        let request = result.request.clone();
        match self.session.buffer.try_apply_async_result(result) {
            Ok(AsyncApply::Applied) => {}
            Ok(AsyncApply::Stale) => {
                worker.request(request.retarget(self.session.buffer.document().clone()));
            }
            Err(err) => debug!(target: "state.completion", %err, "result_rejected"),
        }
    }

    fn render(&mut self) -> Result<()> {
        let (columns, rows) = self.out.size();
        let min = self.renderer.min_available_height(rows);
        let screen = self
            .model
            .render(&self.session, usize::from(columns.max(1)), usize::from(rows.max(1)), min);
        self.renderer.render(&mut self.out, &screen)
    }
}
