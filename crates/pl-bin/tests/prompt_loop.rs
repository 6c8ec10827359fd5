//! The event loop driven by queued events, a recorded output and a fake
//! terminal backend.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use core_actions::Dispatcher;
use core_events::Event;
use core_model::EditorModel;
use core_render::{Command, Output, Renderer, VecOutput};
use core_state::{AbortPolicy, Buffer, CompletionWorker, EditingMode, InMemoryHistory, SessionError, SessionState};
use core_terminal::TerminalBackend;
use tokio::sync::mpsc::{Receiver, channel};
use pretty_assertions::assert_eq;
use promptline::demo::{keyword_completer, quotes_balanced};
use promptline::{ExternalEditor, LoopOptions, Prompt};

type Log = Rc<RefCell<Vec<&'static str>>>;

struct FakeBackend {
    log: Log,
}

impl TerminalBackend for FakeBackend {
    fn enter(&mut self) -> Result<()> {
        self.log.borrow_mut().push("enter");
        Ok(())
    }

    fn leave(&mut self) -> Result<()> {
        self.log.borrow_mut().push("leave");
        Ok(())
    }
}

fn session(mode: EditingMode) -> SessionState {
    let buffer = Buffer::new(Box::new(InMemoryHistory::new()))
        .with_completer(Arc::new(keyword_completer))
        .with_validator(Box::new(quotes_balanced));
    SessionState::new(buffer, mode)
}

fn no_editor() -> ExternalEditor {
    Box::new(|_: &str| anyhow::bail!("no editor in tests"))
}

fn prompt_with(
    session: SessionState,
    editor: ExternalEditor,
    options: LoopOptions,
) -> (Prompt<VecOutput, FakeBackend>, Log) {
    let log = Log::default();
    let prompt = Prompt::new(
        session,
        Dispatcher::with_defaults().unwrap(),
        EditorModel::with_prompt("> "),
        Renderer::new(false),
        VecOutput::new(80, 24),
        FakeBackend { log: log.clone() },
        editor,
        options,
    );
    (prompt, log)
}

fn prompt(mode: EditingMode) -> Prompt<VecOutput, FakeBackend> {
    prompt_with(session(mode), no_editor(), LoopOptions::default()).0
}

fn events(inputs: &[&[u8]]) -> Receiver<Event> {
    let (tx, rx) = channel(64);
    for input in inputs {
        tx.try_send(Event::Input(input.to_vec())).unwrap();
    }
    tx.try_send(Event::Shutdown).unwrap();
    rx
}

#[tokio::test]
async fn accepts_typed_line() {
    let mut p = prompt(EditingMode::Emacs);
    let mut rx = events(&[b"hello\x01X\r"]);
    assert_eq!(p.prompt(&mut rx).await.unwrap(), Ok("Xhello".to_string()));
    assert!(p.output().printed().contains("Xhello"));
}

#[tokio::test]
async fn vi_scenario_through_loop() {
    let mut p = prompt(EditingMode::Vi);
    let mut rx = events(&[b"hello\x1b2hD\r"]);
    assert_eq!(p.prompt(&mut rx).await.unwrap(), Ok("he".to_string()));
}

#[tokio::test]
async fn typeahead_carries_to_next_prompt() {
    let mut p = prompt(EditingMode::Emacs);
    let mut rx = events(&[b"one\rtwo\r"]);
    assert_eq!(p.prompt(&mut rx).await.unwrap(), Ok("one".to_string()));
    assert_eq!(p.prompt(&mut rx).await.unwrap(), Ok("two".to_string()));
    assert_eq!(p.prompt(&mut rx).await.unwrap(), Err(SessionError::UserExit));
}

#[tokio::test]
async fn ctrl_c_raises_abort() {
    let mut p = prompt(EditingMode::Emacs);
    let mut rx = events(&[b"abc\x03"]);
    assert_eq!(p.prompt(&mut rx).await.unwrap(), Err(SessionError::UserAbort));
}

#[tokio::test]
async fn retry_policy_clears_line_and_keeps_reading() {
    let s = session(EditingMode::Emacs).with_policies(AbortPolicy::Retry, AbortPolicy::Raise);
    let (mut p, _) = prompt_with(s, no_editor(), LoopOptions::default());
    let mut rx = events(&[b"abc\x03", b"def\r"]);
    assert_eq!(p.prompt(&mut rx).await.unwrap(), Ok("def".to_string()));
}

#[tokio::test]
async fn closed_input_ends_with_exit() {
    let mut p = prompt(EditingMode::Emacs);
    let mut rx = events(&[b"unfinished"]);
    assert_eq!(p.prompt(&mut rx).await.unwrap(), Err(SessionError::UserExit));
}

#[tokio::test]
async fn tab_completes_from_demo_words() {
    let mut p = prompt(EditingMode::Emacs);
    let mut rx = events(&[b"sel\t\r"]);
    assert_eq!(p.prompt(&mut rx).await.unwrap(), Ok("select".to_string()));
}

#[tokio::test]
async fn validation_error_is_shown_until_fixed() {
    let mut p = prompt(EditingMode::Emacs);
    let mut rx = events(&[b"say \"hi\r", b"\x05\"\r"]);
    assert_eq!(p.prompt(&mut rx).await.unwrap(), Ok("say \"hi\"".to_string()));
    assert!(p.output().printed().contains("unterminated \" quote"));
}

#[tokio::test]
async fn external_editor_runs_outside_raw_mode() {
    let editor: ExternalEditor = Box::new(|text: &str| Ok(format!("{text} --edited")));
    let (mut p, log) = prompt_with(session(EditingMode::Emacs), editor, LoopOptions::default());
    let mut rx = events(&[b"draft\x18\x05"]);
    assert_eq!(p.prompt(&mut rx).await.unwrap(), Ok("draft --edited".to_string()));
    assert_eq!(*log.borrow(), vec!["enter", "leave", "enter", "leave"]);
}

#[tokio::test]
async fn failed_editor_keeps_text_and_rings_bell() {
    let mut p = prompt(EditingMode::Emacs);
    let mut rx = events(&[b"draft\x18\x05", b"\r"]);
    assert_eq!(p.prompt(&mut rx).await.unwrap(), Ok("draft".to_string()));
    assert!(p.output().commands.contains(&Command::Bell));
}

#[tokio::test]
async fn clear_screen_request_clears_terminal() {
    let mut p = prompt(EditingMode::Emacs);
    let mut rx = events(&[b"x\x0c\r"]);
    assert_eq!(p.prompt(&mut rx).await.unwrap(), Ok("x".to_string()));
    assert!(p.output().commands.contains(&Command::ClearScreen));
}

#[tokio::test]
async fn cursor_position_report_is_consumed() {
    let mut p = prompt(EditingMode::Emacs);
    let mut rx = events(&[b"\x1b[5;1R", b"x\r"]);
    assert_eq!(p.prompt(&mut rx).await.unwrap(), Ok("x".to_string()));
    assert_eq!(p.renderer().rows_above_layout(24), Some(4));
    assert!(p.output().commands.contains(&Command::RequestCursorPosition));
}

#[tokio::test]
async fn resize_updates_output_size() {
    let mut p = prompt(EditingMode::Emacs);
    let (tx, mut rx) = channel(8);
    tx.try_send(Event::Resize(40, 10)).unwrap();
    tx.try_send(Event::Input(b"x\r".to_vec())).unwrap();
    drop(tx);
    assert_eq!(p.prompt(&mut rx).await.unwrap(), Ok("x".to_string()));
    assert_eq!(p.output().size(), (40, 10));
}

#[test]
fn completion_while_typing_opens_menu() {
    let options = LoopOptions {
        complete_while_typing: true,
        ..LoopOptions::default()
    };
    let (mut p, _) = prompt_with(session(EditingMode::Emacs), no_editor(), options);
    p.handle_event(Event::Input(b"select co".to_vec())).unwrap();
    let state = p.session().buffer.complete_state().expect("menu open");
    let words: Vec<&str> = state.completions.iter().map(|c| c.text.as_str()).collect();
    assert_eq!(words, vec!["count", "coalesce"]);
}

#[tokio::test]
async fn tab_with_worker_defers_to_background() {
    let (p, _) = prompt_with(session(EditingMode::Emacs), no_editor(), LoopOptions::default());
    let mut p = p.with_worker(CompletionWorker::spawn(Arc::new(keyword_completer)));
    p.handle_event(Event::Input(b"sel\t".to_vec())).unwrap();
    assert_eq!(p.session().buffer.text(), "sel");
    assert!(p.session().buffer.complete_state().is_none());
}

#[tokio::test]
async fn tab_result_from_worker_is_applied() {
    let (p, _) = prompt_with(session(EditingMode::Emacs), no_editor(), LoopOptions::default());
    let mut p = p.with_worker(CompletionWorker::spawn(Arc::new(keyword_completer)));
    let (tx, mut rx) = channel(8);
    tx.try_send(Event::Input(b"sel\t".to_vec())).unwrap();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(500)).await;
        let _ = tx.send(Event::Input(b"\r".to_vec())).await;
    });
    assert_eq!(p.prompt(&mut rx).await.unwrap(), Ok("select".to_string()));
}
