//! crossterm implementation of the renderer's output sink.

use std::io::{self, Write};

use anyhow::Result;
use core_render::{Attrs, Command, Output, Style};
use crossterm::{
    cursor, event, queue,
    style::{self, Attribute, SetAttribute},
    terminal::{self, Clear, ClearType},
};
use tracing::warn;

const FALLBACK_SIZE: (u16, u16) = (80, 24);

const ATTRIBUTES: [(Attrs, Attribute); 8] = [
    (Attrs::BOLD, Attribute::Bold),
    (Attrs::DIM, Attribute::Dim),
    (Attrs::ITALIC, Attribute::Italic),
    (Attrs::UNDERLINE, Attribute::Underlined),
    (Attrs::BLINK, Attribute::SlowBlink),
    (Attrs::REVERSE, Attribute::Reverse),
    (Attrs::HIDDEN, Attribute::Hidden),
    (Attrs::STRIKE, Attribute::CrossedOut),
];

/// Queues commands on `W` and writes them on flush. The first I/O error is
/// kept and reported by the next flush.
pub struct CrosstermOutput<W: Write> {
    writer: W,
    size: (u16, u16),
    error: Option<io::Error>,
}

impl CrosstermOutput<io::Stdout> {
    pub fn stdout() -> Self {
        let mut out = Self::new(io::stdout(), FALLBACK_SIZE);
        out.refresh_size();
        out
    }
}

impl<W: Write> CrosstermOutput<W> {
    pub fn new(writer: W, size: (u16, u16)) -> Self {
        Self {
            writer,
            size,
            error: None,
        }
    }

    /// Re-read the terminal size, keeping the last known one on failure.
    pub fn refresh_size(&mut self) -> (u16, u16) {
        match terminal::size() {
            Ok(size) => self.size = size,
            Err(err) => warn!(target: "runtime", ?err, "terminal_size_failed"),
        }
        self.size
    }

    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    fn apply(&mut self, command: Command) -> io::Result<()> {
        let w = &mut self.writer;
        match command {
            Command::Print(text) => queue!(w, style::Print(text)),
            Command::SetStyle(s) => set_style(w, s),
            Command::ResetStyle => queue!(w, SetAttribute(Attribute::Reset), style::ResetColor),
            Command::MoveUp(0) | Command::LineFeed(0) | Command::MoveLeft(0) | Command::MoveRight(0) => Ok(()),
            Command::MoveUp(n) => queue!(w, cursor::MoveUp(n)),
            Command::LineFeed(n) => queue!(w, style::Print("\n".repeat(usize::from(n)))),
            Command::MoveRight(n) => queue!(w, cursor::MoveRight(n)),
            Command::MoveLeft(n) => queue!(w, cursor::MoveLeft(n)),
            Command::CarriageReturn => queue!(w, style::Print('\r')),
            Command::MoveTo { row, col } => queue!(w, cursor::MoveTo(col, row)),
            Command::EraseEndOfLine => queue!(w, Clear(ClearType::UntilNewLine)),
            Command::EraseDown => queue!(w, Clear(ClearType::FromCursorDown)),
            Command::ClearScreen => queue!(w, Clear(ClearType::All)),
            Command::HideCursor => queue!(w, cursor::Hide),
            Command::ShowCursor => queue!(w, cursor::Show),
            Command::EnterAlternateScreen => queue!(w, terminal::EnterAlternateScreen),
            Command::LeaveAlternateScreen => queue!(w, terminal::LeaveAlternateScreen),
            Command::EnableBracketedPaste => queue!(w, event::EnableBracketedPaste),
            Command::DisableBracketedPaste => queue!(w, event::DisableBracketedPaste),
            Command::EnableMouse => queue!(w, event::EnableMouseCapture),
            Command::DisableMouse => queue!(w, event::DisableMouseCapture),
            Command::RequestCursorPosition => queue!(w, style::Print("\x1b[6n")),
            Command::Bell => queue!(w, style::Print('\x07')),
        }
    }
}

fn set_style<W: Write>(w: &mut W, s: Style) -> io::Result<()> {
    queue!(w, SetAttribute(Attribute::Reset), style::ResetColor)?;
    if let Some(fg) = s.fg {
        queue!(w, style::SetForegroundColor(fg))?;
    }
    if let Some(bg) = s.bg {
        queue!(w, style::SetBackgroundColor(bg))?;
    }
    for (flag, attribute) in ATTRIBUTES {
        if s.attrs.contains(flag) {
            queue!(w, SetAttribute(attribute))?;
        }
    }
    Ok(())
}

impl<W: Write> Output for CrosstermOutput<W> {
    fn write(&mut self, command: Command) {
        if self.error.is_some() {
            return;
        }
        if let Err(err) = self.apply(command) {
            self.error = Some(err);
        }
    }

    fn flush(&mut self) -> Result<()> {
        if let Some(err) = self.error.take() {
            return Err(err.into());
        }
        self.writer.flush()?;
        Ok(())
    }

    fn size(&self) -> (u16, u16) {
        self.size
    }

    fn set_size(&mut self, columns: u16, rows: u16) {
        self.size = (columns, rows);
    }
}
