//! Terminal write operations and the sink that carries them out.
//!
//! The renderer only produces [`Command`]s; a sink decides how they reach
//! the terminal. Commands are applied in the order issued and nothing is
//! visible before [`Output::flush`].

use anyhow::Result;

use crate::style::Style;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Text printed at the cursor in the current style.
    Print(String),
    SetStyle(Style),
    ResetStyle,
    MoveUp(u16),
    /// Down `n` rows via line feeds, scrolling the terminal when needed.
    LineFeed(u16),
    MoveRight(u16),
    MoveLeft(u16),
    CarriageReturn,
    /// Absolute position; only used on the alternate screen.
    MoveTo { row: u16, col: u16 },
    EraseEndOfLine,
    EraseDown,
    ClearScreen,
    HideCursor,
    ShowCursor,
    EnterAlternateScreen,
    LeaveAlternateScreen,
    EnableBracketedPaste,
    DisableBracketedPaste,
    EnableMouse,
    DisableMouse,
    /// Ask the terminal for a cursor position report (`ESC[6n`).
    RequestCursorPosition,
    Bell,
}

impl Command {
    pub fn is_print(&self) -> bool {
        matches!(self, Command::Print(_))
    }
}

pub trait Output {
    fn write(&mut self, command: Command);

    fn flush(&mut self) -> Result<()>;

    /// Terminal size as (columns, rows).
    fn size(&self) -> (u16, u16);

    /// Record a new terminal size after a resize event.
    fn set_size(&mut self, columns: u16, rows: u16);
}

/// Collects commands in memory. Used by tests and for dumping frames.
#[derive(Debug, Clone, Default)]
pub struct VecOutput {
    pub commands: Vec<Command>,
    pub flushes: usize,
    pub columns: u16,
    pub rows: u16,
}

impl VecOutput {
    pub fn new(columns: u16, rows: u16) -> Self {
        Self {
            columns,
            rows,
            ..Self::default()
        }
    }

    pub fn take(&mut self) -> Vec<Command> {
        std::mem::take(&mut self.commands)
    }

    /// Concatenated text of all `Print` commands.
    pub fn printed(&self) -> String {
        self.commands
            .iter()
            .filter_map(|c| match c {
                Command::Print(s) => Some(s.as_str()),
                _ => None,
            })
            .collect()
    }
}

impl Output for VecOutput {
    fn write(&mut self, command: Command) {
        self.commands.push(command);
    }

    fn flush(&mut self) -> Result<()> {
        self.flushes += 1;
        Ok(())
    }

    fn size(&self) -> (u16, u16) {
        (self.columns, self.rows)
    }

    fn set_size(&mut self, columns: u16, rows: u16) {
        self.columns = columns;
        self.rows = rows;
    }
}

/// Merges consecutive prints into one command before they reach the sink.
pub(crate) struct Batch<'a, O: Output + ?Sized> {
    out: &'a mut O,
    pending: String,
    pub commands: u64,
}

impl<'a, O: Output + ?Sized> Batch<'a, O> {
    pub fn new(out: &'a mut O) -> Self {
        Self {
            out,
            pending: String::new(),
            commands: 0,
        }
    }

    pub fn print(&mut self, text: &str) {
        self.pending.push_str(text);
    }

    pub fn write(&mut self, command: Command) {
        self.flush_pending();
        self.out.write(command);
        self.commands += 1;
    }

    fn flush_pending(&mut self) {
        if !self.pending.is_empty() {
            self.out.write(Command::Print(std::mem::take(&mut self.pending)));
            self.commands += 1;
        }
    }

    pub fn finish(mut self) -> u64 {
        self.flush_pending();
        self.commands
    }
}
