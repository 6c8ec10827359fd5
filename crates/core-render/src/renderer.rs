//! Diff renderer: turns the previous frame into the new one with as few
//! terminal writes as possible.
//!
//! Inline (non full-screen) prompts are drawn relative to the row where
//! the first frame started, using only relative cursor movement. Rows that
//! did not change are skipped; a changed row repaints only the span
//! between its first and last differing cells, widened to whole wide
//! clusters. The cursor is positioned once, after all cells are written.

use anyhow::Result;
use tracing::{debug, trace};

use crate::output::{Batch, Command, Output};
use crate::screen::{Char, Point, Screen};
use crate::style::Style;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RenderStats {
    pub frames: u64,
    pub commands: u64,
    pub rows_repainted: u64,
    pub full_redraws: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cpr {
    Unknown,
    Waiting,
    /// Rows from the prompt origin to the bottom of the terminal.
    Known(usize),
    Unsupported,
}

pub struct Renderer {
    full_screen: bool,
    mouse: bool,
    previous: Option<Screen>,
    last_width: usize,
    /// Terminal cursor relative to the origin.
    cursor: Point,
    last_style: Style,
    cursor_visible: bool,
    in_alternate_screen: bool,
    modes_enabled: bool,
    cpr: Cpr,
    stats: RenderStats,
}

impl Renderer {
    pub fn new(full_screen: bool) -> Self {
        Self {
            full_screen,
            mouse: false,
            previous: None,
            last_width: 0,
            cursor: Point::ORIGIN,
            last_style: Style::DEFAULT,
            cursor_visible: true,
            in_alternate_screen: false,
            modes_enabled: false,
            cpr: Cpr::Unknown,
            stats: RenderStats::default(),
        }
    }

    pub fn with_mouse(mut self, enable: bool) -> Self {
        self.mouse = enable;
        self
    }

    pub fn stats(&self) -> RenderStats {
        self.stats
    }

    pub fn is_full_screen(&self) -> bool {
        self.full_screen
    }

    /// The last frame written, if any.
    pub fn last_screen(&self) -> Option<&Screen> {
        self.previous.as_ref()
    }

    pub fn render<O: Output + ?Sized>(&mut self, out: &mut O, screen: &Screen) -> Result<()> {
        let (columns, rows) = out.size();
        let width = usize::from(columns.max(1));
        let max_rows = usize::from(rows.max(1));
        let mut batch = Batch::new(out);

        if !self.modes_enabled {
            self.modes_enabled = true;
            if self.full_screen {
                batch.write(Command::EnterAlternateScreen);
                batch.write(Command::ClearScreen);
                batch.write(Command::MoveTo { row: 0, col: 0 });
                self.in_alternate_screen = true;
            } else {
                batch.write(Command::CarriageReturn);
            }
            batch.write(Command::EnableBracketedPaste);
            if self.mouse {
                batch.write(Command::EnableMouse);
            }
            self.cursor = Point::ORIGIN;
        }

        let mut full = false;
        if self.previous.is_some() && self.last_width != width {
            debug!(target: "render.diff", old = self.last_width, new = width, "width_changed");
            self.move_cursor(&mut batch, Point::ORIGIN, width);
            self.reset_style(&mut batch);
            batch.write(Command::EraseDown);
            self.previous = None;
        }
        if self.previous.is_none() {
            full = true;
            self.stats.full_redraws += 1;
        }

        let height = screen.height().min(max_rows);
        let old_height = self.previous.as_ref().map_or(0, |p| p.height().min(max_rows));
        let changed: Vec<usize> = (0..height)
            .filter(|&y| row_span(screen, self.previous.as_ref(), y, width).is_some())
            .collect();

        if !changed.is_empty() && self.cursor_visible {
            batch.write(Command::HideCursor);
            self.cursor_visible = false;
        }
        let previous = self.previous.take();
        for &y in &changed {
            if let Some((start, end)) = row_span(screen, previous.as_ref(), y, width) {
                self.paint_row(&mut batch, screen, y, start, end, width);
                self.stats.rows_repainted += 1;
            }
        }
        if old_height > height {
            self.move_cursor(&mut batch, Point::new(0, height), width);
            self.reset_style(&mut batch);
            batch.write(Command::EraseDown);
        }
        self.reset_style(&mut batch);

        let target = Point::new(screen.cursor.x.min(width.saturating_sub(1)), screen.cursor.y.min(max_rows - 1));
        self.move_cursor(&mut batch, target, width);
        if screen.show_cursor != self.cursor_visible {
            batch.write(if screen.show_cursor {
                Command::ShowCursor
            } else {
                Command::HideCursor
            });
            self.cursor_visible = screen.show_cursor;
        }

        let commands = batch.finish();
        out.flush()?;
        self.stats.frames += 1;
        self.stats.commands += commands;
        self.last_width = width;
        self.previous = Some(screen.clone());
        debug!(target: "render.diff", rows = changed.len(), commands, full, "frame");
        Ok(())
    }

    fn paint_row<O: Output + ?Sized>(
        &mut self,
        batch: &mut Batch<'_, O>,
        screen: &Screen,
        y: usize,
        start: usize,
        end: usize,
        width: usize,
    ) {
        let new_extent = screen.row_extent(y).min(width);
        let mut x = start.min(new_extent);
        self.move_cursor(batch, Point::new(x, y), width);
        while x < end.min(new_extent) {
            match screen.get(Point::new(x, y)) {
                Some(c) if c.is_continuation() => x += 1,
                Some(c) => {
                    if x + usize::from(c.width) > width {
                        break;
                    }
                    self.set_style(batch, c.style);
                    batch.print(&c.text);
                    x += usize::from(c.width);
                }
                None => {
                    self.set_style(batch, Style::DEFAULT);
                    batch.print(" ");
                    x += 1;
                }
            }
            self.cursor.x = x;
        }
        if end > new_extent {
            self.reset_style(batch);
            batch.write(Command::EraseEndOfLine);
        }
        trace!(target: "render.diff", row = y, start, end, "paint_row");
    }

    fn set_style<O: Output + ?Sized>(&mut self, batch: &mut Batch<'_, O>, style: Style) {
        if style == self.last_style {
            return;
        }
        if style.is_default() {
            batch.write(Command::ResetStyle);
        } else {
            if !self.last_style.is_default() {
                batch.write(Command::ResetStyle);
            }
            batch.write(Command::SetStyle(style));
        }
        self.last_style = style;
    }

    fn reset_style<O: Output + ?Sized>(&mut self, batch: &mut Batch<'_, O>) {
        self.set_style(batch, Style::DEFAULT);
    }

    fn move_cursor<O: Output + ?Sized>(&mut self, batch: &mut Batch<'_, O>, target: Point, width: usize) {
        if self.cursor == target {
            return;
        }
        if self.full_screen {
            batch.write(Command::MoveTo {
                row: clamp_u16(target.y),
                col: clamp_u16(target.x),
            });
            self.cursor = target;
            return;
        }
        // After printing into the last column the terminal is in the
        // pending-wrap state; a carriage return makes the column known again.
        if self.cursor.x >= width {
            batch.write(Command::CarriageReturn);
            self.cursor.x = 0;
        }
        if target.y > self.cursor.y {
            batch.write(Command::CarriageReturn);
            batch.write(Command::LineFeed(clamp_u16(target.y - self.cursor.y)));
            self.cursor = Point::new(0, target.y);
        } else if target.y < self.cursor.y {
            batch.write(Command::MoveUp(clamp_u16(self.cursor.y - target.y)));
            self.cursor.y = target.y;
        }
        if target.x != self.cursor.x {
            if target.x == 0 {
                batch.write(Command::CarriageReturn);
            } else if target.x > self.cursor.x {
                batch.write(Command::MoveRight(clamp_u16(target.x - self.cursor.x)));
            } else {
                batch.write(Command::MoveLeft(clamp_u16(self.cursor.x - target.x)));
            }
            self.cursor.x = target.x;
        }
    }

    /// Move below the last frame and forget it: the prompt is finished and
    /// its output stays on the terminal.
    pub fn render_done<O: Output + ?Sized>(&mut self, out: &mut O) -> Result<()> {
        let (columns, _) = out.size();
        let width = usize::from(columns.max(1));
        let below = self.previous.as_ref().map_or(0, Screen::height);
        let mut batch = Batch::new(out);
        self.move_cursor(&mut batch, Point::new(0, below.max(self.cursor.y + 1)), width);
        self.reset_style(&mut batch);
        self.leave_modes(&mut batch);
        if !self.cursor_visible {
            batch.write(Command::ShowCursor);
            self.cursor_visible = true;
        }
        self.stats.commands += batch.finish();
        out.flush()?;
        self.reset();
        debug!(target: "render.diff", "render_done");
        Ok(())
    }

    /// Remove the prompt from the terminal (resize, run-in-terminal). The
    /// next frame is drawn from scratch at the same origin.
    pub fn erase<O: Output + ?Sized>(&mut self, out: &mut O) -> Result<()> {
        let (columns, _) = out.size();
        let width = usize::from(columns.max(1));
        let mut batch = Batch::new(out);
        self.move_cursor(&mut batch, Point::ORIGIN, width);
        self.reset_style(&mut batch);
        batch.write(Command::EraseDown);
        self.leave_modes(&mut batch);
        if !self.cursor_visible {
            batch.write(Command::ShowCursor);
            self.cursor_visible = true;
        }
        self.stats.commands += batch.finish();
        out.flush()?;
        self.reset();
        if self.cpr != Cpr::Unsupported {
            self.cpr = Cpr::Unknown;
        }
        debug!(target: "render.diff", "erase");
        Ok(())
    }

    /// Clear the whole terminal and draw the prompt at the top (`C-l`).
    pub fn clear<O: Output + ?Sized>(&mut self, out: &mut O) -> Result<()> {
        out.write(Command::ResetStyle);
        out.write(Command::ClearScreen);
        out.write(Command::MoveTo { row: 0, col: 0 });
        self.stats.commands += 3;
        out.flush()?;
        self.previous = None;
        self.cursor = Point::ORIGIN;
        self.last_style = Style::DEFAULT;
        if self.cpr != Cpr::Unsupported {
            self.cpr = Cpr::Unknown;
        }
        Ok(())
    }

    fn leave_modes<O: Output + ?Sized>(&mut self, batch: &mut Batch<'_, O>) {
        if !self.modes_enabled {
            return;
        }
        batch.write(Command::DisableBracketedPaste);
        if self.mouse {
            batch.write(Command::DisableMouse);
        }
        if self.in_alternate_screen {
            batch.write(Command::LeaveAlternateScreen);
            self.in_alternate_screen = false;
        }
        self.modes_enabled = false;
    }

    fn reset(&mut self) {
        self.previous = None;
        self.cursor = Point::ORIGIN;
        self.last_style = Style::DEFAULT;
    }

    /// Ask where the prompt starts, to learn how many rows lie below it.
    pub fn request_cursor_position<O: Output + ?Sized>(&mut self, out: &mut O) -> Result<()> {
        if self.full_screen || matches!(self.cpr, Cpr::Waiting | Cpr::Unsupported) {
            return Ok(());
        }
        out.write(Command::RequestCursorPosition);
        out.flush()?;
        self.cpr = Cpr::Waiting;
        Ok(())
    }

    pub fn waiting_for_cpr(&self) -> bool {
        self.cpr == Cpr::Waiting
    }

    /// Feed a cursor position report (1-based row) taken at the origin.
    pub fn report_cursor_position(&mut self, row: u16, terminal_rows: u16) {
        let below = usize::from(terminal_rows.saturating_sub(row.saturating_sub(1)));
        debug!(target: "render.diff", row, rows_below = below, "cpr");
        self.cpr = Cpr::Known(below.max(1));
    }

    /// The terminal never answered; stop asking.
    pub fn cpr_not_supported(&mut self) {
        debug!(target: "render.diff", "cpr_unsupported");
        self.cpr = Cpr::Unsupported;
    }

    /// Rows between the top of the terminal and the prompt origin, once a
    /// position report arrived. Mouse rows are translated with this.
    pub fn rows_above_layout(&self, terminal_rows: u16) -> Option<usize> {
        if self.full_screen {
            return Some(0);
        }
        match self.cpr {
            Cpr::Known(below) => Some(usize::from(terminal_rows).saturating_sub(below)),
            _ => None,
        }
    }

    /// Rows the layout should fill at minimum: the space below the origin
    /// when known, so menus can open downwards without scrolling.
    pub fn min_available_height(&self, terminal_rows: u16) -> usize {
        if self.full_screen {
            return usize::from(terminal_rows);
        }
        match self.cpr {
            Cpr::Known(below) => below.min(usize::from(terminal_rows)),
            _ => 0,
        }
    }
}

fn clamp_u16(n: usize) -> u16 {
    u16::try_from(n).unwrap_or(u16::MAX)
}

fn same_cell(a: Option<&Char>, b: Option<&Char>) -> bool {
    let blank = |c: Option<&Char>| c.is_none_or(|c| c.text == " " && c.style.is_default() && c.width == 1);
    match (a, b) {
        (Some(a), Some(b)) => a == b,
        _ => blank(a) && blank(b),
    }
}

fn is_continuation(screen: Option<&Screen>, p: Point) -> bool {
    screen.and_then(|s| s.get(p)).is_some_and(Char::is_continuation)
}

/// Columns `[start, end)` of row `y` that differ between the frames.
fn row_span(new: &Screen, old: Option<&Screen>, y: usize, width: usize) -> Option<(usize, usize)> {
    let old_extent = old.map_or(0, |o| o.row_extent(y)).min(width);
    let extent = new.row_extent(y).min(width).max(old_extent);
    let differs = |x: usize| {
        let p = Point::new(x, y);
        !same_cell(new.get(p), old.and_then(|o| o.get(p)))
    };
    let mut start = (0..extent).find(|&x| differs(x))?;
    let mut end = (start..extent).rev().find(|&x| differs(x)).unwrap_or(start) + 1;
    while start > 0 && (is_continuation(Some(new), Point::new(start, y)) || is_continuation(old, Point::new(start, y))) {
        start -= 1;
    }
    while end < extent && (is_continuation(Some(new), Point::new(end, y)) || is_continuation(old, Point::new(end, y))) {
        end += 1;
    }
    Some((start, end))
}
