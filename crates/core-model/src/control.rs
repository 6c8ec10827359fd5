//! Screen-producing controls.
//!
//! The set is closed: every place that composes controls matches on
//! [`Control`] exhaustively. Controls read the session through an explicit
//! `&SessionState` and hold no references back into the layout.

use core_events::{MouseButton, MouseEvent, MouseEventKind};
use core_render::{Attrs, Char, Point, Rect, Screen, Style, StyledText};
use core_state::SessionState;
use crossterm::style::Color;
use tracing::trace;

/// Width used when a control must not wrap.
const NO_WRAP: usize = usize::MAX / 2;

#[derive(Debug, Clone)]
pub enum Control {
    Buffer(BufferControl),
    Text(TextControl),
    Fill(FillControl),
    CompletionMenu(CompletionMenuControl),
}

impl Control {
    pub fn preferred_width(&self, session: &SessionState, max_available: usize) -> Option<usize> {
        match self {
            Control::Buffer(c) => Some(c.preferred_width(session).min(max_available)),
            Control::Text(c) => Some(c.width().min(max_available)),
            Control::Fill(_) => None,
            Control::CompletionMenu(c) => c.preferred_width(session).map(|w| w.min(max_available)),
        }
    }

    pub fn preferred_height(&self, session: &SessionState, width: usize, max_available: usize) -> Option<usize> {
        let height = match self {
            Control::Buffer(c) => c.create_screen(session, width).height(),
            Control::Text(c) => c.create_screen(width).height(),
            Control::Fill(_) => return None,
            Control::CompletionMenu(c) => c.visible_rows(session),
        };
        Some(height.min(max_available))
    }

    /// Full content, not clipped to `height`; the window scrolls over it.
    pub fn create_screen(&self, session: &SessionState, width: usize, height: usize) -> Screen {
        match self {
            Control::Buffer(c) => c.create_screen(session, width),
            Control::Text(c) => c.create_screen(width),
            Control::Fill(c) => c.create_screen(width, height),
            Control::CompletionMenu(c) => c.create_screen(session, width),
        }
    }

    /// Mouse event at `position` in content coordinates. Returns whether it
    /// was handled.
    pub fn handle_mouse(&self, session: &mut SessionState, event: MouseEvent, position: Point, width: usize) -> bool {
        match self {
            Control::Buffer(c) => c.handle_mouse(session, event, position, width),
            Control::CompletionMenu(c) => c.handle_mouse(session, event, position),
            Control::Text(_) | Control::Fill(_) => false,
        }
    }

    pub fn is_focusable(&self) -> bool {
        matches!(self, Control::Buffer(_))
    }
}

/// The prompt followed by the editable buffer.
#[derive(Debug, Clone, Default)]
pub struct BufferControl {
    pub prompt: Vec<StyledText>,
    pub wrap_lines: bool,
}

impl BufferControl {
    pub fn new(prompt: Vec<StyledText>) -> Self {
        Self {
            prompt,
            wrap_lines: true,
        }
    }

    fn prompt_len(&self) -> usize {
        self.prompt.iter().map(|r| r.text.chars().count()).sum()
    }

    fn preferred_width(&self, session: &SessionState) -> usize {
        let prompt: String = self.prompt.iter().map(|r| r.text.as_str()).collect();
        let text = format!("{prompt}{}", session.buffer.text());
        text.lines().map(core_text::str_width).max().unwrap_or(0) + 1
    }

    /// Styled runs of prompt and buffer text, plus the positions of every
    /// char on a screen of `width`.
    fn layout(&self, session: &SessionState, width: usize) -> (Screen, Vec<Point>) {
        let doc = session.buffer.document();
        let chars: Vec<char> = doc.text().chars().collect();
        let mut styles = vec![Style::DEFAULT; chars.len()];

        let selected = Style::reverse();
        for (from, to) in doc.selection_ranges(session.is_vi()) {
            for s in styles.iter_mut().take(to.min(chars.len())).skip(from) {
                *s = selected;
            }
        }
        if let Some(isearch) = session.buffer.isearch() {
            let len = isearch.state.text.chars().count();
            let start = doc.cursor_position();
            let style = Style::DEFAULT.bg(Color::DarkYellow).fg(Color::Black);
            for s in styles.iter_mut().skip(start).take(len) {
                *s = style;
            }
        }

        let mut runs = self.prompt.clone();
        let mut current = String::new();
        let mut current_style = Style::DEFAULT;
        for (c, style) in chars.iter().zip(&styles) {
            if *style != current_style && !current.is_empty() {
                runs.push(StyledText::new(current_style, std::mem::take(&mut current)));
            }
            current_style = *style;
            current.push(*c);
        }
        if !current.is_empty() {
            runs.push(StyledText::new(current_style, current));
        }

        let wrap = if self.wrap_lines { width } else { NO_WRAP };
        let mut screen = Screen::new();
        let positions = screen.write_data(Point::ORIGIN, &runs, wrap);
        (screen, positions)
    }

    fn create_screen(&self, session: &SessionState, width: usize) -> Screen {
        let (mut screen, positions) = self.layout(session, width);
        let offset = self.prompt_len();
        let cursor = positions
            .get(offset + session.buffer.cursor_position())
            .copied()
            .unwrap_or_default();
        screen.cursor = cursor;
        // A trailing cursor past the wrap width starts the next row.
        if self.wrap_lines && cursor.x >= width {
            screen.cursor = Point::new(0, cursor.y + 1);
            screen.ensure_height(cursor.y + 2);
        }
        if let Some(state) = session.buffer.complete_state() {
            let origin = state.original_document.cursor_position();
            let back = state
                .completions
                .iter()
                .map(|c| c.start_position.unsigned_abs())
                .max()
                .unwrap_or(0);
            let index = offset + origin.saturating_sub(back);
            screen.menu_position = positions.get(index).copied();
        }
        screen
    }

    fn handle_mouse(&self, session: &mut SessionState, event: MouseEvent, position: Point, width: usize) -> bool {
        match event.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                let (_, positions) = self.layout(session, width);
                let offset = self.prompt_len();
                let target = positions
                    .iter()
                    .enumerate()
                    .skip(offset)
                    .filter(|(_, p)| p.y == position.y && p.x <= position.x)
                    .map(|(i, _)| i)
                    .last()
                    .or_else(|| {
                        positions
                            .iter()
                            .enumerate()
                            .skip(offset)
                            .filter(|(_, p)| p.y < position.y)
                            .map(|(i, _)| i)
                            .last()
                    });
                if let Some(index) = target {
                    trace!(target: "model.layout", index = index - offset, "mouse_cursor");
                    session.buffer.exit_selection();
                    session.buffer.set_cursor_position(index - offset);
                }
                true
            }
            MouseEventKind::ScrollUp => {
                session.buffer.cursor_up(1);
                true
            }
            MouseEventKind::ScrollDown => {
                session.buffer.cursor_down(1);
                true
            }
            _ => false,
        }
    }
}

/// Static styled text, e.g. a toolbar.
#[derive(Debug, Clone, Default)]
pub struct TextControl {
    pub runs: Vec<StyledText>,
}

impl TextControl {
    pub fn new(runs: Vec<StyledText>) -> Self {
        Self { runs }
    }

    pub fn is_empty(&self) -> bool {
        self.runs.iter().all(|r| r.text.is_empty())
    }

    fn width(&self) -> usize {
        let text: String = self.runs.iter().map(|r| r.text.as_str()).collect();
        text.lines().map(core_text::str_width).max().unwrap_or(0)
    }

    fn create_screen(&self, width: usize) -> Screen {
        let mut screen = Screen::new();
        if !self.is_empty() {
            screen.write_data(Point::ORIGIN, &self.runs, width);
        }
        screen.show_cursor = false;
        screen
    }
}

/// Paints its whole area with one char.
#[derive(Debug, Clone)]
pub struct FillControl {
    pub ch: char,
    pub style: Style,
}

impl FillControl {
    pub fn new(ch: char, style: Style) -> Self {
        Self { ch, style }
    }

    fn create_screen(&self, width: usize, height: usize) -> Screen {
        let mut screen = Screen::new();
        let mut buf = [0u8; 4];
        let text = self.ch.encode_utf8(&mut buf);
        for y in 0..height {
            for x in 0..width {
                screen.put(Point::new(x, y), Char::new(text, self.style));
            }
        }
        screen.ensure_height(height);
        screen.show_cursor = false;
        screen
    }
}

/// The open completion menu: one candidate per row, the selected one
/// highlighted, scrolled so the selection stays visible.
#[derive(Debug, Clone)]
pub struct CompletionMenuControl {
    pub max_height: usize,
    pub style: Style,
    pub selected_style: Style,
}

impl Default for CompletionMenuControl {
    fn default() -> Self {
        Self {
            max_height: 8,
            style: Style::DEFAULT.bg(Color::DarkGrey).fg(Color::White),
            selected_style: Style::DEFAULT.bg(Color::Grey).fg(Color::Black).with(Attrs::BOLD),
        }
    }
}

impl CompletionMenuControl {
    fn entries(session: &SessionState) -> Option<(Vec<(String, String)>, Option<usize>)> {
        let state = session.buffer.complete_state()?;
        if state.completions.is_empty() {
            return None;
        }
        let rows = state
            .completions
            .iter()
            .map(|c| {
                let display = c.display.clone().unwrap_or_else(|| c.text.clone());
                (display, c.display_meta.clone().unwrap_or_default())
            })
            .collect();
        Some((rows, state.complete_index))
    }

    fn visible_rows(&self, session: &SessionState) -> usize {
        Self::entries(session).map_or(0, |(rows, _)| rows.len().min(self.max_height))
    }

    fn preferred_width(&self, session: &SessionState) -> Option<usize> {
        let (rows, _) = Self::entries(session)?;
        let text = rows.iter().map(|(t, _)| core_text::str_width(t)).max().unwrap_or(0);
        let meta = rows.iter().map(|(_, m)| core_text::str_width(m)).max().unwrap_or(0);
        Some(text + 2 + if meta > 0 { meta + 1 } else { 0 })
    }

    /// First candidate shown, keeping `selected` in view.
    fn first_row(&self, total: usize, selected: Option<usize>) -> usize {
        let visible = total.min(self.max_height).max(1);
        match selected {
            Some(i) if i >= visible => (i + 1 - visible).min(total - visible),
            _ => 0,
        }
    }

    fn create_screen(&self, session: &SessionState, width: usize) -> Screen {
        let mut screen = Screen::new();
        screen.show_cursor = false;
        let Some((rows, selected)) = Self::entries(session) else {
            return screen;
        };
        let first = self.first_row(rows.len(), selected);
        let text_width = rows.iter().map(|(t, _)| core_text::str_width(t)).max().unwrap_or(0);
        for (y, (i, (text, meta))) in rows.iter().enumerate().skip(first).take(self.max_height).enumerate() {
            let style = if Some(i) == selected {
                self.selected_style
            } else {
                self.style
            };
            let pad = text_width - core_text::str_width(text);
            let line = if meta.is_empty() {
                format!(" {text}{} ", " ".repeat(pad))
            } else {
                format!(" {text}{} {meta} ", " ".repeat(pad))
            };
            screen.write_str(Point::new(0, y), style, &line, width);
            screen.fill_area(Rect::new(0, y, width, 1), style);
        }
        screen
    }

    fn handle_mouse(&self, session: &mut SessionState, event: MouseEvent, position: Point) -> bool {
        let MouseEventKind::Down(MouseButton::Left) = event.kind else {
            return false;
        };
        let Some((rows, selected)) = Self::entries(session) else {
            return false;
        };
        let index = self.first_row(rows.len(), selected) + position.y;
        if index < rows.len() {
            let applied = session
                .buffer
                .go_to_completion(Some(index))
                .map(|()| session.buffer.close_completion());
            if applied.is_err() {
                session.ring_bell();
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_events::ModMask;
    use core_state::{Buffer, Completion, EditingMode};
    use core_text::{Document, SelectionKind};
    use pretty_assertions::assert_eq;

    fn session(text: &str) -> SessionState {
        let mut buffer = Buffer::default();
        buffer.set_document(Document::at_end(text), false).unwrap();
        SessionState::new(buffer, EditingMode::Emacs)
    }

    fn click(x: u16, y: u16) -> MouseEvent {
        MouseEvent {
            kind: MouseEventKind::Down(MouseButton::Left),
            column: x,
            row: y,
            mods: ModMask::empty(),
        }
    }

    #[test]
    fn buffer_control_places_cursor_after_prompt() {
        let s = session("hello");
        let c = BufferControl::new(vec![StyledText::plain("> ")]);
        let screen = c.create_screen(&s, 20);
        assert_eq!(screen.row_text(0), "> hello");
        assert_eq!(screen.cursor, Point::new(7, 0));
    }

    #[test]
    fn buffer_control_wraps_and_tracks_cursor() {
        let s = session("abcdefgh");
        let c = BufferControl::new(vec![StyledText::plain("> ")]);
        let screen = c.create_screen(&s, 5);
        assert_eq!(screen.lines(), vec!["> abc", "defgh", ""]);
        assert_eq!(screen.cursor, Point::new(0, 2));
    }

    #[test]
    fn selection_is_reversed() {
        let mut s = session("abcd");
        s.buffer.set_cursor_position(1);
        s.buffer.start_selection(SelectionKind::Characters);
        s.buffer.set_cursor_position(3);
        let c = BufferControl::new(Vec::new());
        let screen = c.create_screen(&s, 20);
        assert_eq!(screen.get(Point::new(1, 0)).unwrap().style, Style::reverse());
        assert_eq!(screen.get(Point::new(3, 0)).unwrap().style, Style::DEFAULT);
    }

    #[test]
    fn click_moves_cursor() {
        let mut s = session("one\ntwo");
        let c = BufferControl::new(vec![StyledText::plain("$ ")]);
        assert!(c.handle_mouse(&mut s, click(0, 0), Point::new(1, 1), 20));
        assert_eq!(s.buffer.cursor_position(), 5);
        assert!(c.handle_mouse(&mut s, click(0, 0), Point::new(30, 0), 20));
        assert_eq!(s.buffer.cursor_position(), 3);
    }

    #[test]
    fn menu_shows_candidates_and_selection() {
        let mut s = session("a");
        s.buffer
            .set_completions(vec![Completion::new("apple", -1), Completion::new("avocado", -1)]);
        s.buffer.go_to_completion(Some(1)).unwrap();
        let menu = CompletionMenuControl::default();
        let screen = menu.create_screen(&s, 20);
        assert_eq!(screen.row_text(0), " apple");
        assert_eq!(screen.row_text(1), " avocado");
        assert_eq!(screen.get(Point::new(1, 1)).unwrap().style, menu.selected_style);
        assert_eq!(menu.visible_rows(&s), 2);
    }

    #[test]
    fn menu_scrolls_to_selection() {
        let menu = CompletionMenuControl {
            max_height: 3,
            ..CompletionMenuControl::default()
        };
        assert_eq!(menu.first_row(10, Some(1)), 0);
        assert_eq!(menu.first_row(10, Some(5)), 3);
        assert_eq!(menu.first_row(10, Some(9)), 7);
    }

    #[test]
    fn menu_position_marks_word_start() {
        let mut s = session("git ch");
        s.buffer.set_completions(vec![Completion::new("checkout", -2)]);
        let c = BufferControl::new(vec![StyledText::plain("> ")]);
        let screen = c.create_screen(&s, 40);
        assert_eq!(screen.menu_position, Some(Point::new(6, 0)));
    }
}
